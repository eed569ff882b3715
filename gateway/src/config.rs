//! Process configuration, loaded once at startup from the environment
//! (§6). No config file format — telephony and model credentials are
//! secrets and belong in the process environment, not a tracked file.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub model_api_key: String,
    pub model_endpoint: String,
    pub telephony_account_sid: String,
    pub telephony_auth_token: String,
    pub telephony_api_base: String,
    pub default_restaurant_id: String,
    pub restaurant_transfer_number: String,
    pub port: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn optional(name: &'static str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port_text = optional("PORT", "8080");
        let port = port_text
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT", port_text))?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            model_api_key: required("MODEL_API_KEY")?,
            model_endpoint: optional(
                "MODEL_ENDPOINT",
                "wss://generativelanguage.googleapis.com/ws/model.v1.BidiGenerateContent",
            ),
            telephony_account_sid: required("TELEPHONY_ACCOUNT_SID")?,
            telephony_auth_token: required("TELEPHONY_AUTH_TOKEN")?,
            telephony_api_base: optional("TELEPHONY_API_BASE", "https://api.telephony.example.com/2010-04-01"),
            default_restaurant_id: required("DEFAULT_RESTAURANT_ID")?,
            restaurant_transfer_number: required("RESTAURANT_TRANSFER_NUMBER")?,
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_all() {
        for var in [
            "DATABASE_URL",
            "MODEL_API_KEY",
            "MODEL_ENDPOINT",
            "TELEPHONY_ACCOUNT_SID",
            "TELEPHONY_AUTH_TOKEN",
            "TELEPHONY_API_BASE",
            "DEFAULT_RESTAURANT_ID",
            "RESTAURANT_TRANSFER_NUMBER",
            "PORT",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn missing_required_var_is_reported_by_name() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("DATABASE_URL")));
    }

    #[test]
    fn port_defaults_when_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("DATABASE_URL", "postgres://localhost/gateway");
        env::set_var("MODEL_API_KEY", "key");
        env::set_var("TELEPHONY_ACCOUNT_SID", "AC1");
        env::set_var("TELEPHONY_AUTH_TOKEN", "tok");
        env::set_var("DEFAULT_RESTAURANT_ID", "restaurant-1");
        env::set_var("RESTAURANT_TRANSFER_NUMBER", "+15550000000");
        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 8080);
        clear_all();
    }
}
