//! Voice ordering gateway server.
//!
//! Loads configuration from the environment, stands up the Postgres pool
//! and schema, binds the HTTP server, and drains live call sessions on
//! shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use voice_gateway_core::audio_constants::SHUTDOWN_DEADLINE_SECS;
use voice_gateway_core::config::Config;
use voice_gateway_core::http::{self, AppState};
use voice_gateway_core::legs::model_leg::{ModelLegConfig, VadTuning};
use voice_gateway_core::persistence::{migration, PostgresGateway};
use voice_gateway_core::registry::SessionRegistry;
use voice_gateway_core::session::SessionContext;
use voice_gateway_core::transfer::TransferConfig;

const SYSTEM_INSTRUCTION: &str = "You are a friendly phone assistant taking orders for a restaurant. \
Keep responses short and conversational. Use the provided tools to look up menu items, manage the \
caller's cart, collect their name and phone number, and submit the finished order.";

fn tool_declarations() -> serde_json::Value {
    serde_json::json!([
        { "name": "searchMenu", "description": "Search the menu by name or keyword." },
        { "name": "manageOrder", "description": "Add or remove an item from the caller's cart." },
        { "name": "collectCustomerDetails", "description": "Record the caller's name and phone number." },
        { "name": "completeOrder", "description": "Submit the finished order for fulfillment." },
    ])
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("loading configuration")?;

    let persistence = Arc::new(
        PostgresGateway::connect(&config.database_url).context("connecting to postgres")?,
    );
    migration::ensure_schema(persistence.pool())
        .await
        .context("running schema migration")?;
    info!("schema ready");

    let registry = Arc::new(SessionRegistry::new());

    let ctx = Arc::new(SessionContext {
        persistence: persistence.clone(),
        restaurant_id: config.default_restaurant_id.clone(),
        model_config: ModelLegConfig {
            endpoint: config.model_endpoint.clone(),
            api_key: config.model_api_key.clone(),
            voice: "Kore".to_string(),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            tool_declarations: tool_declarations(),
            vad: VadTuning::default(),
        },
        transfer_config: TransferConfig {
            account_sid: config.telephony_account_sid.clone(),
            auth_token: config.telephony_auth_token.clone(),
            transfer_to_number: config.restaurant_transfer_number.clone(),
            api_base: config.telephony_api_base.clone(),
        },
        http_client: reqwest::Client::new(),
    });

    let public_host =
        std::env::var("PUBLIC_HOST").unwrap_or_else(|_| format!("localhost:{}", config.port));

    let state = AppState {
        ctx,
        registry: registry.clone(),
        public_host,
        started_at: std::time::Instant::now(),
    };

    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .context("binding listener")?;

    info!(port = config.port, "voice gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry))
        .await
        .context("server error")?;

    Ok(())
}

/// Waits for Ctrl-C or SIGTERM, then broadcasts shutdown to every live
/// session and gives them a bounded grace period to drain before the
/// process exits regardless.
async fn shutdown_signal(registry: Arc<SessionRegistry>) {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown requested, draining live sessions");
    registry.shutdown_all();

    let deadline = Duration::from_secs(SHUTDOWN_DEADLINE_SECS);
    let drained = tokio::time::timeout(deadline, async {
        while !registry.is_empty() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await;

    if drained.is_err() {
        warn!(
            remaining = registry.len(),
            "shutdown deadline reached with sessions still live; force-exiting"
        );
        // §6: exit code 1 on forced shutdown timeout. `axum::serve` has no
        // way to report a nonzero exit code back through `main`'s own
        // `Ok(())` return, so the deadline forces the process down directly.
        std::process::exit(1);
    }
}
