//! Cold transfer to a human agent (§4.8) — one REST call against the
//! telephony provider's call-control API, fired once a transfer phrase is
//! detected on a `turnComplete` boundary.

use serde::Serialize;

#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub transfer_to_number: String,
    pub api_base: String,
}

#[derive(Debug, Serialize)]
struct TransferRequest<'a> {
    #[serde(rename = "twiml")]
    twiml: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("transfer request failed: {0}")]
    RequestFailed(String),
    #[error("transfer rejected: status {0}")]
    RejectedStatus(u16),
}

/// Renders the `<Dial>` TwiML document the telephony REST endpoint expects
/// as its `twiml` form field (§6).
fn dial_twiml(e164: &str) -> String {
    format!("<Response><Dial>{e164}</Dial></Response>")
}

/// Fires a single best-effort `POST calls/{CallSid}` redirect request.
/// Callers log and continue on error — a failed transfer must not crash
/// the session; the caller stays on the line with the model leg still
/// live.
pub async fn transfer_call(
    client: &reqwest::Client,
    config: &TransferConfig,
    call_id: &str,
) -> Result<(), TransferError> {
    let url = format!("{}/calls/{}", config.api_base, call_id);
    let twiml = dial_twiml(&config.transfer_to_number);
    let response = client
        .post(&url)
        .basic_auth(&config.account_sid, Some(&config.auth_token))
        .form(&TransferRequest { twiml: &twiml })
        .send()
        .await
        .map_err(|e| TransferError::RequestFailed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(TransferError::RejectedStatus(response.status().as_u16()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dial_twiml_embeds_transfer_destination() {
        let twiml = dial_twiml("+15551234567");
        assert_eq!(
            twiml,
            "<Response><Dial>+15551234567</Dial></Response>"
        );
    }
}
