//! Inbound-call webhook: the telephony provider POSTs here when a call
//! arrives, and expects back a TwiML document pointing it at the
//! `/stream` WebSocket with the caller/restaurant numbers forwarded as
//! custom parameters.

use super::AppState;
use crate::persistence::PersistenceGateway;
use axum::extract::{Form, State};
use axum::http::{header, StatusCode};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TwimlForm {
    #[serde(rename = "From", default)]
    from: String,
    #[serde(rename = "To", default)]
    to: String,
}

/// Strip everything but digits, `+`, `-`, parentheses, and spaces, so a
/// malformed or adversarial `From`/`To` value can't break out of the
/// TwiML XML attribute it's interpolated into.
fn sanitize_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' '))
        .collect()
}

pub async fn handle<P: PersistenceGateway + 'static>(
    State(state): State<AppState<P>>,
    Form(form): Form<TwimlForm>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let caller_phone = sanitize_phone(&form.from);
    let restaurant_phone = sanitize_phone(&form.to);
    let stream_url = format!("wss://{}/stream", state.public_host);

    let twiml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
  <Connect>
    <Stream url="{stream_url}">
      <Parameter name="callerPhone" value="{caller_phone}" />
      <Parameter name="restaurantPhone" value="{restaurant_phone}" />
    </Stream>
  </Connect>
</Response>"#
    );

    (StatusCode::OK, [(header::CONTENT_TYPE, "text/xml")], twiml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_everything_but_allowed_characters() {
        assert_eq!(sanitize_phone("+1 (555) 123-4567"), "+1 (555) 123-4567");
        assert_eq!(sanitize_phone("+1555<script>alert(1)</script>"), "+1555(1)");
    }
}
