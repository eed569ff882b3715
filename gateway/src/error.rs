//! Error kinds shared across every component boundary (§7).
//!
//! Four kinds cross component boundaries: [`GatewayError::InvalidArgument`]
//! (API-edge validation, never retried), [`GatewayError::Transient`]
//! (network/service blips, retried by the `completeOrder` pipeline),
//! [`GatewayError::Permanent`] (protocol-level closure, missing
//! credentials — never retried, terminates the affected leg), and
//! [`GatewayError::InvalidFrame`] (audio or JSON parse failure — logged and
//! the individual frame discarded).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("permanent failure: {0}")]
    Permanent(String),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

impl GatewayError {
    /// Whether the `completeOrder` retry loop (§4.3.1) should retry on this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transient(_))
    }
}
