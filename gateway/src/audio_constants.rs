//! Audio constants — single source of truth for sample rates and framing.
//!
//! All audio-related constants MUST be imported from here; do not hardcode
//! sample rates or buffer sizes elsewhere.

/// Narrowband telephony sample rate (Hz) — µ-law media leg.
pub const MEDIA_SAMPLE_RATE: u32 = 8_000;

/// Wideband sample rate (Hz) sent to the generative-speech model.
pub const MODEL_INPUT_SAMPLE_RATE: u32 = 16_000;

/// Wideband sample rate (Hz) received from the generative-speech model.
pub const MODEL_OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// Bytes per sample for linear 16-bit PCM.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Restaurant sales tax applied in `completeOrder`.
pub const TAX_RATE: f64 = 0.0825;

/// Persistence retry policy used by the `completeOrder` pipeline.
pub const ORDER_MAX_ATTEMPTS: u32 = 3;
pub const ORDER_RETRY_DELAY_MS: u64 = 1_000;

/// Model-leg pre-greeting delay and reconnect policy (§4.6).
pub const GREETING_DELAY_MS: u64 = 500;
pub const MODEL_RECONNECT_ATTEMPTS: u32 = 2;
pub const MODEL_RECONNECT_DELAY_MS: u64 = 1_000;

/// Deferred-teardown grace period while an order completion is in flight.
pub const ORDER_TEARDOWN_GRACE_SECS: u64 = 8;

/// Farewell timer after a successful `completeOrder`, before teardown.
pub const ORDER_FAREWELL_SECS: u64 = 22;

/// Hard deadline for graceful shutdown before the process force-exits.
pub const SHUTDOWN_DEADLINE_SECS: u64 = 30;

/// Literal token that triggers cold escalation to a human agent.
pub const TRANSFER_PHRASE: &str = "TRANSFER_TO_HUMAN";
