//! Stateless audio transcoding between the telephony media leg and the
//! generative-speech model leg (§4.1). Both legs call directly into
//! [`bridge`] from their own event loops — there is no shared buffer and
//! therefore nothing to synchronize.

pub mod bridge;

pub use bridge::{media_to_model, model_to_media};
