//! The two duplex legs a [`crate::session::Session`] bridges: the
//! telephony media stream ([`media_leg`]) and the generative-speech model
//! session ([`model_leg`]).

pub mod media_leg;
pub mod model_leg;
