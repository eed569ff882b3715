//! Single-restaurant voice-ordering gateway: bridges a telephony media
//! stream to a generative-speech model session, dispatches model tool
//! calls against a session-local cart, and persists completed orders.

pub mod audio;
pub mod audio_constants;
pub mod cart;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod legs;
pub mod persistence;
pub mod price_map;
pub mod registry;
pub mod session;
pub mod tools;
pub mod transfer;
