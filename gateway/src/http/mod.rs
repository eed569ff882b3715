//! HTTP ingress (§6): liveness, the TwiML webhook that bootstraps a call,
//! and the `/stream` WebSocket upgrade that hands off to a [`crate::session::Session`].

pub mod health;
pub mod stream;
pub mod twiml;

use crate::persistence::PersistenceGateway;
use crate::registry::SessionRegistry;
use crate::session::SessionContext;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;

pub struct AppState<P: PersistenceGateway> {
    pub ctx: Arc<SessionContext<P>>,
    pub registry: Arc<SessionRegistry>,
    pub public_host: String,
    pub started_at: Instant,
}

// Derived `Clone` would require `P: Clone`, which no `PersistenceGateway`
// implementation needs — every field here is already cheap to share.
impl<P: PersistenceGateway> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            registry: self.registry.clone(),
            public_host: self.public_host.clone(),
            started_at: self.started_at,
        }
    }
}

pub fn router<P: PersistenceGateway + 'static>(state: AppState<P>) -> Router {
    Router::new()
        .route("/health", get(health::handle::<P>))
        .route("/twiml", post(twiml::handle::<P>))
        .route("/stream", get(stream::handle::<P>))
        .with_state(state)
}
