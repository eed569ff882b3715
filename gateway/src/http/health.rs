//! Liveness probe (§6) — `200 JSON {status, uptime, sessions}`. No
//! downstream dependency checks, just "the process is up" plus enough
//! state to eyeball from a curl.

use super::AppState;
use crate::persistence::PersistenceGateway;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

pub async fn handle<P: PersistenceGateway>(State(state): State<AppState<P>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime": state.started_at.elapsed().as_secs(),
        "sessions": state.registry.len(),
    }))
}
