//! `/stream` — the telephony provider's WebSocket upgrade. One upgrade
//! spawns exactly one [`crate::session::Session`] task; the call id isn't
//! known until the leg's first `start` event arrives, so the handoff
//! happens inside the spawned task, not here.

use super::AppState;
use crate::legs::media_leg::{MediaEvent, MediaLeg};
use crate::persistence::PersistenceGateway;
use crate::session::Session;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;
use tracing::{info, warn};

pub async fn handle<P: PersistenceGateway + 'static>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<P>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let mut media = MediaLeg::new(socket);
        let start_event = loop {
            match media.recv().await {
                Ok(Some(event @ MediaEvent::Start { .. })) => break Some(event),
                Ok(Some(_)) | Ok(None) => continue,
                Err(()) => break None,
            }
        };

        let Some(MediaEvent::Start {
            call_id,
            stream_id,
            custom_parameters,
        }) = start_event
        else {
            warn!("stream closed before a start event arrived");
            return;
        };

        // A start event with no customParameters still proceeds, recording
        // both phone numbers as "unknown" rather than failing the call.
        let caller_phone = custom_parameters
            .as_ref()
            .and_then(|p| p.caller_phone.clone())
            .unwrap_or_else(|| "unknown".to_string());
        let restaurant_phone = custom_parameters
            .as_ref()
            .and_then(|p| p.restaurant_phone.clone())
            .unwrap_or_else(|| "unknown".to_string());

        info!(call_id = %call_id, "starting session");
        let session = Session::new(
            call_id,
            stream_id,
            caller_phone,
            restaurant_phone,
            media,
            state.ctx.clone(),
        );
        session.run(state.registry.clone()).await;
    })
}
