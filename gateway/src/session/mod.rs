//! Per-call session orchestrator (§4.7) — the single task that owns a
//! call end to end: one media leg, one model leg, one cart, one tool
//! router invocation at a time. Everything here runs on one `tokio::select!`
//! loop; no cart or leg state is ever touched from a second task.

pub mod state;

use crate::audio::{media_to_model, model_to_media};
use crate::audio_constants::{ORDER_FAREWELL_SECS, ORDER_TEARDOWN_GRACE_SECS, TRANSFER_PHRASE};
use crate::cart::Cart;
use crate::domain::{CallId, CallStatus};
use crate::legs::media_leg::{MediaEvent, MediaLeg};
use crate::legs::model_leg::{ModelEvent, ModelLeg, ModelLegConfig};
use crate::persistence::PersistenceGateway;
use crate::registry::{SessionHandle, SessionRegistry};
use crate::tools::{StashedCustomer, ToolRouter};
use crate::transfer::{self, TransferConfig};
use base64::Engine;
use state::{SessionFlags, SessionState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Result of handling one inbound media-leg event, distinguishing an
/// immediate teardown from a `stop` observed while `completeOrder` is
/// still running (§4.7's 8s deferred-teardown grace).
enum MediaOutcome {
    Continue,
    Stop,
    DeferredStop,
}

pub struct SessionContext<P: PersistenceGateway> {
    pub persistence: Arc<P>,
    pub restaurant_id: String,
    pub model_config: ModelLegConfig,
    pub transfer_config: TransferConfig,
    pub http_client: reqwest::Client,
}

/// Drives one call from its first `start` event to socket close.
pub struct Session<P: PersistenceGateway> {
    call_id: CallId,
    media: MediaLeg,
    cart: Cart,
    stash: StashedCustomer,
    tools: ToolRouter<P>,
    ctx: Arc<SessionContext<P>>,
    state: SessionState,
    flags: SessionFlags,
    caller_phone: String,
    restaurant_phone: String,
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    outcome: CallStatus,
    /// Accumulated model transcript, never reset during the session —
    /// scanned for the transfer phrase on every `turnComplete` (§4.7).
    transcript: String,
}

impl<P: PersistenceGateway + 'static> Session<P> {
    pub fn new(
        call_id: CallId,
        stream_id: String,
        caller_phone: String,
        restaurant_phone: String,
        media: MediaLeg,
        ctx: Arc<SessionContext<P>>,
    ) -> Self {
        let tools = ToolRouter::new(ctx.persistence.clone(), ctx.restaurant_id.clone());
        let mut media = media;
        media.set_stream_id(stream_id);
        Self {
            call_id,
            media,
            cart: Cart::new(),
            stash: StashedCustomer::default(),
            tools,
            ctx,
            state: SessionState::Init,
            flags: SessionFlags::new(),
            caller_phone,
            restaurant_phone,
            started_at: None,
            outcome: CallStatus::InProgress,
            transcript: String::new(),
        }
    }

    /// Connects the model leg and sends the pre-greeting injection. An
    /// abnormal close observed before the greeting goes out (either the
    /// initial connect or the greeting send itself) is retried through
    /// [`ModelLeg::reconnect_with_retries`]'s two-shot policy before
    /// escalating to a hard failure (§4.6).
    async fn connect_model_leg(
        config: &ModelLegConfig,
    ) -> Result<ModelLeg, crate::error::GatewayError> {
        match ModelLeg::connect(config).await {
            Ok(mut leg) => match leg.send_greeting_after_delay().await {
                Ok(()) => return Ok(leg),
                Err(e) => warn!(error = %e, "greeting send failed before any reply; reconnecting"),
            },
            Err(e) => warn!(error = %e, "initial model connect failed; reconnecting"),
        }
        let mut leg = ModelLeg::reconnect_with_retries(config).await?;
        leg.send_greeting_after_delay().await?;
        Ok(leg)
    }

    /// Runs the session to completion, registering it for shutdown
    /// broadcast while live. Never returns an error — every failure path
    /// ends the call gracefully and records a terminal status.
    pub async fn run(mut self, registry: Arc<SessionRegistry>) {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        registry.insert(
            self.call_id.clone(),
            SessionHandle {
                shutdown: shutdown_tx,
            },
        );

        self.state = SessionState::Connecting;

        // Create the call record first so every later terminal-status write
        // (including the one on a failed model-leg connect below) has a row
        // to land on.
        match self
            .ctx
            .persistence
            .create_call(&self.call_id, self.media.stream_id(), &self.caller_phone, &self.restaurant_phone)
            .await
        {
            Ok(created) => self.started_at = Some(created.started_at),
            Err(e) => warn!(call_id = %self.call_id, error = %e, "create_call failed"),
        }

        let mut model = match Self::connect_model_leg(&self.ctx.model_config).await {
            Ok(leg) => leg,
            Err(e) => {
                error!(call_id = %self.call_id, error = %e, "model leg connect failed");
                self.finish(CallStatus::Failed).await;
                registry.remove(&self.call_id);
                return;
            }
        };
        self.state = SessionState::Listening;

        let farewell = tokio::time::sleep(Duration::from_secs(u64::MAX));
        tokio::pin!(farewell);
        let teardown = tokio::time::sleep(Duration::from_secs(u64::MAX));
        tokio::pin!(teardown);
        let mut farewell_armed = false;
        let mut teardown_armed = false;
        // Set once the media leg has reported `stop`; a stop observed while
        // `orderInProgress` is true arms the teardown grace timer instead of
        // breaking immediately, so the in-flight `completeOrder` pipeline
        // can finish (§4.7). Once armed this way, the loop no longer reads
        // from the (now-closed) media leg.
        let mut media_stopped = false;

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!(call_id = %self.call_id, "shutdown signal received, tearing down session");
                    break;
                }

                _ = &mut farewell, if farewell_armed => {
                    farewell_armed = false;
                    teardown_armed = true;
                    teardown.as_mut().reset(tokio::time::Instant::now() + Duration::from_secs(ORDER_TEARDOWN_GRACE_SECS));
                }

                _ = &mut teardown, if teardown_armed => {
                    info!(call_id = %self.call_id, "post-order teardown grace elapsed");
                    break;
                }

                media_result = self.media.recv(), if !media_stopped => {
                    match media_result {
                        Ok(Some(event)) => {
                            match self.handle_media_event(event, &mut model).await {
                                MediaOutcome::Continue => {}
                                MediaOutcome::Stop => break,
                                MediaOutcome::DeferredStop => {
                                    info!(call_id = %self.call_id, "stop received with an order still in flight, deferring teardown");
                                    media_stopped = true;
                                    farewell_armed = false;
                                    teardown_armed = true;
                                    teardown.as_mut().reset(tokio::time::Instant::now() + Duration::from_secs(ORDER_TEARDOWN_GRACE_SECS));
                                }
                            }
                        }
                        Ok(None) => {}
                        Err(()) => {
                            warn!(call_id = %self.call_id, "media leg closed with an underlying error");
                            self.outcome = CallStatus::Failed;
                            break;
                        }
                    }
                }

                model_result = model.recv() => {
                    match model_result {
                        Ok(events) => {
                            for event in events {
                                self.handle_model_event(event, &mut model, &mut farewell_armed, &mut farewell).await;
                            }
                            // A deferred stop only needed to outlast the
                            // in-flight order; once it finishes there is no
                            // reason to hold the grace timer open further.
                            if media_stopped && !self.flags.order_in_progress {
                                break;
                            }
                        }
                        Err(()) => {
                            warn!(call_id = %self.call_id, "model leg closed unexpectedly");
                            self.outcome = CallStatus::Failed;
                            break;
                        }
                    }
                }
            }
        }

        self.state = SessionState::Terminating;
        let outcome = self.outcome;
        self.finish(outcome).await;
        registry.remove(&self.call_id);
    }

    async fn handle_media_event(&mut self, event: MediaEvent, model: &mut ModelLeg) -> MediaOutcome {
        match event {
            MediaEvent::Start { .. } => {
                warn!(call_id = %self.call_id, "ignoring duplicate start event on an already-started stream");
                MediaOutcome::Continue
            }
            MediaEvent::Media { payload } => {
                if self.flags.tool_call_in_progress {
                    return MediaOutcome::Continue;
                }
                let Ok(ulaw) = base64::engine::general_purpose::STANDARD.decode(&payload) else {
                    warn!(call_id = %self.call_id, "discarding undecodable media payload");
                    return MediaOutcome::Continue;
                };
                match media_to_model(&ulaw) {
                    Ok(pcm) => {
                        if let Err(e) = model.send_audio(&pcm).await {
                            warn!(call_id = %self.call_id, error = %e, "model audio send failed");
                        }
                    }
                    Err(e) => warn!(call_id = %self.call_id, error = %e, "media_to_model failed"),
                }
                MediaOutcome::Continue
            }
            MediaEvent::Stop {} => {
                info!(call_id = %self.call_id, "media leg reported stop");
                if self.flags.order_in_progress {
                    MediaOutcome::DeferredStop
                } else {
                    MediaOutcome::Stop
                }
            }
            MediaEvent::Dtmf {} | MediaEvent::Connected {} => MediaOutcome::Continue,
        }
    }

    async fn handle_model_event(
        &mut self,
        event: ModelEvent,
        model: &mut ModelLeg,
        farewell_armed: &mut bool,
        farewell: &mut std::pin::Pin<&mut tokio::time::Sleep>,
    ) {
        match event {
            ModelEvent::Audio(pcm) => {
                // A fragment of the just-cancelled turn arriving after
                // `interrupted` must be dropped, not forwarded — `was_interrupted`
                // clears on the next `turnComplete`, so new-turn audio still
                // latches `agent_speaking` and forwards normally.
                if self.flags.was_interrupted {
                    return;
                }
                self.flags.agent_speaking = true;
                match model_to_media(&pcm) {
                    Ok(ulaw) => self.media.send_media(&ulaw).await,
                    Err(e) => warn!(call_id = %self.call_id, error = %e, "model_to_media failed"),
                }
            }
            ModelEvent::Interrupted => {
                self.flags.was_interrupted = true;
                self.flags.agent_speaking = false;
                self.media.send_clear().await;
            }
            ModelEvent::TurnComplete => {
                self.flags.agent_speaking = false;
                self.flags.was_interrupted = false;
                // Scan the whole accumulated transcript (never reset during
                // the session), not just this turn's fragment — the phrase
                // can straddle transcript chunks.
                if !self.flags.transfer_triggered && self.transcript.contains(TRANSFER_PHRASE) {
                    self.flags.transfer_triggered = true;
                }
                // `transfer_triggered` itself is one-shot (false→true, never
                // reset); firing is additionally gated on outcome so a
                // second turnComplete after the transfer doesn't redial it.
                if self.flags.transfer_triggered && self.outcome != CallStatus::Escalated {
                    self.fire_transfer().await;
                }
                if self.outcome == CallStatus::Completed && !*farewell_armed {
                    *farewell_armed = true;
                    farewell
                        .as_mut()
                        .reset(tokio::time::Instant::now() + Duration::from_secs(ORDER_FAREWELL_SECS));
                }
            }
            ModelEvent::Transcript(text) => {
                self.transcript.push_str(&text);
            }
            ModelEvent::ToolCall(calls) => {
                self.flags.tool_call_in_progress = true;
                let mut responses = Vec::with_capacity(calls.len());
                for call in calls {
                    if call.name == "completeOrder" {
                        self.flags.order_in_progress = true;
                    }
                    let response = self
                        .tools
                        .dispatch(call, &mut self.cart, &self.call_id, &mut self.stash)
                        .await;
                    if response.name == "completeOrder" {
                        self.flags.order_in_progress = false;
                        if response.response["orderId"].is_number() {
                            self.outcome = CallStatus::Completed;
                        }
                    }
                    responses.push(response);
                }
                self.flags.tool_call_in_progress = false;

                // Suppress the reply entirely if the caller interrupted the
                // agent and no `turnComplete` has arrived since — the model
                // has already moved past this turn and an unsolicited
                // `toolResponse` would desync its turn state.
                if self.flags.suppresses_tool_response() {
                    warn!(call_id = %self.call_id, "suppressing tool response after barge-in with no intervening turnComplete");
                } else if let Err(e) = model.send_tool_response(&responses).await {
                    warn!(call_id = %self.call_id, error = %e, "tool response send failed");
                }
            }
        }
    }

    /// Fires the TransferController at most once per Session. A REST
    /// failure rolls back `transferTriggered` so a normal terminal can
    /// still apply on teardown, rather than stranding the call escalated
    /// in name only (§4.7, §7).
    async fn fire_transfer(&mut self) {
        match transfer::transfer_call(&self.ctx.http_client, &self.ctx.transfer_config, &self.call_id).await {
            Ok(()) => self.outcome = CallStatus::Escalated,
            Err(e) => {
                warn!(call_id = %self.call_id, error = %e, "transfer request failed, rolling back transfer flag");
                self.flags.transfer_triggered = false;
            }
        }
    }

    async fn finish(&self, outcome: CallStatus) {
        let result = match outcome {
            // A Session that never errored or transferred tears down as
            // `completed` by default — InProgress here means the call
            // ended normally (caller hangup, shutdown) without either.
            CallStatus::Completed | CallStatus::InProgress => {
                if let Some(started_at) = self.started_at {
                    self.ctx.persistence.complete_call(&self.call_id, started_at).await
                } else {
                    Ok(())
                }
            }
            CallStatus::Escalated => self.ctx.persistence.escalate_call(&self.call_id).await,
            _ => self.ctx.persistence.fail_call(&self.call_id, None).await,
        };
        if let Err(e) = result {
            warn!(call_id = %self.call_id, error = %e, "terminal persistence call failed");
        }
    }
}
