//! Duplex framed channel to the telephony provider (§4.5).
//!
//! Inbound frames arrive as discriminated JSON events over a single
//! full-duplex WebSocket. Non-JSON frames are discarded; malformed JSON
//! does not terminate the leg — only the socket closing or erroring does.

use axum::extract::ws::{Message, WebSocket};
use base64::Engine;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Inbound event vocabulary (§4.5).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum MediaEvent {
    Start {
        #[serde(rename = "callId")]
        call_id: String,
        #[serde(rename = "streamId")]
        stream_id: String,
        #[serde(rename = "customParameters", default)]
        custom_parameters: Option<CustomParameters>,
    },
    Media {
        payload: String,
    },
    Stop {},
    Dtmf {},
    Connected {},
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CustomParameters {
    #[serde(rename = "callerPhone", default)]
    pub caller_phone: Option<String>,
    #[serde(rename = "restaurantPhone", default)]
    pub restaurant_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum OutboundFrame<'a> {
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: &'a str,
        payload: String,
    },
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: &'a str,
    },
}

pub struct MediaLeg {
    tx: SplitSink<WebSocket, Message>,
    rx: SplitStream<WebSocket>,
    stream_id: Option<String>,
    open: bool,
}

impl MediaLeg {
    pub fn new(socket: WebSocket) -> Self {
        let (tx, rx) = socket.split();
        Self {
            tx,
            rx,
            stream_id: None,
            open: true,
        }
    }

    pub fn set_stream_id(&mut self, stream_id: String) {
        self.stream_id = Some(stream_id);
    }

    pub fn stream_id(&self) -> &str {
        self.stream_id.as_deref().unwrap_or_default()
    }

    /// Wait for the next inbound frame. Non-JSON/unparseable frames are
    /// discarded (returns `Ok(None)`, not an error) so a single malformed
    /// frame never terminates the leg. Returns `Err` only when the
    /// underlying socket closes or errors — the terminal condition §4.5
    /// drives into Session close.
    pub async fn recv(&mut self) -> Result<Option<MediaEvent>, ()> {
        match self.rx.next().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<MediaEvent>(&text) {
                Ok(event) => Ok(Some(event)),
                Err(e) => {
                    debug!(error = %e, "discarding malformed media-leg frame");
                    Ok(None)
                }
            },
            Some(Ok(Message::Close(_))) | None => Err(()),
            Some(Ok(_other)) => Ok(None),
            Some(Err(e)) => {
                warn!(error = %e, "media leg socket error");
                Err(())
            }
        }
    }

    /// Send a model-speech audio frame toward the caller.
    pub async fn send_media(&mut self, ulaw_payload: &[u8]) {
        let Some(stream_sid) = self.stream_id.clone() else {
            warn!("send_media skipped: stream not yet started");
            return;
        };
        if !self.open {
            warn!("send_media skipped: socket not open");
            return;
        }
        let payload = base64::engine::general_purpose::STANDARD.encode(ulaw_payload);
        let frame = OutboundFrame::Media {
            stream_sid: &stream_sid,
            payload,
        };
        self.send_frame(&frame).await;
    }

    /// Flush any queued caller-directed audio, e.g. on barge-in.
    pub async fn send_clear(&mut self) {
        let Some(stream_sid) = self.stream_id.clone() else {
            warn!("send_clear skipped: stream not yet started");
            return;
        };
        if !self.open {
            warn!("send_clear skipped: socket not open");
            return;
        }
        let frame = OutboundFrame::Clear {
            stream_sid: &stream_sid,
        };
        self.send_frame(&frame).await;
    }

    async fn send_frame(&mut self, frame: &OutboundFrame<'_>) {
        let text = match serde_json::to_string(frame) {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "failed to encode outbound media-leg frame");
                return;
            }
        };
        if self.tx.send(Message::Text(text)).await.is_err() {
            self.open = false;
            warn!("media leg send failed; marking socket closed");
        }
    }
}
