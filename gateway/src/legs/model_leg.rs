//! Duplex session with the generative-speech service (§4.6).
//!
//! Connect-time configuration is fixed: audio-only output modality, a
//! named voice, the system instruction text, tool declarations, enabled
//! input/output transcription, and a VAD tuned for telephony noise.

use crate::audio_constants::{
    GREETING_DELAY_MS, MODEL_RECONNECT_ATTEMPTS, MODEL_RECONNECT_DELAY_MS,
};
use crate::tools::ToolCallRequest;
use base64::Engine;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

/// Voice activity detector tuning applied at connect time — empirically
/// chosen for telephony-band noise (§4.6).
#[derive(Debug, Clone)]
pub struct VadTuning {
    pub start_of_speech_sensitivity: &'static str,
    pub end_of_speech_sensitivity: &'static str,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
}

impl Default for VadTuning {
    fn default() -> Self {
        Self {
            start_of_speech_sensitivity: "HIGH",
            end_of_speech_sensitivity: "LOW",
            prefix_padding_ms: 200,
            silence_duration_ms: 600,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelLegConfig {
    pub endpoint: String,
    pub api_key: String,
    pub voice: String,
    pub system_instruction: String,
    pub tool_declarations: Value,
    pub vad: VadTuning,
}

/// Inbound message vocabulary (§4.6) — each message may carry any subset
/// of these; parsing yields zero or more [`ModelEvent`]s per message.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    Audio(Vec<u8>),
    Transcript(String),
    Interrupted,
    TurnComplete,
    ToolCall(Vec<ToolCallRequest>),
}

#[derive(Debug, Deserialize, Default)]
struct InboundMessage {
    #[serde(default, rename = "serverContent")]
    server_content: Option<ServerContent>,
    #[serde(default, rename = "toolCall")]
    tool_call: Option<ToolCallBatch>,
}

#[derive(Debug, Deserialize, Default)]
struct ServerContent {
    #[serde(default, rename = "modelTurn")]
    model_turn: Option<ModelTurn>,
    #[serde(default, rename = "outputTranscription")]
    output_transcription: Option<TranscriptionChunk>,
    #[serde(default)]
    interrupted: Option<bool>,
    #[serde(default, rename = "turnComplete")]
    turn_complete: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ModelTurn {
    #[serde(default)]
    parts: Vec<ModelPart>,
}

#[derive(Debug, Deserialize)]
struct ModelPart {
    #[serde(default, rename = "inlineData")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionChunk {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ToolCallBatch {
    #[serde(rename = "functionCalls")]
    function_calls: Vec<ToolCallRequest>,
}

/// Parse a single inbound wire message into zero or more [`ModelEvent`]s,
/// emitted audio before transcript before lifecycle flags before tool
/// calls.
pub fn parse_inbound(text: &str) -> Result<Vec<ModelEvent>, serde_json::Error> {
    let msg: InboundMessage = serde_json::from_str(text)?;
    let mut events = Vec::new();

    if let Some(sc) = &msg.server_content {
        if let Some(turn) = &sc.model_turn {
            for part in &turn.parts {
                if let Some(inline) = &part.inline_data {
                    if let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(&inline.data) {
                        events.push(ModelEvent::Audio(bytes));
                    }
                }
            }
        }
        if let Some(t) = &sc.output_transcription {
            events.push(ModelEvent::Transcript(t.text.clone()));
        }
        if sc.interrupted == Some(true) {
            events.push(ModelEvent::Interrupted);
        }
        if sc.turn_complete == Some(true) {
            events.push(ModelEvent::TurnComplete);
        }
    }

    if let Some(batch) = msg.tool_call {
        events.push(ModelEvent::ToolCall(batch.function_calls));
    }

    Ok(events)
}

/// `sendToolResponse(list)` payload shape.
#[derive(Debug, Serialize)]
struct ToolResponseWire<'a> {
    #[serde(rename = "toolResponse")]
    tool_response: ToolResponseBody<'a>,
}

#[derive(Debug, Serialize)]
struct ToolResponseBody<'a> {
    #[serde(rename = "functionResponses")]
    function_responses: &'a [crate::tools::ToolCallResponse],
}

pub fn encode_tool_response(responses: &[crate::tools::ToolCallResponse]) -> String {
    serde_json::to_string(&ToolResponseWire {
        tool_response: ToolResponseBody {
            function_responses: responses,
        },
    })
    .expect("tool response serializes")
}

pub fn encode_audio_frame(pcm16_le: &[u8]) -> String {
    let payload = base64::engine::general_purpose::STANDARD.encode(pcm16_le);
    json!({
        "realtimeInput": { "mediaChunks": [{ "mimeType": "audio/pcm", "data": payload }] }
    })
    .to_string()
}

/// An injected user-role turn that forces the agent to speak next — used
/// once at session open to trigger the greeting.
pub fn encode_greeting_turn() -> String {
    json!({
        "clientContent": {
            "turns": [{ "role": "user", "parts": [{ "text": "(call connected)" }] }],
            "turnComplete": true,
        }
    })
    .to_string()
}

pub fn encode_connect_config(config: &ModelLegConfig) -> String {
    json!({
        "setup": {
            "model": "generative-speech",
            "generationConfig": { "responseModalities": ["AUDIO"], "speechConfig": { "voiceConfig": { "voiceName": config.voice } } },
            "systemInstruction": { "parts": [{ "text": config.system_instruction }] },
            "tools": [config.tool_declarations.clone()],
            "inputAudioTranscription": {},
            "outputAudioTranscription": {},
            "realtimeInputConfig": {
                "automaticActivityDetection": {
                    "startOfSpeechSensitivity": config.vad.start_of_speech_sensitivity,
                    "endOfSpeechSensitivity": config.vad.end_of_speech_sensitivity,
                    "prefixPaddingMs": config.vad.prefix_padding_ms,
                    "silenceDurationMs": config.vad.silence_duration_ms,
                }
            },
        }
    })
    .to_string()
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

pub struct ModelLeg {
    tx: WsSink,
    rx: WsStream,
    greeted: bool,
}

impl ModelLeg {
    /// Connect and send the fixed setup configuration. Does not yet send
    /// the greeting — callers must call [`Self::send_greeting_after_delay`]
    /// once, per the 500 ms open-race mitigation (§4.6).
    pub async fn connect(config: &ModelLegConfig) -> Result<Self, crate::error::GatewayError> {
        let mut request = config
            .endpoint
            .as_str()
            .into_client_request()
            .map_err(|e| crate::error::GatewayError::Permanent(format!("model request: {e}")))?;
        request.headers_mut().insert(
            "x-goog-api-key",
            config
                .api_key
                .parse()
                .map_err(|e| crate::error::GatewayError::Permanent(format!("model api key: {e}")))?,
        );
        let (ws, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| crate::error::GatewayError::Permanent(format!("model connect: {e}")))?;
        let (mut tx, rx) = ws.split();
        tx.send(Message::Text(encode_connect_config(config)))
            .await
            .map_err(|e| crate::error::GatewayError::Permanent(format!("model setup send: {e}")))?;
        Ok(Self {
            tx,
            rx,
            greeted: false,
        })
    }

    /// Reconnect after an abnormal close observed before the greeting was
    /// sent, per the two-shot reconnect policy in §4.6.
    pub async fn reconnect_with_retries(
        config: &ModelLegConfig,
    ) -> Result<Self, crate::error::GatewayError> {
        let mut last_err = None;
        for _ in 0..MODEL_RECONNECT_ATTEMPTS {
            tokio::time::sleep(std::time::Duration::from_millis(MODEL_RECONNECT_DELAY_MS)).await;
            match Self::connect(config).await {
                Ok(leg) => return Ok(leg),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            crate::error::GatewayError::Permanent("model leg reconnect exhausted".into())
        }))
    }

    pub fn has_greeted(&self) -> bool {
        self.greeted
    }

    pub async fn send_greeting_after_delay(&mut self) -> Result<(), crate::error::GatewayError> {
        tokio::time::sleep(std::time::Duration::from_millis(GREETING_DELAY_MS)).await;
        self.tx
            .send(Message::Text(encode_greeting_turn()))
            .await
            .map_err(|e| crate::error::GatewayError::Transient(format!("greeting send: {e}")))?;
        self.greeted = true;
        Ok(())
    }

    pub async fn send_audio(&mut self, pcm16_le: &[u8]) -> Result<(), crate::error::GatewayError> {
        self.tx
            .send(Message::Text(encode_audio_frame(pcm16_le)))
            .await
            .map_err(|e| crate::error::GatewayError::Transient(format!("audio send: {e}")))
    }

    pub async fn send_tool_response(
        &mut self,
        responses: &[crate::tools::ToolCallResponse],
    ) -> Result<(), crate::error::GatewayError> {
        self.tx
            .send(Message::Text(encode_tool_response(responses)))
            .await
            .map_err(|e| crate::error::GatewayError::Transient(format!("tool response send: {e}")))
    }

    /// Wait for the next inbound message, parsed into zero or more events.
    /// Returns `Err(())` on abnormal close, mirroring the media leg's
    /// contract so the orchestrator can treat both legs uniformly.
    pub async fn recv(&mut self) -> Result<Vec<ModelEvent>, ()> {
        match self.rx.next().await {
            Some(Ok(Message::Text(text))) => match parse_inbound(&text) {
                Ok(events) => Ok(events),
                Err(e) => {
                    debug!(error = %e, "discarding malformed model-leg frame");
                    Ok(Vec::new())
                }
            },
            Some(Ok(Message::Close(_))) | None => Err(()),
            Some(Ok(_other)) => Ok(Vec::new()),
            Some(Err(e)) => {
                warn!(error = %e, "model leg socket error");
                Err(())
            }
        }
    }
}
