use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

use crate::FrameSerializer;
use voxwire_foundation::PipelineFrame;

const MEDIA_EVENT: &str = "media";

#[derive(Serialize)]
struct MediaEnvelope<'a> {
    event: &'a str,
    #[serde(rename = "streamSid")]
    stream_sid: &'a str,
    media: MediaPayload,
}

#[derive(Serialize)]
struct MediaPayload {
    payload: String,
}

/// Telephony media-stream profile: outbound audio becomes a `media` event
/// carrying base64 PCM under the bound stream SID; inbound `media` events
/// decode to audio-input frames and everything else is ignored.
pub struct TelephonySerializer {
    stream_sid: String,
}

impl TelephonySerializer {
    pub fn new(stream_sid: impl Into<String>) -> Self {
        Self {
            stream_sid: stream_sid.into(),
        }
    }

    pub fn stream_sid(&self) -> &str {
        &self.stream_sid
    }
}

impl FrameSerializer for TelephonySerializer {
    fn serialize(&self, frame: &PipelineFrame) -> Option<String> {
        let PipelineFrame::AudioOutput(payload) = frame else {
            return None;
        };
        let envelope = MediaEnvelope {
            event: MEDIA_EVENT,
            stream_sid: &self.stream_sid,
            media: MediaPayload {
                payload: STANDARD.encode(payload),
            },
        };
        match serde_json::to_string(&envelope) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!("Failed to encode media envelope: {}", e);
                None
            }
        }
    }

    fn deserialize(&self, raw: &str) -> Option<PipelineFrame> {
        // Accept any JSON object with event "media" and a base64 payload;
        // other events parse fine but produce no frame.
        let value: serde_json::Value = serde_json::from_str(raw).ok()?;
        if value.get("event")?.as_str()? != MEDIA_EVENT {
            return None;
        }
        let payload = value.get("media")?.get("payload")?.as_str()?;
        let bytes = STANDARD.decode(payload).ok()?;
        Some(PipelineFrame::AudioInput(bytes))
    }
}
