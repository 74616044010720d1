pub mod telephony;

pub use telephony::TelephonySerializer;

use voxwire_foundation::PipelineFrame;

/// Bidirectional adapter between internal frames and one external
/// transport's envelope shape, bound to a single call/session identity.
///
/// Implementations are stateless beyond that identity and safe to invoke
/// concurrently. `None` on either direction means "not for this profile",
/// never an error: outbound, only audio destined for the wire serializes;
/// inbound, unknown or malformed messages are ignored.
pub trait FrameSerializer: Send + Sync {
    fn serialize(&self, frame: &PipelineFrame) -> Option<String>;
    fn deserialize(&self, raw: &str) -> Option<PipelineFrame>;
}
