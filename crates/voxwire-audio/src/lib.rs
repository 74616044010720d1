pub mod capture;
pub mod device;
pub mod mock;
pub mod queue;
pub mod ring_buffer;

// Public API
pub use capture::CaptureThread;
pub use device::{CpalLineProvider, DeviceLine, LineProvider};
pub use queue::{FrameQueue, FrameReceiver, FrameSender, SendOutcome, DEFAULT_QUEUE_CAPACITY};
pub use ring_buffer::ByteRingBuffer;
