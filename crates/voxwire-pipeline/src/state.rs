use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

use voxwire_audio::{CaptureThread, DEFAULT_QUEUE_CAPACITY};
use voxwire_foundation::AudioFormat;

/// Per-processor capture configuration, fixed at registration.
#[derive(Debug, Clone, Copy)]
pub struct ProcessorConfig {
    pub format: AudioFormat,
    pub queue_capacity: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// The running pieces of one capture session: the capture thread and the
/// relay task draining its queue.
pub(crate) struct CaptureHandle {
    pub thread: CaptureThread,
    pub relay: JoinHandle<()>,
}

/// Mutable per-processor record. The handle slot is `Some` iff a capture
/// loop is currently running for this processor; all slot updates happen
/// under one lock so a start and a stop cannot interleave.
pub struct ProcessorState {
    config: ProcessorConfig,
    pub(crate) capture: Mutex<Option<CaptureHandle>>,
}

impl ProcessorState {
    fn new(config: ProcessorConfig) -> Self {
        Self {
            config,
            capture: Mutex::new(None),
        }
    }

    pub fn config(&self) -> ProcessorConfig {
        self.config
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.lock().is_some()
    }
}

/// Shared state for every registered processor, passed by reference to
/// dispatcher operations.
#[derive(Default)]
pub struct PipelineContext {
    processors: RwLock<HashMap<String, Arc<ProcessorState>>>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: impl Into<String>, config: ProcessorConfig) -> Arc<ProcessorState> {
        let state = Arc::new(ProcessorState::new(config));
        self.processors
            .write()
            .insert(id.into(), Arc::clone(&state));
        state
    }

    pub fn processor(&self, id: &str) -> Option<Arc<ProcessorState>> {
        self.processors.read().get(id).cloned()
    }
}
