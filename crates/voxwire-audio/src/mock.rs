//! Scripted device lines for hardware-free testing.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::device::{DeviceLine, LineProvider};
use voxwire_foundation::{AudioError, AudioFormat};

/// One scripted outcome of a `read` call. After the script is exhausted
/// the line reads empty forever, idling the loop until it is cancelled.
#[derive(Debug, Clone)]
pub enum ScriptedRead {
    Data(Vec<u8>),
    Empty,
    Fail,
}

/// Lifecycle counters observable from the test after the line has been
/// moved onto the capture thread.
#[derive(Debug, Default)]
pub struct LineStats {
    pub opened: AtomicUsize,
    pub started: AtomicUsize,
    pub stopped: AtomicUsize,
    pub closed: AtomicUsize,
}

impl LineStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct MockLineProvider {
    script: Mutex<VecDeque<ScriptedRead>>,
    supported: bool,
    stats: Arc<LineStats>,
}

impl MockLineProvider {
    pub fn new(script: Vec<ScriptedRead>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            supported: true,
            stats: Arc::new(LineStats::default()),
        }
    }

    /// A provider that rejects every format, for exercising the
    /// synchronous start-failure path.
    pub fn unsupported() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            supported: false,
            stats: Arc::new(LineStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<LineStats> {
        Arc::clone(&self.stats)
    }
}

impl LineProvider for MockLineProvider {
    fn supports(&self, format: &AudioFormat) -> Result<(), AudioError> {
        if !self.supported {
            return Err(AudioError::FormatNotSupported {
                format: format!("{:?}", format),
            });
        }
        format.validate()
    }

    fn open(&self, format: &AudioFormat) -> Result<Box<dyn DeviceLine>, AudioError> {
        self.supports(format)?;
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        // The single line under test consumes the whole script
        let script = std::mem::take(&mut *self.script.lock());
        Ok(Box::new(MockLine {
            script,
            stats: Arc::clone(&self.stats),
        }))
    }
}

pub struct MockLine {
    script: VecDeque<ScriptedRead>,
    stats: Arc<LineStats>,
}

impl DeviceLine for MockLine {
    fn start(&mut self) -> Result<(), AudioError> {
        self.stats.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, AudioError> {
        match self.script.pop_front() {
            Some(ScriptedRead::Data(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            Some(ScriptedRead::Empty) | None => Ok(0),
            Some(ScriptedRead::Fail) => Err(AudioError::DeviceDisconnected),
        }
    }

    fn stop(&mut self) {
        self.stats.stopped.fetch_add(1, Ordering::SeqCst);
    }

    fn close(&mut self) {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
    }
}
