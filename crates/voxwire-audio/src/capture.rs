use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::device::LineProvider;
use crate::queue::{FrameQueue, FrameReceiver, FrameSender, SendOutcome};
use voxwire_foundation::{AudioError, AudioFormat, PipelineFrame};
use voxwire_telemetry::{FpsTracker, PipelineMetrics};

/// Owned handle to the dedicated capture thread. Cancellation is
/// cooperative: the loop polls the liveness flag once per read cycle, so
/// stop latency is bounded by roughly one cycle (~10 ms at the default
/// format).
pub struct CaptureThread {
    live: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl CaptureThread {
    /// Opens a capture session: validates the format against the device
    /// synchronously (an unsupported format aborts here, with nothing
    /// spawned and no resources allocated), then starts the background
    /// read loop feeding a bounded frame queue.
    pub fn spawn(
        provider: Arc<dyn LineProvider>,
        format: AudioFormat,
        queue_capacity: usize,
        metrics: Arc<PipelineMetrics>,
    ) -> Result<(Self, FrameReceiver), AudioError> {
        format.validate()?;
        provider.supports(&format)?;

        let (tx, rx) = FrameQueue::bounded(queue_capacity);
        let live = Arc::new(AtomicBool::new(true));
        let loop_live = Arc::clone(&live);

        let handle = thread::Builder::new()
            .name("voxwire-capture".to_string())
            .spawn(move || run_loop(provider, format, tx, loop_live, metrics))
            .map_err(|e| AudioError::Fatal(format!("Failed to spawn capture thread: {}", e)))?;

        Ok((Self { live, handle }, rx))
    }

    /// Clears the liveness flag without waiting for the loop to observe it.
    pub fn cancel(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    /// Cancels and joins. The queue closes once the loop's teardown guard
    /// has run, after the device line is stopped and closed.
    pub fn shutdown(self) {
        self.cancel();
        let _ = self.handle.join();
    }
}

fn run_loop(
    provider: Arc<dyn LineProvider>,
    format: AudioFormat,
    tx: FrameSender,
    live: Arc<AtomicBool>,
    metrics: Arc<PipelineMetrics>,
) {
    let chunk_bytes = format.read_chunk_bytes();
    let cycle = Duration::from_millis(10);

    let line = match provider.open(&format) {
        Ok(line) => line,
        Err(e) => {
            tracing::error!("Failed to open device line: {}", e);
            let _ = tx.try_send(PipelineFrame::CaptureError(e.to_string()));
            return;
        }
    };

    // Single teardown path: the guard stops and closes the line exactly
    // once, on every exit, before the sender drops and closes the queue.
    let mut line = scopeguard::guard(line, |mut line| {
        line.stop();
        line.close();
        tracing::debug!("Device line torn down");
    });

    if let Err(e) = line.start() {
        tracing::error!("Failed to start device line: {}", e);
        let _ = tx.try_send(PipelineFrame::CaptureError(e.to_string()));
        return;
    }

    tracing::info!(chunk_bytes, "Capture loop started");
    let mut buf = vec![0u8; chunk_bytes];
    let mut fps = FpsTracker::new();

    while live.load(Ordering::SeqCst) {
        match line.read(&mut buf) {
            Ok(0) => thread::sleep(cycle),
            Ok(n) => {
                metrics.increment_captured();
                if let Some(rate) = fps.tick() {
                    metrics.update_capture_fps(rate);
                }
                match tx.try_send(PipelineFrame::AudioInput(buf[..n].to_vec())) {
                    SendOutcome::Accepted => {}
                    SendOutcome::Dropped => {
                        metrics.increment_dropped();
                        tracing::trace!("Queue full, shed a {} byte frame", n);
                    }
                    SendOutcome::Closed => {
                        tracing::debug!("Frame queue consumer gone, stopping capture");
                        break;
                    }
                }
            }
            Err(e) => {
                tracing::error!("Device read failed: {}", e);
                metrics.increment_read_errors();
                // Best-effort sentinel so the consumer observes the loss
                let _ = tx.try_send(PipelineFrame::CaptureError(e.to_string()));
                break;
            }
        }
    }

    tracing::info!(
        captured = metrics.captured(),
        dropped = metrics.dropped(),
        "Capture loop exiting"
    );
}
