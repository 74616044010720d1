use std::sync::Arc;
use tokio::sync::mpsc;

use crate::state::{CaptureHandle, PipelineContext};
use voxwire_audio::{CaptureThread, FrameReceiver, LineProvider};
use voxwire_foundation::{AppError, ControlSignal, PipelineFrame};
use voxwire_telemetry::PipelineMetrics;

/// Routes lifecycle control signals for capture processors and relays
/// queued audio frames into the main pipeline stream.
///
/// A processor is `Idle` when its handle slot is empty and `Capturing`
/// when it holds a running capture. Start on a capturing processor is
/// rejected in place; stop without a running capture is a no-op; any
/// signal that is neither start nor stop routes to the cleanup path.
pub struct PipelineDispatcher {
    context: Arc<PipelineContext>,
    provider: Arc<dyn LineProvider>,
    pipeline_tx: mpsc::Sender<PipelineFrame>,
    metrics: Arc<PipelineMetrics>,
}

impl PipelineDispatcher {
    pub fn new(
        context: Arc<PipelineContext>,
        provider: Arc<dyn LineProvider>,
        pipeline_tx: mpsc::Sender<PipelineFrame>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            context,
            provider,
            pipeline_tx,
            metrics,
        }
    }

    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    pub async fn handle_signal(
        &self,
        processor_id: &str,
        signal: ControlSignal,
    ) -> Result<(), AppError> {
        match signal {
            ControlSignal::Start => self.start_capture(processor_id),
            ControlSignal::Stop => self.stop_capture(processor_id).await,
            ControlSignal::Other => {
                tracing::debug!(processor_id, "Unrecognized signal, routing to cleanup");
                self.stop_capture(processor_id).await
            }
        }
    }

    fn start_capture(&self, processor_id: &str) -> Result<(), AppError> {
        let state = self
            .context
            .processor(processor_id)
            .ok_or_else(|| AppError::UnknownProcessor {
                id: processor_id.to_string(),
            })?;

        // The slot lock spans the occupancy check and the install, so two
        // concurrent starts cannot both spawn.
        let mut slot = state.capture.lock();
        if slot.is_some() {
            tracing::warn!(processor_id, "Capture already running, start rejected");
            return Ok(());
        }

        let config = state.config();
        let (thread, receiver) = CaptureThread::spawn(
            Arc::clone(&self.provider),
            config.format,
            config.queue_capacity,
            Arc::clone(&self.metrics),
        )?;
        let relay = tokio::spawn(relay_frames(
            receiver,
            self.pipeline_tx.clone(),
            Arc::clone(&self.metrics),
        ));
        *slot = Some(CaptureHandle { thread, relay });

        tracing::info!(
            processor_id,
            sample_rate_hz = config.format.sample_rate_hz,
            queue_capacity = config.queue_capacity,
            "Capture started"
        );
        Ok(())
    }

    async fn stop_capture(&self, processor_id: &str) -> Result<(), AppError> {
        let Some(state) = self.context.processor(processor_id) else {
            tracing::debug!(processor_id, "Stop for unknown processor, nothing to do");
            return Ok(());
        };

        let taken = state.capture.lock().take();
        match taken {
            Some(handle) => {
                // Cancel and join the capture thread; device teardown runs
                // on its own guard path, never here.
                handle.thread.shutdown();
                // The queue is closed now, so the relay drains and exits
                let _ = handle.relay.await;
                tracing::info!(processor_id, "Capture stopped");
            }
            None => {
                tracing::debug!(processor_id, "Stop with no active capture, nothing to do");
            }
        }
        Ok(())
    }
}

async fn relay_frames(
    mut receiver: FrameReceiver,
    pipeline_tx: mpsc::Sender<PipelineFrame>,
    metrics: Arc<PipelineMetrics>,
) {
    while let Some(frame) = receiver.recv().await {
        if let PipelineFrame::CaptureError(reason) = &frame {
            tracing::warn!(%reason, "Capture loop reported a device failure");
        }
        metrics.increment_relayed();
        if pipeline_tx.send(frame).await.is_err() {
            tracing::debug!("Pipeline stream closed, relay exiting");
            return;
        }
    }
    tracing::debug!("Frame queue closed, relay drained");
}
