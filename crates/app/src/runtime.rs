use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use voxwire_audio::CpalLineProvider;
use voxwire_foundation::{AudioFormat, ControlSignal, PipelineFrame};
use voxwire_pipeline::{PipelineContext, PipelineDispatcher, ProcessorConfig};
use voxwire_telemetry::PipelineMetrics;
use voxwire_wire::{FrameSerializer, TelephonySerializer};

pub const MIC_PROCESSOR: &str = "audio-input";

/// Depth of the main pipeline stream between the relay and the sink.
const PIPELINE_STREAM_CAPACITY: usize = 256;

pub struct RuntimeOptions {
    pub device: Option<String>,
    pub format: AudioFormat,
    pub queue_capacity: usize,
    pub stream_sid: String,
    pub emit_envelopes: bool,
}

pub async fn run(opts: RuntimeOptions) -> Result<()> {
    let context = Arc::new(PipelineContext::new());
    context.register(
        MIC_PROCESSOR,
        ProcessorConfig {
            format: opts.format,
            queue_capacity: opts.queue_capacity,
        },
    );

    let metrics = Arc::new(PipelineMetrics::default());
    let (pipeline_tx, pipeline_rx) = mpsc::channel::<PipelineFrame>(PIPELINE_STREAM_CAPACITY);
    let dispatcher = PipelineDispatcher::new(
        Arc::clone(&context),
        Arc::new(CpalLineProvider::new(opts.device.clone())),
        pipeline_tx,
        Arc::clone(&metrics),
    );

    let serializer = opts
        .emit_envelopes
        .then(|| TelephonySerializer::new(opts.stream_sid.clone()));
    let sink = spawn_sink(pipeline_rx, serializer);

    dispatcher
        .handle_signal(MIC_PROCESSOR, ControlSignal::from_type_tag("system/start"))
        .await?;
    info!("Capture running; press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    dispatcher
        .handle_signal(MIC_PROCESSOR, ControlSignal::from_type_tag("system/stop"))
        .await?;

    // Dropping the dispatcher releases the pipeline stream so the sink
    // drains what is left and exits
    drop(dispatcher);
    let _ = sink.await;

    info!(
        captured = metrics.captured(),
        dropped = metrics.dropped(),
        relayed = metrics.relayed(),
        "Pipeline stopped"
    );
    Ok(())
}

fn spawn_sink(
    mut pipeline_rx: mpsc::Receiver<PipelineFrame>,
    serializer: Option<TelephonySerializer>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = pipeline_rx.recv().await {
            match frame {
                PipelineFrame::CaptureError(reason) => {
                    tracing::warn!(%reason, "Capture ended after a device failure");
                }
                PipelineFrame::AudioInput(payload) | PipelineFrame::AudioOutput(payload) => {
                    tracing::trace!("Sink received a {} byte frame", payload.len());
                    if let Some(serializer) = &serializer {
                        // Loop captured audio straight back out in the wire shape
                        if let Some(json) =
                            serializer.serialize(&PipelineFrame::AudioOutput(payload))
                        {
                            println!("{}", json);
                        }
                    }
                }
            }
        }
        tracing::debug!("Pipeline stream closed, sink exiting");
    })
}
