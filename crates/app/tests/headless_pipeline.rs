//! End-to-end pipeline test without hardware: scripted device line ->
//! capture thread -> frame queue -> dispatcher relay -> wire envelope.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use voxwire_audio::mock::{MockLineProvider, ScriptedRead};
use voxwire_foundation::{ControlSignal, PipelineFrame};
use voxwire_pipeline::{PipelineContext, PipelineDispatcher, ProcessorConfig};
use voxwire_telemetry::PipelineMetrics;
use voxwire_wire::{FrameSerializer, TelephonySerializer};

#[tokio::test]
async fn captured_audio_reaches_the_wire_as_media_envelopes() {
    let pcm: Vec<u8> = (0..64).collect();
    let provider = MockLineProvider::new(vec![ScriptedRead::Data(pcm.clone())]);
    let stats = provider.stats();

    let context = Arc::new(PipelineContext::new());
    context.register("audio-input", ProcessorConfig::default());
    let metrics = Arc::new(PipelineMetrics::default());
    let (pipeline_tx, mut pipeline_rx) = mpsc::channel(64);
    let dispatcher = PipelineDispatcher::new(
        Arc::clone(&context),
        Arc::new(provider),
        pipeline_tx,
        Arc::clone(&metrics),
    );

    dispatcher
        .handle_signal("audio-input", ControlSignal::from_type_tag("system/start"))
        .await
        .expect("start");

    let frame = timeout(Duration::from_secs(2), pipeline_rx.recv())
        .await
        .expect("frame within deadline")
        .expect("stream open");
    let PipelineFrame::AudioInput(payload) = frame else {
        panic!("expected captured audio");
    };
    assert_eq!(payload, pcm);

    // The transport-facing side serializes the pipeline's output frames
    let serializer = TelephonySerializer::new("MZtest");
    let json = serializer
        .serialize(&PipelineFrame::AudioOutput(payload))
        .expect("envelope");
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["event"], "media");
    assert_eq!(value["streamSid"], "MZtest");

    // And the inbound direction feeds frames back into the pipeline shape
    assert_eq!(
        serializer.deserialize(&json),
        Some(PipelineFrame::AudioInput(pcm))
    );

    dispatcher
        .handle_signal("audio-input", ControlSignal::from_type_tag("system/stop"))
        .await
        .expect("stop");
    assert_eq!(stats.closed(), 1);
    assert!(metrics.captured() >= 1);
    assert_eq!(metrics.relayed(), metrics.captured() - metrics.dropped());
}
