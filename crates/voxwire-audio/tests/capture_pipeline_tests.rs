//! Capture pipeline integration tests using scripted device lines.
//!
//! Tests cover: synchronous start failure, frame ordering, the read-failure
//! sentinel, single teardown, and drop-on-full backpressure.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use voxwire_audio::mock::{MockLineProvider, ScriptedRead};
use voxwire_audio::{CaptureThread, DEFAULT_QUEUE_CAPACITY};
use voxwire_foundation::{AudioError, AudioFormat, PipelineFrame};
use voxwire_telemetry::PipelineMetrics;

fn spawn_with(
    provider: MockLineProvider,
    queue_capacity: usize,
) -> (
    Arc<voxwire_audio::mock::LineStats>,
    CaptureThread,
    voxwire_audio::FrameReceiver,
) {
    let stats = provider.stats();
    let (capture, rx) = CaptureThread::spawn(
        Arc::new(provider),
        AudioFormat::default(),
        queue_capacity,
        Arc::new(PipelineMetrics::default()),
    )
    .expect("spawn should succeed");
    (stats, capture, rx)
}

// ─── Start Failure ──────────────────────────────────────────────────

#[test]
fn unsupported_format_fails_start_without_opening() {
    let provider = MockLineProvider::unsupported();
    let stats = provider.stats();

    let result = CaptureThread::spawn(
        Arc::new(provider),
        AudioFormat::default(),
        DEFAULT_QUEUE_CAPACITY,
        Arc::new(PipelineMetrics::default()),
    );

    assert!(matches!(
        result,
        Err(AudioError::FormatNotSupported { .. })
    ));
    assert_eq!(stats.opened(), 0);
    assert_eq!(stats.closed(), 0);
}

#[test]
fn invalid_format_fails_before_touching_the_device() {
    let provider = MockLineProvider::new(vec![]);
    let stats = provider.stats();

    let result = CaptureThread::spawn(
        Arc::new(provider),
        AudioFormat::new(0, 16, 1),
        DEFAULT_QUEUE_CAPACITY,
        Arc::new(PipelineMetrics::default()),
    );

    assert!(result.is_err());
    assert_eq!(stats.opened(), 0);
}

// ─── Frame Flow ─────────────────────────────────────────────────────

#[test]
fn frames_arrive_in_production_order() {
    let provider = MockLineProvider::new(vec![
        ScriptedRead::Data(vec![1; 8]),
        ScriptedRead::Data(vec![2; 8]),
        ScriptedRead::Data(vec![3; 8]),
    ]);
    let (stats, capture, mut rx) = spawn_with(provider, DEFAULT_QUEUE_CAPACITY);

    for tag in 1..=3u8 {
        assert_eq!(rx.blocking_recv(), Some(PipelineFrame::AudioInput(vec![tag; 8])));
    }

    capture.shutdown();
    assert_eq!(rx.blocking_recv(), None);
    assert_eq!(stats.opened(), 1);
    assert_eq!(stats.started(), 1);
    assert_eq!(stats.stopped(), 1);
    assert_eq!(stats.closed(), 1);
}

#[test]
fn read_buffer_is_one_ten_millisecond_chunk() {
    // Device offers more than one chunk; the loop reads at most
    // read_chunk_bytes (320 at the default format) per cycle.
    let provider = MockLineProvider::new(vec![ScriptedRead::Data(vec![7; 400])]);
    let (_stats, capture, mut rx) = spawn_with(provider, DEFAULT_QUEUE_CAPACITY);

    match rx.blocking_recv() {
        Some(PipelineFrame::AudioInput(payload)) => assert_eq!(payload.len(), 320),
        other => panic!("expected an audio frame, got {:?}", other),
    }
    capture.shutdown();
}

#[test]
fn empty_reads_produce_no_frames() {
    let provider = MockLineProvider::new(vec![
        ScriptedRead::Empty,
        ScriptedRead::Data(vec![5; 8]),
        ScriptedRead::Empty,
    ]);
    let (_stats, capture, mut rx) = spawn_with(provider, DEFAULT_QUEUE_CAPACITY);

    assert_eq!(rx.blocking_recv(), Some(PipelineFrame::AudioInput(vec![5; 8])));
    capture.shutdown();
    assert_eq!(rx.blocking_recv(), None);
}

// ─── Read Failure ───────────────────────────────────────────────────

#[test]
fn read_failure_delivers_sentinel_then_closes_queue() {
    let provider = MockLineProvider::new(vec![
        ScriptedRead::Data(vec![1; 8]),
        ScriptedRead::Fail,
    ]);
    let (stats, capture, mut rx) = spawn_with(provider, DEFAULT_QUEUE_CAPACITY);

    assert_eq!(rx.blocking_recv(), Some(PipelineFrame::AudioInput(vec![1; 8])));
    match rx.blocking_recv() {
        Some(PipelineFrame::CaptureError(_)) => {}
        other => panic!("expected the error sentinel, got {:?}", other),
    }
    // Queue closes after the loop's own teardown has run
    assert_eq!(rx.blocking_recv(), None);
    assert_eq!(stats.stopped(), 1);
    assert_eq!(stats.closed(), 1);

    // Joining an already-dead loop is harmless
    capture.shutdown();
    assert_eq!(stats.closed(), 1);
}

// ─── Teardown ───────────────────────────────────────────────────────

#[test]
fn cancel_stops_an_idle_loop_within_bounded_time() {
    let provider = MockLineProvider::new(vec![]);
    let (stats, capture, mut rx) = spawn_with(provider, DEFAULT_QUEUE_CAPACITY);

    capture.shutdown();
    assert_eq!(rx.blocking_recv(), None);
    assert_eq!(stats.stopped(), 1);
    assert_eq!(stats.closed(), 1);
}

#[test]
fn dropped_receiver_terminates_the_loop() {
    let script: Vec<ScriptedRead> = (0..32).map(|i| ScriptedRead::Data(vec![i as u8; 8])).collect();
    let provider = MockLineProvider::new(script);
    let (stats, capture, rx) = spawn_with(provider, 4);

    drop(rx);
    // The loop observes Closed on its next send and exits on its own
    capture.shutdown();
    assert_eq!(stats.closed(), 1);
}

// ─── Backpressure ───────────────────────────────────────────────────

#[test]
fn overflow_yields_a_prefix_with_gaps() {
    let script: Vec<ScriptedRead> = (0..50).map(|i| ScriptedRead::Data(vec![i as u8; 8])).collect();
    let provider = MockLineProvider::new(script);
    let (_stats, capture, mut rx) = spawn_with(provider, 4);

    // Let the producer run the whole script against an undrained queue
    thread::sleep(Duration::from_millis(200));
    capture.shutdown();

    let mut observed = Vec::new();
    while let Some(frame) = rx.blocking_recv() {
        match frame {
            PipelineFrame::AudioInput(payload) => observed.push(payload[0]),
            other => panic!("unexpected frame {:?}", other),
        }
    }

    assert!(!observed.is_empty());
    // No duplicates, no reorderings: tags strictly increase
    assert!(observed.windows(2).all(|w| w[0] < w[1]));
    // Every produced frame was either delivered or counted as shed
    assert_eq!(observed.len() as u64 + rx.dropped(), 50);
}
