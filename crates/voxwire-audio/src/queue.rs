use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use voxwire_foundation::PipelineFrame;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Result of a non-blocking enqueue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Accepted,
    /// The queue was full; the new frame was shed, queued frames kept.
    Dropped,
    /// The consumer is gone.
    Closed,
}

/// Bounded single-producer single-consumer frame conduit. The producer
/// never blocks: a full queue sheds the newest frame (gaps, never
/// reorderings). Dropping the sender closes the queue; the receiver
/// drains what is already buffered and then observes end of stream.
pub struct FrameQueue;

impl FrameQueue {
    pub fn bounded(capacity: usize) -> (FrameSender, FrameReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        (
            FrameSender {
                tx,
                dropped: Arc::clone(&dropped),
            },
            FrameReceiver { rx, dropped },
        )
    }
}

pub struct FrameSender {
    tx: mpsc::Sender<PipelineFrame>,
    dropped: Arc<AtomicU64>,
}

impl FrameSender {
    pub fn try_send(&self, frame: PipelineFrame) -> SendOutcome {
        match self.tx.try_send(frame) {
            Ok(()) => SendOutcome::Accepted,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                SendOutcome::Dropped
            }
            Err(TrySendError::Closed(_)) => SendOutcome::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Frames shed since the queue was created.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

pub struct FrameReceiver {
    rx: mpsc::Receiver<PipelineFrame>,
    dropped: Arc<AtomicU64>,
}

impl FrameReceiver {
    /// Returns `None` once the queue is closed and drained.
    pub async fn recv(&mut self) -> Option<PipelineFrame> {
        self.rx.recv().await
    }

    /// Blocking variant for consumers outside the async scheduler.
    /// Must not be called from within a runtime.
    pub fn blocking_recv(&mut self) -> Option<PipelineFrame> {
        self.rx.blocking_recv()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: u8) -> PipelineFrame {
        PipelineFrame::AudioInput(vec![tag; 4])
    }

    #[tokio::test]
    async fn fifo_order_preserved() {
        let (tx, mut rx) = FrameQueue::bounded(8);
        for tag in 0..4u8 {
            assert_eq!(tx.try_send(frame(tag)), SendOutcome::Accepted);
        }
        for tag in 0..4u8 {
            assert_eq!(rx.recv().await, Some(frame(tag)));
        }
    }

    #[tokio::test]
    async fn full_queue_sheds_newest_frame() {
        // Capacity 2, already full when f2 arrives: the consumer sees
        // f1 and f3, never f2, never a reordering.
        let (tx, mut rx) = FrameQueue::bounded(2);
        assert_eq!(tx.try_send(frame(0)), SendOutcome::Accepted);
        assert_eq!(tx.try_send(frame(1)), SendOutcome::Accepted);
        assert_eq!(tx.try_send(frame(2)), SendOutcome::Dropped);
        assert_eq!(tx.dropped(), 1);

        assert_eq!(rx.recv().await, Some(frame(0)));
        assert_eq!(rx.recv().await, Some(frame(1)));

        assert_eq!(tx.try_send(frame(3)), SendOutcome::Accepted);
        assert_eq!(rx.recv().await, Some(frame(3)));
    }

    #[tokio::test]
    async fn queued_frames_survive_sender_drop() {
        let (tx, mut rx) = FrameQueue::bounded(4);
        tx.try_send(frame(9));
        drop(tx);
        assert_eq!(rx.recv().await, Some(frame(9)));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn send_after_receiver_drop_reports_closed() {
        let (tx, rx) = FrameQueue::bounded(4);
        drop(rx);
        assert_eq!(tx.try_send(frame(0)), SendOutcome::Closed);
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn zero_capacity_is_clamped_to_one() {
        let (tx, mut rx) = FrameQueue::bounded(0);
        assert_eq!(tx.try_send(frame(1)), SendOutcome::Accepted);
        assert_eq!(tx.try_send(frame(2)), SendOutcome::Dropped);
        assert_eq!(rx.recv().await, Some(frame(1)));
    }
}
