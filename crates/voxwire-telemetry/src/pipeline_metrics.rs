use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared metrics for cross-thread pipeline monitoring
#[derive(Clone, Default)]
pub struct PipelineMetrics {
    // Event counters
    pub frames_captured: Arc<AtomicU64>,
    pub frames_dropped: Arc<AtomicU64>,
    pub frames_relayed: Arc<AtomicU64>,
    pub read_errors: Arc<AtomicU64>,

    // Frame rate tracking
    pub capture_fps: Arc<AtomicU64>, // Frames per second * 10

    pub last_frame_time: Arc<RwLock<Option<Instant>>>,
}

impl PipelineMetrics {
    pub fn increment_captured(&self) {
        self.frames_captured.fetch_add(1, Ordering::Relaxed);
        *self.last_frame_time.write() = Some(Instant::now());
    }

    pub fn increment_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_relayed(&self) {
        self.frames_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_read_errors(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_capture_fps(&self, fps: f64) {
        self.capture_fps.store((fps * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn captured(&self) -> u64 {
        self.frames_captured.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    pub fn relayed(&self) -> u64 {
        self.frames_relayed.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct FpsTracker {
    last_update: Instant,
    frame_count: u64,
}

impl FpsTracker {
    pub fn new() -> Self {
        Self {
            last_update: Instant::now(),
            frame_count: 0,
        }
    }

    pub fn tick(&mut self) -> Option<f64> {
        self.frame_count += 1;
        let elapsed = self.last_update.elapsed();

        if elapsed >= Duration::from_secs(1) {
            let fps = self.frame_count as f64 / elapsed.as_secs_f64();
            self.last_update = Instant::now();
            self.frame_count = 0;
            Some(fps)
        } else {
            None
        }
    }
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self::new()
    }
}
