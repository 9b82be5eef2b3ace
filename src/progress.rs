//! Progress reporting and cancellation support.
//!
//! This module provides [`ProgressCallback`] for monitoring batch operations,
//! [`CancellationToken`] for cooperative cancellation, and [`ProgressInfo`]
//! for progress snapshots.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framewise::{ExtractOptions, FrameExtractor, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("[{:?}] {pct:.1}% complete", info.operation);
//!         }
//!     }
//! }
//!
//! # async fn example() {
//! let options = ExtractOptions::new().with_progress(Arc::new(PrintProgress));
//! let extractor = FrameExtractor::new(options);
//! let results = extractor.extract_batch("input.mp4", &[0, 30, 60], 30.0).await;
//! # }
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// The kind of operation currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Extracting exact frames.
    FrameExtraction,
    /// Probing media files for frame timing.
    Probing,
}

/// A snapshot of batch progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// How many items have completed so far, successfully or not.
    pub current: u64,
    /// Total items expected.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the operation started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// The frame index that just completed (extraction only).
    pub current_frame: Option<u64>,
}

/// Trait for receiving progress updates.
///
/// Implementations must be [`Send`] and [`Sync`] because callbacks are
/// invoked from whichever task completes a unit of work.
///
/// Progress callbacks are **infallible** — they observe but cannot halt
/// the operation. Use [`CancellationToken`] for cooperative cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Called once per completed item.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it between tasks; call
/// [`cancel`](CancellationToken::cancel) from anywhere to stop the
/// associated batch.
///
/// # Example
///
/// ```
/// use framewise::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks progress timing and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one completed item and fire the callback.
    pub(crate) fn advance(&mut self, frame_index: Option<u64>) {
        self.current += 1;
        self.report(frame_index);
    }

    fn report(&self, frame_index: Option<u64>) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .filter(|&t| t > 0)
            .map(|t| (self.current as f32 / t as f32) * 100.0);

        let estimated_remaining = if self.current > 0 {
            self.total.and_then(|t| {
                let remaining = t.saturating_sub(self.current);
                let ratio = remaining as f64 / self.current as f64;
                Duration::try_from_secs_f64(elapsed.as_secs_f64() * ratio).ok()
            })
        } else {
            None
        };

        let info = ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_frame: frame_index,
        };

        self.callback.on_progress(&info);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct LastUpdate(Mutex<Option<ProgressInfo>>);

    impl ProgressCallback for LastUpdate {
        fn on_progress(&self, info: &ProgressInfo) {
            *self.0.lock().unwrap() = Some(info.clone());
        }
    }

    #[test]
    fn estimate_survives_huge_totals() {
        let callback = Arc::new(LastUpdate::default());
        let mut tracker =
            ProgressTracker::new(callback.clone(), OperationType::FrameExtraction, Some(u64::MAX));
        std::thread::sleep(Duration::from_millis(2));

        tracker.advance(Some(0));

        let info = callback.0.lock().unwrap().clone().unwrap();
        assert_eq!(info.current, 1);
        let estimate = info.estimated_remaining.unwrap();
        assert!(estimate > Duration::from_secs(u64::from(u32::MAX)), "{estimate:?}");
    }

    #[test]
    fn estimate_scales_with_remaining_items() {
        let callback = Arc::new(LastUpdate::default());
        let mut tracker = ProgressTracker::new(callback.clone(), OperationType::Probing, Some(4));
        std::thread::sleep(Duration::from_millis(5));

        tracker.advance(None);

        let info = callback.0.lock().unwrap().clone().unwrap();
        let estimate = info.estimated_remaining.unwrap();
        assert!(estimate >= info.elapsed * 2, "{estimate:?} vs {:?}", info.elapsed);
        assert_eq!(info.percentage, Some(25.0));
    }
}
