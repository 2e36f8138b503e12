//! Progress reporting and cancellation support.
//!
//! This module provides [`ProgressCallback`] for monitoring a run,
//! [`CancellationToken`] for cooperative cancellation, and [`ProgressInfo`]
//! for progress snapshots.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use burnsub::{BurnsubError, ExtractOptions, ExtractionSettings, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{:.1}% complete", info.fraction * 100.0);
//!     }
//! }
//!
//! let options = ExtractOptions::new().with_progress(Arc::new(PrintProgress));
//! let outcome = burnsub::extract_file("input.mp4", &ExtractionSettings::new(), &options)?;
//! # Ok::<(), BurnsubError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// A snapshot of extraction progress, taken after a sampling tick.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Sampling ticks completed so far.
    pub current: u64,
    /// Total ticks the run will perform, if known.
    pub total: Option<u64>,
    /// Playback position divided by video duration, in `[0, 1]`.
    pub fraction: f64,
    /// Tick-based completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the run started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Video timestamp of the tick that was just sampled.
    pub current_timestamp: Option<Duration>,
}

/// Trait for receiving progress updates during extraction.
///
/// Progress callbacks are **infallible**: they observe but cannot halt
/// the run. Use [`CancellationToken`] for cooperative cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Called after sampling ticks, at the cadence set by
    /// [`ExtractOptions::with_batch_size`](crate::ExtractOptions::with_batch_size).
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. Default when no callback is set.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone it and share it between threads; call
/// [`cancel`](CancellationToken::cancel) from anywhere to stop the run
/// before its next sampling tick. An OCR call already in flight is allowed
/// to finish.
///
/// # Example
///
/// ```
/// use burnsub::CancellationToken;
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

/// Tracks tick timing and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: Option<u64>,
    duration: Duration,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    items_since_last_report: u64,
    last_timestamp: Option<Duration>,
    reported: bool,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        total: Option<u64>,
        duration: Duration,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            total,
            duration,
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            items_since_last_report: 0,
            last_timestamp: None,
            reported: false,
        }
    }

    /// Record one finished tick. `position` is the playback time the
    /// sampler has advanced to; `sampled` is the tick's own timestamp.
    pub(crate) fn advance(&mut self, sampled: Duration, position: Duration) {
        self.current += 1;
        self.items_since_last_report += 1;
        self.last_timestamp = Some(sampled);

        if self.items_since_last_report >= self.batch_size {
            self.report(position);
            self.items_since_last_report = 0;
        }
    }

    /// Emit a final report if ticks happened since the last one.
    pub(crate) fn finish(&mut self) {
        if self.items_since_last_report > 0 || !self.reported {
            self.report(self.duration);
            self.items_since_last_report = 0;
        }
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn report(&mut self, position: Duration) {
        self.reported = true;
        let elapsed = self.start_time.elapsed();

        let fraction = if self.duration.is_zero() {
            1.0
        } else {
            (position.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
        };

        let percentage = self
            .total
            .filter(|&t| t > 0)
            .map(|t| (self.current as f32 / t as f32) * 100.0);

        let estimated_remaining = if self.current > 0 {
            self.total.map(|t| {
                let remaining = t.saturating_sub(self.current);
                let per_item = elapsed / self.current as u32;
                per_item * remaining as u32
            })
        } else {
            None
        };

        let info = ProgressInfo {
            current: self.current,
            total: self.total,
            fraction,
            percentage,
            elapsed,
            estimated_remaining,
            current_timestamp: self.last_timestamp,
        };

        self.callback.on_progress(&info);
    }
}
