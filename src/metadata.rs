//! Video metadata.
//!
//! [`VideoMetadata`] is read once when a [`MediaFile`](crate::MediaFile) is
//! opened and cached for the lifetime of the file. It backs the `probe`
//! command and the `duration` / `dimensions` answers of the video source.

use std::time::Duration;

/// Metadata for the video stream of an opened file.
///
/// # Example
///
/// ```no_run
/// use burnsub::MediaFile;
///
/// let video = MediaFile::open("input.mp4").unwrap();
/// let metadata = video.metadata();
/// println!("{}x{} for {:?}", metadata.width, metadata.height, metadata.duration);
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second (may be approximate for variable-frame-rate content).
    pub frames_per_second: f64,
    /// Estimated total number of frames, computed from duration and frame rate.
    pub frame_count: u64,
    /// Codec name (e.g. `"h264"`, `"vp9"`, `"av1"`).
    pub codec: String,
    /// Total duration of the video.
    pub duration: Duration,
    /// Container format name (e.g. `"mp4"`, `"matroska"`, `"avi"`).
    pub format: String,
}

impl VideoMetadata {
    /// Number of sampling ticks a run with `interval` performs.
    ///
    /// One tick happens at every multiple of `interval` strictly before
    /// the end of the video.
    pub fn sample_count(&self, interval: Duration) -> u64 {
        sample_count(self.duration, interval)
    }
}

/// `ceil(duration / interval)`, or 0 for a zero interval.
pub(crate) fn sample_count(duration: Duration, interval: Duration) -> u64 {
    let interval = interval.as_nanos();
    if interval == 0 {
        return 0;
    }
    duration.as_nanos().div_ceil(interval) as u64
}
