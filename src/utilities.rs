//! Internal utility functions.
//!
//! Pixel-data copying and timestamp conversion shared by the FFmpeg video
//! source.

use std::time::Duration;

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy pixel data from an FFmpeg video frame into a tightly-packed RGB buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × 3).
/// This function strips that padding so the result can be passed directly to
/// [`image::RgbImage::from_raw`].
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_bytes = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == row_bytes {
        return data[..row_bytes * (height as usize)].to_vec();
    }

    let mut buffer = Vec::with_capacity(row_bytes * (height as usize));
    for row in data.chunks(stride).take(height as usize) {
        buffer.extend_from_slice(&row[..row_bytes]);
    }
    buffer
}

/// Convert a [`Duration`] to a container-level seek timestamp
/// (`AV_TIME_BASE`, microseconds).
pub(crate) fn duration_to_seek_timestamp(duration: Duration) -> i64 {
    i64::try_from(duration.as_micros()).unwrap_or(i64::MAX)
}

/// Rescale a PTS value from stream time base to a [`Duration`].
///
/// Negative timestamps (pre-roll) clamp to zero.
pub(crate) fn pts_to_duration(pts: i64, time_base: Rational) -> Duration {
    let denominator = time_base.denominator();
    if denominator == 0 || pts <= 0 {
        return Duration::ZERO;
    }
    let seconds = pts as f64 * f64::from(time_base.numerator()) / f64::from(denominator);
    Duration::from_secs_f64(seconds.max(0.0))
}
