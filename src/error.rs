//! Error types for the `burnsub` crate.
//!
//! [`BurnsubError`] is returned by every fallible run-level operation.
//! [`OcrError`] is the narrower, recoverable error an [`OcrEngine`](crate::OcrEngine)
//! reports for a single recognition call; the extraction loop logs it and
//! moves on to the next tick.

use std::{io::Error as IoError, path::PathBuf, process::ExitStatus, time::Duration};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

use crate::configuration::OcrLanguage;

/// The unified error type for all `burnsub` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BurnsubError {
    /// The media file could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::MediaFile::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// The video source could not produce a frame for the requested time.
    #[error("Failed to seek to {timestamp:?}: {reason}")]
    SeekFailed {
        /// The timestamp that was requested.
        timestamp: Duration,
        /// Why no frame is available.
        reason: String,
    },

    /// The requested timestamp exceeds the media duration.
    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(Duration),

    /// The frame is too short for the subtitle band to span a single row.
    #[error(
        "Subtitle region is empty for a frame of height {frame_height} (y = {region_y}%, height = {region_height}%)"
    )]
    EmptyRegion {
        /// Height of the decoded frame in pixels.
        frame_height: u32,
        /// Configured vertical offset in percent.
        region_y: f64,
        /// Configured band height in percent.
        region_height: f64,
    },

    /// The OCR engine could not be started for this run.
    #[error("Failed to initialise OCR engine: {0}")]
    OcrInit(#[source] OcrError),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// The run was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<FfmpegError> for BurnsubError {
    fn from(error: FfmpegError) -> Self {
        BurnsubError::FfmpegError(error.to_string())
    }
}

/// A failure reported by an OCR engine.
///
/// Errors raised by [`OcrEngine::recognize`](crate::OcrEngine::recognize) are
/// recoverable: they cost one sampling tick, never the whole run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OcrError {
    /// The OCR program could not be launched.
    #[error("Failed to run {program}: {source}")]
    Spawn {
        /// Program that was executed.
        program: String,
        /// Underlying launch error.
        #[source]
        source: IoError,
    },

    /// The OCR program exited unsuccessfully.
    #[error("OCR process exited with {status}: {stderr}")]
    Failed {
        /// Exit status of the process.
        status: ExitStatus,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The engine produced output that could not be interpreted.
    #[error("Malformed OCR output: {0}")]
    MalformedOutput(String),

    /// The requested language model is not installed.
    #[error("OCR language '{0}' is not installed")]
    UnsupportedLanguage(OcrLanguage),

    /// The region bitmap could not be encoded for the engine.
    #[error("Failed to encode OCR input image: {0}")]
    Image(#[from] ImageError),

    /// Scratch file handling failed.
    #[error("OCR I/O error: {0}")]
    Io(#[from] IoError),
}
