//! # burnsub
//!
//! Extract burnt-in (hardcoded) subtitles from video files.
//!
//! `burnsub` samples a video at a fixed interval, crops the band where
//! subtitles are drawn, runs OCR on it, and folds the noisy per-frame text
//! into timed cues ready for SRT or WebVTT export. Decoding is powered by
//! FFmpeg via [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next); OCR is
//! delegated to the `tesseract` command-line program.
//!
//! ## Quick Start
//!
//! ```no_run
//! use burnsub::{ExtractOptions, ExtractionSettings, SubtitleFormat};
//!
//! let settings = ExtractionSettings::new();
//! let outcome = burnsub::extract_file("movie.mp4", &settings, &ExtractOptions::new()).unwrap();
//! burnsub::save_cues("movie.srt", &outcome.cues, SubtitleFormat::Srt).unwrap();
//! ```
//!
//! ## Segmentation on its own
//!
//! The cue state machine does not depend on FFmpeg or OCR and can be fed
//! samples from anywhere:
//!
//! ```
//! use std::time::Duration;
//!
//! use burnsub::{CueSegmenter, Sample};
//!
//! let mut segmenter = CueSegmenter::new(60.0, 0.85);
//! segmenter.feed(&Sample::new(Duration::ZERO, "HELLO WORLD", 92.0));
//! segmenter.feed(&Sample::new(Duration::from_millis(500), "HELLO W0RLD", 88.0));
//! segmenter.feed(&Sample::new(Duration::from_secs(1), "GOODBYE", 90.0));
//!
//! let cues = segmenter.finish(Duration::from_secs(2));
//! assert_eq!(cues.len(), 2);
//! assert_eq!(cues[1].confidence, 0.0);
//! ```
//!
//! ## Features
//!
//! - **Fuzzy cue tracking**: Levenshtein similarity bridges OCR jitter
//!   between frames of the same caption
//! - **Region preprocessing**: subtitle band cropping and hard binarization
//! - **Pluggable collaborators**: [`VideoSource`] and [`OcrBackend`] traits,
//!   with FFmpeg and Tesseract implementations
//! - **Progress & cancellation**: cooperative callbacks and
//!   `CancellationToken` for long-running runs
//! - **Export**: SRT, WebVTT, or a raw listing with confidences
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `rayon` | `extract_files_parallel()` runs one extraction per file on the rayon pool |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed to build, and the
//! `tesseract` executable with the wanted language data to run OCR.

pub mod configuration;
pub mod error;
pub mod extractor;
pub mod ffmpeg;
pub mod metadata;
pub mod normalize;
pub mod ocr;
#[cfg(feature = "rayon")]
mod parallel;
pub mod preprocess;
pub mod progress;
pub mod segmenter;
pub mod similarity;
pub mod subtitle;
mod utilities;
pub mod video;

pub use configuration::{
    ExtractOptions, ExtractionSettings, MAX_FRAME_INTERVAL, MIN_FRAME_INTERVAL, OcrLanguage,
    SubtitleRegion, UnknownLanguage,
};
pub use error::{BurnsubError, OcrError};
pub use extractor::{ExtractionOutcome, ExtractionStats, extract_file, extract_subtitles};
pub use ffmpeg::{FfmpegLogLevel, UnknownLogLevel, set_ffmpeg_log_level};
pub use metadata::VideoMetadata;
pub use normalize::normalize;
pub use ocr::{OcrBackend, OcrEngine, OcrOutput, TesseractBackend, TesseractEngine};
#[cfg(feature = "rayon")]
pub use parallel::extract_files_parallel;
pub use preprocess::{binarize, crop_region, preprocess};
pub use progress::{CancellationToken, ProgressCallback, ProgressInfo};
pub use segmenter::{Cue, CueSegmenter, SegmenterState, Sample};
pub use similarity::{levenshtein, similarity};
pub use subtitle::{
    SubtitleFormat, UnknownSubtitleFormat, format_cues, format_srt_timestamp,
    format_vtt_timestamp, save_cues,
};
pub use video::{FrameSequence, MediaFile, VideoSource};
