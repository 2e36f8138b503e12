//! Extraction settings and operational options.
//!
//! [`ExtractionSettings`] holds the tunable knobs of one run: how often to
//! sample, where the subtitle band sits, and how strict the OCR and
//! similarity gates are. Every builder method clamps its input to the
//! supported range, so a constructed value is always valid.
//!
//! [`ExtractOptions`] threads progress callbacks and cancellation tokens
//! through a run without polluting every function signature.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use burnsub::{
//!     CancellationToken, ExtractOptions, ExtractionSettings, OcrLanguage, ProgressCallback,
//!     ProgressInfo,
//! };
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{:.0}% done", info.fraction * 100.0);
//!     }
//! }
//!
//! let settings = ExtractionSettings::new()
//!     .with_frame_interval(Duration::from_millis(250))
//!     .with_region(85.0, 15.0)
//!     .with_language(OcrLanguage::French);
//!
//! let token = CancellationToken::new();
//! let options = ExtractOptions::new()
//!     .with_progress(Arc::new(LogProgress))
//!     .with_cancellation(token.clone());
//! ```

use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Shortest supported sampling interval.
pub const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(100);
/// Longest supported sampling interval.
pub const MAX_FRAME_INTERVAL: Duration = Duration::from_millis(2000);

const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_REGION_Y_PERCENT: f64 = 80.0;
const DEFAULT_REGION_HEIGHT_PERCENT: f64 = 20.0;
const DEFAULT_MIN_CONFIDENCE: f32 = 60.0;
const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Languages the OCR engine can be asked to recognise.
///
/// Each variant maps to a Tesseract traineddata code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OcrLanguage {
    /// `eng`. This is the default.
    #[default]
    English,
    /// `spa`
    Spanish,
    /// `fra`
    French,
    /// `deu`
    German,
    /// `ita`
    Italian,
    /// `por`
    Portuguese,
    /// `rus`
    Russian,
    /// `jpn`
    Japanese,
    /// `kor`
    Korean,
    /// `chi_sim`
    ChineseSimplified,
    /// `chi_tra`
    ChineseTraditional,
    /// `ara`
    Arabic,
    /// `hin`
    Hindi,
}

impl OcrLanguage {
    /// Every supported language, in display order.
    pub const ALL: [OcrLanguage; 13] = [
        OcrLanguage::English,
        OcrLanguage::Spanish,
        OcrLanguage::French,
        OcrLanguage::German,
        OcrLanguage::Italian,
        OcrLanguage::Portuguese,
        OcrLanguage::Russian,
        OcrLanguage::Japanese,
        OcrLanguage::Korean,
        OcrLanguage::ChineseSimplified,
        OcrLanguage::ChineseTraditional,
        OcrLanguage::Arabic,
        OcrLanguage::Hindi,
    ];

    /// The Tesseract language code.
    pub fn code(self) -> &'static str {
        match self {
            OcrLanguage::English => "eng",
            OcrLanguage::Spanish => "spa",
            OcrLanguage::French => "fra",
            OcrLanguage::German => "deu",
            OcrLanguage::Italian => "ita",
            OcrLanguage::Portuguese => "por",
            OcrLanguage::Russian => "rus",
            OcrLanguage::Japanese => "jpn",
            OcrLanguage::Korean => "kor",
            OcrLanguage::ChineseSimplified => "chi_sim",
            OcrLanguage::ChineseTraditional => "chi_tra",
            OcrLanguage::Arabic => "ara",
            OcrLanguage::Hindi => "hin",
        }
    }

    /// Human-readable language name.
    pub fn name(self) -> &'static str {
        match self {
            OcrLanguage::English => "English",
            OcrLanguage::Spanish => "Spanish",
            OcrLanguage::French => "French",
            OcrLanguage::German => "German",
            OcrLanguage::Italian => "Italian",
            OcrLanguage::Portuguese => "Portuguese",
            OcrLanguage::Russian => "Russian",
            OcrLanguage::Japanese => "Japanese",
            OcrLanguage::Korean => "Korean",
            OcrLanguage::ChineseSimplified => "Chinese (Simplified)",
            OcrLanguage::ChineseTraditional => "Chinese (Traditional)",
            OcrLanguage::Arabic => "Arabic",
            OcrLanguage::Hindi => "Hindi",
        }
    }
}

impl Display for OcrLanguage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.code())
    }
}

/// Returned when a language code is not one of [`OcrLanguage::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown OCR language code: {0}")]
pub struct UnknownLanguage(pub String);

impl FromStr for OcrLanguage {
    type Err = UnknownLanguage;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase();
        OcrLanguage::ALL
            .into_iter()
            .find(|language| language.code() == wanted)
            .ok_or(UnknownLanguage(value.to_string()))
    }
}

/// The horizontal band of each frame that is handed to OCR.
///
/// Both values are percentages of the frame height; the band always spans
/// the full frame width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubtitleRegion {
    /// Top edge of the band, 0–100 % of the frame height.
    pub y_percent: f64,
    /// Height of the band, 5–50 % of the frame height.
    pub height_percent: f64,
}

impl Default for SubtitleRegion {
    fn default() -> Self {
        Self {
            y_percent: DEFAULT_REGION_Y_PERCENT,
            height_percent: DEFAULT_REGION_HEIGHT_PERCENT,
        }
    }
}

impl SubtitleRegion {
    /// Build a region, clamping both percentages to their supported ranges.
    pub fn new(y_percent: f64, height_percent: f64) -> Self {
        Self {
            y_percent: clamp_or(y_percent, 0.0, 100.0, DEFAULT_REGION_Y_PERCENT),
            height_percent: clamp_or(height_percent, 5.0, 50.0, DEFAULT_REGION_HEIGHT_PERCENT),
        }
    }

    /// Resolve the band to pixel rows for a frame of `frame_height` pixels.
    ///
    /// Returns `(y, height)` where `y = floor(y% / 100 * H)` and
    /// `height = floor(height% / 100 * H)`. The band may extend past the
    /// bottom of the frame; [`crate::crop_region`] fills those rows with
    /// black.
    pub fn pixel_band(&self, frame_height: u32) -> (u32, u32) {
        let frame = f64::from(frame_height);
        let y = ((self.y_percent / 100.0) * frame).floor() as u32;
        let height = ((self.height_percent / 100.0) * frame).floor() as u32;
        (y.min(frame_height), height)
    }
}

/// Run configuration, fixed for the duration of one extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSettings {
    frame_interval: Duration,
    region: SubtitleRegion,
    min_confidence: f32,
    similarity_threshold: f64,
    preprocess: bool,
    language: OcrLanguage,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionSettings {
    /// Default settings: 500 ms interval, band at 80 % with 20 % height,
    /// minimum confidence 60, similarity threshold 0.85, preprocessing on,
    /// English.
    pub fn new() -> Self {
        Self {
            frame_interval: DEFAULT_FRAME_INTERVAL,
            region: SubtitleRegion::default(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            preprocess: true,
            language: OcrLanguage::default(),
        }
    }

    /// Set the sampling interval. Clamped to 100–2000 ms.
    #[must_use]
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval.clamp(MIN_FRAME_INTERVAL, MAX_FRAME_INTERVAL);
        self
    }

    /// Set the subtitle band as percentages of the frame height.
    #[must_use]
    pub fn with_region(mut self, y_percent: f64, height_percent: f64) -> Self {
        self.region = SubtitleRegion::new(y_percent, height_percent);
        self
    }

    /// Set the minimum OCR confidence a sample needs to be accepted.
    /// Clamped to 0–100.
    #[must_use]
    pub fn with_min_confidence(mut self, confidence: f32) -> Self {
        self.min_confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 100.0)
        } else {
            DEFAULT_MIN_CONFIDENCE
        };
        self
    }

    /// Set the similarity at or above which two texts belong to the same
    /// cue. Clamped to 0.5–1.0.
    #[must_use]
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = clamp_or(threshold, 0.5, 1.0, DEFAULT_SIMILARITY_THRESHOLD);
        self
    }

    /// Enable or disable binarization of the subtitle band.
    #[must_use]
    pub fn with_preprocessing(mut self, enabled: bool) -> Self {
        self.preprocess = enabled;
        self
    }

    /// Set the OCR language.
    #[must_use]
    pub fn with_language(mut self, language: OcrLanguage) -> Self {
        self.language = language;
        self
    }

    /// Time between two sampling ticks.
    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// The subtitle band.
    pub fn region(&self) -> SubtitleRegion {
        self.region
    }

    /// Minimum accepted OCR confidence (exclusive).
    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    /// Minimum similarity for "same cue" (inclusive).
    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    /// Whether the band is binarized before OCR.
    pub fn preprocess(&self) -> bool {
        self.preprocess
    }

    /// OCR language.
    pub fn language(&self) -> OcrLanguage {
        self.language
    }
}

fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Operational options for an extraction run.
///
/// Carries the progress callback, cancellation token, and reporting cadence.
/// A default-constructed value reports nothing and is never cancelled.
#[derive(Clone)]
pub struct ExtractOptions {
    /// Progress callback. Defaults to a no-op.
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// Cancellation token. `None` means never cancelled.
    pub(crate) cancellation: Option<CancellationToken>,
    /// Fire the progress callback every N ticks.
    pub(crate) batch_size: u64,
}

impl Debug for ExtractOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractOptions")
            .field("has_progress", &true)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Create options with no progress callback, no cancellation, batch size 1.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
        }
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// The run checks the token before starting each sampling tick and
    /// returns [`BurnsubError::Cancelled`](crate::BurnsubError::Cancelled)
    /// once it is set.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set how often the progress callback fires. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
