//! The sampling loop.
//!
//! [`extract_subtitles`] walks a [`VideoSource`] at a fixed interval. Each
//! tick seeks, crops and binarizes the subtitle band, runs OCR on it,
//! normalizes the text and feeds the resulting [`Sample`] to a
//! [`CueSegmenter`]. The run is strictly sequential: one seek and one OCR
//! call at a time.
//!
//! # Example
//!
//! ```no_run
//! use burnsub::{
//!     BurnsubError, ExtractOptions, ExtractionSettings, MediaFile, SubtitleFormat,
//!     TesseractBackend,
//! };
//!
//! let mut video = MediaFile::open("movie.mp4")?;
//! let outcome = burnsub::extract_subtitles(
//!     &mut video,
//!     &TesseractBackend::new(),
//!     &ExtractionSettings::new(),
//!     &ExtractOptions::new(),
//! )?;
//! burnsub::save_cues("movie.srt", &outcome.cues, SubtitleFormat::Srt)?;
//! # Ok::<(), BurnsubError>(())
//! ```

use std::path::Path;
use std::time::Duration;

use crate::{
    configuration::{ExtractOptions, ExtractionSettings},
    error::BurnsubError,
    metadata::sample_count,
    normalize::normalize,
    ocr::{OcrBackend, OcrEngine, TesseractBackend},
    preprocess::preprocess,
    progress::ProgressTracker,
    segmenter::{Cue, CueSegmenter, Sample},
    subtitle::format_srt_timestamp,
    video::{MediaFile, VideoSource},
};

/// Counters describing a finished run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionStats {
    /// Sampling ticks performed.
    pub ticks: u64,
    /// Ticks whose OCR call succeeded and produced a [`Sample`].
    pub samples: u64,
    /// Ticks skipped because OCR failed.
    pub ocr_failures: u64,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

/// Cues and statistics of a finished run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionOutcome {
    /// Extracted cues, ordered by start time and non-overlapping.
    pub cues: Vec<Cue>,
    /// Run statistics.
    pub stats: ExtractionStats,
}

/// State owned by one extraction run.
///
/// Nothing here is shared between runs, so independent runs can proceed
/// concurrently.
struct SubtitleExtractor<'a, E: OcrEngine> {
    engine: E,
    settings: &'a ExtractionSettings,
    options: &'a ExtractOptions,
    duration: Duration,
    segmenter: CueSegmenter,
    tracker: ProgressTracker,
    stats: ExtractionStats,
}

impl<'a, E: OcrEngine> SubtitleExtractor<'a, E> {
    fn new(
        engine: E,
        settings: &'a ExtractionSettings,
        options: &'a ExtractOptions,
        duration: Duration,
    ) -> Self {
        let total = sample_count(duration, settings.frame_interval());
        Self {
            engine,
            settings,
            options,
            duration,
            segmenter: CueSegmenter::new(
                settings.min_confidence(),
                settings.similarity_threshold(),
            ),
            tracker: ProgressTracker::new(
                options.progress.clone(),
                Some(total),
                duration,
                options.batch_size,
            ),
            stats: ExtractionStats::default(),
        }
    }

    fn run<V: VideoSource + ?Sized>(
        mut self,
        video: &mut V,
    ) -> Result<ExtractionOutcome, BurnsubError> {
        let interval = self.settings.frame_interval();
        let mut timestamp = Duration::ZERO;

        while timestamp < self.duration {
            if self.options.is_cancelled() {
                log::info!(
                    "Extraction cancelled at {} after {} ticks",
                    format_srt_timestamp(timestamp),
                    self.stats.ticks
                );
                return Err(BurnsubError::Cancelled);
            }

            self.tick(video, timestamp)?;

            let next = timestamp + interval;
            self.tracker.advance(timestamp, next.min(self.duration));
            timestamp = next;
        }

        Ok(self.finish())
    }

    fn tick<V: VideoSource + ?Sized>(
        &mut self,
        video: &mut V,
        timestamp: Duration,
    ) -> Result<(), BurnsubError> {
        video.seek(timestamp)?;
        let bitmap = preprocess(
            video.current_frame()?,
            self.settings.region(),
            self.settings.preprocess(),
        );
        self.stats.ticks += 1;

        match self.engine.recognize(&bitmap) {
            Ok(output) => {
                let sample = Sample::new(timestamp, normalize(&output.text), output.confidence);
                self.segmenter.feed(&sample);
                self.stats.samples += 1;
            }
            Err(error) => {
                log::warn!("OCR failed at {}: {error}", format_srt_timestamp(timestamp));
                self.stats.ocr_failures += 1;
            }
        }
        Ok(())
    }

    fn finish(mut self) -> ExtractionOutcome {
        self.tracker.finish();
        let mut stats = self.stats;
        stats.elapsed = self.tracker.elapsed();
        let cues = self.segmenter.finish(self.duration);

        log::info!(
            "Extraction complete: {} cues from {} samples ({} OCR failures) in {:.2?}",
            cues.len(),
            stats.samples,
            stats.ocr_failures,
            stats.elapsed
        );

        ExtractionOutcome { cues, stats }
    }
}

/// Extract burnt-in subtitles from `video`.
///
/// An OCR engine is started from `backend` for this run only and released
/// when the run ends, whether it completes, fails or is cancelled. A video
/// of zero duration yields an empty outcome without starting the engine.
///
/// # Errors
///
/// - [`BurnsubError::EmptyRegion`] if the frame is too short for the
///   subtitle band to span a single row.
/// - [`BurnsubError::OcrInit`] if the engine cannot be started.
/// - Any error from [`VideoSource::seek`] or
///   [`VideoSource::current_frame`]; these halt the run.
/// - [`BurnsubError::Cancelled`] if the cancellation token is set.
///
/// Per-tick OCR failures are logged and skipped, never returned.
pub fn extract_subtitles<V, B>(
    video: &mut V,
    backend: &B,
    settings: &ExtractionSettings,
    options: &ExtractOptions,
) -> Result<ExtractionOutcome, BurnsubError>
where
    V: VideoSource + ?Sized,
    B: OcrBackend + ?Sized,
{
    let duration = video.duration();
    if duration.is_zero() {
        log::info!("Video has zero duration, nothing to sample");
        return Ok(ExtractionOutcome::default());
    }

    let (_, frame_height) = video.dimensions();
    let region = settings.region();
    let (_, band_height) = region.pixel_band(frame_height);
    if band_height == 0 {
        return Err(BurnsubError::EmptyRegion {
            frame_height,
            region_y: region.y_percent,
            region_height: region.height_percent,
        });
    }

    let engine = backend
        .start(settings.language())
        .map_err(BurnsubError::OcrInit)?;

    log::debug!(
        "Sampling {:?} every {:?} ({} ticks)",
        duration,
        settings.frame_interval(),
        sample_count(duration, settings.frame_interval())
    );

    SubtitleExtractor::new(engine, settings, options, duration).run(video)
}

/// Open `path` with FFmpeg and extract its subtitles with Tesseract.
///
/// # Errors
///
/// Any error from [`MediaFile::open`] or [`extract_subtitles`].
pub fn extract_file<P: AsRef<Path>>(
    path: P,
    settings: &ExtractionSettings,
    options: &ExtractOptions,
) -> Result<ExtractionOutcome, BurnsubError> {
    let mut video = MediaFile::open(path)?;
    extract_subtitles(&mut video, &TesseractBackend::new(), settings, options)
}
