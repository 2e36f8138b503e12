//! Extraction loop integration tests.
//!
//! The loop is driven through scripted collaborators: a [`FrameSequence`]
//! (or a failing video source) and an OCR backend that replays a fixed list
//! of readings, one per tick. No FFmpeg fixture or Tesseract install is
//! needed.

use std::collections::VecDeque;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use burnsub::{
    BurnsubError, CancellationToken, Cue, ExtractOptions, ExtractionSettings, FrameSequence,
    OcrBackend, OcrEngine, OcrError, OcrLanguage, OcrOutput, ProgressCallback, ProgressInfo,
    VideoSource,
};
use image::{DynamicImage, Rgb, RgbImage};

// ── Scripted collaborators ─────────────────────────────────────────

/// One scripted OCR reading; `None` makes the call fail.
type Reading = Option<(&'static str, f32)>;

#[derive(Default)]
struct Counters {
    started: AtomicUsize,
    released: AtomicUsize,
    calls: AtomicUsize,
}

struct ScriptedBackend {
    script: Vec<Reading>,
    fail_start: bool,
    counters: Arc<Counters>,
    bitmaps: Arc<Mutex<Vec<DynamicImage>>>,
}

impl ScriptedBackend {
    fn new(script: Vec<Reading>) -> Self {
        Self {
            script,
            fail_start: false,
            counters: Arc::new(Counters::default()),
            bitmaps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn started(&self) -> usize {
        self.counters.started.load(Ordering::SeqCst)
    }

    fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    fn calls(&self) -> usize {
        self.counters.calls.load(Ordering::SeqCst)
    }
}

/// Replays the script in order, repeating the last reading once exhausted.
struct ScriptedEngine {
    script: VecDeque<Reading>,
    last: Reading,
    counters: Arc<Counters>,
    bitmaps: Arc<Mutex<Vec<DynamicImage>>>,
}

impl OcrBackend for ScriptedBackend {
    type Engine = ScriptedEngine;

    fn start(&self, language: OcrLanguage) -> Result<ScriptedEngine, OcrError> {
        if self.fail_start {
            return Err(OcrError::UnsupportedLanguage(language));
        }
        self.counters.started.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedEngine {
            script: self.script.iter().copied().collect(),
            last: None,
            counters: Arc::clone(&self.counters),
            bitmaps: Arc::clone(&self.bitmaps),
        })
    }
}

impl OcrEngine for ScriptedEngine {
    fn recognize(&mut self, image: &DynamicImage) -> Result<OcrOutput, OcrError> {
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        self.bitmaps.lock().unwrap().push(image.clone());

        let reading = match self.script.pop_front() {
            Some(reading) => {
                self.last = reading;
                reading
            }
            None => self.last,
        };

        match reading {
            Some((text, confidence)) => Ok(OcrOutput {
                text: text.to_string(),
                confidence,
            }),
            None => Err(OcrError::MalformedOutput("scripted failure".to_string())),
        }
    }
}

impl Drop for ScriptedEngine {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// A frame with a white bottom fifth, 64x40 pixels.
fn frame() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(64, 40, |_, y| {
        if y >= 32 { Rgb([240, 240, 240]) } else { Rgb([20, 20, 20]) }
    }))
}

fn video(duration: Duration) -> FrameSequence {
    FrameSequence::new(duration).with_frame(Duration::ZERO, frame())
}

fn settings(interval_ms: u64) -> ExtractionSettings {
    ExtractionSettings::new()
        .with_frame_interval(Duration::from_millis(interval_ms))
        .with_min_confidence(60.0)
        .with_similarity_threshold(0.85)
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn cue(start_ms: u64, end_ms: u64, text: &str, confidence: f32) -> Cue {
    Cue {
        start: ms(start_ms),
        end: ms(end_ms),
        text: text.to_string(),
        confidence,
    }
}

/// Fails every seek at or after `fail_from`.
struct BrokenVideo {
    fail_from: Duration,
    frame: DynamicImage,
}

impl VideoSource for BrokenVideo {
    fn duration(&self) -> Duration {
        Duration::from_secs(3)
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.frame.width(), self.frame.height())
    }

    fn seek(&mut self, timestamp: Duration) -> Result<(), BurnsubError> {
        if timestamp >= self.fail_from {
            return Err(BurnsubError::SeekFailed {
                timestamp,
                reason: "decoder gave up".to_string(),
            });
        }
        Ok(())
    }

    fn current_frame(&self) -> Result<&DynamicImage, BurnsubError> {
        Ok(&self.frame)
    }
}

// ── Segmentation scenarios ─────────────────────────────────────────

#[test]
fn caption_then_disappearance_yields_one_cue() {
    let backend = ScriptedBackend::new(vec![
        Some(("HELLO", 90.0)),
        Some(("HELLO", 91.0)),
        Some(("", 10.0)),
    ]);

    let outcome = burnsub::extract_subtitles(
        &mut video(ms(1_500)),
        &backend,
        &settings(500),
        &ExtractOptions::new(),
    )
    .expect("extraction should succeed");

    assert_eq!(outcome.cues, vec![cue(0, 1_000, "HELLO", 10.0)]);
    assert_eq!(outcome.stats.ticks, 3);
    assert_eq!(outcome.stats.samples, 3);
    assert_eq!(outcome.stats.ocr_failures, 0);
}

#[test]
fn caption_change_splits_at_the_new_sample() {
    let backend = ScriptedBackend::new(vec![Some(("FOO BAR", 80.0)), Some(("BAZ QUX", 80.0))]);

    let outcome = burnsub::extract_subtitles(
        &mut video(ms(2_000)),
        &backend,
        &settings(1_000),
        &ExtractOptions::new(),
    )
    .expect("extraction should succeed");

    assert_eq!(
        outcome.cues,
        vec![cue(0, 1_000, "FOO BAR", 80.0), cue(1_000, 2_000, "BAZ QUX", 0.0)]
    );
}

#[test]
fn low_confidence_readings_yield_no_cues() {
    let backend = ScriptedBackend::new(vec![
        Some(("HELLO", 59.0)),
        Some(("HELLO", 60.0)),
        Some(("WORLD", 12.5)),
    ]);

    let outcome = burnsub::extract_subtitles(
        &mut video(ms(1_500)),
        &backend,
        &settings(500),
        &ExtractOptions::new(),
    )
    .expect("extraction should succeed");

    assert!(outcome.cues.is_empty());
    assert_eq!(outcome.stats.samples, 3);
}

#[test]
fn caption_lasting_to_the_end_is_flushed_with_zero_confidence() {
    let backend = ScriptedBackend::new(vec![Some(("HELLO", 90.0))]);

    let outcome = burnsub::extract_subtitles(
        &mut video(ms(2_000)),
        &backend,
        &settings(500),
        &ExtractOptions::new(),
    )
    .expect("extraction should succeed");

    assert_eq!(outcome.cues, vec![cue(0, 2_000, "HELLO", 0.0)]);
    assert_eq!(outcome.stats.ticks, 4);
}

#[test]
fn ocr_jitter_stays_in_one_cue() {
    let backend = ScriptedBackend::new(vec![
        Some(("I can't believe it's true", 88.0)),
        Some(("I can't beIieve it's true", 84.0)),
        Some(("I can't believe it's true", 90.0)),
        Some(("", 0.0)),
    ]);

    let outcome = burnsub::extract_subtitles(
        &mut video(ms(2_000)),
        &backend,
        &settings(500),
        &ExtractOptions::new(),
    )
    .expect("extraction should succeed");

    assert_eq!(outcome.cues, vec![cue(0, 1_500, "I can't believe it's true", 0.0)]);
}

#[test]
fn ocr_text_is_normalized_before_segmentation() {
    let backend = ScriptedBackend::new(vec![
        Some(("  |Hello,\n  world! ♪ ", 90.0)),
        Some(("Hello, world!", 90.0)),
        Some(("", 0.0)),
    ]);

    let outcome = burnsub::extract_subtitles(
        &mut video(ms(1_500)),
        &backend,
        &settings(500),
        &ExtractOptions::new(),
    )
    .expect("extraction should succeed");

    assert_eq!(outcome.cues.len(), 1);
    assert_eq!(outcome.cues[0].text, "Hello, world!");
}

#[test]
fn cues_are_ordered_and_well_formed() {
    let backend = ScriptedBackend::new(vec![
        Some(("ONE", 90.0)),
        Some(("ONE", 90.0)),
        Some(("TWO TWO", 90.0)),
        Some(("", 0.0)),
        Some(("THREE", 30.0)),
        Some(("FOUR FOUR", 95.0)),
        Some(("FIVE", 95.0)),
        Some(("FIVE", 95.0)),
    ]);

    let outcome = burnsub::extract_subtitles(
        &mut video(ms(4_000)),
        &backend,
        &settings(500),
        &ExtractOptions::new(),
    )
    .expect("extraction should succeed");

    let texts: Vec<&str> = outcome.cues.iter().map(|cue| cue.text.as_str()).collect();
    assert_eq!(texts, ["ONE", "TWO TWO", "FOUR FOUR", "FIVE"]);
    for cue in &outcome.cues {
        assert!(cue.start < cue.end, "cue {cue:?} is not well-formed");
        assert!(!cue.text.is_empty());
    }
    for pair in outcome.cues.windows(2) {
        assert!(pair[0].end <= pair[1].start, "{pair:?} overlap");
    }
}

// ── Collaborator failures ──────────────────────────────────────────

#[test]
fn ocr_failure_skips_the_tick_without_breaking_the_cue() {
    let backend = ScriptedBackend::new(vec![
        Some(("HELLO", 90.0)),
        None,
        Some(("HELLO", 90.0)),
    ]);

    let outcome = burnsub::extract_subtitles(
        &mut video(ms(1_500)),
        &backend,
        &settings(500),
        &ExtractOptions::new(),
    )
    .expect("an OCR failure must not abort the run");

    assert_eq!(outcome.cues, vec![cue(0, 1_500, "HELLO", 0.0)]);
    assert_eq!(outcome.stats.ticks, 3);
    assert_eq!(outcome.stats.samples, 2);
    assert_eq!(outcome.stats.ocr_failures, 1);
    assert_eq!(backend.released(), 1);
}

#[test]
fn every_ocr_call_failing_still_completes() {
    let backend = ScriptedBackend::new(vec![None]);

    let outcome = burnsub::extract_subtitles(
        &mut video(ms(1_000)),
        &backend,
        &settings(250),
        &ExtractOptions::new(),
    )
    .expect("OCR failures are recoverable");

    assert!(outcome.cues.is_empty());
    assert_eq!(outcome.stats.ocr_failures, 4);
}

#[test]
fn seek_failure_halts_the_run_and_releases_the_engine() {
    let backend = ScriptedBackend::new(vec![Some(("HELLO", 90.0))]);
    let mut video = BrokenVideo {
        fail_from: ms(1_000),
        frame: frame(),
    };

    let result = burnsub::extract_subtitles(
        &mut video,
        &backend,
        &settings(500),
        &ExtractOptions::new(),
    );

    match result {
        Err(BurnsubError::SeekFailed { timestamp, .. }) => assert_eq!(timestamp, ms(1_000)),
        other => panic!("Expected SeekFailed, got: {other:?}"),
    }
    assert_eq!(backend.calls(), 2);
    assert_eq!(backend.started(), 1);
    assert_eq!(backend.released(), 1);
}

#[test]
fn engine_start_failure_is_reported_as_ocr_init() {
    let mut backend = ScriptedBackend::new(vec![]);
    backend.fail_start = true;

    let result = burnsub::extract_subtitles(
        &mut video(ms(1_000)),
        &backend,
        &settings(500).with_language(OcrLanguage::Japanese),
        &ExtractOptions::new(),
    );

    match result {
        Err(BurnsubError::OcrInit(OcrError::UnsupportedLanguage(language))) => {
            assert_eq!(language, OcrLanguage::Japanese);
        }
        other => panic!("Expected OcrInit, got: {other:?}"),
    }
}

// ── Edge cases ─────────────────────────────────────────────────────

#[test]
fn zero_duration_video_yields_empty_outcome() {
    let backend = ScriptedBackend::new(vec![Some(("HELLO", 90.0))]);

    let outcome = burnsub::extract_subtitles(
        &mut FrameSequence::new(Duration::ZERO),
        &backend,
        &settings(500),
        &ExtractOptions::new(),
    )
    .expect("zero duration is not an error");

    assert!(outcome.cues.is_empty());
    assert_eq!(outcome.stats.ticks, 0);
    assert_eq!(backend.started(), 0);
}

#[test]
fn frame_too_short_for_any_band_row_is_rejected() {
    let backend = ScriptedBackend::new(vec![Some(("HELLO", 90.0))]);
    let tiny_frame = DynamicImage::ImageRgb8(RgbImage::new(64, 2));
    let mut video = FrameSequence::new(ms(1_000)).with_frame(Duration::ZERO, tiny_frame);

    let result =
        burnsub::extract_subtitles(&mut video, &backend, &settings(500), &ExtractOptions::new());

    assert!(matches!(
        result,
        Err(BurnsubError::EmptyRegion { frame_height: 2, .. })
    ));
    assert_eq!(backend.started(), 0);
}

#[test]
fn region_at_the_frame_bottom_completes_without_cues() {
    let backend = ScriptedBackend::new(vec![Some(("", 0.0))]);

    let outcome = burnsub::extract_subtitles(
        &mut video(ms(1_000)),
        &backend,
        &settings(500).with_region(100.0, 20.0),
        &ExtractOptions::new(),
    )
    .expect("an in-range region never aborts the run");

    assert!(outcome.cues.is_empty());
    assert_eq!(outcome.stats.ticks, 2);
    assert_eq!(backend.released(), 1);

    let bitmaps = backend.bitmaps.lock().unwrap();
    assert!(bitmaps.iter().all(|band| (band.width(), band.height()) == (64, 8)));
    assert!(bitmaps.iter().all(|band| band.to_luma8().pixels().all(|p| p.0 == [0])));
}

#[test]
fn band_overhanging_the_frame_keeps_its_full_height() {
    let backend = ScriptedBackend::new(vec![Some(("", 0.0))]);

    burnsub::extract_subtitles(
        &mut video(ms(500)),
        &backend,
        &settings(500).with_region(90.0, 20.0),
        &ExtractOptions::new(),
    )
    .expect("extraction should succeed");

    let bitmaps = backend.bitmaps.lock().unwrap();
    let band = bitmaps[0].to_luma8();
    assert_eq!(band.dimensions(), (64, 8));
    // Rows 36..40 of the frame are white, the four rows past its bottom black.
    assert!((0..4).all(|y| band.get_pixel(0, y).0 == [255]));
    assert!((4..8).all(|y| band.get_pixel(0, y).0 == [0]));
}

#[test]
fn last_tick_lands_before_the_end() {
    let backend = ScriptedBackend::new(vec![Some(("", 0.0))]);

    let outcome = burnsub::extract_subtitles(
        &mut video(ms(1_001)),
        &backend,
        &settings(500),
        &ExtractOptions::new(),
    )
    .expect("extraction should succeed");

    // Ticks at 0, 500 and 1000 ms.
    assert_eq!(outcome.stats.ticks, 3);
}

#[test]
fn engine_sees_the_binarized_subtitle_band() {
    let backend = ScriptedBackend::new(vec![Some(("", 0.0))]);

    burnsub::extract_subtitles(
        &mut video(ms(500)),
        &backend,
        &settings(500).with_region(80.0, 20.0),
        &ExtractOptions::new(),
    )
    .expect("extraction should succeed");

    let bitmaps = backend.bitmaps.lock().unwrap();
    assert_eq!(bitmaps.len(), 1);
    let band = &bitmaps[0];
    assert_eq!((band.width(), band.height()), (64, 8));
    assert!(matches!(band, DynamicImage::ImageLuma8(_)));
    assert!(band.to_luma8().pixels().all(|pixel| pixel.0 == [255]));
}

#[test]
fn disabled_preprocessing_passes_the_colour_band() {
    let backend = ScriptedBackend::new(vec![Some(("", 0.0))]);

    burnsub::extract_subtitles(
        &mut video(ms(500)),
        &backend,
        &settings(500).with_preprocessing(false),
        &ExtractOptions::new(),
    )
    .expect("extraction should succeed");

    let bitmaps = backend.bitmaps.lock().unwrap();
    assert!(matches!(bitmaps[0], DynamicImage::ImageRgb8(_)));
    assert_eq!(bitmaps[0].to_rgb8().get_pixel(0, 0).0, [240, 240, 240]);
}

// ── Cancellation and progress ──────────────────────────────────────

#[test]
fn cancelled_before_start_returns_cancelled() {
    let backend = ScriptedBackend::new(vec![Some(("HELLO", 90.0))]);
    let token = CancellationToken::new();
    token.cancel();

    let result = burnsub::extract_subtitles(
        &mut video(ms(2_000)),
        &backend,
        &settings(500),
        &ExtractOptions::new().with_cancellation(token),
    );

    assert!(matches!(result, Err(BurnsubError::Cancelled)));
    assert_eq!(backend.calls(), 0);
    assert_eq!(backend.started(), 1);
    assert_eq!(backend.released(), 1);
}

/// Cancels its token once `after` ticks have been reported.
struct CancelAfter {
    token: CancellationToken,
    after: u64,
}

impl ProgressCallback for CancelAfter {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.current >= self.after {
            self.token.cancel();
        }
    }
}

#[test]
fn cancellation_stops_before_the_next_tick() {
    let backend = ScriptedBackend::new(vec![Some(("HELLO", 90.0))]);
    let token = CancellationToken::new();
    let options = ExtractOptions::new()
        .with_cancellation(token.clone())
        .with_progress(Arc::new(CancelAfter { token, after: 2 }));

    let result =
        burnsub::extract_subtitles(&mut video(ms(5_000)), &backend, &settings(500), &options);

    assert!(matches!(result, Err(BurnsubError::Cancelled)));
    assert_eq!(backend.calls(), 2);
    assert_eq!(backend.released(), 1);
}

struct RecordingProgress {
    infos: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
    }
}

#[test]
fn progress_reports_playback_fraction() {
    let backend = ScriptedBackend::new(vec![Some(("HELLO", 90.0))]);
    let recorder = Arc::new(RecordingProgress {
        infos: Mutex::new(Vec::new()),
    });
    let options = ExtractOptions::new().with_progress(recorder.clone());

    burnsub::extract_subtitles(&mut video(ms(2_000)), &backend, &settings(500), &options)
        .expect("extraction should succeed");

    let infos = recorder.infos.lock().unwrap();
    let fractions: Vec<f64> = infos.iter().map(|info| info.fraction).collect();
    assert_eq!(fractions, [0.25, 0.5, 0.75, 1.0]);
    assert!(infos.iter().all(|info| info.total == Some(4)));
    assert_eq!(infos.last().and_then(|info| info.current_timestamp), Some(ms(1_500)));
}

#[test]
fn progress_batches_and_always_reports_completion() {
    let backend = ScriptedBackend::new(vec![Some(("HELLO", 90.0))]);
    let recorder = Arc::new(RecordingProgress {
        infos: Mutex::new(Vec::new()),
    });
    let options = ExtractOptions::new()
        .with_progress(recorder.clone())
        .with_batch_size(3);

    burnsub::extract_subtitles(&mut video(ms(2_000)), &backend, &settings(500), &options)
        .expect("extraction should succeed");

    let infos = recorder.infos.lock().unwrap();
    assert_eq!(infos.len(), 2);
    assert_eq!(infos[0].current, 3);
    assert_eq!(infos[1].current, 4);
    assert_eq!(infos[1].fraction, 1.0);
}

#[test]
fn independent_runs_do_not_share_state() {
    let first = ScriptedBackend::new(vec![Some(("FIRST", 90.0))]);
    let second = ScriptedBackend::new(vec![Some(("SECOND", 90.0))]);
    let settings = settings(500);

    let options = ExtractOptions::new();

    let a = burnsub::extract_subtitles(&mut video(ms(1_000)), &first, &settings, &options)
        .expect("first run");
    let b = burnsub::extract_subtitles(&mut video(ms(1_000)), &second, &settings, &options)
        .expect("second run");

    assert_eq!(a.cues, vec![cue(0, 1_000, "FIRST", 0.0)]);
    assert_eq!(b.cues, vec![cue(0, 1_000, "SECOND", 0.0)]);
}
