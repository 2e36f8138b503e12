//! Cue segmentation.
//!
//! The sampler produces one [`Sample`] per tick: whatever text OCR read in
//! the subtitle band, and how sure it was. [`CueSegmenter`] folds that noisy
//! stream into timed [`Cue`]s. Consecutive accepted samples whose text is
//! similar enough extend the current cue; a dissimilar sample starts a new
//! one; a rejected sample (empty or low confidence) ends it.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use burnsub::{CueSegmenter, Sample};
//!
//! let mut segmenter = CueSegmenter::new(60.0, 0.85);
//! segmenter.feed(&Sample::new(Duration::ZERO, "HELLO", 90.0));
//! segmenter.feed(&Sample::new(Duration::from_millis(500), "HELLO", 91.0));
//! segmenter.feed(&Sample::new(Duration::from_secs(1), "", 10.0));
//!
//! let cues = segmenter.finish(Duration::from_secs(2));
//! assert_eq!(cues.len(), 1);
//! assert_eq!(cues[0].text, "HELLO");
//! assert_eq!(cues[0].end, Duration::from_secs(1));
//! ```

use std::mem;
use std::time::Duration;

use crate::similarity::similarity;
use crate::subtitle::format_srt_timestamp;

/// One OCR observation of the subtitle band.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Playback time the frame was sampled at.
    pub timestamp: Duration,
    /// Normalised OCR text. May be empty.
    pub text: String,
    /// OCR confidence, 0–100.
    pub confidence: f32,
}

impl Sample {
    /// Build a sample.
    pub fn new(timestamp: Duration, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            timestamp,
            text: text.into(),
            confidence,
        }
    }
}

/// A finalised subtitle interval.
///
/// Always satisfies `start < end` and has non-empty `text`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    /// When the caption appeared.
    pub start: Duration,
    /// When the caption disappeared or was replaced.
    pub end: Duration,
    /// Caption text.
    pub text: String,
    /// Confidence of the sample that closed the cue. `0` when the cue was
    /// closed by the end of the video rather than by a sample.
    pub confidence: f32,
}

impl Cue {
    /// How long the cue is displayed.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// State of the segmenter between two samples.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SegmenterState {
    /// No caption is on screen.
    #[default]
    Idle,
    /// A caption is being tracked.
    Active {
        /// Text of the caption as first read.
        text: String,
        /// Timestamp of the sample that opened the caption.
        start: Duration,
    },
}

/// Turns a stream of [`Sample`]s into non-overlapping [`Cue`]s.
///
/// A sample is *accepted* when its text is non-empty and its confidence is
/// strictly greater than `min_confidence`. An accepted sample continues the
/// active cue when its similarity to the active text is at least
/// `similarity_threshold`.
#[derive(Debug, Clone)]
pub struct CueSegmenter {
    min_confidence: f32,
    similarity_threshold: f64,
    state: SegmenterState,
    last_timestamp: Option<Duration>,
    cues: Vec<Cue>,
}

impl CueSegmenter {
    /// Create an idle segmenter.
    pub fn new(min_confidence: f32, similarity_threshold: f64) -> Self {
        Self {
            min_confidence,
            similarity_threshold,
            state: SegmenterState::Idle,
            last_timestamp: None,
            cues: Vec::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> &SegmenterState {
        &self.state
    }

    /// Cues emitted so far, in order.
    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    /// Whether `sample` passes the text and confidence gate.
    pub fn accepts(&self, sample: &Sample) -> bool {
        !sample.text.is_empty() && sample.confidence > self.min_confidence
    }

    /// Feed the next sample. Returns the cue it closed, if any.
    ///
    /// Samples must arrive in non-decreasing timestamp order; one that
    /// goes back in time is ignored.
    pub fn feed(&mut self, sample: &Sample) -> Option<&Cue> {
        if self
            .last_timestamp
            .is_some_and(|previous| sample.timestamp < previous)
        {
            log::warn!(
                "Ignoring out-of-order sample at {:?} (previous was {:?})",
                sample.timestamp,
                self.last_timestamp
            );
            return None;
        }
        self.last_timestamp = Some(sample.timestamp);

        let accepted = self.accepts(sample);
        let emitted = match &self.state {
            SegmenterState::Idle => {
                if accepted {
                    self.state = SegmenterState::Active {
                        text: sample.text.clone(),
                        start: sample.timestamp,
                    };
                }
                false
            }
            SegmenterState::Active { text, .. } if accepted => {
                if similarity(&sample.text, text) >= self.similarity_threshold {
                    false
                } else {
                    let next = SegmenterState::Active {
                        text: sample.text.clone(),
                        start: sample.timestamp,
                    };
                    let previous = mem::replace(&mut self.state, next);
                    self.close(previous, sample.timestamp, sample.confidence)
                }
            }
            SegmenterState::Active { .. } => {
                // Same guard as `accepts`, spelled out for the disappearance branch.
                if sample.text.is_empty() || sample.confidence <= self.min_confidence {
                    let previous = mem::take(&mut self.state);
                    self.close(previous, sample.timestamp, sample.confidence)
                } else {
                    false
                }
            }
        };

        if emitted { self.cues.last() } else { None }
    }

    /// Close any active cue at `duration` (confidence `0`) and return every
    /// emitted cue.
    pub fn finish(mut self, duration: Duration) -> Vec<Cue> {
        let previous = mem::take(&mut self.state);
        self.close(previous, duration, 0.0);
        self.cues
    }

    fn close(&mut self, state: SegmenterState, end: Duration, confidence: f32) -> bool {
        let SegmenterState::Active { text, start } = state else {
            return false;
        };

        if end <= start {
            log::warn!("Dropping zero-length cue at {start:?}: {text}");
            return false;
        }

        log::info!(
            "Subtitle detected [{} --> {}]: {}",
            format_srt_timestamp(start),
            format_srt_timestamp(end),
            text
        );

        self.cues.push(Cue {
            start,
            end,
            text,
            confidence,
        });
        true
    }
}
