//! Subtitle export.
//!
//! Serialises extracted [`Cue`]s as SubRip (`.srt`), WebVTT (`.vtt`), or a
//! raw one-line-per-cue listing, and provides the clock-format timestamp
//! helpers those formats need.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use burnsub::{Cue, SubtitleFormat, format_cues};
//!
//! let cues = vec![Cue {
//!     start: Duration::from_millis(1_500),
//!     end: Duration::from_millis(3_000),
//!     text: "Hello".to_string(),
//!     confidence: 91.0,
//! }];
//! assert_eq!(
//!     format_cues(&cues, SubtitleFormat::Srt),
//!     "1\n00:00:01,500 --> 00:00:03,000\nHello\n\n"
//! );
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult, Write};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::error::BurnsubError;
use crate::segmenter::Cue;

/// Output format for saved subtitle files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubtitleFormat {
    /// SubRip Text (.srt). This is the default.
    #[default]
    Srt,
    /// Web Video Text Tracks (.vtt).
    WebVtt,
    /// Raw text, one cue per line with timestamps and confidence.
    Raw,
}

impl SubtitleFormat {
    /// Conventional file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::WebVtt => "vtt",
            SubtitleFormat::Raw => "txt",
        }
    }
}

impl Display for SubtitleFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SubtitleFormat::Srt => write!(f, "SRT"),
            SubtitleFormat::WebVtt => write!(f, "WebVTT"),
            SubtitleFormat::Raw => write!(f, "Raw"),
        }
    }
}

/// Returned when a format name is not one of `srt`, `vtt`/`webvtt` or `raw`/`txt`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported subtitle format: {0}")]
pub struct UnknownSubtitleFormat(pub String);

impl FromStr for SubtitleFormat {
    type Err = UnknownSubtitleFormat;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "srt" => Ok(SubtitleFormat::Srt),
            "vtt" | "webvtt" => Ok(SubtitleFormat::WebVtt),
            "raw" | "txt" => Ok(SubtitleFormat::Raw),
            _ => Err(UnknownSubtitleFormat(value.to_string())),
        }
    }
}

/// Format cues into a string in the given format.
pub fn format_cues(cues: &[Cue], format: SubtitleFormat) -> String {
    let mut output = String::new();

    // Writing into a String cannot fail.
    match format {
        SubtitleFormat::Srt => {
            for (i, cue) in cues.iter().enumerate() {
                let _ = write!(
                    output,
                    "{}\n{} --> {}\n{}\n\n",
                    i + 1,
                    format_srt_timestamp(cue.start),
                    format_srt_timestamp(cue.end),
                    cue.text,
                );
            }
        }
        SubtitleFormat::WebVtt => {
            output.push_str("WEBVTT\n\n");
            for (i, cue) in cues.iter().enumerate() {
                let _ = write!(
                    output,
                    "{}\n{} --> {}\n{}\n\n",
                    i + 1,
                    format_vtt_timestamp(cue.start),
                    format_vtt_timestamp(cue.end),
                    cue.text,
                );
            }
        }
        SubtitleFormat::Raw => {
            for cue in cues {
                let _ = writeln!(
                    output,
                    "[{} → {}] ({:.1}) {}",
                    format_vtt_timestamp(cue.start),
                    format_vtt_timestamp(cue.end),
                    cue.confidence,
                    cue.text,
                );
            }
        }
    }

    output
}

/// Format cues and write them to `path`.
///
/// # Errors
///
/// Returns [`BurnsubError::IoError`] if the file cannot be written.
pub fn save_cues<P: AsRef<Path>>(
    path: P,
    cues: &[Cue],
    format: SubtitleFormat,
) -> Result<(), BurnsubError> {
    std::fs::write(path, format_cues(cues, format))?;
    Ok(())
}

/// Format a duration as an SRT timestamp (`HH:MM:SS,mmm`).
///
/// Sub-millisecond precision is truncated. The hour field widens past two
/// digits instead of wrapping.
pub fn format_srt_timestamp(duration: Duration) -> String {
    format_clock(duration, ',')
}

/// Format a duration as a WebVTT timestamp (`HH:MM:SS.mmm`).
pub fn format_vtt_timestamp(duration: Duration) -> String {
    format_clock(duration, '.')
}

fn format_clock(duration: Duration, separator: char) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = duration.subsec_millis();
    format!("{hours:02}:{minutes:02}:{seconds:02}{separator}{millis:03}")
}
