//! FFmpeg console verbosity.
//!
//! FFmpeg logs to stderr through its own logger, independently of the
//! [`log`](https://crates.io/crates/log) facade used by this crate. Decoding
//! broadcast captures in particular tends to produce a stream of harmless
//! warnings while a run is sampling. [`set_ffmpeg_log_level`] tunes or
//! silences that output.
//!
//! # Example
//!
//! ```no_run
//! use burnsub::FfmpegLogLevel;
//!
//! burnsub::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use ffmpeg_next::util::log::Level;
use thiserror::Error;

/// FFmpeg internal log verbosity, from quietest to most verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FfmpegLogLevel {
    /// Print nothing.
    Quiet,
    /// Only messages right before an abort.
    Panic,
    /// Unrecoverable errors.
    Fatal,
    /// Recoverable errors. This is the default used by the CLI.
    #[default]
    Error,
    /// Warnings (FFmpeg's own default).
    Warning,
    /// Informational messages.
    Info,
    /// Verbose informational messages.
    Verbose,
    /// Debugging messages.
    Debug,
    /// Everything.
    Trace,
}

impl FfmpegLogLevel {
    /// All levels, quietest first.
    pub const ALL: [FfmpegLogLevel; 9] = [
        FfmpegLogLevel::Quiet,
        FfmpegLogLevel::Panic,
        FfmpegLogLevel::Fatal,
        FfmpegLogLevel::Error,
        FfmpegLogLevel::Warning,
        FfmpegLogLevel::Info,
        FfmpegLogLevel::Verbose,
        FfmpegLogLevel::Debug,
        FfmpegLogLevel::Trace,
    ];

    /// Lower-case name accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            FfmpegLogLevel::Quiet => "quiet",
            FfmpegLogLevel::Panic => "panic",
            FfmpegLogLevel::Fatal => "fatal",
            FfmpegLogLevel::Error => "error",
            FfmpegLogLevel::Warning => "warning",
            FfmpegLogLevel::Info => "info",
            FfmpegLogLevel::Verbose => "verbose",
            FfmpegLogLevel::Debug => "debug",
            FfmpegLogLevel::Trace => "trace",
        }
    }

    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Panic => Level::Panic,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }
}

impl Display for FfmpegLogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

/// Returned when a name is not one of [`FfmpegLogLevel::ALL`] (or `warn`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown FFmpeg log level: {0}")]
pub struct UnknownLogLevel(pub String);

impl FromStr for FfmpegLogLevel {
    type Err = UnknownLogLevel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.to_ascii_lowercase();
        let wanted = if wanted == "warn" { "warning" } else { wanted.as_str() };
        FfmpegLogLevel::ALL
            .into_iter()
            .find(|level| level.name() == wanted)
            .ok_or_else(|| UnknownLogLevel(value.to_string()))
    }
}

/// Set FFmpeg's own stderr verbosity.
///
/// Rust-side `log` output is unaffected.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}
