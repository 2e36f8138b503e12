use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use burnsub::{
    ExtractOptions, ExtractionOutcome, ExtractionSettings, FfmpegLogLevel, MediaFile,
    OcrLanguage, ProgressCallback, ProgressInfo, SubtitleFormat, TesseractBackend, VideoSource,
};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  burnsub extract movie.mp4 --out movie.srt --progress\n  burnsub extract clip.mkv --out clip.vtt --region-y 85 --region-height 15 --language fra\n  burnsub preview-region movie.mp4 --at 00:01:30 --out band.png\n  burnsub probe movie.mp4 --json\n  burnsub completions zsh > _burnsub";

#[derive(Debug, Parser)]
#[command(
    name = "burnsub",
    version,
    about = "Extract burnt-in subtitles from video files with OCR",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar while sampling.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

/// Where the subtitle band sits in the frame.
#[derive(Debug, Args, Clone)]
struct RegionArgs {
    /// Top of the subtitle band, in percent of the frame height.
    #[arg(long, default_value_t = 80.0)]
    region_y: f64,

    /// Height of the subtitle band, in percent of the frame height (5-50).
    #[arg(long, default_value_t = 20.0)]
    region_height: f64,

    /// Hand the raw band to OCR instead of a binarized one.
    #[arg(long)]
    no_preprocess: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract subtitles to a file.
    #[command(
        about = "Extract burnt-in subtitles",
        after_help = "Examples:\n  burnsub extract movie.mp4 --out movie.srt\n  burnsub extract movie.mp4 --out movie.vtt --interval-ms 250 --similarity 0.9\n  burnsub extract movie.mp4 --out cues.txt --format raw --json"
    )]
    Extract {
        /// Input video path.
        input: PathBuf,
        /// Output subtitle file.
        #[arg(long)]
        out: PathBuf,
        /// Output format: srt | vtt | raw. Inferred from the extension when omitted.
        #[arg(long)]
        format: Option<String>,
        /// Print the cues and run statistics as JSON.
        #[arg(long)]
        json: bool,
        /// Sampling interval in milliseconds (100-2000).
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
        #[command(flatten)]
        region: RegionArgs,
        /// Minimum OCR confidence (0-100) for a reading to count.
        #[arg(long, default_value_t = 60.0)]
        min_confidence: f32,
        /// Similarity (0.5-1.0) above which two readings are the same caption.
        #[arg(long, default_value_t = 0.85)]
        similarity: f64,
        /// OCR language code (eng, fra, jpn, chi_sim, ...).
        #[arg(long, default_value = "eng")]
        language: String,
    },

    /// Print video metadata.
    #[command(
        about = "Print video metadata",
        visible_alias = "info",
        after_help = "Examples:\n  burnsub probe movie.mp4\n  burnsub probe movie.mp4 --json"
    )]
    Probe {
        /// Input video path.
        input: PathBuf,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Save the band OCR would see at one timestamp.
    #[command(
        about = "Write the subtitle band of one frame as an image",
        after_help = "Examples:\n  burnsub preview-region movie.mp4 --at 90 --out band.png\n  burnsub preview-region movie.mp4 --at 00:12:03.5 --out band.png --region-y 70 --no-preprocess"
    )]
    PreviewRegion {
        /// Input video path.
        input: PathBuf,
        /// Timestamp to sample (seconds, MM:SS or HH:MM:SS).
        #[arg(long)]
        at: String,
        /// Output image path.
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        region: RegionArgs,
    },

    /// List OCR languages and whether Tesseract has them installed.
    #[command(about = "List OCR languages")]
    Languages,

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_timecode(value: &str) -> Result<Duration, Box<dyn std::error::Error>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("time value cannot be empty".into());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        return Ok(Duration::from_secs_f64(seconds.max(0.0)));
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [minutes, seconds] => (0_u64, minutes.parse::<u64>()?, seconds.parse::<f64>()?),
        [hours, minutes, seconds] => (
            hours.parse::<u64>()?,
            minutes.parse::<u64>()?,
            seconds.parse::<f64>()?,
        ),
        _ => return Err(format!("invalid time format: {trimmed}").into()),
    };

    let total_seconds = (hours * 3600 + minutes * 60) as f64 + seconds;
    Ok(Duration::from_secs_f64(total_seconds.max(0.0)))
}

/// Explicit `--format`, else the output extension, else SRT.
fn resolve_format(
    format: Option<&str>,
    out: &Path,
) -> Result<SubtitleFormat, Box<dyn std::error::Error>> {
    if let Some(format) = format {
        return Ok(format.parse::<SubtitleFormat>()?);
    }
    Ok(out
        .extension()
        .and_then(|extension| extension.to_str())
        .and_then(|extension| extension.parse::<SubtitleFormat>().ok())
        .unwrap_or_default())
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let default_level = if global.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    // RUST_LOG wins over the flag-derived level.
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .format_timestamp_millis()
        .init();

    let ffmpeg_level = match &global.log_level {
        Some(level) => level.parse::<FfmpegLogLevel>()?,
        None => FfmpegLogLevel::default(),
    };
    burnsub::set_ffmpeg_log_level(ffmpeg_level);

    Ok(())
}

fn region_settings(settings: ExtractionSettings, region: &RegionArgs) -> ExtractionSettings {
    settings
        .with_region(region.region_y, region.region_height)
        .with_preprocessing(!region.no_preprocess)
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new(total: u64) -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(total);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_position(info.current);
        if let Some(timestamp) = info.current_timestamp {
            self.bar.set_message(burnsub::format_srt_timestamp(timestamp));
        }
    }
}

fn print_outcome(
    outcome: &ExtractionOutcome,
    out: &Path,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let cues: Vec<_> = outcome
            .cues
            .iter()
            .map(|cue| {
                json!({
                    "start_seconds": cue.start.as_secs_f64(),
                    "end_seconds": cue.end.as_secs_f64(),
                    "text": cue.text,
                    "confidence": cue.confidence,
                })
            })
            .collect();
        let payload = json!({
            "output": out.display().to_string(),
            "cues": cues,
            "stats": {
                "ticks": outcome.stats.ticks,
                "samples": outcome.stats.samples,
                "ocr_failures": outcome.stats.ocr_failures,
                "elapsed_seconds": outcome.stats.elapsed.as_secs_f64(),
            },
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if outcome.cues.is_empty() {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            "no subtitles detected; check --region-y / --region-height with preview-region".yellow()
        );
    }
    if outcome.stats.ocr_failures > 0 {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("{} of {} OCR calls failed", outcome.stats.ocr_failures, outcome.stats.ticks)
                .yellow()
        );
    }
    println!(
        "{} {} cues written to {} ({} samples in {:.1?})",
        "success:".green().bold(),
        outcome.cues.len(),
        out.display(),
        outcome.stats.samples,
        outcome.stats.elapsed,
    );
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Extract {
            input,
            out,
            format,
            json,
            interval_ms,
            region,
            min_confidence,
            similarity,
            language,
        } => {
            let format = resolve_format(format.as_deref(), &out)?;
            ensure_writable_path(&out, cli.global.overwrite)?;

            let language = language.parse::<OcrLanguage>()?;
            let settings = region_settings(ExtractionSettings::new(), &region)
                .with_frame_interval(Duration::from_millis(interval_ms))
                .with_min_confidence(min_confidence)
                .with_similarity_threshold(similarity)
                .with_language(language);

            let mut video = MediaFile::open(&input)?;
            let mut options = ExtractOptions::new();
            let progress = if cli.global.progress {
                let total = video.metadata().sample_count(settings.frame_interval());
                let progress = Arc::new(TerminalProgress::new(total)?);
                options = options.with_progress(progress.clone());
                Some(progress)
            } else {
                None
            };

            let outcome = burnsub::extract_subtitles(
                &mut video,
                &TesseractBackend::new(),
                &settings,
                &options,
            );
            if let Some(progress) = &progress {
                progress.finish();
            }
            let outcome = outcome?;

            burnsub::save_cues(&out, &outcome.cues, format)?;
            print_outcome(&outcome, &out, json)?;
        }
        Commands::Probe { input, json } => {
            let video = MediaFile::open(&input)?;
            let metadata = video.metadata();
            let default_samples = metadata.sample_count(ExtractionSettings::new().frame_interval());
            if json {
                let payload = json!({
                    "format": metadata.format,
                    "duration_seconds": metadata.duration.as_secs_f64(),
                    "width": metadata.width,
                    "height": metadata.height,
                    "fps": metadata.frames_per_second,
                    "frame_count": metadata.frame_count,
                    "codec": metadata.codec,
                    "samples_at_default_interval": default_samples,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Format: {}", metadata.format);
                println!("Duration: {}", burnsub::format_srt_timestamp(metadata.duration));
                println!(
                    "Video: {}x{} @ {:.2} fps [{}]",
                    metadata.width, metadata.height, metadata.frames_per_second, metadata.codec,
                );
            }
        }
        Commands::PreviewRegion {
            input,
            at,
            out,
            region,
        } => {
            ensure_writable_path(&out, cli.global.overwrite)?;
            let timestamp = parse_timecode(&at)?;
            let settings = region_settings(ExtractionSettings::new(), &region);

            let mut video = MediaFile::open(&input)?;
            if timestamp >= video.duration() {
                return Err(burnsub::BurnsubError::InvalidTimestamp(timestamp).into());
            }
            video.seek(timestamp)?;
            let band = burnsub::preprocess(
                video.current_frame()?,
                settings.region(),
                settings.preprocess(),
            );
            if band.height() == 0 {
                return Err("subtitle region is empty for this frame size".into());
            }

            band.save(&out)?;
            println!(
                "{} {} ({}x{} band at {})",
                "saved".green().bold(),
                out.display(),
                band.width(),
                band.height(),
                burnsub::format_srt_timestamp(timestamp)
            );
        }
        Commands::Languages => {
            let installed = match TesseractBackend::new().installed_languages() {
                Ok(codes) => Some(codes),
                Err(error) => {
                    eprintln!(
                        "{} {}",
                        "warning:".yellow().bold(),
                        format!("could not query tesseract: {error}").yellow()
                    );
                    None
                }
            };

            for language in OcrLanguage::ALL {
                let status = match &installed {
                    Some(codes) if codes.iter().any(|code| code == language.code()) => {
                        "installed".green()
                    }
                    Some(_) => "missing".red(),
                    None => "unknown".dimmed(),
                };
                println!("{:<8} {:<22} {status}", language.code(), language.name());
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "burnsub", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, parse_timecode, resolve_format};
    use burnsub::SubtitleFormat;
    use clap::CommandFactory;
    use std::path::Path;

    #[test]
    fn parse_timecode_formats() {
        let seconds = parse_timecode("75").unwrap();
        assert_eq!(seconds.as_secs(), 75);

        let mm_ss = parse_timecode("01:15").unwrap();
        assert_eq!(mm_ss.as_secs(), 75);

        let hh_mm_ss = parse_timecode("00:01:15.5").unwrap();
        assert_eq!(hh_mm_ss.as_millis(), 75_500);

        assert!(parse_timecode("").is_err());
        assert!(parse_timecode("1:2:3:4").is_err());
    }

    #[test]
    fn format_follows_flag_then_extension() {
        let out = Path::new("subs.vtt");
        assert_eq!(resolve_format(None, out).unwrap(), SubtitleFormat::WebVtt);
        assert_eq!(resolve_format(Some("raw"), out).unwrap(), SubtitleFormat::Raw);
        assert_eq!(
            resolve_format(None, Path::new("subs")).unwrap(),
            SubtitleFormat::Srt
        );
        assert!(resolve_format(Some("ass"), out).is_err());
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
