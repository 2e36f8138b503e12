//! OCR engine abstraction and the Tesseract backend.
//!
//! An extraction run talks to OCR through two traits. An [`OcrBackend`]
//! starts one [`OcrEngine`] per run (loading models, creating scratch
//! space); the run owns that engine and drops it on every exit path. The
//! engine turns one region bitmap into an [`OcrOutput`].

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use image::{DynamicImage, ImageFormat};
use tempfile::TempDir;

use crate::configuration::OcrLanguage;
use crate::error::OcrError;

/// Environment variable that overrides the `tesseract` executable.
pub const TESSERACT_ENV: &str = "BURNSUB_TESSERACT";

/// Default Tesseract page segmentation mode: a single uniform block of text.
pub const DEFAULT_PAGE_SEGMENTATION_MODE: u32 = 6;

/// Text read from one region bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOutput {
    /// Recognised text, as returned by the engine.
    pub text: String,
    /// Engine self-reported confidence, 0–100.
    pub confidence: f32,
}

impl OcrOutput {
    /// Output for a bitmap with nothing on it.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
        }
    }
}

/// A started OCR engine, scoped to one extraction run.
pub trait OcrEngine {
    /// Recognise the text in `image`.
    ///
    /// # Errors
    ///
    /// Any [`OcrError`]; the run treats it as a skipped tick.
    fn recognize(&mut self, image: &DynamicImage) -> Result<OcrOutput, OcrError>;
}

impl<E: OcrEngine + ?Sized> OcrEngine for Box<E> {
    fn recognize(&mut self, image: &DynamicImage) -> Result<OcrOutput, OcrError> {
        (**self).recognize(image)
    }
}

/// Factory for [`OcrEngine`]s.
pub trait OcrBackend {
    /// The engine type this backend starts.
    type Engine: OcrEngine;

    /// Acquire an engine for `language`.
    ///
    /// # Errors
    ///
    /// Returns an [`OcrError`] if the engine cannot be started, for example
    /// because the language model is missing.
    fn start(&self, language: OcrLanguage) -> Result<Self::Engine, OcrError>;
}

/// Runs the `tesseract` command-line program.
///
/// The executable is taken from [`TESSERACT_ENV`] when set, otherwise
/// `tesseract` is looked up on `PATH`.
#[derive(Debug, Clone)]
pub struct TesseractBackend {
    program: PathBuf,
    page_segmentation_mode: u32,
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TesseractBackend {
    /// Backend using the default executable and page segmentation mode.
    pub fn new() -> Self {
        let program = env::var_os(TESSERACT_ENV)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| OsString::from("tesseract"));
        Self {
            program: PathBuf::from(program),
            page_segmentation_mode: DEFAULT_PAGE_SEGMENTATION_MODE,
        }
    }

    /// Use a specific executable.
    #[must_use]
    pub fn with_program<P: Into<PathBuf>>(mut self, program: P) -> Self {
        self.program = program.into();
        self
    }

    /// Set Tesseract's `--psm` value.
    #[must_use]
    pub fn with_page_segmentation_mode(mut self, mode: u32) -> Self {
        self.page_segmentation_mode = mode;
        self
    }

    /// The executable this backend runs.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Language codes installed for this Tesseract.
    ///
    /// # Errors
    ///
    /// Returns an [`OcrError`] if `tesseract --list-langs` cannot be run.
    pub fn installed_languages(&self) -> Result<Vec<String>, OcrError> {
        let output = run(Command::new(&self.program).arg("--list-langs"), &self.program)?;
        // Tesseract prints a header line before the codes; older versions
        // print the list on stderr.
        let listing = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        };
        Ok(listing
            .lines()
            .skip(1)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

impl OcrBackend for TesseractBackend {
    type Engine = TesseractEngine;

    fn start(&self, language: OcrLanguage) -> Result<TesseractEngine, OcrError> {
        let installed = self.installed_languages()?;
        if !installed.iter().any(|code| code == language.code()) {
            return Err(OcrError::UnsupportedLanguage(language));
        }

        let scratch = tempfile::Builder::new().prefix("burnsub-ocr").tempdir()?;
        log::info!(
            "OCR engine initialised ({}, language {language}, psm {})",
            self.program.display(),
            self.page_segmentation_mode
        );

        Ok(TesseractEngine {
            program: self.program.clone(),
            language,
            page_segmentation_mode: self.page_segmentation_mode,
            input_path: scratch.path().join("region.png"),
            scratch,
        })
    }
}

/// A Tesseract engine bound to one language and one scratch directory.
///
/// The scratch directory is removed when the engine is dropped.
#[derive(Debug)]
pub struct TesseractEngine {
    program: PathBuf,
    language: OcrLanguage,
    page_segmentation_mode: u32,
    input_path: PathBuf,
    scratch: TempDir,
}

impl OcrEngine for TesseractEngine {
    fn recognize(&mut self, image: &DynamicImage) -> Result<OcrOutput, OcrError> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(OcrOutput::empty());
        }

        image.save_with_format(&self.input_path, ImageFormat::Png)?;

        let output = run(
            Command::new(&self.program)
                .arg(&self.input_path)
                .arg("stdout")
                .arg("-l")
                .arg(self.language.code())
                .arg("--psm")
                .arg(self.page_segmentation_mode.to_string())
                .arg("tsv"),
            &self.program,
        )?;

        parse_tsv(&String::from_utf8_lossy(&output.stdout))
    }
}

impl Drop for TesseractEngine {
    fn drop(&mut self) {
        log::debug!("Releasing OCR engine scratch space {}", self.scratch.path().display());
    }
}

fn run(command: &mut Command, program: &Path) -> Result<Output, OcrError> {
    let output = command.output().map_err(|source| OcrError::Spawn {
        program: program.display().to_string(),
        source,
    })?;

    if !output.status.success() {
        return Err(OcrError::Failed {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

/// Word-level TSV row: level, page, block, paragraph, line, word, left,
/// top, width, height, conf, text.
const TSV_COLUMNS: usize = 12;
const TSV_WORD_LEVEL: &str = "5";

/// Parse Tesseract's TSV output into text and mean word confidence.
///
/// Words are joined with spaces inside a line and lines with `\n`. Words
/// with a negative confidence (layout rows) or blank text are skipped.
pub(crate) fn parse_tsv(tsv: &str) -> Result<OcrOutput, OcrError> {
    let mut rows = tsv.lines();
    match rows.next() {
        Some(header) if header.starts_with("level") => {}
        Some(header) => {
            return Err(OcrError::MalformedOutput(format!(
                "unexpected TSV header: {header}"
            )));
        }
        None => return Ok(OcrOutput::empty()),
    }

    let mut lines: Vec<((&str, &str, &str), Vec<&str>)> = Vec::new();
    let mut confidence_sum = 0.0_f64;
    let mut word_count = 0_u32;

    for row in rows {
        let columns: Vec<&str> = row.split('\t').collect();
        if columns.len() < TSV_COLUMNS - 1 || columns[0] != TSV_WORD_LEVEL {
            continue;
        }

        let confidence: f32 = columns[10].trim().parse().map_err(|_| {
            OcrError::MalformedOutput(format!("invalid confidence in row: {row}"))
        })?;
        let word = columns.get(11).map(|text| text.trim()).unwrap_or_default();
        if confidence < 0.0 || word.is_empty() {
            continue;
        }

        confidence_sum += f64::from(confidence);
        word_count += 1;

        let key = (columns[2], columns[3], columns[4]);
        match lines.last_mut() {
            Some((last_key, words)) if *last_key == key => words.push(word),
            _ => lines.push((key, vec![word])),
        }
    }

    if word_count == 0 {
        return Ok(OcrOutput::empty());
    }

    let text = lines
        .iter()
        .map(|(_, words)| words.join(" "))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(OcrOutput {
        text,
        confidence: (confidence_sum / f64::from(word_count)) as f32,
    })
}
