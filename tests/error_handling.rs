//! Error handling integration tests.
//!
//! These tests verify that meaningful errors are returned for various
//! failure conditions.

use std::path::Path;
use std::time::Duration;

use burnsub::{
    BurnsubError, ExtractOptions, ExtractionSettings, MediaFile, OcrError, OcrLanguage, VideoSource,
};

#[test]
fn open_nonexistent_file() {
    let result = MediaFile::open("this_file_does_not_exist.mp4");
    assert!(result.is_err());

    let error_message = result.unwrap_err().to_string();
    assert!(
        error_message.contains("Failed to open media file"),
        "Error message should mention file open failure: {error_message}",
    );
}

#[test]
fn open_invalid_file() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let invalid_file_path = temporary_directory.path().join("invalid.mp4");
    std::fs::write(&invalid_file_path, b"this is not a media file")
        .expect("Failed to write invalid file");

    let result = MediaFile::open(&invalid_file_path);
    assert!(result.is_err(), "Expected error for invalid media file");
}

#[test]
fn extract_file_reports_open_failure() {
    let result = burnsub::extract_file(
        "this_file_does_not_exist.mp4",
        &ExtractionSettings::new(),
        &ExtractOptions::new(),
    );
    assert!(matches!(result, Err(BurnsubError::FileOpen { .. })));
}

#[test]
fn seek_past_end_of_fixture_uses_last_frame() {
    let path = "tests/fixtures/sample_video.mp4";
    if !Path::new(path).exists() {
        return;
    }

    let mut video = MediaFile::open(path).expect("Failed to open test video");
    let past_end = video.duration() + Duration::from_secs(5);
    video.seek(past_end).expect("seeking past the end keeps the last frame");
    assert!(video.current_frame().is_ok());
}

#[test]
fn ocr_init_error_names_the_language() {
    let error = BurnsubError::OcrInit(OcrError::UnsupportedLanguage(OcrLanguage::Korean));
    let message = error.to_string();
    assert!(message.contains("Failed to initialise OCR engine"), "{message}");
    assert!(message.contains("kor"), "{message}");
}

#[test]
fn empty_region_error_describes_the_band() {
    let error = BurnsubError::EmptyRegion {
        frame_height: 2,
        region_y: 80.0,
        region_height: 20.0,
    };
    let message = error.to_string();
    assert!(message.contains("height 2"), "{message}");
    assert!(message.contains("80"), "{message}");
}
