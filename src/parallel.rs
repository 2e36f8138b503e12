//! Batch extraction across files on the rayon pool.
//!
//! Each file gets its own [`MediaFile`](crate::MediaFile), OCR engine and
//! run state, so there is no shared mutable state between workers. A single
//! file is never split: its samples must reach the segmenter in order.

use std::path::{Path, PathBuf};

use ::rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::configuration::{ExtractOptions, ExtractionSettings};
use crate::error::BurnsubError;
use crate::extractor::{ExtractionOutcome, extract_file};

/// Extract subtitles from several files concurrently.
///
/// Results are returned in input order, one per path. A failure in one file
/// does not affect the others. The progress callback in `options` receives
/// the interleaved updates of every run; cancelling its token stops all of
/// them before their next tick.
pub fn extract_files_parallel<P>(
    paths: &[P],
    settings: &ExtractionSettings,
    options: &ExtractOptions,
) -> Vec<(PathBuf, Result<ExtractionOutcome, BurnsubError>)>
where
    P: AsRef<Path> + Sync,
{
    log::debug!("Extracting {} files in parallel", paths.len());

    paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            if options.is_cancelled() {
                return (path.to_path_buf(), Err(BurnsubError::Cancelled));
            }
            (path.to_path_buf(), extract_file(path, settings, options))
        })
        .collect()
}
