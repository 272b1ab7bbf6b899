//! Archive discovery module for finding source archives to process.
//!
//! Scans the top level of the source directory for files with a supported
//! archive extension (case-insensitive). Subdirectories are not searched.

use crate::error::{CoreError, CoreResult};

use std::path::{Path, PathBuf};

/// Archive extensions accepted by the scanner and the extractor.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar", "7z"];

/// Finds archive files eligible for processing in the source directory.
///
/// Returns the paths sorted by file name so the enqueue order is
/// deterministic. An empty directory yields an empty list; a missing or
/// unreadable directory is a configuration error.
pub fn find_archives(source_dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let read_dir = std::fs::read_dir(source_dir).map_err(|e| {
        CoreError::Config(format!(
            "cannot read source directory '{}': {e}",
            source_dir.display()
        ))
    })?;

    let mut files: Vec<PathBuf> = read_dir
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();

            if !path.is_file() {
                return None;
            }

            path.extension()
                .and_then(|ext| ext.to_str())
                .filter(|ext| {
                    ARCHIVE_EXTENSIONS
                        .iter()
                        .any(|supported| ext.eq_ignore_ascii_case(supported))
                })
                .map(|_| path.clone())
        })
        .collect();

    files.sort();
    Ok(files)
}
