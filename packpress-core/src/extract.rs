//! Format-agnostic archive extraction with password cascading.
//!
//! Candidate passwords are tried in configuration order; extraction
//! succeeds on the first that works. The destination directory is emptied
//! between failed attempts so partial output from one attempt can never mix
//! with a later attempt's files.

use crate::error::{CoreError, CoreResult};
use log::{info, warn};
use std::fs::File;
use std::path::Path;

/// Supported input archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Rar,
    SevenZip,
}

impl ArchiveFormat {
    /// Determines the format from the file extension.
    pub fn from_path(path: &Path) -> CoreResult<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "zip" => Ok(Self::Zip),
            "rar" => Ok(Self::Rar),
            "7z" => Ok(Self::SevenZip),
            _ => Err(CoreError::UnsupportedFormat(format!(
                "'{}' is not a supported archive",
                path.display()
            ))),
        }
    }
}

/// Extracts `archive_path` into `dest`, trying each password candidate in
/// order. An empty candidate list behaves as a single empty-password
/// attempt. Fails with `CoreError::Extraction` only after every candidate
/// has been tried.
pub fn extract_archive(archive_path: &Path, dest: &Path, passwords: &[String]) -> CoreResult<()> {
    let format = ArchiveFormat::from_path(archive_path)?;
    std::fs::create_dir_all(dest)?;

    run_password_cascade(archive_path, dest, passwords, |password| match format {
        ArchiveFormat::Zip => extract_zip(archive_path, dest, password),
        ArchiveFormat::Rar => extract_rar(archive_path, dest, password),
        ArchiveFormat::SevenZip => extract_7z(archive_path, dest, password),
    })
}

/// Drives the password cascade over one attempt function. Kept separate
/// from the per-format extractors so the cascade contract is testable
/// without real encrypted archives.
fn run_password_cascade<F>(
    archive_path: &Path,
    dest: &Path,
    passwords: &[String],
    mut attempt: F,
) -> CoreResult<()>
where
    F: FnMut(&str) -> CoreResult<()>,
{
    let empty = [String::new()];
    let candidates: &[String] = if passwords.is_empty() { &empty } else { passwords };

    let mut last_error = None;
    for (index, password) in candidates.iter().enumerate() {
        if index > 0 {
            reset_dir(dest)?;
        }
        match attempt(password) {
            Ok(()) => {
                info!(
                    "extracted '{}' (password candidate {} of {})",
                    archive_path.display(),
                    index + 1,
                    candidates.len()
                );
                return Ok(());
            }
            Err(e) => {
                warn!(
                    "extraction attempt {} of {} failed for '{}': {e}",
                    index + 1,
                    candidates.len(),
                    archive_path.display()
                );
                last_error = Some(e);
            }
        }
    }

    Err(CoreError::Extraction(format!(
        "all {} password candidates failed for '{}': {}",
        candidates.len(),
        archive_path.display(),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}

/// Empties the destination directory between failed attempts.
fn reset_dir(dest: &Path) -> CoreResult<()> {
    if dest.is_dir() {
        std::fs::remove_dir_all(dest)?;
    }
    std::fs::create_dir_all(dest)?;
    Ok(())
}

fn extract_zip(archive_path: &Path, dest: &Path, password: &str) -> CoreResult<()> {
    let file = File::open(archive_path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| CoreError::Extraction(e.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = if password.is_empty() {
            archive.by_index(i)
        } else {
            archive.by_index_decrypt(i, password.as_bytes())
        }
        .map_err(|e| CoreError::Extraction(e.to_string()))?;

        // Entries with absolute or traversal names are skipped.
        let Some(relative) = entry.enclosed_name() else {
            warn!("skipping zip entry with unsafe name '{}'", entry.name());
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = File::create(&out_path)?;
        std::io::copy(&mut entry, &mut writer)?;
    }

    Ok(())
}

fn extract_rar(archive_path: &Path, dest: &Path, password: &str) -> CoreResult<()> {
    let archive = if password.is_empty() {
        unrar::Archive::new(archive_path)
    } else {
        unrar::Archive::with_password(archive_path, password)
    };

    let mut archive = archive
        .open_for_processing()
        .map_err(|e| CoreError::Extraction(e.to_string()))?;
    while let Some(header) = archive
        .read_header()
        .map_err(|e| CoreError::Extraction(e.to_string()))?
    {
        archive = if header.entry().is_file() {
            header
                .extract_with_base(dest)
                .map_err(|e| CoreError::Extraction(e.to_string()))?
        } else {
            header
                .skip()
                .map_err(|e| CoreError::Extraction(e.to_string()))?
        };
    }

    Ok(())
}

fn extract_7z(archive_path: &Path, dest: &Path, password: &str) -> CoreResult<()> {
    if password.is_empty() {
        sevenz_rust::decompress_file(archive_path, dest)
            .map_err(|e| CoreError::Extraction(e.to_string()))
    } else {
        sevenz_rust::decompress_file_with_password(
            archive_path,
            dest,
            sevenz_rust::Password::from(password),
        )
        .map_err(|e| CoreError::Extraction(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn cascade_stops_at_first_working_password() {
        let dir = tempdir().unwrap();
        let archive = Path::new("test.zip");
        let passwords: Vec<String> = ["wrong1", "right", "never-tried"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut tried = Vec::new();
        let result = run_password_cascade(archive, dir.path(), &passwords, |pw| {
            tried.push(pw.to_string());
            if pw == "right" {
                Ok(())
            } else {
                Err(CoreError::Extraction("bad password".into()))
            }
        });

        assert!(result.is_ok());
        assert_eq!(tried, vec!["wrong1", "right"]);
    }

    #[test]
    fn cascade_exhausts_every_candidate_before_failing() {
        let dir = tempdir().unwrap();
        let passwords: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();

        let mut attempts = 0;
        let result = run_password_cascade(Path::new("x.zip"), dir.path(), &passwords, |_| {
            attempts += 1;
            Err(CoreError::Extraction("nope".into()))
        });

        assert_eq!(attempts, 3);
        assert!(matches!(result, Err(CoreError::Extraction(_))));
    }

    #[test]
    fn destination_is_reset_between_failed_attempts() {
        let dir = tempdir().unwrap();
        let passwords: Vec<String> = ["bad", "good"].iter().map(|s| s.to_string()).collect();

        let result = run_password_cascade(Path::new("x.zip"), dir.path(), &passwords, |pw| {
            if pw == "bad" {
                // Simulate partial output from a failing attempt.
                std::fs::write(dir.path().join("partial.bin"), b"junk").unwrap();
                Err(CoreError::Extraction("bad".into()))
            } else {
                // The partial file must be gone before this attempt runs.
                assert!(!dir.path().join("partial.bin").exists());
                std::fs::write(dir.path().join("real.bin"), b"data").unwrap();
                Ok(())
            }
        });

        assert!(result.is_ok());
        assert!(dir.path().join("real.bin").exists());
        assert!(!dir.path().join("partial.bin").exists());
    }

    #[test]
    fn empty_password_list_attempts_once_with_blank_password() {
        let dir = tempdir().unwrap();
        let mut tried = Vec::new();
        let result = run_password_cascade(Path::new("x.zip"), dir.path(), &[], |pw| {
            tried.push(pw.to_string());
            Ok(())
        });
        assert!(result.is_ok());
        assert_eq!(tried, vec![String::new()]);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(matches!(
            ArchiveFormat::from_path(Path::new("file.tar.lz")),
            Err(CoreError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            ArchiveFormat::from_path(Path::new("file.ZIP")),
            Ok(ArchiveFormat::Zip)
        ));
    }
}
