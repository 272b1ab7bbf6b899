//! Content normalization: payload folder detection, canonical name
//! derivation, cleanup of unwanted files and sequential renaming.

use crate::config::DeleteConfig;
use crate::error::{CoreError, CoreResult};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Image extensions used when deciding whether the extraction root itself
/// holds the payload.
const ROOT_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Bracketed size tag: a page-count marker, a dash and a size-in-MB marker,
/// e.g. `[1080P-50MB]`.
static SIZE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*P[^\]]*-[^\]]*MB[^\]]*\]").unwrap());

static BRACKETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\[\]]").unwrap());

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Derives the canonical content name from an archive's base name.
///
/// Removes bracketed size tags, strips the remaining bracket characters
/// (keeping their inner text), collapses whitespace runs and trims
/// surrounding dash/whitespace runs. Idempotent:
/// `format_name(format_name(x)) == format_name(x)` for all inputs.
pub fn format_name(name: &str) -> String {
    let name = SIZE_TAG.replace_all(name, "");
    let name = BRACKETS.replace_all(&name, "");
    let name = WHITESPACE_RUN.replace_all(&name, " ");
    name.trim_matches(|c: char| c == '-' || c.is_whitespace())
        .to_string()
}

/// Locates the payload folder after extraction.
///
/// Exactly one top-level subdirectory: that directory is the content
/// folder. No subdirectory but image files directly under the root: the
/// root itself is the content folder. Anything else is a benign no-op,
/// reported as `None`.
pub fn detect_content_folder(extract_dir: &Path) -> CoreResult<Option<PathBuf>> {
    let mut subdirs = Vec::new();
    let mut has_root_images = false;

    for entry in std::fs::read_dir(extract_dir)? {
        let path = entry?.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                ROOT_IMAGE_EXTENSIONS
                    .iter()
                    .any(|img| ext.eq_ignore_ascii_case(img))
            })
        {
            has_root_images = true;
        }
    }

    match subdirs.as_slice() {
        [single] => Ok(Some(single.clone())),
        [] if has_root_images => {
            debug!(
                "no subdirectory found, using extraction root '{}' as content folder",
                extract_dir.display()
            );
            Ok(Some(extract_dir.to_path_buf()))
        }
        [] => Ok(None),
        many => {
            warn!(
                "found {} top-level directories in '{}', expected exactly one",
                many.len(),
                extract_dir.display()
            );
            Ok(None)
        }
    }
}

/// Compiled deletion rules. Patterns are validated at startup by
/// `Config::validate`; compilation failures here still surface as
/// configuration errors rather than panics.
#[derive(Debug, Default)]
pub struct DeleteRules {
    prefix: Vec<Regex>,
    suffix: Vec<Regex>,
    exact: Vec<Regex>,
}

impl DeleteRules {
    pub fn compile(config: &DeleteConfig) -> CoreResult<Self> {
        let compile = |patterns: &[String], wrap: fn(&str) -> String| {
            patterns
                .iter()
                .map(|p| {
                    Regex::new(&wrap(p))
                        .map_err(|e| CoreError::Config(format!("invalid delete rule '{p}': {e}")))
                })
                .collect::<CoreResult<Vec<_>>>()
        };

        Ok(Self {
            prefix: compile(&config.prefix, |p| p.to_string())?,
            suffix: compile(&config.suffix, |p| format!("(?:{p})$"))?,
            exact: compile(&config.extra, |p| format!("^(?:{p})$"))?,
        })
    }

    /// Whether any rule matches the file. Prefix rules match at the start
    /// of the file name, suffix rules at its end, exact rules against the
    /// full file stem.
    fn matches(&self, file_name: &str, stem: &str) -> bool {
        if self
            .prefix
            .iter()
            .any(|re| re.find(file_name).is_some_and(|m| m.start() == 0))
        {
            return true;
        }
        if self.suffix.iter().any(|re| re.is_match(file_name)) {
            return true;
        }
        self.exact.iter().any(|re| re.is_match(stem))
    }
}

/// Recursively deletes files under `folder` matched by the rules. Returns
/// the number of files removed.
pub fn clean_files(folder: &Path, rules: &DeleteRules) -> CoreResult<usize> {
    let mut removed = 0;

    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_dir() {
            removed += clean_files(&path, rules)?;
            continue;
        }

        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);

        if rules.matches(file_name, stem) {
            debug!("deleting '{}'", path.display());
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }

    Ok(removed)
}

/// Renames files directly under the content folder to
/// `<prefix><4-digit index><original extension>`, 1-based and contiguous,
/// ordered by original file name.
pub fn rename_files(folder: &Path, prefix: &str) -> CoreResult<usize> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            path.is_file().then_some(path)
        })
        .collect();
    files.sort();

    // Two phases so a file already holding a target name is never
    // overwritten by an earlier rename.
    let mut staged = Vec::with_capacity(files.len());
    for (idx, path) in files.iter().enumerate() {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let staging = folder.join(format!(".renaming-{:04}{extension}", idx + 1));
        std::fs::rename(path, &staging)?;
        staged.push((staging, format!("{prefix}{:04}{extension}", idx + 1)));
    }
    for (staging, final_name) in staged {
        std::fs::rename(&staging, folder.join(final_name))?;
    }

    info!("renamed {} files in '{}'", files.len(), folder.display());
    Ok(files.len())
}
