//! Temporary working-directory management.
//!
//! Each job owns exactly one working directory under the configured temp
//! root, named after the source archive. The directory is removed when the
//! guard drops, which covers success, failure, and panic exit paths alike.

use crate::error::CoreResult;
use std::path::{Path, PathBuf};
use tempfile::{Builder as TempFileBuilder, NamedTempFile};

/// Scoped working directory for a single job. Removed on drop.
#[derive(Debug)]
pub struct JobWorkspace {
    dir: PathBuf,
}

impl JobWorkspace {
    /// Creates (or recreates) `temp_root/<name>`. A stale directory left
    /// over from an interrupted run is cleared first.
    pub fn create(temp_root: &Path, name: &str) -> CoreResult<Self> {
        let dir = temp_root.join(name);
        if dir.is_dir() {
            std::fs::remove_dir_all(&dir)?;
        }
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!(
                    "failed to remove temp directory '{}': {e}",
                    self.dir.display()
                );
            }
        }
    }
}

/// Creates a temporary file with prefix and extension. Auto-deleted when
/// dropped; used for the intermediate TAR of streamed archive builds.
pub fn create_temp_file(dir: &Path, prefix: &str, extension: &str) -> CoreResult<NamedTempFile> {
    std::fs::create_dir_all(dir)?;
    let temp_file = TempFileBuilder::new()
        .prefix(&format!("{prefix}_"))
        .suffix(&format!(".{extension}"))
        .tempfile_in(dir)?;

    Ok(temp_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn workspace_is_removed_on_drop() {
        let root = tempdir().unwrap();
        let path = {
            let ws = JobWorkspace::create(root.path(), "job-a").unwrap();
            assert!(ws.path().is_dir());
            std::fs::write(ws.path().join("leftover.txt"), b"x").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn stale_workspace_is_cleared_on_create() {
        let root = tempdir().unwrap();
        let stale = root.path().join("job-b");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join("old.bin"), b"stale").unwrap();

        let ws = JobWorkspace::create(root.path(), "job-b").unwrap();
        assert!(std::fs::read_dir(ws.path()).unwrap().next().is_none());
    }
}
