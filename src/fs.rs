use std::path::{Path, PathBuf};
use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::error::Result;

/// Filesystem capabilities required by the difference filter, injected so the
/// filter logic is testable without real disk access.
pub trait FileTree {
    /// Recursively list every file (not directory) under `root`, as absolute
    /// paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be traversed
    fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>>;

    /// Whether `path` currently resolves to a directory
    fn is_dir(&self, path: &Path) -> bool;
}

/// `FileTree` implementation backed by the real filesystem
pub struct DiskTree;

impl FileTree for DiskTree {
    #[instrument(skip(self), fields(root = %root.display()))]
    fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        debug!(count = files.len(), "Directory listing completed");
        Ok(files)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}
