use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::types::DiffEntry;

/// Trait defining the repository-diff operations required by the library
pub trait DiffSource {
    /// List the paths that differ between a repository's previous commit and
    /// the commit named by `after_commit_specifier`.
    ///
    /// # Errors
    ///
    /// Returns an error if the differences cannot be retrieved
    fn get_differences(
        &self,
        repository_name: &str,
        after_commit_specifier: &str,
    ) -> Result<Vec<DiffEntry>>;
}

/// Diff source backed by the local Git CLI. Each repository name resolves to
/// a checkout directory of the same name under a common root.
pub struct GitCli {
    checkouts_root: PathBuf,
}

impl GitCli {
    /// Creates a new `GitCli` instance over the given checkouts root
    #[must_use]
    pub const fn new(checkouts_root: PathBuf) -> Self {
        Self { checkouts_root }
    }

    /// Filesystem path of the named repository's checkout
    #[must_use]
    pub fn checkout_path(&self, repository_name: &str) -> PathBuf {
        self.checkouts_root.join(repository_name)
    }

    #[instrument(skip(self), fields(args = ?args, repo_path = %repo_path.display()))]
    fn run_git_command(&self, repo_path: &Path, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(repo_path)
            .output()
            .map_err(|e| Error::GitCommandError(e.to_string()))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            debug!(error = %error, "Git command failed");
            return Err(Error::GitCommandError(error.to_string()));
        }

        let result = String::from_utf8(output.stdout)
            .map(|s| s.trim().to_string())
            .map_err(|e| Error::GitCommandError(e.to_string()))?;

        debug!(
            output_length = result.len(),
            "Git command completed successfully"
        );
        Ok(result)
    }
}

impl DiffSource for GitCli {
    #[instrument(skip(self), fields(repository_name = %repository_name, after = %after_commit_specifier))]
    fn get_differences(
        &self,
        repository_name: &str,
        after_commit_specifier: &str,
    ) -> Result<Vec<DiffEntry>> {
        let repo_path = self.checkout_path(repository_name);
        let output = self.run_git_command(
            &repo_path,
            &[
                "diff",
                "--name-status",
                "--no-renames",
                &format!("{after_commit_specifier}^"),
                after_commit_specifier,
            ],
        )?;

        let mut entries = Vec::with_capacity(output.lines().count());
        for line in output.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 2 {
                let status = parts[0];
                let path = parts[1].to_string();
                let entry = match status {
                    "A" => DiffEntry {
                        before_path: None,
                        after_path: Some(path),
                    },
                    "D" => DiffEntry {
                        before_path: Some(path),
                        after_path: None,
                    },
                    _ => DiffEntry {
                        before_path: Some(path.clone()),
                        after_path: Some(path),
                    },
                };
                entries.push(entry);
            }
        }

        debug!(count = entries.len(), "Differences retrieved");
        Ok(entries)
    }
}
