pub use error::{Error, Result};
pub use fs::{DiskTree, FileTree};
pub use git::{DiffSource, GitCli};
pub use types::{DiffEntry, FileMode, FileToDelete};

use std::path::Path;

mod error;
mod fs;
mod git;
pub mod reconcile;
mod types;

/// Creates a new `Reconciler` for a checkouts root and an upstream template
/// root.
///
/// # Arguments
///
/// * `checkouts_root`: Directory containing repository checkouts, one per
///   repository name.
/// * `upstream_root`: Root of the upstream pipeline template tree.
///
/// # Errors
///
/// Returns an error if the upstream template root is not a directory.
pub fn new(checkouts_root: &Path, upstream_root: &Path) -> Result<reconcile::Reconciler> {
    reconcile::Reconciler::new(checkouts_root, upstream_root)
}
