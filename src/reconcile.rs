use crate::error::{Error, Result};
use crate::fs::{DiskTree, FileTree};
use crate::git::{DiffSource, GitCli};
use crate::types::{DiffEntry, FileMode, FileToDelete};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Top-level directories owned by the user; their subtrees are never deleted.
/// Matching is case-sensitive.
pub const PROTECTED_DIRECTORIES: &[&str] = &["deployment_maps"];

/// File extensions exempt from deletion anywhere in the tree, matched
/// case-insensitively. Stored without the leading dot.
pub const PROTECTED_SUFFIXES: &[&str] = &["yml", "yaml", "json"];

/// Relative paths that must be committed with the executable bit set.
pub const EXECUTABLE_FILES: &[&str] = &[
    "build/helpers/package_transform.sh",
    "build/helpers/retrieve_organization_accounts.py",
    "build/helpers/sync_to_s3.py",
    "build/helpers/terraform/install_terraform.sh",
];

/// Computes reconciliation decisions for repository checkouts against the
/// upstream template tree.
pub struct Reconciler {
    diff: GitCli,
    tree: DiskTree,
    upstream_root: PathBuf,
}

impl Reconciler {
    /// Create a reconciler over a checkouts root and an upstream template root
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream template root is not a directory.
    #[instrument]
    pub fn new(checkouts_root: &Path, upstream_root: &Path) -> Result<Self> {
        debug!(
            checkouts_root = %checkouts_root.display(),
            upstream_root = %upstream_root.display(),
            "Creating reconciler"
        );

        if !upstream_root.is_dir() {
            return Err(Error::DirectoryNotFound(
                upstream_root.display().to_string(),
            ));
        }

        Ok(Self {
            diff: GitCli::new(checkouts_root.to_path_buf()),
            tree: DiskTree,
            upstream_root: upstream_root.to_path_buf(),
        })
    }

    /// Paths that are no longer part of the upstream template, are not
    /// protected, and so must be removed from the target repository.
    ///
    /// # Errors
    ///
    /// Diff-service and directory-listing failures propagate unchanged.
    #[instrument(skip(self))]
    pub fn get_files_to_delete(&self, repository_name: &str) -> Result<Vec<FileToDelete>> {
        debug!(repository_name = %repository_name, "Computing files to delete");

        let differences = self.diff.get_differences(repository_name, "HEAD")?;
        let upstream_files = Self::upstream_file_set(&self.upstream_root, &self.tree)?;
        let repo_root = self.diff.checkout_path(repository_name);

        let result =
            Self::filter_differences(&differences, &upstream_files, &repo_root, &self.tree);
        debug!(count = result.len(), "Files to delete computed");
        Ok(result)
    }

    /// Classify the permission mode of every file in the upstream template
    /// tree, keyed by its template-relative path.
    ///
    /// # Errors
    ///
    /// Returns an error if the template tree cannot be listed.
    #[instrument(skip(self))]
    pub fn upstream_file_modes(&self) -> Result<Vec<(String, FileMode)>> {
        let base_path = self
            .upstream_root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut modes: Vec<(String, FileMode)> = self
            .tree
            .list_files(&self.upstream_root)?
            .iter()
            .map(|file| {
                let relative = file
                    .strip_prefix(&self.upstream_root)
                    .unwrap_or(file)
                    .to_string_lossy()
                    .into_owned();
                (relative, determine_file_mode(file, &base_path))
            })
            .collect();
        modes.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(modes)
    }

    fn upstream_file_set(upstream_root: &Path, tree: &impl FileTree) -> Result<HashSet<String>> {
        Ok(tree
            .list_files(upstream_root)?
            .iter()
            .filter_map(|file| file.strip_prefix(upstream_root).ok())
            .map(|relative| relative.to_string_lossy().into_owned())
            .collect())
    }

    fn filter_differences(
        differences: &[DiffEntry],
        upstream_files: &HashSet<String>,
        repo_root: &Path,
        tree: &impl FileTree,
    ) -> Vec<FileToDelete> {
        differences
            .iter()
            .filter_map(|entry| entry.after_path.as_deref())
            .filter(|path| !tree.is_dir(&repo_root.join(path)))
            .filter(|path| !has_protected_prefix(path))
            .filter(|path| !has_protected_suffix(path))
            .filter(|path| !upstream_files.contains(*path))
            .map(|path| FileToDelete {
                file_path: path.to_string(),
            })
            .collect()
    }
}

fn has_protected_prefix(path: &str) -> bool {
    path.split('/')
        .next()
        .is_some_and(|segment| PROTECTED_DIRECTORIES.contains(&segment))
}

fn has_protected_suffix(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            PROTECTED_SUFFIXES.contains(&extension.to_ascii_lowercase().as_str())
        })
}

/// Decide the permission mode for a file about to be committed.
///
/// `base_path` is the directory component anchoring the repository root;
/// everything up to and including its last occurrence is stripped before the
/// allow-list comparison. Matching is exact full relative-path equality.
#[must_use]
pub fn determine_file_mode(path: &Path, base_path: &str) -> FileMode {
    let full = path.to_string_lossy();
    let anchor = format!("{base_path}/");
    let relative = full
        .rsplit_once(anchor.as_str())
        .map_or(full.as_ref(), |(_, rest)| rest);

    if EXECUTABLE_FILES.contains(&relative) {
        FileMode::Executable
    } else {
        FileMode::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeTree {
        files: Vec<PathBuf>,
        dirs: HashSet<PathBuf>,
    }

    impl FileTree for FakeTree {
        fn list_files(&self, _root: &Path) -> Result<Vec<PathBuf>> {
            Ok(self.files.clone())
        }

        fn is_dir(&self, path: &Path) -> bool {
            self.dirs.contains(path)
        }
    }

    fn changed(path: &str) -> DiffEntry {
        DiffEntry {
            before_path: Some(path.to_string()),
            after_path: Some(path.to_string()),
        }
    }

    const UPSTREAM_FILES: &[&str] = &["some.yml", "otherfile.txt", "samples/python.py"];

    fn fixture_tree(upstream_root: &Path, repo_root: &Path, dirs: &[&str]) -> FakeTree {
        FakeTree {
            files: UPSTREAM_FILES
                .iter()
                .map(|path| upstream_root.join(path))
                .collect(),
            dirs: dirs.iter().map(|dir| repo_root.join(dir)).collect(),
        }
    }

    #[test]
    fn filters_protected_and_upstream_paths() {
        let upstream_root = Path::new("/srv/template");
        let repo_root = Path::new("/srv/checkouts/some-repo");
        let tree = fixture_tree(upstream_root, repo_root, &["deployment_maps", "deployment"]);

        let differences: Vec<DiffEntry> = [
            "some.yml",
            "otherfile.txt",
            "samples/python.py",
            "global.yml",
            "REGIONAL.YML",
            "regional.yml",
            "scp.json",
            "other.JSON",
            "other.yaml",
            "deployment_maps/test.yml",
            "deployment_maps",
            "deployment",
            "other.txt",
            "pipeline_types/cc-cloudformation.yml.j2",
            "cc-cloudformation.yml.j2",
        ]
        .iter()
        .map(|path| changed(path))
        .collect();

        let upstream_files = Reconciler::upstream_file_set(upstream_root, &tree).unwrap();
        let result =
            Reconciler::filter_differences(&differences, &upstream_files, repo_root, &tree);

        let paths: Vec<&str> = result.iter().map(|f| f.file_path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "other.txt",
                "pipeline_types/cc-cloudformation.yml.j2",
                "cc-cloudformation.yml.j2",
            ]
        );
    }

    #[test]
    fn suffix_protection_is_case_insensitive() {
        let upstream_root = Path::new("/srv/template");
        let repo_root = Path::new("/srv/checkouts/some-repo");
        let tree = fixture_tree(upstream_root, repo_root, &[]);
        let upstream_files = HashSet::new();

        let differences: Vec<DiffEntry> = ["a.YML", "b.Yml", "c.JSON", "d.YaMl"]
            .iter()
            .map(|path| changed(path))
            .collect();

        let result =
            Reconciler::filter_differences(&differences, &upstream_files, repo_root, &tree);
        assert!(result.is_empty());
    }

    #[test]
    fn prefix_protection_is_case_sensitive() {
        let upstream_root = Path::new("/srv/template");
        let repo_root = Path::new("/srv/checkouts/some-repo");
        let tree = fixture_tree(upstream_root, repo_root, &[]);
        let upstream_files = HashSet::new();

        let differences = vec![
            changed("Deployment_maps/readme.txt"),
            changed("deployment_maps/readme.txt"),
        ];

        let result =
            Reconciler::filter_differences(&differences, &upstream_files, repo_root, &tree);
        let paths: Vec<&str> = result.iter().map(|f| f.file_path.as_str()).collect();
        assert_eq!(paths, vec!["Deployment_maps/readme.txt"]);
    }

    #[test]
    fn prefix_protection_requires_a_whole_segment() {
        let upstream_root = Path::new("/srv/template");
        let repo_root = Path::new("/srv/checkouts/some-repo");
        let tree = fixture_tree(upstream_root, repo_root, &[]);
        let upstream_files = HashSet::new();

        let differences = vec![changed("deployment_maps_backup/readme.txt")];

        let result =
            Reconciler::filter_differences(&differences, &upstream_files, repo_root, &tree);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn paths_without_extension_are_not_suffix_protected() {
        let upstream_root = Path::new("/srv/template");
        let repo_root = Path::new("/srv/checkouts/some-repo");
        let tree = fixture_tree(upstream_root, repo_root, &[]);
        let upstream_files = HashSet::new();

        let differences = vec![changed("Makefile")];

        let result =
            Reconciler::filter_differences(&differences, &upstream_files, repo_root, &tree);
        assert_eq!(
            result,
            vec![FileToDelete {
                file_path: "Makefile".to_string()
            }]
        );
    }

    #[test]
    fn entries_without_after_path_are_skipped() {
        let upstream_root = Path::new("/srv/template");
        let repo_root = Path::new("/srv/checkouts/some-repo");
        let tree = fixture_tree(upstream_root, repo_root, &[]);
        let upstream_files = HashSet::new();

        let differences = vec![
            DiffEntry {
                before_path: Some("removed_upstream.txt".to_string()),
                after_path: None,
            },
            changed("still_here.txt"),
        ];

        let result =
            Reconciler::filter_differences(&differences, &upstream_files, repo_root, &tree);
        let paths: Vec<&str> = result.iter().map(|f| f.file_path.as_str()).collect();
        assert_eq!(paths, vec!["still_here.txt"]);
    }

    #[test]
    fn empty_diff_yields_empty_output() {
        let upstream_root = Path::new("/srv/template");
        let repo_root = Path::new("/srv/checkouts/some-repo");
        let tree = fixture_tree(upstream_root, repo_root, &[]);
        let upstream_files = Reconciler::upstream_file_set(upstream_root, &tree).unwrap();

        let result = Reconciler::filter_differences(&[], &upstream_files, repo_root, &tree);
        assert!(result.is_empty());
    }

    #[test]
    fn determine_file_mode_normal_for_regular_files() {
        for entry in ["README.md", "deployment_map.yml"] {
            let path = PathBuf::from(format!("/some/test/{entry}"));
            assert_eq!(determine_file_mode(&path, "test"), FileMode::Normal);
        }
    }

    #[test]
    fn determine_file_mode_executable_for_allow_listed_entries() {
        for entry in EXECUTABLE_FILES {
            let path = PathBuf::from(format!("/some/test/{entry}"));
            assert_eq!(determine_file_mode(&path, "test"), FileMode::Executable);
        }
    }

    #[test]
    fn determine_file_mode_rejects_near_matches() {
        let by_case = PathBuf::from("/some/test/build/helpers/SYNC_TO_S3.PY");
        assert_eq!(determine_file_mode(&by_case, "test"), FileMode::Normal);

        // Suffix of an allow-listed path, not a full match
        let by_suffix = PathBuf::from("/some/test/helpers/sync_to_s3.py");
        assert_eq!(determine_file_mode(&by_suffix, "test"), FileMode::Normal);
    }
}
