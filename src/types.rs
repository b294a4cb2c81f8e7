use serde::Serialize;

/// A single record from a repository diff. Either side may be absent: an
/// entry with no `after_path` describes a file that no longer exists at the
/// current head.
#[derive(Debug, Clone)]
pub struct DiffEntry {
    pub before_path: Option<String>,
    pub after_path: Option<String>,
}

/// A path that must be removed from the target repository because it is no
/// longer part of the upstream template and is not protected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FileToDelete {
    pub file_path: String,
}

/// Permission mode a file must carry when committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileMode {
    Normal,
    Executable,
}
