use crate::error::BackendCommandError;
use crate::types::CommitRecord;
use std::path::{Path, PathBuf};

/// Queries a version-controlled repository answers for the pipeline
///
/// Every call is a blocking, read-only query; implementations must tolerate
/// concurrent calls against the same repository.
pub trait RepositoryBackend: Send + Sync {
    /// Repository root the backend was opened on
    fn repo_path(&self) -> &Path;

    /// Confirm the path is inside a repository
    fn probe(&self) -> Result<(), BackendCommandError>;

    /// Whether the repository has no working tree
    fn is_bare(&self) -> Result<bool, BackendCommandError>;

    /// Top of the working tree, whichever subdirectory the backend was opened on
    fn toplevel(&self) -> Result<PathBuf, BackendCommandError>;

    /// Commits reachable from HEAD, newest first
    fn list_commits(&self) -> Result<Vec<CommitRecord>, BackendCommandError>;

    /// Resolve any revision expression to its commit record
    fn commit_record(&self, rev: &str) -> Result<CommitRecord, BackendCommandError>;

    /// Zero-context unified diff of `id` against its first parent, with
    /// file headers and no commit message
    fn commit_diff(&self, id: &str) -> Result<String, BackendCommandError>;

    /// Paths touched by `id`; every tracked path for a root commit
    fn changed_files(&self, id: &str) -> Result<Vec<String>, BackendCommandError>;

    /// File text at `id`, empty when the path is missing or binary
    fn file_content_at_commit(&self, id: &str, path: &str)
    -> Result<String, BackendCommandError>;

    /// True iff the commit has no parent
    fn is_root_commit(&self, id: &str) -> Result<bool, BackendCommandError>;
}

/// Bytes inspected when sniffing for binary content
pub(crate) const BINARY_SNIFF_LEN: usize = 8000;

/// Git's own heuristic: a NUL byte near the start means binary
pub(crate) fn looks_binary(bytes: &[u8]) -> bool {
    bytes[..bytes.len().min(BINARY_SNIFF_LEN)].contains(&0)
}
