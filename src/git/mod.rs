//! Git repository access for commit-history extraction
//!
//! Provides the backend seam the pipeline queries (list commits, diffs,
//! changed files, file contents, root detection) plus repository validation.

/// Backend trait shared by the CLI and libgit2 implementations
pub mod backend;
/// Backend that runs the `git` binary
pub mod cli;
/// Backend built on libgit2
pub mod libgit2;
/// Repository validation predicates
pub mod repository;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::RepositoryBackend;
pub use cli::GitCli;
pub use libgit2::LibGit2Backend;
pub use repository::{
    is_inside_metadata_directory, is_valid_repository, repository_root, validate_repository,
};

use crate::config::BackendKind;
use crate::error::BackendCommandError;
use std::path::Path;
use std::sync::Arc;

/// Open the configured backend on `repo_path`
pub fn open_backend(
    kind: BackendKind,
    repo_path: &Path,
) -> Result<Arc<dyn RepositoryBackend>, BackendCommandError> {
    match kind {
        BackendKind::Cli => Ok(Arc::new(GitCli::new(repo_path))),
        BackendKind::Libgit2 => Ok(Arc::new(LibGit2Backend::discover(repo_path)?)),
    }
}
