//! Repository validation, run once before any extraction

use super::backend::RepositoryBackend;
use super::open_backend;
use crate::config::BackendKind;
use crate::error::ValidationError;
use std::path::{Component, Path, PathBuf};

const METADATA_DIR: &str = ".git";

/// True when any component of `path` is the `.git` metadata directory
pub fn is_inside_metadata_directory(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(name) if name == METADATA_DIR))
}

/// Check that `path` is an indexable repository
///
/// Returns the canonical top of the working tree, so any subdirectory of a
/// repository resolves to the same path. The checks run in order: the path
/// exists and is a directory, it is not (inside) a metadata directory, the
/// backend recognizes a repository there, and that repository is not bare.
pub fn validate_repository(path: &Path, kind: BackendKind) -> Result<PathBuf, ValidationError> {
    let display = path.display().to_string();

    if !path.exists() {
        return Err(ValidationError::PathNotFound(display));
    }
    if !path.is_dir() {
        return Err(ValidationError::NotADirectory(display));
    }

    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if is_inside_metadata_directory(path) || is_inside_metadata_directory(&canonical) {
        return Err(ValidationError::InsideMetadataDirectory(display));
    }

    let backend = open_backend(kind, &canonical)
        .map_err(|e| ValidationError::NotARepository(format!("{} ({})", display, e.stderr)))?;
    check_backend(backend.as_ref(), &display)?;

    Ok(repository_root(backend.as_ref()).unwrap_or(canonical))
}

/// Canonical working-tree root as the backend reports it
pub fn repository_root(backend: &dyn RepositoryBackend) -> Option<PathBuf> {
    let top = backend.toplevel().ok()?;
    top.canonicalize().ok()
}

fn check_backend(backend: &dyn RepositoryBackend, display: &str) -> Result<(), ValidationError> {
    backend
        .probe()
        .map_err(|e| ValidationError::NotARepository(format!("{} ({})", display, e.stderr)))?;

    match backend.is_bare() {
        Ok(false) => Ok(()),
        Ok(true) => Err(ValidationError::BareRepository(display.to_string())),
        Err(e) => Err(ValidationError::NotARepository(format!(
            "{} ({})",
            display, e.stderr
        ))),
    }
}

/// Predicate form of [`validate_repository`] using the git CLI
pub fn is_valid_repository(path: &Path) -> bool {
    validate_repository(path, BackendKind::Cli).is_ok()
}
