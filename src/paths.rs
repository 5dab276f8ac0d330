/// Centralized platform-specific path computation
///
/// Index data lives under the platform data directory, configuration under the
/// platform config directory, both in a `gitdive` sub-folder.
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

const PROJECT_DIR: &str = "gitdive";

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    /// `{data_local_dir}/gitdive`, falling back to `./.gitdive`
    pub fn project_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join(PROJECT_DIR))
            .unwrap_or_else(|| PathBuf::from(".").join(format!(".{}", PROJECT_DIR)))
    }

    /// `{config_dir}/gitdive`, falling back to `./.gitdive`
    pub fn project_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join(PROJECT_DIR))
            .unwrap_or_else(|| PathBuf::from(".").join(format!(".{}", PROJECT_DIR)))
    }

    /// Returns: {data_dir}/gitdive/repos
    pub fn default_index_dir() -> PathBuf {
        Self::project_data_dir().join("repos")
    }

    /// Returns: {config_dir}/gitdive/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::project_config_dir().join("config.toml")
    }
}

/// Stable directory name for a repository: hex SHA-256 of its path
pub fn repo_key(repo_path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(repo_path.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Canonicalize when possible so the same repository always maps to one key
pub fn normalize_repo_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
