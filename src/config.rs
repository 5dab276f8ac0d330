/// Configuration system for gitdive
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, GitdiveError};
use crate::types::UnitGranularity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Commit extraction configuration
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Structural diff analysis configuration
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// File-inclusion policy
    #[serde(default)]
    pub filter: FilterConfig,

    /// Indexable unit assembly
    #[serde(default)]
    pub assembly: AssemblyConfig,

    /// On-disk unit store
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Which repository backend answers git queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The `git` command-line binary
    #[default]
    Cli,
    /// In-process libgit2
    Libgit2,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cli" | "git" => Ok(BackendKind::Cli),
            "libgit2" | "git2" => Ok(BackendKind::Libgit2),
            other => Err(format!("must be 'cli' or 'libgit2', got '{}'", other)),
        }
    }
}

/// Commit extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Repository backend
    #[serde(default)]
    pub backend: BackendKind,

    /// Maximum bytes kept per file when reconstructing a root commit
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// Worker threads processing commits (1 = strictly sequential)
    #[serde(default = "default_workers")]
    pub workers: usize,
}

/// Structural diff analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Lines longer than this abort the structural pass (degraded result)
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

/// File-inclusion policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Substrings that exclude a file path (lock files, media, archives)
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    /// Extra glob patterns that exclude a file path
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

/// Indexable unit assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Unit granularity
    #[serde(default)]
    pub granularity: UnitGranularity,

    /// Unit text longer than this is truncated
    #[serde(default = "default_max_unit_chars")]
    pub max_unit_chars: usize,
}

/// Unit store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one sub-directory per indexed repository
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,
}

// Default value functions
fn default_max_file_size() -> usize {
    10_000
}

fn default_workers() -> usize {
    1
}

fn default_max_line_length() -> usize {
    4_000
}

fn default_max_unit_chars() -> usize {
    6_000 // ~1500 tokens
}

/// Default tier-two ignore list
pub fn default_ignore_patterns() -> Vec<String> {
    [".lock", ".png", ".jpg", ".pdf", ".zip", ".exe", ".dll"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_index_dir() -> PathBuf {
    crate::paths::PlatformPaths::default_index_dir()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            max_file_size: default_max_file_size(),
            workers: default_workers(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_line_length: default_max_line_length(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: default_ignore_patterns(),
            exclude_globs: Vec::new(),
        }
    }
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            granularity: UnitGranularity::default(),
            max_unit_chars: default_max_unit_chars(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index_dir: default_index_dir(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, GitdiveError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, GitdiveError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::debug!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), GitdiveError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), GitdiveError> {
        let positive = [
            ("extraction.max_file_size", self.extraction.max_file_size),
            ("extraction.workers", self.extraction.workers),
            ("analysis.max_line_length", self.analysis.max_line_length),
            ("assembly.max_unit_chars", self.assembly.max_unit_chars),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: "must be greater than 0".to_string(),
                }
                .into());
            }
        }

        if let Some(bad) = self.filter.ignore_patterns.iter().find(|p| p.is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: "filter.ignore_patterns".to_string(),
                reason: format!("empty pattern '{}' would exclude every file", bad),
            }
            .into());
        }

        for glob in &self.filter.exclude_globs {
            globset::Glob::new(glob).map_err(|e| ConfigError::InvalidValue {
                key: "filter.exclude_globs".to_string(),
                reason: format!("invalid glob '{}': {}", glob, e),
            })?;
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(backend) = var("GITDIVE_BACKEND") {
            match backend.parse() {
                Ok(kind) => self.extraction.backend = kind,
                Err(e) => tracing::warn!("Ignoring GITDIVE_BACKEND: {}", e),
            }
        }

        if let Some(size) = var("GITDIVE_MAX_FILE_SIZE").and_then(|v| v.parse().ok()) {
            self.extraction.max_file_size = size;
        }

        if let Some(workers) = var("GITDIVE_WORKERS").and_then(|v| v.parse().ok()) {
            self.extraction.workers = workers;
        }

        if let Some(len) = var("GITDIVE_MAX_LINE_LENGTH").and_then(|v| v.parse().ok()) {
            self.analysis.max_line_length = len;
        }

        if let Some(granularity) = var("GITDIVE_GRANULARITY") {
            match granularity.parse() {
                Ok(g) => self.assembly.granularity = g,
                Err(e) => tracing::warn!("Ignoring GITDIVE_GRANULARITY: {}", e),
            }
        }

        if let Some(dir) = var("GITDIVE_INDEX_DIR") {
            self.storage.index_dir = PathBuf::from(dir);
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, GitdiveError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests;
