/// Centralized error types for gitdive using thiserror
///
/// Per-commit failures are isolated by the pipeline and never abort a run;
/// repository validation and configuration errors are fatal and surface
/// before any extraction begins.
use thiserror::Error;

/// Main error type for gitdive
#[derive(Error, Debug)]
pub enum GitdiveError {
    #[error("Git backend error: {0}")]
    Backend(#[from] BackendCommandError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Structural parse error: {0}")]
    StructuralParse(#[from] StructuralParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result alias used across the crate
pub type Result<T, E = GitdiveError> = std::result::Result<T, E>;

/// A version-control backend invocation failed
///
/// Carries the attempted arguments and whatever diagnostic output the backend
/// produced (stderr for the CLI, the library message for libgit2).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("git {} failed: {stderr}", args.join(" "))]
pub struct BackendCommandError {
    pub args: Vec<String>,
    pub stderr: String,
    /// Exit status when the process ran; `None` when it never started
    pub exit_code: Option<i32>,
}

impl BackendCommandError {
    pub fn new(args: &[&str], stderr: impl Into<String>) -> Self {
        Self {
            args: args.iter().map(|a| a.to_string()).collect(),
            stderr: stderr.into().trim_end().to_string(),
            exit_code: None,
        }
    }

    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    /// The backend ran and reported a failure (as opposed to not running)
    pub fn is_exit_failure(&self) -> bool {
        self.exit_code.is_some()
    }
}

/// Repository-level validation failures (fatal for the whole run)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Path does not exist: {0}")]
    PathNotFound(String),

    #[error("Path is not a directory: {0}")]
    NotADirectory(String),

    #[error("Cannot index a path inside a .git directory: {0}")]
    InsideMetadataDirectory(String),

    #[error("Not a git repository: {0}")]
    NotARepository(String),

    #[error("Bare repositories are not supported: {0}")]
    BareRepository(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors raised by the on-disk unit store
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to prepare index directory '{path}': {reason}")]
    PrepareFailed { path: String, reason: String },

    #[error("Index for '{0}' is locked by another process")]
    Locked(String),

    #[error("Failed to write units: {0}")]
    WriteFailed(String),

    #[error("Failed to read index '{path}': {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Failed to remove index '{path}': {reason}")]
    CleanupFailed { path: String, reason: String },
}

/// Reasons the structural pass gives up and hands over to the degraded pass
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralParseError {
    #[error("malformed file header at line {line_no}: {line}")]
    MalformedHeader { line_no: usize, line: String },

    #[error("line {line_no} is {len} chars long (limit {max})")]
    LineTooLong { line_no: usize, len: usize, max: usize },
}

impl From<anyhow::Error> for GitdiveError {
    fn from(err: anyhow::Error) -> Self {
        GitdiveError::Other(format!("{:#}", err))
    }
}

impl GitdiveError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        GitdiveError::Other(msg.into())
    }

    /// Whether this error must stop the run before extraction starts
    pub fn is_fatal(&self) -> bool {
        matches!(self, GitdiveError::Validation(_) | GitdiveError::Config(_))
    }

    /// Check if this is a user error (bad path, bad config) vs system error
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            GitdiveError::Validation(_) | GitdiveError::Config(ConfigError::InvalidValue { .. })
        )
    }
}
