//! # gitdive - Commit History Decomposition for Retrieval
//!
//! Turns the history of a local git repository into retrievable text units.
//! Each commit's content is extracted, its diff is scanned for the functions
//! and types it touches, and the diff is cut into per-file hunks that carry
//! commit metadata.
//!
//! ## Overview
//!
//! Root commits have no parent, so their tracked files are read and
//! size-bounded. Every other commit contributes its zero-context diff against
//! the first parent. Files under build or VCS metadata directories and binary
//! or lock artifacts are filtered out before analysis.
//!
//! ## Architecture
//!
//! ```text
//! RepositoryBackend (git CLI | libgit2)
//!          │ commits, diffs, file contents
//! CommitContentExtractor
//!          │ RawCommitContent
//!   ┌──────┴───────────────┐
//! StructuralDiffAnalyzer  HunkSplitter
//!   └──────┬───────────────┘
//! UnitAssembler ──► IndexableUnit ──► UnitSink (JsonlIndexStore)
//! ```
//!
//! ## Modules
//!
//! - [`git`]: backend seam and repository validation
//! - [`extractor`]: per-commit content extraction
//! - [`diff`]: file filtering, structural analysis and hunk splitting
//! - [`assembler`]: indexable unit construction
//! - [`pipeline`]: per-commit state machine, worker pool and cancellation
//! - [`storage`]: on-disk unit store
//! - [`indexer`]: validate, extract, assemble, persist
//! - [`config`]: configuration with environment variable overrides
//! - [`logging`]: injected logger capability
//! - [`types`]: data model
//! - [`error`]: error types and result aliases
//! - [`paths`]: platform paths and repository keys
//!
//! ## Usage Example
//!
//! ```no_run
//! use gitdive::config::Config;
//! use gitdive::pipeline::{build_units, extract_commits};
//! use std::path::Path;
//!
//! fn main() -> gitdive::error::Result<()> {
//!     let config = Config::default();
//!     let commits = extract_commits(Path::new("."), &config)?;
//!     let units = build_units(&commits, &config)?;
//!     println!("{} units from {} commits", units.len(), commits.len());
//!     Ok(())
//! }
//! ```

/// Indexable unit construction from commits, hunks and change sets
pub mod assembler;

/// Configuration management with environment variable overrides
pub mod config;

/// Diff filtering, structural analysis and hunk splitting
pub mod diff;

/// Error types and utilities
pub mod error;

/// Per-commit content extraction
pub mod extractor;

/// Git repository access and validation
pub mod git;

/// Repository indexing orchestration
pub mod indexer;

/// Injected logging capability
pub mod logging;

/// Path normalization and utility functions
pub mod paths;

/// Per-commit processing pipeline
pub mod pipeline;

/// On-disk unit persistence
pub mod storage;

/// Commit, diff and unit data model
pub mod types;
