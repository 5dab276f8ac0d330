//! Three-tier file-inclusion policy
//!
//! 1. version-control metadata and dependency-cache fragments, always excluded
//! 2. the configurable ignore list (substrings) and optional exclude globs
//! 3. everything else is included

use crate::config::{FilterConfig, default_ignore_patterns};
use crate::error::ConfigError;
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Path fragments excluded unconditionally
pub const METADATA_FRAGMENTS: &[&str] = &[".git/", "__pycache__/", "node_modules/"];

/// Why a path was or was not included
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Include,
    /// Tier 1
    MetadataPath(&'static str),
    /// Tier 2, substring list
    Ignored(String),
    /// Tier 2, glob list
    GlobExcluded,
}

impl FilterDecision {
    pub fn is_included(&self) -> bool {
        matches!(self, FilterDecision::Include)
    }
}

/// Decides whether a diffed file's lines are analyzed and split
#[derive(Debug, Clone)]
pub struct FileFilter {
    ignore_patterns: Vec<String>,
    exclude_globs: Option<GlobSet>,
}

impl FileFilter {
    pub fn new(ignore_patterns: Vec<String>) -> Self {
        Self {
            ignore_patterns,
            exclude_globs: None,
        }
    }

    /// Build from configuration, compiling exclude globs
    pub fn from_config(config: &FilterConfig) -> Result<Self, ConfigError> {
        let exclude_globs = if config.exclude_globs.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in &config.exclude_globs {
                let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidValue {
                    key: "filter.exclude_globs".to_string(),
                    reason: format!("invalid glob '{}': {}", pattern, e),
                })?;
                builder.add(glob);
            }
            Some(builder.build().map_err(|e| ConfigError::InvalidValue {
                key: "filter.exclude_globs".to_string(),
                reason: e.to_string(),
            })?)
        };

        Ok(Self {
            ignore_patterns: config.ignore_patterns.clone(),
            exclude_globs,
        })
    }

    pub fn decide(&self, path: &str) -> FilterDecision {
        if let Some(fragment) = METADATA_FRAGMENTS.iter().find(|f| path.contains(*f)) {
            return FilterDecision::MetadataPath(fragment);
        }

        if let Some(pattern) = self.ignore_patterns.iter().find(|p| path.contains(p.as_str())) {
            return FilterDecision::Ignored(pattern.clone());
        }

        if let Some(globs) = &self.exclude_globs
            && globs.is_match(path)
        {
            return FilterDecision::GlobExcluded;
        }

        FilterDecision::Include
    }

    pub fn should_include(&self, path: &str) -> bool {
        !path.is_empty() && self.decide(path).is_included()
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::new(default_ignore_patterns())
    }
}
