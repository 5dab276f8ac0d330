use super::filter::FileFilter;
use super::patterns::{DeclarationKind, match_declaration};
use super::{Header, Polarity, change_polarity, header_path, parse_header};
use crate::config::Config;
use crate::error::{ConfigError, StructuralParseError};
use crate::logging::SharedLogger;
use crate::types::{DiffStats, StructuralAnalysis, StructuralChangeSet};
use std::collections::BTreeSet;

/// Default limit above which a single line aborts the structural pass
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4_000;

/// Extracts function/type level changes from unified diff text
///
/// The structural pass never surfaces an error to callers: when it fails the
/// analyzer logs the reason and returns line-level counts from a degraded pass
/// that shares the same file-header and line-prefix rules.
pub struct StructuralDiffAnalyzer {
    filter: FileFilter,
    max_line_length: usize,
    logger: SharedLogger,
}

/// Sets filled during one structural scan
#[derive(Default)]
struct ScanState {
    added_functions: BTreeSet<String>,
    removed_functions: BTreeSet<String>,
    added_types: BTreeSet<String>,
    removed_types: BTreeSet<String>,
    modified_files: BTreeSet<String>,
    lines_added: usize,
    lines_removed: usize,
}

impl ScanState {
    fn record(&mut self, kind: DeclarationKind, polarity: Polarity, name: &str) {
        let set = match (kind, polarity) {
            (DeclarationKind::Function, Polarity::Added) => &mut self.added_functions,
            (DeclarationKind::Function, Polarity::Removed) => &mut self.removed_functions,
            (DeclarationKind::Type, Polarity::Added) => &mut self.added_types,
            (DeclarationKind::Type, Polarity::Removed) => &mut self.removed_types,
        };
        set.insert(name.to_string());
    }

    fn finish(mut self) -> StructuralChangeSet {
        let modified_functions = promote(&mut self.added_functions, &mut self.removed_functions);
        let modified_types = promote(&mut self.added_types, &mut self.removed_types);

        StructuralChangeSet {
            added_functions: self.added_functions,
            removed_functions: self.removed_functions,
            modified_functions,
            added_types: self.added_types,
            removed_types: self.removed_types,
            modified_types,
            modified_files: self.modified_files,
            lines_added: self.lines_added,
            lines_removed: self.lines_removed,
        }
    }
}

/// Move names present in both polarities into the returned "modified" set
fn promote(added: &mut BTreeSet<String>, removed: &mut BTreeSet<String>) -> BTreeSet<String> {
    let modified: BTreeSet<String> = added.intersection(removed).cloned().collect();
    for name in &modified {
        added.remove(name);
        removed.remove(name);
    }
    modified
}

impl StructuralDiffAnalyzer {
    pub fn new(filter: FileFilter, logger: SharedLogger) -> Self {
        Self {
            filter,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            logger,
        }
    }

    pub fn from_config(config: &Config, logger: SharedLogger) -> Result<Self, ConfigError> {
        Ok(Self::new(FileFilter::from_config(&config.filter)?, logger)
            .with_max_line_length(config.analysis.max_line_length))
    }

    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    pub fn filter(&self) -> &FileFilter {
        &self.filter
    }

    /// Analyze a diff, reporting whether the structural pass completed
    pub fn analyze(&self, diff: &str) -> StructuralAnalysis {
        if diff.trim().is_empty() {
            return StructuralAnalysis::Full(StructuralChangeSet::default());
        }

        match self.structural_pass(diff) {
            Ok(changes) => {
                self.logger.debug(&format!(
                    "Parsed structural changes: {} items from {} files (+{}/-{} lines)",
                    changes.total_items(),
                    changes.modified_files.len(),
                    changes.lines_added,
                    changes.lines_removed
                ));
                StructuralAnalysis::Full(changes)
            }
            Err(reason) => {
                self.logger.error(&format!(
                    "Diff parsing failed ({}), using basic analysis",
                    reason
                ));
                let stats = self.line_stats(diff);
                self.logger.debug(&format!(
                    "Fallback parsing: {} files, +{}/-{} lines",
                    stats.modified_files.len(),
                    stats.lines_added,
                    stats.lines_removed
                ));
                StructuralAnalysis::Degraded { stats, reason }
            }
        }
    }

    /// Structural change set for a diff; empty name collections when the
    /// structural pass had to be abandoned
    pub fn parse_structural_changes(&self, diff: &str) -> StructuralChangeSet {
        self.analyze(diff).into_change_set()
    }

    /// Full pass: line counts plus declaration names
    pub fn structural_pass(&self, diff: &str) -> Result<StructuralChangeSet, StructuralParseError> {
        let mut state = ScanState::default();
        let mut include_current = false;

        for (idx, line) in diff.lines().enumerate() {
            let line_no = idx + 1;

            match parse_header(line) {
                Header::Path(path) => {
                    include_current = self.filter.should_include(path);
                    if include_current {
                        state.modified_files.insert(path.to_string());
                    }
                    continue;
                }
                Header::Malformed => {
                    return Err(StructuralParseError::MalformedHeader {
                        line_no,
                        line: line.to_string(),
                    });
                }
                Header::None => {}
            }

            if !include_current {
                continue;
            }
            let Some(polarity) = change_polarity(line) else {
                continue;
            };

            if line.len() > self.max_line_length {
                let len = line.chars().count();
                if len > self.max_line_length {
                    return Err(StructuralParseError::LineTooLong {
                        line_no,
                        len,
                        max: self.max_line_length,
                    });
                }
            }

            match polarity {
                Polarity::Added => state.lines_added += 1,
                Polarity::Removed => state.lines_removed += 1,
            }

            for kind in [DeclarationKind::Function, DeclarationKind::Type] {
                if let Some(decl) = match_declaration(line, kind) {
                    state.record(kind, polarity, decl.name);
                }
            }
        }

        Ok(state.finish())
    }

    /// Degraded pass: files and line counts only, lenient about headers
    pub fn line_stats(&self, diff: &str) -> DiffStats {
        let mut stats = DiffStats::default();
        let mut include_current = false;

        for line in diff.lines() {
            if line.starts_with("diff --git") {
                include_current = match header_path(line) {
                    Some(path) if self.filter.should_include(&path) => {
                        stats.modified_files.insert(path);
                        true
                    }
                    _ => false,
                };
                continue;
            }

            if !include_current {
                continue;
            }
            match change_polarity(line) {
                Some(Polarity::Added) => stats.lines_added += 1,
                Some(Polarity::Removed) => stats.lines_removed += 1,
                None => {}
            }
        }

        stats
    }
}
