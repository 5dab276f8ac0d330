//! Diff decomposition: file-inclusion policy, structural analysis and hunk
//! splitting over zero-context unified diffs

/// Structural (function/type level) change detection
pub mod analyzer;
/// Three-tier file-inclusion policy
pub mod filter;
/// Per-file hunk splitting
pub mod hunks;
/// Ordered per-language declaration patterns
pub mod patterns;

pub use analyzer::StructuralDiffAnalyzer;
pub use filter::{FileFilter, FilterDecision};
pub use hunks::HunkSplitter;
pub use patterns::{DeclarationKind, Language};

use regex::Regex;
use std::sync::LazyLock;

/// Prefix every file-header line starts with
pub const FILE_HEADER_PREFIX: &str = "diff --git ";

static FILE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^diff --git a/(.+?) b/(.+?)$").expect("file header pattern compiles")
});

/// Whether a line added or removed content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Added,
    Removed,
}

/// Result of looking at a `diff --git` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Header<'a> {
    /// Not a file header at all
    None,
    /// Strict parse succeeded; the `b/` path is authoritative
    Path(&'a str),
    /// A header line the strict pattern cannot parse
    Malformed,
}

/// Classify a line against the strict file-header pattern
pub(crate) fn parse_header(line: &str) -> Header<'_> {
    if !line.starts_with(FILE_HEADER_PREFIX) {
        return Header::None;
    }
    match FILE_HEADER.captures(line).and_then(|c| c.get(2)) {
        Some(path) => Header::Path(path.as_str()),
        None => Header::Malformed,
    }
}

/// Lenient header parse: last whitespace token, quotes and `b/` stripped
pub(crate) fn lenient_header_path(line: &str) -> Option<String> {
    let last = line.split_whitespace().last()?;
    let unquoted = last.trim_matches('"');
    let path = unquoted.strip_prefix("b/").unwrap_or(unquoted);
    if path.is_empty() || path == "--git" {
        None
    } else {
        Some(path.to_string())
    }
}

/// Header path using the strict pattern, falling back to the lenient one
pub(crate) fn header_path(line: &str) -> Option<String> {
    match parse_header(line) {
        Header::Path(p) => Some(p.to_string()),
        Header::Malformed => lenient_header_path(line),
        Header::None => None,
    }
}

/// `+`/`-` change lines, excluding the `+++`/`---` file markers
pub fn change_polarity(line: &str) -> Option<Polarity> {
    if line.starts_with('+') && !line.starts_with("+++") {
        Some(Polarity::Added)
    } else if line.starts_with('-') && !line.starts_with("---") {
        Some(Polarity::Removed)
    } else {
        None
    }
}
