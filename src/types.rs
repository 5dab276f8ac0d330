use crate::error::StructuralParseError;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Number of hash characters shown when a commit is referenced for humans
pub const SHORT_ID_LEN: usize = 8;

/// Metadata for one commit as reported by the backend listing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Full commit SHA (40 hex characters)
    pub id: String,
    /// First line of the commit message
    pub summary: String,
    /// `name <email>`
    pub author: String,
    /// Author date, strict ISO-8601
    pub timestamp: String,
}

impl CommitRecord {
    /// First 8 characters of the commit id
    pub fn short_id(&self) -> &str {
        self.id.get(..SHORT_ID_LEN).unwrap_or(&self.id)
    }

    /// Author date parsed with its original offset, if it is well formed
    pub fn parsed_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(self.timestamp.trim()).ok()
    }
}

/// A file's content at the root commit, already size-bounded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSnapshot {
    pub path: String,
    pub content: String,
}

/// Content extracted for a single commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitContent {
    /// Root commit: the backend has no parent to diff against, so the
    /// tracked files are reconstructed one by one
    Root(Vec<FileSnapshot>),
    /// Regular commit: zero-context unified diff against the first parent
    Diff(String),
}

impl CommitContent {
    /// The content as extracted: concatenated file contents for root commits,
    /// raw diff text otherwise
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            CommitContent::Root(files) => Cow::Owned(
                files
                    .iter()
                    .map(|f| f.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            CommitContent::Diff(diff) => Cow::Borrowed(diff),
        }
    }

    /// Unified-diff text suitable for analysis and hunk splitting
    ///
    /// Root snapshots are rendered as "from nothing" diffs: a `diff --git`
    /// header and one `@@ -0,0 +1,N @@` range per file, then every line as an
    /// addition.
    pub fn diff_text(&self) -> Cow<'_, str> {
        match self {
            CommitContent::Root(files) => {
                let mut out = String::new();
                for file in files {
                    out.push_str("diff --git a/");
                    out.push_str(&file.path);
                    out.push_str(" b/");
                    out.push_str(&file.path);
                    out.push('\n');
                    match file.content.lines().count() {
                        0 => {}
                        1 => out.push_str("@@ -0,0 +1 @@\n"),
                        n => out.push_str(&format!("@@ -0,0 +1,{} @@\n", n)),
                    }
                    for line in file.content.lines() {
                        out.push('+');
                        out.push_str(line);
                        out.push('\n');
                    }
                }
                Cow::Owned(out)
            }
            CommitContent::Diff(diff) => Cow::Borrowed(diff),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, CommitContent::Root(_))
    }

    /// Empty or whitespace-only content
    pub fn is_blank(&self) -> bool {
        match self {
            CommitContent::Root(files) => files.iter().all(|f| f.content.trim().is_empty()),
            CommitContent::Diff(diff) => diff.trim().is_empty(),
        }
    }
}

/// A commit paired with its extracted content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCommitContent {
    pub commit: CommitRecord,
    pub content: CommitContent,
}

impl RawCommitContent {
    pub fn text(&self) -> Cow<'_, str> {
        self.content.text()
    }
}

/// Function and type level changes detected in one diff
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralChangeSet {
    pub added_functions: BTreeSet<String>,
    pub removed_functions: BTreeSet<String>,
    pub modified_functions: BTreeSet<String>,
    pub added_types: BTreeSet<String>,
    pub removed_types: BTreeSet<String>,
    pub modified_types: BTreeSet<String>,
    pub modified_files: BTreeSet<String>,
    pub lines_added: usize,
    pub lines_removed: usize,
}

impl StructuralChangeSet {
    /// Number of named declarations across all six collections
    pub fn total_items(&self) -> usize {
        self.added_functions.len()
            + self.removed_functions.len()
            + self.modified_functions.len()
            + self.added_types.len()
            + self.removed_types.len()
            + self.modified_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_items() == 0
            && self.modified_files.is_empty()
            && self.lines_added == 0
            && self.lines_removed == 0
    }
}

impl From<DiffStats> for StructuralChangeSet {
    fn from(stats: DiffStats) -> Self {
        Self {
            modified_files: stats.modified_files,
            lines_added: stats.lines_added,
            lines_removed: stats.lines_removed,
            ..Default::default()
        }
    }
}

/// Line-level counts without any name extraction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub modified_files: BTreeSet<String>,
    pub lines_added: usize,
    pub lines_removed: usize,
}

/// Outcome of analyzing one diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralAnalysis {
    /// The structural pass completed
    Full(StructuralChangeSet),
    /// The structural pass failed; only line-level counts are available
    Degraded {
        stats: DiffStats,
        reason: StructuralParseError,
    },
}

impl StructuralAnalysis {
    pub fn is_degraded(&self) -> bool {
        matches!(self, StructuralAnalysis::Degraded { .. })
    }

    /// The change set, with empty name collections when degraded
    pub fn change_set(&self) -> StructuralChangeSet {
        match self {
            StructuralAnalysis::Full(set) => set.clone(),
            StructuralAnalysis::Degraded { stats, .. } => stats.clone().into(),
        }
    }

    pub fn into_change_set(self) -> StructuralChangeSet {
        match self {
            StructuralAnalysis::Full(set) => set,
            StructuralAnalysis::Degraded { stats, .. } => stats.into(),
        }
    }
}

/// Added/removed lines of one file within one commit's diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    pub file_path: String,
    /// Change lines with their `+`/`-` markers, newline terminated
    pub content: String,
}

impl DiffHunk {
    pub fn lines_added(&self) -> usize {
        self.content.lines().filter(|l| l.starts_with('+')).count()
    }

    pub fn lines_removed(&self) -> usize {
        self.content.lines().filter(|l| l.starts_with('-')).count()
    }

    /// The hunk as a single-file diff, header included
    pub fn to_diff(&self) -> String {
        format!(
            "diff --git a/{0} b/{0}\n{1}",
            self.file_path, self.content
        )
    }
}

/// Scalar metadata value attached to an indexable unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        MetadataValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::Integer(n) => write!(f, "{}", n),
            MetadataValue::Text(s) => f.write_str(s),
        }
    }
}

/// The text + metadata artifact handed to the embedding/storage collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexableUnit {
    pub text: String,
    pub metadata: BTreeMap<String, MetadataValue>,
    /// Metadata keys to store but keep out of prompt context
    #[serde(default)]
    pub excluded_prompt_keys: Vec<String>,
}

impl IndexableUnit {
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }

    pub fn commit_hash(&self) -> Option<&str> {
        self.get("commit_hash").and_then(MetadataValue::as_str)
    }
}

/// How commits are cut into indexable units
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum UnitGranularity {
    /// One unit per (commit, file hunk)
    #[default]
    Hunk,
    /// One unit per commit, rendered from its structural change set
    Structural,
    /// One unit per commit holding the whole extracted content
    Commit,
}

impl UnitGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitGranularity::Hunk => "hunk",
            UnitGranularity::Structural => "structural",
            UnitGranularity::Commit => "commit",
        }
    }
}

impl fmt::Display for UnitGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitGranularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hunk" => Ok(UnitGranularity::Hunk),
            "structural" => Ok(UnitGranularity::Structural),
            "commit" => Ok(UnitGranularity::Commit),
            other => Err(format!(
                "unknown granularity '{}', expected hunk, structural or commit",
                other
            )),
        }
    }
}
