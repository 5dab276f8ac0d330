use crate::config::AssemblyConfig;
use crate::types::{
    CommitRecord, DiffHunk, IndexableUnit, MetadataValue, RawCommitContent, StructuralAnalysis,
    StructuralChangeSet, UnitGranularity,
};
use std::collections::{BTreeMap, BTreeSet};

/// Default unit text limit (~1500 tokens)
pub const DEFAULT_MAX_UNIT_CHARS: usize = 6_000;

/// Marker appended to truncated unit text
pub const TRUNCATION_MARKER: &str = "\n\n[... content truncated ...]";

/// Converts commits, hunks and change sets into units for the embedding collaborator
pub struct UnitAssembler {
    granularity: UnitGranularity,
    /// Maximum text length before truncation
    max_unit_chars: usize,
}

impl UnitAssembler {
    /// Create an assembler with hunk granularity and the default limit
    pub fn new() -> Self {
        Self {
            granularity: UnitGranularity::Hunk,
            max_unit_chars: DEFAULT_MAX_UNIT_CHARS,
        }
    }

    pub fn from_config(config: &AssemblyConfig) -> Self {
        Self {
            granularity: config.granularity,
            max_unit_chars: config.max_unit_chars,
        }
    }

    pub fn with_granularity(mut self, granularity: UnitGranularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Create with custom max text length
    pub fn with_max_length(mut self, max_unit_chars: usize) -> Self {
        self.max_unit_chars = max_unit_chars;
        self
    }

    pub fn granularity(&self) -> UnitGranularity {
        self.granularity
    }

    /// One unit for one file hunk of a commit
    ///
    /// `analysis` is the structural view of this hunk alone.
    pub fn hunk_unit(
        &self,
        commit: &CommitRecord,
        hunk: &DiffHunk,
        analysis: &StructuralAnalysis,
    ) -> IndexableUnit {
        let mut text = header_block(commit);
        text.push_str("File: ");
        text.push_str(&hunk.file_path);
        text.push_str("\n\n");
        text.push_str(&hunk.content);

        let mut metadata = base_metadata(commit, UnitGranularity::Hunk);
        metadata.insert("file_path".into(), hunk.file_path.as_str().into());
        metadata.insert("hunk_content".into(), hunk.content.as_str().into());
        metadata.insert("lines_added".into(), hunk.lines_added().into());
        metadata.insert("lines_removed".into(), hunk.lines_removed().into());

        let changes = analysis.change_set();
        let functions = union(&[
            &changes.added_functions,
            &changes.removed_functions,
            &changes.modified_functions,
        ]);
        if !functions.is_empty() {
            metadata.insert("functions".into(), functions.into());
        }
        let types = union(&[&changes.added_types, &changes.removed_types, &changes.modified_types]);
        if !types.is_empty() {
            metadata.insert("types".into(), types.into());
        }
        metadata.insert("degraded".into(), analysis.is_degraded().into());

        IndexableUnit {
            text: self.truncate(text),
            metadata,
            excluded_prompt_keys: vec!["summary".to_string(), "hunk_content".to_string()],
        }
    }

    /// One unit per commit rendered from its change set
    pub fn structural_unit(
        &self,
        commit: &CommitRecord,
        analysis: &StructuralAnalysis,
    ) -> IndexableUnit {
        let changes = analysis.change_set();

        let mut text = header_block(commit);
        text.push('\n');
        text.push_str(&render_change_set(&changes));
        if let StructuralAnalysis::Degraded { reason, .. } = analysis {
            text.push_str("Structural analysis unavailable: ");
            text.push_str(&reason.to_string());
            text.push('\n');
        }

        let mut metadata = base_metadata(commit, UnitGranularity::Structural);
        let counts = [
            ("files_changed", changes.modified_files.len()),
            ("lines_added", changes.lines_added),
            ("lines_removed", changes.lines_removed),
            ("added_functions", changes.added_functions.len()),
            ("removed_functions", changes.removed_functions.len()),
            ("modified_functions", changes.modified_functions.len()),
            ("added_types", changes.added_types.len()),
            ("removed_types", changes.removed_types.len()),
            ("modified_types", changes.modified_types.len()),
        ];
        for (key, count) in counts {
            metadata.insert(key.to_string(), count.into());
        }
        metadata.insert("degraded".into(), analysis.is_degraded().into());

        IndexableUnit {
            text: self.truncate(text),
            metadata,
            excluded_prompt_keys: vec!["summary".to_string()],
        }
    }

    /// One unit holding the whole extracted content of a commit
    pub fn commit_unit(&self, raw: &RawCommitContent) -> IndexableUnit {
        let mut text = raw.commit.summary.clone();
        text.push_str("\n\n");
        text.push_str(&raw.text());

        IndexableUnit {
            text: self.truncate(text),
            metadata: base_metadata(&raw.commit, UnitGranularity::Commit),
            excluded_prompt_keys: vec!["summary".to_string()],
        }
    }

    fn truncate(&self, mut text: String) -> String {
        if text.len() > self.max_unit_chars {
            crate::extractor::truncate_at_char_boundary(&mut text, self.max_unit_chars);
            text.push_str(TRUNCATION_MARKER);
        }
        text
    }
}

impl Default for UnitAssembler {
    fn default() -> Self {
        Self::new()
    }
}

fn header_block(commit: &CommitRecord) -> String {
    let mut text = String::new();
    text.push_str("Commit: ");
    text.push_str(commit.short_id());
    text.push('\n');
    text.push_str("Summary: ");
    text.push_str(&commit.summary);
    text.push('\n');
    text.push_str("Author: ");
    text.push_str(&commit.author);
    text.push('\n');
    text.push_str("Date: ");
    text.push_str(&commit.timestamp);
    text.push('\n');
    text
}

/// Metadata every unit carries regardless of granularity
pub fn base_metadata(
    commit: &CommitRecord,
    granularity: UnitGranularity,
) -> BTreeMap<String, MetadataValue> {
    let mut metadata = BTreeMap::new();
    metadata.insert("commit_hash".to_string(), commit.id.as_str().into());
    metadata.insert("short_hash".to_string(), commit.short_id().into());
    metadata.insert("author".to_string(), commit.author.as_str().into());
    metadata.insert("date".to_string(), commit.timestamp.as_str().into());
    metadata.insert("summary".to_string(), commit.summary.as_str().into());
    metadata.insert("granularity".to_string(), granularity.as_str().into());
    if let Some(ts) = commit.parsed_timestamp() {
        metadata.insert("timestamp_unix".to_string(), ts.timestamp().into());
    }
    metadata
}

/// Human-readable listing of a change set, one category per line
pub fn render_change_set(changes: &StructuralChangeSet) -> String {
    let mut out = String::new();

    out.push_str(&format!("Files changed ({}):", changes.modified_files.len()));
    for file in &changes.modified_files {
        out.push_str("\n- ");
        out.push_str(file);
    }
    out.push('\n');
    out.push_str(&format!(
        "Lines: +{}/-{}\n",
        changes.lines_added, changes.lines_removed
    ));

    let sections = [
        ("Added functions", &changes.added_functions),
        ("Removed functions", &changes.removed_functions),
        ("Modified functions", &changes.modified_functions),
        ("Added types", &changes.added_types),
        ("Removed types", &changes.removed_types),
        ("Modified types", &changes.modified_types),
    ];
    for (label, names) in sections {
        if names.is_empty() {
            continue;
        }
        out.push_str(label);
        out.push_str(": ");
        out.push_str(&names.iter().cloned().collect::<Vec<_>>().join(", "));
        out.push('\n');
    }

    out
}

fn union(sets: &[&BTreeSet<String>]) -> String {
    sets.iter()
        .flat_map(|s| s.iter())
        .map(String::as_str)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>()
        .join(", ")
}
