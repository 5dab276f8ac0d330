//! In-memory backend for unit tests

use super::backend::RepositoryBackend;
use crate::error::BackendCommandError;
use crate::types::CommitRecord;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Scripted repository: commits are listed in insertion order
#[derive(Default)]
pub struct FakeBackend {
    path: PathBuf,
    commits: Vec<CommitRecord>,
    diffs: HashMap<String, String>,
    roots: HashMap<String, Vec<(String, String)>>,
    failing: HashSet<String>,
    listing_fails: bool,
    bare: bool,
    content_calls: AtomicUsize,
}

pub fn record(id: &str, summary: &str) -> CommitRecord {
    CommitRecord {
        id: id.to_string(),
        summary: summary.to_string(),
        author: "Test User <test@example.com>".to_string(),
        timestamp: "2024-03-01T10:00:00+00:00".to_string(),
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            path: PathBuf::from("/fake/repo"),
            ..Default::default()
        }
    }

    pub fn with_root(mut self, id: &str, summary: &str, files: &[(&str, &str)]) -> Self {
        self.commits.push(record(id, summary));
        self.roots.insert(
            id.to_string(),
            files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
        );
        self
    }

    pub fn with_diff(mut self, id: &str, summary: &str, diff: &str) -> Self {
        self.commits.push(record(id, summary));
        self.diffs.insert(id.to_string(), diff.to_string());
        self
    }

    /// Every query about `id` fails
    pub fn failing(mut self, id: &str, summary: &str) -> Self {
        self.commits.push(record(id, summary));
        self.failing.insert(id.to_string());
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.listing_fails = true;
        self
    }

    pub fn bare(mut self) -> Self {
        self.bare = true;
        self
    }

    /// Number of content queries served so far
    pub fn content_calls(&self) -> usize {
        self.content_calls.load(Ordering::SeqCst)
    }

    fn check(&self, op: &str, id: &str) -> Result<(), BackendCommandError> {
        self.content_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(id) {
            return Err(BackendCommandError::new(&[op, id], "fatal: scripted failure")
                .with_exit_code(Some(128)));
        }
        Ok(())
    }
}

impl RepositoryBackend for FakeBackend {
    fn repo_path(&self) -> &Path {
        &self.path
    }

    fn probe(&self) -> Result<(), BackendCommandError> {
        Ok(())
    }

    fn is_bare(&self) -> Result<bool, BackendCommandError> {
        Ok(self.bare)
    }

    fn toplevel(&self) -> Result<PathBuf, BackendCommandError> {
        Ok(self.path.clone())
    }

    fn list_commits(&self) -> Result<Vec<CommitRecord>, BackendCommandError> {
        if self.listing_fails {
            return Err(BackendCommandError::new(
                &["log"],
                "fatal: your current branch does not have any commits yet",
            )
            .with_exit_code(Some(128)));
        }
        Ok(self.commits.clone())
    }

    fn commit_record(&self, rev: &str) -> Result<CommitRecord, BackendCommandError> {
        self.commits
            .iter()
            .find(|c| c.id.starts_with(rev))
            .cloned()
            .ok_or_else(|| BackendCommandError::new(&["log", rev], "unknown revision"))
    }

    fn commit_diff(&self, id: &str) -> Result<String, BackendCommandError> {
        self.check("diff", id)?;
        Ok(self.diffs.get(id).cloned().unwrap_or_default())
    }

    fn changed_files(&self, id: &str) -> Result<Vec<String>, BackendCommandError> {
        self.check("ls-tree", id)?;
        Ok(self
            .roots
            .get(id)
            .map(|files| files.iter().map(|(p, _)| p.clone()).collect())
            .unwrap_or_default())
    }

    fn file_content_at_commit(
        &self,
        id: &str,
        path: &str,
    ) -> Result<String, BackendCommandError> {
        self.check("cat-file", id)?;
        Ok(self
            .roots
            .get(id)
            .and_then(|files| files.iter().find(|(p, _)| p == path))
            .map(|(_, c)| c.clone())
            .unwrap_or_default())
    }

    fn is_root_commit(&self, id: &str) -> Result<bool, BackendCommandError> {
        self.check("rev-list", id)?;
        Ok(self.roots.contains_key(id))
    }
}
