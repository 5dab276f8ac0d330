//! Per-commit content extraction
//!
//! Root commits have no parent to diff against, so their tracked files are
//! read one by one and size-bounded. Every other commit yields its zero-context
//! diff against the first parent, headers intact.

use crate::config::Config;
use crate::error::BackendCommandError;
use crate::git::RepositoryBackend;
use crate::logging::SharedLogger;
use crate::types::{CommitContent, CommitRecord, FileSnapshot, RawCommitContent};
use std::sync::Arc;

/// Default per-file byte limit for root reconstruction
pub const DEFAULT_MAX_FILE_SIZE: usize = 10_000;

pub struct CommitContentExtractor {
    backend: Arc<dyn RepositoryBackend>,
    max_file_size: usize,
    logger: SharedLogger,
}

impl CommitContentExtractor {
    pub fn new(backend: Arc<dyn RepositoryBackend>, logger: SharedLogger) -> Self {
        Self {
            backend,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            logger,
        }
    }

    pub fn from_config(
        backend: Arc<dyn RepositoryBackend>,
        config: &Config,
        logger: SharedLogger,
    ) -> Self {
        Self::new(backend, logger).with_max_file_size(config.extraction.max_file_size)
    }

    pub fn with_max_file_size(mut self, max_file_size: usize) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn backend(&self) -> &Arc<dyn RepositoryBackend> {
        &self.backend
    }

    /// Commits reachable from HEAD, newest first
    ///
    /// A failed listing is logged and reads as an empty history.
    pub fn list_commits(&self) -> Vec<CommitRecord> {
        match self.backend.list_commits() {
            Ok(commits) => {
                self.logger.debug(&format!("Listed {} commits", commits.len()));
                commits
            }
            Err(e) => {
                self.logger.error(&format!("Error extracting commits: {}", e));
                Vec::new()
            }
        }
    }

    /// Raw content of one commit, without the blank-content check
    pub fn extract_content(
        &self,
        commit: &CommitRecord,
    ) -> Result<CommitContent, BackendCommandError> {
        if self.backend.is_root_commit(&commit.id)? {
            self.root_content(&commit.id).map(CommitContent::Root)
        } else {
            self.backend.commit_diff(&commit.id).map(CommitContent::Diff)
        }
    }

    /// Content of one commit; `None` when it is empty or whitespace-only
    pub fn extract(
        &self,
        commit: &CommitRecord,
    ) -> Result<Option<RawCommitContent>, BackendCommandError> {
        let content = self.extract_content(commit)?;
        if content.is_blank() {
            self.logger.debug(&format!(
                "Commit {} has no content, skipping",
                commit.short_id()
            ));
            return Ok(None);
        }

        Ok(Some(RawCommitContent {
            commit: commit.clone(),
            content,
        }))
    }

    /// Like [`extract`](Self::extract), logging a failure instead of returning it
    pub fn extract_or_skip(&self, commit: &CommitRecord) -> Option<RawCommitContent> {
        match self.extract(commit) {
            Ok(content) => content,
            Err(e) => {
                self.logger.error(&format!(
                    "Error processing commit {}: {}",
                    commit.short_id(),
                    e
                ));
                None
            }
        }
    }

    /// Extract every commit in listing order, dropping empty and failed ones
    pub fn extract_all(&self) -> Vec<RawCommitContent> {
        self.list_commits()
            .iter()
            .filter_map(|commit| self.extract_or_skip(commit))
            .collect()
    }

    fn root_content(&self, id: &str) -> Result<Vec<FileSnapshot>, BackendCommandError> {
        let mut files = Vec::new();

        for path in self.backend.changed_files(id)? {
            let mut content = self.backend.file_content_at_commit(id, &path)?;
            if content.is_empty() {
                continue;
            }
            truncate_at_char_boundary(&mut content, self.max_file_size);
            files.push(FileSnapshot { path, content });
        }

        Ok(files)
    }
}

/// Cut `text` to at most `max_bytes`, backing off to a char boundary
pub fn truncate_at_char_boundary(text: &mut String, max_bytes: usize) {
    if text.len() <= max_bytes {
        return;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::testing::FakeBackend;
    use crate::logging::{Level, MemoryLogger};

    fn extractor(backend: FakeBackend) -> (CommitContentExtractor, Arc<MemoryLogger>) {
        let logger = MemoryLogger::new();
        (
            CommitContentExtractor::new(Arc::new(backend), logger.clone()),
            logger,
        )
    }

    #[test]
    fn test_root_commit_single_file() {
        let (extractor, _) =
            extractor(FakeBackend::new().with_root("a1b2c3d4e5", "init", &[("a.txt", "hello\n")]));

        let commits = extractor.list_commits();
        let raw = extractor.extract(&commits[0]).unwrap().unwrap();

        assert!(raw.content.is_root());
        assert_eq!(raw.text(), "hello\n");
        assert_eq!(raw.content.diff_text(), "diff --git a/a.txt b/a.txt\n@@ -0,0 +1 @@\n+hello\n");
    }

    #[test]
    fn test_root_commit_joins_files_and_skips_empty() {
        let (extractor, _) = extractor(FakeBackend::new().with_root(
            "root",
            "init",
            &[("a.txt", "one"), ("empty.txt", ""), ("b.txt", "two")],
        ));

        let raw = extractor.extract(&extractor.list_commits()[0]).unwrap().unwrap();
        assert_eq!(raw.text(), "one\ntwo");
        match &raw.content {
            CommitContent::Root(files) => assert_eq!(files.len(), 2),
            other => panic!("expected root content, got {:?}", other),
        }
    }

    #[test]
    fn test_root_file_truncation() {
        let body = "x".repeat(50);
        let (extractor, _) =
            extractor(FakeBackend::new().with_root("root", "init", &[("big.txt", body.as_str())]));
        let extractor = extractor.with_max_file_size(10);

        let raw = extractor.extract(&extractor.list_commits()[0]).unwrap().unwrap();
        assert_eq!(raw.text(), "x".repeat(10));
    }

    #[test]
    fn test_regular_commit_returns_diff() {
        let diff = "diff --git a/foo.py b/foo.py\n@@ -1 +1 @@\n-def a(): pass\n+def a(): return 1\n";
        let (extractor, _) = extractor(FakeBackend::new().with_diff("c2", "change", diff));

        let raw = extractor.extract(&extractor.list_commits()[0]).unwrap().unwrap();
        assert_eq!(raw.content, CommitContent::Diff(diff.to_string()));
        assert_eq!(raw.commit.summary, "change");
    }

    #[test]
    fn test_blank_content_is_none() {
        let (extractor, logger) = extractor(
            FakeBackend::new()
                .with_diff("empty", "empty commit", "")
                .with_diff("ws", "whitespace", "  \n\n"),
        );

        for commit in extractor.list_commits() {
            assert_eq!(extractor.extract(&commit).unwrap(), None);
        }
        assert!(logger.messages(Level::Error).is_empty());
    }

    #[test]
    fn test_failure_is_logged_with_short_id() {
        let (extractor, logger) =
            extractor(FakeBackend::new().failing("deadbeefcafebabe0000", "broken"));

        let commit = &extractor.list_commits()[0];
        assert!(extractor.extract(commit).is_err());
        assert_eq!(extractor.extract_or_skip(commit), None);

        let errors = logger.messages(Level::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Error processing commit deadbeef: "));
    }

    #[test]
    fn test_extract_all_isolates_failures() {
        let (extractor, _) = extractor(
            FakeBackend::new()
                .with_diff("c3", "third", "diff --git a/x b/x\n+3\n")
                .failing("c2", "second")
                .with_root("c1", "first", &[("x", "1\n")]),
        );

        let all = extractor.extract_all();
        let ids: Vec<&str> = all.iter().map(|r| r.commit.id.as_str()).collect();
        assert_eq!(ids, vec!["c3", "c1"]);
    }

    #[test]
    fn test_failed_listing_is_empty() {
        let (extractor, logger) = extractor(FakeBackend::new().failing_listing());
        assert!(extractor.list_commits().is_empty());
        assert!(extractor.extract_all().is_empty());
        assert!(
            logger.messages(Level::Error)[0].starts_with("Error extracting commits: git log failed")
        );
    }

    #[test]
    fn test_truncate_at_char_boundary() {
        let mut ascii = "abcdef".to_string();
        truncate_at_char_boundary(&mut ascii, 3);
        assert_eq!(ascii, "abc");

        let mut multibyte = "héllo".to_string();
        truncate_at_char_boundary(&mut multibyte, 2);
        assert_eq!(multibyte, "h");

        let mut short = "ok".to_string();
        truncate_at_char_boundary(&mut short, 10);
        assert_eq!(short, "ok");
    }
}
