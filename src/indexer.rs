//! Repository indexing: validate, extract, assemble, persist
//!
//! Validation failures stop the run before any extraction. Per-commit failures
//! never do; they are logged by the pipeline and counted in the report.

use crate::config::Config;
use crate::error::Result;
use crate::git::{open_backend, validate_repository};
use crate::logging::{SharedLogger, TracingLogger, timed};
use crate::pipeline::{CommitOutcome, Pipeline, PipelineRun};
use crate::storage::{
    CleanupOutcome, IndexLoader, IndexManifest, JsonlIndexStore, StoredIndex, UnitSink,
};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Summary of one indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub repo_path: PathBuf,
    pub commits_listed: usize,
    pub commits_extracted: usize,
    pub commits_skipped: usize,
    pub commits_degraded: usize,
    pub units_built: usize,
    pub units_persisted: usize,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl fmt::Display for IndexReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Repository: {}", self.repo_path.display())?;
        writeln!(
            f,
            "Commits: {} listed, {} extracted, {} skipped, {} degraded",
            self.commits_listed, self.commits_extracted, self.commits_skipped, self.commits_degraded
        )?;
        write!(
            f,
            "Units: {} built, {} persisted in {}ms",
            self.units_built, self.units_persisted, self.duration_ms
        )?;
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

pub struct GitIndexer {
    config: Config,
    store: JsonlIndexStore,
    logger: SharedLogger,
}

impl GitIndexer {
    pub fn new(config: Config) -> Self {
        Self::with_logger(config, TracingLogger::shared("indexer"))
    }

    pub fn with_logger(config: Config, logger: SharedLogger) -> Self {
        Self {
            store: JsonlIndexStore::from_config(&config.storage),
            config,
            logger,
        }
    }

    pub fn with_store(mut self, store: JsonlIndexStore) -> Self {
        self.store = store;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &JsonlIndexStore {
        &self.store
    }

    fn pipeline(&self, repo: &Path) -> Result<Pipeline> {
        let backend = open_backend(self.config.extraction.backend, repo)?;
        Ok(Pipeline::new(backend, &self.config, self.logger.clone())?)
    }

    fn validate(&self, repo_path: &Path) -> Result<PathBuf> {
        let repo = timed(self.logger.as_ref(), "Repository validation", || {
            validate_repository(repo_path, self.config.extraction.backend)
        })?;
        self.logger.info(&format!("Indexing repository {}", repo.display()));
        Ok(repo)
    }

    fn run_pipeline(&self, repo: &Path, cancel: &CancellationToken) -> Result<PipelineRun> {
        let pipeline = self.pipeline(repo)?;
        Ok(pipeline.run(cancel))
    }

    /// Store key path for `repo_path`: the repository root when it still
    /// validates, the path as given otherwise
    fn resolve_root(&self, repo_path: &Path) -> PathBuf {
        match validate_repository(repo_path, self.config.extraction.backend) {
            Ok(root) => root,
            Err(e) => {
                self.logger
                    .debug(&format!("Using {} as given: {}", repo_path.display(), e));
                repo_path.to_path_buf()
            }
        }
    }

    fn persist<S: UnitSink>(
        &self,
        run: PipelineRun,
        repo: PathBuf,
        sink: &mut S,
        start: Instant,
    ) -> Result<IndexReport> {
        let mut report = IndexReport {
            repo_path: repo,
            commits_listed: run.commits_listed,
            commits_extracted: run.extracted(),
            commits_skipped: run.skipped(),
            commits_degraded: run.degraded(),
            cancelled: run.cancelled,
            ..Default::default()
        };

        let units = run.into_units();
        report.units_built = units.len();
        report.units_persisted = timed(self.logger.as_ref(), "Unit persistence", || {
            sink.insert_batch(&units)
        })?;
        report.duration_ms = start.elapsed().as_millis() as u64;

        self.logger.info(&format!(
            "Indexed {} commits into {} units in {}ms",
            report.commits_extracted, report.units_persisted, report.duration_ms
        ));
        Ok(report)
    }

    /// Index `repo_path` into an arbitrary sink
    pub fn index_into<S: UnitSink>(
        &self,
        repo_path: &Path,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<IndexReport> {
        let start = Instant::now();
        let repo = self.validate(repo_path)?;
        let run = self.run_pipeline(&repo, cancel)?;
        self.persist(run, repo, sink, start)
    }

    /// Index `repo_path` into the on-disk store, replacing any previous index
    ///
    /// The previous index is only removed once the pipeline has run, so a
    /// run that fails before persisting leaves it intact.
    pub fn index_repository(
        &self,
        repo_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<IndexReport> {
        let start = Instant::now();
        let repo = self.validate(repo_path)?;
        let run = self.run_pipeline(&repo, cancel)?;

        let mut writer = self.store.prepare(&repo)?;
        let report = self.persist(run, repo, &mut writer, start)?;

        let manifest = IndexManifest {
            repo_path: report.repo_path.display().to_string(),
            granularity: self.config.assembly.granularity,
            commits_listed: report.commits_listed,
            commits_extracted: report.commits_extracted,
            units: report.units_persisted,
            complete: !report.cancelled,
            indexed_at: chrono::Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        let dir = writer.finish(&manifest)?;
        self.logger.debug(&format!("Index written to {}", dir.display()));

        Ok(report)
    }

    /// Run a single commit through the pipeline without persisting anything
    pub fn inspect(&self, repo_path: &Path, rev: &str) -> Result<CommitOutcome> {
        let repo = validate_repository(repo_path, self.config.extraction.backend)?;
        let pipeline = self.pipeline(&repo)?;
        let commit = pipeline.extractor().backend().commit_record(rev)?;
        Ok(pipeline.process_commit(&commit))
    }

    /// Stored index for the repository containing `repo_path`
    pub fn load_index(&self, repo_path: &Path) -> Result<Option<StoredIndex>> {
        self.store.load_existing(&self.resolve_root(repo_path))
    }

    /// Remove the stored index for the repository containing `repo_path`
    ///
    /// Paths that no longer validate, such as a deleted checkout, are keyed
    /// as given.
    pub fn cleanup(&self, repo_path: &Path) -> Result<CleanupOutcome> {
        self.store.cleanup(&self.resolve_root(repo_path))
    }
}
