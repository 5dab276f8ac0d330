//! Per-commit pipeline: extraction, analysis, splitting and unit assembly
//!
//! Each commit walks `Fetching → ExtractingContent → Analyzing → Splitting →
//! Assembling → Done`. Empty content ends in `Skipped`; a failed structural
//! pass passes through `Degraded` and still reaches `Assembling`. Commits own
//! disjoint data, so they are processed on a bounded rayon pool and results
//! are put back in commit-list order.

use crate::assembler::UnitAssembler;
use crate::config::Config;
use crate::diff::{HunkSplitter, StructuralDiffAnalyzer};
use crate::error::{ConfigError, Result};
use crate::extractor::CommitContentExtractor;
use crate::git::{RepositoryBackend, open_backend, validate_repository};
use crate::logging::{SharedLogger, TracingLogger, timed};
use crate::types::{CommitRecord, IndexableUnit, RawCommitContent, UnitGranularity};
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Where a commit is in its processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStage {
    Fetching,
    ExtractingContent,
    Analyzing,
    /// Structural pass failed; line counts only
    Degraded,
    Splitting,
    Assembling,
    Done,
    Skipped,
}

/// Why a commit produced no units
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Extracted content was empty or whitespace-only
    EmptyContent,
    /// The backend failed for this commit
    ExtractionFailed(String),
}

/// Result of pushing one commit through the pipeline
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub commit: CommitRecord,
    /// Every stage visited, in order; the last one is terminal
    pub stages: Vec<CommitStage>,
    pub skip_reason: Option<SkipReason>,
    pub units: Vec<IndexableUnit>,
}

impl CommitOutcome {
    fn start(commit: &CommitRecord) -> Self {
        Self {
            commit: commit.clone(),
            stages: vec![CommitStage::Fetching],
            skip_reason: None,
            units: Vec::new(),
        }
    }

    fn enter(&mut self, stage: CommitStage) {
        self.stages.push(stage);
    }

    fn skip(mut self, reason: SkipReason) -> Self {
        self.enter(CommitStage::Skipped);
        self.skip_reason = Some(reason);
        self
    }

    pub fn stage(&self) -> CommitStage {
        self.stages.last().copied().unwrap_or(CommitStage::Fetching)
    }

    pub fn is_skipped(&self) -> bool {
        self.stage() == CommitStage::Skipped
    }

    pub fn is_degraded(&self) -> bool {
        self.stages.contains(&CommitStage::Degraded)
    }
}

/// All outcomes of one run, in commit-list order
#[derive(Debug, Clone, Default)]
pub struct PipelineRun {
    pub commits_listed: usize,
    pub outcomes: Vec<CommitOutcome>,
    /// Cancellation stopped dispatch before every commit was processed
    pub cancelled: bool,
}

impl PipelineRun {
    pub fn units(&self) -> Vec<IndexableUnit> {
        self.outcomes
            .iter()
            .flat_map(|o| o.units.iter().cloned())
            .collect()
    }

    pub fn into_units(self) -> Vec<IndexableUnit> {
        self.outcomes.into_iter().flat_map(|o| o.units).collect()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn degraded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_degraded()).count()
    }

    pub fn extracted(&self) -> usize {
        self.outcomes.len() - self.skipped()
    }
}

/// Analysis, splitting and assembly of already-extracted content
pub struct UnitBuilder {
    analyzer: StructuralDiffAnalyzer,
    splitter: HunkSplitter,
    assembler: UnitAssembler,
    logger: SharedLogger,
}

impl UnitBuilder {
    pub fn from_config(
        config: &Config,
        logger: SharedLogger,
    ) -> std::result::Result<Self, ConfigError> {
        let analyzer = StructuralDiffAnalyzer::from_config(config, logger.clone())?;
        let splitter = HunkSplitter::new(analyzer.filter().clone());

        Ok(Self {
            analyzer,
            splitter,
            assembler: UnitAssembler::from_config(&config.assembly),
            logger,
        })
    }

    pub fn analyzer(&self) -> &StructuralDiffAnalyzer {
        &self.analyzer
    }

    pub fn granularity(&self) -> UnitGranularity {
        self.assembler.granularity()
    }

    /// Units for one commit
    pub fn units(&self, raw: &RawCommitContent) -> Vec<IndexableUnit> {
        let mut outcome = CommitOutcome::start(&raw.commit);
        outcome.enter(CommitStage::ExtractingContent);
        self.assemble_into(raw, &mut outcome);
        outcome.units
    }

    fn assemble_into(&self, raw: &RawCommitContent, outcome: &mut CommitOutcome) {
        let diff = raw.content.diff_text();

        outcome.enter(CommitStage::Analyzing);
        let analysis = self.analyzer.analyze(&diff);
        if analysis.is_degraded() {
            outcome.enter(CommitStage::Degraded);
        }

        let units = match self.assembler.granularity() {
            UnitGranularity::Hunk => {
                outcome.enter(CommitStage::Splitting);
                let hunks = self.splitter.split(&diff);

                outcome.enter(CommitStage::Assembling);
                hunks
                    .iter()
                    .map(|hunk| {
                        // Each hunk is analyzed on its own for per-file names
                        let hunk_analysis = self.analyzer.analyze(&hunk.to_diff());
                        self.assembler.hunk_unit(&raw.commit, hunk, &hunk_analysis)
                    })
                    .collect()
            }
            UnitGranularity::Structural => {
                outcome.enter(CommitStage::Assembling);
                vec![self.assembler.structural_unit(&raw.commit, &analysis)]
            }
            UnitGranularity::Commit => {
                outcome.enter(CommitStage::Assembling);
                vec![self.assembler.commit_unit(raw)]
            }
        };

        self.logger.debug(&format!(
            "Commit {}: {} units",
            raw.commit.short_id(),
            units.len()
        ));
        outcome.units = units;
        outcome.enter(CommitStage::Done);
    }
}

pub struct Pipeline {
    extractor: CommitContentExtractor,
    builder: UnitBuilder,
    pool: Option<rayon::ThreadPool>,
    logger: SharedLogger,
}

impl Pipeline {
    pub fn new(
        backend: Arc<dyn RepositoryBackend>,
        config: &Config,
        logger: SharedLogger,
    ) -> std::result::Result<Self, ConfigError> {
        let workers = config.extraction.workers;
        let pool = if workers > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("gitdive-worker-{}", i))
                .build()
            {
                Ok(pool) => Some(pool),
                Err(e) => {
                    logger.error(&format!(
                        "Failed to start {} workers ({}), processing sequentially",
                        workers, e
                    ));
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            extractor: CommitContentExtractor::from_config(backend, config, logger.clone()),
            builder: UnitBuilder::from_config(config, logger.clone())?,
            pool,
            logger,
        })
    }

    pub fn extractor(&self) -> &CommitContentExtractor {
        &self.extractor
    }

    pub fn builder(&self) -> &UnitBuilder {
        &self.builder
    }

    /// Push one commit through every stage
    pub fn process_commit(&self, commit: &CommitRecord) -> CommitOutcome {
        let mut outcome = CommitOutcome::start(commit);

        outcome.enter(CommitStage::ExtractingContent);
        let raw = match self.extractor.extract(commit) {
            Ok(Some(raw)) => raw,
            Ok(None) => return outcome.skip(SkipReason::EmptyContent),
            Err(e) => {
                self.logger.error(&format!(
                    "Error processing commit {}: {}",
                    commit.short_id(),
                    e
                ));
                return outcome.skip(SkipReason::ExtractionFailed(e.to_string()));
            }
        };

        self.builder.assemble_into(&raw, &mut outcome);
        outcome
    }

    /// Extract every commit with content, in listing order
    pub fn extract_commits(&self, cancel: &CancellationToken) -> Vec<RawCommitContent> {
        let commits = self.extractor.list_commits();
        let (results, _) = self.map_ordered(&commits, cancel, |commit| {
            self.extractor.extract_or_skip(commit)
        });
        results.into_iter().flatten().collect()
    }

    /// Units for already-extracted commits, in commit order
    pub fn build_units(&self, commits: &[RawCommitContent]) -> Vec<IndexableUnit> {
        let never = CancellationToken::new();
        let (results, _) = self.map_ordered(commits, &never, |raw| self.builder.units(raw));
        results.into_iter().flatten().collect()
    }

    /// List and process every commit
    pub fn run(&self, cancel: &CancellationToken) -> PipelineRun {
        let commits = timed(self.logger.as_ref(), "Commit listing", || {
            self.extractor.list_commits()
        });
        self.logger.info(&format!("Processing {} commits", commits.len()));

        let (outcomes, cancelled) = timed(self.logger.as_ref(), "Commit processing", || {
            self.map_ordered(&commits, cancel, |commit| self.process_commit(commit))
        });

        if cancelled {
            self.logger.info(&format!(
                "Cancelled after dispatching {} of {} commits",
                outcomes.len(),
                commits.len()
            ));
        }

        PipelineRun {
            commits_listed: commits.len(),
            outcomes,
            cancelled,
        }
    }

    /// Map `f` over `items` on the worker pool, keeping input order
    ///
    /// Cancellation is checked before each item is dispatched; items already
    /// running finish. Returns the results of dispatched items and whether
    /// anything was left undispatched.
    fn map_ordered<T, R, F>(&self, items: &[T], cancel: &CancellationToken, f: F) -> (Vec<R>, bool)
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        let run_one = |item: &T| {
            if cancel.is_cancelled() {
                None
            } else {
                Some(f(item))
            }
        };

        let results: Vec<Option<R>> = match &self.pool {
            Some(pool) => pool.install(|| items.par_iter().map(run_one).collect()),
            None => items.iter().map(run_one).collect(),
        };

        let cancelled = results.iter().any(Option::is_none);
        (results.into_iter().flatten().collect(), cancelled)
    }
}

/// Extract every commit with content from the repository at `repo_path`
///
/// The path is validated first; a validation failure is fatal and nothing is
/// extracted.
pub fn extract_commits(repo_path: &Path, config: &Config) -> Result<Vec<RawCommitContent>> {
    let repo = validate_repository(repo_path, config.extraction.backend)?;
    let backend = open_backend(config.extraction.backend, &repo)?;
    let pipeline = Pipeline::new(backend, config, TracingLogger::shared("pipeline"))?;
    Ok(pipeline.extract_commits(&CancellationToken::new()))
}

/// Units for already-extracted commits under `config`'s assembly settings
pub fn build_units(commits: &[RawCommitContent], config: &Config) -> Result<Vec<IndexableUnit>> {
    let builder = UnitBuilder::from_config(config, TracingLogger::shared("pipeline"))?;
    Ok(commits.iter().flat_map(|raw| builder.units(raw)).collect())
}
