//! On-disk persistence for indexable units
//!
//! Each repository gets its own directory under the index root, keyed by the
//! SHA-256 of its canonical path, holding `units.jsonl` (one unit per line)
//! and `manifest.json`. Re-indexing clears the directory first. An exclusive
//! `flock` on `<key>.lock` keeps two processes from writing the same index.

use crate::config::StorageConfig;
use crate::error::{Result, StorageError};
use crate::paths::{normalize_repo_path, repo_key};
use crate::types::{IndexableUnit, UnitGranularity};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const UNITS_FILE: &str = "units.jsonl";
const MANIFEST_FILE: &str = "manifest.json";

/// Destination for assembled units
pub trait UnitSink {
    /// Store `units`, returning how many were accepted
    fn insert_batch(&mut self, units: &[IndexableUnit]) -> Result<usize>;
}

impl UnitSink for Vec<IndexableUnit> {
    fn insert_batch(&mut self, units: &[IndexableUnit]) -> Result<usize> {
        self.extend_from_slice(units);
        Ok(units.len())
    }
}

/// Read access to a previously persisted index
pub trait IndexLoader {
    type Handle;

    /// `None` when `repo` has never been indexed
    fn load_existing(&self, repo: &Path) -> Result<Option<Self::Handle>>;
}

/// Summary written next to the units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub repo_path: String,
    pub granularity: UnitGranularity,
    pub commits_listed: usize,
    pub commits_extracted: usize,
    pub units: usize,
    /// False when the run was cancelled part way
    pub complete: bool,
    pub indexed_at: String,
    pub version: String,
}

/// A loaded index
#[derive(Debug, Clone)]
pub struct StoredIndex {
    pub dir: PathBuf,
    pub manifest: IndexManifest,
    units: Vec<IndexableUnit>,
}

impl StoredIndex {
    pub fn units(&self) -> &[IndexableUnit] {
        &self.units
    }

    pub fn into_units(self) -> Vec<IndexableUnit> {
        self.units
    }
}

/// What `cleanup` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    Removed(PathBuf),
    NothingToRemove,
}

/// JSON-lines unit store rooted at one directory
#[derive(Debug, Clone)]
pub struct JsonlIndexStore {
    base_dir: PathBuf,
}

impl JsonlIndexStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.index_dir.clone())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding the index of `repo`
    pub fn repo_dir(&self, repo: &Path) -> PathBuf {
        self.base_dir.join(repo_key(&normalize_repo_path(repo)))
    }

    fn lock_path(&self, repo: &Path) -> PathBuf {
        let key = repo_key(&normalize_repo_path(repo));
        self.base_dir.join(format!("{}.lock", &key[..16]))
    }

    fn lock(&self, repo: &Path) -> Result<File> {
        let lock_path = self.lock_path(repo);
        let prepare_failed = |e: std::io::Error| StorageError::PrepareFailed {
            path: lock_path.display().to_string(),
            reason: e.to_string(),
        };

        fs::create_dir_all(&self.base_dir).map_err(prepare_failed)?;
        let file = File::create(&lock_path).map_err(prepare_failed)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!("Acquired index lock {:?}", lock_path);
                Ok(file)
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Err(StorageError::Locked(repo.display().to_string()).into())
            }
            Err(e) => Err(prepare_failed(e).into()),
        }
    }

    /// Clear any previous index of `repo` and open a writer for a fresh one
    ///
    /// The writer holds the repository lock until it is finished or dropped.
    pub fn prepare(&self, repo: &Path) -> Result<IndexWriter> {
        let lock = self.lock(repo)?;
        let dir = self.repo_dir(repo);
        let prepare_failed = |e: std::io::Error| StorageError::PrepareFailed {
            path: dir.display().to_string(),
            reason: e.to_string(),
        };

        if dir.exists() {
            tracing::info!("Clearing previous index at {:?}", dir);
            fs::remove_dir_all(&dir).map_err(prepare_failed)?;
        }
        fs::create_dir_all(&dir).map_err(prepare_failed)?;
        let units = File::create(dir.join(UNITS_FILE)).map_err(prepare_failed)?;

        Ok(IndexWriter {
            units: BufWriter::new(units),
            dir,
            written: 0,
            _lock: lock,
        })
    }

    /// Delete the index of `repo`
    pub fn cleanup(&self, repo: &Path) -> Result<CleanupOutcome> {
        let dir = self.repo_dir(repo);
        if !dir.exists() {
            return Ok(CleanupOutcome::NothingToRemove);
        }

        let _lock = self.lock(repo)?;
        fs::remove_dir_all(&dir).map_err(|e| StorageError::CleanupFailed {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;
        tracing::info!("Removed index at {:?}", dir);
        Ok(CleanupOutcome::Removed(dir))
    }

    fn read_manifest(&self, dir: &Path) -> Result<IndexManifest> {
        let path = dir.join(MANIFEST_FILE);
        let read_failed = |reason: String| StorageError::ReadFailed {
            path: path.display().to_string(),
            reason,
        };

        let content = fs::read_to_string(&path).map_err(|e| read_failed(e.to_string()))?;
        Ok(serde_json::from_str(&content).map_err(|e| read_failed(e.to_string()))?)
    }

    fn read_units(&self, dir: &Path) -> Result<Vec<IndexableUnit>> {
        let path = dir.join(UNITS_FILE);
        let read_failed = |reason: String| StorageError::ReadFailed {
            path: path.display().to_string(),
            reason,
        };

        let file = File::open(&path).map_err(|e| read_failed(e.to_string()))?;
        let mut units = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| read_failed(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let unit = serde_json::from_str(&line)
                .map_err(|e| read_failed(format!("line {}: {}", i + 1, e)))?;
            units.push(unit);
        }
        Ok(units)
    }
}

impl IndexLoader for JsonlIndexStore {
    type Handle = StoredIndex;

    fn load_existing(&self, repo: &Path) -> Result<Option<StoredIndex>> {
        let dir = self.repo_dir(repo);
        // A directory without a manifest is an interrupted write
        if !dir.join(MANIFEST_FILE).exists() {
            return Ok(None);
        }

        let manifest = self.read_manifest(&dir)?;
        let units = self.read_units(&dir)?;
        tracing::debug!("Loaded {} units from {:?}", units.len(), dir);

        Ok(Some(StoredIndex {
            dir,
            manifest,
            units,
        }))
    }
}

/// Appends units to a fresh index; [`finish`](Self::finish) commits it
pub struct IndexWriter {
    units: BufWriter<File>,
    dir: PathBuf,
    written: usize,
    _lock: File,
}

impl IndexWriter {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush the units and write the manifest
    pub fn finish(mut self, manifest: &IndexManifest) -> Result<PathBuf> {
        let write_failed = |e: std::io::Error| StorageError::WriteFailed(e.to_string());

        self.units.flush().map_err(write_failed)?;
        let content = serde_json::to_string_pretty(manifest)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        fs::write(self.dir.join(MANIFEST_FILE), content).map_err(write_failed)?;

        tracing::debug!("Wrote {} units to {:?}", self.written, self.dir);
        Ok(self.dir)
    }
}

impl UnitSink for IndexWriter {
    fn insert_batch(&mut self, units: &[IndexableUnit]) -> Result<usize> {
        for unit in units {
            serde_json::to_writer(&mut self.units, unit)
                .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
            self.units
                .write_all(b"\n")
                .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        }
        self.written += units.len();
        Ok(units.len())
    }
}
