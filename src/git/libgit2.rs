//! In-process repository backend built on libgit2

use super::backend::RepositoryBackend;
use crate::error::BackendCommandError;
use crate::types::CommitRecord;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use git2::{DiffFormat, DiffOptions, ObjectType, Repository, Sort, TreeWalkMode, TreeWalkResult};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Repository backend answering queries through `git2`
///
/// `git2::Repository` is not `Sync`, so access is serialized behind a mutex.
pub struct LibGit2Backend {
    repo: Mutex<Repository>,
    repo_path: PathBuf,
}

fn lib_err(op: &str, target: &str, err: git2::Error) -> BackendCommandError {
    BackendCommandError::new(&["libgit2", op, target], err.message())
}

impl LibGit2Backend {
    /// Discover and open a git repository from any path within it
    pub fn discover<P: AsRef<Path>>(path: P) -> Result<Self, BackendCommandError> {
        let path = path.as_ref();
        let target = path.display().to_string();

        let repo = Repository::discover(path).map_err(|e| lib_err("discover", &target, e))?;
        let repo_path = repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| repo.path().to_path_buf());

        tracing::debug!("Opened git repository at: {}", repo_path.display());

        Ok(Self {
            repo: Mutex::new(repo),
            repo_path,
        })
    }

    fn repo(&self) -> Result<MutexGuard<'_, Repository>, BackendCommandError> {
        self.repo.lock().map_err(|e| {
            BackendCommandError::new(&["libgit2", "lock"], format!("repository lock poisoned: {}", e))
        })
    }

    fn find_commit<'r>(
        repo: &'r Repository,
        op: &str,
        id: &str,
    ) -> Result<git2::Commit<'r>, BackendCommandError> {
        repo.revparse_single(id)
            .and_then(|obj| obj.peel_to_commit())
            .map_err(|e| lib_err(op, id, e))
    }

    fn record_for(commit: &git2::Commit) -> CommitRecord {
        let author = commit.author();
        let name = author.name().unwrap_or("Unknown");
        let email = author.email().unwrap_or("");

        CommitRecord {
            id: commit.id().to_string(),
            summary: String::from_utf8_lossy(commit.summary_bytes().unwrap_or_default())
                .into_owned(),
            author: format!("{} <{}>", name, email),
            timestamp: iso_timestamp(author.when()),
        }
    }
}

/// Render a git time the way `%aI` does
fn iso_timestamp(time: git2::Time) -> String {
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60)
        .unwrap_or_else(|| Utc.fix());
    DateTime::from_timestamp(time.seconds(), 0)
        .map(|utc| {
            utc.with_timezone(&offset)
                .format("%Y-%m-%dT%H:%M:%S%:z")
                .to_string()
        })
        .unwrap_or_default()
}

impl RepositoryBackend for LibGit2Backend {
    fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    fn probe(&self) -> Result<(), BackendCommandError> {
        self.repo().map(|_| ())
    }

    fn is_bare(&self) -> Result<bool, BackendCommandError> {
        Ok(self.repo()?.is_bare())
    }

    fn toplevel(&self) -> Result<PathBuf, BackendCommandError> {
        let repo = self.repo()?;
        repo.workdir().map(Path::to_path_buf).ok_or_else(|| {
            BackendCommandError::new(&["libgit2", "workdir"], "repository has no working tree")
        })
    }

    fn list_commits(&self) -> Result<Vec<CommitRecord>, BackendCommandError> {
        let repo = self.repo()?;
        let mut revwalk = repo.revwalk().map_err(|e| lib_err("revwalk", "HEAD", e))?;
        revwalk
            .set_sorting(Sort::TIME)
            .map_err(|e| lib_err("revwalk", "HEAD", e))?;
        revwalk.push_head().map_err(|e| lib_err("revwalk", "HEAD", e))?;

        let mut commits = Vec::new();
        for oid in revwalk {
            let oid = oid.map_err(|e| lib_err("revwalk", "HEAD", e))?;
            let commit = repo
                .find_commit(oid)
                .map_err(|e| lib_err("find_commit", &oid.to_string(), e))?;
            commits.push(Self::record_for(&commit));

            if commits.len() % 500 == 0 {
                tracing::debug!("Listed {} commits", commits.len());
            }
        }

        Ok(commits)
    }

    fn commit_record(&self, rev: &str) -> Result<CommitRecord, BackendCommandError> {
        let repo = self.repo()?;
        let commit = Self::find_commit(&repo, "revparse", rev)?;
        Ok(Self::record_for(&commit))
    }

    fn commit_diff(&self, id: &str) -> Result<String, BackendCommandError> {
        let repo = self.repo()?;
        let commit = Self::find_commit(&repo, "diff", id)?;
        let tree = commit.tree().map_err(|e| lib_err("diff", id, e))?;

        // First parent only; a root commit has nothing to diff against
        let parent_tree = commit
            .parent(0)
            .and_then(|p| p.tree())
            .map_err(|e| lib_err("diff", id, e))?;

        let mut diff_opts = DiffOptions::new();
        diff_opts
            .context_lines(0)
            .interhunk_lines(0)
            .ignore_whitespace(false);

        let mut diff = repo
            .diff_tree_to_tree(Some(&parent_tree), Some(&tree), Some(&mut diff_opts))
            .map_err(|e| lib_err("diff", id, e))?;
        diff.find_similar(None).map_err(|e| lib_err("diff", id, e))?;

        let mut diff_content = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            let content = String::from_utf8_lossy(line.content());
            match line.origin() {
                origin @ ('+' | '-' | ' ') => {
                    diff_content.push(origin);
                    diff_content.push_str(&content);
                }
                // File headers, hunk headers, binary notices, EOF-newline markers
                _ => diff_content.push_str(&content),
            }
            true
        })
        .map_err(|e| lib_err("diff", id, e))?;

        Ok(diff_content)
    }

    fn changed_files(&self, id: &str) -> Result<Vec<String>, BackendCommandError> {
        let repo = self.repo()?;
        let commit = Self::find_commit(&repo, "changed_files", id)?;
        let tree = commit.tree().map_err(|e| lib_err("changed_files", id, e))?;

        let mut files = Vec::new();

        if commit.parent_count() == 0 {
            tree.walk(TreeWalkMode::PreOrder, |root, entry| {
                if entry.kind() == Some(ObjectType::Blob)
                    && let Some(name) = entry.name()
                {
                    files.push(format!("{}{}", root, name));
                }
                TreeWalkResult::Ok
            })
            .map_err(|e| lib_err("changed_files", id, e))?;
            return Ok(files);
        }

        let parent_tree = commit
            .parent(0)
            .and_then(|p| p.tree())
            .map_err(|e| lib_err("changed_files", id, e))?;
        let mut diff = repo
            .diff_tree_to_tree(Some(&parent_tree), Some(&tree), None)
            .map_err(|e| lib_err("changed_files", id, e))?;
        diff.find_similar(None)
            .map_err(|e| lib_err("changed_files", id, e))?;

        for delta in diff.deltas() {
            if let Some(path) = delta.new_file().path().or_else(|| delta.old_file().path()) {
                files.push(path.to_string_lossy().into_owned());
            }
        }

        Ok(files)
    }

    fn file_content_at_commit(
        &self,
        id: &str,
        path: &str,
    ) -> Result<String, BackendCommandError> {
        let repo = self.repo()?;
        let commit = Self::find_commit(&repo, "show", id)?;
        let tree = commit.tree().map_err(|e| lib_err("show", id, e))?;

        let Ok(entry) = tree.get_path(Path::new(path)) else {
            tracing::debug!("Path {} not present at {}", path, id);
            return Ok(String::new());
        };
        let Ok(blob) = repo.find_blob(entry.id()) else {
            return Ok(String::new());
        };

        if blob.is_binary() {
            tracing::debug!("Skipping binary file {} at {}", path, id);
            return Ok(String::new());
        }

        Ok(String::from_utf8_lossy(blob.content()).into_owned())
    }

    fn is_root_commit(&self, id: &str) -> Result<bool, BackendCommandError> {
        let repo = self.repo()?;
        let commit = Self::find_commit(&repo, "rev-list", id)?;
        Ok(commit.parent_count() == 0)
    }
}
