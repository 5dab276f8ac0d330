//! Repository backend that shells out to the `git` binary

use super::backend::{RepositoryBackend, looks_binary};
use crate::error::BackendCommandError;
use crate::types::CommitRecord;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Field separator for commit listings (ASCII unit separator)
pub const FIELD_SEPARATOR: char = '\x1F';

/// `hash`, `subject`, `author name`, `author email`, `author date (ISO-8601)`
pub const LOG_FORMAT: &str = "--format=%H%x1F%s%x1F%an%x1F%ae%x1F%aI";

const LOG_FIELD_COUNT: usize = 5;

/// Runs `git` subprocesses against one repository path
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_path: PathBuf,
    git_binary: PathBuf,
}

impl GitCli {
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Self {
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
            git_binary: PathBuf::from("git"),
        }
    }

    /// Use a specific git executable instead of the one on PATH
    pub fn with_binary<P: AsRef<Path>>(mut self, git_binary: P) -> Self {
        self.git_binary = git_binary.as_ref().to_path_buf();
        self
    }

    /// Run git and return raw stdout
    fn run_bytes(&self, args: &[&str]) -> Result<Vec<u8>, BackendCommandError> {
        tracing::trace!("git {}", args.join(" "));

        let output = Command::new(&self.git_binary)
            .arg("-C")
            .arg(&self.repo_path)
            .args(["-c", "core.quotepath=off"])
            .args(args)
            .output()
            .map_err(|e| {
                BackendCommandError::new(
                    args,
                    format!("failed to run {}: {}", self.git_binary.display(), e),
                )
            })?;

        if !output.status.success() {
            return Err(
                BackendCommandError::new(args, String::from_utf8_lossy(&output.stderr))
                    .with_exit_code(Some(output.status.code().unwrap_or(-1))),
            );
        }

        Ok(output.stdout)
    }

    /// Run git and decode stdout, substituting invalid UTF-8
    fn run(&self, args: &[&str]) -> Result<String, BackendCommandError> {
        self.run_bytes(args)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl RepositoryBackend for GitCli {
    fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    fn probe(&self) -> Result<(), BackendCommandError> {
        self.run(&["rev-parse", "--git-dir"]).map(|_| ())
    }

    fn is_bare(&self) -> Result<bool, BackendCommandError> {
        let out = self.run(&["rev-parse", "--is-bare-repository"])?;
        Ok(out.trim() == "true")
    }

    fn toplevel(&self) -> Result<PathBuf, BackendCommandError> {
        let out = self.run(&["rev-parse", "--show-toplevel"])?;
        Ok(PathBuf::from(out.trim_end_matches(['\n', '\r'])))
    }

    fn list_commits(&self) -> Result<Vec<CommitRecord>, BackendCommandError> {
        let output = self.run(&["log", LOG_FORMAT])?;
        Ok(parse_commit_listing(&output))
    }

    fn commit_record(&self, rev: &str) -> Result<CommitRecord, BackendCommandError> {
        let args = ["log", "-1", LOG_FORMAT, rev, "--"];
        let output = self.run(&args)?;
        parse_commit_listing(&output)
            .into_iter()
            .next()
            .ok_or_else(|| BackendCommandError::new(&args, format!("no commit for '{}'", rev)))
    }

    fn commit_diff(&self, id: &str) -> Result<String, BackendCommandError> {
        let parent = format!("{}^1", id);
        self.run(&[
            "diff",
            "--no-color",
            "--no-ext-diff",
            "--unified=0",
            &parent,
            id,
        ])
    }

    fn changed_files(&self, id: &str) -> Result<Vec<String>, BackendCommandError> {
        let output = if self.is_root_commit(id)? {
            self.run(&["ls-tree", "-r", "--name-only", id])?
        } else {
            let parent = format!("{}^1", id);
            self.run(&["diff", "--name-only", "--no-color", &parent, id])?
        };

        Ok(output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn file_content_at_commit(
        &self,
        id: &str,
        path: &str,
    ) -> Result<String, BackendCommandError> {
        let spec = format!("{}:{}", id, path);
        match self.run_bytes(&["cat-file", "blob", &spec]) {
            Ok(bytes) if looks_binary(&bytes) => {
                tracing::debug!("Skipping binary file {} at {}", path, id);
                Ok(String::new())
            }
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            // A missing path (or submodule entry) reads as empty
            Err(e) if e.is_exit_failure() => {
                tracing::debug!("Unreadable path {} at {}: {}", path, id, e.stderr);
                Ok(String::new())
            }
            Err(e) => Err(e),
        }
    }

    fn is_root_commit(&self, id: &str) -> Result<bool, BackendCommandError> {
        let output = self.run(&["rev-list", "--parents", "-n", "1", id])?;
        Ok(output.split_whitespace().count() == 1)
    }
}

/// Parse `git log` output produced with [`LOG_FORMAT`]
///
/// Lines that do not carry all five fields are skipped.
pub fn parse_commit_listing(output: &str) -> Vec<CommitRecord> {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let parts: Vec<&str> = line.splitn(LOG_FIELD_COUNT, FIELD_SEPARATOR).collect();
            if parts.len() != LOG_FIELD_COUNT {
                tracing::debug!("Skipping malformed log line: {:?}", line);
                return None;
            }
            Some(CommitRecord {
                id: parts[0].trim().to_string(),
                summary: parts[1].to_string(),
                author: format!("{} <{}>", parts[2], parts[3]),
                timestamp: parts[4].trim().to_string(),
            })
        })
        .collect()
}
