//! Repository validation, persistence and cleanup through `GitIndexer`
mod common;

use common::TestRepo;
use gitdive::config::{BackendKind, Config};
use gitdive::error::{GitdiveError, ValidationError};
use gitdive::git::is_valid_repository;
use gitdive::indexer::GitIndexer;
use gitdive::pipeline::CommitStage;
use gitdive::storage::CleanupOutcome;
use gitdive::types::IndexableUnit;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn indexer_in(index_dir: &TempDir) -> GitIndexer {
    let mut config = Config::default();
    config.storage.index_dir = index_dir.path().to_path_buf();
    GitIndexer::new(config)
}

fn validation_error(err: GitdiveError) -> ValidationError {
    match err {
        GitdiveError::Validation(e) => e,
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[test]
fn test_valid_repository_predicate() {
    let repo = TestRepo::new();
    repo.commit_file("a.txt", "hello\n", "init");
    let plain = TempDir::new().unwrap();

    assert!(is_valid_repository(repo.path()));
    assert!(!is_valid_repository(&repo.path().join(".git")));
    assert!(!is_valid_repository(plain.path()));
    assert!(!is_valid_repository(TestRepo::bare().path()));
}

#[test]
fn test_validation_failures_are_fatal() {
    let index_dir = TempDir::new().unwrap();
    let indexer = indexer_in(&index_dir);
    let cancel = CancellationToken::new();
    let mut sink: Vec<IndexableUnit> = Vec::new();

    let bare = TestRepo::bare();
    let err = indexer.index_into(bare.path(), &mut sink, &cancel).unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(validation_error(err), ValidationError::BareRepository(_)));

    let repo = TestRepo::new();
    repo.commit_file("a.txt", "hello\n", "init");
    let err = indexer
        .index_into(&repo.path().join(".git"), &mut sink, &cancel)
        .unwrap_err();
    assert!(matches!(
        validation_error(err),
        ValidationError::InsideMetadataDirectory(_)
    ));

    let plain = TempDir::new().unwrap();
    let err = indexer.index_into(plain.path(), &mut sink, &cancel).unwrap_err();
    assert!(matches!(validation_error(err), ValidationError::NotARepository(_)));

    assert!(sink.is_empty());
}

#[test]
fn test_empty_repository_yields_zero_units() {
    for backend in [BackendKind::Cli, BackendKind::Libgit2] {
        let index_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.index_dir = index_dir.path().to_path_buf();
        config.extraction.backend = backend;
        let indexer = GitIndexer::new(config);

        let repo = TestRepo::new();
        let mut sink: Vec<IndexableUnit> = Vec::new();
        let report = indexer
            .index_into(repo.path(), &mut sink, &CancellationToken::new())
            .unwrap();

        assert_eq!(report.commits_listed, 0, "{:?}", backend);
        assert_eq!(report.units_built, 0);
        assert!(!report.cancelled);
        assert!(sink.is_empty());
    }
}

#[test]
fn test_index_status_cleanup_round_trip() {
    let index_dir = TempDir::new().unwrap();
    let indexer = indexer_in(&index_dir);

    let repo = TestRepo::new();
    repo.commit_file("foo.py", "def a(): pass\n", "add foo");
    repo.commit_file("foo.py", "def a(): return 1\n", "change a");

    assert!(indexer.load_index(repo.path()).unwrap().is_none());

    let report = indexer
        .index_repository(repo.path(), &CancellationToken::new())
        .unwrap();
    assert_eq!(report.commits_listed, 2);
    assert_eq!(report.commits_extracted, 2);
    assert_eq!(report.units_persisted, 2);

    let stored = indexer.load_index(repo.path()).unwrap().unwrap();
    assert!(stored.manifest.complete);
    assert_eq!(stored.manifest.units, 2);
    assert_eq!(stored.units().len(), 2);
    assert_eq!(
        stored.units()[0].get("functions").and_then(|v| v.as_str()),
        Some("a")
    );

    // Re-indexing replaces rather than appends
    indexer
        .index_repository(repo.path(), &CancellationToken::new())
        .unwrap();
    assert_eq!(indexer.load_index(repo.path()).unwrap().unwrap().units().len(), 2);

    match indexer.cleanup(repo.path()).unwrap() {
        CleanupOutcome::Removed(dir) => assert!(!dir.exists()),
        CleanupOutcome::NothingToRemove => panic!("expected an index to remove"),
    }
    assert_eq!(
        indexer.cleanup(repo.path()).unwrap(),
        CleanupOutcome::NothingToRemove
    );
}

#[test]
fn test_failed_reindex_keeps_previous_index() {
    let index_dir = TempDir::new().unwrap();
    let indexer = indexer_in(&index_dir);

    let repo = TestRepo::new();
    repo.commit_file("foo.py", "def a(): pass\n", "add foo");
    repo.commit_file("foo.py", "def a(): return 1\n", "change a");
    indexer
        .index_repository(repo.path(), &CancellationToken::new())
        .unwrap();

    let mut broken = Config::default();
    broken.storage.index_dir = index_dir.path().to_path_buf();
    broken.filter.exclude_globs = vec!["[".to_string()];
    let err = GitIndexer::new(broken)
        .index_repository(repo.path(), &CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, GitdiveError::Config(_)), "{:?}", err);

    let stored = indexer.load_index(repo.path()).unwrap().unwrap();
    assert!(stored.manifest.complete);
    assert_eq!(stored.units().len(), 2);
}

#[test]
fn test_subdirectory_resolves_to_repository_index() {
    let index_dir = TempDir::new().unwrap();
    let indexer = indexer_in(&index_dir);

    let repo = TestRepo::new();
    repo.commit_file("src/lib.py", "def a(): pass\n", "add lib");
    let subdir = repo.path().join("src");

    let report = indexer
        .index_repository(&subdir, &CancellationToken::new())
        .unwrap();
    assert_eq!(report.repo_path, repo.path().canonicalize().unwrap());

    let from_root = indexer.load_index(repo.path()).unwrap().unwrap();
    let from_subdir = indexer.load_index(&subdir).unwrap().unwrap();
    assert_eq!(from_root.dir, from_subdir.dir);
    assert_eq!(from_subdir.units().len(), 1);

    match indexer.cleanup(&subdir).unwrap() {
        CleanupOutcome::Removed(dir) => assert!(!dir.exists()),
        CleanupOutcome::NothingToRemove => panic!("expected the repository index to be removed"),
    }
    assert!(indexer.load_index(repo.path()).unwrap().is_none());
}

#[test]
fn test_cancelled_index_is_marked_incomplete() {
    let index_dir = TempDir::new().unwrap();
    let indexer = indexer_in(&index_dir);

    let repo = TestRepo::new();
    repo.commit_file("a.txt", "one\n", "first");
    repo.commit_file("a.txt", "two\n", "second");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = indexer.index_repository(repo.path(), &cancel).unwrap();
    assert!(report.cancelled);
    assert_eq!(report.units_persisted, 0);

    let stored = indexer.load_index(repo.path()).unwrap().unwrap();
    assert!(!stored.manifest.complete);
}

#[test]
fn test_inspect_single_commit() {
    let index_dir = TempDir::new().unwrap();
    let indexer = indexer_in(&index_dir);

    let repo = TestRepo::new();
    repo.commit_file("foo.py", "def a(): pass\n", "add foo");
    let head = repo.commit_file("foo.py", "def a(): return 1\n", "change a");

    let outcome = indexer.inspect(repo.path(), &head[..10]).unwrap();
    assert_eq!(outcome.commit.id, head);
    assert_eq!(outcome.stage(), CommitStage::Done);
    assert_eq!(outcome.units.len(), 1);

    assert!(indexer.inspect(repo.path(), "no-such-rev").is_err());
}
