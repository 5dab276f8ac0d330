use super::*;
use std::collections::HashMap;
use tempfile::NamedTempFile;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.extraction.backend, BackendKind::Cli);
    assert_eq!(config.extraction.max_file_size, 10_000);
    assert_eq!(config.extraction.workers, 1);
    assert_eq!(config.analysis.max_line_length, 4_000);
    assert_eq!(config.assembly.granularity, UnitGranularity::Hunk);
    assert!(config.filter.ignore_patterns.contains(&".lock".to_string()));
    assert!(config.filter.exclude_globs.is_empty());
}

#[test]
fn test_validate_valid_config() {
    assert!(Config::default().validate().is_ok());
}

#[test]
fn test_validate_zero_workers() {
    let mut config = Config::default();
    config.extraction.workers = 0;
    let err = config.validate().unwrap_err();
    assert!(matches!(
        err,
        GitdiveError::Config(ConfigError::InvalidValue { ref key, .. }) if key == "extraction.workers"
    ));
}

#[test]
fn test_validate_empty_ignore_pattern() {
    let mut config = Config::default();
    config.filter.ignore_patterns.push(String::new());
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_bad_glob() {
    let mut config = Config::default();
    config.filter.exclude_globs.push("vendor/[".to_string());
    assert!(config.validate().is_err());
}

#[test]
fn test_save_and_load() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path();

    let mut config = Config::default();
    config.extraction.workers = 4;
    config.assembly.granularity = UnitGranularity::Structural;
    config.extraction.backend = BackendKind::Libgit2;

    config.save(path).unwrap();
    let loaded = Config::from_file(path).unwrap();

    assert_eq!(loaded.extraction.workers, 4);
    assert_eq!(loaded.assembly.granularity, UnitGranularity::Structural);
    assert_eq!(loaded.extraction.backend, BackendKind::Libgit2);
}

#[test]
fn test_partial_file_uses_defaults() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), "[assembly]\ngranularity = \"commit\"\n").unwrap();

    let loaded = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(loaded.assembly.granularity, UnitGranularity::Commit);
    assert_eq!(loaded.assembly.max_unit_chars, 6_000);
    assert_eq!(loaded.extraction.max_file_size, 10_000);
}

#[test]
fn test_load_nonexistent_file() {
    let result = Config::from_file(Path::new("/nonexistent/gitdive.toml"));
    assert!(matches!(
        result.unwrap_err(),
        GitdiveError::Config(ConfigError::FileNotFound(_))
    ));
}

#[test]
fn test_load_invalid_toml() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), "extraction = [").unwrap();
    assert!(matches!(
        Config::from_file(temp_file.path()).unwrap_err(),
        GitdiveError::Config(ConfigError::ParseFailed(_))
    ));
}

#[test]
fn test_overrides() {
    let vars: HashMap<&str, &str> = [
        ("GITDIVE_BACKEND", "libgit2"),
        ("GITDIVE_WORKERS", "8"),
        ("GITDIVE_MAX_FILE_SIZE", "512"),
        ("GITDIVE_GRANULARITY", "structural"),
        ("GITDIVE_INDEX_DIR", "/tmp/gitdive-index"),
    ]
    .into_iter()
    .collect();

    let mut config = Config::default();
    config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

    assert_eq!(config.extraction.backend, BackendKind::Libgit2);
    assert_eq!(config.extraction.workers, 8);
    assert_eq!(config.extraction.max_file_size, 512);
    assert_eq!(config.assembly.granularity, UnitGranularity::Structural);
    assert_eq!(config.storage.index_dir, PathBuf::from("/tmp/gitdive-index"));
}

#[test]
fn test_invalid_overrides_are_ignored() {
    let mut config = Config::default();
    config.apply_overrides(|k| match k {
        "GITDIVE_WORKERS" => Some("many".to_string()),
        "GITDIVE_GRANULARITY" => Some("paragraph".to_string()),
        _ => None,
    });
    assert_eq!(config.extraction.workers, 1);
    assert_eq!(config.assembly.granularity, UnitGranularity::Hunk);
}

#[test]
fn test_backend_kind_parse() {
    assert_eq!("git".parse::<BackendKind>(), Ok(BackendKind::Cli));
    assert_eq!("LibGit2".parse::<BackendKind>(), Ok(BackendKind::Libgit2));
    assert!("svn".parse::<BackendKind>().is_err());
}
