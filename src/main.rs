use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use gitdive::config::{BackendKind, Config};
use gitdive::indexer::GitIndexer;
use gitdive::storage::CleanupOutcome;
use gitdive::types::UnitGranularity;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Parser)]
#[command(
    name = "gitdive",
    version,
    long_version = LONG_VERSION,
    about = "Decompose git history into indexable units"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "GITDIVE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract and persist units for every commit reachable from HEAD
    Index {
        #[arg(default_value = ".")]
        path: PathBuf,

        #[arg(long, value_enum)]
        granularity: Option<UnitGranularity>,

        /// Worker threads for per-commit processing
        #[arg(long)]
        workers: Option<usize>,

        /// Repository backend: cli or libgit2
        #[arg(long)]
        backend: Option<BackendKind>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one commit through the pipeline and print its units
    Inspect {
        commit: String,

        #[arg(long, default_value = ".")]
        path: PathBuf,

        #[arg(long, value_enum)]
        granularity: Option<UnitGranularity>,
    },
    /// Show the stored index for a repository
    Status {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Delete the stored index for a repository
    Cleanup {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            let mut config = Config::from_file(path)?;
            config.apply_env_overrides();
            config.validate()?;
            config
        }
        None => Config::new()?,
    };
    Ok(config)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    // Logs go to stderr so stdout stays clean for reports
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Index {
            path,
            granularity,
            workers,
            backend,
            json,
        } => {
            if let Some(granularity) = granularity {
                config.assembly.granularity = granularity;
            }
            if let Some(workers) = workers {
                config.extraction.workers = workers;
            }
            if let Some(backend) = backend {
                config.extraction.backend = backend;
            }
            config.validate()?;

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, finishing in-flight commits");
                    on_interrupt.cancel();
                }
            });

            let indexer = GitIndexer::new(config);
            let report = tokio::task::spawn_blocking(move || {
                indexer.index_repository(&path, &cancel)
            })
            .await
            .context("Indexing task failed to complete")??;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
        }
        Command::Inspect {
            commit,
            path,
            granularity,
        } => {
            if let Some(granularity) = granularity {
                config.assembly.granularity = granularity;
            }

            let indexer = GitIndexer::new(config);
            let outcome = tokio::task::spawn_blocking(move || indexer.inspect(&path, &commit))
                .await
                .context("Inspection task failed to complete")??;

            println!(
                "Commit {} ({}): {:?}",
                outcome.commit.short_id(),
                outcome.commit.summary,
                outcome.stages
            );
            if let Some(reason) = &outcome.skip_reason {
                println!("Skipped: {:?}", reason);
            }
            for (i, unit) in outcome.units.iter().enumerate() {
                println!("\n--- unit {} ---\n{}", i + 1, unit.text);
                println!("{}", serde_json::to_string_pretty(&unit.metadata)?);
            }
        }
        Command::Status { path } => {
            let indexer = GitIndexer::new(config);
            match indexer.load_index(&path)? {
                Some(index) => {
                    let manifest = &index.manifest;
                    println!("Index: {}", index.dir.display());
                    println!("Repository: {}", manifest.repo_path);
                    println!("Indexed at: {}", manifest.indexed_at);
                    println!("Granularity: {}", manifest.granularity.as_str());
                    println!(
                        "Commits: {} listed, {} extracted",
                        manifest.commits_listed, manifest.commits_extracted
                    );
                    println!("Units: {}", index.units().len());
                    if !manifest.complete {
                        println!("Incomplete: the last run was cancelled");
                    }
                }
                None => println!("No index for {}", path.display()),
            }
        }
        Command::Cleanup { path } => {
            let indexer = GitIndexer::new(config);
            match indexer.cleanup(&path)? {
                CleanupOutcome::Removed(dir) => println!("Removed {}", dir.display()),
                CleanupOutcome::NothingToRemove => println!("No index for {}", path.display()),
            }
        }
    }

    Ok(())
}
