///
/// This module implements the CLI interface for github-file-loader: command parsing,
/// the async `run` entrypoint and the `sync` command.
///
/// All loading logic (tree listing, processor dispatch, record construction) lives in the
/// [`github-file-loader-core`] crate. This module wires the built-in processors, an in-memory
/// store and a SHA-256 digest into one load, then writes the records out as JSON.
///
/// [`github-file-loader-core`]: ../../github-file-loader-core/
use crate::load_config::{load_config, CliConfig};
use crate::processors::{builtin_processors, sha256_digest};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use github_file_loader_core::cache::ProcessorCache;
use github_file_loader_core::loader::{LoadReport, Loader, LoaderConfig, LoaderContext};
use github_file_loader_core::store::MemoryStore;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// CLI for github-file-loader: render a repository's files into a content collection.
#[derive(Parser)]
#[clap(
    name = "github-file-loader",
    version,
    about = "Load every file of a GitHub repository, render it by extension and write the records as JSON"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load the configured repository once and write its records to the configured output
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Continue past per-file failures and report them at the end
        #[clap(long)]
        resilient: bool,
    },
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config, resilient } => {
            let config = load_config(config)?;
            let report = sync(&config, resilient || config.resilient).await?;
            println!(
                "Synchronised {} records from {}/{} into {}",
                report.written.len(),
                config.username,
                config.repo,
                config.output.display()
            );
            for failure in &report.failed {
                eprintln!("failed: {}: {}", failure.path, failure.error);
            }
            Ok(())
        }
    }
}

/// Runs one load for `config` and writes every stored record to `config.output`.
pub async fn sync(config: &CliConfig, resilient: bool) -> Result<LoadReport> {
    tracing::info!(
        command = "sync",
        username = %config.username,
        repo = %config.repo,
        branch = %config.branch(),
        resilient,
        "Starting load"
    );

    let cache = Arc::new(ProcessorCache::new());
    let loader = Loader::with_client(
        LoaderConfig {
            username: config.username.clone(),
            repo: config.repo.clone(),
            processors: builtin_processors(cache),
        },
        config.client(),
    );

    let store = MemoryStore::new();
    let host_config = config.host_config();
    let context = LoaderContext::new(&store, &sha256_digest, &host_config);

    let report = if resilient {
        loader.load_resilient(&context).await?
    } else {
        loader.load(&context).await?;
        LoadReport {
            written: store.ids(),
            failed: Vec::new(),
        }
    };

    write_records(&store, &config.output)?;
    tracing::info!(
        command = "sync",
        written = report.written.len(),
        failed = report.failed.len(),
        output = %config.output.display(),
        "Load complete"
    );
    Ok(report)
}

fn write_records(store: &MemoryStore, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&store.records())?;
    fs::write(output, json)
        .with_context(|| format!("Failed to write records to {}", output.display()))?;
    Ok(())
}
