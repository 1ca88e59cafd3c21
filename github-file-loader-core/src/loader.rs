//! High-level pipeline: lists a remote tree, renders every file and upserts it into a store.
//!
//! This module provides the loader the host environment registers and invokes on its own
//! schedule. One invocation of [`Loader::load`] is a single top-to-bottom pass:
//!   - Fetches the full recursive tree of the configured branch
//!   - Skips directory entries
//!   - Fetches each file body and fingerprints it with the host's digest function
//!   - Derives the record id and extension from the path (see [`crate::record::split_path`])
//!   - Renders the body with the processor registered for that extension, or the fallback
//!   - Upserts one [`FileRecord`] per file into the host's [`Store`]
//!
//! # Major Types
//! - [`LoaderConfig`]: owner, repository and processors for one loader
//! - [`LoaderContext`]: what the host supplies per invocation (store, digest fn, host config)
//! - [`LoadReport`]: per-file outcomes of [`Loader::load_resilient`]
//!
//! # Error Handling
//! [`Loader::load`] is fail-fast: a tree failure aborts before any write, and the first failing
//! body fetch, render or upsert aborts the rest of the pass. Records already written stay
//! written. [`Loader::load_resilient`] instead records per-file failures and carries on; only a
//! tree failure aborts it.
//!
//! Entries are processed sequentially in the order the API returns them.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::contract::{RepositoryClient, Store};
use crate::error::LoaderError;
use crate::processor::{HostConfig, ProcessorRegistry};
use crate::record::{split_path, EntryKind, FileRecord, TreeEntry};
use crate::remote::GitHubClient;

/// Name the loader registers under.
pub const LOADER_NAME: &str = "github-file-loader";

/// Host-supplied content digest function.
pub type DigestFn = dyn Fn(&str) -> String + Send + Sync;

/// Construction input for [`github_file_loader`].
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Repository owner (user or organization)
    pub username: String,
    pub repo: String,
    pub processors: ProcessorRegistry,
}

/// Per-invocation collaborators supplied by the host.
pub struct LoaderContext<'a> {
    pub store: &'a dyn Store,
    pub generate_digest: &'a DigestFn,
    /// Passed unmodified to every render function.
    pub config: &'a HostConfig,
}

impl<'a> LoaderContext<'a> {
    pub fn new(
        store: &'a dyn Store,
        generate_digest: &'a DigestFn,
        config: &'a HostConfig,
    ) -> Self {
        Self {
            store,
            generate_digest,
            config,
        }
    }
}

/// Outcome of a resilient load.
#[derive(Debug, Default, Serialize)]
pub struct LoadReport {
    /// Distinct ids of records written, in first-write order. Files whose paths
    /// map to the same id are one record in the store and are listed once.
    pub written: Vec<String>,
    pub failed: Vec<FileFailure>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Serialize)]
pub struct FileFailure {
    pub path: String,
    pub error: String,
}

/// Builds a loader for `username/repo` on the default branch of github.com.
pub fn github_file_loader(config: LoaderConfig) -> Loader<GitHubClient> {
    let client = GitHubClient::new(config.username.clone(), config.repo.clone());
    Loader::with_client(config, client)
}

#[derive(Debug)]
pub struct Loader<C> {
    username: String,
    repo: String,
    processors: ProcessorRegistry,
    client: C,
}

impl<C: RepositoryClient> Loader<C> {
    /// Builds a loader over any [`RepositoryClient`] (custom hosts, branches, tests).
    pub fn with_client(config: LoaderConfig, client: C) -> Self {
        Self {
            username: config.username,
            repo: config.repo,
            processors: config.processors,
            client,
        }
    }

    pub fn name(&self) -> &'static str {
        LOADER_NAME
    }

    pub fn processors(&self) -> &ProcessorRegistry {
        &self.processors
    }

    /// Loads every file of the tree into the store, stopping at the first failure.
    pub async fn load(&self, context: &LoaderContext<'_>) -> Result<(), LoaderError> {
        let tree = self.fetch_tree().await?;

        let mut written = 0usize;
        for entry in files(&tree) {
            if let Err(e) = self.ingest(&entry.path, context).await {
                error!(path = %entry.path, error = %e, written, "[LOAD][ERROR] Aborting load");
                return Err(e);
            }
            written += 1;
        }

        info!(
            username = %self.username,
            repo = %self.repo,
            written,
            "[LOAD] Load complete"
        );
        Ok(())
    }

    /// Loads every file of the tree, recording per-file failures instead of aborting.
    ///
    /// Only a failure to fetch the tree is returned as an error.
    pub async fn load_resilient(
        &self,
        context: &LoaderContext<'_>,
    ) -> Result<LoadReport, LoaderError> {
        let tree = self.fetch_tree().await?;

        let mut report = LoadReport::default();
        let mut seen = HashSet::new();
        for entry in files(&tree) {
            match self.ingest(&entry.path, context).await {
                Ok(id) => {
                    if seen.insert(id.clone()) {
                        report.written.push(id);
                    } else {
                        debug!(
                            path = %entry.path,
                            id = %id,
                            "[LOAD] Overwrote record with same id"
                        );
                    }
                }
                Err(e) => {
                    warn!(path = %entry.path, error = %e, "[LOAD] File failed, continuing");
                    report.failed.push(FileFailure {
                        path: entry.path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            username = %self.username,
            repo = %self.repo,
            written = report.written.len(),
            failed = report.failed.len(),
            "[LOAD] Resilient load complete"
        );
        Ok(report)
    }

    async fn fetch_tree(&self) -> Result<Vec<TreeEntry>, LoaderError> {
        info!(username = %self.username, repo = %self.repo, "[LOAD] Fetching repository tree");
        self.client.fetch_tree().await.map_err(|e| {
            error!(
                username = %self.username,
                repo = %self.repo,
                error = %e,
                "[LOAD][ERROR] Tree fetch failed"
            );
            e
        })
    }

    /// Fetches, renders and stores one file. Returns the record id.
    async fn ingest(&self, path: &str, context: &LoaderContext<'_>) -> Result<String, LoaderError> {
        let body = self.client.fetch_file_body(path).await?;

        let digest = (context.generate_digest)(&body);
        if digest.is_empty() {
            return Err(LoaderError::EmptyDigest {
                path: path.to_string(),
            });
        }

        let (id, extension) = split_path(path);
        if !self.processors.is_registered(extension) {
            warn!(
                path = %path,
                extension = %extension,
                "[LOAD] No processor registered, storing empty render"
            );
        }
        let render = self.processors.resolve(extension);
        let rendered = render(body.clone(), context.config.clone())
            .await
            .map_err(|e| LoaderError::Render {
                path: path.to_string(),
                extension: extension.to_string(),
                message: e.to_string(),
            })?;

        debug!(
            path = %path,
            id = %id,
            extension = %extension,
            digest = %digest,
            "[LOAD] Rendered file"
        );
        let record = FileRecord::new(path, &self.username, &self.repo, body, rendered, digest);
        context
            .store
            .set(record)
            .await
            .map_err(|e| LoaderError::Store {
                id: id.to_string(),
                message: e.to_string(),
            })?;

        Ok(id.to_string())
    }
}

/// File entries of `tree`, in order. Directories and other entry kinds are skipped.
fn files(tree: &[TreeEntry]) -> impl Iterator<Item = &TreeEntry> {
    tree.iter().filter(|entry| match entry.kind {
        EntryKind::File => true,
        EntryKind::Directory => false,
        EntryKind::Other => {
            debug!(path = %entry.path, "[LOAD] Skipping non-file entry");
            false
        }
    })
}
