//! Processor cache keyed by configuration identity.
//!
//! Render functions that need an expensive per-configuration object (a
//! configured markdown pipeline, a template set) build it once per distinct
//! [`HostConfig`] and share it. The key is a [`ConfigId`]: a SHA-256 of the
//! configuration's canonical JSON, so equal configurations share an entry no
//! matter which value instance carries them. Entries live until
//! [`ProcessorCache::invalidate`] or [`ProcessorCache::clear`] is called.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::debug;

use crate::processor::HostConfig;

/// Stable identity of a configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigId(String);

impl ConfigId {
    /// Hashes the canonical JSON of `config`.
    pub fn of(config: &HostConfig) -> Self {
        let digest = Sha256::digest(canonicalize(config).to_string().as_bytes());
        Self(hex::encode(digest))
    }

    /// Uses a caller-chosen id instead of hashing.
    pub fn named(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Rebuilds `value` with object keys inserted in sorted order, recursively.
fn canonicalize(value: &HostConfig) -> HostConfig {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), canonicalize(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

pub struct ProcessorCache<P> {
    entries: Mutex<HashMap<ConfigId, Arc<P>>>,
}

impl<P> Default for ProcessorCache<P> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<P> ProcessorCache<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the processor for `config`, building it with `build` on a miss.
    pub async fn get_or_try_init<F, Fut, E>(
        &self,
        config: &HostConfig,
        build: F,
    ) -> Result<Arc<P>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<P, E>>,
    {
        self.get_or_try_init_by_id(ConfigId::of(config), build).await
    }

    /// Like [`get_or_try_init`](Self::get_or_try_init) with an explicit id.
    ///
    /// The cache lock is held while building, so concurrent callers with the
    /// same id build once. A failed build caches nothing.
    pub async fn get_or_try_init_by_id<F, Fut, E>(
        &self,
        id: ConfigId,
        build: F,
    ) -> Result<Arc<P>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<P, E>>,
    {
        let mut entries = self.entries.lock().await;
        if let Some(processor) = entries.get(&id) {
            return Ok(Arc::clone(processor));
        }

        debug!(config_id = %id.as_str(), "Building processor for new configuration");
        let processor = Arc::new(build().await?);
        entries.insert(id, Arc::clone(&processor));
        Ok(processor)
    }

    /// Drops the entry for `config`. Returns whether one existed.
    pub async fn invalidate(&self, config: &HostConfig) -> bool {
        self.invalidate_id(&ConfigId::of(config)).await
    }

    pub async fn invalidate_id(&self, id: &ConfigId) -> bool {
        self.entries.lock().await.remove(id).is_some()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
