//! In-memory [`Store`] keyed by record id.
//!
//! Used by the CLI to collect one load's records before writing them out, and
//! by tests. Upserts replace the previous record wholesale; the digest of the
//! previous record decides whether the upsert counts as a change.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::contract::Store;
use crate::error::StoreError;
use crate::record::FileRecord;

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<String, FileRecord>,
    writes: usize,
    changes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, id: &str) -> Option<FileRecord> {
        self.lock().records.get(id).cloned()
    }

    pub fn digest(&self, id: &str) -> Option<String> {
        self.lock().records.get(id).map(|r| r.digest.clone())
    }

    /// All records, ordered by id.
    pub fn records(&self) -> Vec<FileRecord> {
        self.lock().records.values().cloned().collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.lock().records.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `set` calls received.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    /// Number of `set` calls that inserted a new id or changed a digest.
    pub fn changes(&self) -> usize {
        self.lock().changes
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn set(&self, record: FileRecord) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let changed = inner
            .records
            .get(&record.id)
            .map_or(true, |previous| previous.digest != record.digest);
        debug!(id = %record.id, changed, "Storing record");

        inner.writes += 1;
        if changed {
            inner.changes += 1;
        }
        inner.records.insert(record.id.clone(), record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RenderedContent;
    use std::sync::Arc;

    fn record(path: &str, body: &str, digest: &str) -> FileRecord {
        FileRecord::new(
            path,
            "octocat",
            "docs",
            body.to_string(),
            RenderedContent::new(body),
            digest.to_string(),
        )
    }

    #[tokio::test]
    async fn set_replaces_record_with_same_id() {
        let store = MemoryStore::new();
        store.set(record("a.md", "one", "d1")).await.unwrap();
        store.set(record("a.md", "two", "d2")).await.unwrap();

        assert_eq!(store.len(), 1);
        let stored = store.get("a").expect("record stored under id");
        assert_eq!(stored.body, "two");
        assert_eq!(stored.digest, "d2");
        assert_eq!(store.changes(), 2);
    }

    #[tokio::test]
    async fn unchanged_digest_is_not_a_change() {
        let store = MemoryStore::new();
        store.set(record("a.md", "one", "d1")).await.unwrap();
        store.set(record("a.md", "one", "d1")).await.unwrap();

        assert_eq!(store.writes(), 2);
        assert_eq!(store.changes(), 1);
        assert_eq!(store.digest("a").as_deref(), Some("d1"));
    }

    #[tokio::test]
    async fn records_are_ordered_by_id() {
        let store = MemoryStore::new();
        store.set(record("b.md", "", "x")).await.unwrap();
        store.set(record("a.md", "", "y")).await.unwrap();
        assert_eq!(store.ids(), vec!["a".to_string(), "b".to_string()]);
        assert!(!store.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_upserts_with_distinct_ids_all_land() {
        let store = Arc::new(MemoryStore::new());

        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let path = format!("file{i}.md");
                    store.set(record(&path, "body", &format!("d{i}"))).await
                })
            })
            .collect();
        for task in tasks {
            task.await.expect("task completes").expect("set succeeds");
        }

        assert_eq!(store.len(), 64);
        assert_eq!(store.writes(), 64);
        assert_eq!(store.changes(), 64);
        for i in 0..64 {
            assert_eq!(store.digest(&format!("file{i}")), Some(format!("d{i}")));
        }
    }
}
