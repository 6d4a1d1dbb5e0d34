//! In-memory remote store used by tests and offline development runs.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::progress::remote::{RemoteProgressRow, RemoteProgressStore, RemoteStoreError};

#[derive(Default)]
pub struct MemoryRemoteStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    rows: BTreeMap<(String, String), RemoteProgressRow>,
    fetch_fails: bool,
    failing_terms: BTreeSet<String>,
    upserts: u64,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent fetch fail, simulating an unreachable store.
    pub fn set_fetch_fails(&self, fails: bool) {
        self.inner.write().fetch_fails = fails;
    }

    /// Makes upserts for one term fail while others keep succeeding.
    pub fn fail_upserts_for(&self, term: &str) {
        self.inner.write().failing_terms.insert(term.to_string());
    }

    pub fn clear_upsert_failures(&self) {
        self.inner.write().failing_terms.clear();
    }

    /// Number of upserts that reached the row map.
    pub fn upsert_count(&self) -> u64 {
        self.inner.read().upserts
    }

    pub fn row(&self, learner_id: &str, term: &str) -> Option<RemoteProgressRow> {
        self.inner
            .read()
            .rows
            .get(&(learner_id.to_string(), term.to_string()))
            .cloned()
    }

    pub fn rows_for(&self, learner_id: &str) -> Vec<RemoteProgressRow> {
        self.inner
            .read()
            .rows
            .values()
            .filter(|row| row.learner_id == learner_id)
            .cloned()
            .collect()
    }

    /// Seeds a row directly, bypassing the trait.
    pub fn insert(&self, row: RemoteProgressRow) {
        self.inner
            .write()
            .rows
            .insert((row.learner_id.clone(), row.term.clone()), row);
    }
}

#[async_trait]
impl RemoteProgressStore for MemoryRemoteStore {
    async fn fetch(&self, learner_id: &str) -> Result<Vec<RemoteProgressRow>, RemoteStoreError> {
        let inner = self.inner.read();
        if inner.fetch_fails {
            return Err(RemoteStoreError::Unavailable("fetch disabled".to_string()));
        }
        Ok(inner
            .rows
            .values()
            .filter(|row| row.learner_id == learner_id)
            .cloned()
            .collect())
    }

    async fn upsert(&self, row: &RemoteProgressRow) -> Result<(), RemoteStoreError> {
        let mut inner = self.inner.write();
        if inner.failing_terms.contains(&row.term) {
            return Err(RemoteStoreError::Unavailable(format!(
                "upsert disabled for {}",
                row.term
            )));
        }
        inner.upserts += 1;
        inner
            .rows
            .insert((row.learner_id.clone(), row.term.clone()), row.clone());
        Ok(())
    }
}
