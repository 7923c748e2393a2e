//! In-memory store for tests and `--memory` runs.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::models::{normalize_name, GameRecord};

use super::GameStore;

/// Insertion-ordered upsert map behind a mutex.
///
/// `set_available` / `set_failing` let tests simulate a dead or throwing
/// persistence layer without a separate mock type.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<GameRecord>>,
    unavailable: AtomicBool,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle `is_available` for fallback testing.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Make every subsequent `save` fail for fallback testing.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn is_available(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }

    async fn save(&self, records: &[GameRecord]) -> Result<Vec<GameRecord>, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated save failure".into()));
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store offline".into()));
        }

        let mut stored = self.records.lock().await;
        for record in records {
            let key = record.name_key();
            match stored.iter_mut().find(|r| r.name_key() == key) {
                Some(existing) => *existing = record.clone(),
                None => stored.push(record.clone()),
            }
        }
        Ok(records.to_vec())
    }

    async fn all(&self) -> Result<Vec<GameRecord>, StoreError> {
        Ok(self.records.lock().await.clone())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<GameRecord>, StoreError> {
        let key = normalize_name(name);
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .find(|r| r.name_key() == key)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_by_normalized_name() {
        let store = MemoryStore::new();

        let mut first = GameRecord::named("Alpha Casino");
        first.set_score(Some(7.0));
        store.save(&[first]).await.unwrap();

        let mut second = GameRecord::named("ALPHA CASINO ");
        second.set_score(Some(9.0));
        store.save(&[second]).await.unwrap();

        assert_eq!(store.len().await, 1);
        let found = store.find_by_name("alpha casino").await.unwrap().unwrap();
        assert_eq!(found.score, Some(9.0));
        // The replacement record's casing wins; the row count does not grow.
        assert_eq!(found.name, "ALPHA CASINO ");
    }

    #[tokio::test]
    async fn test_failure_simulation() {
        let store = MemoryStore::new();
        store.set_failing(true);
        let err = store.save(&[GameRecord::named("X Y")]).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        store.set_failing(false);
        store.set_available(false);
        assert!(!store.is_available().await);
    }
}
