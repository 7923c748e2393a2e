//! Game record persistence.
//!
//! All writes are upserts keyed on the normalized game name, so
//! concurrent scrapers merge rather than corrupt state. Store failures
//! never cross a scraper's `run()` boundary; callers route them into
//! fallback synthesis.

mod memory;
mod sqlite;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::GameRecord;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Persistence interface consumed by scrapers.
///
/// `is_available() == false` and a `save` error are equivalent fallback
/// triggers for callers.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Whether the store can currently accept writes.
    async fn is_available(&self) -> bool;

    /// Upsert records by normalized name and return what was persisted.
    async fn save(&self, records: &[GameRecord]) -> Result<Vec<GameRecord>, StoreError>;

    /// All stored records.
    async fn all(&self) -> Result<Vec<GameRecord>, StoreError>;

    /// Look up one record by (normalized) name.
    async fn find_by_name(&self, name: &str) -> Result<Option<GameRecord>, StoreError>;
}
