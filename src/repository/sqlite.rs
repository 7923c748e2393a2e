//! SQLite-backed game store.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;
use crate::models::{normalize_name, GameRecord, GameType, Rating};

use super::GameStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS game_records (
    name_key          TEXT PRIMARY KEY,
    name              TEXT NOT NULL,
    url               TEXT,
    game_type         TEXT NOT NULL,
    provider          TEXT,
    score             REAL,
    rating            TEXT,
    features          TEXT NOT NULL DEFAULT '[]',
    stats             TEXT NOT NULL DEFAULT '{}',
    is_live           INTEGER NOT NULL DEFAULT 0,
    mobile_compatible INTEGER NOT NULL DEFAULT 0,
    live_chat         INTEGER NOT NULL DEFAULT 0,
    scraped_at        TEXT NOT NULL,
    fallback_mode     INTEGER NOT NULL DEFAULT 0
);
";

/// Game store on a SQLite database. One row per normalized name;
/// every save is an upsert on that key.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (and initialize) a store at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        debug!(path = %path.display(), "opening game store");
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<GameRecord> {
        let features: String = row.get("features")?;
        let stats: String = row.get("stats")?;
        let scraped_at: String = row.get("scraped_at")?;
        let game_type: String = row.get("game_type")?;
        let rating: Option<String> = row.get("rating")?;

        Ok(GameRecord {
            name: row.get("name")?,
            url: row.get("url")?,
            game_type: GameType::from_str(&game_type),
            provider: row.get("provider")?,
            score: row.get("score")?,
            rating: rating.as_deref().and_then(Rating::from_str),
            features: serde_json::from_str(&features).unwrap_or_default(),
            stats: serde_json::from_str(&stats)
                .unwrap_or_else(|_| serde_json::json!({})),
            is_live: row.get("is_live")?,
            mobile_compatible: row.get("mobile_compatible")?,
            live_chat: row.get("live_chat")?,
            scraped_at: DateTime::parse_from_rfc3339(&scraped_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            fallback_mode: row.get("fallback_mode")?,
        })
    }
}

#[async_trait]
impl GameStore for SqliteStore {
    async fn is_available(&self) -> bool {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT 1", [], |_| Ok(())).is_ok()
    }

    async fn save(&self, records: &[GameRecord]) -> Result<Vec<GameRecord>, StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        for record in records {
            tx.execute(
                "INSERT OR REPLACE INTO game_records
                 (name_key, name, url, game_type, provider, score, rating,
                  features, stats, is_live, mobile_compatible, live_chat,
                  scraped_at, fallback_mode)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    record.name_key(),
                    record.name,
                    record.url,
                    record.game_type.as_str(),
                    record.provider,
                    record.score,
                    record.rating.map(|r| r.as_str()),
                    serde_json::to_string(&record.features)?,
                    serde_json::to_string(&record.stats)?,
                    record.is_live,
                    record.mobile_compatible,
                    record.live_chat,
                    record.scraped_at.to_rfc3339(),
                    record.fallback_mode,
                ],
            )?;
        }
        tx.commit()?;
        Ok(records.to_vec())
    }

    async fn all(&self) -> Result<Vec<GameRecord>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT * FROM game_records ORDER BY name_key")?;
        let rows = stmt.query_map([], Self::row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<GameRecord>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT * FROM game_records WHERE name_key = ?1")?;
        let mut rows = stmt.query_map(params![normalize_name(name)], Self::row_to_record)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_keeps_one_row_per_name() {
        let store = SqliteStore::open_in_memory().unwrap();

        let mut first = GameRecord::named("Crazy Time");
        first.set_score(Some(8.0));
        store.save(&[first]).await.unwrap();

        let mut second = GameRecord::named("  CRAZY  TIME ");
        second.set_score(Some(9.5));
        second.fallback_mode = true;
        store.save(&[second]).await.unwrap();

        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].score, Some(9.5));
        assert!(all[0].fallback_mode);
    }

    #[tokio::test]
    async fn test_round_trip_preserves_fields() {
        let store = SqliteStore::open_in_memory().unwrap();

        let mut record = GameRecord::named("Lightning Roulette");
        record.url = Some("https://example.com/lightning".into());
        record.game_type = GameType::Roulette;
        record.provider = Some("Evolution".into());
        record.set_score(Some(9.0));
        record.features = vec!["multiplier".into(), "live dealer".into()];
        record.stats = serde_json::json!({"rtp": 97.3, "max_multiplier": 500.0});
        record.is_live = true;
        store.save(&[record]).await.unwrap();

        let found = store
            .find_by_name("lightning roulette")
            .await
            .unwrap()
            .expect("record stored");
        assert_eq!(found.game_type, GameType::Roulette);
        assert_eq!(found.rating, Some(Rating::Excellent));
        assert_eq!(found.stats["rtp"], serde_json::json!(97.3));
        assert!(found.is_live);
        assert!(!found.fallback_mode);
    }

    #[tokio::test]
    async fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("test.db")).unwrap();
        assert!(store.is_available().await);
        assert!(store.all().await.unwrap().is_empty());
    }
}
