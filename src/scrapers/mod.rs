//! Game scrapers.
//!
//! A scraper owns one browser session's lifecycle per run: acquire,
//! navigate with retries, extract, persist-or-fallback, release. Only
//! navigation exhaustion (or failing to acquire a session at all) fails
//! a run; every other path converges to a usable record list.

mod registry;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::browser::{PageSession, SessionProvider};
use crate::config::{BrowserSettings, GameConfig};
use crate::error::ScrapeError;
use crate::extract::ExtractionPipeline;
use crate::models::{GameRecord, Rating};
use crate::repository::GameStore;

pub use registry::{ScraperBuilder, ScraperRegistry};

/// Scraper for one configured game.
pub struct GameScraper {
    config: GameConfig,
    retries: u32,
    attempt_timeout: Duration,
    retry_delay: Duration,
    sessions: Arc<dyn SessionProvider>,
    store: Arc<dyn GameStore>,
}

impl std::fmt::Debug for GameScraper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameScraper")
            .field("config", &self.config)
            .field("retries", &self.retries)
            .field("attempt_timeout", &self.attempt_timeout)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

impl GameScraper {
    pub fn new(
        config: GameConfig,
        browser: &BrowserSettings,
        sessions: Arc<dyn SessionProvider>,
        store: Arc<dyn GameStore>,
    ) -> Self {
        Self {
            config,
            retries: browser.navigation_retries.max(1),
            attempt_timeout: Duration::from_secs(browser.navigation_timeout_secs),
            retry_delay: Duration::from_millis(browser.retry_delay_ms),
            sessions,
            store,
        }
    }

    /// Registry key of the game this scraper covers.
    pub fn key(&self) -> &str {
        &self.config.key
    }

    /// Run one full scrape: acquire a session, navigate, extract,
    /// persist-or-fallback, release.
    ///
    /// The session is released on every exit path; close failures are
    /// logged inside the session and never re-thrown.
    pub async fn run(&self) -> Result<Vec<GameRecord>, ScrapeError> {
        debug!(game = %self.config.key, url = %self.config.url, "starting scrape");

        let mut session = self
            .sessions
            .open()
            .await
            .map_err(|e| ScrapeError::Session(e.to_string()))?;

        let result = self.run_with_session(session.as_mut()).await;
        session.close().await;

        if let Ok(records) = &result {
            info!(
                game = %self.config.key,
                records = records.len(),
                fallback = records.iter().any(|r| r.fallback_mode),
                "scrape finished"
            );
        }
        result
    }

    async fn run_with_session(
        &self,
        session: &mut dyn PageSession,
    ) -> Result<Vec<GameRecord>, ScrapeError> {
        self.navigate(session).await?;

        // A content-read failure after successful navigation degrades to
        // an empty snapshot and routes into fallback.
        let html = match session.content().await {
            Ok(html) => html,
            Err(e) => {
                warn!(game = %self.config.key, "failed to read page content: {e}");
                String::new()
            }
        };

        let records = ExtractionPipeline::new(&self.config).extract(&html);
        Ok(self.persist_or_fallback(records).await)
    }

    /// Attempt navigation up to the retry budget. Each attempt is
    /// time-boxed; a short delay separates attempts. Exhaustion is the
    /// only terminal failure of a run.
    async fn navigate(&self, session: &mut dyn PageSession) -> Result<(), ScrapeError> {
        let mut last_error = String::new();

        for attempt in 1..=self.retries {
            match tokio::time::timeout(self.attempt_timeout, session.goto(&self.config.url)).await
            {
                Ok(Ok(())) => {
                    debug!(game = %self.config.key, attempt, "navigation succeeded");
                    return Ok(());
                }
                Ok(Err(e)) => {
                    last_error = e.to_string();
                    warn!(
                        game = %self.config.key,
                        attempt,
                        retries = self.retries,
                        "navigation attempt failed: {last_error}"
                    );
                }
                Err(_) => {
                    last_error = format!(
                        "attempt timed out after {}s",
                        self.attempt_timeout.as_secs()
                    );
                    warn!(game = %self.config.key, attempt, retries = self.retries, "{last_error}");
                }
            }

            if attempt < self.retries {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        Err(ScrapeError::NavigationFailure {
            url: self.config.url.clone(),
            attempts: self.retries,
            last_error,
        })
    }

    /// Persist extracted records, degrading to synthetic placeholders.
    ///
    /// Never propagates a store failure and never returns an empty list:
    /// "no data collected" becomes flagged synthetic data rather than a
    /// silent nothing.
    async fn persist_or_fallback(&self, records: Vec<GameRecord>) -> Vec<GameRecord> {
        if records.is_empty() {
            debug!(game = %self.config.key, "extraction empty, synthesizing fallback data");
            let synthetic = self.synthesize_placeholders();
            // Best effort: keep the store populated even in fallback.
            if self.store.is_available().await {
                if let Err(e) = self.store.save(&synthetic).await {
                    warn!(game = %self.config.key, "failed to persist fallback records: {e}");
                }
            }
            return synthetic;
        }

        if !self.store.is_available().await {
            warn!(game = %self.config.key, "store unavailable, returning records in fallback mode");
            return mark_fallback(records);
        }

        match self.store.save(&records).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!(game = %self.config.key, "persist failed, returning records in fallback mode: {e}");
                mark_fallback(records)
            }
        }
    }

    /// Synthesize 1-2 timestamped placeholder records from the game's
    /// static configuration with plausible randomized statistics.
    fn synthesize_placeholders(&self) -> Vec<GameRecord> {
        let mut rng = rand::thread_rng();

        let mut primary = self.placeholder(&self.config.name, &mut rng);
        primary.url = Some(self.config.url.clone());

        let mut records = vec![primary];
        if rng.gen_bool(0.5) {
            let name = format!("{} Lobby", self.config.name);
            records.push(self.placeholder(&name, &mut rng));
        }
        records
    }

    fn placeholder(&self, name: &str, rng: &mut impl Rng) -> GameRecord {
        let score = (rng.gen_range(6.0..9.5_f64) * 10.0).round() / 10.0;
        let mut record = GameRecord::named(name);
        record.game_type = self.config.game_type;
        record.provider = self.config.provider.clone();
        record.score = Some(score);
        record.rating = Some(Rating::from_score(score));
        record.features = self.config.features.clone();
        record.stats = serde_json::json!({
            "rtp": (rng.gen_range(92.0..97.5_f64) * 100.0).round() / 100.0,
            "rounds_per_hour": rng.gen_range(40..70),
            "synthetic": true,
        });
        record.is_live = true;
        record.mobile_compatible = true;
        record.scraped_at = Utc::now();
        record.fallback_mode = true;
        record
    }
}

fn mark_fallback(records: Vec<GameRecord>) -> Vec<GameRecord> {
    records
        .into_iter()
        .map(|mut record| {
            record.fallback_mode = true;
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, Ordering};

    use anyhow::Result;
    use async_trait::async_trait;

    use crate::config::{ExtractionMode, ScorePolicy};
    use crate::models::GameType;
    use crate::repository::MemoryStore;

    /// Stub session: fails the first `fail_first` navigations, then
    /// serves the given HTML.
    struct StubSession {
        html: String,
        fail_first: u32,
        attempts: Arc<AtomicU32>,
    }

    #[async_trait]
    impl PageSession for StubSession {
        async fn goto(&mut self, _url: &str) -> Result<()> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.fail_first {
                anyhow::bail!("connection refused");
            }
            Ok(())
        }

        async fn content(&mut self) -> Result<String> {
            Ok(self.html.clone())
        }

        async fn close(&mut self) {}
    }

    struct StubProvider {
        html: String,
        fail_first: u32,
        attempts: Arc<AtomicU32>,
    }

    #[async_trait]
    impl SessionProvider for StubProvider {
        async fn open(&self) -> Result<Box<dyn PageSession>> {
            Ok(Box::new(StubSession {
                html: self.html.clone(),
                fail_first: self.fail_first,
                attempts: self.attempts.clone(),
            }))
        }
    }

    fn game_config() -> GameConfig {
        GameConfig {
            key: "demo".into(),
            name: "Demo Wheel".into(),
            game_type: GameType::Wheel,
            provider: Some("Evolution".into()),
            url: "https://example.com/demo".into(),
            features: vec!["multiplier".into()],
            search_keywords: vec!["demo wheel".into()],
            mode: ExtractionMode::Listing,
            score_policy: ScorePolicy::RescaleOutOfHundred,
        }
    }

    fn scraper_with(
        html: &str,
        fail_first: u32,
        store: Arc<MemoryStore>,
    ) -> (GameScraper, Arc<AtomicU32>) {
        let attempts = Arc::new(AtomicU32::new(0));
        let provider = StubProvider {
            html: html.to_string(),
            fail_first,
            attempts: attempts.clone(),
        };
        let browser = BrowserSettings {
            retry_delay_ms: 1,
            ..Default::default()
        };
        let scraper = GameScraper::new(game_config(), &browser, Arc::new(provider), store);
        (scraper, attempts)
    }

    const LOBBY_HTML: &str = r#"
        <html><body>
          <article><h3>Demo Wheel</h3><p>Live wheel with multipliers, rated 8/10</p></article>
        </body></html>
    "#;

    #[tokio::test]
    async fn test_first_try_success_attempts_once() {
        let store = Arc::new(MemoryStore::new());
        let (scraper, attempts) = scraper_with(LOBBY_HTML, 0, store.clone());

        let records = scraper.run().await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(records.len(), 1);
        assert!(!records[0].fallback_mode);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_navigation_retries_then_fails() {
        let store = Arc::new(MemoryStore::new());
        // More failures than the default budget of 3.
        let (scraper, attempts) = scraper_with(LOBBY_HTML, 10, store.clone());

        let err = scraper.run().await.unwrap_err();
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        match err {
            ScrapeError::NavigationFailure { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected NavigationFailure, got {other:?}"),
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_navigation_recovers_within_budget() {
        let store = Arc::new(MemoryStore::new());
        let (scraper, attempts) = scraper_with(LOBBY_HTML, 2, store);

        let records = scraper.run().await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_extraction_synthesizes_placeholders() {
        let store = Arc::new(MemoryStore::new());
        let (scraper, _) = scraper_with("<html><body></body></html>", 0, store.clone());

        let records = scraper.run().await.unwrap();
        assert!(!records.is_empty());
        assert!(records.len() <= 2);
        for record in &records {
            assert!(record.fallback_mode);
            assert_eq!(record.game_type, GameType::Wheel);
        }
        // Best-effort persistence of the synthetic records happened too.
        assert!(!store.is_empty().await);
    }

    #[tokio::test]
    async fn test_persistence_failure_marks_fallback_without_error() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let (scraper, _) = scraper_with(LOBBY_HTML, 0, store);

        let records = scraper.run().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Demo Wheel");
        assert!(records[0].fallback_mode);
    }

    #[tokio::test]
    async fn test_unavailable_store_marks_fallback() {
        let store = Arc::new(MemoryStore::new());
        store.set_available(false);
        let (scraper, _) = scraper_with(LOBBY_HTML, 0, store);

        let records = scraper.run().await.unwrap();
        assert!(records[0].fallback_mode);
    }
}
