//! End-to-end cycle scenarios over stubbed browser sessions.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use gamepulse::browser::{PageSession, SessionProvider};
use gamepulse::config::{
    BrowserSettings, ExtractionMode, GameConfig, ScheduleConfig, ScorePolicy,
};
use gamepulse::models::{GameType, TaskStatus};
use gamepulse::repository::{GameStore, MemoryStore};
use gamepulse::scheduler::{ScrapeCycle, TaskScheduler};
use gamepulse::scrapers::GameScraper;

/// Serves canned HTML per URL; URLs without an entry fail navigation.
struct FakeLobby {
    pages: HashMap<String, String>,
}

struct FakePage {
    pages: HashMap<String, String>,
    current: Option<String>,
}

#[async_trait]
impl SessionProvider for FakeLobby {
    async fn open(&self) -> Result<Box<dyn PageSession>> {
        Ok(Box::new(FakePage {
            pages: self.pages.clone(),
            current: None,
        }))
    }
}

#[async_trait]
impl PageSession for FakePage {
    async fn goto(&mut self, url: &str) -> Result<()> {
        match self.pages.get(url) {
            Some(html) => {
                self.current = Some(html.clone());
                Ok(())
            }
            None => anyhow::bail!("connection refused"),
        }
    }

    async fn content(&mut self) -> Result<String> {
        Ok(self.current.clone().unwrap_or_default())
    }

    async fn close(&mut self) {}
}

fn game(key: &str, url: &str) -> GameConfig {
    GameConfig {
        key: key.into(),
        name: key.into(),
        game_type: GameType::Casino,
        provider: None,
        url: url.into(),
        features: Vec::new(),
        search_keywords: vec!["casino".into()],
        mode: ExtractionMode::Listing,
        score_policy: ScorePolicy::RescaleOutOfHundred,
    }
}

fn browser_settings() -> BrowserSettings {
    BrowserSettings {
        retry_delay_ms: 1,
        ..Default::default()
    }
}

const ALPHA_HTML: &str = r#"
    <html><body>
      <article><h3>Alpha Casino</h3><p>Live casino tables, rated 9/10</p></article>
    </body></html>
"#;

fn fan_out(store: Arc<MemoryStore>, pages: HashMap<String, String>) -> ScrapeCycle {
    let sessions = Arc::new(FakeLobby { pages });
    let browser = browser_settings();
    let scrapers = vec![
        GameScraper::new(
            game("alpha", "http://lobby/alpha"),
            &browser,
            sessions.clone(),
            store.clone(),
        ),
        GameScraper::new(
            game("beta", "http://unreachable/"),
            &browser,
            sessions,
            store,
        ),
    ];
    ScrapeCycle::new(scrapers)
}

#[tokio::test]
async fn partial_failure_cycle_records_both_outcomes() {
    let store = Arc::new(MemoryStore::new());
    let mut pages = HashMap::new();
    pages.insert("http://lobby/alpha".to_string(), ALPHA_HTML.to_string());

    let cycle = fan_out(store.clone(), pages);
    let scheduler = TaskScheduler::new(Arc::new(cycle)).await.unwrap();

    let run = scheduler.run_once("game-collection").await.expect("cycle ran");

    // One scraper succeeded, one exhausted its navigation budget; the
    // cycle is a partial success, not a full failure.
    assert_eq!(run.status, TaskStatus::Success);
    assert_eq!(run.succeeded_jobs, 1);
    assert_eq!(run.failed_jobs, 1);
    assert!(run.error.is_some());

    // The failure was isolated: alpha's record landed in the store.
    let stored = store.all().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "Alpha Casino");
    assert!(!stored[0].fallback_mode);

    // The guard is released after the cycle.
    assert!(!scheduler.executor().is_running());
}

#[tokio::test]
async fn all_failed_cycle_is_error_and_guard_resets() {
    let store = Arc::new(MemoryStore::new());
    let cycle = fan_out(store.clone(), HashMap::new());
    let scheduler = TaskScheduler::new(Arc::new(cycle)).await.unwrap();

    let run = scheduler.run_once("game-collection").await.expect("cycle ran");
    assert_eq!(run.status, TaskStatus::Error);
    assert_eq!(run.succeeded_jobs, 0);
    assert_eq!(run.failed_jobs, 2);
    assert!(store.all().await.unwrap().is_empty());
    assert!(!scheduler.executor().is_running());

    // The scheduler is not deadlocked: the next trigger runs.
    assert!(scheduler.run_once("game-collection").await.is_some());
}

#[tokio::test]
async fn empty_lobby_synthesizes_flagged_records() {
    let store = Arc::new(MemoryStore::new());
    let mut pages = HashMap::new();
    pages.insert(
        "http://lobby/alpha".to_string(),
        "<html><body><p>maintenance tonight</p></body></html>".to_string(),
    );
    pages.insert(
        "http://unreachable/".to_string(),
        "<html><body><p>maintenance tonight</p></body></html>".to_string(),
    );

    let cycle = fan_out(store.clone(), pages);
    let scheduler = TaskScheduler::new(Arc::new(cycle)).await.unwrap();
    let run = scheduler.run_once("game-collection").await.expect("cycle ran");

    assert_eq!(run.status, TaskStatus::Success);
    assert!(run.processed_items >= 2, "each game yields 1-2 placeholders");

    // Everything that came back is explicitly flagged synthetic.
    let stored = store.all().await.unwrap();
    assert!(!stored.is_empty());
    assert!(stored.iter().all(|r| r.fallback_mode));
}

#[tokio::test]
async fn job_registration_survives_replacement_and_stop() {
    let store = Arc::new(MemoryStore::new());
    let cycle = fan_out(store, HashMap::new());
    let scheduler = TaskScheduler::new(Arc::new(cycle)).await.unwrap();

    let trigger = ScheduleConfig {
        cron: "*/15 * * * *".into(),
        timezone: "Europe/Berlin".into(),
        run_on_init: false,
    };
    scheduler.create_job("game-collection", &trigger).await.unwrap();
    scheduler.create_job("game-collection", &trigger).await.unwrap();

    let status = scheduler.status().await;
    assert_eq!(status.jobs.len(), 1);
    assert_eq!(status.jobs["game-collection"].timezone, "Europe/Berlin");
    assert!(!status.is_running);

    scheduler.stop_all().await;
    assert!(scheduler.status().await.jobs.is_empty());
    scheduler.shutdown().await;
}
