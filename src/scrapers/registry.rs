//! Scraper registry.
//!
//! Maps a game key to a scraper constructor so outer layers can build
//! scrapers by key and extend the set at runtime.

use std::collections::HashMap;
use std::sync::Arc;

use crate::browser::SessionProvider;
use crate::config::{BrowserSettings, GameConfig};
use crate::error::ScrapeError;
use crate::repository::GameStore;

use super::GameScraper;

/// Constructor for a game scraper.
pub type ScraperBuilder = Arc<
    dyn Fn(GameConfig, &BrowserSettings, Arc<dyn SessionProvider>, Arc<dyn GameStore>) -> GameScraper
        + Send
        + Sync,
>;

/// Registry of scraper constructors keyed by game key.
#[derive(Default)]
pub struct ScraperRegistry {
    builders: HashMap<String, ScraperBuilder>,
}

impl ScraperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the standard constructor for every
    /// given game. The game's own `mode` decides listing vs. targeted
    /// extraction, so one constructor covers both.
    pub fn with_games(games: &[GameConfig]) -> Self {
        let mut registry = Self::new();
        for game in games {
            registry.register(&game.key, Arc::new(GameScraper::new));
        }
        registry
    }

    /// Register a constructor. Re-registering a key replaces the prior
    /// builder.
    pub fn register(&mut self, key: &str, builder: ScraperBuilder) {
        self.builders.insert(key.to_string(), builder);
    }

    /// Remove a constructor; returns whether it existed.
    pub fn unregister(&mut self, key: &str) -> bool {
        self.builders.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.builders.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }

    /// Instantiate a scraper for the key. Unknown keys fail with
    /// `NotSupported`, fatal only to this call.
    pub fn create(
        &self,
        key: &str,
        config: GameConfig,
        browser: &BrowserSettings,
        sessions: Arc<dyn SessionProvider>,
        store: Arc<dyn GameStore>,
    ) -> Result<GameScraper, ScrapeError> {
        let builder = self
            .builders
            .get(key)
            .ok_or_else(|| ScrapeError::NotSupported(key.to_string()))?;
        Ok(builder(config, browser, sessions, store))
    }
}
