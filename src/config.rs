//! Configuration for gamepulse.
//!
//! Settings load from a TOML file with env-friendly defaults. Game entries
//! are read-only input to the scrapers; the core never mutates them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::models::GameType;

/// Default navigation retry budget per scraper run.
pub const DEFAULT_NAVIGATION_RETRIES: u32 = 3;

/// Default per-attempt navigation timeout in seconds.
pub const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 30;

/// Default delay between navigation attempts in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_500;

/// How a game's page is turned into records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMode {
    /// Discover many candidates from a listing/lobby page.
    #[default]
    Listing,
    /// Produce exactly one record for this game, enriched with
    /// aggregated page statistics.
    Targeted,
}

/// Policy for score values above 10.
///
/// The upstream extractors disagreed on whether a bare "95" meant a
/// percentage or garbage, so the treatment is explicit per game rather
/// than one unified rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScorePolicy {
    /// Treat values in (10, 100] as out of 100: divide by 10, drop if
    /// still out of range.
    #[default]
    RescaleOutOfHundred,
    /// Drop any value above 10.
    DiscardOutOfRange,
}

/// Static configuration for one tracked game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Registry key, e.g. "crazy-time".
    pub key: String,
    /// Display name used for targeted records and fallback synthesis.
    pub name: String,
    /// Game category.
    #[serde(rename = "type", default)]
    pub game_type: GameType,
    /// Studio or operator behind the game.
    #[serde(default)]
    pub provider: Option<String>,
    /// Page to scrape.
    pub url: String,
    /// Known feature tags, used for fallback synthesis and as extraction
    /// vocabulary hints.
    #[serde(default)]
    pub features: Vec<String>,
    /// Keywords driving the keyword-scan discovery fallback.
    #[serde(default)]
    pub search_keywords: Vec<String>,
    #[serde(default)]
    pub mode: ExtractionMode,
    #[serde(default)]
    pub score_policy: ScorePolicy,
}

/// Recurring trigger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Five-field cron expression (minute hour day-of-month month day-of-week).
    #[serde(default = "default_cron")]
    pub cron: String,
    /// IANA timezone identifier.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Run one cycle immediately when the scheduler starts.
    #[serde(default)]
    pub run_on_init: bool,
}

fn default_cron() -> String {
    "*/30 * * * *".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
            timezone: default_timezone(),
            run_on_init: false,
        }
    }
}

/// Browser session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Run in headless mode (default: true).
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Per-attempt navigation timeout in seconds.
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,
    /// Navigation retry budget per run.
    #[serde(default = "default_navigation_retries")]
    pub navigation_retries: u32,
    /// Delay between navigation attempts in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Explicit Chrome executable path; discovered if unset.
    #[serde(default)]
    pub executable: Option<PathBuf>,
    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,
}

fn default_headless() -> bool {
    true
}

fn default_navigation_timeout() -> u64 {
    DEFAULT_NAVIGATION_TIMEOUT_SECS
}

fn default_navigation_retries() -> u32 {
    DEFAULT_NAVIGATION_RETRIES
}

fn default_retry_delay() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            navigation_timeout_secs: DEFAULT_NAVIGATION_TIMEOUT_SECS,
            navigation_retries: DEFAULT_NAVIGATION_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            executable: None,
            chrome_args: Vec::new(),
        }
    }
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite database path.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("gamepulse.db")
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Top-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub games: Vec<GameConfig>,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let settings: Settings = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(settings)
    }

    /// Load from a file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Find a game config by registry key.
    pub fn game(&self, key: &str) -> Option<&GameConfig> {
        self.games.iter().find(|g| g.key == key)
    }
}
