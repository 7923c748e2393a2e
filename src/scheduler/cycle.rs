//! Collection cycle fan-out.
//!
//! One cycle runs every registered game scraper concurrently, each in
//! its own task with its own browser session. Failures are isolated per
//! game: a navigation failure (or panic) in one scraper never aborts
//! its siblings, and results are aggregated only after all have
//! settled.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::scrapers::GameScraper;

/// Outcome of one game's scrape within a cycle.
#[derive(Debug, Clone)]
pub struct GameOutcome {
    pub key: String,
    /// Record count on success, error text on failure.
    pub result: Result<usize, String>,
}

/// Aggregate result of one fan-out, recorded after all scrapers settle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub outcomes: Vec<GameOutcome>,
}

impl CycleReport {
    pub fn records(&self) -> u64 {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|n| *n as u64)
            .sum()
    }

    pub fn succeeded(&self) -> u32 {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count() as u32
    }

    pub fn failed(&self) -> u32 {
        self.outcomes.iter().filter(|o| o.result.is_err()).count() as u32
    }
}

/// One unit of schedulable work. The scheduler only knows this trait,
/// so guard behavior is testable with stub tasks and simulated delays.
#[async_trait]
pub trait CycleTask: Send + Sync {
    async fn run(&self) -> CycleReport;
}

/// The production cycle: fan out over all game scrapers.
pub struct ScrapeCycle {
    scrapers: Vec<Arc<GameScraper>>,
}

impl ScrapeCycle {
    pub fn new(scrapers: Vec<GameScraper>) -> Self {
        Self {
            scrapers: scrapers.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.scrapers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scrapers.is_empty()
    }
}

#[async_trait]
impl CycleTask for ScrapeCycle {
    async fn run(&self) -> CycleReport {
        let handles: Vec<_> = self
            .scrapers
            .iter()
            .map(|scraper| {
                let scraper = scraper.clone();
                tokio::spawn(async move {
                    let result = scraper
                        .run()
                        .await
                        .map(|records| records.len())
                        .map_err(|e| e.to_string());
                    (scraper.key().to_string(), result)
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (handle, scraper) in handles.into_iter().zip(&self.scrapers) {
            match handle.await {
                Ok((key, result)) => {
                    if let Err(error) = &result {
                        warn!(game = %key, "scraper failed: {error}");
                    }
                    outcomes.push(GameOutcome { key, result });
                }
                Err(join_error) => {
                    // A panicking scraper is recorded like any other failure.
                    outcomes.push(GameOutcome {
                        key: scraper.key().to_string(),
                        result: Err(format!("scraper task panicked: {join_error}")),
                    });
                }
            }
        }

        debug!(
            succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count(),
            failed = outcomes.iter().filter(|o| o.result.is_err()).count(),
            "cycle fan-out settled"
        );
        CycleReport { outcomes }
    }
}
