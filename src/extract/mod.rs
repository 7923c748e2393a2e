//! Heuristic extraction pipeline.
//!
//! Turns a rendered page snapshot into zero or more normalized game
//! records. Listing mode discovers many candidates through cascading
//! structural strategies; targeted mode produces exactly one record for
//! a configured game, enriched with aggregated page statistics.

mod fields;
mod strategy;
pub mod stats;
pub mod vocab;

use std::collections::HashSet;

use chrono::Utc;
use scraper::{ElementRef, Html};
use tracing::debug;
use url::Url;

use crate::config::{ExtractionMode, GameConfig};
use crate::models::{normalize_name, GameRecord};

pub use strategy::Strategy;

/// Heuristic extractor for one game's page snapshot.
pub struct ExtractionPipeline<'a> {
    config: &'a GameConfig,
}

impl<'a> ExtractionPipeline<'a> {
    pub fn new(config: &'a GameConfig) -> Self {
        Self { config }
    }

    /// Extract records from the snapshot according to the game's mode.
    pub fn extract(&self, html: &str) -> Vec<GameRecord> {
        match self.config.mode {
            ExtractionMode::Listing => self.extract_listing(html),
            ExtractionMode::Targeted => self.extract_targeted(html),
        }
    }

    /// Many-candidate extraction with insertion-ordered dedup by name.
    fn extract_listing(&self, html: &str) -> Vec<GameRecord> {
        let doc = Html::parse_document(html);
        let origin = Url::parse(&self.config.url).ok();
        let (candidates, strategy) = strategy::discover(&doc, &self.config.search_keywords);

        debug!(
            game = %self.config.key,
            strategy = strategy.as_str(),
            candidates = candidates.len(),
            "candidate discovery"
        );

        let mut seen: HashSet<String> = HashSet::new();
        let mut records = Vec::new();
        for candidate in candidates {
            let Some(record) = self.candidate_record(candidate, origin.as_ref(), strategy) else {
                continue;
            };
            if seen.insert(record.name_key()) {
                records.push(record);
            }
        }
        records
    }

    /// Build a record from one candidate element; None when no usable
    /// name can be extracted.
    fn candidate_record(
        &self,
        el: ElementRef,
        origin: Option<&Url>,
        strategy: Strategy,
    ) -> Option<GameRecord> {
        let name = fields::extract_name(el)?;
        if normalize_name(&name).is_empty() {
            return None;
        }
        let text = fields::element_text(el);
        let text_lc = text.to_lowercase();

        let mut record = GameRecord::named(name);
        record.url = fields::extract_url(el, origin);
        record.game_type = fields::detect_game_type(&text).unwrap_or(self.config.game_type);
        record.provider = fields::detect_provider(&text).or_else(|| self.config.provider.clone());
        record.set_score(fields::extract_score(&text, self.config.score_policy));
        record.features = fields::extract_features(el, &text);
        record.is_live = text_lc.contains("live");
        record.mobile_compatible =
            ["mobile", "ios", "android"].iter().any(|k| text_lc.contains(k));
        record.live_chat = text_lc.contains("chat");
        record.scraped_at = Utc::now();

        let mut stats = stats::extract_stats(&text);
        for (key, vocab_list) in [
            ("payment_methods", vocab::PAYMENT_METHODS),
            ("licenses", vocab::LICENSES),
            ("languages", vocab::LANGUAGES),
            ("currencies", vocab::CURRENCIES),
        ] {
            let found = vocab::merge_capped([vocab::matches_in_text(&text, vocab_list)]);
            if !found.is_empty() {
                stats.insert(key.to_string(), found.into());
            }
        }
        stats.insert("strategy".to_string(), strategy.as_str().into());
        record.stats = stats.into();

        Some(record)
    }

    /// Single targeted record for the configured game, enriched with
    /// statistics aggregated over the whole page.
    fn extract_targeted(&self, html: &str) -> Vec<GameRecord> {
        let doc = Html::parse_document(html);
        let text = doc
            .root_element()
            .text()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" ");

        // A targeted page that mentions neither the game nor any keyword
        // gave us nothing to aggregate; report no candidates.
        let text_lc = text.to_lowercase();
        let name_lc = self.config.name.to_lowercase();
        let mentioned = text_lc.contains(&name_lc)
            || self
                .config
                .search_keywords
                .iter()
                .any(|k| text_lc.contains(&k.to_lowercase()));
        if !mentioned {
            debug!(game = %self.config.key, "targeted page does not mention the game");
            return Vec::new();
        }

        let mut record = GameRecord::named(self.config.name.clone());
        record.url = Some(self.config.url.clone());
        record.game_type = self.config.game_type;
        record.provider = self
            .config
            .provider
            .clone()
            .or_else(|| fields::detect_provider(&text));
        record.set_score(fields::extract_score(&text, self.config.score_policy));
        record.features = vocab::merge_capped([
            self.config.features.clone(),
            vocab::matches_in_text(&text, vocab::FEATURES),
        ]);
        record.is_live = true;
        record.mobile_compatible =
            ["mobile", "ios", "android"].iter().any(|k| text_lc.contains(k));
        record.live_chat = text_lc.contains("chat");
        record.scraped_at = Utc::now();

        let mut stats = stats::extract_stats(&text);
        let recent = stats::recent_results(&text, 20);
        if !recent.is_empty() {
            stats.insert("recent_results".to_string(), recent.into());
        }
        stats.insert("strategy".to_string(), "targeted".into());
        record.stats = stats.into();

        vec![record]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScorePolicy;
    use crate::models::GameType;

    fn listing_config() -> GameConfig {
        GameConfig {
            key: "lobby".into(),
            name: "Live Lobby".into(),
            game_type: GameType::Casino,
            provider: None,
            url: "https://example.com/live".into(),
            features: Vec::new(),
            search_keywords: vec!["casino".into(), "roulette".into()],
            mode: ExtractionMode::Listing,
            score_policy: ScorePolicy::RescaleOutOfHundred,
        }
    }

    #[test]
    fn test_listing_dedup_is_case_and_whitespace_insensitive() {
        let html = r#"
            <html><body>
              <article><h3>Alpha Casino</h3><p>Live roulette, score 8/10</p></article>
              <article><h3>ALPHA CASINO </h3><p>Duplicate listing</p></article>
              <article><h3>Beta Casino</h3></article>
            </body></html>
        "#;
        let config = listing_config();
        let records = ExtractionPipeline::new(&config).extract(html);
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha Casino", "Beta Casino"]);
    }

    #[test]
    fn test_listing_fields() {
        let html = r#"
            <html><body>
              <div class="game-card">
                <h3>Lightning Roulette</h3>
                <a class="play-btn" href="/games/lightning">Play now</a>
                <p>Live dealer roulette by Evolution. RTP 97.3%. Rated 9/10. Mobile ready, chat included.</p>
              </div>
            </body></html>
        "#;
        let config = listing_config();
        let records = ExtractionPipeline::new(&config).extract(html);
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.name, "Lightning Roulette");
        assert_eq!(
            record.url.as_deref(),
            Some("https://example.com/games/lightning")
        );
        assert_eq!(record.game_type, GameType::Roulette);
        assert_eq!(record.provider.as_deref(), Some("Evolution"));
        assert_eq!(record.score, Some(9.0));
        assert!(record.is_live);
        assert!(record.mobile_compatible);
        assert!(record.live_chat);
        assert_eq!(record.stats["rtp"], serde_json::json!(97.3));
    }

    #[test]
    fn test_empty_page_yields_no_candidates() {
        let html = "<html><body><p>nothing to see here at all</p></body></html>";
        let config = listing_config();
        let records = ExtractionPipeline::new(&config).extract(html);
        assert!(records.is_empty());
    }

    #[test]
    fn test_targeted_single_enriched_record() {
        let config = GameConfig {
            key: "crazy-time".into(),
            name: "Crazy Time".into(),
            game_type: GameType::GameShow,
            provider: Some("Evolution".into()),
            url: "https://example.com/crazy-time".into(),
            features: vec!["bonus rounds".into()],
            search_keywords: vec!["crazy time".into()],
            mode: ExtractionMode::Targeted,
            score_policy: ScorePolicy::RescaleOutOfHundred,
        };
        let html = r#"
            <html><body>
              <h1>Crazy Time</h1>
              <p>RTP 96.08%. Max multiplier 160x today. Recent rounds: 2x 5x 25x.</p>
            </body></html>
        "#;
        let records = ExtractionPipeline::new(&config).extract(html);
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.name, "Crazy Time");
        assert_eq!(record.game_type, GameType::GameShow);
        assert_eq!(record.stats["rtp"], serde_json::json!(96.08));
        assert_eq!(record.stats["max_multiplier"], serde_json::json!(160.0));
        assert!(record.stats["recent_results"].as_array().unwrap().len() >= 3);
        assert!(record.features.contains(&"bonus rounds".to_string()));
    }
}
