//! Game record models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of live casino game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameType {
    Roulette,
    Blackjack,
    Baccarat,
    Wheel,
    GameShow,
    Casino,
    #[default]
    Unknown,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Roulette => "roulette",
            Self::Blackjack => "blackjack",
            Self::Baccarat => "baccarat",
            Self::Wheel => "wheel",
            Self::GameShow => "game-show",
            Self::Casino => "casino",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "roulette" => Self::Roulette,
            "blackjack" => Self::Blackjack,
            "baccarat" => Self::Baccarat,
            "wheel" => Self::Wheel,
            "game-show" | "game_show" => Self::GameShow,
            "casino" => Self::Casino,
            _ => Self::Unknown,
        }
    }
}

/// Rating category derived from a 0-10 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Excellent,
    Good,
    Average,
    Poor,
}

impl Rating {
    /// Derive a rating category from a 0-10 score.
    pub fn from_score(score: f64) -> Self {
        if score >= 8.5 {
            Self::Excellent
        } else if score >= 7.0 {
            Self::Good
        } else if score >= 5.0 {
            Self::Average
        } else {
            Self::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Average => "average",
            Self::Poor => "poor",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "excellent" => Some(Self::Excellent),
            "good" => Some(Self::Good),
            "average" => Some(Self::Average),
            "poor" => Some(Self::Poor),
            _ => None,
        }
    }
}

/// One scraped or synthesized observation about a game.
///
/// The normalized name is the natural key: the store never holds two
/// records whose names normalize to the same value, and every write is
/// an upsert on that key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    /// Display name. Dedup key after normalization.
    pub name: String,
    /// Page the record was extracted from, if one was resolved.
    pub url: Option<String>,
    /// Game category.
    #[serde(rename = "type", default)]
    pub game_type: GameType,
    /// Studio or operator behind the game.
    pub provider: Option<String>,
    /// Score on a 0-10 scale after policy normalization.
    pub score: Option<f64>,
    /// Category derived from the score.
    pub rating: Option<Rating>,
    /// Short feature tags, bounded and case-insensitively deduped.
    #[serde(default)]
    pub features: Vec<String>,
    /// Open semi-structured statistics: multipliers, RTP, round counts,
    /// recent results, provenance.
    #[serde(default = "empty_stats")]
    pub stats: serde_json::Value,
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub mobile_compatible: bool,
    #[serde(default)]
    pub live_chat: bool,
    /// When this observation was made.
    pub scraped_at: DateTime<Utc>,
    /// True only on synthetic placeholder records.
    #[serde(default, skip_serializing_if = "is_false")]
    pub fallback_mode: bool,
}

fn empty_stats() -> serde_json::Value {
    serde_json::json!({})
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl GameRecord {
    /// Create a record with just a name; everything else defaults.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
            game_type: GameType::Unknown,
            provider: None,
            score: None,
            rating: None,
            features: Vec::new(),
            stats: empty_stats(),
            is_live: false,
            mobile_compatible: false,
            live_chat: false,
            scraped_at: Utc::now(),
            fallback_mode: false,
        }
    }

    /// Normalized dedup/upsert key for this record's name.
    pub fn name_key(&self) -> String {
        normalize_name(&self.name)
    }

    /// Set the score and keep the derived rating in sync.
    pub fn set_score(&mut self, score: Option<f64>) {
        self.score = score;
        self.rating = score.map(Rating::from_score);
    }
}

/// Normalize a game name for dedup: lowercase, trim, collapse whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Alpha Casino"), "alpha casino");
        assert_eq!(normalize_name("ALPHA  CASINO "), "alpha casino");
        assert_eq!(normalize_name("  Lightning\tRoulette\n"), "lightning roulette");
    }

    #[test]
    fn test_rating_from_score() {
        assert_eq!(Rating::from_score(9.2), Rating::Excellent);
        assert_eq!(Rating::from_score(7.0), Rating::Good);
        assert_eq!(Rating::from_score(5.5), Rating::Average);
        assert_eq!(Rating::from_score(2.0), Rating::Poor);
    }

    #[test]
    fn test_game_type_round_trip() {
        for t in [
            GameType::Roulette,
            GameType::GameShow,
            GameType::Casino,
            GameType::Unknown,
        ] {
            assert_eq!(GameType::from_str(t.as_str()), t);
        }
    }

    #[test]
    fn test_fallback_flag_serialized_only_when_set() {
        let mut record = GameRecord::named("Dream Catcher");
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("fallback_mode").is_none());

        record.fallback_mode = true;
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["fallback_mode"], serde_json::json!(true));
    }
}
