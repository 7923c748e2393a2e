//! Context-aware numeric statistics extraction.
//!
//! Each statistic is matched by a keyword-adjacent number pattern and
//! filtered through a per-field plausibility range. Out-of-range values
//! are dropped silently.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Plausibility range for RTP percentages.
pub const RTP_RANGE: (f64, f64) = (85.0, 100.0);
/// Plausibility range for win multipliers.
pub const MULTIPLIER_RANGE: (f64, f64) = (2.0, 10_000.0);
/// Plausibility range for rounds per hour.
pub const ROUNDS_RANGE: (f64, f64) = (10.0, 1_000.0);
/// Plausibility range for max win amounts.
pub const MAX_WIN_RANGE: (f64, f64) = (100.0, 10_000_000.0);
/// Plausibility range for bonus frequency percentages.
pub const BONUS_FREQUENCY_RANGE: (f64, f64) = (0.0, 100.0);

static RTP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)rtp[^0-9%]{0,12}(\d{2,3}(?:\.\d+)?)\s*%?").unwrap()
});

static MULTIPLIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:max(?:imum)?\s+multiplier|multiplier|up\s+to)[^0-9]{0,12}(\d[\d,]{0,6})\s*x").unwrap()
});

static ROUNDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:rounds?|games?|spins?)\s+per\s+hour[^0-9]{0,12}(\d{1,4})").unwrap()
});

static MAX_WIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)max(?:imum)?\s+win[^0-9]{0,16}(\d[\d,]{0,10}(?:\.\d+)?)").unwrap()
});

static BONUS_FREQUENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)bonus\s+(?:frequency|rate|chance)[^0-9]{0,12}(\d{1,2}(?:\.\d+)?)\s*%").unwrap()
});

/// Bare "123x" occurrences, used for recent-results lists.
static RESULT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d,]{0,5}(?:\.\d+)?)\s*[xX]\b").unwrap());

fn parse_number(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok()
}

fn in_range(value: f64, (min, max): (f64, f64)) -> bool {
    value >= min && value <= max
}

fn capture_stat(re: &Regex, text: &str, range: (f64, f64)) -> Option<f64> {
    let value = parse_number(re.captures(text)?.get(1)?.as_str())?;
    in_range(value, range).then_some(value)
}

/// Extract every plausible statistic found in the text.
///
/// Keys: `rtp`, `max_multiplier`, `rounds_per_hour`, `max_win`,
/// `bonus_frequency`. Absent keys mean nothing plausible matched.
pub fn extract_stats(text: &str) -> Map<String, Value> {
    let mut stats = Map::new();

    if let Some(rtp) = capture_stat(&RTP_RE, text, RTP_RANGE) {
        stats.insert("rtp".to_string(), rtp.into());
    }
    if let Some(multiplier) = capture_stat(&MULTIPLIER_RE, text, MULTIPLIER_RANGE) {
        stats.insert("max_multiplier".to_string(), multiplier.into());
    }
    if let Some(rounds) = capture_stat(&ROUNDS_RE, text, ROUNDS_RANGE) {
        stats.insert("rounds_per_hour".to_string(), rounds.into());
    }
    if let Some(max_win) = capture_stat(&MAX_WIN_RE, text, MAX_WIN_RANGE) {
        stats.insert("max_win".to_string(), max_win.into());
    }
    if let Some(freq) = capture_stat(&BONUS_FREQUENCY_RE, text, BONUS_FREQUENCY_RANGE) {
        stats.insert("bonus_frequency".to_string(), freq.into());
    }

    stats
}

/// Collect recent round results (multiplier values) from the text, most
/// recent first as they appear, bounded by `limit`.
pub fn recent_results(text: &str, limit: usize) -> Vec<f64> {
    RESULT_RE
        .captures_iter(text)
        .filter_map(|c| parse_number(c.get(1)?.as_str()))
        .filter(|v| in_range(*v, MULTIPLIER_RANGE))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rtp_plausibility() {
        let stats = extract_stats("This game has an RTP of 96.5% overall");
        assert_eq!(stats.get("rtp").and_then(Value::as_f64), Some(96.5));

        // Implausible RTP is dropped, not clamped.
        let stats = extract_stats("RTP: 150%");
        assert!(stats.get("rtp").is_none());
    }

    #[test]
    fn test_multiplier_with_thousands_separator() {
        let stats = extract_stats("Win up to 25,000x your bet in the bonus round");
        assert_eq!(
            stats.get("max_multiplier").and_then(Value::as_f64),
            None,
            "25000 exceeds the plausibility ceiling"
        );

        let stats = extract_stats("Max multiplier: 10,000x");
        assert_eq!(
            stats.get("max_multiplier").and_then(Value::as_f64),
            Some(10_000.0)
        );
    }

    #[test]
    fn test_rounds_and_bonus_frequency() {
        let text = "Around 55 rounds per hour with a bonus frequency of 12.5%";
        let stats = extract_stats(text);
        assert_eq!(stats.get("rounds_per_hour").and_then(Value::as_f64), Some(55.0));
        assert_eq!(stats.get("bonus_frequency").and_then(Value::as_f64), Some(12.5));
    }

    #[test]
    fn test_recent_results_filtered_and_bounded() {
        let text = "Latest spins: 2x 5x 1x 100x 50000x 7.5x";
        let results = recent_results(text, 3);
        // 1x is below range, 50000x above; the first three plausible values win.
        assert_eq!(results, vec![2.0, 5.0, 100.0]);
    }
}
