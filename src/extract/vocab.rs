//! Canonical vocabularies for categorical extraction.
//!
//! Keyword membership against these lists is unioned with dedicated
//! selector scans; both feed the capped, case-insensitively deduped
//! categorical arrays on a record.

/// Maximum entries kept per categorical array.
pub const MAX_CATEGORY_ITEMS: usize = 10;

pub const FEATURES: &[&str] = &[
    "live dealer",
    "multiplier",
    "side bets",
    "chat",
    "statistics",
    "history",
    "hd stream",
    "multi-camera",
    "bonus rounds",
    "auto play",
    "leaderboard",
    "mobile",
];

pub const PAYMENT_METHODS: &[&str] = &[
    "visa",
    "mastercard",
    "paypal",
    "skrill",
    "neteller",
    "paysafecard",
    "bank transfer",
    "apple pay",
    "google pay",
    "bitcoin",
    "ethereum",
];

pub const LICENSES: &[&str] = &[
    "mga",
    "malta",
    "ukgc",
    "curacao",
    "gibraltar",
    "kahnawake",
    "isle of man",
];

pub const LANGUAGES: &[&str] = &[
    "english",
    "german",
    "spanish",
    "french",
    "italian",
    "portuguese",
    "swedish",
    "norwegian",
    "finnish",
    "dutch",
    "russian",
    "japanese",
];

pub const CURRENCIES: &[&str] = &[
    "eur", "usd", "gbp", "cad", "sek", "nok", "btc", "eth",
];

pub const PROVIDERS: &[&str] = &[
    "evolution",
    "pragmatic play",
    "playtech",
    "ezugi",
    "netent",
    "authentic gaming",
    "vivo gaming",
    "lucky streak",
];

/// Scan text for vocabulary members (case-insensitive, word-boundary-free
/// substring match, which is how the page copy actually reads).
pub fn matches_in_text(text: &str, vocab: &[&str]) -> Vec<String> {
    let haystack = text.to_lowercase();
    vocab
        .iter()
        .filter(|term| haystack.contains(*term))
        .map(|term| term.to_string())
        .collect()
}

/// Merge sources into one capped, case-insensitively deduped array.
/// Insertion order of the first occurrence wins.
pub fn merge_capped(sources: impl IntoIterator<Item = Vec<String>>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for source in sources {
        for item in source {
            let trimmed = item.trim();
            if trimmed.is_empty() {
                continue;
            }
            if seen.insert(trimmed.to_lowercase()) {
                out.push(trimmed.to_string());
                if out.len() >= MAX_CATEGORY_ITEMS {
                    return out;
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_in_text() {
        let text = "Enjoy the Live Dealer experience with Side Bets and HD stream";
        let found = matches_in_text(text, FEATURES);
        assert!(found.contains(&"live dealer".to_string()));
        assert!(found.contains(&"side bets".to_string()));
        assert!(found.contains(&"hd stream".to_string()));
    }

    #[test]
    fn test_merge_capped_dedup_and_cap() {
        let merged = merge_capped(vec![
            vec!["Multiplier".to_string(), "multiplier".to_string()],
            vec!["Chat".to_string()],
        ]);
        assert_eq!(merged, vec!["Multiplier".to_string(), "Chat".to_string()]);

        let many: Vec<String> = (0..30).map(|i| format!("item-{i}")).collect();
        assert_eq!(merge_capped(vec![many]).len(), MAX_CATEGORY_ITEMS);
    }
}
