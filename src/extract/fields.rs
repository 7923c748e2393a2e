//! Cascading per-candidate field extraction.
//!
//! Every field tries an ordered list of heuristics; the first non-empty
//! result wins.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

use crate::config::ScorePolicy;
use crate::models::GameType;

use super::vocab;

/// Dedicated name/title selectors, tried before anchor heuristics.
const NAME_SELECTORS: &[&str] = &[
    "h1",
    "h2",
    "h3",
    "h4",
    r#"[class*="name"]"#,
    r#"[class*="title"]"#,
];

/// Dedicated link selectors, tried before the any-anchor fallback.
const LINK_SELECTORS: &[&str] = &[
    r#"a[class*="link"]"#,
    r#"a[class*="btn"]"#,
    r#"a[class*="play"]"#,
];

/// Selectors for explicitly marked-up feature/tag lists.
const FEATURE_SELECTORS: &[&str] = &[
    r#"[class*="feature"] li"#,
    r#"[class*="tag"]"#,
    ".features li",
    ".tags span",
];

/// Anchor texts that are navigation chrome, not names.
const GENERIC_LINK_TEXT: &[&str] = &[
    "read more",
    "learn more",
    "click here",
    "more info",
    "details",
    "play now",
    "play",
    "visit site",
    "sign up",
    "register",
];

const MAX_NAME_LEN: usize = 120;

static SLASH_TEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}(?:\.\d{1,2})?)\s*/\s*10\b").unwrap());

static SCORE_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:score|rating|rated)[^0-9]{0,10}(\d{1,3}(?:\.\d{1,2})?)").unwrap()
});

/// Full text of an element with whitespace collapsed.
pub fn element_text(el: ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_match_text(el: ElementRef, selectors: &[&str]) -> Option<String> {
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(found) = el.select(&selector).next() {
            let text = element_text(found);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn is_generic_link_text(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    GENERIC_LINK_TEXT.iter().any(|g| lowered == *g)
}

fn truncate(text: String, max: usize) -> String {
    if text.chars().count() <= max {
        return text;
    }
    text.chars().take(max).collect()
}

/// Extract a candidate's name.
///
/// Cascade: dedicated name element, then anchor text or `title` attribute
/// (rejecting generic link text), then the first line of element text.
pub fn extract_name(el: ElementRef) -> Option<String> {
    if let Some(name) = first_match_text(el, NAME_SELECTORS) {
        if name.chars().count() <= MAX_NAME_LEN {
            return Some(name);
        }
    }

    if let Ok(anchor_sel) = Selector::parse("a") {
        for anchor in el.select(&anchor_sel) {
            if let Some(title) = anchor.value().attr("title") {
                let title = title.trim();
                if !title.is_empty() && !is_generic_link_text(title) {
                    return Some(truncate(title.to_string(), MAX_NAME_LEN));
                }
            }
            let text = element_text(anchor);
            if !text.is_empty() && !is_generic_link_text(&text) {
                return Some(truncate(text, MAX_NAME_LEN));
            }
        }
    }

    el.text()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| truncate(line.to_string(), MAX_NAME_LEN))
}

fn usable_href(href: &str) -> bool {
    !href.is_empty()
        && href != "#"
        && !href.starts_with("javascript:")
        && !href.starts_with("mailto:")
}

fn resolve_href(href: &str, origin: Option<&Url>) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    // Root-relative (and page-relative) hrefs resolve against the origin.
    origin.and_then(|base| base.join(href).ok()).map(Into::into)
}

/// Extract a candidate's URL: dedicated link selectors first, then any
/// anchor with an absolute or root-relative href.
pub fn extract_url(el: ElementRef, origin: Option<&Url>) -> Option<String> {
    for raw in LINK_SELECTORS {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        for anchor in el.select(&selector) {
            if let Some(href) = anchor.value().attr("href") {
                if usable_href(href) {
                    if let Some(resolved) = resolve_href(href, origin) {
                        return Some(resolved);
                    }
                }
            }
        }
    }

    let anchor_sel = Selector::parse("a[href]").ok()?;
    for anchor in el.select(&anchor_sel) {
        if let Some(href) = anchor.value().attr("href") {
            if usable_href(href) {
                if let Some(resolved) = resolve_href(href, origin) {
                    return Some(resolved);
                }
            }
        }
    }
    None
}

/// Extract a 0-10 score from nearby text.
///
/// Values above 10 are handled by the per-extractor policy: either
/// rescaled from a 0-100 reading or discarded outright.
pub fn extract_score(text: &str, policy: ScorePolicy) -> Option<f64> {
    let raw = SLASH_TEN_RE
        .captures(text)
        .or_else(|| SCORE_KEYWORD_RE.captures(text))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())?;

    let value = if (0.0..=10.0).contains(&raw) {
        raw
    } else {
        match policy {
            ScorePolicy::RescaleOutOfHundred => {
                let rescaled = raw / 10.0;
                if (0.0..=10.0).contains(&rescaled) {
                    rescaled
                } else {
                    return None;
                }
            }
            ScorePolicy::DiscardOutOfRange => return None,
        }
    };

    Some((value * 10.0).round() / 10.0)
}

/// Feature tags: union of the dedicated selector scan and vocabulary
/// membership over the element text.
pub fn extract_features(el: ElementRef, text: &str) -> Vec<String> {
    let mut from_selectors = Vec::new();
    for raw in FEATURE_SELECTORS {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        for found in el.select(&selector) {
            let tag = element_text(found);
            if !tag.is_empty() && tag.chars().count() <= 40 {
                from_selectors.push(tag);
            }
        }
    }
    vocab::merge_capped([from_selectors, vocab::matches_in_text(text, vocab::FEATURES)])
}

/// Detect a known provider name in the text.
pub fn detect_provider(text: &str) -> Option<String> {
    vocab::matches_in_text(text, vocab::PROVIDERS)
        .into_iter()
        .next()
        .map(|p| title_case(&p))
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Detect the game category from text keywords.
pub fn detect_game_type(text: &str) -> Option<GameType> {
    let lowered = text.to_lowercase();
    let checks: &[(&[&str], GameType)] = &[
        (&["roulette"], GameType::Roulette),
        (&["blackjack"], GameType::Blackjack),
        (&["baccarat"], GameType::Baccarat),
        (&["dream catcher", "money wheel", "wheel of"], GameType::Wheel),
        (
            &["game show", "crazy time", "monopoly live", "deal or no deal"],
            GameType::GameShow,
        ),
        (&["casino"], GameType::Casino),
    ];
    checks
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(_, t)| *t)
}
