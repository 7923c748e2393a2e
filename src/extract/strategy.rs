//! Candidate discovery strategies.
//!
//! Structural strategies run in a fixed order and the first one that
//! yields any matches wins. When none match, a keyword scan over
//! text-bearing nodes takes over.

use scraper::{ElementRef, Html, Selector};

use super::fields::element_text;

/// Text shorter than this is noise (icons, nav chrome).
const MIN_KEYWORD_TEXT_LEN: usize = 10;

/// Text longer than this is almost certainly an inlined script/JSON blob
/// or a page-level wrapper, not a single candidate.
const MAX_KEYWORD_TEXT_LEN: usize = 800;

/// A structural discovery strategy: a named, ordered set of selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    SemanticContainers,
    CardPatterns,
    TableRows,
    KeywordScan,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SemanticContainers => "semantic-containers",
            Self::CardPatterns => "card-patterns",
            Self::TableRows => "table-rows",
            Self::KeywordScan => "keyword-scan",
        }
    }

    fn selectors(&self) -> &'static [&'static str] {
        match self {
            Self::SemanticContainers => &[
                "article",
                r#"section[class*="game"]"#,
                r#"div[class*="game-card"]"#,
                r#"div[class*="game-item"]"#,
                r#"div[class*="casino-card"]"#,
                "[data-game]",
            ],
            Self::CardPatterns => &[
                r#"li[class*="card"]"#,
                r#"div[class*="card"]"#,
                r#"li[class*="item"]"#,
                r#"div[class*="listing"]"#,
                r#"ul[class*="list"] > li"#,
            ],
            Self::TableRows => &["table tbody tr", "table tr"],
            Self::KeywordScan => &[],
        }
    }
}

/// The structural strategies, in the order they are tried.
const STRUCTURAL: &[Strategy] = &[
    Strategy::SemanticContainers,
    Strategy::CardPatterns,
    Strategy::TableRows,
];

/// Discover candidate elements in the document.
///
/// Returns the matched elements and the strategy that produced them.
pub fn discover<'a>(doc: &'a Html, keywords: &[String]) -> (Vec<ElementRef<'a>>, Strategy) {
    for strategy in STRUCTURAL {
        let found = select_all(doc, strategy.selectors());
        if !found.is_empty() {
            return (found, *strategy);
        }
    }
    (keyword_scan(doc, keywords), Strategy::KeywordScan)
}

fn select_all<'a>(doc: &'a Html, selectors: &[&str]) -> Vec<ElementRef<'a>> {
    let mut out = Vec::new();
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        let matches: Vec<_> = doc.select(&selector).collect();
        if !matches.is_empty() {
            out = matches;
            break;
        }
    }
    out
}

/// Keyword fallback: scan text-bearing nodes whose text or class/id
/// attributes mention a search keyword and whose text length is within
/// the sane window.
fn keyword_scan<'a>(doc: &'a Html, keywords: &[String]) -> Vec<ElementRef<'a>> {
    if keywords.is_empty() {
        return Vec::new();
    }
    let lowered: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    let Ok(selector) = Selector::parse("div, p, li, td, span, a, h1, h2, h3, h4") else {
        return Vec::new();
    };

    doc.select(&selector)
        .filter(|el| {
            let text = element_text(*el);
            let len = text.chars().count();
            if len < MIN_KEYWORD_TEXT_LEN || len > MAX_KEYWORD_TEXT_LEN {
                return false;
            }
            let text = text.to_lowercase();
            let attrs = attr_haystack(*el);
            lowered
                .iter()
                .any(|k| text.contains(k) || attrs.contains(k))
        })
        .collect()
}

fn attr_haystack(el: ElementRef) -> String {
    let mut haystack = String::new();
    for attr in ["class", "id", "data-game", "title"] {
        if let Some(value) = el.value().attr(attr) {
            haystack.push_str(&value.to_lowercase());
            haystack.push(' ');
        }
    }
    haystack
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_order_stops_at_first_match() {
        let html = r#"
            <html><body>
              <article><h3>Game A</h3></article>
              <div class="game-card"><h3>Game B</h3></div>
              <table><tr><td>Game C</td></tr></table>
            </body></html>
        "#;
        let doc = Html::parse_document(html);
        let (found, strategy) = discover(&doc, &[]);
        assert_eq!(strategy, Strategy::SemanticContainers);
        // "article" matched, so the div and table were never consulted.
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_keyword_scan_when_no_structure_matches() {
        let html = r#"
            <html><body>
              <p>Try Lightning Roulette tonight for big multipliers</p>
              <p>short</p>
              <p>Unrelated paragraph about something else entirely</p>
            </body></html>
        "#;
        let doc = Html::parse_document(html);
        let keywords = vec!["lightning roulette".to_string()];
        let (found, strategy) = discover(&doc, &keywords);
        assert_eq!(strategy, Strategy::KeywordScan);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_keyword_scan_length_window() {
        let blob = "x".repeat(2_000);
        let html = format!(
            r#"<html><body><p>roulette {blob}</p><span>roulette</span></body></html>"#
        );
        let doc = Html::parse_document(&html);
        let keywords = vec!["roulette".to_string()];
        let (found, _) = discover(&doc, &keywords);
        // The blob is too long, the bare span too short.
        assert!(found.is_empty());
    }
}
