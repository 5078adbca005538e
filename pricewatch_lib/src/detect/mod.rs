//! Heuristic price detection over a parsed page.
//!
//! Every text node shaped like a price becomes a [`Candidate`] unless it
//! sits under a crossed-out ancestor. Candidates are scored by the rule
//! table in [`score`] and ranked with a stable descending sort, so equal
//! scores keep document order.

pub mod filter;
pub mod score;
pub mod selector;

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::dom::{Document, NodeId};
use crate::normalize::extract_price;

pub use filter::{crosses_out, is_crossed_out, is_grey};
pub use score::{CandidateView, ScoreRule, RULES};
pub use selector::css_selector;

static PRICE_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\$|€|£|¥|₹|USD|EUR|GBP|CAD|AUD|CHF|RUB|\bkr\b|\bPLN\b|\bCZK\b|\bSEK\b|\bNOK\b|\bDKK\b)?\s?\d{1,3}(?:[.,]\d{3})*(?:[.,]\d{2})?\s?(USD|EUR|GBP|CAD|AUD|CHF|RUB|kr|PLN|CZK|SEK|NOK|DKK|€|£|¥|₹)?",
    )
    .expect("price shape regex")
});

static FONT_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)font-size\s*:\s*([\d.]+)px").expect("font size regex")
});

/// A price-shaped text node and where it lives.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The element that directly contains the text.
    pub node: NodeId,
    pub selector: String,
    /// Trimmed text of the text node.
    pub text: String,
    pub font_size: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: i32,
}

impl ScoredCandidate {
    /// The cleaned price contained in the candidate text.
    pub fn price(&self) -> Option<String> {
        extract_price(&self.candidate.text)
    }
}

/// Whether `text` contains something shaped like a price.
pub fn looks_like_price(text: &str) -> bool {
    PRICE_SHAPE.is_match(text)
}

/// Collects the candidates of a document in encounter order.
pub fn find_price_candidates(doc: &Document) -> Vec<Candidate> {
    let mut out = Vec::new();
    for (text_node, raw) in doc.text_nodes() {
        let text = raw.trim();
        if text.is_empty() || !looks_like_price(text) {
            continue;
        }
        let Some(parent) = doc.parent(text_node) else {
            continue;
        };
        let Some(parent_el) = doc.element(parent) else {
            continue;
        };
        if is_crossed_out(doc, parent) {
            debug!(text, "skipping crossed-out price");
            continue;
        }
        let font_size = FONT_SIZE
            .captures(parent_el.style())
            .and_then(|caps| caps[1].parse::<f64>().ok());
        out.push(Candidate {
            node: parent,
            selector: css_selector(doc, parent),
            text: text.to_string(),
            font_size,
        });
    }
    out
}

/// Scores candidates, keeping their order.
pub fn score_candidates(doc: &Document, candidates: Vec<Candidate>) -> Vec<ScoredCandidate> {
    candidates
        .into_iter()
        .filter_map(|candidate| {
            let element = doc.element(candidate.node)?;
            let view = CandidateView {
                element,
                selector: &candidate.selector,
                text: &candidate.text,
                font_size: candidate.font_size,
            };
            let score = score::score(&view);
            Some(ScoredCandidate { candidate, score })
        })
        .collect()
}

/// Finds, scores and ranks every candidate, best first.
pub fn detect_price(doc: &Document) -> Vec<ScoredCandidate> {
    let mut ranked = score_candidates(doc, find_price_candidates(doc));
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

/// The best-ranked candidate that yields a non-empty price.
pub fn best_candidate(doc: &Document) -> Option<ScoredCandidate> {
    detect_price(doc).into_iter().find(|c| c.price().is_some())
}

/// Convenience wrapper over raw markup.
pub fn detect_in_markup(markup: &str) -> Option<ScoredCandidate> {
    best_candidate(&Document::parse(markup))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_live_price_over_struck_one() {
        let doc = Document::parse(r#"<div><span>Was <s>$49.99</s> Now $39.99</span></div>"#);
        let best = best_candidate(&doc).unwrap();
        assert_eq!(best.price().as_deref(), Some("39.99"));
        assert!(detect_price(&doc).iter().all(|c| !c.candidate.text.contains("49.99")));
    }

    #[test]
    fn greyed_out_price_is_not_a_candidate() {
        let doc = Document::parse(
            r#"<p><span style="color: #888">€59,00</span> <span>€45,00</span></p>"#,
        );
        let found = find_price_candidates(&doc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "€45,00");
    }

    #[test]
    fn price_markers_win() {
        let doc = Document::parse(
            r#"<body>
<div class="related"><span>$12.00</span></div>
<div class="product"><span class="promo-price">$89.00</span></div>
</body>"#,
        );
        let best = best_candidate(&doc).unwrap();
        assert_eq!(best.candidate.selector, "span.promo-price");
        assert_eq!(best.price().as_deref(), Some("89.00"));
    }

    #[test]
    fn reads_parent_font_size() {
        let doc = Document::parse(r#"<b style="font-size: 28px">1 299 kr</b>"#);
        let found = find_price_candidates(&doc);
        assert_eq!(found[0].font_size, Some(28.0));
    }

    #[test]
    fn ties_keep_document_order() {
        let doc = Document::parse(r#"<div><i>$1.00</i><i>$2.00</i></div>"#);
        let ranked = detect_price(&doc);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].score, ranked[1].score);
        assert_eq!(ranked[0].candidate.text, "$1.00");
    }

    #[test]
    fn page_without_prices_has_no_candidates() {
        let doc = Document::parse("<p>Out of stock</p>");
        assert!(detect_price(&doc).is_empty());
        assert!(best_candidate(&doc).is_none());
    }
}
