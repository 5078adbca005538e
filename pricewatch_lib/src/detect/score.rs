//! Candidate scoring.
//!
//! The heuristic is an ordered table of independent rules. Each rule looks
//! at one candidate and returns a weight (often zero); the score is the
//! sum. Keeping rules separate makes every adjustment testable on its own.

use std::sync::LazyLock;

use regex::Regex;

use crate::dom::Element;

/// Everything a rule may inspect about one candidate.
#[derive(Debug, Clone, Copy)]
pub struct CandidateView<'a> {
    pub element: &'a Element,
    pub selector: &'a str,
    pub text: &'a str,
    pub font_size: Option<f64>,
}

/// One named scoring adjustment.
pub struct ScoreRule {
    pub name: &'static str,
    pub apply: fn(&CandidateView<'_>) -> i32,
}

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹'];
const PRICE_CONTAINERS: &[&str] = &["span", "div", "p", "b", "strong"];
const NON_CONTENT: &[&str] = &["script", "style"];

static PRICE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)price|amount|cost|total").expect("price word regex"));

static LETTER_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z]{2,}").expect("letter pair regex"));

pub static RULES: &[ScoreRule] = &[
    ScoreRule {
        name: "selector-mentions-price",
        apply: selector_mentions_price,
    },
    ScoreRule {
        name: "short-text",
        apply: short_text,
    },
    ScoreRule {
        name: "leading-symbol-with-digit",
        apply: leading_symbol_with_digit,
    },
    ScoreRule {
        name: "container-tag",
        apply: container_tag,
    },
    ScoreRule {
        name: "font-size",
        apply: font_size,
    },
    ScoreRule {
        name: "currency-symbol",
        apply: currency_symbol,
    },
    ScoreRule {
        name: "promo-price-class",
        apply: promo_price_class,
    },
    ScoreRule {
        name: "price-test-marker",
        apply: price_test_marker,
    },
    ScoreRule {
        name: "early-line-bonus",
        apply: early_line_bonus,
    },
    ScoreRule {
        name: "line-penalty",
        apply: line_penalty,
    },
    ScoreRule {
        name: "comma-dash",
        apply: comma_dash,
    },
    ScoreRule {
        name: "prose",
        apply: prose,
    },
];

/// Total score of a candidate.
pub fn score(view: &CandidateView<'_>) -> i32 {
    RULES.iter().map(|rule| (rule.apply)(view)).sum()
}

/// The rules that fired for a candidate, with their weights.
pub fn explain(view: &CandidateView<'_>) -> Vec<(&'static str, i32)> {
    RULES
        .iter()
        .map(|rule| (rule.name, (rule.apply)(view)))
        .filter(|(_, w)| *w != 0)
        .collect()
}

fn selector_mentions_price(v: &CandidateView<'_>) -> i32 {
    if PRICE_WORD.is_match(v.selector) {
        5
    } else {
        0
    }
}

fn short_text(v: &CandidateView<'_>) -> i32 {
    if v.text.chars().count() < 20 {
        2
    } else {
        0
    }
}

// The leading symbol is optional, so any digit after it satisfies the rule.
fn leading_symbol_with_digit(v: &CandidateView<'_>) -> i32 {
    let rest = v.text.trim_start();
    let rest = rest.strip_prefix(CURRENCY_SYMBOLS).unwrap_or(rest);
    if rest.chars().any(|c| c.is_ascii_digit()) {
        2
    } else {
        0
    }
}

fn container_tag(v: &CandidateView<'_>) -> i32 {
    let tag = v.element.tag.as_str();
    if PRICE_CONTAINERS.contains(&tag) {
        1
    } else if NON_CONTENT.contains(&tag) {
        -10
    } else {
        0
    }
}

fn font_size(v: &CandidateView<'_>) -> i32 {
    match v.font_size {
        Some(px) if px > 0.0 => (px / 2.0).min(15.0) as i32,
        _ => 0,
    }
}

fn currency_symbol(v: &CandidateView<'_>) -> i32 {
    if v.text.contains(CURRENCY_SYMBOLS) {
        4
    } else {
        0
    }
}

fn promo_price_class(v: &CandidateView<'_>) -> i32 {
    if v.element.has_class("promo-price") {
        8
    } else {
        0
    }
}

fn price_test_marker(v: &CandidateView<'_>) -> i32 {
    if v.element.attr("data-test") == Some("price") {
        8
    } else {
        0
    }
}

fn early_line_bonus(v: &CandidateView<'_>) -> i32 {
    match v.element.line {
        Some(line) => (10 - (line / 100) as i32).max(0),
        None => 0,
    }
}

fn line_penalty(v: &CandidateView<'_>) -> i32 {
    match v.element.line {
        Some(line) => -((line / 50) as i32),
        None => 0,
    }
}

fn comma_dash(v: &CandidateView<'_>) -> i32 {
    if v.text.contains(",-") {
        5
    } else {
        0
    }
}

fn prose(v: &CandidateView<'_>) -> i32 {
    if LETTER_PAIR.is_match(v.text) {
        -5
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn element(tag: &str, classes: &[&str], attrs: &[(&str, &str)], line: Option<usize>) -> Element {
        Element {
            tag: tag.to_string(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            line,
        }
    }

    fn rule(name: &str) -> &'static ScoreRule {
        RULES.iter().find(|r| r.name == name).unwrap()
    }

    fn apply(name: &str, el: &Element, selector: &str, text: &str, font: Option<f64>) -> i32 {
        let view = CandidateView {
            element: el,
            selector,
            text,
            font_size: font,
        };
        (rule(name).apply)(&view)
    }

    #[test]
    fn selector_keyword_rule() {
        let el = element("span", &[], &[], None);
        assert_eq!(apply("selector-mentions-price", &el, "div.Product-Price", "1", None), 5);
        assert_eq!(apply("selector-mentions-price", &el, "div#total", "1", None), 5);
        assert_eq!(apply("selector-mentions-price", &el, "div.title", "1", None), 0);
    }

    #[test]
    fn short_text_rule() {
        let el = element("span", &[], &[], None);
        assert_eq!(apply("short-text", &el, "", "€ 12,99", None), 2);
        assert_eq!(apply("short-text", &el, "", "12,99 incl. VAT and shipping", None), 0);
    }

    #[test]
    fn digit_rule() {
        let el = element("span", &[], &[], None);
        assert_eq!(apply("leading-symbol-with-digit", &el, "", "$5", None), 2);
        assert_eq!(apply("leading-symbol-with-digit", &el, "", "from 5", None), 2);
        assert_eq!(apply("leading-symbol-with-digit", &el, "", "free", None), 0);
    }

    #[test]
    fn container_rule() {
        for tag in ["span", "div", "p", "b", "strong"] {
            assert_eq!(apply("container-tag", &element(tag, &[], &[], None), "", "1", None), 1);
        }
        assert_eq!(apply("container-tag", &element("script", &[], &[], None), "", "1", None), -10);
        assert_eq!(apply("container-tag", &element("style", &[], &[], None), "", "1", None), -10);
        assert_eq!(apply("container-tag", &element("td", &[], &[], None), "", "1", None), 0);
    }

    #[test]
    fn font_size_rule_is_capped() {
        let el = element("span", &[], &[], None);
        assert_eq!(apply("font-size", &el, "", "1", Some(13.0)), 6);
        assert_eq!(apply("font-size", &el, "", "1", Some(24.0)), 12);
        assert_eq!(apply("font-size", &el, "", "1", Some(48.0)), 15);
        assert_eq!(apply("font-size", &el, "", "1", None), 0);
    }

    #[test]
    fn marker_rules() {
        let promo = element("span", &["promo-price", "big"], &[], None);
        let plain = element("span", &["promo"], &[], None);
        assert_eq!(apply("promo-price-class", &promo, "", "1", None), 8);
        assert_eq!(apply("promo-price-class", &plain, "", "1", None), 0);

        let tagged = element("span", &[], &[("data-test", "price")], None);
        let other = element("span", &[], &[("data-test", "title")], None);
        assert_eq!(apply("price-test-marker", &tagged, "", "1", None), 8);
        assert_eq!(apply("price-test-marker", &other, "", "1", None), 0);
    }

    #[test]
    fn line_rules_apply_together() {
        let early = element("span", &[], &[], Some(40));
        assert_eq!(apply("early-line-bonus", &early, "", "1", None), 10);
        assert_eq!(apply("line-penalty", &early, "", "1", None), 0);

        let mid = element("span", &[], &[], Some(250));
        assert_eq!(apply("early-line-bonus", &mid, "", "1", None), 8);
        assert_eq!(apply("line-penalty", &mid, "", "1", None), -5);

        let late = element("span", &[], &[], Some(1500));
        assert_eq!(apply("early-line-bonus", &late, "", "1", None), 0);
        assert_eq!(apply("line-penalty", &late, "", "1", None), -30);

        let unknown = element("span", &[], &[], None);
        assert_eq!(apply("early-line-bonus", &unknown, "", "1", None), 0);
        assert_eq!(apply("line-penalty", &unknown, "", "1", None), 0);
    }

    #[test]
    fn text_shape_rules() {
        let el = element("span", &[], &[], None);
        assert_eq!(apply("currency-symbol", &el, "", "£3", None), 4);
        assert_eq!(apply("currency-symbol", &el, "", "3 EUR", None), 0);
        assert_eq!(apply("comma-dash", &el, "", "199,-", None), 5);
        assert_eq!(apply("prose", &el, "", "Only 3 left", None), -5);
        assert_eq!(apply("prose", &el, "", "3 x", None), 0);
    }

    #[test]
    fn total_and_explanation_agree() {
        let el = element("span", &["price"], &[], Some(12));
        let view = CandidateView {
            element: &el,
            selector: "span.price",
            text: "$39.99",
            font_size: Some(20.0),
        };
        // 5 selector + 2 short + 2 digit + 1 span + 10 font + 4 symbol + 10 early line
        assert_eq!(score(&view), 34);
        let explained: i32 = explain(&view).iter().map(|(_, w)| w).sum();
        assert_eq!(explained, score(&view));
    }
}
