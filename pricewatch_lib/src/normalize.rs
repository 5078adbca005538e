//! Price text cleanup.
//!
//! Prices are kept as strings: the cleaned numeral with its original
//! decimal and thousands punctuation. Nothing here parses into a number.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// ISO codes and local abbreviations removed during cleanup.
const CURRENCY_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "CAD", "AUD", "CHF", "RUB", "PLN", "CZK", "SEK", "NOK", "DKK", "JPY",
    "CNY", "INR", "HUF", "RON", "BRL", "MXN", "NZD", "KR", "ZŁ", "KČ", "FT", "LEI",
];

static CURRENCY_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{Sc}").expect("currency symbol regex"));

static LETTER_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{L}+").expect("letter run regex"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// A numeral with optional thousands groups (`.`, `,`, `'`, or a space),
/// an optional 1-2 digit fraction, and an optional `,-` suffix.
static NUMERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+(?:[ \u{a0}\u{202f}.,']\d{3})*(?:[.,]\d{1,2})?(?:,-)?").expect("numeral regex")
});

/// Strips currency symbols and codes, and removes whitespace.
///
/// Idempotent: cleaning an already-clean string returns it unchanged.
pub fn clean_price_text(text: &str) -> String {
    let without_symbols = CURRENCY_SYMBOL.replace_all(text, "");
    let without_codes = LETTER_RUN.replace_all(&without_symbols, |caps: &Captures<'_>| {
        let run = &caps[0];
        if is_currency_code(run) {
            String::new()
        } else {
            run.to_string()
        }
    });
    WHITESPACE.replace_all(&without_codes, "").into_owned()
}

/// Pulls the first price-shaped numeral out of `text` and cleans it.
///
/// `"Now $39.99"` becomes `"39.99"`; `"1 299,00 kr"` becomes `"1299,00"`.
pub fn extract_price(text: &str) -> Option<String> {
    let m = NUMERAL.find(text)?;
    let cleaned = clean_price_text(m.as_str());
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Compares two price strings after cleanup.
pub fn prices_equal(a: &str, b: &str) -> bool {
    clean_price_text(a) == clean_price_text(b)
}

fn is_currency_code(run: &str) -> bool {
    let upper = run.to_uppercase();
    CURRENCY_CODES.contains(&upper.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_symbols_codes_and_whitespace() {
        assert_eq!(clean_price_text("€39,99"), "39,99");
        assert_eq!(clean_price_text("$ 1,299.00 USD"), "1,299.00");
        assert_eq!(clean_price_text("199 kr"), "199");
        assert_eq!(clean_price_text("199kr"), "199");
        assert_eq!(clean_price_text("₹ 4 999"), "4999");
        assert_eq!(clean_price_text("£12.50"), "12.50");
        assert_eq!(clean_price_text("12,99 zł"), "12,99");
    }

    #[test]
    fn keeps_non_currency_words() {
        assert_eq!(clean_price_text("from 10"), "from10");
    }

    #[test]
    fn cleaning_is_idempotent() {
        for raw in ["€39,99", " $ 1,299.00 ", "1 299,00 kr", "CHF 5.-", "199,-", "Now $39.99"] {
            let once = clean_price_text(raw);
            assert_eq!(clean_price_text(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn extracts_first_price() {
        assert_eq!(extract_price("Now $39.99").as_deref(), Some("39.99"));
        assert_eq!(extract_price("1 299,00 kr").as_deref(), Some("1299,00"));
        assert_eq!(extract_price("1.299,00 €").as_deref(), Some("1.299,00"));
        assert_eq!(extract_price("12345 SEK").as_deref(), Some("12345"));
        assert_eq!(extract_price("199,-").as_deref(), Some("199,-"));
        assert_eq!(extract_price("39.99 49.99").as_deref(), Some("39.99"));
        assert_eq!(extract_price("sold out"), None);
    }

    #[test]
    fn equal_after_cleanup() {
        assert!(prices_equal("€39,99", "39,99"));
        assert!(prices_equal("$ 10.00", "10.00 USD"));
        assert!(!prices_equal("39,99", "39.99"));
    }
}
