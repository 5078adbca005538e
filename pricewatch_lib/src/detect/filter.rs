//! Crossed-out price filter.
//!
//! Storefronts mark the superseded "was" price by striking it through or
//! greying it out. A text node under any such ancestor is never the live
//! price.

use std::sync::LazyLock;

use regex::Regex;

use crate::dom::{Document, Element, NodeId};

const STRIKE_TAGS: &[&str] = &["s", "strike", "del"];

/// Channels may differ by at most this much and still count as grey.
const GREY_TOLERANCE: i32 = 15;
const GREY_MIN: i32 = 80;
const GREY_MAX: i32 = 200;

static INLINE_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|;)\s*color\s*:\s*([^;]+)").expect("inline color regex")
});

static RGB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,[^)]*)?\)$")
        .expect("rgb regex")
});

/// Whether `node` or any of its ancestors de-emphasizes its text as a
/// superseded price.
pub fn is_crossed_out(doc: &Document, node: NodeId) -> bool {
    doc.ancestors_inclusive(node)
        .filter_map(|n| doc.element(n))
        .any(crosses_out)
}

/// Checks a single element for strike semantics, inline line-through,
/// the `data-a-strike` marker, or a grey inline text color.
pub fn crosses_out(el: &Element) -> bool {
    if STRIKE_TAGS.contains(&el.tag.as_str()) {
        return true;
    }
    let style = el.style();
    if style.to_ascii_lowercase().contains("line-through") {
        return true;
    }
    if el
        .attr("data-a-strike")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    {
        return true;
    }
    inline_color(style).is_some_and(is_grey)
}

/// The value of the `color` declaration in an inline style, if any.
/// `background-color` and friends are not matched.
pub fn inline_color(style: &str) -> Option<&str> {
    INLINE_COLOR
        .captures(style)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// Whether a CSS color string is a mid-range grey.
///
/// Accepts the `grey`/`gray` keywords, `#rgb`, `#rrggbb`, `rgb()` and
/// `rgba()`. Channels must differ by less than [`GREY_TOLERANCE`] and each
/// lie between 80 and 200 inclusive.
pub fn is_grey(color: &str) -> bool {
    let color = color.trim().to_ascii_lowercase();
    let color = color.trim_end_matches("!important").trim();
    if color == "grey" || color == "gray" {
        return true;
    }
    let Some((r, g, b)) = parse_rgb(color) else {
        return false;
    };
    let spread = (r - g).abs().max((r - b).abs()).max((g - b).abs());
    spread < GREY_TOLERANCE && [r, g, b].iter().all(|c| (GREY_MIN..=GREY_MAX).contains(c))
}

fn parse_rgb(color: &str) -> Option<(i32, i32, i32)> {
    if let Some(hex) = color.strip_prefix('#') {
        let channel = |s: &str| i32::from_str_radix(s, 16).ok();
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        return match hex.len() {
            3 => {
                let mut it = hex.chars().map(|c| channel(&format!("{c}{c}")));
                Some((it.next()??, it.next()??, it.next()??))
            }
            6 => Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            _ => None,
        };
    }
    let caps = RGB.captures(color)?;
    let channel = |i: usize| caps.get(i)?.as_str().parse::<i32>().ok();
    Some((channel(1)?, channel(2)?, channel(3)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grey_keywords() {
        assert!(is_grey("grey"));
        assert!(is_grey(" Gray "));
    }

    #[test]
    fn grey_hex_and_rgb() {
        assert!(is_grey("#999"));
        assert!(is_grey("#999999"));
        assert!(is_grey("#8a8f95"));
        assert!(is_grey("rgb(128, 128, 128)"));
        assert!(is_grey("rgb(100,110,115)"));
        assert!(is_grey("rgba(150, 150, 150, 0.8)"));
        assert!(is_grey("#777 !important"));
    }

    #[test]
    fn grey_band_edges() {
        assert!(is_grey("rgb(80, 80, 80)"));
        assert!(is_grey("rgb(200, 200, 200)"));
        assert!(is_grey("rgb(100, 114, 100)"));
        assert!(!is_grey("rgb(100, 115, 100)"));
        assert!(!is_grey("#64736e"));
        assert!(!is_grey("rgb(79, 79, 79)"));
        assert!(!is_grey("rgb(201, 201, 201)"));
    }

    #[test]
    fn saturated_and_extreme_colors_are_not_grey() {
        assert!(!is_grey("rgb(255,0,0)"));
        assert!(!is_grey("#f00"));
        assert!(!is_grey("#000000"));
        assert!(!is_grey("#ffffff"));
        assert!(!is_grey("red"));
        assert!(!is_grey("#12345"));
        assert!(!is_grey("#zzz"));
    }

    #[test]
    fn inline_color_ignores_background() {
        assert_eq!(inline_color("background-color: #999; font-weight: bold"), None);
        assert_eq!(inline_color("font-size: 12px; color: #999"), Some("#999"));
        assert_eq!(inline_color("color:rgb(1,2,3)"), Some("rgb(1,2,3)"));
    }

    fn first_text_node(doc: &Document, needle: &str) -> NodeId {
        doc.text_nodes()
            .find(|(_, t)| t.contains(needle))
            .map(|(id, _)| id)
            .unwrap()
    }

    #[test]
    fn strike_tags_and_styles_cross_out() {
        let doc = Document::parse(
            r#"<div>
                <del>10,00</del>
                <span style="text-decoration: line-through">11,00</span>
                <span data-a-strike="true"><span>12,00</span></span>
                <p style="color:#999">13,00</p>
                <p style="background-color:#999">14,00</p>
                <s><b><i>15,00</i></b></s>
            </div>"#,
        );
        assert!(is_crossed_out(&doc, first_text_node(&doc, "10,00")));
        assert!(is_crossed_out(&doc, first_text_node(&doc, "11,00")));
        assert!(is_crossed_out(&doc, first_text_node(&doc, "12,00")));
        assert!(is_crossed_out(&doc, first_text_node(&doc, "13,00")));
        assert!(!is_crossed_out(&doc, first_text_node(&doc, "14,00")));
        assert!(is_crossed_out(&doc, first_text_node(&doc, "15,00")));
    }
}
