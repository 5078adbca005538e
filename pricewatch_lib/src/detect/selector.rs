//! CSS selector synthesis for a candidate element.

use crate::dom::{Document, NodeId};

/// Builds a CSS selector path from `node` up toward the root.
///
/// Each level is the tag name plus its usable classes, with an
/// `:nth-child` index when same-tag siblings precede it. The walk anchors
/// on the first element with an `id`, and also stops at the first element
/// that contributed classes without needing an index. Levels are joined
/// with `" > "`.
pub fn css_selector(doc: &Document, node: NodeId) -> String {
    let mut path: Vec<String> = Vec::new();
    let mut current = Some(node);

    while let Some(id) = current {
        let Some(el) = doc.element(id) else {
            break;
        };

        let mut level = el.tag.clone();
        if let Some(el_id) = el.id() {
            level.push('#');
            level.push_str(el_id);
            path.push(level);
            break;
        }

        let classes: Vec<String> = el
            .classes
            .iter()
            .filter(|c| !c.contains(&['[', ']', ':'][..]))
            .map(|c| escape_class(c))
            .collect();
        if !classes.is_empty() {
            level.push('.');
            level.push_str(&classes.join("."));
        }

        let preceding = doc.preceding_same_tag_siblings(id);
        if preceding > 0 {
            level.push_str(&format!(":nth-child({})", preceding + 1));
        }
        path.push(level);

        if !classes.is_empty() && preceding == 0 {
            break;
        }
        current = doc.parent(id);
    }

    path.reverse();
    path.join(" > ")
}

/// Escapes the characters that would otherwise end a class token.
fn escape_class(class: &str) -> String {
    let mut out = String::with_capacity(class.len());
    for c in class.chars() {
        if matches!(c, '.' | '/' | '#' | '%' | '+' | '(' | ')' | '!' | '@' | ',') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
