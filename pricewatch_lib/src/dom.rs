//! Typed DOM arena built from `scraper`'s parse tree.
//!
//! Nodes are owned top-down by [`Document`]; `parent` is a plain index used
//! only for walking upward. Elements carry the source line of their opening
//! tag when it can be matched unambiguously against the raw markup.

use std::collections::HashMap;

use scraper::{Html, Node as HtmlNode};

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The document (or fragment) root.
    Root,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Element {
    /// Lower-case tag name.
    pub tag: String,
    pub attributes: HashMap<String, String>,
    /// Class tokens in source order.
    pub classes: Vec<String>,
    /// 1-based source line of the opening tag, if known.
    pub line: Option<usize>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id").filter(|id| !id.trim().is_empty())
    }

    pub fn style(&self) -> &str {
        self.attr("style").unwrap_or("")
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// A parsed page or page fragment.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Parses a full HTML document.
    pub fn parse(markup: &str) -> Self {
        Self::from_html(&Html::parse_document(markup), markup)
    }

    /// Parses a serialized node fragment (e.g. one element's outer markup).
    pub fn parse_fragment(markup: &str) -> Self {
        Self::from_html(&Html::parse_fragment(markup), markup)
    }

    fn from_html(html: &Html, markup: &str) -> Self {
        let mut nodes: Vec<Node> = Vec::new();
        let mut index = HashMap::new();

        for node in html.tree.root().descendants() {
            let kind = match node.value() {
                HtmlNode::Document | HtmlNode::Fragment => NodeKind::Root,
                HtmlNode::Element(el) => NodeKind::Element(convert_element(el)),
                HtmlNode::Text(text) => {
                    let text: &str = text;
                    NodeKind::Text(text.to_string())
                }
                _ => continue,
            };
            let parent = node.parent().and_then(|p| index.get(&p.id()).copied());
            let id = NodeId(nodes.len());
            index.insert(node.id(), id);
            if let Some(NodeId(p)) = parent {
                nodes[p].children.push(id);
            }
            nodes.push(Node {
                kind,
                parent,
                children: Vec::new(),
            });
        }

        if nodes.is_empty() {
            nodes.push(Node {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            });
        }

        let mut doc = Self { nodes };
        doc.assign_source_lines(markup);
        doc
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// The node itself followed by each ancestor, innermost first.
    pub fn ancestors_inclusive(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |&n| self.parent(n))
    }

    /// All text nodes in document order.
    pub fn text_nodes(&self) -> impl Iterator<Item = (NodeId, &str)> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, n)| match &n.kind {
            NodeKind::Text(t) => Some((NodeId(i), t.as_str())),
            _ => None,
        })
    }

    /// All elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = (NodeId, &Element)> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, n)| match &n.kind {
            NodeKind::Element(el) => Some((NodeId(i), el)),
            _ => None,
        })
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id.0];
        if let NodeKind::Text(t) = &node.kind {
            out.push_str(t);
        }
        for &child in &node.children {
            self.collect_text(child, out);
        }
    }

    /// Number of element siblings before `id` that share its tag name.
    pub fn preceding_same_tag_siblings(&self, id: NodeId) -> usize {
        let (Some(el), Some(parent)) = (self.element(id), self.parent(id)) else {
            return 0;
        };
        self.nodes[parent.0]
            .children
            .iter()
            .take_while(|&&c| c != id)
            .filter(|&&c| self.element(c).is_some_and(|s| s.tag == el.tag))
            .count()
    }

    /// Gives each element the line of its opening tag, for tags whose
    /// occurrences in the markup line up one-to-one with the parsed tree.
    /// Tags the parser synthesized (implied `tbody`, fragment `html`, ...)
    /// break that alignment and stay without a line.
    fn assign_source_lines(&mut self, markup: &str) {
        let source = scan_tag_lines(markup);

        let mut dom_counts: HashMap<String, usize> = HashMap::new();
        for node in &self.nodes {
            if let NodeKind::Element(el) = &node.kind {
                *dom_counts.entry(el.tag.clone()).or_default() += 1;
            }
        }

        let mut seen: HashMap<String, usize> = HashMap::new();
        for node in &mut self.nodes {
            if let NodeKind::Element(el) = &mut node.kind {
                let ordinal = seen.entry(el.tag.clone()).or_default();
                let lines = source.get(&el.tag);
                if let Some(lines) = lines {
                    if dom_counts.get(&el.tag) == Some(&lines.len()) {
                        el.line = lines.get(*ordinal).copied();
                    }
                }
                *ordinal += 1;
            }
        }
    }
}

pub(crate) fn convert_element(el: &scraper::node::Element) -> Element {
    let attributes: HashMap<String, String> = el
        .attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let classes = attributes
        .get("class")
        .map(|c| c.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    Element {
        tag: el.name().to_ascii_lowercase(),
        attributes,
        classes,
        line: None,
    }
}

/// Raw-text elements whose content must not be scanned for tags.
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea", "title"];

/// Maps each lower-case tag name to the lines of its opening tags, in order.
fn scan_tag_lines(markup: &str) -> HashMap<String, Vec<usize>> {
    let mut out: HashMap<String, Vec<usize>> = HashMap::new();
    let bytes = markup.as_bytes();
    let mut line = 1usize;
    let mut i = 0usize;
    let mut raw_text_end: Option<String> = None;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                line += 1;
                i += 1;
                continue;
            }
            b'<' => {}
            _ => {
                i += 1;
                continue;
            }
        }

        let rest = &markup[i..];
        if let Some(end) = &raw_text_end {
            if starts_with_ignore_case(rest, end) {
                raw_text_end = None;
            }
            i += 1;
            continue;
        }

        if rest.starts_with("<!--") {
            let end = rest.find("-->").map(|p| p + 3).unwrap_or(rest.len());
            line += rest[..end].matches('\n').count();
            i += end;
            continue;
        }

        let name_len = rest[1..]
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'-')
            .count();
        let starts_alpha = rest[1..].bytes().next().is_some_and(|b| b.is_ascii_alphabetic());
        if name_len == 0 || !starts_alpha {
            i += 1;
            continue;
        }
        let terminated = match rest[1 + name_len..].chars().next() {
            None => true,
            Some(c) => c.is_whitespace() || c == '>' || c == '/',
        };
        if terminated {
            let name = rest[1..1 + name_len].to_ascii_lowercase();
            if RAW_TEXT_TAGS.contains(&name.as_str()) {
                raw_text_end = Some(format!("</{}", name));
            }
            out.entry(name).or_default().push(line);
        }
        i += 1 + name_len;
    }
    out
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack.len() >= prefix.len()
        && haystack.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}
