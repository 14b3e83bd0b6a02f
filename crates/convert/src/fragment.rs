//! Owned markup tree handed to the conversion engine.
//!
//! A [`ContentFragment`] is built once from raw markup, cleaned, converted,
//! and discarded. Owning the tree (instead of borrowing `scraper`'s DOM)
//! keeps conversion `Send`, so lesson tasks can hold one across await points.

use ego_tree::NodeRef;
use scraper::{Html, Node};

/// One node of a parsed markup fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentFragment {
    /// A text node.
    Text(String),
    /// A comment node. Removed wholesale by [`clean`].
    Comment(String),
    /// An element with its tag name, attributes, and children.
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<ContentFragment>,
    },
}

impl ContentFragment {
    /// Attribute lookup by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            Self::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Tag name, or `None` for non-elements.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    /// Full flattened text content of this subtree, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text(t) => out.push_str(t),
            Self::Comment(_) => {}
            Self::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }
}

/// Elements removed entirely (with their subtrees) by the cleaning pre-pass.
const STRIPPED_TAGS: &[&str] = &["script", "style", "ins", "iframe", "noscript"];

/// Parse raw markup into the top-level children of a fragment.
pub fn parse_fragment(html: &str) -> Vec<ContentFragment> {
    let doc = Html::parse_fragment(html);
    let root = doc.tree.root();
    let mut top = Vec::new();
    for child in root.children() {
        // parse_fragment wraps content in a synthetic <html> node
        if let Node::Element(el) = child.value() {
            if el.name() == "html" {
                for inner in child.children() {
                    if let Some(f) = build(inner) {
                        top.push(f);
                    }
                }
                continue;
            }
        }
        if let Some(f) = build(child) {
            top.push(f);
        }
    }
    top
}

fn build(node: NodeRef<'_, Node>) -> Option<ContentFragment> {
    match node.value() {
        Node::Text(t) => Some(ContentFragment::Text(t.text.to_string())),
        Node::Comment(c) => Some(ContentFragment::Comment(c.comment.to_string())),
        Node::Element(el) => {
            let tag = el.name().to_string();
            let attrs = el
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            let children = node.children().filter_map(build).collect();
            Some(ContentFragment::Element {
                tag,
                attrs,
                children,
            })
        }
        _ => None,
    }
}

/// Cleaning pre-pass: drop stripped elements and comments, subtrees included.
/// Stripped subtrees are never recursed into.
pub fn clean(fragments: Vec<ContentFragment>) -> Vec<ContentFragment> {
    fragments
        .into_iter()
        .filter_map(|f| match f {
            ContentFragment::Comment(_) => None,
            ContentFragment::Element {
                tag,
                attrs,
                children,
            } => {
                if STRIPPED_TAGS.contains(&tag.as_str()) {
                    return None;
                }
                Some(ContentFragment::Element {
                    tag,
                    attrs,
                    children: clean(children),
                })
            }
            text => Some(text),
        })
        .collect()
}
