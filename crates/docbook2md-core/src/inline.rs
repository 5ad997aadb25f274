//! Inline renderer
//!
//! Flattens a subtree into one line of running text. The inline renderer owns
//! the tails of every descendant it visits; it never records diagnostics.

use docbook_tree::Element;

use crate::markdown;
use crate::tag::TagKind;

/// Flatten a node's mixed content into a single Markdown string
///
/// Content is concatenated in document order (own text, then each child's
/// decorated content followed by its tail), whitespace runs are collapsed and
/// the result is trimmed.
pub fn flatten(node: &Element) -> String {
    normalize_whitespace(&raw_content(node)).trim().to_string()
}

/// Decorated form of a single inline element, without its tail
pub fn decorate(node: &Element) -> String {
    match TagKind::parse(&node.tag) {
        TagKind::Emphasis => {
            let inner = flatten(node);
            if inner.is_empty() {
                return inner;
            }
            match node.attr("role").map(str::to_lowercase).as_deref() {
                Some("bold") => markdown::strong(&inner),
                Some("italic") => markdown::emphasis(&inner),
                _ => inner,
            }
        }
        TagKind::Literal => wrap_nonempty(flatten(node), markdown::inline_code),
        TagKind::Link => {
            let href = link_target(node).unwrap_or_default();
            let inner = flatten(node);
            let text = if inner.is_empty() { href } else { &inner };
            if text.is_empty() {
                String::new()
            } else {
                markdown::link(text, href)
            }
        }
        // Leaf-like by convention: only the element's own text counts
        TagKind::Parameter | TagKind::Function => {
            wrap_nonempty(normalize_whitespace(node.text.trim()), markdown::inline_code)
        }
        _ => flatten(node),
    }
}

/// Target of a `link`: `xlink:href`, any other namespaced `href`, or plain `href`
pub fn link_target(node: &Element) -> Option<&str> {
    node.attr("xlink:href")
        .or_else(|| {
            node.attributes
                .iter()
                .find(|(k, _)| k.rsplit(':').next() == Some("href") && k.contains(':'))
                .map(|(_, v)| v.as_str())
        })
        .or_else(|| node.attr("href"))
}

/// Collapse internal whitespace runs to a single space
///
/// Leading and trailing whitespace shrink to one space instead of vanishing,
/// so text adjacent to inline markup keeps its separation.
pub fn normalize_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn raw_content(node: &Element) -> String {
    let mut out = node.text.clone();
    for child in &node.children {
        if TagKind::parse(&child.tag).is_block() {
            // Keep adjacent paragraphs from running together
            out.push(' ');
            out.push_str(&decorate(child));
            out.push(' ');
        } else {
            out.push_str(&decorate(child));
        }
        out.push_str(&child.tail);
    }
    out
}

fn wrap_nonempty(inner: String, wrap: fn(&str) -> String) -> String {
    if inner.is_empty() { inner } else { wrap(&inner) }
}
