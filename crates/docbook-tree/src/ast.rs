//! Mixed-content element tree
//!
//! Every element carries its own leading `text` and the `tail` text that
//! follows its closing tag inside the parent. Together with the ordered
//! `children` this is enough to reproduce the document order of all text.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A parsed XML document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The document element
    pub root: Element,
}

/// An element node of the document tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Tag name as written in the source (qualified names keep their prefix)
    pub tag: String,
    /// Attributes keyed by their qualified name (e.g. `xlink:href`)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Text between the opening tag and the first child
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Text between the closing tag and the next sibling (or the parent's end)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tail: String,
    /// Child elements in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
}

impl Element {
    /// Create an empty element with the given tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Set the leading text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the tail text
    pub fn with_tail(mut self, tail: impl Into<String>) -> Self {
        self.tail = tail.into();
        self
    }

    /// Add an attribute
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Append a child element
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Case-insensitive tag comparison
    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// Get an attribute value by its exact qualified name
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// First direct child with the given tag
    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(tag))
    }

    /// Index of the first direct child with the given tag
    pub fn position(&self, tag: &str) -> Option<usize> {
        self.children.iter().position(|c| c.is(tag))
    }

    /// All direct children with the given tag
    pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.is(tag))
    }

    /// All text of the subtree in document order, ignoring markup
    ///
    /// Includes the tails of descendants but not this element's own tail.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        out.push_str(&self.text);
        for child in &self.children {
            child.collect_text(out);
            out.push_str(&child.tail);
        }
    }
}

impl Document {
    /// Wrap an element as a document
    pub fn new(root: Element) -> Self {
        Self { root }
    }
}

#[cfg(feature = "json")]
impl Document {
    /// Serialize the document to a JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize the document to a pretty-printed JSON string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
