//! Unknown tag diagnostics
//!
//! Aggregates every tag the block renderer has no rule for. Each conversion
//! owns its own collector; batch tools merge them afterwards.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::markdown;

/// Parent name recorded for an unknown document element
pub const NO_PARENT: &str = "none";

/// Column headers of the diagnostics table
pub const TABLE_HEADERS: [&str; 4] = ["Tag", "Count", "Attributes", "Parent Tags"];

/// Aggregate record for one unknown tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnknownTag {
    /// Number of occurrences
    pub count: usize,
    /// Union of observed attribute key/value pairs
    pub attributes: BTreeSet<(String, String)>,
    /// Union of observed parent tag names
    pub parents: BTreeSet<String>,
}

/// Unknown tags keyed by lower-cased tag name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    tags: BTreeMap<String, UnknownTag>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of an unknown tag
    pub fn record<'a>(
        &mut self,
        tag: &str,
        attributes: impl IntoIterator<Item = (&'a String, &'a String)>,
        parent: Option<&str>,
    ) {
        let entry = self.tags.entry(tag.to_lowercase()).or_default();
        entry.count += 1;
        entry
            .attributes
            .extend(attributes.into_iter().map(|(k, v)| (k.clone(), v.clone())));
        entry.parents.insert(
            parent
                .map(str::to_lowercase)
                .unwrap_or_else(|| NO_PARENT.to_string()),
        );
    }

    /// Fold another collector into this one
    pub fn merge(&mut self, other: Diagnostics) {
        for (tag, record) in other.tags {
            let entry = self.tags.entry(tag).or_default();
            entry.count += record.count;
            entry.attributes.extend(record.attributes);
            entry.parents.extend(record.parents);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn get(&self, tag: &str) -> Option<&UnknownTag> {
        self.tags.get(&tag.to_lowercase())
    }

    /// Records sorted by tag name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &UnknownTag)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Render the records as a Markdown pipe table, sorted by tag name
    ///
    /// Returns `None` when nothing was recorded.
    pub fn to_markdown_table(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let mut rows = vec![
            markdown::table_row(&TABLE_HEADERS),
            markdown::table_separator(&TABLE_HEADERS),
        ];
        for (tag, record) in self.iter() {
            rows.push(markdown::table_row(&[
                tag.to_string(),
                record.count.to_string(),
                record.attributes_cell(),
                record.parents_cell(),
            ]));
        }
        Some(rows.join("\n"))
    }
}

impl UnknownTag {
    fn attributes_cell(&self) -> String {
        self.attributes
            .iter()
            .map(|(k, v)| format!("{k}='{v}'"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn parents_cell(&self) -> String {
        if self.parents.is_empty() {
            return NO_PARENT.to_string();
        }
        self.parents.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_record_aggregates() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.record("foo", &attrs(&[("attr", "1")]), Some("bar"));
        diagnostics.record("FOO", &attrs(&[("attr", "1"), ("x", "y")]), Some("baz"));

        assert_eq!(diagnostics.len(), 1);
        let foo = diagnostics.get("foo").unwrap();
        assert_eq!(foo.count, 2);
        assert_eq!(foo.attributes.len(), 2);
        assert_eq!(
            foo.parents.iter().collect::<Vec<_>>(),
            vec!["bar", "baz"]
        );
    }

    #[test]
    fn test_merge_unions_sets() {
        let mut first = Diagnostics::new();
        first.record("foo", &attrs(&[("attr", "1")]), Some("bar"));
        let mut second = Diagnostics::new();
        second.record("foo", &attrs(&[("attr", "1")]), Some("bar"));
        second.record("qux", &attrs(&[]), None);

        first.merge(second);

        let foo = first.get("foo").unwrap();
        assert_eq!(foo.count, 2);
        assert_eq!(foo.attributes.len(), 1);
        assert_eq!(foo.parents.len(), 1);
        assert_eq!(first.get("qux").unwrap().count, 1);
    }

    #[test]
    fn test_table_sorted_by_tag() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.record("zeta", &attrs(&[]), None);
        diagnostics.record("alpha", &attrs(&[("b", "2"), ("a", "1")]), Some("section"));

        let table = diagnostics.to_markdown_table().unwrap();
        assert_eq!(
            table,
            "| Tag | Count | Attributes | Parent Tags |\n\
             |-----|-------|------------|-------------|\n\
             | alpha | 1 | a='1', b='2' | section |\n\
             | zeta | 1 |  | none |"
        );
    }

    #[test]
    fn test_empty_has_no_table() {
        assert!(Diagnostics::new().to_markdown_table().is_none());
    }

    #[test]
    fn test_serialize_json() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.record("foo", &attrs(&[("attr", "1")]), Some("bar"));

        let json = serde_json::to_string(&diagnostics).unwrap();
        assert_eq!(
            json,
            r#"{"foo":{"count":1,"attributes":[["attr","1"]],"parents":["bar"]}}"#
        );
    }
}
