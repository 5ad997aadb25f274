//! Lenient XML parser
//!
//! Builds an [`Element`] tree from quick-xml events. The parser recovers from
//! the usual damage found in legacy DocBook sources: DOCTYPE and ENTITY
//! declarations are stripped, bare `&` and `<` characters are escaped,
//! mismatched end tags close the nearest open element with the same name,
//! stray end tags are ignored and elements left open at the end of input are
//! closed implicitly.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::{Captures, Regex};
use thiserror::Error;

use crate::ast::{Document, Element};

/// `<!DOCTYPE name ...>` with an optional internal subset
static DOCTYPE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<!DOCTYPE\s+[^>\[]*(?:\[.*?\]\s*)?>").expect("valid DOCTYPE pattern")
});

/// Stray `<!ENTITY ...>` declarations left outside a DOCTYPE
static ENTITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<!ENTITY\s+[^>]*>").expect("valid ENTITY pattern"));

/// Markup that passes through untouched, or a bare `&` / `<` to escape
///
/// Alternatives are tried in order: CDATA sections, comments and processing
/// instructions are kept whole, then well-formed references and tag openings,
/// and whatever `&` or `<` remains is stray.
static STRAY_MARKUP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<!\[CDATA\[.*?\]\]>|<!--.*?-->|<\?.*?\?>|&(?:[A-Za-z_][\w.-]*;|#[0-9]+;|#[xX][0-9A-Fa-f]+;)|<[A-Za-z_:/!?]|[&<]",
    )
    .expect("valid stray markup pattern")
});

/// Parser errors
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("XML syntax error at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("Document has no root element")]
    NoRootElement,
}

/// Parse result type
pub type ParseResult<T> = Result<T, ParseError>;

/// Parse XML source into a document
pub fn parse(source: &str) -> ParseResult<Document> {
    Parser::new(source).parse()
}

/// Remove DOCTYPE and ENTITY declarations
///
/// External entities are never resolved; references to entities declared
/// there survive as literal `&name;` text.
pub fn strip_declarations(source: &str) -> Cow<'_, str> {
    let without_doctype = DOCTYPE_PATTERN.replace_all(source, "");
    if !ENTITY_PATTERN.is_match(&without_doctype) {
        return without_doctype;
    }
    Cow::Owned(
        ENTITY_PATTERN
            .replace_all(&without_doctype, "")
            .into_owned(),
    )
}

/// Escape `&` and `<` characters that cannot start markup
///
/// `Tom & Jerry` becomes `Tom &amp; Jerry` and `a < b` becomes `a &lt; b`;
/// references, tags, comments and CDATA sections are left alone.
pub fn escape_stray_markup(source: &str) -> Cow<'_, str> {
    STRAY_MARKUP_PATTERN.replace_all(source, |caps: &Captures| match &caps[0] {
        "&" => "&amp;".to_string(),
        "<" => "&lt;".to_string(),
        markup => markup.to_string(),
    })
}

/// Lenient XML parser
pub struct Parser<'a> {
    source: Cow<'a, str>,
}

impl<'a> Parser<'a> {
    /// Create a new parser from source text
    pub fn new(source: &'a str) -> Self {
        let stripped = strip_declarations(source);
        let escaped = match escape_stray_markup(&stripped) {
            Cow::Owned(escaped) => Some(escaped),
            Cow::Borrowed(_) => None,
        };
        Self {
            source: escaped.map_or(stripped, Cow::Owned),
        }
    }

    /// Parse the entire document
    pub fn parse(&self) -> ParseResult<Document> {
        let mut reader = Reader::from_str(&self.source);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        let mut builder = TreeBuilder::default();

        loop {
            let start = reader.buffer_position();
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(quick_xml::Error::IllFormed(e)) => {
                    tracing::debug!(error = %e, "Skipping ill-formed markup");
                    let end = reader.buffer_position();
                    if let Some(text) = skipped_text(&self.source, start, end) {
                        builder.text(text);
                    }
                    continue;
                }
                Err(source) => {
                    let position = reader.error_position();
                    if builder.has_root() {
                        // Keep what was read so far
                        tracing::warn!(
                            position,
                            error = %source,
                            "Truncating document at syntax error"
                        );
                        break;
                    }
                    return Err(ParseError::Xml { position, source });
                }
            };

            match event {
                Event::Start(e) => {
                    let element = decode_element(&reader, &e);
                    builder.open(element);
                }
                Event::Empty(e) => {
                    let element = decode_element(&reader, &e);
                    builder.attach(element);
                }
                Event::End(e) => {
                    let name = decode_name(&reader, e.name().as_ref());
                    builder.close(&name);
                }
                Event::Text(e) => {
                    let text = reader.decoder().decode(&e).map_or_else(
                        |_| String::from_utf8_lossy(&e).into_owned(),
                        Cow::into_owned,
                    );
                    builder.text(&text);
                }
                Event::GeneralRef(e) => {
                    let entity = decode_name(&reader, &e);
                    builder.text(&decode_entity(&entity));
                }
                Event::CData(e) => {
                    builder.text(&String::from_utf8_lossy(&e));
                }
                Event::Eof => break,
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            }
        }

        builder.finish().map(Document::new)
    }
}

/// Stack of open elements
#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Element>,
    root: Option<Element>,
}

impl TreeBuilder {
    fn has_root(&self) -> bool {
        self.root.is_some() || !self.stack.is_empty()
    }

    fn is_complete(&self) -> bool {
        self.root.is_some() && self.stack.is_empty()
    }

    fn open(&mut self, element: Element) {
        if self.is_complete() {
            tracing::debug!(tag = %element.tag, "Ignoring element after the document element");
            return;
        }
        self.stack.push(element);
    }

    fn attach(&mut self, element: Element) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None if self.root.is_none() => self.root = Some(element),
            None => {
                tracing::debug!(tag = %element.tag, "Ignoring element after the document element");
            }
        }
    }

    fn close(&mut self, name: &str) {
        let Some(index) = self.stack.iter().rposition(|e| e.is(name)) else {
            tracing::debug!(tag = name, "Ignoring unmatched end tag");
            return;
        };
        while self.stack.len() > index {
            if let Some(element) = self.stack.pop() {
                self.attach(element);
            }
        }
    }

    fn text(&mut self, text: &str) {
        // Text outside the document element is dropped
        if let Some(node) = self.stack.last_mut() {
            append_text(node, text);
        }
    }

    fn finish(mut self) -> ParseResult<Element> {
        while let Some(element) = self.stack.pop() {
            self.attach(element);
        }
        self.root.ok_or(ParseError::NoRootElement)
    }
}

/// Source text the reader stepped over on a recoverable error
///
/// Skipped markup (anything starting with `<`) is not turned into text.
fn skipped_text(source: &str, start: u64, end: u64) -> Option<&str> {
    let start = usize::try_from(start).ok()?;
    let end = usize::try_from(end).ok()?;
    source
        .get(start..end)
        .filter(|text| !text.is_empty() && !text.starts_with('<'))
}

/// Append text to node's text or last child's tail.
fn append_text(node: &mut Element, text: &str) {
    if let Some(last_child) = node.children.last_mut() {
        last_child.tail.push_str(text);
    } else {
        node.text.push_str(text);
    }
}

fn decode_element(reader: &Reader<&[u8]>, e: &BytesStart) -> Element {
    Element {
        tag: decode_name(reader, e.name().as_ref()),
        attributes: decode_attrs(reader, e),
        ..Default::default()
    }
}

fn decode_name(reader: &Reader<&[u8]>, name: &[u8]) -> String {
    reader.decoder().decode(name).map_or_else(
        |_| String::from_utf8_lossy(name).into_owned(),
        Cow::into_owned,
    )
}

fn decode_attrs(reader: &Reader<&[u8]>, e: &BytesStart) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    for attr in e.attributes().flatten() {
        let key = decode_name(reader, attr.key.as_ref());

        // Skip namespace declarations
        if key.starts_with("xmlns") {
            continue;
        }

        let value = attr.unescape_value().map_or_else(
            |_| String::from_utf8_lossy(&attr.value).into_owned(),
            Cow::into_owned,
        );

        attrs.insert(key, value);
    }
    attrs
}

/// Decode XML entity references to their character values.
fn decode_entity(entity: &str) -> String {
    match entity {
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "amp" => "&".to_string(),
        "apos" => "'".to_string(),
        "quot" => "\"".to_string(),
        "nbsp" => "\u{00a0}".to_string(),
        // Numeric character references
        s if s.starts_with('#') => {
            let code = if s.starts_with("#x") || s.starts_with("#X") {
                u32::from_str_radix(&s[2..], 16).ok()
            } else {
                s[1..].parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{entity};"), |c| c.to_string())
        }
        // Unknown entity - preserve as-is
        _ => format!("&{entity};"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_and_tail() {
        let doc = parse("<para>Hello <emphasis>world</emphasis>.</para>").unwrap();

        let para = &doc.root;
        assert_eq!(para.tag, "para");
        assert_eq!(para.text, "Hello ");
        assert_eq!(para.children.len(), 1);
        assert_eq!(para.children[0].text, "world");
        assert_eq!(para.children[0].tail, ".");
    }

    #[test]
    fn test_parse_attributes() {
        let doc = parse(
            r#"<link xmlns:xlink="http://www.w3.org/1999/xlink" xlink:href="https://example.com">x</link>"#,
        )
        .unwrap();

        assert_eq!(doc.root.attr("xlink:href"), Some("https://example.com"));
        assert_eq!(doc.root.attributes.len(), 1);
    }

    #[test]
    fn test_self_closing_elements() {
        let doc = parse("<para>Before<sbr/>After</para>").unwrap();

        assert_eq!(doc.root.text, "Before");
        assert_eq!(doc.root.children[0].tag, "sbr");
        assert_eq!(doc.root.children[0].tail, "After");
    }

    #[test]
    fn test_self_closing_root() {
        let doc = parse("<article/>").unwrap();
        assert_eq!(doc.root.tag, "article");
        assert!(doc.root.children.is_empty());
    }

    #[test]
    fn test_strip_doctype_with_internal_subset() {
        let source = r#"<?xml version="1.0"?>
<!DOCTYPE article PUBLIC "-//OASIS//DTD DocBook XML V4.5//EN" "docbookx.dtd" [
  <!ENTITY product "Widget">
]>
<article><para>x</para></article>"#;
        let doc = parse(source).unwrap();

        assert_eq!(doc.root.tag, "article");
        assert_eq!(doc.root.children[0].text, "x");
    }

    #[test]
    fn test_strip_stray_entity_declarations() {
        let stripped = strip_declarations(r#"<!ENTITY a "b"><r/>"#);
        assert_eq!(stripped, "<r/>");
    }

    #[test]
    fn test_strip_declarations_borrows_when_unchanged() {
        assert!(matches!(strip_declarations("<r/>"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_entities() {
        let doc = parse("<para>a &lt; b &amp;&amp; &#x41;&#66; &product;</para>").unwrap();
        assert_eq!(doc.root.text, "a < b && AB &product;");
    }

    #[test]
    fn test_cdata() {
        let doc = parse("<programlisting><![CDATA[if (a < b) {}]]></programlisting>").unwrap();
        assert_eq!(doc.root.text, "if (a < b) {}");
    }

    #[test]
    fn test_bare_ampersand_kept_as_text() {
        let doc = parse("<article><para>Tom & Jerry</para><para>after</para></article>").unwrap();

        assert_eq!(doc.root.children.len(), 2);
        assert_eq!(doc.root.children[0].text, "Tom & Jerry");
        assert_eq!(doc.root.children[1].text, "after");
    }

    #[test]
    fn test_unterminated_reference_kept_as_text() {
        let doc = parse("<para>a &amp b</para>").unwrap();
        assert_eq!(doc.root.text, "a &amp b");
    }

    #[test]
    fn test_bare_less_than_kept_as_text() {
        let doc = parse("<article><para>if a < b then</para><para>after</para></article>").unwrap();

        assert_eq!(doc.root.children.len(), 2);
        assert_eq!(doc.root.children[0].text, "if a < b then");
        assert_eq!(doc.root.children[1].text, "after");
    }

    #[test]
    fn test_bare_ampersand_in_attribute() {
        let doc = parse(r#"<link href="search?q=1&page=2">x</link>"#).unwrap();
        assert_eq!(doc.root.attr("href"), Some("search?q=1&page=2"));
    }

    #[test]
    fn test_escape_stray_markup() {
        assert_eq!(escape_stray_markup("Tom & Jerry"), "Tom &amp; Jerry");
        assert_eq!(escape_stray_markup("a < b"), "a &lt; b");
        assert_eq!(escape_stray_markup("&lt;&#65;&#x41;&foo.bar;"), "&lt;&#65;&#x41;&foo.bar;");
        assert_eq!(escape_stray_markup("<a/></b><?pi x?>"), "<a/></b><?pi x?>");
        // CDATA and comments are left exactly as written
        assert_eq!(
            escape_stray_markup("<![CDATA[a && b < c]]><!-- x & y -->"),
            "<![CDATA[a && b < c]]><!-- x & y -->"
        );
    }

    #[test]
    fn test_unclosed_elements_closed_at_eof() {
        let doc = parse("<article><section><para>text").unwrap();

        let section = &doc.root.children[0];
        assert_eq!(section.tag, "section");
        assert_eq!(section.children[0].text, "text");
    }

    #[test]
    fn test_mismatched_end_closes_nearest_match() {
        // </section> closes the dangling <para> as well
        let doc = parse("<article><section><para>one</section><para>two</para></article>").unwrap();

        assert_eq!(doc.root.children.len(), 2);
        assert_eq!(doc.root.children[0].tag, "section");
        assert_eq!(doc.root.children[0].children[0].text, "one");
        assert_eq!(doc.root.children[1].text, "two");
    }

    #[test]
    fn test_stray_end_tag_ignored() {
        let doc = parse("<para>a</emphasis>b</para>").unwrap();
        assert_eq!(doc.root.text, "ab");
    }

    #[test]
    fn test_end_tags_case_insensitive() {
        let doc = parse("<Para>x</PARA>").unwrap();
        assert_eq!(doc.root.tag, "Para");
        assert_eq!(doc.root.text, "x");
    }

    #[test]
    fn test_content_after_root_ignored() {
        let doc = parse("<article><para>a</para></article><article>b</article>").unwrap();
        assert_eq!(doc.root.children.len(), 1);
        assert!(doc.root.tail.is_empty());
    }

    #[test]
    fn test_no_root_element() {
        assert!(matches!(parse(""), Err(ParseError::NoRootElement)));
        assert!(matches!(
            parse("just some text"),
            Err(ParseError::NoRootElement)
        ));
    }

    #[test]
    fn test_whitespace_preserved() {
        let doc = parse("<programlisting>\n  line 1\n\n  line 2\n</programlisting>").unwrap();
        assert_eq!(doc.root.text, "\n  line 1\n\n  line 2\n");
    }
}
