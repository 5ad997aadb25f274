//! docbook2md-core: Core library for converting DocBook-style XML to Markdown
//!
//! This crate provides:
//! - The inline renderer (running text with emphasis, code spans and links)
//! - The block renderer (headings, paragraphs, synopses, code, lists)
//! - Unknown tag diagnostics
//! - The document assembler
//!
//! # Example
//!
//! ```
//! let xml = r#"<article><section><title>Intro</title>
//! <para>Hello <emphasis role="bold">world</emphasis>.</para></section></article>"#;
//!
//! let conversion = docbook2md_core::convert(xml).unwrap();
//! assert_eq!(conversion.markdown, "## Intro\n\nHello **world**.\n");
//! ```

pub mod diagnostics;
pub mod document;
pub mod inline;
pub mod markdown;
pub mod render;
pub mod tag;

pub use diagnostics::{Diagnostics, UnknownTag};
pub use docbook_tree::{Document, Element, ParseError};
pub use document::assemble;
pub use inline::flatten;
pub use render::{ConverterOptions, RenderContext, Renderer};
pub use tag::TagKind;

use thiserror::Error;

/// Conversion errors
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Result of converting one document
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Assembled Markdown text
    pub markdown: String,
    /// Unknown tags met while rendering
    pub diagnostics: Diagnostics,
}

/// Convert XML source to Markdown with default options
pub fn convert(source: &str) -> Result<Conversion, ConvertError> {
    convert_with_options(source, &ConverterOptions::default())
}

/// Convert XML source to Markdown
pub fn convert_with_options(
    source: &str,
    options: &ConverterOptions,
) -> Result<Conversion, ConvertError> {
    let doc = docbook_tree::parse(source)?;
    Ok(document_to_markdown(&doc, options))
}

/// Render an already parsed document
pub fn document_to_markdown(doc: &Document, options: &ConverterOptions) -> Conversion {
    let mut renderer = Renderer::new(options);
    renderer.render(&doc.root, RenderContext::root());
    let (lines, diagnostics) = renderer.finish();

    let table = options.unknown_tag_table.then_some(&diagnostics);
    let markdown = assemble(&lines, table);

    Conversion {
        markdown,
        diagnostics,
    }
}
