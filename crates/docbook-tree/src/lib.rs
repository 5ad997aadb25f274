//! docbook-tree: Lenient parser for DocBook-style XML
//!
//! This crate provides:
//! - A mixed-content element tree (text, tail, ordered children)
//! - A recovering parser built on quick-xml
//!
//! # Example
//!
//! ```
//! use docbook_tree::parse;
//!
//! let doc = parse("<para>Hello <emphasis>world</emphasis>.</para>").unwrap();
//! assert_eq!(doc.root.text, "Hello ");
//! assert_eq!(doc.root.children[0].tail, ".");
//! ```

pub mod ast;
pub mod parser;

// Re-export main types for convenient access
pub use ast::{Document, Element};
pub use parser::{ParseError, ParseResult, Parser, parse, strip_declarations};
