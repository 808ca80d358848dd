//! # Formsmith Markup Parser
//!
//! Parses web-forms page markup (HTML with server controls, directives and
//! server blocks) into a read-only tree whose nodes carry 1-based line/column
//! regions.
//!
//! ## Design
//!
//! - Lenient: malformed markup yields [`Diagnostic`]s, never a failed parse
//! - Regions describe the text at the moment of parsing; any edit to the
//!   buffer makes them stale
//! - Each [`MarkupDocument`] owns the [`SourceText`] it was parsed from

pub mod ast;
pub mod error;
pub mod location;
pub mod parser;
pub mod tokenizer;

pub use ast::{
    decode_entities, Attribute, Comment, Directive, Doctype, Element, MarkupDocument, Node,
    QualifiedName, ServerBlock, ServerBlockKind, TagEnd,
};
pub use error::{format_diagnostics, Diagnostic, ParseError, ParseResult, Severity};
pub use location::{Region, SourceText, TextLocation};
pub use parser::{parse, parse_source, Parser};
pub use tokenizer::{tokenize, TagToken};
