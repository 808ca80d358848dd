//! Error types for the editor

use formsmith_parser::TextLocation;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("The designer host has already been activated")]
    AlreadyActivated,

    #[error("The designer host has no document loaded")]
    NotLoaded,

    #[error("The designer host must be reset before loading a new document")]
    HostNotReset,

    #[error("Transaction '{closing}' closed while '{open}' is still open")]
    TransactionOutOfOrder { closing: String, open: String },

    #[error("Transaction '{0}' has already been closed")]
    TransactionClosed(String),

    #[error("A component named '{0}' already exists")]
    DuplicateName(String),

    #[error("'{0}' is not a valid component name")]
    InvalidName(String),

    #[error("Pages cannot be added as components; use a new file instead ({0})")]
    PageNotAllowed(String),

    #[error("No component type is registered for '{0}'")]
    UnknownType(String),

    #[error("Component '{0}' does not exist")]
    ComponentNotFound(String),

    #[error("Component '{component}' has no property '{property}'")]
    PropertyNotFound { component: String, property: String },

    #[error("No control tag with id '{0}' in the document")]
    TagNotFound(String),

    #[error("Tag <{name}> at {location} has no closing tag")]
    UnterminatedTag { name: String, location: TextLocation },

    #[error("Only one {0} directive is allowed per document")]
    DuplicateDirective(String),

    #[error("No directive with placeholder key {0}")]
    UnknownDirective(usize),

    #[error("The document has no <body> to insert controls into")]
    NoInsertionPoint,

    #[error("Control scan did not settle after {0} passes")]
    ScanDidNotConverge(usize),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Text buffer owner is gone")]
    OwnerGone,

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for EditorError {
    fn from(e: std::io::Error) -> Self {
        EditorError::Io(e.to_string())
    }
}

/// Failure converting between markup strings and typed property values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("'{value}' is not a valid {kind}")]
    InvalidValue { kind: &'static str, value: String },

    #[error("Property '{0}' has no string converter")]
    NoConverter(String),

    #[error("Expected a {expected} value, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

pub type EditorResult<T> = Result<T, EditorError>;
