use crate::location::{Region, SourceText, TextLocation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

/// Problems found while parsing markup.
///
/// The parser is lenient: none of these abort a parse. They are collected as
/// [`Diagnostic`]s on the resulting tree.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParseError {
    #[error("Element <{name}> opened at {location} has no closing tag")]
    UnterminatedTag { name: String, location: TextLocation },

    #[error("Closing tag </{name}> at {location} does not match any open element")]
    StrayClosingTag { name: String, location: TextLocation },

    #[error("Malformed tag <{name}> at {location}: {message}")]
    MalformedTag {
        name: String,
        location: TextLocation,
        message: String,
    },

    #[error("Comment opened at {location} is never closed")]
    UnterminatedComment { location: TextLocation },

    #[error("Server block opened at {location} is never closed")]
    UnterminatedServerBlock { location: TextLocation },

    #[error("Directive opened at {location} is never closed")]
    UnterminatedDirective { location: TextLocation },
}

impl ParseError {
    pub fn unterminated_tag(name: impl Into<String>, location: TextLocation) -> Self {
        Self::UnterminatedTag {
            name: name.into(),
            location,
        }
    }

    pub fn malformed_tag(
        name: impl Into<String>,
        location: TextLocation,
        message: impl Into<String>,
    ) -> Self {
        Self::MalformedTag {
            name: name.into(),
            location,
            message: message.into(),
        }
    }

    /// Short label shown under the offending span
    fn label(&self) -> String {
        match self {
            ParseError::UnterminatedTag { name, .. } => format!("<{}> is never closed", name),
            ParseError::StrayClosingTag { .. } => "no matching open element".to_string(),
            ParseError::MalformedTag { message, .. } => message.clone(),
            ParseError::UnterminatedComment { .. } => "expected `-->`".to_string(),
            ParseError::UnterminatedServerBlock { .. } => "expected `%>`".to_string(),
            ParseError::UnterminatedDirective { .. } => "expected `%>`".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

/// A recoverable problem attached to a parsed tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub error: ParseError,
    pub region: Region,
}

impl Diagnostic {
    pub fn warning(error: ParseError, region: Region) -> Self {
        Self {
            severity: Severity::Warning,
            error,
            region,
        }
    }

    pub fn error(error: ParseError, region: Region) -> Self {
        Self {
            severity: Severity::Error,
            error,
            region,
        }
    }

    pub fn is_unterminated_tag(&self) -> bool {
        matches!(self.error, ParseError::UnterminatedTag { .. })
    }
}

/// Pretty-print diagnostics with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_diagnostics(source: &SourceText, filename: &str, diagnostics: &[Diagnostic]) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let text = source.as_str();
    // ariadne addresses characters, not bytes
    let char_offset = |location: TextLocation| text[..source.offset(location)].chars().count();

    let mut output = Vec::new();

    for diagnostic in diagnostics {
        let start = char_offset(diagnostic.region.begin);
        let end = char_offset(diagnostic.region.end).max(start + 1);
        let (kind, color) = match diagnostic.severity {
            Severity::Warning => (ReportKind::Warning, Color::Yellow),
            Severity::Error => (ReportKind::Error, Color::Red),
        };

        let report = Report::build(kind, filename, start)
            .with_message(diagnostic.error.to_string())
            .with_label(
                Label::new((filename, start..end))
                    .with_color(color)
                    .with_message(diagnostic.error.label()),
            )
            .finish();

        if report
            .write((filename, Source::from(text)), &mut output)
            .is_err()
        {
            break;
        }
    }

    String::from_utf8(output).unwrap_or_else(|_| "Error formatting failed".to_string())
}

/// Plain one-line-per-diagnostic rendering
#[cfg(not(feature = "pretty-errors"))]
pub fn format_diagnostics(_source: &SourceText, filename: &str, diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|diagnostic| format!("{}:{}: {}\n", filename, diagnostic.region.begin, diagnostic.error))
        .collect()
}
