//! # Markup Parser
//!
//! Lenient single-pass parser for page markup.
//!
//! ## Design
//!
//! - The parser scans for `<` and dispatches on what follows; text content is
//!   never copied into the tree
//! - Tag interiors are lexed with [`TagToken`]
//! - Open elements live on a stack; a closing tag pops up to its match,
//!   marking anything it skips as unterminated
//! - Nothing aborts the parse: problems become [`Diagnostic`]s

use crate::ast::{
    decode_entities, Attribute, Comment, Directive, Doctype, Element, MarkupDocument, Node,
    QualifiedName, ServerBlock, ServerBlockKind, TagEnd,
};
use crate::error::{Diagnostic, ParseError};
use crate::location::{Region, SourceText};
use crate::tokenizer::TagToken;
use logos::Logos;

/// Elements that never take a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose content is raw text up to the matching closing tag
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Parse markup into a tree. Never fails; see [`MarkupDocument::diagnostics`].
pub fn parse(source: &str) -> MarkupDocument {
    Parser::new(SourceText::new(source)).parse()
}

/// Parse an existing snapshot without copying it
pub fn parse_source(source: SourceText) -> MarkupDocument {
    Parser::new(source).parse()
}

/// How the lexer stopped inside a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Close,
    SelfClose,
    /// Hit `<` before `>`
    Interrupted,
    Eof,
}

struct TagBody {
    attributes: Vec<Attribute>,
    end: usize,
    terminator: Terminator,
}

/// Attribute name seen but not yet completed
struct PendingAttribute<'a> {
    name: &'a str,
    start: usize,
    end: usize,
    expects_value: bool,
}

pub struct Parser {
    source: SourceText,
    pos: usize,
    nodes: Vec<Node>,
    stack: Vec<Element>,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    pub fn new(source: SourceText) -> Self {
        Self {
            source,
            pos: 0,
            nodes: Vec::new(),
            stack: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn parse(mut self) -> MarkupDocument {
        while let Some(relative) = self.source.as_str()[self.pos..].find('<') {
            let start = self.pos + relative;
            self.parse_markup_at(start);
        }

        while let Some(element) = self.stack.pop() {
            self.close_unterminated(element);
        }

        MarkupDocument::new(self.nodes, self.diagnostics, self.source)
    }

    fn parse_markup_at(&mut self, start: usize) {
        let rest = &self.source.as_str()[start..];

        if rest.starts_with("<%--") {
            self.parse_server_comment(start);
        } else if rest.starts_with("<%@") {
            self.parse_directive(start);
        } else if rest.starts_with("<%") {
            self.parse_server_block(start);
        } else if rest.starts_with("<!--") {
            self.parse_comment(start);
        } else if rest.starts_with("<!") {
            self.parse_doctype(start);
        } else if rest.starts_with("</") && rest[2..].starts_with(is_name_start) {
            self.parse_closing_tag(start);
        } else if rest[1..].starts_with(is_name_start) {
            self.parse_open_tag(start);
        } else {
            // literal `<` in text
            self.pos = start + 1;
        }
    }

    fn region(&self, start: usize, end: usize) -> Region {
        Region::new(self.source.location(start), self.source.location(end))
    }

    fn push_node(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.nodes.push(node),
        }
    }

    /// Position just after `terminator` searching from `from`, or the end of
    /// the text when it never appears
    fn find_end(&self, from: usize, terminator: &str) -> Option<(usize, usize)> {
        self.source.as_str()[from..]
            .find(terminator)
            .map(|relative| (from + relative, from + relative + terminator.len()))
    }

    fn parse_server_comment(&mut self, start: usize) {
        let text_len = self.source.len();
        let (content_end, end) = match self.find_end(start + 4, "--%>") {
            Some(found) => found,
            None => {
                let error = ParseError::UnterminatedComment {
                    location: self.source.location(start),
                };
                self.diagnostics
                    .push(Diagnostic::error(error, self.region(start, text_len)));
                (text_len, text_len)
            }
        };

        let content = self.source.as_str()[start + 4..content_end].to_string();
        let region = self.region(start, end);
        self.push_node(Node::Comment(Comment {
            server: true,
            content,
            region,
        }));
        self.pos = end;
    }

    fn parse_comment(&mut self, start: usize) {
        let text_len = self.source.len();
        let (content_end, end) = match self.find_end(start + 4, "-->") {
            Some(found) => found,
            None => {
                let error = ParseError::UnterminatedComment {
                    location: self.source.location(start),
                };
                self.diagnostics
                    .push(Diagnostic::error(error, self.region(start, text_len)));
                (text_len, text_len)
            }
        };

        let content = self.source.as_str()[start + 4..content_end].to_string();
        let region = self.region(start, end);
        self.push_node(Node::Comment(Comment {
            server: false,
            content,
            region,
        }));
        self.pos = end;
    }

    fn parse_doctype(&mut self, start: usize) {
        let text_len = self.source.len();
        let (content_end, end) = self.find_end(start + 2, ">").unwrap_or((text_len, text_len));
        let content = self.source.as_str()[start + 2..content_end].trim().to_string();
        let region = self.region(start, end);
        self.push_node(Node::Doctype(Doctype { content, region }));
        self.pos = end;
    }

    fn parse_server_block(&mut self, start: usize) {
        let marker = self.source.as_str()[start + 2..].chars().next();
        let (kind, content_start) = match marker {
            Some('=') => (ServerBlockKind::Expression, start + 3),
            Some(':') => (ServerBlockKind::HtmlEncoded, start + 3),
            Some('#') => (ServerBlockKind::DataBinding, start + 3),
            Some('$') => (ServerBlockKind::Resource, start + 3),
            _ => (ServerBlockKind::Code, start + 2),
        };

        let text_len = self.source.len();
        let (content_end, end) = match self.find_end(content_start, "%>") {
            Some(found) => found,
            None => {
                let error = ParseError::UnterminatedServerBlock {
                    location: self.source.location(start),
                };
                self.diagnostics
                    .push(Diagnostic::error(error, self.region(start, text_len)));
                (text_len, text_len)
            }
        };

        let content = self.source.as_str()[content_start..content_end].to_string();
        let region = self.region(start, end);
        self.push_node(Node::ServerBlock(ServerBlock {
            kind,
            content,
            region,
        }));
        self.pos = end;
    }

    fn parse_directive(&mut self, start: usize) {
        let text_len = self.source.len();
        let (body_end, end) = match self.find_end(start + 3, "%>") {
            Some(found) => found,
            None => {
                let error = ParseError::UnterminatedDirective {
                    location: self.source.location(start),
                };
                self.diagnostics
                    .push(Diagnostic::error(error, self.region(start, text_len)));
                (text_len, text_len)
            }
        };

        // `<%@ Name attr=... %>`; a directive without a name is a Page directive
        let text = self.source.as_str();
        let name_start = start
            + 3
            + text[start + 3..body_end]
                .find(|c: char| !c.is_whitespace())
                .unwrap_or(body_end - start - 3);
        let name_len = text[name_start..body_end]
            .find(|c: char| !is_name_char(c))
            .unwrap_or(body_end - name_start);
        let after_name = text[name_start + name_len..body_end].trim_start();

        let (name, attributes_start) = if name_len == 0 || after_name.starts_with('=') {
            ("Page".to_string(), name_start)
        } else {
            (
                text[name_start..name_start + name_len].to_string(),
                name_start + name_len,
            )
        };

        let body = self.scan_attributes(attributes_start, body_end);
        let region = self.region(start, end);
        self.push_node(Node::Directive(Directive {
            name,
            attributes: body.attributes,
            region,
        }));
        self.pos = end;
    }

    fn parse_closing_tag(&mut self, start: usize) {
        let text = self.source.as_str();
        let name_start = start + 2;
        let name_len = text[name_start..]
            .find(|c: char| !is_name_char(c))
            .unwrap_or(text.len() - name_start);
        let name = text[name_start..name_start + name_len].to_string();
        let end = self
            .find_end(name_start + name_len, ">")
            .map(|(_, end)| end)
            .unwrap_or(text.len());
        let region = self.region(start, end);
        self.pos = end;

        let Some(index) = self
            .stack
            .iter()
            .rposition(|open| open.name.full_name().eq_ignore_ascii_case(&name))
        else {
            let error = ParseError::StrayClosingTag {
                name,
                location: region.begin,
            };
            self.diagnostics.push(Diagnostic::warning(error, region));
            return;
        };

        while self.stack.len() > index + 1 {
            if let Some(skipped) = self.stack.pop() {
                self.close_unterminated(skipped);
            }
        }

        if let Some(mut element) = self.stack.pop() {
            element.end = TagEnd::Closed(region);
            self.push_node(Node::Element(element));
        }
    }

    fn close_unterminated(&mut self, mut element: Element) {
        let error = ParseError::unterminated_tag(element.name.full_name(), element.region.begin);
        self.diagnostics
            .push(Diagnostic::warning(error, element.region));
        element.end = TagEnd::Unterminated;
        self.push_node(Node::Element(element));
    }

    fn parse_open_tag(&mut self, start: usize) {
        let text = self.source.as_str();
        let name_start = start + 1;
        let name_len = text[name_start..]
            .find(|c: char| !is_name_char(c))
            .unwrap_or(text.len() - name_start);
        let raw_name = &text[name_start..name_start + name_len];
        let name = QualifiedName::parse(raw_name);

        let body = self.scan_attributes(name_start + name_len, text.len());
        let region = self.region(start, body.end);

        if matches!(body.terminator, Terminator::Interrupted | Terminator::Eof) {
            let error = ParseError::malformed_tag(raw_name, region.begin, "expected `>`");
            self.diagnostics.push(Diagnostic::error(error, region));
        }

        let mut element = Element {
            name,
            attributes: body.attributes,
            children: Vec::new(),
            region,
            end: TagEnd::Unterminated,
        };
        self.pos = body.end;

        if body.terminator == Terminator::SelfClose {
            element.end = TagEnd::SelfClosing;
            self.push_node(Node::Element(element));
            return;
        }

        let plain = !element.name.has_prefix();
        let local = element.name.local.to_ascii_lowercase();

        if plain && VOID_ELEMENTS.contains(&local.as_str()) {
            element.end = TagEnd::Void;
            self.push_node(Node::Element(element));
        } else if plain && RAW_TEXT_ELEMENTS.contains(&local.as_str()) {
            self.parse_raw_text_element(element, &local);
        } else {
            self.stack.push(element);
        }
    }

    /// `<script>`/`<style>`: everything up to the matching closing tag is text
    fn parse_raw_text_element(&mut self, mut element: Element, local: &str) {
        let needle = format!("</{}", local);
        match find_ignore_case(&self.source.as_str()[self.pos..], &needle) {
            Some(relative) => {
                let close_start = self.pos + relative;
                let close_end = self
                    .find_end(close_start + needle.len(), ">")
                    .map(|(_, end)| end)
                    .unwrap_or(self.source.len());
                element.end = TagEnd::Closed(self.region(close_start, close_end));
                self.pos = close_end;
                self.push_node(Node::Element(element));
            }
            None => {
                self.pos = self.source.len();
                self.close_unterminated(element);
            }
        }
    }

    /// Lex attributes from `from` until the tag ends or `limit` is reached
    fn scan_attributes(&self, from: usize, limit: usize) -> TagBody {
        let slice = &self.source.as_str()[from..limit];
        let mut attributes = Vec::new();
        let mut pending: Option<PendingAttribute> = None;

        let finish = |pending: PendingAttribute, value: &str, end: usize| Attribute {
            name: QualifiedName::parse(pending.name),
            value: decode_entities(value).into_owned(),
            region: self.region(pending.start, end),
        };

        for (result, span) in TagToken::lexer(slice).spanned() {
            let (token_start, token_end) = (from + span.start, from + span.end);
            let Ok(token) = result else {
                continue;
            };

            let terminator = match token {
                TagToken::Close => Some(Terminator::Close),
                TagToken::SelfClose => Some(Terminator::SelfClose),
                TagToken::Open => Some(Terminator::Interrupted),
                _ => None,
            };
            if let Some(terminator) = terminator {
                if let Some(open) = pending.take() {
                    let end = open.end;
                    attributes.push(finish(open, "", end));
                }
                let end = if terminator == Terminator::Interrupted {
                    token_start
                } else {
                    token_end
                };
                return TagBody {
                    attributes,
                    end,
                    terminator,
                };
            }

            let expects_value = pending.as_ref().is_some_and(|open| open.expects_value);
            match token {
                TagToken::Equals => {
                    if let Some(open) = pending.as_mut() {
                        open.expects_value = true;
                    }
                }
                token if expects_value && token.value().is_some() => {
                    let value = token.value().unwrap_or_default();
                    if let Some(open) = pending.take() {
                        attributes.push(finish(open, value, token_end));
                    }
                }
                TagToken::Name(name) => {
                    if let Some(open) = pending.take() {
                        let end = open.end;
                        attributes.push(finish(open, "", end));
                    }
                    pending = Some(PendingAttribute {
                        name,
                        start: token_start,
                        end: token_end,
                        expects_value: false,
                    });
                }
                _ => {}
            }
        }

        if let Some(open) = pending.take() {
            let end = open.end;
            attributes.push(finish(open, "", end));
        }

        TagBody {
            attributes,
            end: limit,
            terminator: Terminator::Eof,
        }
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '.' | '-')
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}
