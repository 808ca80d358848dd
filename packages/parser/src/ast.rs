use crate::error::Diagnostic;
use crate::location::{Region, SourceText, TextLocation};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Element or attribute name with an optional namespace prefix (`asp:Button`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub prefix: Option<String>,
    pub local: String,
}

impl QualifiedName {
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => Self {
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
            },
            _ => Self {
                prefix: None,
                local: raw.to_string(),
            },
        }
    }

    pub fn has_prefix(&self) -> bool {
        self.prefix.is_some()
    }

    pub fn full_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }

    /// Case-insensitive comparison of the local name
    pub fn is(&self, local: &str) -> bool {
        self.local.eq_ignore_ascii_case(local)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Attribute on an element or directive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: QualifiedName,
    /// Value with character references decoded; `region` still covers the
    /// text as written
    pub value: String,
    /// Whole `name="value"` span
    pub region: Region,
}

/// Decode the character references an attribute value may carry (`&amp;`,
/// `&#34;`, `&#x3C;`). Unknown or malformed references stay as written.
pub fn decode_entities(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest[1..]
            .find(';')
            .filter(|&end| end > 0 && end <= 10)
            .and_then(|end| decode_reference(&rest[1..1 + end]).map(|ch| (ch, end + 2)));
        match decoded {
            Some((ch, len)) => {
                out.push(ch);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(|c: char| c == 'x' || c == 'X') {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// How an element's markup ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagEnd {
    /// `<tag />`
    SelfClosing,
    /// Matching closing tag at this region
    Closed(Region),
    /// HTML void element that never takes a closing tag (`<br>`)
    Void,
    /// No closing tag was found
    Unterminated,
}

/// Markup element. `region` covers the opening tag only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub name: QualifiedName,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    pub region: Region,
    pub end: TagEnd,
}

impl Element {
    /// Case-insensitive attribute lookup
    pub fn attribute_ci(&self, key: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|attr| attr.name.full_name().eq_ignore_ascii_case(key))
    }

    /// Case-insensitive attribute value, empty when absent
    pub fn attribute_value_ci(&self, key: &str) -> &str {
        self.attribute_ci(key)
            .map(|attr| attr.value.as_str())
            .unwrap_or("")
    }

    pub fn is_run_at_server(&self) -> bool {
        self.attributes.iter().any(|attr| {
            attr.name.full_name().eq_ignore_ascii_case("runat")
                && attr.value.eq_ignore_ascii_case("server")
        })
    }

    /// Server controls carry a namespace prefix or `runat="server"`. A
    /// `<script runat="server">` holds page code, not a control.
    pub fn is_server_control(&self) -> bool {
        !self.name.is("script") && (self.name.has_prefix() || self.is_run_at_server())
    }

    /// Non-empty `id` attribute value
    pub fn id(&self) -> Option<&str> {
        let id = self.attribute_value_ci("id");
        (!id.is_empty()).then_some(id)
    }

    pub fn is_self_closing(&self) -> bool {
        matches!(self.end, TagEnd::SelfClosing)
    }

    pub fn closing_tag(&self) -> Option<Region> {
        match self.end {
            TagEnd::Closed(region) => Some(region),
            _ => None,
        }
    }

    /// Region from the opening tag through the closing tag, if the element is
    /// properly terminated
    pub fn outer_region(&self) -> Option<Region> {
        match self.end {
            TagEnd::SelfClosing | TagEnd::Void => Some(self.region),
            TagEnd::Closed(closing) => Some(Region::new(self.region.begin, closing.end)),
            TagEnd::Unterminated => None,
        }
    }

    /// Where the element's markup ends; the opening tag end for unterminated
    /// elements
    pub fn end_location(&self) -> TextLocation {
        self.outer_region()
            .map(|region| region.end)
            .unwrap_or(self.region.end)
    }

    /// Depth-first iterator over descendant elements
    pub fn descendants(&self) -> Elements<'_> {
        Elements::new(&self.children)
    }
}

/// `<%@ Page ... %>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub region: Region,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerBlockKind {
    /// `<% ... %>`
    Code,
    /// `<%= ... %>`
    Expression,
    /// `<%: ... %>`
    HtmlEncoded,
    /// `<%# ... %>`
    DataBinding,
    /// `<%$ ... %>`
    Resource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerBlock {
    pub kind: ServerBlockKind,
    pub content: String,
    pub region: Region,
}

/// HTML (`<!-- -->`) or server (`<%-- --%>`) comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub server: bool,
    pub content: String,
    pub region: Region,
}

/// `<!DOCTYPE ...>` and other `<!...>` declarations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctype {
    pub content: String,
    pub region: Region,
}

/// Markup node. Text is not a node; it is whatever lies between node regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    Element(Element),
    Directive(Directive),
    ServerBlock(ServerBlock),
    Comment(Comment),
    Doctype(Doctype),
}

impl Node {
    /// Opening region (the whole node for everything but elements)
    pub fn region(&self) -> Region {
        match self {
            Node::Element(element) => element.region,
            Node::Directive(directive) => directive.region,
            Node::ServerBlock(block) => block.region,
            Node::Comment(comment) => comment.region,
            Node::Doctype(doctype) => doctype.region,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// Depth-first, document-order iterator over elements
pub struct Elements<'a> {
    stack: Vec<std::slice::Iter<'a, Node>>,
}

impl<'a> Elements<'a> {
    fn new(nodes: &'a [Node]) -> Self {
        Self {
            stack: vec![nodes.iter()],
        }
    }
}

impl<'a> Iterator for Elements<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let iter = self.stack.last_mut()?;
            match iter.next() {
                Some(Node::Element(element)) => {
                    self.stack.push(element.children.iter());
                    return Some(element);
                }
                Some(_) => continue,
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Parsed markup together with the source snapshot it describes
#[derive(Debug, Clone)]
pub struct MarkupDocument {
    pub nodes: Vec<Node>,
    pub diagnostics: Vec<Diagnostic>,
    source: SourceText,
}

impl MarkupDocument {
    pub fn new(nodes: Vec<Node>, diagnostics: Vec<Diagnostic>, source: SourceText) -> Self {
        Self {
            nodes,
            diagnostics,
            source,
        }
    }

    pub fn source(&self) -> &SourceText {
        &self.source
    }

    /// First top-level element (normally `<html>`)
    pub fn root_element(&self) -> Option<&Element> {
        self.nodes.iter().find_map(Node::as_element)
    }

    pub fn elements(&self) -> Elements<'_> {
        Elements::new(&self.nodes)
    }

    /// All directives, wherever they appear
    pub fn directives(&self) -> Vec<&Directive> {
        let mut found = Vec::new();
        collect_directives(&self.nodes, &mut found);
        found
    }

    /// Server-control tag whose `id` matches, case-insensitively
    pub fn find_control_tag(&self, id: &str) -> Option<&Element> {
        self.elements().find(|element| {
            element.is_server_control()
                && element
                    .id()
                    .is_some_and(|current| current.eq_ignore_ascii_case(id))
        })
    }

    pub fn server_controls(&self) -> impl Iterator<Item = &Element> {
        self.elements().filter(|element| element.is_server_control())
    }

    /// Source text between two locations of this snapshot
    pub fn text_between(&self, begin: TextLocation, end: TextLocation) -> &str {
        self.source.slice(begin, end)
    }

    pub fn has_warnings(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

fn collect_directives<'a>(nodes: &'a [Node], found: &mut Vec<&'a Directive>) {
    for node in nodes {
        match node {
            Node::Directive(directive) => found.push(directive),
            Node::Element(element) => collect_directives(&element.children, found),
            _ => {}
        }
    }
}
