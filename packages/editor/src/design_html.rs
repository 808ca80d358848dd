//! # Design-Time HTML
//!
//! Renders the parsed markup into the HTML shown on the design surface.
//!
//! ## Rules
//!
//! - Server controls with a sited component render through their designer,
//!   wrapped in a marker `<div>` carrying the site name. Containers such as
//!   `<form runat="server">` wrap their already rendered children instead
//! - `<script>` elements are dropped together with their content
//! - `runat` and `on*` attributes are dropped from literal tags
//! - `<head>` gets the designer context; `<body>` starts with a hidden block
//!   holding the selectable and selected ids as JSON arrays
//! - Text between nodes is copied verbatim from the parsed snapshot
//! - Unterminated elements are closed anyway and reported as warnings

use crate::controls::escape_attribute;
use crate::designer::DesignerRegistry;
use crate::document::DesignSurface;
use formsmith_parser::{Diagnostic, Element, MarkupDocument, Node, ParseError, TagEnd, TextLocation};
use serde::Serialize;
use std::fmt::Write;

pub const INIT_VALUES_ID: &str = "designer_init_values";
pub const SELECTABLE_ITEMS_ID: &str = "designer_selectable_items";
pub const SELECTED_ITEMS_ID: &str = "designer_selected_items";
pub const COMPONENT_MARKER_CLASS: &str = "designer_component";

/// Rendered surface HTML plus anything worth warning the user about
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesignTimeHtml {
    pub html: String,
    pub warnings: Vec<Diagnostic>,
}

pub struct DesignHtmlWriter<'a> {
    parsed: &'a MarkupDocument,
    surface: &'a mut DesignSurface,
    designers: &'a DesignerRegistry,
    context: &'a str,
    selected: &'a [String],
    out: String,
    /// End of the last node written; gap text starts here
    previous: TextLocation,
    warnings: Vec<Diagnostic>,
}

impl<'a> DesignHtmlWriter<'a> {
    pub fn new(
        parsed: &'a MarkupDocument,
        surface: &'a mut DesignSurface,
        designers: &'a DesignerRegistry,
        context: &'a str,
        selected: &'a [String],
    ) -> Self {
        Self {
            parsed,
            surface,
            designers,
            context,
            selected,
            out: String::new(),
            previous: TextLocation::START,
            warnings: Vec::new(),
        }
    }

    /// Render from the first top-level element
    pub fn write(mut self) -> DesignTimeHtml {
        let parsed = self.parsed;
        if let Some(root) = parsed.nodes.iter().find(|node| node.as_element().is_some()) {
            self.write_node(root);
        }
        DesignTimeHtml {
            html: self.out,
            warnings: self.warnings,
        }
    }

    fn write_node(&mut self, node: &Node) {
        self.previous = node.region().end;
        let Node::Element(element) = node else {
            // server blocks, comments and directives have no design-time form
            return;
        };

        if element.name.is("script") {
            self.previous = element.end_location();
            return;
        }

        if element.is_server_control() {
            if let Some(name) = element
                .id()
                .and_then(|id| self.surface.container.canonical_name(id))
                .map(str::to_string)
            {
                self.write_component(element, &name);
                return;
            }
        }

        self.write_open_tag(element);
        match element.end {
            TagEnd::SelfClosing | TagEnd::Void => self.out.push_str(" />"),
            TagEnd::Closed(_) | TagEnd::Unterminated => {
                self.out.push('>');
                if element.name.is("head") {
                    self.out.push_str(self.context);
                }
                if element.name.is("body") {
                    self.write_init_values();
                }
                self.write_body(element);
                let _ = write!(self.out, "</{}>", element.name.full_name());
            }
        }
    }

    fn write_open_tag(&mut self, element: &Element) {
        let _ = write!(self.out, "<{}", element.name.full_name());
        for attr in &element.attributes {
            let name = attr.name.full_name();
            let lower = name.to_ascii_lowercase();
            if lower == "runat" || lower.starts_with("on") {
                continue;
            }
            let _ = write!(self.out, " {}=\"{}\"", name, escape_attribute(&attr.value));
        }
    }

    /// Children with their gap text, then the text up to the closing tag
    fn write_body(&mut self, element: &Element) {
        let parsed = self.parsed;
        for child in &element.children {
            self.out
                .push_str(parsed.text_between(self.previous, child.region().begin));
            self.write_node(child);
        }

        match element.end {
            TagEnd::Closed(closing) => {
                self.out.push_str(parsed.text_between(self.previous, closing.begin));
                self.previous = closing.end;
            }
            TagEnd::Unterminated => {
                tracing::warn!(
                    "<{}> at {} is not closed",
                    element.name,
                    element.region.begin
                );
                self.warnings.push(Diagnostic::warning(
                    ParseError::unterminated_tag(element.name.full_name(), element.region.begin),
                    element.region,
                ));
            }
            TagEnd::SelfClosing | TagEnd::Void => {}
        }
    }

    fn write_component(&mut self, element: &Element, name: &str) {
        let inner = match element.end {
            TagEnd::Closed(_) | TagEnd::Unterminated => {
                let outer = std::mem::take(&mut self.out);
                self.write_body(element);
                Some(std::mem::replace(&mut self.out, outer))
            }
            TagEnd::SelfClosing | TagEnd::Void => None,
        };
        self.previous = self.previous.max(element.end_location());

        let Some(component) = self.surface.container.get_mut(name) else {
            return;
        };
        let designer = self.designers.designer_for(component.type_name());
        let html = inner
            .as_deref()
            .and_then(|inner| component.render_container(name, inner))
            .unwrap_or_else(|| designer.design_time_html(name, component.as_mut()));

        let _ = write!(
            self.out,
            "<div class=\"{}\" data-component-id=\"{}\">{}</div>",
            COMPONENT_MARKER_CLASS, name, html
        );
    }

    fn write_init_values(&mut self) {
        let selectable = self.surface.container.names();
        let selected: Vec<&String> = self
            .selected
            .iter()
            .filter(|name| self.surface.container.contains(name))
            .collect();

        let _ = write!(
            self.out,
            "<div id=\"{}\" style=\"display:none;\"> <span id=\"{}\">{}</span><span id=\"{}\">{}</span></div>",
            INIT_VALUES_ID,
            SELECTABLE_ITEMS_ID,
            json_ids(&selectable),
            SELECTED_ITEMS_ID,
            json_ids(&selected)
        );
    }
}

fn json_ids<T: Serialize>(ids: &[T]) -> String {
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}
