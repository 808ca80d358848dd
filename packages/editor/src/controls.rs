//! Built-in control types and the standard registry

use crate::component::{
    Component, ComponentKind, ControlRegistry, EventDescriptor, Initializable, PreRenderable,
    PropertyBag, PropertyDescriptor, TypeDescriptor,
};
use formsmith_parser::Element;
use std::fmt::Write;

pub const ASP_PREFIX: &str = "asp";

const TEXT_MODES: &[&str] = &["SingleLine", "MultiLine", "Password"];

/// Registry with the page type and every built-in control
pub fn standard_registry() -> ControlRegistry {
    let mut registry = ControlRegistry::new();
    registry.register(page_descriptor());
    registry.register(button_descriptor());
    registry.register(label_descriptor());
    registry.register(text_box_descriptor());
    registry.register(check_box_descriptor());
    registry.register(hyper_link_descriptor());
    registry.register(place_holder_descriptor());
    registry.register(html_form_descriptor());
    registry.set_html_fallback(html_generic_descriptor());
    registry
}

/// Escape text for use inside a double-quoted attribute
pub fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// ` name="value"` when `value` is non-empty
fn optional_attribute(out: &mut String, name: &str, value: &str) {
    if !value.is_empty() {
        let _ = write!(out, " {}=\"{}\"", name, escape_attribute(value));
    }
}

/// Common appearance properties shared by web controls
fn web_control_properties(mut extra: Vec<PropertyDescriptor>) -> Vec<PropertyDescriptor> {
    let mut properties = vec![
        PropertyDescriptor::string("CssClass", ""),
        PropertyDescriptor::string("ToolTip", ""),
        PropertyDescriptor::bool("Enabled", true),
        PropertyDescriptor::bool("Visible", true),
    ];
    properties.append(&mut extra);
    properties
}

fn web_control_attributes(out: &mut String, properties: &PropertyBag) {
    optional_attribute(out, "class", &properties.get_str("CssClass"));
    optional_attribute(out, "title", &properties.get_str("ToolTip"));
    if !properties.get_bool("Enabled") {
        out.push_str(" disabled=\"disabled\"");
    }
}

// ---------------------------------------------------------------------------
// Page

/// Root component of a design surface
#[derive(Debug)]
pub struct Page {
    properties: PropertyBag,
    controls: Vec<String>,
}

pub fn page_descriptor() -> TypeDescriptor {
    TypeDescriptor {
        type_name: "Page",
        tag_prefix: None,
        tag_name: "Page",
        kind: ComponentKind::Page,
        properties: vec![PropertyDescriptor::string("Title", "")],
        events: vec![EventDescriptor { name: "Load" }],
        factory: |descriptor| {
            Box::new(Page {
                properties: PropertyBag::new(descriptor),
                controls: Vec::new(),
            })
        },
    }
}

impl Component for Page {
    fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }

    fn render(&self, _site_name: &str) -> String {
        String::new()
    }

    fn child_controls(&self) -> &[String] {
        &self.controls
    }

    fn child_controls_mut(&mut self) -> Option<&mut Vec<String>> {
        Some(&mut self.controls)
    }
}

// ---------------------------------------------------------------------------
// Button

#[derive(Debug)]
pub struct Button {
    properties: PropertyBag,
}

pub fn button_descriptor() -> TypeDescriptor {
    TypeDescriptor {
        type_name: "Button",
        tag_prefix: Some(ASP_PREFIX),
        tag_name: "Button",
        kind: ComponentKind::Control,
        properties: web_control_properties(vec![
            PropertyDescriptor::string("Text", ""),
            PropertyDescriptor::string("CommandName", ""),
            PropertyDescriptor::bool("CausesValidation", true),
        ]),
        events: vec![EventDescriptor { name: "Click" }, EventDescriptor { name: "Command" }],
        factory: |descriptor| {
            Box::new(Button {
                properties: PropertyBag::new(descriptor),
            })
        },
    }
}

impl Component for Button {
    fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }

    fn render(&self, site_name: &str) -> String {
        if !self.properties.get_bool("Visible") {
            return String::new();
        }
        let mut out = format!(
            "<input type=\"submit\" name=\"{0}\" value=\"{1}\" id=\"{0}\"",
            escape_attribute(site_name),
            escape_attribute(&self.properties.get_str("Text"))
        );
        web_control_attributes(&mut out, &self.properties);
        out.push_str(" />");
        out
    }

    fn as_initializable(&mut self) -> Option<&mut dyn Initializable> {
        Some(self)
    }
}

impl Initializable for Button {
    fn initialize(&mut self, _site_name: &str) {
        if self.properties.get_str("Text").is_empty() {
            let _ = self.properties.set("Text", "Button".into());
        }
    }
}

// ---------------------------------------------------------------------------
// Label

#[derive(Debug)]
pub struct Label {
    properties: PropertyBag,
}

pub fn label_descriptor() -> TypeDescriptor {
    TypeDescriptor {
        type_name: "Label",
        tag_prefix: Some(ASP_PREFIX),
        tag_name: "Label",
        kind: ComponentKind::Control,
        properties: web_control_properties(vec![
            PropertyDescriptor::string("Text", ""),
            PropertyDescriptor::string("AssociatedControlID", ""),
        ]),
        events: vec![EventDescriptor { name: "Load" }],
        factory: |descriptor| {
            Box::new(Label {
                properties: PropertyBag::new(descriptor),
            })
        },
    }
}

impl Component for Label {
    fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }

    fn render(&self, site_name: &str) -> String {
        if !self.properties.get_bool("Visible") {
            return String::new();
        }
        let associated = self.properties.get_str("AssociatedControlID");
        let tag = if associated.is_empty() { "span" } else { "label" };

        let mut out = format!("<{} id=\"{}\"", tag, escape_attribute(site_name));
        optional_attribute(&mut out, "for", &associated);
        web_control_attributes(&mut out, &self.properties);
        // label text is markup, not encoded
        let _ = write!(out, ">{}</{}>", self.properties.get_str("Text"), tag);
        out
    }

    fn as_initializable(&mut self) -> Option<&mut dyn Initializable> {
        Some(self)
    }
}

impl Initializable for Label {
    fn initialize(&mut self, _site_name: &str) {
        if self.properties.get_str("Text").is_empty() {
            let _ = self.properties.set("Text", "Label".into());
        }
    }
}

// ---------------------------------------------------------------------------
// TextBox

#[derive(Debug)]
pub struct TextBox {
    properties: PropertyBag,
}

pub fn text_box_descriptor() -> TypeDescriptor {
    TypeDescriptor {
        type_name: "TextBox",
        tag_prefix: Some(ASP_PREFIX),
        tag_name: "TextBox",
        kind: ComponentKind::Control,
        properties: web_control_properties(vec![
            PropertyDescriptor::string("Text", ""),
            PropertyDescriptor::enumeration("TextMode", TEXT_MODES, "SingleLine"),
            PropertyDescriptor::int("MaxLength", 0),
            PropertyDescriptor::int("Columns", 0),
            PropertyDescriptor::int("Rows", 0),
            PropertyDescriptor::bool("ReadOnly", false),
            PropertyDescriptor::bool("AutoPostBack", false),
        ]),
        events: vec![EventDescriptor { name: "TextChanged" }],
        factory: |descriptor| {
            Box::new(TextBox {
                properties: PropertyBag::new(descriptor),
            })
        },
    }
}

impl TextBox {
    pub fn text_mode(&self) -> String {
        self.properties.get_str("TextMode")
    }
}

impl Component for TextBox {
    fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }

    fn render(&self, site_name: &str) -> String {
        if !self.properties.get_bool("Visible") {
            return String::new();
        }
        let id = escape_attribute(site_name);
        let text = self.properties.get_str("Text");
        let positive = |name: &str| {
            let value = self.properties.get_int(name);
            if value > 0 {
                value.to_string()
            } else {
                String::new()
            }
        };

        let mut out = match self.text_mode().as_str() {
            "MultiLine" => {
                let mut out = format!("<textarea name=\"{0}\" id=\"{0}\"", id);
                optional_attribute(&mut out, "rows", &positive("Rows"));
                optional_attribute(&mut out, "cols", &positive("Columns"));
                out
            }
            mode => {
                let kind = if mode == "Password" { "password" } else { "text" };
                let mut out = format!("<input name=\"{0}\" type=\"{1}\"", id, kind);
                // password boxes never echo their value
                if kind == "text" {
                    optional_attribute(&mut out, "value", &text);
                }
                let _ = write!(out, " id=\"{}\"", id);
                optional_attribute(&mut out, "maxlength", &positive("MaxLength"));
                optional_attribute(&mut out, "size", &positive("Columns"));
                out
            }
        };

        if self.properties.get_bool("ReadOnly") {
            out.push_str(" readonly=\"readonly\"");
        }
        web_control_attributes(&mut out, &self.properties);

        if self.text_mode() == "MultiLine" {
            let _ = write!(out, ">{}</textarea>", escape_text(&text));
        } else {
            out.push_str(" />");
        }
        out
    }
}

// ---------------------------------------------------------------------------
// CheckBox

#[derive(Debug)]
pub struct CheckBox {
    properties: PropertyBag,
}

pub fn check_box_descriptor() -> TypeDescriptor {
    TypeDescriptor {
        type_name: "CheckBox",
        tag_prefix: Some(ASP_PREFIX),
        tag_name: "CheckBox",
        kind: ComponentKind::Control,
        properties: web_control_properties(vec![
            PropertyDescriptor::string("Text", ""),
            PropertyDescriptor::bool("Checked", false),
            PropertyDescriptor::bool("AutoPostBack", false),
        ]),
        events: vec![EventDescriptor {
            name: "CheckedChanged",
        }],
        factory: |descriptor| {
            Box::new(CheckBox {
                properties: PropertyBag::new(descriptor),
            })
        },
    }
}

impl Component for CheckBox {
    fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }

    fn render(&self, site_name: &str) -> String {
        if !self.properties.get_bool("Visible") {
            return String::new();
        }
        let id = escape_attribute(site_name);
        let mut out = format!("<input id=\"{0}\" type=\"checkbox\" name=\"{0}\"", id);
        if self.properties.get_bool("Checked") {
            out.push_str(" checked=\"checked\"");
        }
        web_control_attributes(&mut out, &self.properties);
        out.push_str(" />");

        let text = self.properties.get_str("Text");
        if !text.is_empty() {
            let _ = write!(out, "<label for=\"{}\">{}</label>", id, text);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// HyperLink

#[derive(Debug)]
pub struct HyperLink {
    properties: PropertyBag,
    resolved_url: String,
}

pub fn hyper_link_descriptor() -> TypeDescriptor {
    TypeDescriptor {
        type_name: "HyperLink",
        tag_prefix: Some(ASP_PREFIX),
        tag_name: "HyperLink",
        kind: ComponentKind::Control,
        properties: web_control_properties(vec![
            PropertyDescriptor::string("Text", ""),
            PropertyDescriptor::string("NavigateUrl", ""),
            PropertyDescriptor::string("Target", ""),
        ]),
        events: vec![],
        factory: |descriptor| {
            Box::new(HyperLink {
                properties: PropertyBag::new(descriptor),
                resolved_url: String::new(),
            })
        },
    }
}

impl Component for HyperLink {
    fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }

    fn render(&self, site_name: &str) -> String {
        if !self.properties.get_bool("Visible") {
            return String::new();
        }
        let mut out = format!("<a id=\"{}\"", escape_attribute(site_name));
        optional_attribute(&mut out, "href", &self.resolved_url);
        optional_attribute(&mut out, "target", &self.properties.get_str("Target"));
        web_control_attributes(&mut out, &self.properties);
        let _ = write!(out, ">{}</a>", escape_text(&self.properties.get_str("Text")));
        out
    }

    fn as_initializable(&mut self) -> Option<&mut dyn Initializable> {
        Some(self)
    }

    fn as_pre_renderable(&mut self) -> Option<&mut dyn PreRenderable> {
        Some(self)
    }
}

impl Initializable for HyperLink {
    fn initialize(&mut self, _site_name: &str) {
        if self.properties.get_str("Text").is_empty() {
            let _ = self.properties.set("Text", "HyperLink".into());
        }
    }
}

impl PreRenderable for HyperLink {
    /// App-relative `~/` urls resolve against the site root
    fn pre_render(&mut self) {
        let url = self.properties.get_str("NavigateUrl");
        self.resolved_url = match url.strip_prefix("~/") {
            Some(rest) => format!("/{}", rest),
            None => url,
        };
    }
}

// ---------------------------------------------------------------------------
// PlaceHolder

/// Renders nothing of its own; the designer shows a placeholder
#[derive(Debug)]
pub struct PlaceHolder {
    properties: PropertyBag,
}

pub fn place_holder_descriptor() -> TypeDescriptor {
    TypeDescriptor {
        type_name: "PlaceHolder",
        tag_prefix: Some(ASP_PREFIX),
        tag_name: "PlaceHolder",
        kind: ComponentKind::Control,
        properties: vec![PropertyDescriptor::bool("Visible", true)],
        events: vec![],
        factory: |descriptor| {
            Box::new(PlaceHolder {
                properties: PropertyBag::new(descriptor),
            })
        },
    }
}

impl Component for PlaceHolder {
    fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }

    fn render(&self, _site_name: &str) -> String {
        String::new()
    }
}

// ---------------------------------------------------------------------------
// HTML server controls

#[derive(Debug)]
pub struct HtmlForm {
    properties: PropertyBag,
}

pub fn html_form_descriptor() -> TypeDescriptor {
    TypeDescriptor {
        type_name: "HtmlForm",
        tag_prefix: None,
        tag_name: "form",
        kind: ComponentKind::Control,
        properties: vec![
            PropertyDescriptor::enumeration("Method", &["post", "get"], "post"),
            PropertyDescriptor::string("Action", ""),
        ],
        events: vec![],
        factory: |descriptor| {
            Box::new(HtmlForm {
                properties: PropertyBag::new(descriptor),
            })
        },
    }
}

impl Component for HtmlForm {
    fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }

    fn render(&self, site_name: &str) -> String {
        self.render_container(site_name, "").unwrap_or_default()
    }

    fn render_container(&self, site_name: &str, inner: &str) -> Option<String> {
        let mut out = format!(
            "<form method=\"{}\"",
            escape_attribute(&self.properties.get_str("Method"))
        );
        optional_attribute(&mut out, "action", &self.properties.get_str("Action"));
        let _ = write!(out, " id=\"{}\">{}</form>", escape_attribute(site_name), inner);
        Some(out)
    }
}

/// Any other `runat="server"` HTML tag. Keeps the tag's own name and
/// attributes and renders them back around its children.
#[derive(Debug)]
pub struct HtmlGenericControl {
    properties: PropertyBag,
    tag: String,
    attributes: Vec<(String, String)>,
    void: bool,
}

pub fn html_generic_descriptor() -> TypeDescriptor {
    TypeDescriptor {
        type_name: "HtmlGenericControl",
        tag_prefix: None,
        tag_name: "span",
        kind: ComponentKind::Control,
        properties: vec![PropertyDescriptor::bool("Visible", true)],
        events: vec![],
        factory: |descriptor| {
            Box::new(HtmlGenericControl {
                properties: PropertyBag::new(descriptor),
                tag: "span".to_string(),
                attributes: Vec::new(),
                void: false,
            })
        },
    }
}

impl HtmlGenericControl {
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl Component for HtmlGenericControl {
    fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }

    fn render(&self, site_name: &str) -> String {
        self.render_container(site_name, "").unwrap_or_default()
    }

    fn render_container(&self, site_name: &str, inner: &str) -> Option<String> {
        if !self.properties.get_bool("Visible") {
            return Some(String::new());
        }
        let mut out = format!("<{}", self.tag);
        for (name, value) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", name, escape_attribute(value));
        }
        let _ = write!(out, " id=\"{}\"", escape_attribute(site_name));
        if self.void {
            out.push_str(" />");
        } else {
            let _ = write!(out, ">{}</{}>", inner, self.tag);
        }
        Some(out)
    }

    fn bind_element(&mut self, element: &Element) {
        self.tag = element.name.full_name();
        self.void = matches!(element.end, formsmith_parser::TagEnd::Void)
            || element.is_self_closing();
        self.attributes = element
            .attributes
            .iter()
            .map(|attr| (attr.name.full_name(), attr.value.clone()))
            .filter(|(name, _)| {
                let lower = name.to_ascii_lowercase();
                lower != "id" && lower != "runat" && lower != "visible" && !lower.starts_with("on")
            })
            .collect();
    }
}
