//! # Tag Serializer
//!
//! Writes component changes back into the markup text.
//!
//! Every function takes a tag from a parse of the *current* text; one edit
//! makes all regions of that parse stale, so callers re-parse before the
//! next edit. All edits go through the [`Document`] text accessors.

use crate::component::{PropertyBag, TypeDescriptor, Value};
use crate::controls::escape_attribute;
use crate::document::Document;
use crate::errors::{EditorError, EditorResult};
use formsmith_parser::{Attribute, Element, Region, TextLocation};
use std::fmt::Write;

/// Location reached after walking `text` from `from`
fn advance(from: TextLocation, text: &str) -> TextLocation {
    text.chars().fold(from, |location, ch| {
        if ch == '\n' {
            TextLocation::new(location.line + 1, 1)
        } else {
            TextLocation::new(location.line, location.column + 1)
        }
    })
}

fn attribute_markup(key: &str, value: &str) -> String {
    format!("{}=\"{}\"", key, escape_attribute(value))
}

/// Set `key` on a tag, inserting or replacing the attribute. Returns false
/// when the tag already carries that value.
pub fn set_attribute(document: &Document, tag: &Element, key: &str, value: &str) -> EditorResult<bool> {
    match tag.attribute_ci(key) {
        Some(existing) => update_attribute(document, existing, value),
        None => {
            insert_attribute(document, tag, key, value)?;
            Ok(true)
        }
    }
}

/// Add an attribute at the end of the opening tag, before `/>` or `>`
pub fn insert_attribute(document: &Document, tag: &Element, key: &str, value: &str) -> EditorResult<()> {
    let opening = document.region_text(tag.region);
    let trimmed = opening.trim_end();
    let (head, self_closing) = if let Some(head) = trimmed.strip_suffix("/>") {
        (head, true)
    } else if let Some(head) = trimmed.strip_suffix('>') {
        (head, false)
    } else {
        // no terminator; append to whatever the tag has
        (trimmed, false)
    };

    let mut text = String::new();
    if !head.ends_with(char::is_whitespace) {
        text.push(' ');
    }
    text.push_str(&attribute_markup(key, value));
    if self_closing {
        text.push(' ');
    }

    let at = advance(tag.region.begin, head);
    tracing::debug!("inserting {}=\"{}\" into <{}> at {}", key, value, tag.name, at);
    document.insert_text(at, &text)
}

/// Replace an attribute's value, keeping the name as spelled in the markup.
/// Compares against the decoded value, so a differently escaped spelling of
/// the same text is left alone.
pub fn update_attribute(document: &Document, attribute: &Attribute, value: &str) -> EditorResult<bool> {
    if attribute.value == value {
        return Ok(false);
    }
    let text = attribute_markup(&attribute.name.full_name(), value);
    document.replace_text(attribute.region, &text)?;
    Ok(true)
}

/// Drop an attribute and the blank in front of it. Returns false when the
/// tag has no such attribute.
pub fn remove_attribute(document: &Document, tag: &Element, key: &str) -> EditorResult<bool> {
    let Some(attribute) = tag.attribute_ci(key) else {
        return Ok(false);
    };
    let mut region = attribute.region;
    let before = document.get_text_from_editor(tag.region.begin, region.begin);
    if region.begin.column > 1 && before.ends_with([' ', '\t']) {
        region.begin.column -= 1;
    }
    document.remove_text(region)?;
    Ok(true)
}

fn find_tag(document: &Document, id: &str) -> EditorResult<Element> {
    document
        .parse()
        .find_control_tag(id)
        .cloned()
        .ok_or_else(|| EditorError::TagNotFound(id.to_string()))
}

/// Write a property value into the tag of component `id`. A value equal
/// to the property's default removes the attribute instead.
pub fn update_tag(
    document: &Document,
    descriptor: &TypeDescriptor,
    id: &str,
    property: &str,
    value: &Value,
) -> EditorResult<bool> {
    let Some(property) = descriptor.property(property) else {
        return Err(EditorError::PropertyNotFound {
            component: id.to_string(),
            property: property.to_string(),
        });
    };
    let tag = find_tag(document, id)?;

    if property.is_default(value) {
        return remove_attribute(document, &tag, property.name);
    }

    // leave the markup alone when it already means the same value
    if let Some(existing) = tag.attribute_ci(property.name) {
        if property.convert_from(&existing.value).as_ref() == Ok(value) {
            return Ok(false);
        }
    }
    let text = property.convert_to(value)?;
    set_attribute(document, &tag, property.name, &text)
}

/// Write or clear the `On<Event>` attribute of component `id`
pub fn update_event(document: &Document, id: &str, event: &str, handler: Option<&str>) -> EditorResult<bool> {
    let tag = find_tag(document, id)?;
    let key = format!("On{}", event);
    match handler {
        Some(handler) if !handler.is_empty() => set_attribute(document, &tag, &key, handler),
        _ => remove_attribute(document, &tag, &key),
    }
}

/// Point the tag of `old_id` at `new_id`
pub fn rename_tag_id(document: &Document, old_id: &str, new_id: &str) -> EditorResult<bool> {
    let tag = find_tag(document, old_id)?;
    set_attribute(document, &tag, "id", new_id)
}

/// Remove a control's whole tag, closing tag and children included
pub fn remove_control_tag(document: &Document, id: &str) -> EditorResult<()> {
    let tag = find_tag(document, id)?;
    let Some(region) = tag.outer_region() else {
        tracing::warn!("<{}> for '{}' has no closing tag; leaving it", tag.name, id);
        return Err(EditorError::UnterminatedTag {
            name: tag.name.full_name(),
            location: tag.region.begin,
        });
    };
    tracing::debug!("removing tag of '{}' at {}", id, region);
    document.remove_text(region)
}

/// Markup for a new control: id, runat and every non-default property
pub fn control_tag(descriptor: &TypeDescriptor, site_name: &str, properties: &PropertyBag) -> String {
    let tag = descriptor.tag();
    let mut out = format!("<{} id=\"{}\" runat=\"server\"", tag, escape_attribute(site_name));
    for property in &descriptor.properties {
        if properties.is_default(property.name) {
            continue;
        }
        let Some(text) = properties
            .get(property.name)
            .and_then(|value| property.convert_to(&value).ok())
        else {
            continue;
        };
        let _ = write!(out, " {}", attribute_markup(property.name, &text));
    }

    if descriptor.tag_prefix.is_some() {
        out.push_str(" />");
    } else {
        let _ = write!(out, "></{}>", tag);
    }
    out
}

/// Insert a control tag before the closing tag of the server form, or of
/// `<body>` when there is no form. Returns where the tag went.
pub fn insert_control_tag(document: &Document, markup: &str) -> EditorResult<TextLocation> {
    let parsed = document.parse();
    let form: Option<Region> = parsed
        .elements()
        .filter(|element| element.name.is("form") && element.is_run_at_server())
        .find_map(Element::closing_tag);
    let closing = form
        .or_else(|| {
            parsed
                .elements()
                .filter(|element| element.name.is("body"))
                .find_map(Element::closing_tag)
        })
        .ok_or(EditorError::NoInsertionPoint)?;

    document.insert_text(closing.begin, &format!("{}\n", markup))?;
    Ok(closing.begin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::standard_registry;
    use crate::designer::DesignerRegistry;
    use crate::options::DesignerOptions;
    use crate::selection::SelectionService;
    use crate::text_buffer::TextBufferAdapter;
    use std::sync::Arc;

    fn document(markup: &str) -> Document {
        let (buffer, _queue) = TextBufferAdapter::from_text(markup);
        Document::new(
            buffer,
            Arc::new(standard_registry()),
            Arc::new(DesignerRegistry::standard()),
            SelectionService::new(),
            DesignerOptions::default(),
        )
    }

    fn first_tag(doc: &Document) -> Element {
        doc.parse().elements().next().cloned().unwrap()
    }

    #[test]
    fn test_insert_before_self_closing_end() {
        let doc = document(r#"<asp:Button runat="server"/>"#);
        assert!(set_attribute(&doc, &first_tag(&doc), "id", "b").unwrap());
        assert_eq!(doc.text(), r#"<asp:Button runat="server" id="b" />"#);

        let doc = document(r#"<asp:Button runat="server" />"#);
        set_attribute(&doc, &first_tag(&doc), "id", "b").unwrap();
        assert_eq!(doc.text(), r#"<asp:Button runat="server" id="b" />"#);
    }

    #[test]
    fn test_insert_before_plain_end() {
        let doc = document("<p>\n  <div\n    runat=\"server\">x</div></p>");
        let div = doc.parse().elements().nth(1).cloned().unwrap();
        insert_attribute(&doc, &div, "class", "a&b").unwrap();
        assert_eq!(doc.text(), "<p>\n  <div\n    runat=\"server\" class=\"a&amp;b\">x</div></p>");
    }

    #[test]
    fn test_update_keeps_name_spelling() {
        let doc = document(r#"<asp:Label ID="old" runat="server"/>"#);
        assert!(set_attribute(&doc, &first_tag(&doc), "id", "new").unwrap());
        assert_eq!(doc.text(), r#"<asp:Label ID="new" runat="server"/>"#);
        // same value: nothing written
        assert!(!set_attribute(&doc, &first_tag(&doc), "Id", "new").unwrap());
        assert_eq!(doc.buffer().generation(), 1);
    }

    #[test]
    fn test_update_compares_decoded_values() {
        let doc = document(r#"<asp:Label id="l" Text="a &#38; &quot;b&quot;" runat="server"/>"#);
        let tag = first_tag(&doc);
        assert_eq!(tag.attribute_value_ci("text"), r#"a & "b""#);

        assert!(!set_attribute(&doc, &tag, "Text", r#"a & "b""#).unwrap());
        assert_eq!(doc.buffer().generation(), 0);

        assert!(set_attribute(&doc, &tag, "Text", "<a & b>").unwrap());
        assert_eq!(
            doc.text(),
            r#"<asp:Label id="l" Text="&lt;a &amp; b&gt;" runat="server"/>"#
        );
    }

    #[test]
    fn test_remove_attribute_takes_leading_blank() {
        let doc = document(r#"<asp:CheckBox id="c" Checked="True" runat="server"/>"#);
        assert!(remove_attribute(&doc, &first_tag(&doc), "checked").unwrap());
        assert_eq!(doc.text(), r#"<asp:CheckBox id="c" runat="server"/>"#);
        assert!(!remove_attribute(&doc, &first_tag(&doc), "checked").unwrap());
    }

    #[test]
    fn test_update_tag_default_removes_attribute() {
        let registry = standard_registry();
        let check_box = registry.by_type_name("CheckBox").unwrap();
        let doc = document(r#"<asp:CheckBox id="c" runat="server"/>"#);

        update_tag(&doc, &check_box, "c", "checked", &Value::Bool(true)).unwrap();
        assert_eq!(doc.text(), r#"<asp:CheckBox id="c" runat="server" Checked="True" />"#);

        update_tag(&doc, &check_box, "C", "Checked", &Value::Bool(false)).unwrap();
        assert_eq!(doc.text(), r#"<asp:CheckBox id="c" runat="server" />"#);
    }

    #[test]
    fn test_update_tag_skips_equivalent_spelling() {
        let registry = standard_registry();
        let check_box = registry.by_type_name("CheckBox").unwrap();
        let doc = document(r#"<asp:CheckBox id="c" checked="true" runat="server"/>"#);
        assert!(!update_tag(&doc, &check_box, "c", "Checked", &Value::Bool(true)).unwrap());
        assert_eq!(doc.text(), r#"<asp:CheckBox id="c" checked="true" runat="server"/>"#);
    }

    #[test]
    fn test_update_tag_errors() {
        let registry = standard_registry();
        let button = registry.by_type_name("Button").unwrap();
        let doc = document(r#"<asp:Button id="b" runat="server"/>"#);
        assert_eq!(
            update_tag(&doc, &button, "missing", "Text", &"x".into()),
            Err(EditorError::TagNotFound("missing".to_string()))
        );
        assert!(matches!(
            update_tag(&doc, &button, "b", "Nope", &"x".into()),
            Err(EditorError::PropertyNotFound { .. })
        ));
        assert!(matches!(
            update_tag(&doc, &button, "b", "Enabled", &"x".into()),
            Err(EditorError::Conversion(_))
        ));
    }

    #[test]
    fn test_update_event() {
        let doc = document(r#"<asp:Button id="b" runat="server"/>"#);
        update_event(&doc, "b", "Click", Some("b_Click")).unwrap();
        assert_eq!(doc.text(), r#"<asp:Button id="b" runat="server" OnClick="b_Click" />"#);
        update_event(&doc, "b", "Click", None).unwrap();
        assert_eq!(doc.text(), r#"<asp:Button id="b" runat="server" />"#);
    }

    #[test]
    fn test_remove_control_tag() {
        let doc = document("<form runat=\"server\"><asp:Label id=\"l\" runat=\"server\">x</asp:Label><asp:Button id=\"b\" runat=\"server\"/></form>");
        remove_control_tag(&doc, "L").unwrap();
        assert_eq!(doc.text(), "<form runat=\"server\"><asp:Button id=\"b\" runat=\"server\"/></form>");
        remove_control_tag(&doc, "b").unwrap();
        assert_eq!(doc.text(), "<form runat=\"server\"></form>");
        assert_eq!(
            remove_control_tag(&doc, "b"),
            Err(EditorError::TagNotFound("b".to_string()))
        );
    }

    #[test]
    fn test_remove_unterminated_control_tag_fails() {
        let doc = document("<div><asp:Panel id=\"p\" runat=\"server\"></div>");
        assert!(matches!(
            remove_control_tag(&doc, "p"),
            Err(EditorError::UnterminatedTag { .. })
        ));
        assert_eq!(doc.text(), "<div><asp:Panel id=\"p\" runat=\"server\"></div>");
    }

    #[test]
    fn test_control_tag_markup() {
        let registry = standard_registry();
        let button = registry.by_type_name("Button").unwrap();
        let mut component = button.instantiate();
        component.set_property("Text", "Say \"hi\"".into()).unwrap();
        component.set_property("Enabled", false.into()).unwrap();
        assert_eq!(
            control_tag(&button, "Button1", component.properties()),
            r#"<asp:Button id="Button1" runat="server" Enabled="False" Text="Say &quot;hi&quot;" />"#
        );

        let form = registry.by_type_name("HtmlForm").unwrap();
        let component = form.instantiate();
        assert_eq!(
            control_tag(&form, "f", component.properties()),
            r#"<form id="f" runat="server"></form>"#
        );
    }

    #[test]
    fn test_insert_control_tag_goes_into_server_form() {
        let doc = document("<body>\n<form runat=\"server\">\n</form></body>");
        insert_control_tag(&doc, "<asp:Label id=\"l\" runat=\"server\" />").unwrap();
        assert_eq!(
            doc.text(),
            "<body>\n<form runat=\"server\">\n<asp:Label id=\"l\" runat=\"server\" />\n</form></body>"
        );

        let doc = document("<body><p></p></body>");
        insert_control_tag(&doc, "<x/>").unwrap();
        assert_eq!(doc.text(), "<body><p></p><x/>\n</body>");

        let doc = document("<p></p>");
        assert_eq!(insert_control_tag(&doc, "<x/>"), Err(EditorError::NoInsertionPoint));
    }
}
