//! Markup ↔ component synchronization scenarios

use formsmith_editor::{DesignerHost, EditorError, HostEvent, Value};

fn loaded(markup: &str) -> DesignerHost {
    let mut host = DesignerHost::default();
    host.load_text(markup).unwrap();
    host
}

fn text(host: &DesignerHost) -> String {
    host.document().unwrap().text()
}

#[test]
fn test_missing_id_is_generated_and_written() {
    let mut host = loaded(r#"<asp:Button runat="server" Text="Hi"/>"#);

    assert_eq!(text(&host), r#"<asp:Button runat="server" Text="Hi" id="Button1" />"#);
    let button = host.get_component("Button1").unwrap();
    assert_eq!(button.type_name(), "Button");
    assert_eq!(button.get_property("Text"), Some(Value::Str("Hi".into())));
}

#[test]
fn test_duplicate_ids_get_fresh_names() {
    let mut host = loaded(concat!(
        r#"<div><asp:Label id="x" runat="server"/>"#,
        r#"<asp:Label id="X" runat="server"/>"#,
        r#"<asp:Label id="Label1" runat="server"/>"#,
        r#"<asp:Label runat="server"/></div>"#,
    ));

    assert_eq!(
        text(&host),
        concat!(
            r#"<div><asp:Label id="x" runat="server"/>"#,
            r#"<asp:Label id="Label2" runat="server"/>"#,
            r#"<asp:Label id="Label1" runat="server"/>"#,
            r#"<asp:Label runat="server" id="Label3" /></div>"#,
        )
    );
    assert_eq!(host.component_names(), vec!["Page1", "x", "Label2", "Label1", "Label3"]);
}

#[test]
fn test_explicit_values_round_trip() {
    let markup = concat!(
        "<form id=\"f\" runat=\"server\" method=\"GET\">\n",
        "  <asp:TextBox id=\"t\" runat=\"server\" Text=\"a &amp; b\" MaxLength=\"12\" ReadOnly=\"true\" TextMode=\"multiline\" />\n",
        "  <asp:CheckBox ID=\"c\" runat=\"server\" Checked=\"True\" Text=\"Remember\" />\n",
        "</form>"
    );
    let mut host = loaded(markup);
    assert_eq!(text(&host), markup);

    // persisting and writing every property back leaves the text alone
    let report = host.document().unwrap().persist_controls().unwrap();
    assert!(report.created.is_empty());
    assert!(report.removed.is_empty());

    for (name, property) in [
        ("f", "Method"),
        ("t", "Text"),
        ("t", "MaxLength"),
        ("t", "ReadOnly"),
        ("t", "TextMode"),
        ("c", "Checked"),
        ("c", "Text"),
    ] {
        let value = host.get_component(name).unwrap().get_property(property).unwrap();
        host.set_component_property(name, property, value).unwrap();
    }
    assert_eq!(text(&host), markup);
}

#[test]
fn test_default_value_removes_attribute() {
    let mut host = loaded(r#"<asp:CheckBox id="c" runat="server" Checked="True" Text="Go" />"#);

    host.set_component_property("c", "Checked", Value::Bool(false))
        .unwrap();
    assert_eq!(text(&host), r#"<asp:CheckBox id="c" runat="server" Text="Go" />"#);

    host.set_component_property("c", "Text", Value::from("")).unwrap();
    assert_eq!(text(&host), r#"<asp:CheckBox id="c" runat="server" />"#);

    // already default: nothing to remove
    host.set_component_property("c", "Checked", Value::Bool(false))
        .unwrap();
    assert_eq!(text(&host), r#"<asp:CheckBox id="c" runat="server" />"#);
}

#[test]
fn test_persist_resets_properties_missing_from_markup() {
    let mut host = loaded(r#"<asp:Label id="l" runat="server" Text="Saved" CssClass="big" />"#);

    // edit the text behind the designer's back
    let document = host.document().unwrap().clone();
    let tag = document.parse().find_control_tag("l").unwrap().region;
    document
        .replace_text(tag, r#"<asp:Label id="l" runat="server" Text="Edited" />"#)
        .unwrap();
    let report = document.persist_controls().unwrap();
    assert!(report.is_clean());

    let label = host.get_component("l").unwrap();
    assert_eq!(label.get_property("Text"), Some(Value::Str("Edited".into())));
    assert_eq!(label.get_property("CssClass"), Some(Value::Str(String::new())));
}

#[test]
fn test_removed_tag_destroys_component_on_persist() {
    let mut host = loaded(r#"<div><asp:Label id="a" runat="server" /><asp:Label id="b" runat="server" /></div>"#);
    let document = host.document().unwrap().clone();
    let b = document.parse().find_control_tag("b").unwrap().region;
    document.remove_text(b).unwrap();

    let report = document.persist_controls().unwrap();
    assert_eq!(report.removed, vec!["b"]);
    assert_eq!(host.component_names(), vec!["Page1", "a"]);
}

#[test]
fn test_changed_tag_type_recreates_component() {
    let mut host = loaded(r#"<p><asp:Label id="a" runat="server" /></p>"#);
    let document = host.document().unwrap().clone();
    let tag = document.parse().find_control_tag("a").unwrap().region;
    document
        .replace_text(tag, r#"<asp:Button id="a" runat="server" />"#)
        .unwrap();

    let report = document.persist_controls().unwrap();
    assert_eq!(report.removed, vec!["a"]);
    assert_eq!(report.created, vec![("a".to_string(), "Button")]);
    assert_eq!(host.get_component("a").unwrap().type_name(), "Button");
}

#[test]
fn test_bad_attribute_does_not_abort_load() {
    let mut host = DesignerHost::default();
    let report = host
        .load_text(r#"<div><asp:TextBox id="t" runat="server" MaxLength="many" /><asp:Calendar id="cal" runat="server" /><asp:Label id="l" runat="server" /></div>"#)
        .unwrap();

    assert_eq!(report.issues.len(), 2);
    assert_eq!(report.issues[0].id.as_deref(), Some("t"));
    assert_eq!(report.issues[1].id.as_deref(), Some("cal"));
    assert_eq!(host.component_names(), vec!["Page1", "t", "l"]);
    assert_eq!(
        host.get_component("t").unwrap().get_property("MaxLength"),
        Some(Value::Int(0))
    );
}

#[test]
fn test_design_render_strips_wiring() {
    let mut host = loaded(concat!(
        "<html><head><title>T</title></head><body>",
        r#"<asp:TextBox runat="server" id="t1" OnTextChanged="x"/>"#,
        "<script>alert(1)</script>",
        r#"<p onclick="go()" class="c">hi</p>"#,
        "</body></html>"
    ));
    let html = host.serialize_document().unwrap().html.clone();

    assert!(html.contains(r#"<div class="designer_component" data-component-id="t1"><input name="t1" type="text" id="t1" />"#));
    assert!(html.contains(r#"<p class="c">hi</p>"#));
    assert!(!html.contains("OnTextChanged"));
    assert!(!html.contains("onclick"));
    assert!(!html.contains("runat"));
    assert!(!html.contains("alert"));
}

#[test]
fn test_page_directive_is_unique() {
    let host = loaded("<%@ Page Language=\"C#\" %>\n<html></html>");
    let document = host.document().unwrap();

    assert_eq!(document.get_directives("page").len(), 1);
    assert_eq!(
        document.add_directive("Page", vec![]),
        Err(EditorError::DuplicateDirective("Page".into()))
    );
    assert!(document.add_directive("Import", vec![("Namespace".into(), "System".into())]).is_ok());
    assert!(document.add_directive("Import", vec![]).is_ok());
    assert_eq!(document.get_directives("import").len(), 2);
}

#[test]
fn test_unterminated_tag_is_reported() {
    let mut host = loaded(r#"<html><body><div id="d" runat="server"><p>text</body></html>"#);
    let mut events = host.subscribe();

    let html = host.serialize_document().unwrap();
    assert!(html.warnings.iter().any(|warning| warning.is_unterminated_tag()));
    assert!(matches!(
        host.destroy_component("d"),
        Err(EditorError::UnterminatedTag { .. })
    ));
    assert!(host.get_component("d").is_some());
    assert!(std::iter::from_fn(|| events.try_recv().ok())
        .all(|event| !matches!(event, HostEvent::ComponentRemoved { .. })));
}

#[test]
fn test_non_newline_separators_keep_edits_in_place() {
    let mut host = loaded("<div>\n<p>a\u{2028}b\rc\u{85}d</p><asp:Button runat=\"server\"/>\n</div>");

    assert_eq!(
        text(&host),
        "<div>\n<p>a\u{2028}b\rc\u{85}d</p><asp:Button runat=\"server\" id=\"Button1\" />\n</div>"
    );
    assert_eq!(host.component_names(), vec!["Page1", "Button1"]);

    host.set_component_property("Button1", "Text", Value::from("Go"))
        .unwrap();
    assert!(text(&host).ends_with("d</p><asp:Button runat=\"server\" id=\"Button1\" Text=\"Go\" />\n</div>"));
}

#[test]
fn test_escaped_values_survive_persist() {
    let mut host = loaded(r#"<div><asp:Label id="l" runat="server" /></div>"#);
    let value = Value::from(r#"a & "b" <c>"#);

    host.set_component_property("l", "Text", value.clone())
        .unwrap();
    let written = r#"<div><asp:Label id="l" runat="server" Text="a &amp; &quot;b&quot; &lt;c&gt;" /></div>"#;
    assert_eq!(text(&host), written);

    let report = host.document().unwrap().persist_controls().unwrap();
    assert!(report.is_clean());
    assert_eq!(host.get_component("l").unwrap().get_property("Text"), Some(value.clone()));

    // writing the same value again leaves the markup alone
    host.set_component_property("l", "Text", value).unwrap();
    assert_eq!(text(&host), written);
}

#[test]
fn test_server_script_is_not_a_control() {
    let script = r#"<script runat="server">void Page_Load() { secret(); }</script>"#;
    let mut host = loaded(&format!(
        "<html><head>{}</head><body><form runat=\"server\" id=\"f\"></form></body></html>",
        script
    ));

    assert!(text(&host).contains(script));
    assert_eq!(host.component_names(), vec!["Page1", "f"]);

    let html = host.serialize_document().unwrap().html.clone();
    assert!(!html.contains("Page_Load"));
    assert!(!html.contains("<script"));
}
