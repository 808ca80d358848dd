//! Integration tests for the designer host

use formsmith_editor::{
    new_document_markup, DesignerHost, DesignerMessage, EditorError, HostEvent, HostPhase, Value,
};
use tokio::sync::broadcast;

const PAGE: &str = r#"<%@ Page Language="C#" %>
<html>
<head>
	<title>Contact</title>
</head>
<body>
<form id="form1" runat="server">
	<asp:Label id="lblName" runat="server" Text="Name" />
	<asp:TextBox id="txtName" runat="server" MaxLength="40" />
	<asp:Button id="btnSend" runat="server" Text="Send" OnClick="Send_Click" />
</form>
</body>
</html>"#;

fn drain(events: &mut broadcast::Receiver<HostEvent>) -> Vec<HostEvent> {
    std::iter::from_fn(|| events.try_recv().ok()).collect()
}

#[test]
fn test_document_lifecycle() {
    let mut host = DesignerHost::default();
    let mut events = host.subscribe();

    let report = host.load_text(PAGE).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.directives, 1);
    assert!(report.ids_inserted.is_empty());
    assert_eq!(host.phase(), HostPhase::Loaded);
    assert_eq!(
        host.component_names(),
        vec!["Page1", "form1", "lblName", "txtName", "btnSend"]
    );

    let seen = drain(&mut events);
    assert_eq!(
        seen.first(),
        Some(&HostEvent::ComponentAdded {
            name: "Page1".into(),
            type_name: "Page",
        })
    );
    assert_eq!(
        seen.last(),
        Some(&HostEvent::LoadComplete {
            components: 5,
            issues: 0,
        })
    );

    host.activate().unwrap();
    host.settle();
    assert!(drain(&mut events)
        .iter()
        .any(|event| matches!(event, HostEvent::DocumentChanged { .. })));

    host.reset();
    assert_eq!(host.phase(), HostPhase::Idle);
    assert!(host.component_names().is_empty());
    let removed: Vec<HostEvent> = drain(&mut events)
        .into_iter()
        .filter(|event| matches!(event, HostEvent::ComponentRemoved { .. }))
        .collect();
    assert_eq!(removed.len(), 5);
    assert_eq!(
        removed.last(),
        Some(&HostEvent::ComponentRemoved { name: "Page1".into() })
    );
}

#[test]
fn test_loaded_properties_and_events() {
    let mut host = DesignerHost::default();
    host.load_text(PAGE).unwrap();

    let text_box = host.get_component("TXTNAME").unwrap();
    assert_eq!(text_box.name(), "txtName");
    assert_eq!(text_box.get_property("MaxLength"), Some(Value::Int(40)));
    drop(text_box);

    let button = host.get_component("btnSend").unwrap();
    assert_eq!(button.properties().event_handler("Click"), Some("Send_Click"));
}

#[test]
fn test_property_edit_writes_markup() {
    let mut host = DesignerHost::default();
    host.load_text(PAGE).unwrap();
    let mut events = host.subscribe();

    host.set_component_property("btnSend", "Text", Value::from("Submit"))
        .unwrap();
    let text = host.document().unwrap().text();
    assert!(text.contains(r#"<asp:Button id="btnSend" runat="server" Text="Submit" OnClick="Send_Click" />"#));

    assert!(drain(&mut events).contains(&HostEvent::ComponentChanged {
        name: "btnSend".into(),
        property: "Text".into(),
        old: Some(Value::Str("Send".into())),
        new: Value::Str("Submit".into()),
    }));

    host.set_component_property_text("txtName", "ReadOnly", "true")
        .unwrap();
    let text = host.document().unwrap().text();
    assert!(text.contains(r#"<asp:TextBox id="txtName" runat="server" MaxLength="40" ReadOnly="True" />"#));

    host.reset_component_property("txtName", "MaxLength").unwrap();
    let text = host.document().unwrap().text();
    assert!(text.contains(r#"<asp:TextBox id="txtName" runat="server" ReadOnly="True" />"#));
}

#[test]
fn test_property_errors() {
    let mut host = DesignerHost::default();
    host.load_text(PAGE).unwrap();

    assert_eq!(
        host.set_component_property("nope", "Text", Value::from("x")),
        Err(EditorError::ComponentNotFound("nope".into()))
    );
    assert_eq!(
        host.set_component_property("btnSend", "Colour", Value::from("x")),
        Err(EditorError::PropertyNotFound {
            component: "btnSend".into(),
            property: "Colour".into(),
        })
    );
    assert!(matches!(
        host.set_component_property_text("txtName", "MaxLength", "lots"),
        Err(EditorError::Conversion(_))
    ));
    assert!(matches!(
        host.set_component_property("txtName", "MaxLength", Value::from("lots")),
        Err(EditorError::Conversion(_))
    ));
    assert!(!host.in_transaction());
    assert_eq!(
        host.get_component("txtName").unwrap().get_property("MaxLength"),
        Some(Value::Int(40))
    );
}

#[test]
fn test_event_handler_binding() {
    let mut host = DesignerHost::default();
    host.load_text(PAGE).unwrap();

    host.set_event_handler("txtName", "TextChanged", Some("Name_Changed"))
        .unwrap();
    assert!(host
        .document()
        .unwrap()
        .text()
        .contains(r#"MaxLength="40" OnTextChanged="Name_Changed" />"#));

    host.set_event_handler("btnSend", "click", None).unwrap();
    assert!(host
        .document()
        .unwrap()
        .text()
        .contains(r#"<asp:Button id="btnSend" runat="server" Text="Send" />"#));
    assert_eq!(
        host.get_component("btnSend").unwrap().properties().event_handler("Click"),
        None
    );
}

#[test]
fn test_create_rename_and_remove() {
    let mut host = DesignerHost::default();
    host.new_file("Untitled").unwrap();
    host.activate().unwrap();
    let mut events = host.subscribe();

    let name = host.create_component("Label", None).unwrap();
    assert_eq!(name, "Label1");
    assert!(host
        .document()
        .unwrap()
        .text()
        .contains("<asp:Label id=\"Label1\" runat=\"server\" Text=\"Label\" />\n</form>"));

    host.rename_component("label1", "lblTitle").unwrap();
    assert!(host
        .document()
        .unwrap()
        .text()
        .contains(r#"<asp:Label id="lblTitle" runat="server" Text="Label" />"#));
    assert_eq!(host.selection().get_selected_components(), vec!["lblTitle"]);

    host.remove_control("lblTitle").unwrap();
    assert!(!host.document().unwrap().text().contains("asp:Label"));
    assert!(host.get_component("lblTitle").is_none());
    assert!(host.selection().get_selected_components().is_empty());

    let seen = drain(&mut events);
    assert!(seen.contains(&HostEvent::ComponentAdded {
        name: "Label1".into(),
        type_name: "Label",
    }));
    assert!(seen.contains(&HostEvent::ComponentRenamed {
        old_name: "Label1".into(),
        new_name: "lblTitle".into(),
    }));
    assert!(seen.contains(&HostEvent::ComponentRemoved { name: "lblTitle".into() }));
}

#[test]
fn test_rename_collisions() {
    let mut host = DesignerHost::default();
    host.load_text(PAGE).unwrap();

    assert_eq!(
        host.rename_component("lblName", "TXTNAME"),
        Err(EditorError::DuplicateName("TXTNAME".into()))
    );
    assert_eq!(
        host.rename_component("Page1", "Home"),
        Err(EditorError::InvalidName("Page1".into()))
    );
    assert_eq!(
        host.rename_component("lblName", "not a name"),
        Err(EditorError::InvalidName("not a name".into()))
    );
    assert!(host.document().unwrap().text().contains(r#"id="lblName""#));
}

#[test]
fn test_remove_selected_skips_root() {
    let mut host = DesignerHost::default();
    host.load_text(PAGE).unwrap();
    host.activate().unwrap();

    host.select(
        &["Page1".to_string(), "lblName".to_string(), "btnSend".to_string()],
        1,
    );
    assert_eq!(host.selection().primary_selection().as_deref(), Some("lblName"));

    let removed = host.remove_selected_controls().unwrap();
    assert_eq!(removed, vec!["btnSend", "lblName"]);
    assert_eq!(host.component_names(), vec!["Page1", "form1", "txtName"]);

    let text = host.document().unwrap().text();
    assert!(!text.contains("lblName"));
    assert!(!text.contains("btnSend"));
    assert!(text.contains("txtName"));
}

#[test]
fn test_designer_messages() {
    let mut host = DesignerHost::default();
    host.load_text(PAGE).unwrap();
    let mut events = host.subscribe();

    let raw = r#"{"MsgName":"selection_changed","Arguments":"{\"SelectedIds\":[\"txtname\",\"ghost\",\"btnSend\"],\"PrimarySelection\":1}"}"#;
    assert!(matches!(
        host.handle_designer_message(raw),
        Some(DesignerMessage::SelectionChanged(_))
    ));
    assert_eq!(
        host.selection().get_selected_components(),
        vec!["txtName", "btnSend"]
    );
    assert_eq!(host.selection().primary_selection().as_deref(), Some("btnSend"));

    let raw = r#"{"MsgName":"context_menu_request","Arguments":"{\"X\":12,\"Y\":30,\"ComponentId\":\"LBLNAME\"}"}"#;
    host.handle_designer_message(raw).unwrap();
    assert_eq!(host.handle_designer_message("Contact"), None);

    let seen = drain(&mut events);
    assert_eq!(
        seen,
        vec![
            HostEvent::SelectionChanged {
                selected: vec!["txtName".into(), "btnSend".into()],
                primary: Some("btnSend".into()),
            },
            HostEvent::ContextMenuRequested {
                x: 12,
                y: 30,
                component: Some("lblName".into()),
            },
        ]
    );
}

#[test]
fn test_serialize_document() {
    let mut host = DesignerHost::default();
    host.load_text(PAGE).unwrap();
    host.activate().unwrap();

    let html = host.serialize_document().unwrap();
    assert!(html.warnings.is_empty());
    assert!(html.html.contains(r#"data-component-id="btnSend""#));
    assert!(!html.html.contains("OnClick"));
    assert!(!html.html.contains("runat"));
    assert!(!html.html.contains("<%@"));
}

#[test]
fn test_new_file_template() {
    let mut host = DesignerHost::default();
    let report = host.new_file("Orders").unwrap();
    assert_eq!(report.ids_inserted, vec!["HtmlForm1"]);
    assert_eq!(
        host.document().unwrap().text(),
        new_document_markup("Orders").replace(
            "<form runat=\"server\">",
            "<form runat=\"server\" id=\"HtmlForm1\">"
        )
    );
}
