//! Parsing whole pages the way the designer sees them

use formsmith_parser::{parse, Node, TagEnd, TextLocation};

const LOGIN_PAGE: &str = r#"<%@ Page Language="C#" %>
<html>
<head>
	<title>Login</title>
	<script type="text/javascript">function go() { return 1 < 2; }</script>
</head>
<body>
<form runat="server">
	<asp:Label id="Prompt" runat="server" Text="Name" />
	<asp:TextBox ID="Name" runat="server"></asp:TextBox>
	<input type="button" value="Local" runat="server" id="Plain">
</form></body>
</html>"#;

#[test]
fn test_server_controls_in_document_order() {
    let doc = parse(LOGIN_PAGE);
    let ids: Vec<_> = doc
        .server_controls()
        .filter_map(|element| element.id())
        .collect();

    // the form is a server control without an id
    assert_eq!(ids, vec!["Prompt", "Name", "Plain"]);
    assert!(doc.diagnostics.is_empty(), "{:?}", doc.diagnostics);
}

#[test]
fn test_text_between_nodes_comes_from_source() {
    let doc = parse(LOGIN_PAGE);
    let form = doc
        .elements()
        .find(|element| element.name.is("form"))
        .expect("form element");

    let first = form.children[0].as_element().expect("label");
    let gap = doc.text_between(form.region.end, first.region.begin);
    assert_eq!(gap, "\n\t");

    let last = form.children.last().and_then(Node::as_element).expect("input");
    assert_eq!(last.end, TagEnd::Void);
    let tail = doc.text_between(last.end_location(), form.closing_tag().expect("closed").begin);
    assert_eq!(tail, "\n");
}

#[test]
fn test_regions_are_line_and_column() {
    let doc = parse(LOGIN_PAGE);
    let label = doc.find_control_tag("prompt").expect("label");

    assert_eq!(label.region.begin, TextLocation::new(9, 2));
    assert!(label.is_self_closing());
    assert_eq!(doc.source().region_text(label.region), r#"<asp:Label id="Prompt" runat="server" Text="Name" />"#);
}

#[test]
fn test_mixed_case_closing_tags() {
    let doc = parse("<asp:Panel runat=\"server\" id=\"p\"><P>text</p></ASP:PANEL>");
    let panel = doc.find_control_tag("p").expect("panel");
    assert!(panel.closing_tag().is_some());
    assert!(doc.diagnostics.is_empty());
}

#[test]
fn test_tree_serializes_to_json() {
    let doc = parse("<br/>");
    let json = serde_json::to_string(&doc.nodes).expect("serializable");
    assert!(json.contains("\"type\":\"Element\""));
}

#[test]
fn test_attribute_values_are_decoded() {
    let doc = parse(r#"<asp:Label id="l" runat="server" Text="a &amp; &quot;b&quot; &#x3C;&#62; &bogus; & c" />"#);
    let label = doc.find_control_tag("l").expect("label");
    let text = label.attribute_ci("Text").expect("text attribute");

    assert_eq!(text.value, r#"a & "b" <> &bogus; & c"#);
    // the region still covers the text as written
    assert_eq!(
        doc.source().region_text(text.region),
        r#"Text="a &amp; &quot;b&quot; &#x3C;&#62; &bogus; & c""#
    );
}

#[test]
fn test_server_script_is_not_a_control() {
    let doc = parse(concat!(
        "<script runat=\"server\">void Page_Load() { }</script>\n",
        "<div runat=\"server\" id=\"d\"></div>"
    ));
    let ids: Vec<_> = doc.server_controls().filter_map(|element| element.id()).collect();
    assert_eq!(ids, vec!["d"]);
    assert!(doc.find_control_tag("d").is_some());
}
