use criterion::{black_box, criterion_group, criterion_main, Criterion};
use formsmith_parser::parse;

fn parse_small_page(c: &mut Criterion) {
    let source = r#"<%@ Page Language="C#" %>
<html>
<head>
	<title>Login</title>
</head>
<body>
<form runat="server">
	<asp:Label id="Prompt" runat="server" Text="Name" />
	<asp:TextBox id="Name" runat="server" />
	<asp:Button id="Submit" runat="server" Text="Go" OnClick="Submit_Click" />
</form></body>
</html>"#;

    c.bench_function("parse_small_page", |b| b.iter(|| parse(black_box(source))));
}

fn parse_large_page(c: &mut Criterion) {
    let mut source = String::from("<html>\n<head><title>Grid</title></head>\n<body>\n<form runat=\"server\">\n");
    for i in 0..500 {
        source.push_str(&format!(
            "<div class=\"row\"><asp:Label id=\"Label{i}\" runat=\"server\" Text=\"Row {i}\" /><br>\
             <asp:TextBox id=\"Box{i}\" runat=\"server\"></asp:TextBox></div>\n"
        ));
    }
    source.push_str("</form></body>\n</html>");

    c.bench_function("parse_large_page", |b| b.iter(|| parse(black_box(&source))));
}

fn find_control_in_large_page(c: &mut Criterion) {
    let mut source = String::from("<html><body><form runat=\"server\">");
    for i in 0..500 {
        source.push_str(&format!("<asp:Button id=\"Button{i}\" runat=\"server\" />"));
    }
    source.push_str("</form></body></html>");
    let doc = parse(&source);

    c.bench_function("find_control_tag", |b| {
        b.iter(|| doc.find_control_tag(black_box("Button499")))
    });
}

criterion_group!(
    benches,
    parse_small_page,
    parse_large_page,
    find_control_in_large_page
);
criterion_main!(benches);
