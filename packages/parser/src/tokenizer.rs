use logos::Logos;
use std::fmt;

/// Tokens found inside a tag or directive, between `<name` and `>`.
///
/// Text content is never tokenized; the parser scans for `<` itself and only
/// hands tag interiors to this lexer.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum TagToken<'src> {
    #[regex(r"[A-Za-z_:][A-Za-z0-9_:.\-]*", |lex| lex.slice())]
    Name(&'src str),

    #[token("=")]
    Equals,

    #[regex(r#""[^"]*""#, |lex| strip_quotes(lex.slice()))]
    DoubleQuoted(&'src str),

    #[regex(r"'[^']*'", |lex| strip_quotes(lex.slice()))]
    SingleQuoted(&'src str),

    /// Unquoted value that does not start like a name (`100px`, `#fff`)
    #[regex(r#"[0-9#.\-][^ \t\r\n"'<>=/]*"#, |lex| lex.slice())]
    Bare(&'src str),

    #[token("/>")]
    SelfClose,

    #[token(">")]
    Close,

    #[token("<")]
    Open,

    #[token("%>")]
    DirectiveClose,
}

fn strip_quotes(slice: &str) -> &str {
    &slice[1..slice.len() - 1]
}

impl<'src> TagToken<'src> {
    /// Value carried by a token that may stand on the right of `=`
    pub fn value(&self) -> Option<&'src str> {
        match self {
            TagToken::Name(value)
            | TagToken::DoubleQuoted(value)
            | TagToken::SingleQuoted(value)
            | TagToken::Bare(value) => Some(value),
            _ => None,
        }
    }
}

impl<'src> fmt::Display for TagToken<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagToken::Name(s) => write!(f, "name '{}'", s),
            TagToken::Equals => write!(f, "="),
            TagToken::DoubleQuoted(s) => write!(f, "\"{}\"", s),
            TagToken::SingleQuoted(s) => write!(f, "'{}'", s),
            TagToken::Bare(s) => write!(f, "value {}", s),
            TagToken::SelfClose => write!(f, "/>"),
            TagToken::Close => write!(f, ">"),
            TagToken::Open => write!(f, "<"),
            TagToken::DirectiveClose => write!(f, "%>"),
        }
    }
}

/// Tokenize a tag interior
pub fn tokenize(source: &str) -> Vec<(TagToken, std::ops::Range<usize>)> {
    let lexer = TagToken::lexer(source);
    lexer
        .spanned()
        .filter_map(|(result, span)| result.ok().map(|token| (token, span)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_tokens() {
        let tokens = tokenize(r#" runat="server" Text='Hi there' width=100px>"#);
        let kinds: Vec<_> = tokens.iter().map(|(token, _)| token.clone()).collect();

        assert_eq!(
            kinds,
            vec![
                TagToken::Name("runat"),
                TagToken::Equals,
                TagToken::DoubleQuoted("server"),
                TagToken::Name("Text"),
                TagToken::Equals,
                TagToken::SingleQuoted("Hi there"),
                TagToken::Name("width"),
                TagToken::Equals,
                TagToken::Bare("100px"),
                TagToken::Close,
            ]
        );
    }

    #[test]
    fn test_self_close_and_spans() {
        let tokens = tokenize(r#"id="a"/>"#);
        assert_eq!(tokens[2], (TagToken::DoubleQuoted("a"), 3..6));
        assert_eq!(tokens[3], (TagToken::SelfClose, 6..8));
    }

    #[test]
    fn test_directive_close() {
        let tokens = tokenize(r#" Page Language="C#" %>"#);
        assert_eq!(tokens[0].0, TagToken::Name("Page"));
        assert_eq!(tokens.last().map(|(token, _)| token), Some(&TagToken::DirectiveClose));
    }

    #[test]
    fn test_prefixed_names() {
        let tokens = tokenize("asp:Button xml:lang");
        assert_eq!(tokens[0].0, TagToken::Name("asp:Button"));
        assert_eq!(tokens[1].0, TagToken::Name("xml:lang"));
    }
}
