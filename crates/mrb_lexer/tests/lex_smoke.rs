use mrb_lexer::Lexer;
use mrb_syntax::TokenKind;

fn kinds(src: &str) -> Vec<TokenKind> {
    Lexer::new(src).lex().tokens.iter().map(|t| t.kind).collect()
}

#[test]
fn lex_smoke_method_definition() {
    let src = "def concat(a, b)\n  a + b\nend\n\nconcat \"Hello\", \"World\"\n";
    let result = Lexer::new(src).lex();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    assert_eq!(result.tokens.first().map(|t| t.kind), Some(TokenKind::KwDef));
    assert!(result.tokens.iter().filter(|t| t.kind == TokenKind::DStr).count() == 2);
}

#[test]
fn blank_lines_collapse_to_one_newline() {
    assert_eq!(
        kinds("a\n\n\n# comment\nb"),
        vec![TokenKind::Ident, TokenKind::Newline, TokenKind::Ident, TokenKind::Eof]
    );
}

#[test]
fn interpolated_string_is_one_token() {
    let src = r##""sum: #{[1, 2].map { |x| "#{x}" }.join(",")}""##;
    let result = Lexer::new(src).lex();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    assert_eq!(kinds(src), vec![TokenKind::DStr, TokenKind::Eof]);
}

#[test]
fn operator_symbols() {
    assert_eq!(
        kinds("inject(:+)"),
        vec![
            TokenKind::Ident,
            TokenKind::LParen,
            TokenKind::Symbol,
            TokenKind::RParen,
            TokenKind::Eof
        ]
    );
}

#[test]
fn numbers_and_ranges() {
    assert_eq!(
        kinds("1..0x1F 1.5e3 2.even?"),
        vec![
            TokenKind::Int,
            TokenKind::DotDot,
            TokenKind::Int,
            TokenKind::Float,
            TokenKind::Int,
            TokenKind::Dot,
            TokenKind::Ident,
            TokenKind::Eof
        ]
    );
}

#[test]
fn word_list_only_at_expression_start() {
    assert_eq!(kinds("%w[a b]"), vec![TokenKind::Words, TokenKind::Eof]);
    assert_eq!(
        kinds("x %w"),
        vec![TokenKind::Ident, TokenKind::Percent, TokenKind::Ident, TokenKind::Eof]
    );
}

#[test]
fn unterminated_string_is_reported() {
    let result = Lexer::new("'abc").lex();
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(
        result.diagnostics[0].message,
        "unterminated string meets end of file"
    );
}

#[test]
fn embedded_documents_are_skipped() {
    assert_eq!(
        kinds("=begin\nignored\n=end\n1"),
        vec![TokenKind::Int, TokenKind::Eof]
    );
}
