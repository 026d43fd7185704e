//! Lexer implementation.
//!
//! Scans source text into tokens (keywords/identifiers/literals/operators) and
//! collects diagnostics. Newlines become tokens only where they can terminate a
//! statement: a newline after an operator, a comma or an opening delimiter is
//! dropped, as is one followed by a line starting with `.`.
//!
//! Design: single linear pass. String literal bodies are kept whole; the parser
//! splits interpolation out of them.
use crate::keywords::KEYWORDS;
use mrb_syntax::{
    Diagnostic, DiagnosticKind, Span, Token, TokenKind, is_const_start, is_ident_continue,
    is_ident_start, scan_quoted,
};

/// Lexing result.
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Ruby-subset lexer.
pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    i: usize,
    diagnostics: Vec<Diagnostic>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            i: 0,
            diagnostics: Vec::new(),
            tokens: Vec::new(),
        }
    }

    /// Run the lexer and return tokens + diagnostics.
    pub fn lex(mut self) -> LexResult {
        let approx = self.bytes.len().saturating_div(4).max(32);
        self.tokens.reserve(approx);
        while self.i < self.bytes.len() {
            let start = self.i;
            let Some(c) = self.peek_char() else {
                break;
            };
            match c {
                '\n' => {
                    self.i += 1;
                    if self.at_line_start_of("=begin") {
                        self.skip_embedded_doc();
                    }
                    if self.at_line_start_of("__END__") {
                        self.i = self.bytes.len();
                    }
                    if self.should_emit_newline() {
                        self.push(TokenKind::Newline, start, start + 1);
                    }
                }
                ' ' | '\t' | '\r' => self.i += 1,
                '\\' if self.peek_str("\\\n") => self.i += 2,
                '\\' if self.peek_str("\\\r\n") => self.i += 3,
                '#' => self.skip_comment(),
                '=' if start == 0 && self.peek_str("=begin") => self.skip_embedded_doc(),
                ';' => {
                    self.i += 1;
                    self.push(TokenKind::Semi, start, self.i);
                }
                '\'' => self.lex_single_string(),
                '"' => self.lex_double_string(),
                '@' => self.lex_sigil_var(TokenKind::IVar),
                '$' => self.lex_sigil_var(TokenKind::GVar),
                ':' => self.lex_colon(),
                '%' if self.at_word_list() => self.lex_word_list(),
                c if c.is_ascii_digit() => self.lex_number(),
                c if is_ident_start(c) => self.lex_ident_or_keyword(),
                _ => self.lex_punct(c),
            }
        }
        let end = self.bytes.len();
        self.push(TokenKind::Eof, end, end);
        LexResult {
            tokens: self.tokens,
            diagnostics: self.diagnostics,
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start as u32, end as u32),
        });
    }

    fn error(&mut self, kind: DiagnosticKind, start: usize, end: usize) {
        self.diagnostics.push(Diagnostic::error_kind(
            kind,
            Some(Span::new(start as u32, end as u32)),
        ));
    }

    fn last_kind(&self) -> Option<TokenKind> {
        self.tokens.last().map(|t| t.kind)
    }

    fn should_emit_newline(&self) -> bool {
        match self.last_kind() {
            None | Some(TokenKind::Newline | TokenKind::Semi) => false,
            Some(k) if k.continues_line() => false,
            Some(_) => !self.next_line_starts_with_dot(),
        }
    }

    /// Leading-dot method chains continue the previous line.
    fn next_line_starts_with_dot(&self) -> bool {
        let mut j = self.i;
        while j < self.bytes.len() && matches!(self.bytes[j], b' ' | b'\t' | b'\r' | b'\n') {
            j += 1;
        }
        let rest = &self.bytes[j..];
        (rest.starts_with(b".") && !rest.starts_with(b"..")) || rest.starts_with(b"&.")
    }

    fn at_line_start_of(&self, marker: &str) -> bool {
        self.peek_str(marker)
            && self
                .bytes
                .get(self.i + marker.len())
                .is_none_or(|b| b.is_ascii_whitespace())
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.i += ch.len_utf8();
        }
    }

    fn skip_embedded_doc(&mut self) {
        let start = self.i;
        while self.i < self.bytes.len() {
            if self.peek_str("\n=end") {
                self.i += "\n=end".len();
                self.skip_comment();
                return;
            }
            self.i += 1;
        }
        self.error(DiagnosticKind::UnterminatedComment, start, self.i);
    }

    fn lex_single_string(&mut self) {
        let start = self.i;
        self.i += 1;
        while self.i < self.bytes.len() {
            match self.bytes[self.i] {
                b'\\' => self.i += 2,
                b'\'' => {
                    self.i += 1;
                    self.push(TokenKind::Str, start, self.i);
                    return;
                }
                _ => self.i += 1,
            }
        }
        self.i = self.bytes.len();
        self.error(DiagnosticKind::UnterminatedString, start, self.i);
    }

    fn lex_double_string(&mut self) {
        let start = self.i;
        match scan_quoted(self.input, start) {
            Some(end) => {
                self.i = end;
                self.push(TokenKind::DStr, start, end);
            }
            None => {
                self.i = self.bytes.len();
                self.error(DiagnosticKind::UnterminatedString, start, self.i);
            }
        }
    }

    fn lex_sigil_var(&mut self, kind: TokenKind) {
        let start = self.i;
        self.i += 1;
        if kind == TokenKind::IVar && self.peek_char() == Some('@') {
            self.i += 1;
        }
        let name_start = self.i;
        while let Some(ch) = self.peek_char() {
            if is_ident_continue(ch) {
                self.i += ch.len_utf8();
            } else {
                break;
            }
        }
        if self.i == name_start {
            if let Some(ch) = self.peek_char() {
                self.i += ch.len_utf8();
            }
            self.error(DiagnosticKind::UnexpectedChar(self.bytes[start] as char), start, self.i);
            return;
        }
        self.push(kind, start, self.i);
    }

    fn lex_colon(&mut self) {
        let start = self.i;
        if self.peek_str("::") {
            self.i += 2;
            self.push(TokenKind::Colon2, start, self.i);
            return;
        }
        self.i += 1;
        match self.peek_char() {
            Some('"') => match scan_quoted(self.input, self.i) {
                Some(end) => {
                    self.i = end;
                    self.push(TokenKind::DSym, start, end);
                }
                None => {
                    self.i = self.bytes.len();
                    self.error(DiagnosticKind::UnterminatedString, start, self.i);
                }
            },
            Some(c) if is_ident_start(c) => {
                self.scan_ident_body();
                if self.peek_char() == Some('=')
                    && !matches!(self.bytes.get(self.i + 1), Some(b'=' | b'>' | b'~'))
                {
                    self.i += 1;
                }
                self.push(TokenKind::Symbol, start, self.i);
            }
            Some('@') | Some('$') => {
                self.i += 1;
                while self.peek_char() == Some('@') {
                    self.i += 1;
                }
                self.scan_ident_body();
                self.push(TokenKind::Symbol, start, self.i);
            }
            Some(_) => {
                const OPERATOR_SYMBOLS: [&str; 20] = [
                    "[]=", "[]", "<=>", "===", "==", "!=", "<=", ">=", "<<", ">>", "**", "+", "-",
                    "*", "/", "%", "<", ">", "!", "&",
                ];
                let rest = &self.input[self.i..];
                let spaced_ternary = self.last_kind().is_some_and(|k| k.ends_expr())
                    && self.bytes.get(start.wrapping_sub(1)) == Some(&b' ');
                match OPERATOR_SYMBOLS.iter().find(|op| rest.starts_with(**op)) {
                    Some(op) if !spaced_ternary => {
                        self.i += op.len();
                        self.push(TokenKind::Symbol, start, self.i);
                    }
                    _ => self.push(TokenKind::Colon, start, self.i),
                }
            }
            None => self.push(TokenKind::Colon, start, self.i),
        }
    }

    fn at_word_list(&self) -> bool {
        let opener = self.bytes.get(self.i + 2);
        self.bytes.get(self.i + 1) == Some(&b'w')
            && matches!(opener, Some(b'[' | b'(' | b'{' | b'<'))
            && !self.last_kind().is_some_and(|k| k.ends_expr())
    }

    fn lex_word_list(&mut self) {
        let start = self.i;
        let close = match self.bytes[self.i + 2] {
            b'[' => b']',
            b'(' => b')',
            b'{' => b'}',
            _ => b'>',
        };
        self.i += 3;
        while self.i < self.bytes.len() {
            if self.bytes[self.i] == close {
                self.i += 1;
                self.push(TokenKind::Words, start, self.i);
                return;
            }
            self.i += 1;
        }
        self.error(DiagnosticKind::UnterminatedString, start, self.i);
    }

    fn lex_number(&mut self) {
        let start = self.i;
        if self.peek_str("0x") || self.peek_str("0X") || self.peek_str("0b") || self.peek_str("0B")
        {
            let hex = matches!(self.bytes[self.i + 1], b'x' | b'X');
            self.i += 2;
            let mut digits = 0usize;
            while self.i < self.bytes.len() {
                let ch = self.bytes[self.i];
                if ch == b'_' {
                    self.i += 1;
                    continue;
                }
                let ok = if hex {
                    ch.is_ascii_hexdigit()
                } else {
                    ch == b'0' || ch == b'1'
                };
                if !ok {
                    break;
                }
                self.i += 1;
                digits += 1;
            }
            if digits == 0 {
                let text = self.input[start..self.i].to_string();
                self.error(DiagnosticKind::InvalidNumber(text), start, self.i);
            }
            self.push(TokenKind::Int, start, self.i);
            return;
        }

        while self.i < self.bytes.len()
            && (self.bytes[self.i].is_ascii_digit() || self.bytes[self.i] == b'_')
        {
            self.i += 1;
        }

        let mut kind = TokenKind::Int;
        if self.peek_char() == Some('.')
            && self.bytes.get(self.i + 1).is_some_and(|b| b.is_ascii_digit())
        {
            self.i += 1;
            while self.i < self.bytes.len()
                && (self.bytes[self.i].is_ascii_digit() || self.bytes[self.i] == b'_')
            {
                self.i += 1;
            }
            kind = TokenKind::Float;
        }

        if matches!(self.peek_char(), Some('e' | 'E')) {
            let exp_start = self.i;
            self.i += 1;
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.i += 1;
            }
            let mut digits = 0usize;
            while self.i < self.bytes.len() && self.bytes[self.i].is_ascii_digit() {
                self.i += 1;
                digits += 1;
            }
            if digits > 0 {
                kind = TokenKind::Float;
            } else {
                self.i = exp_start;
            }
        }

        self.push(kind, start, self.i);
    }

    fn scan_ident_body(&mut self) {
        while let Some(ch) = self.peek_char() {
            if is_ident_continue(ch) {
                self.i += ch.len_utf8();
            } else {
                break;
            }
        }
        if matches!(self.peek_char(), Some('?' | '!')) && self.bytes.get(self.i + 1) != Some(&b'=')
        {
            self.i += 1;
        }
    }

    fn lex_ident_or_keyword(&mut self) {
        let start = self.i;
        self.scan_ident_body();
        let s = &self.input[start..self.i];

        // `name:` (but not `name::`) is a hash/argument label.
        if self.peek_char() == Some(':')
            && self.bytes.get(self.i + 1) != Some(&b':')
            && self.last_kind() != Some(TokenKind::Question)
            && !s.ends_with(['?', '!'])
        {
            self.i += 1;
            self.push(TokenKind::Label, start, self.i);
            return;
        }

        // Method names may reuse keywords: `x.class`, `def end?`.
        let after_dot = matches!(self.last_kind(), Some(TokenKind::Dot));
        let after_def = matches!(self.last_kind(), Some(TokenKind::KwDef)) && s != "self";
        let keyword = if after_dot || after_def {
            None
        } else {
            KEYWORDS.get(s).cloned()
        };
        let kind = match keyword {
            Some(k) => k,
            None if s.chars().next().is_some_and(is_const_start) && !s.ends_with(['?', '!']) => {
                TokenKind::Const
            }
            None => TokenKind::Ident,
        };
        self.push(kind, start, self.i);
    }

    fn lex_punct(&mut self, c: char) {
        const PUNCT: [(&str, TokenKind); 45] = [
            ("...", TokenKind::DotDotDot),
            ("===", TokenKind::EqEqEq),
            ("<=>", TokenKind::Cmp),
            ("||=", TokenKind::OrEq),
            ("&&=", TokenKind::AndEq),
            ("..", TokenKind::DotDot),
            ("==", TokenKind::EqEq),
            ("!=", TokenKind::Ne),
            ("=>", TokenKind::FatArrow),
            ("->", TokenKind::Arrow),
            ("<=", TokenKind::Le),
            (">=", TokenKind::Ge),
            ("<<", TokenKind::Shl),
            (">>", TokenKind::Shr),
            ("**", TokenKind::Pow),
            ("&&", TokenKind::AmpAmp),
            ("||", TokenKind::PipePipe),
            ("+=", TokenKind::PlusEq),
            ("-=", TokenKind::MinusEq),
            ("*=", TokenKind::StarEq),
            ("/=", TokenKind::SlashEq),
            ("%=", TokenKind::PercentEq),
            ("&.", TokenKind::Dot),
            ("(", TokenKind::LParen),
            (")", TokenKind::RParen),
            ("[", TokenKind::LBracket),
            ("]", TokenKind::RBracket),
            ("{", TokenKind::LBrace),
            ("}", TokenKind::RBrace),
            (",", TokenKind::Comma),
            (".", TokenKind::Dot),
            ("?", TokenKind::Question),
            ("=", TokenKind::Eq),
            ("!", TokenKind::Bang),
            ("<", TokenKind::Lt),
            (">", TokenKind::Gt),
            ("+", TokenKind::Plus),
            ("-", TokenKind::Minus),
            ("*", TokenKind::Star),
            ("/", TokenKind::Slash),
            ("%", TokenKind::Percent),
            ("&", TokenKind::Amp),
            ("|", TokenKind::Pipe),
            ("^", TokenKind::Caret),
            ("~", TokenKind::Tilde),
        ];
        let start = self.i;
        let rest = &self.input[self.i..];
        for (text, kind) in PUNCT {
            if rest.starts_with(text) {
                self.i += text.len();
                self.push(kind, start, self.i);
                return;
            }
        }
        self.i += c.len_utf8();
        self.error(DiagnosticKind::UnexpectedChar(c), start, self.i);
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.i..].chars().next()
    }

    fn peek_str(&self, s: &str) -> bool {
        self.bytes[self.i..].starts_with(s.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).lex().tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn newline_after_operator_is_dropped() {
        assert_eq!(
            kinds("1 +\n2\n"),
            vec![
                TokenKind::Int,
                TokenKind::Plus,
                TokenKind::Int,
                TokenKind::Newline,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn leading_dot_continues_chain() {
        assert_eq!(
            kinds("a\n  .b"),
            vec![TokenKind::Ident, TokenKind::Dot, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn labels_symbols_and_ternary_colon() {
        assert_eq!(
            kinds("{a: :b}"),
            vec![
                TokenKind::LBrace,
                TokenKind::Label,
                TokenKind::Symbol,
                TokenKind::RBrace,
                TokenKind::Eof
            ]
        );
        assert_eq!(
            kinds("x ? 1 : 2"),
            vec![
                TokenKind::Ident,
                TokenKind::Question,
                TokenKind::Int,
                TokenKind::Colon,
                TokenKind::Int,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn predicate_method_names_keep_suffix() {
        let src = "x.empty? != y";
        let lexed = Lexer::new(src).lex();
        assert_eq!(lexed.tokens[2].kind, TokenKind::Ident);
        let span = lexed.tokens[2].span;
        assert_eq!(&src[span.start.0 as usize..span.end.0 as usize], "empty?");
        assert_eq!(lexed.tokens[3].kind, TokenKind::Ne);
    }

    #[test]
    fn keyword_after_dot_is_identifier() {
        assert_eq!(
            kinds("self.class"),
            vec![TokenKind::KwSelf, TokenKind::Dot, TokenKind::Ident, TokenKind::Eof]
        );
    }
}
