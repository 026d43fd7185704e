use mrb_ir::{Body, Expr, StrPart};
use mrb_lexer::Lexer;
use mrb_syntax::{StrPiece, Token, split_interpolation, unescape_double};

use crate::parser::Parser;

impl<'a> Parser<'a> {
    /// Double-quoted string token; `quote_len` is the length of the opening delimiter.
    pub(crate) fn parse_dstr(&mut self, t: &Token, quote_len: usize) -> Option<Expr> {
        let parts = self.parse_str_parts(t, quote_len)?;
        Some(match literal_bytes(&parts) {
            Some(bytes) => Expr::Str(bytes.into_boxed_slice()),
            None => Expr::DStr(parts.into_boxed_slice()),
        })
    }

    /// `:"..."`
    pub(crate) fn parse_dsym(&mut self, t: &Token) -> Option<Expr> {
        let parts = self.parse_str_parts(t, 2)?;
        Some(match literal_bytes(&parts) {
            Some(bytes) => Expr::Sym(String::from_utf8_lossy(&bytes).into_owned()),
            None => Expr::DSym(parts.into_boxed_slice()),
        })
    }

    fn parse_str_parts(&mut self, t: &Token, quote_len: usize) -> Option<Vec<StrPart>> {
        let raw = self.text(t);
        let body = raw.get(quote_len..raw.len().saturating_sub(1)).unwrap_or("");
        let body_start = t.span.start.0 + quote_len as u32;
        let mut parts = Vec::new();
        for piece in split_interpolation(body) {
            match piece {
                StrPiece::Lit(text) => {
                    parts.push(StrPart::Lit(unescape_double(text).into_boxed_slice()))
                }
                StrPiece::Expr(code, at) => {
                    let body = self.parse_embedded(code, body_start + at as u32)?;
                    parts.push(StrPart::Code(body));
                }
            }
        }
        Some(parts)
    }

    /// Parses the code of one `#{}`; `at` is its offset in this parser's input.
    ///
    /// The sub-parser shares the local scopes, so `"#{x}"` reads the local `x`
    /// and assignments inside the braces declare locals of the enclosing scope.
    fn parse_embedded(&mut self, code: &str, at: u32) -> Option<Body> {
        let offset = self.offset + at;
        let lexed = Lexer::new(code).lex();
        let mut sub = Parser::new(code, &lexed.tokens);
        sub.offset = offset;
        sub.scopes = std::mem::take(&mut self.scopes);
        sub.jumps = self.jumps.clone();
        sub.in_def = self.in_def;
        sub.depth = self.depth;
        let body = if lexed.diagnostics.is_empty() {
            sub.parse_program_body()
        } else {
            None
        };
        self.scopes = std::mem::take(&mut sub.scopes);
        self.diagnostics.extend(sub.diagnostics);
        for mut d in lexed.diagnostics {
            d.span = d.span.map(|s| s.shifted(offset));
            self.diagnostics.push(d);
        }
        body
    }
}

/// The bytes of a string without interpolated code.
fn literal_bytes(parts: &[StrPart]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    for part in parts {
        match part {
            StrPart::Lit(bytes) => out.extend_from_slice(bytes),
            StrPart::Code(_) => return None,
        }
    }
    Some(out)
}
