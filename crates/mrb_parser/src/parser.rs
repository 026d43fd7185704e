//! Parser.
//!
//! Converts lexer tokens into a syntax tree and collects diagnostics. Statements
//! are parsed by recursive descent, binary operators by Pratt parsing.
//!
//! Ruby decides between a local variable read and a method call by whether the
//! name was assigned earlier in the scope, so the parser tracks locals per scope.
//! Parsing stops at the first syntax error.
use std::collections::HashSet;

use mrb_ir::{Body, JumpTarget, Program};
use mrb_lexer::Lexer;
use mrb_syntax::{Diagnostic, DiagnosticKind, Span, Token, TokenKind};

pub(crate) const MAX_NESTING: u32 = 512;
pub(crate) const STACK_RED_ZONE: usize = 64 * 1024;
pub(crate) const STACK_GROW_SIZE: usize = 1024 * 1024;

/// Parse result.
pub struct ParseResult {
    pub program: Program,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    /// First error by source position.
    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.diagnostics
            .iter()
            .min_by_key(|d| d.span.map_or(u32::MAX, |s| s.start.0))
    }
}

/// Lex and parse a whole program.
pub fn parse_program(input: &str) -> ParseResult {
    let lexed = Lexer::new(input).lex();
    let mut result = Parser::new(input, &lexed.tokens).parse();
    result.diagnostics.extend(lexed.diagnostics);
    result
}

pub(crate) struct Scope {
    locals: HashSet<String>,
    /// `def`, `class` and `module` bodies do not see enclosing locals.
    opaque: bool,
}

impl Scope {
    fn new(opaque: bool) -> Self {
        Self {
            locals: HashSet::new(),
            opaque,
        }
    }
}

/// Ruby-subset parser.
pub struct Parser<'a> {
    pub(crate) input: &'a str,
    pub(crate) tokens: &'a [Token],
    pub(crate) i: usize,
    /// Added to every reported span; non-zero for `#{}` sources.
    pub(crate) offset: u32,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) scopes: Vec<Scope>,
    /// What `break`/`next` leave, innermost last.
    pub(crate) jumps: Vec<JumpTarget>,
    /// Set while parsing `while` conditions and command arguments, where `do`
    /// belongs to the enclosing construct.
    pub(crate) no_do: bool,
    pub(crate) in_def: bool,
    /// Expressions currently open; capped at `MAX_NESTING`.
    pub(crate) depth: u32,
}

impl<'a> Parser<'a> {
    /// Create a new parser.
    pub fn new(input: &'a str, tokens: &'a [Token]) -> Self {
        Self {
            input,
            tokens,
            i: 0,
            offset: 0,
            diagnostics: Vec::new(),
            scopes: vec![Scope::new(true)],
            jumps: Vec::new(),
            no_do: false,
            in_def: false,
            depth: 0,
        }
    }

    /// Parse the full input and return a program plus diagnostics.
    pub fn parse(mut self) -> ParseResult {
        let body = self.parse_program_body().unwrap_or_default();
        ParseResult {
            program: Program { body },
            diagnostics: self.diagnostics,
        }
    }

    pub(crate) fn parse_program_body(&mut self) -> Option<Body> {
        let body = self.parse_stmts(&[])?;
        if !self.at(TokenKind::Eof) {
            return self.unexpected();
        }
        Some(body)
    }

    /// Statements up to (not including) one of `terms` or end of file.
    pub(crate) fn parse_stmts(&mut self, terms: &[TokenKind]) -> Option<Body> {
        let mut out = Vec::new();
        loop {
            self.skip_terms();
            let kind = self.peek_kind();
            if kind == TokenKind::Eof || terms.contains(&kind) {
                break;
            }
            out.push(self.parse_stmt()?);
            match self.peek_kind() {
                TokenKind::Newline | TokenKind::Semi | TokenKind::Eof => {}
                k if terms.contains(&k) => {}
                _ => return self.unexpected(),
            }
        }
        Some(out.into_boxed_slice())
    }

    pub(crate) fn is_local(&self, name: &str) -> bool {
        for scope in self.scopes.iter().rev() {
            if scope.locals.contains(name) {
                return true;
            }
            if scope.opaque {
                break;
            }
        }
        false
    }

    pub(crate) fn declare(&mut self, name: &str) {
        if self.is_local(name) {
            return;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.locals.insert(name.to_string());
        }
    }

    /// Runs `f` inside a fresh local scope.
    ///
    /// Opaque scopes (method and class bodies) also start with no enclosing
    /// loop or block for `break`/`next`.
    pub(crate) fn scoped<T>(
        &mut self,
        opaque: bool,
        jump: Option<JumpTarget>,
        f: impl FnOnce(&mut Self) -> Option<T>,
    ) -> Option<T> {
        self.scopes.push(Scope::new(opaque));
        let saved_jumps = if opaque {
            std::mem::take(&mut self.jumps)
        } else {
            self.jumps.clone()
        };
        if let Some(j) = jump {
            self.jumps.push(j);
        }
        let saved_no_do = std::mem::replace(&mut self.no_do, false);
        let out = f(self);
        self.no_do = saved_no_do;
        self.jumps = saved_jumps;
        self.scopes.pop();
        out
    }

    pub(crate) fn with_no_do<T>(
        &mut self,
        no_do: bool,
        f: impl FnOnce(&mut Self) -> Option<T>,
    ) -> Option<T> {
        let saved = std::mem::replace(&mut self.no_do, no_do);
        let out = f(self);
        self.no_do = saved;
        out
    }

    pub(crate) fn jump_target(&self) -> JumpTarget {
        self.jumps.last().copied().unwrap_or(JumpTarget::Loop)
    }

    pub(crate) fn peek_kind(&self) -> TokenKind {
        self.tokens
            .get(self.i)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    pub(crate) fn peek_kind_n(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.i + n).map(|t| t.kind)
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    pub(crate) fn bump(&mut self) {
        if self.i < self.tokens.len() {
            self.i += 1;
        }
    }

    pub(crate) fn bumped(&mut self) -> Token {
        let t = self.tokens.get(self.i).cloned().unwrap_or(Token {
            kind: TokenKind::Eof,
            span: Span::point(self.input.len() as u32),
        });
        self.bump();
        t
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            return true;
        }
        false
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            return Some(self.bumped());
        }
        self.unexpected()
    }

    /// Closes a `what ... end` construct.
    pub(crate) fn expect_end(&mut self, what: &'static str) -> Option<()> {
        self.skip_terms();
        if self.eat(TokenKind::KwEnd) {
            return Some(());
        }
        let span = self.cur_span();
        let kind = if self.at(TokenKind::Eof) {
            DiagnosticKind::MissingEnd(what)
        } else {
            DiagnosticKind::UnexpectedExpecting {
                found: self.describe_current(),
                expected: "keyword_end".to_string(),
            }
        };
        self.diagnostics.push(Diagnostic::error_kind(kind, Some(span)));
        None
    }

    /// Reports the current token as unexpected.
    pub(crate) fn unexpected<T>(&mut self) -> Option<T> {
        let span = self.cur_span();
        let found = self.describe_current();
        self.diagnostics.push(Diagnostic::error_kind(
            DiagnosticKind::Unexpected(found),
            Some(span),
        ));
        None
    }

    pub(crate) fn error_at<T>(&mut self, kind: DiagnosticKind, span: Span) -> Option<T> {
        self.diagnostics.push(Diagnostic::error_kind(kind, Some(span)));
        None
    }

    fn describe_current(&self) -> String {
        match self.tokens.get(self.i) {
            Some(t) => t.kind.describe(self.text(t)),
            None => TokenKind::Eof.describe(""),
        }
    }

    pub(crate) fn skip_newlines(&mut self) {
        while self.at(TokenKind::Newline) {
            self.bump();
        }
    }

    pub(crate) fn skip_terms(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Semi) {
            self.bump();
        }
    }

    /// Separator after `if cond`, `when x` and friends: newlines, `;` or `then`.
    pub(crate) fn skip_then(&mut self) {
        self.skip_terms();
        if self.eat(TokenKind::KwThen) {
            self.skip_terms();
        }
    }

    /// Whitespace separates the current token from the previous one.
    pub(crate) fn space_before(&self) -> bool {
        match (self.i.checked_sub(1).and_then(|j| self.tokens.get(j)), self.tokens.get(self.i)) {
            (Some(prev), Some(cur)) => prev.span.end.0 < cur.span.start.0,
            _ => true,
        }
    }

    /// Whitespace follows the current token.
    pub(crate) fn space_after(&self) -> bool {
        match (self.tokens.get(self.i), self.tokens.get(self.i + 1)) {
            (Some(cur), Some(next)) => cur.span.end.0 < next.span.start.0,
            _ => true,
        }
    }

    pub(crate) fn text(&self, t: &Token) -> &'a str {
        let start = (t.span.start.0 as usize).min(self.input.len());
        let end = (t.span.end.0 as usize).min(self.input.len());
        self.input.get(start..end).unwrap_or("")
    }

    /// Span of `t` in the outermost source.
    pub(crate) fn span_of(&self, t: &Token) -> Span {
        t.span.shifted(self.offset)
    }

    pub(crate) fn cur_span(&self) -> Span {
        match self.tokens.get(self.i) {
            Some(t) => self.span_of(t),
            None => {
                Span::point(self.input.len() as u32 + self.offset)
            }
        }
    }
}

/// Binding powers of binary operators, `(left, right)`; higher binds tighter.
pub(crate) fn infix_binding_power(kind: TokenKind) -> Option<(u8, u8)> {
    let bp = match kind {
        TokenKind::PipePipe => (2, 3),
        TokenKind::AmpAmp => (4, 5),
        TokenKind::Cmp | TokenKind::EqEq | TokenKind::EqEqEq | TokenKind::Ne => (6, 7),
        TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge => (8, 9),
        TokenKind::Pipe | TokenKind::Caret => (10, 11),
        TokenKind::Amp => (12, 13),
        TokenKind::Shl | TokenKind::Shr => (14, 15),
        TokenKind::Plus | TokenKind::Minus => (16, 17),
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => (18, 19),
        TokenKind::Pow => (23, 22),
        _ => return None,
    };
    Some(bp)
}

/// Operand binding power of unary minus: looser than `**`, tighter than `*`.
pub(crate) const UNARY_MINUS_BP: u8 = 20;

/// Method name behind a compound assignment token.
pub(crate) fn assign_op(kind: TokenKind) -> Option<mrb_ir::AssignOp> {
    use mrb_ir::AssignOp;
    let op = match kind {
        TokenKind::OrEq => AssignOp::Or,
        TokenKind::AndEq => AssignOp::And,
        TokenKind::PlusEq => AssignOp::Binary("+"),
        TokenKind::MinusEq => AssignOp::Binary("-"),
        TokenKind::StarEq => AssignOp::Binary("*"),
        TokenKind::SlashEq => AssignOp::Binary("/"),
        TokenKind::PercentEq => AssignOp::Binary("%"),
        _ => return None,
    };
    Some(op)
}
