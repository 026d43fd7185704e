use std::rc::Rc;

use mrb_ir::{
    AssignExpr, BeginExpr, BlockArg, BlockDef, CallExpr, ConstRef, Expr, IfExpr,
    MultiAssignExpr, OpAssignExpr, Params, RangeExpr, RescueClause, Target, WhileExpr,
};
use mrb_syntax::{DiagnosticKind, Span, TokenKind, unescape_single};

use crate::parser::{
    MAX_NESTING, Parser, STACK_GROW_SIZE, STACK_RED_ZONE, UNARY_MINUS_BP, assign_op,
    infix_binding_power,
};

/// Expression produced by an operator: `lhs.op(rhs)`.
fn binop(lhs: Expr, op: &str, rhs: Expr, span: Span) -> Expr {
    Expr::Call(Box::new(CallExpr {
        recv: Some(lhs),
        name: op.to_string(),
        args: Box::new([rhs]),
        block: None,
        span,
    }))
}

/// Tokens that begin an operand and never continue the previous expression.
fn starts_operand(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Int
            | TokenKind::Float
            | TokenKind::Str
            | TokenKind::DStr
            | TokenKind::Symbol
            | TokenKind::DSym
            | TokenKind::Words
            | TokenKind::Ident
            | TokenKind::Const
            | TokenKind::IVar
            | TokenKind::GVar
            | TokenKind::Label
            | TokenKind::KwNil
            | TokenKind::KwTrue
            | TokenKind::KwFalse
            | TokenKind::KwSelf
            | TokenKind::KwFile
            | TokenKind::KwNot
            | TokenKind::KwDef
            | TokenKind::KwSuper
            | TokenKind::KwYield
            | TokenKind::KwCase
            | TokenKind::Arrow
            | TokenKind::LBracket
            | TokenKind::LParen
            | TokenKind::Bang
    )
}

fn is_local_name(name: &str) -> bool {
    name.starts_with(|c: char| c == '_' || c.is_lowercase()) && !name.ends_with(['?', '!'])
}

impl<'a> Parser<'a> {
    pub(crate) fn parse_stmt(&mut self) -> Option<Expr> {
        let start = self.cur_span();
        let mut e = self.parse_expr_stmt()?;
        if self.at(TokenKind::Comma) && Self::is_mlhs_item(&e) {
            e = self.parse_multi_assign(e, start)?;
        }
        loop {
            e = match self.peek_kind() {
                TokenKind::KwIf | TokenKind::KwUnless => {
                    let negate = self.at(TokenKind::KwUnless);
                    self.bump();
                    let cond = self.parse_expr_stmt()?;
                    Expr::If(Box::new(IfExpr {
                        cond: if negate { Expr::Not(Box::new(cond)) } else { cond },
                        then_body: Box::new([e]),
                        else_body: None,
                    }))
                }
                TokenKind::KwWhile | TokenKind::KwUntil => {
                    let until = self.at(TokenKind::KwUntil);
                    self.bump();
                    let cond = self.parse_expr_stmt()?;
                    Expr::While(Box::new(WhileExpr {
                        cond,
                        body: Box::new([e]),
                        until,
                    }))
                }
                TokenKind::KwRescue => {
                    self.bump();
                    let fallback = self.parse_expr_stmt()?;
                    Expr::Begin(Box::new(BeginExpr {
                        body: Box::new([e]),
                        rescues: Box::new([RescueClause {
                            classes: Box::new([]),
                            var: None,
                            body: Box::new([fallback]),
                        }]),
                        else_body: None,
                        ensure: None,
                    }))
                }
                _ => break,
            };
        }
        Some(e)
    }

    /// `a and b`, `a or b`, `not a`.
    pub(crate) fn parse_expr_stmt(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_not()?;
        loop {
            let and = match self.peek_kind() {
                TokenKind::KwAnd => true,
                TokenKind::KwOr => false,
                _ => break,
            };
            self.bump();
            self.skip_newlines();
            let rhs = self.parse_not()?;
            lhs = if and {
                Expr::And(Box::new(lhs), Box::new(rhs))
            } else {
                Expr::Or(Box::new(lhs), Box::new(rhs))
            };
        }
        Some(lhs)
    }

    fn parse_not(&mut self) -> Option<Expr> {
        if self.eat(TokenKind::KwNot) {
            let e = self.parse_not()?;
            return Some(Expr::Not(Box::new(e)));
        }
        self.parse_expr()
    }

    /// Assignment level: `target = value`, `target op= value`, or a ternary.
    pub(crate) fn parse_expr(&mut self) -> Option<Expr> {
        let start = self.cur_span();
        let lhs = self.parse_ternary()?;
        let kind = self.peek_kind();
        if kind == TokenKind::Eq {
            let target = self.to_target(lhs, start)?;
            self.bump();
            self.skip_newlines();
            let value = self.parse_expr()?;
            return Some(Expr::Assign(Box::new(AssignExpr { target, value })));
        }
        match assign_op(kind) {
            Some(op) => {
                let target = self.to_target(lhs, start)?;
                self.bump();
                self.skip_newlines();
                let value = self.parse_expr()?;
                Some(Expr::OpAssign(Box::new(OpAssignExpr { target, op, value })))
            }
            None => Some(lhs),
        }
    }

    fn is_mlhs_item(e: &Expr) -> bool {
        match e {
            Expr::LVar(_) | Expr::IVar(_) | Expr::GVar(_) | Expr::Const(_) => true,
            Expr::Call(c) => {
                c.block.is_none()
                    && match &c.recv {
                        None => c.args.is_empty() && is_local_name(&c.name),
                        Some(_) => c.name == "[]" || c.args.is_empty(),
                    }
            }
            _ => false,
        }
    }

    /// `a, b = 1, 2` once the first target has been parsed.
    fn parse_multi_assign(&mut self, first: Expr, first_span: Span) -> Option<Expr> {
        let mut targets = vec![self.to_target(first, first_span)?];
        while self.eat(TokenKind::Comma) {
            if self.at(TokenKind::Eq) {
                break;
            }
            let splat = self.eat(TokenKind::Star);
            let span = self.cur_span();
            let e = self.parse_unary()?;
            let t = self.to_target(e, span)?;
            targets.push(if splat { Target::Splat(Box::new(t)) } else { t });
        }
        self.expect(TokenKind::Eq)?;
        self.skip_newlines();
        let first = self.parse_rhs_item()?;
        let value = if self.at(TokenKind::Comma) {
            let mut items = vec![first];
            while self.eat(TokenKind::Comma) {
                self.skip_newlines();
                items.push(self.parse_rhs_item()?);
            }
            Expr::Array(items.into_boxed_slice())
        } else {
            first
        };
        Some(Expr::MultiAssign(Box::new(MultiAssignExpr {
            targets: targets.into_boxed_slice(),
            value,
        })))
    }

    fn parse_rhs_item(&mut self) -> Option<Expr> {
        if self.eat(TokenKind::Star) {
            let e = self.parse_ternary()?;
            return Some(Expr::Splat(Box::new(e)));
        }
        self.parse_expr()
    }

    /// Reinterprets a parsed expression as an assignment target.
    fn to_target(&mut self, e: Expr, span: Span) -> Option<Target> {
        let target = match e {
            Expr::LVar(n) => Target::LVar(n),
            Expr::IVar(n) => Target::IVar(n),
            Expr::GVar(n) => Target::GVar(n),
            Expr::Const(c) => {
                if self.in_def {
                    return self.error_at(DiagnosticKind::DynamicConstantAssignment, span);
                }
                Target::Const(*c)
            }
            Expr::Call(c) if c.block.is_none() => {
                let c = *c;
                match c.recv {
                    None if c.args.is_empty() && is_local_name(&c.name) => {
                        self.declare(&c.name);
                        Target::LVar(c.name)
                    }
                    Some(recv) if c.name == "[]" => Target::Index {
                        recv,
                        args: c.args,
                    },
                    Some(recv) if c.args.is_empty() && is_local_name(&c.name) => Target::Attr {
                        recv,
                        name: c.name,
                    },
                    _ => return self.error_at(DiagnosticKind::InvalidAssignmentTarget, span),
                }
            }
            _ => return self.error_at(DiagnosticKind::InvalidAssignmentTarget, span),
        };
        Some(target)
    }

    fn parse_ternary(&mut self) -> Option<Expr> {
        let cond = self.parse_range()?;
        if !self.eat(TokenKind::Question) {
            return Some(cond);
        }
        self.skip_newlines();
        let then = self.parse_ternary()?;
        self.skip_newlines();
        self.expect(TokenKind::Colon)?;
        self.skip_newlines();
        let other = self.parse_ternary()?;
        Some(Expr::If(Box::new(IfExpr {
            cond,
            then_body: Box::new([then]),
            else_body: Some(Box::new([other])),
        })))
    }

    fn parse_range(&mut self) -> Option<Expr> {
        let lo = self.parse_binary(0)?;
        let exclusive = match self.peek_kind() {
            TokenKind::DotDot => false,
            TokenKind::DotDotDot => true,
            _ => return Some(lo),
        };
        self.bump();
        let hi = self.parse_binary(0)?;
        Some(Expr::Range(Box::new(RangeExpr { lo, hi, exclusive })))
    }

    pub(crate) fn parse_binary(&mut self, min_bp: u8) -> Option<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let kind = self.peek_kind();
            let Some((l_bp, r_bp)) = infix_binding_power(kind) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            let op = self.bumped();
            let span = self.span_of(&op);
            self.skip_newlines();
            let rhs = self.parse_binary(r_bp)?;
            lhs = match kind {
                TokenKind::AmpAmp => Expr::And(Box::new(lhs), Box::new(rhs)),
                TokenKind::PipePipe => Expr::Or(Box::new(lhs), Box::new(rhs)),
                TokenKind::Ne => Expr::Not(Box::new(binop(lhs, "==", rhs, span))),
                _ => binop(lhs, self.text(&op), rhs, span),
            };
        }
        Some(lhs)
    }

    pub(crate) fn parse_unary(&mut self) -> Option<Expr> {
        if self.depth >= MAX_NESTING {
            let span = self.cur_span();
            return self.error_at(DiagnosticKind::TooDeeplyNested, span);
        }
        self.depth += 1;
        let out = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.parse_prefixed());
        self.depth -= 1;
        out
    }

    fn parse_prefixed(&mut self) -> Option<Expr> {
        match self.peek_kind() {
            TokenKind::Bang => {
                self.bump();
                let e = self.parse_unary()?;
                Some(Expr::Not(Box::new(e)))
            }
            TokenKind::Minus => {
                let minus = self.bumped();
                let literal = matches!(self.peek_kind(), TokenKind::Int | TokenKind::Float);
                if literal && !self.space_before() && self.peek_kind_n(1) != Some(TokenKind::Pow)
                {
                    let e = self.parse_number(true)?;
                    return self.parse_postfix(e);
                }
                let span = self.span_of(&minus);
                let operand = self.parse_binary(UNARY_MINUS_BP)?;
                Some(Expr::Call(Box::new(CallExpr {
                    recv: Some(operand),
                    name: "-@".to_string(),
                    args: Box::new([]),
                    block: None,
                    span,
                })))
            }
            TokenKind::Plus => {
                self.bump();
                self.parse_binary(UNARY_MINUS_BP)
            }
            TokenKind::Tilde => {
                let t = self.bumped();
                let span = self.span_of(&t);
                let operand = self.parse_unary()?;
                Some(Expr::Call(Box::new(CallExpr {
                    recv: Some(operand),
                    name: "~".to_string(),
                    args: Box::new([]),
                    block: None,
                    span,
                })))
            }
            _ => {
                let e = self.parse_primary()?;
                self.parse_postfix(e)
            }
        }
    }

    /// Method calls, `::` lookups and indexing after a primary expression.
    fn parse_postfix(&mut self, mut e: Expr) -> Option<Expr> {
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.bump();
                    self.skip_newlines();
                    if self.at(TokenKind::LParen) {
                        let span = self.cur_span();
                        e = self.parse_call_rest(Some(e), "call".to_string(), span)?;
                        continue;
                    }
                    let t = match self.peek_kind() {
                        TokenKind::Ident | TokenKind::Const => self.bumped(),
                        _ => return self.unexpected(),
                    };
                    let span = self.span_of(&t);
                    e = self.parse_call_rest(Some(e), self.text(&t).to_string(), span)?;
                }
                TokenKind::Colon2 => {
                    self.bump();
                    let t = match self.peek_kind() {
                        TokenKind::Ident | TokenKind::Const => self.bumped(),
                        _ => return self.unexpected(),
                    };
                    let name = self.text(&t).to_string();
                    let span = self.span_of(&t);
                    let paren = self.at(TokenKind::LParen) && !self.space_before();
                    e = if t.kind == TokenKind::Const && !paren {
                        Expr::Const(Box::new(ConstRef {
                            scope: Some(e),
                            top_level: false,
                            name,
                        }))
                    } else {
                        self.parse_call_rest(Some(e), name, span)?
                    };
                }
                TokenKind::LBracket => {
                    let t = self.bumped();
                    let span = self.span_of(&t);
                    let (args, _) = self.parse_call_args(TokenKind::RBracket)?;
                    e = Expr::Call(Box::new(CallExpr {
                        recv: Some(e),
                        name: "[]".to_string(),
                        args: args.into_boxed_slice(),
                        block: None,
                        span,
                    }));
                }
                _ => break,
            }
        }
        Some(e)
    }

    /// Arguments and block of a call whose receiver and name are already known.
    pub(crate) fn parse_call_rest(
        &mut self,
        recv: Option<Expr>,
        name: String,
        span: Span,
    ) -> Option<Expr> {
        let (args, mut block) = if self.at(TokenKind::LParen) && !self.space_before() {
            self.bump();
            self.parse_call_args(TokenKind::RParen)?
        } else if self.can_start_command_arg() {
            self.parse_command_args()?
        } else {
            (Vec::new(), None)
        };
        if block.is_none() {
            block = self.parse_block_literal()?;
        }
        Some(Expr::Call(Box::new(CallExpr {
            recv,
            name,
            args: args.into_boxed_slice(),
            block,
            span,
        })))
    }

    /// Whether the current token starts an argument of a parenthesis-less call.
    pub(crate) fn can_start_command_arg(&self) -> bool {
        if !self.space_before() {
            return false;
        }
        match self.peek_kind() {
            TokenKind::Minus | TokenKind::Star | TokenKind::Amp | TokenKind::Colon2 => {
                !self.space_after()
            }
            kind => starts_operand(kind),
        }
    }

    /// Whether a value follows `return`, `break` or `next`.
    pub(crate) fn starts_value(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Minus | TokenKind::Star | TokenKind::Colon2 | TokenKind::KwBegin => true,
            kind => starts_operand(kind),
        }
    }

    /// `(a, *b, k: v, &blk)` after the opening delimiter.
    pub(crate) fn parse_call_args(
        &mut self,
        close: TokenKind,
    ) -> Option<(Vec<Expr>, Option<BlockArg>)> {
        self.with_no_do(false, |p| {
            let mut args = Vec::new();
            let mut pairs = Vec::new();
            let mut block = None;
            loop {
                p.skip_newlines();
                if p.at(close) {
                    break;
                }
                p.parse_arg_into(&mut args, &mut pairs, &mut block)?;
                p.skip_newlines();
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            p.skip_newlines();
            p.expect(close)?;
            if !pairs.is_empty() {
                args.push(Expr::Hash(pairs.into_boxed_slice()));
            }
            Some((args, block))
        })
    }

    /// `foo a, b` arguments; `do` after them belongs to `foo`.
    pub(crate) fn parse_command_args(&mut self) -> Option<(Vec<Expr>, Option<BlockArg>)> {
        self.with_no_do(true, |p| {
            let mut args = Vec::new();
            let mut pairs = Vec::new();
            let mut block = None;
            loop {
                p.parse_arg_into(&mut args, &mut pairs, &mut block)?;
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            if !pairs.is_empty() {
                args.push(Expr::Hash(pairs.into_boxed_slice()));
            }
            Some((args, block))
        })
    }

    fn parse_arg_into(
        &mut self,
        args: &mut Vec<Expr>,
        pairs: &mut Vec<(Expr, Expr)>,
        block: &mut Option<BlockArg>,
    ) -> Option<()> {
        match self.peek_kind() {
            TokenKind::Star => {
                self.bump();
                let e = self.parse_ternary()?;
                args.push(Expr::Splat(Box::new(e)));
            }
            TokenKind::Amp => {
                self.bump();
                let e = self.parse_ternary()?;
                *block = Some(BlockArg::Pass(Box::new(e)));
            }
            TokenKind::Label => {
                let t = self.bumped();
                let key = self.text(&t).trim_end_matches(':').to_string();
                self.skip_newlines();
                let value = self.parse_expr()?;
                pairs.push((Expr::Sym(key), value));
            }
            _ => {
                let e = self.parse_expr()?;
                if self.eat(TokenKind::FatArrow) {
                    self.skip_newlines();
                    let value = self.parse_expr()?;
                    pairs.push((e, value));
                } else {
                    args.push(e);
                }
            }
        }
        Some(())
    }

    /// `{ |x| ... }` or `do |x| ... end`, if one follows.
    pub(crate) fn parse_block_literal(&mut self) -> Option<Option<BlockArg>> {
        let close = match self.peek_kind() {
            TokenKind::LBrace => TokenKind::RBrace,
            TokenKind::KwDo if !self.no_do => TokenKind::KwEnd,
            _ => return Some(None),
        };
        self.bump();
        let def = self.scoped(false, Some(mrb_ir::JumpTarget::Block), |p| {
            p.skip_newlines();
            let params = if p.eat(TokenKind::Pipe) {
                let params = p.parse_params(TokenKind::Pipe)?;
                p.expect(TokenKind::Pipe)?;
                params
            } else {
                p.eat(TokenKind::PipePipe);
                Params::default()
            };
            let body = p.parse_stmts(&[close])?;
            if close == TokenKind::KwEnd {
                p.expect_end("do")?;
            } else {
                p.expect(close)?;
            }
            Some(BlockDef {
                params,
                body,
                lambda: false,
            })
        })?;
        Some(Some(BlockArg::Literal(Rc::new(def))))
    }

    /// Parameter list up to `close` (not consumed). Names are declared in the
    /// current scope.
    pub(crate) fn parse_params(&mut self, close: TokenKind) -> Option<Params> {
        let mut params = Params::default();
        let multiline = close != TokenKind::Newline;
        loop {
            if multiline {
                self.skip_newlines();
            }
            if self.at(close) {
                break;
            }
            match self.peek_kind() {
                TokenKind::Star => {
                    self.bump();
                    let name = if self.at(TokenKind::Ident) {
                        let t = self.bumped();
                        self.text(&t).to_string()
                    } else {
                        "*".to_string()
                    };
                    self.declare(&name);
                    params.rest = Some(name);
                }
                TokenKind::Amp => {
                    self.bump();
                    let t = self.expect(TokenKind::Ident)?;
                    let name = self.text(&t).to_string();
                    self.declare(&name);
                    params.block = Some(name);
                }
                TokenKind::Ident => {
                    let t = self.bumped();
                    let name = self.text(&t).to_string();
                    self.declare(&name);
                    if self.eat(TokenKind::Eq) {
                        // `|a = 1|` must not read the closing pipe as an operator.
                        let default = if close == TokenKind::Pipe {
                            self.parse_binary(12)?
                        } else {
                            self.parse_ternary()?
                        };
                        params.optional.push((name, default));
                    } else if params.rest.is_some() || !params.optional.is_empty() {
                        params.post.push(name);
                    } else {
                        params.required.push(name);
                    }
                }
                _ => return self.unexpected(),
            }
            if multiline {
                self.skip_newlines();
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Some(params)
    }

    pub(crate) fn parse_number(&mut self, negative: bool) -> Option<Expr> {
        let t = self.bumped();
        let span = self.span_of(&t);
        let text: String = self.text(&t).chars().filter(|c| *c != '_').collect();
        let sign = if negative { "-" } else { "" };
        if t.kind == TokenKind::Float {
            return match format!("{sign}{text}").parse::<f64>() {
                Ok(f) => Some(Expr::Float(f)),
                Err(_) => self.error_at(DiagnosticKind::InvalidNumber(text), span),
            };
        }
        let (digits, radix) = if let Some(h) = text.strip_prefix("0x").or(text.strip_prefix("0X")) {
            (h, 16)
        } else if let Some(b) = text.strip_prefix("0b").or(text.strip_prefix("0B")) {
            (b, 2)
        } else {
            (text.as_str(), 10)
        };
        match i64::from_str_radix(&format!("{sign}{digits}"), radix) {
            Ok(n) => Some(Expr::Int(n)),
            Err(_) => self.error_at(DiagnosticKind::InvalidNumber(text.clone()), span),
        }
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        match self.peek_kind() {
            TokenKind::Int | TokenKind::Float => self.parse_number(false),
            TokenKind::Str => {
                let t = self.bumped();
                let raw = self.text(&t);
                let inner = raw.get(1..raw.len().saturating_sub(1)).unwrap_or("");
                Some(Expr::Str(unescape_single(inner).into_boxed_slice()))
            }
            TokenKind::DStr => {
                let t = self.bumped();
                self.parse_dstr(&t, 1)
            }
            TokenKind::Symbol => {
                let t = self.bumped();
                Some(Expr::Sym(self.text(&t)[1..].to_string()))
            }
            TokenKind::DSym => {
                let t = self.bumped();
                self.parse_dsym(&t)
            }
            TokenKind::Words => {
                let t = self.bumped();
                let raw = self.text(&t);
                let inner = raw.get(3..raw.len().saturating_sub(1)).unwrap_or("");
                let words = inner
                    .split_whitespace()
                    .map(|w| Expr::Str(w.as_bytes().into()))
                    .collect();
                Some(Expr::Array(words))
            }
            TokenKind::IVar => {
                let t = self.bumped();
                Some(Expr::IVar(self.text(&t).to_string()))
            }
            TokenKind::GVar => {
                let t = self.bumped();
                Some(Expr::GVar(self.text(&t).to_string()))
            }
            TokenKind::KwNil => {
                self.bump();
                Some(Expr::Nil)
            }
            TokenKind::KwTrue => {
                self.bump();
                Some(Expr::True)
            }
            TokenKind::KwFalse => {
                self.bump();
                Some(Expr::False)
            }
            TokenKind::KwSelf => {
                self.bump();
                Some(Expr::SelfRef)
            }
            TokenKind::KwFile => {
                self.bump();
                Some(Expr::CurrentFile)
            }
            TokenKind::Ident => {
                let t = self.bumped();
                let name = self.text(&t);
                let paren = self.at(TokenKind::LParen) && !self.space_before();
                if self.is_local(name) && !paren {
                    return Some(Expr::LVar(name.to_string()));
                }
                let span = self.span_of(&t);
                self.parse_call_rest(None, name.to_string(), span)
            }
            TokenKind::Const => {
                let t = self.bumped();
                let name = self.text(&t).to_string();
                if self.at(TokenKind::LParen) && !self.space_before() {
                    let span = self.span_of(&t);
                    return self.parse_call_rest(None, name, span);
                }
                Some(Expr::Const(Box::new(ConstRef {
                    scope: None,
                    top_level: false,
                    name,
                })))
            }
            TokenKind::Colon2 => {
                self.bump();
                let t = self.expect(TokenKind::Const)?;
                Some(Expr::Const(Box::new(ConstRef {
                    scope: None,
                    top_level: true,
                    name: self.text(&t).to_string(),
                })))
            }
            TokenKind::LParen => {
                self.bump();
                let body = self.with_no_do(false, |p| {
                    let body = p.parse_stmts(&[TokenKind::RParen])?;
                    p.expect(TokenKind::RParen)?;
                    Some(body)
                })?;
                Some(match body.len() {
                    0 => Expr::Nil,
                    1 => body.into_vec().remove(0),
                    _ => Expr::Seq(body),
                })
            }
            TokenKind::LBracket => {
                self.bump();
                let (items, _) = self.parse_call_args(TokenKind::RBracket)?;
                Some(Expr::Array(items.into_boxed_slice()))
            }
            TokenKind::LBrace => self.parse_hash(),
            TokenKind::Arrow => self.parse_lambda(),
            TokenKind::KwNot => {
                self.bump();
                let e = self.parse_expr()?;
                Some(Expr::Not(Box::new(e)))
            }
            TokenKind::KwDef => self.parse_def(),
            TokenKind::KwClass => self.parse_class(),
            TokenKind::KwModule => self.parse_module(),
            TokenKind::KwIf => self.parse_if(false),
            TokenKind::KwUnless => self.parse_if(true),
            TokenKind::KwWhile => self.parse_while(false),
            TokenKind::KwUntil => self.parse_while(true),
            TokenKind::KwCase => self.parse_case(),
            TokenKind::KwBegin => self.parse_begin(),
            TokenKind::KwReturn => self.parse_return(),
            TokenKind::KwBreak | TokenKind::KwNext => self.parse_jump(),
            TokenKind::KwYield => self.parse_yield(),
            TokenKind::KwSuper => self.parse_super(),
            _ => self.unexpected(),
        }
    }

    fn parse_hash(&mut self) -> Option<Expr> {
        self.bump();
        self.with_no_do(false, |p| {
            let mut pairs = Vec::new();
            loop {
                p.skip_newlines();
                if p.at(TokenKind::RBrace) {
                    break;
                }
                let key = if p.at(TokenKind::Label) {
                    let t = p.bumped();
                    Expr::Sym(p.text(&t).trim_end_matches(':').to_string())
                } else {
                    let key = p.parse_expr()?;
                    p.skip_newlines();
                    p.expect(TokenKind::FatArrow)?;
                    key
                };
                p.skip_newlines();
                let value = p.parse_expr()?;
                pairs.push((key, value));
                p.skip_newlines();
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            p.skip_newlines();
            p.expect(TokenKind::RBrace)?;
            Some(Expr::Hash(pairs.into_boxed_slice()))
        })
    }

    /// `->(x) { ... }` and `-> do ... end`.
    fn parse_lambda(&mut self) -> Option<Expr> {
        self.bump();
        let def = self.scoped(false, Some(mrb_ir::JumpTarget::Block), |p| {
            let params = if p.eat(TokenKind::LParen) {
                let params = p.parse_params(TokenKind::RParen)?;
                p.expect(TokenKind::RParen)?;
                params
            } else if p.at(TokenKind::Ident) {
                p.parse_params(TokenKind::LBrace)?
            } else {
                Params::default()
            };
            let close = if p.eat(TokenKind::LBrace) {
                TokenKind::RBrace
            } else if p.eat(TokenKind::KwDo) {
                TokenKind::KwEnd
            } else {
                return p.unexpected();
            };
            let body = p.parse_stmts(&[close])?;
            p.expect(close)?;
            Some(BlockDef {
                params,
                body,
                lambda: true,
            })
        })?;
        Some(Expr::Lambda(Rc::new(def)))
    }
}
