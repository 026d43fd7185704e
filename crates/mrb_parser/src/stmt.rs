use std::rc::Rc;

use mrb_ir::{
    BeginExpr, CaseExpr, ClassDef, ConstRef, Expr, IfExpr, JumpTarget, MethodDef, ModuleDef,
    Params, RescueClause, SClassDef, SuperExpr, WhenClause, WhileExpr,
};
use mrb_syntax::{DiagnosticKind, TokenKind};

use crate::parser::Parser;

const BODY_END: [TokenKind; 4] = [
    TokenKind::KwRescue,
    TokenKind::KwElse,
    TokenKind::KwEnsure,
    TokenKind::KwEnd,
];

impl<'a> Parser<'a> {
    pub(crate) fn parse_def(&mut self) -> Option<Expr> {
        self.bump();
        let singleton =
            self.at(TokenKind::KwSelf) && self.peek_kind_n(1) == Some(TokenKind::Dot);
        if singleton {
            self.bump();
            self.bump();
        }
        let name = self.parse_method_name()?;
        let saved_in_def = std::mem::replace(&mut self.in_def, true);
        let def = self.scoped(true, None, |p| {
            let params = if p.eat(TokenKind::LParen) {
                let params = p.parse_params(TokenKind::RParen)?;
                p.expect(TokenKind::RParen)?;
                params
            } else if matches!(
                p.peek_kind(),
                TokenKind::Ident | TokenKind::Star | TokenKind::Amp
            ) {
                p.parse_params(TokenKind::Newline)?
            } else {
                Params::default()
            };
            let body = p.parse_begin_body()?;
            p.expect_end("def")?;
            Some(MethodDef {
                name,
                singleton,
                params,
                body,
            })
        });
        self.in_def = saved_in_def;
        Some(Expr::Def(Rc::new(def?)))
    }

    fn parse_method_name(&mut self) -> Option<String> {
        let kind = self.peek_kind();
        let operator = matches!(
            kind,
            TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Pow
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::EqEq
                | TokenKind::EqEqEq
                | TokenKind::Ne
                | TokenKind::Lt
                | TokenKind::Gt
                | TokenKind::Le
                | TokenKind::Ge
                | TokenKind::Cmp
                | TokenKind::Shl
                | TokenKind::Shr
                | TokenKind::Amp
                | TokenKind::Pipe
                | TokenKind::Caret
                | TokenKind::Tilde
                | TokenKind::Bang
        );
        if !operator && !matches!(kind, TokenKind::Ident | TokenKind::Const | TokenKind::LBracket) {
            return self.unexpected();
        }
        let t = self.bumped();
        let mut name = self.text(&t).to_string();
        if kind == TokenKind::LBracket {
            self.expect(TokenKind::RBracket)?;
            name = "[]".to_string();
        }
        // `def name=(v)` and `def []=(k, v)`
        let setter = !operator
            && self.at(TokenKind::Eq)
            && !self.space_before()
            && (kind == TokenKind::LBracket || self.peek_kind_n(1) == Some(TokenKind::LParen));
        if setter {
            self.bump();
            name.push('=');
        }
        Some(name)
    }

    /// Statements plus optional `rescue`/`else`/`ensure` clauses, up to `end`.
    pub(crate) fn parse_begin_body(&mut self) -> Option<BeginExpr> {
        let body = self.parse_stmts(&BODY_END)?;
        let mut rescues = Vec::new();
        while self.eat(TokenKind::KwRescue) {
            let mut classes = Vec::new();
            if !matches!(
                self.peek_kind(),
                TokenKind::Newline | TokenKind::Semi | TokenKind::KwThen | TokenKind::FatArrow
            ) {
                loop {
                    classes.push(self.parse_binary(0)?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                    self.skip_newlines();
                }
            }
            let var = if self.eat(TokenKind::FatArrow) {
                let t = self.expect(TokenKind::Ident)?;
                let name = self.text(&t).to_string();
                self.declare(&name);
                Some(name)
            } else {
                None
            };
            self.skip_then();
            let body = self.parse_stmts(&BODY_END)?;
            rescues.push(RescueClause {
                classes: classes.into_boxed_slice(),
                var,
                body,
            });
        }
        let else_body = if self.eat(TokenKind::KwElse) {
            Some(self.parse_stmts(&[TokenKind::KwEnsure, TokenKind::KwEnd])?)
        } else {
            None
        };
        let ensure = if self.eat(TokenKind::KwEnsure) {
            Some(self.parse_stmts(&[TokenKind::KwEnd])?)
        } else {
            None
        };
        Some(BeginExpr {
            body,
            rescues: rescues.into_boxed_slice(),
            else_body,
            ensure,
        })
    }

    pub(crate) fn parse_begin(&mut self) -> Option<Expr> {
        self.bump();
        let begin = self.with_no_do(false, |p| p.parse_begin_body())?;
        self.expect_end("begin")?;
        Some(Expr::Begin(Box::new(begin)))
    }

    /// `Name`, `Outer::Name` or `::Name` after `class`/`module`.
    fn parse_cpath(&mut self) -> Option<ConstRef> {
        let top_level = self.eat(TokenKind::Colon2);
        let t = match self.peek_kind() {
            TokenKind::Const => self.bumped(),
            TokenKind::Ident => {
                let span = self.cur_span();
                return self.error_at(
                    DiagnosticKind::Raw("class/module name must be CONSTANT".to_string()),
                    span,
                );
            }
            _ => return self.unexpected(),
        };
        let mut path = ConstRef {
            scope: None,
            top_level,
            name: self.text(&t).to_string(),
        };
        while self.eat(TokenKind::Colon2) {
            let t = self.expect(TokenKind::Const)?;
            path = ConstRef {
                scope: Some(Expr::Const(Box::new(path))),
                top_level: false,
                name: self.text(&t).to_string(),
            };
        }
        Some(path)
    }

    pub(crate) fn parse_class(&mut self) -> Option<Expr> {
        self.bump();
        if self.eat(TokenKind::Shl) {
            let target = self.parse_expr()?;
            let body = self.scoped(true, None, |p| {
                let body = p.parse_stmts(&[TokenKind::KwEnd])?;
                p.expect_end("class")?;
                Some(body)
            })?;
            return Some(Expr::SClass(Box::new(SClassDef { target, body })));
        }
        let path = self.parse_cpath()?;
        let superclass = if self.eat(TokenKind::Lt) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let body = self.scoped(true, None, |p| {
            let body = p.parse_stmts(&[TokenKind::KwEnd])?;
            p.expect_end("class")?;
            Some(body)
        })?;
        Some(Expr::ClassDef(Box::new(ClassDef {
            path,
            superclass,
            body,
        })))
    }

    pub(crate) fn parse_module(&mut self) -> Option<Expr> {
        self.bump();
        let path = self.parse_cpath()?;
        let body = self.scoped(true, None, |p| {
            let body = p.parse_stmts(&[TokenKind::KwEnd])?;
            p.expect_end("module")?;
            Some(body)
        })?;
        Some(Expr::ModuleDef(Box::new(ModuleDef { path, body })))
    }

    pub(crate) fn parse_if(&mut self, negate: bool) -> Option<Expr> {
        self.bump();
        let e = self.with_no_do(false, |p| p.parse_if_clause(negate))?;
        self.expect_end(if negate { "unless" } else { "if" })?;
        Some(e)
    }

    /// Condition and branches after `if`/`elsif`; the shared `end` is left to the caller.
    fn parse_if_clause(&mut self, negate: bool) -> Option<Expr> {
        let cond = self.parse_expr_stmt()?;
        self.skip_then();
        let then_body = self.parse_stmts(&[TokenKind::KwElsif, TokenKind::KwElse, TokenKind::KwEnd])?;
        let else_body = if !negate && self.eat(TokenKind::KwElsif) {
            Some(vec![self.parse_if_clause(false)?].into_boxed_slice())
        } else if self.eat(TokenKind::KwElse) {
            Some(self.parse_stmts(&[TokenKind::KwEnd])?)
        } else {
            None
        };
        Some(Expr::If(Box::new(IfExpr {
            cond: if negate { Expr::Not(Box::new(cond)) } else { cond },
            then_body,
            else_body,
        })))
    }

    pub(crate) fn parse_while(&mut self, until: bool) -> Option<Expr> {
        self.bump();
        let cond = self.with_no_do(true, |p| p.parse_expr_stmt())?;
        self.eat(TokenKind::KwDo);
        self.skip_terms();
        self.jumps.push(JumpTarget::Loop);
        let body = self.with_no_do(false, |p| p.parse_stmts(&[TokenKind::KwEnd]));
        self.jumps.pop();
        let body = body?;
        self.expect_end(if until { "until" } else { "while" })?;
        Some(Expr::While(Box::new(WhileExpr { cond, body, until })))
    }

    pub(crate) fn parse_case(&mut self) -> Option<Expr> {
        self.bump();
        self.with_no_do(false, |p| {
            let subject = if matches!(p.peek_kind(), TokenKind::Newline | TokenKind::Semi) {
                None
            } else {
                Some(p.parse_expr_stmt()?)
            };
            p.skip_terms();
            let mut whens = Vec::new();
            while p.eat(TokenKind::KwWhen) {
                let mut patterns = Vec::new();
                loop {
                    p.skip_newlines();
                    let pattern = if p.eat(TokenKind::Star) {
                        Expr::Splat(Box::new(p.parse_binary(0)?))
                    } else {
                        p.parse_expr()?
                    };
                    patterns.push(pattern);
                    if !p.eat(TokenKind::Comma) {
                        break;
                    }
                }
                p.skip_then();
                let body =
                    p.parse_stmts(&[TokenKind::KwWhen, TokenKind::KwElse, TokenKind::KwEnd])?;
                whens.push(WhenClause {
                    patterns: patterns.into_boxed_slice(),
                    body,
                });
            }
            if whens.is_empty() {
                return p.unexpected();
            }
            let else_body = if p.eat(TokenKind::KwElse) {
                Some(p.parse_stmts(&[TokenKind::KwEnd])?)
            } else {
                None
            };
            p.expect_end("case")?;
            Some(Expr::Case(Box::new(CaseExpr {
                subject,
                whens: whens.into_boxed_slice(),
                else_body,
            })))
        })
    }

    /// Optional value after `return`/`break`/`next`; `return a, b` returns an array.
    fn parse_jump_value(&mut self) -> Option<Option<Box<Expr>>> {
        if !self.starts_value() {
            return Some(None);
        }
        let first = self.parse_expr()?;
        if !self.at(TokenKind::Comma) {
            return Some(Some(Box::new(first)));
        }
        let mut items = vec![first];
        while self.eat(TokenKind::Comma) {
            self.skip_newlines();
            items.push(self.parse_expr()?);
        }
        Some(Some(Box::new(Expr::Array(items.into_boxed_slice()))))
    }

    pub(crate) fn parse_return(&mut self) -> Option<Expr> {
        self.bump();
        let value = self.parse_jump_value()?;
        Some(Expr::Return(value))
    }

    pub(crate) fn parse_jump(&mut self) -> Option<Expr> {
        let is_break = self.at(TokenKind::KwBreak);
        self.bump();
        let value = self.parse_jump_value()?;
        let target = self.jump_target();
        Some(if is_break {
            Expr::Break(value, target)
        } else {
            Expr::Next(value, target)
        })
    }

    pub(crate) fn parse_yield(&mut self) -> Option<Expr> {
        self.bump();
        let (args, _) = if self.at(TokenKind::LParen) && !self.space_before() {
            self.bump();
            self.parse_call_args(TokenKind::RParen)?
        } else if self.can_start_command_arg() {
            self.parse_command_args()?
        } else {
            (Vec::new(), None)
        };
        Some(Expr::Yield(args.into_boxed_slice()))
    }

    pub(crate) fn parse_super(&mut self) -> Option<Expr> {
        self.bump();
        let (args, mut block) = if self.at(TokenKind::LParen) && !self.space_before() {
            self.bump();
            let (args, block) = self.parse_call_args(TokenKind::RParen)?;
            (Some(args.into_boxed_slice()), block)
        } else if self.can_start_command_arg() {
            let (args, block) = self.parse_command_args()?;
            (Some(args.into_boxed_slice()), block)
        } else {
            (None, None)
        };
        if block.is_none() {
            block = self.parse_block_literal()?;
        }
        Some(Expr::Super(Box::new(SuperExpr { args, block })))
    }
}
