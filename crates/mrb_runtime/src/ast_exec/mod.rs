//! Tree-walking evaluation of `mrb_ir` syntax trees.
//!
//! Split by concern: `expr` for literals and operators, `call` for method and
//! block invocation, `stmt` for definitions and control flow, `access` for
//! variables, constants and assignment.

mod access;
mod call;
mod expr;
mod stmt;

use mrb_ir::Expr;

use crate::core::{Frame, Value};
use crate::errors::Unwind;
use crate::state::State;

/// Remaining stack below which evaluation moves to a fresh segment.
pub(crate) const STACK_RED_ZONE: usize = 128 * 1024;
pub(crate) const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

impl State {
    pub(crate) fn eval_body(&self, body: &[Expr], f: &Frame) -> Result<Value, Unwind> {
        let mut last = Value::Nil;
        for e in body {
            last = self.eval(e, f)?;
        }
        Ok(last)
    }

    pub(crate) fn eval(&self, e: &Expr, f: &Frame) -> Result<Value, Unwind> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_expr(e, f))
    }

    fn eval_expr(&self, e: &Expr, f: &Frame) -> Result<Value, Unwind> {
        match e {
            Expr::Nil => Ok(Value::Nil),
            Expr::True => Ok(Value::Bool(true)),
            Expr::False => Ok(Value::Bool(false)),
            Expr::SelfRef => Ok(f.self_val.clone()),
            Expr::CurrentFile => Ok(Value::str(self.current_file())),
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Float(x) => Ok(Value::Float(*x)),
            Expr::Str(bytes) => Ok(Value::str(bytes.to_vec())),
            Expr::DStr(parts) => Ok(Value::str(self.eval_str_parts(parts, f)?)),
            Expr::Sym(name) => Ok(Value::Sym(self.intern(name))),
            Expr::DSym(parts) => {
                let bytes = self.eval_str_parts(parts, f)?;
                Ok(Value::Sym(self.intern(&String::from_utf8_lossy(&bytes))))
            }
            Expr::Array(items) => Ok(Value::array(self.eval_list(items, f)?)),
            Expr::Hash(pairs) => self.eval_hash(pairs, f),
            Expr::Range(r) => self.eval_range(r, f),

            Expr::LVar(name) => Ok(f.env.get(name).unwrap_or(Value::Nil)),
            Expr::IVar(name) => Ok(self.ivar_get(&f.self_val, self.intern(name))),
            Expr::GVar(name) => Ok(self.gvar_get(self.intern(name))),
            Expr::Const(c) => self.eval_const(c, f),

            Expr::Assign(a) => self.eval_assign(a, f),
            Expr::OpAssign(a) => self.eval_op_assign(a, f),
            Expr::MultiAssign(a) => self.eval_multi_assign(a, f),

            Expr::And(l, r) => {
                let lv = self.eval(l, f)?;
                if lv.truthy() { self.eval(r, f) } else { Ok(lv) }
            }
            Expr::Or(l, r) => {
                let lv = self.eval(l, f)?;
                if lv.truthy() { Ok(lv) } else { self.eval(r, f) }
            }
            Expr::Not(inner) => {
                let v = self.eval(inner, f)?;
                self.call_method(&v, self.intern("!"), &[], None)
            }

            Expr::Call(c) => self.eval_call(c, f),
            Expr::Super(s) => self.eval_super(s, f),
            Expr::Yield(args) => {
                let args = self.eval_list(args, f)?;
                self.eval_yield(&args, f)
            }
            Expr::Splat(inner) => {
                let v = self.eval(inner, f)?;
                Ok(Value::array(self.splat_items(v)?))
            }
            Expr::Lambda(def) => Ok(self.make_block(def, f, true, self.fresh_tag())),

            Expr::If(i) => {
                if self.eval(&i.cond, f)?.truthy() {
                    self.eval_body(&i.then_body, f)
                } else {
                    match &i.else_body {
                        Some(b) => self.eval_body(b, f),
                        None => Ok(Value::Nil),
                    }
                }
            }
            Expr::While(w) => self.eval_while(w, f),
            Expr::Case(c) => self.eval_case(c, f),
            Expr::Begin(b) => self.eval_begin(b, f),
            Expr::Seq(body) => self.eval_body(body, f),

            Expr::Def(def) => self.eval_def(def, f),
            Expr::ClassDef(c) => self.eval_class_def(c, f),
            Expr::ModuleDef(m) => self.eval_module_def(m, f),
            Expr::SClass(s) => self.eval_sclass(s, f),

            Expr::Return(v) => {
                let v = self.eval_opt(v.as_deref(), f)?;
                Err(Unwind::Return(v, f.return_tag))
            }
            Expr::Break(v, target) => {
                let v = self.eval_opt(v.as_deref(), f)?;
                Err(match target {
                    mrb_ir::JumpTarget::Loop => Unwind::LoopBreak(v),
                    mrb_ir::JumpTarget::Block => Unwind::Break(v, f.break_tag),
                })
            }
            Expr::Next(v, target) => {
                let v = self.eval_opt(v.as_deref(), f)?;
                Err(match target {
                    mrb_ir::JumpTarget::Loop => Unwind::LoopNext,
                    mrb_ir::JumpTarget::Block => Unwind::Next(v),
                })
            }
        }
    }

    fn eval_opt(&self, e: Option<&Expr>, f: &Frame) -> Result<Value, Unwind> {
        match e {
            Some(e) => self.eval(e, f),
            None => Ok(Value::Nil),
        }
    }
}
