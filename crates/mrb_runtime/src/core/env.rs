//! Local variable environments and evaluation frames.

use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use mrb_ir::MethodDef;

use super::value::{ClassId, Sym, Value};

/// Locals of one method, class body or block.
///
/// Block environments chain to the environment they were created in, so a
/// block reads and writes the locals of its defining scope.
#[derive(Debug, Default)]
pub struct Env {
    vars: RefCell<SmallVec<[(String, Value); 8]>>,
    parent: Option<Rc<Env>>,
}

impl Env {
    pub fn new(parent: Option<Rc<Env>>) -> Rc<Env> {
        Rc::new(Env {
            vars: RefCell::new(SmallVec::new()),
            parent,
        })
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let mut env = Some(self);
        while let Some(e) = env {
            if let Some((_, v)) = e.vars.borrow().iter().find(|(n, _)| n == name) {
                return Some(v.clone());
            }
            env = e.parent.as_deref();
        }
        None
    }

    /// Updates the nearest binding of `name`, or defines it here.
    pub fn set(&self, name: &str, value: Value) {
        let mut env = Some(self);
        while let Some(e) = env {
            let mut vars = e.vars.borrow_mut();
            if let Some(slot) = vars.iter_mut().find(|(n, _)| n == name) {
                slot.1 = value;
                return;
            }
            drop(vars);
            env = e.parent.as_deref();
        }
        self.vars.borrow_mut().push((name.to_string(), value));
    }

    /// Binds `name` in this environment, shadowing outer bindings.
    pub fn define(&self, name: &str, value: Value) {
        let mut vars = self.vars.borrow_mut();
        match vars.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => vars.push((name.to_string(), value)),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.vars.borrow().iter().map(|(n, _)| n.clone()).collect()
    }
}

/// Lexical class nesting, for constant lookup.
#[derive(Debug)]
pub struct Cref {
    pub class: ClassId,
    pub parent: Option<Rc<Cref>>,
}

/// The method activation a frame belongs to; used by `super` and `__method__`.
#[derive(Debug)]
pub struct MethodCtx {
    pub owner: ClassId,
    pub name: Sym,
    /// Parameters re-read by a bare `super`.
    pub def: Rc<MethodDef>,
}

/// Evaluation context shared by a method body and the blocks created in it.
#[derive(Clone, Debug)]
pub struct Frame {
    pub self_val: Value,
    pub env: Rc<Env>,
    /// Where `def` puts methods.
    pub def_target: ClassId,
    pub cref: Rc<Cref>,
    pub method: Option<Rc<MethodCtx>>,
    /// Block passed to the current method, for `yield` and `block_given?`.
    pub block: Option<Value>,
    /// `return` unwinds to the activation carrying this tag.
    pub return_tag: u64,
    /// `break` inside a block unwinds to the call site carrying this tag.
    pub break_tag: u64,
}
