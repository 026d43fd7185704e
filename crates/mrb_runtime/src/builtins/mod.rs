//! Builtin classes and modules.
//!
//! Each submodule installs the methods of one class family. Shared helpers
//! for equality, ordering, rendering and iteration live here.

mod array;
mod enumerable;
mod exception;
mod hash;
mod kernel;
mod module;
mod numeric;
mod object;
mod proc;
mod range;
mod sprintf;
mod string;

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use crate::core::{CallArgs, ProcBody, RProc, RRange, Value};
use crate::errors::{Unwind, messages};
use crate::format;
use crate::state::State;

pub(crate) use sprintf::sprintf;

pub(crate) fn install(state: &State) {
    object::install(state);
    module::install(state);
    kernel::install(state);
    numeric::install(state);
    string::install(state);
    array::install(state);
    hash::install(state);
    range::install(state);
    enumerable::install(state);
    proc::install(state);
    exception::install(state);
}

/// `(start, count)` for `[start, len]` indexing of a sequence of `len` items.
pub(super) fn start_len_span(start: i64, count: i64, len: usize) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { start + len } else { start };
    if start < 0 || start > len || count < 0 {
        return None;
    }
    Some((start as usize, count.min(len - start) as usize))
}

/// `(start, count)` for range indexing; nil bounds are open.
pub(super) fn range_span(
    s: &State,
    r: &RRange,
    len: usize,
) -> Result<Option<(usize, usize)>, Unwind> {
    let n = len as i64;
    let lo = match &r.lo {
        Value::Nil => 0,
        v => s.int_arg(v)?,
    };
    let hi = match &r.hi {
        Value::Nil => n,
        v => {
            let h = s.int_arg(v)?;
            let h = if h < 0 { h + n } else { h };
            if r.exclusive { h } else { h + 1 }
        }
    };
    let lo = if lo < 0 { lo + n } else { lo };
    if lo < 0 || lo > n {
        return Ok(None);
    }
    Ok(Some((lo as usize, (hi.min(n) - lo).max(0) as usize)))
}

impl CallArgs<'_> {
    pub fn arg(&self, i: usize) -> Value {
        self.args.get(i).cloned().unwrap_or(Value::Nil)
    }

    /// The same call with a different argument list.
    pub(crate) fn with_args<'b>(&'b self, args: &'b [Value]) -> CallArgs<'b> {
        CallArgs {
            recv: self.recv.clone(),
            args,
            block: self.block,
            mid: self.mid,
        }
    }
}

impl State {
    pub(crate) fn check_args(&self, a: &CallArgs<'_>, min: usize, max: usize) -> Result<(), Unwind> {
        let n = a.args.len();
        if n >= min && n <= max {
            return Ok(());
        }
        let expected = if min == max {
            min.to_string()
        } else if max == usize::MAX {
            format!("{min}+")
        } else {
            format!("{min}..{max}")
        };
        Err(self.arg_error(crate::core::class::arity_message(n, &expected)))
    }

    pub(crate) fn need_block<'a>(&self, a: &'a CallArgs<'_>) -> Result<&'a Value, Unwind> {
        a.block
            .ok_or_else(|| self.error(self.core().local_jump_error, messages::NO_BLOCK_GIVEN))
    }

    pub(crate) fn implicit_conversion(&self, v: &Value, into: &str) -> Unwind {
        let from = match v {
            Value::Nil => "nil".to_string(),
            Value::Bool(b) => b.to_string(),
            other => self.obj_classname(other),
        };
        self.type_error(format!("no implicit conversion of {from} into {into}"))
    }

    pub(crate) fn int_arg(&self, v: &Value) -> Result<i64, Unwind> {
        match v {
            Value::Int(i) => Ok(*i),
            Value::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
            other => Err(self.implicit_conversion(other, "Integer")),
        }
    }

    pub(crate) fn float_arg(&self, v: &Value) -> Result<f64, Unwind> {
        v.as_f64().ok_or_else(|| self.implicit_conversion(v, "Float"))
    }

    pub(crate) fn str_arg(&self, v: &Value) -> Result<Vec<u8>, Unwind> {
        v.as_bytes().ok_or_else(|| self.implicit_conversion(v, "String"))
    }

    /// Name argument given as a symbol or string.
    pub(crate) fn name_arg(&self, v: &Value) -> Result<String, Unwind> {
        match v {
            Value::Sym(s) => Ok(self.sym_name(*s)),
            Value::Str(s) => Ok(s.to_string_lossy()),
            other => Err(self.type_error(format!(
                "{} is not a symbol nor a string",
                self.inspect(other)
            ))),
        }
    }

    /// `to_s` through method dispatch; non-string results fall back to `#<Class>`.
    pub(crate) fn to_s_value(&self, v: &Value) -> Result<Vec<u8>, Unwind> {
        match v {
            Value::Str(s) => Ok(s.to_vec()),
            Value::Nil => Ok(Vec::new()),
            Value::Int(i) => Ok(format::int_to_s(*i).into_bytes()),
            Value::Sym(s) => Ok(self.sym_name(*s).into_bytes()),
            _ => match self.call_method(v, self.intern("to_s"), &[], None)? {
                Value::Str(s) => Ok(s.to_vec()),
                _ => Ok(self.default_to_s(v).into_bytes()),
            },
        }
    }

    pub(crate) fn default_to_s(&self, v: &Value) -> String {
        format!("#<{}>", self.obj_classname(v))
    }

    /// `inspect` through method dispatch.
    pub(crate) fn inspect_value(&self, v: &Value) -> Result<String, Unwind> {
        match v {
            Value::Nil => Ok("nil".to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Int(i) => Ok(format::int_to_s(*i)),
            Value::Float(x) => Ok(format::float_to_s(*x)),
            Value::Str(s) => Ok(s.with(format::inspect_bytes)),
            Value::Sym(s) => Ok(format::inspect_symbol(&self.sym_name(*s))),
            _ => match self.call_method(v, self.intern("inspect"), &[], None)? {
                Value::Str(s) => Ok(s.to_string_lossy()),
                other => Ok(String::from_utf8_lossy(&self.to_s_value(&other)?).into_owned()),
            },
        }
    }

    /// `==` with fast paths for builtin values.
    pub(crate) fn values_eq(&self, a: &Value, b: &Value) -> Result<bool, Unwind> {
        Ok(match (a, b) {
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                a.as_f64() == b.as_f64()
            }
            (Value::Str(x), Value::Str(y)) => x.with(|xb| y.with(|yb| xb == yb)),
            (Value::Sym(x), Value::Sym(y)) => x == y,
            (Value::Nil, _) | (Value::Bool(_), _) | (Value::Sym(_), _) => a.identical(b),
            _ if a.identical(b) => true,
            _ => self
                .call_method(a, self.intern("=="), std::slice::from_ref(b), None)?
                .truthy(),
        })
    }

    /// `<=>` ordering; incomparable values raise `ArgumentError`.
    pub(crate) fn compare(&self, a: &Value, b: &Value) -> Result<Ordering, Unwind> {
        let fast = match (a, b) {
            (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                a.as_f64().zip(b.as_f64()).and_then(|(x, y)| x.partial_cmp(&y))
            }
            (Value::Str(x), Value::Str(y)) => Some(x.with(|xb| y.with(|yb| xb.cmp(yb)))),
            _ => None,
        };
        if let Some(o) = fast {
            return Ok(o);
        }
        match self.call_method(a, self.intern("<=>"), std::slice::from_ref(b), None)? {
            Value::Int(n) => Ok(n.cmp(&0)),
            _ => Err(self.arg_error(format!(
                "comparison of {} with {} failed",
                self.obj_classname(a),
                self.inspect(b)
            ))),
        }
    }

    /// The values an Enumerable method walks: array items, hash pairs,
    /// range members, or whatever `each` yields.
    pub(crate) fn iter_items(&self, v: &Value) -> Result<Vec<Value>, Unwind> {
        match v {
            Value::Array(a) => Ok(a.to_vec()),
            Value::Hash(h) => Ok(h
                .entries()
                .into_iter()
                .map(|(k, v)| Value::array(vec![k, v]))
                .collect()),
            Value::Range(r) => self.range_items(r),
            other => {
                let buf = Rc::new(RefCell::new(Vec::new()));
                let collector = Value::Proc(Rc::new(RProc::internal(ProcBody::Collect(buf.clone()))));
                self.call_method(other, self.intern("each"), &[], Some(&collector))?;
                Ok(buf.take())
            }
        }
    }

    /// Ordering from a `<=>`-style block, or from `compare` without one.
    pub(crate) fn order(&self, block: Option<&Value>, x: &Value, y: &Value) -> Result<Ordering, Unwind> {
        let Some(b) = block else {
            return self.compare(x, y);
        };
        match self.yield_block(b, &[x.clone(), y.clone()])? {
            Value::Int(n) => Ok(n.cmp(&0)),
            Value::Float(f) => Ok(f.partial_cmp(&0.0).unwrap_or(Ordering::Equal)),
            _ => Err(self.arg_error(format!(
                "comparison of {} with {} failed",
                self.obj_classname(x),
                self.inspect(y)
            ))),
        }
    }

    /// Stable merge sort; the comparison may call back into Ruby and fail.
    pub(crate) fn sort_values(
        &self,
        items: Vec<Value>,
        cmp: &mut dyn FnMut(&Value, &Value) -> Result<Ordering, Unwind>,
    ) -> Result<Vec<Value>, Unwind> {
        if items.len() <= 1 {
            return Ok(items);
        }
        let mut left = items;
        let right = left.split_off(left.len() / 2);
        let left = self.sort_values(left, cmp)?;
        let right = self.sort_values(right, cmp)?;
        let mut out = Vec::with_capacity(left.len() + right.len());
        let mut l = left.into_iter().peekable();
        let mut r = right.into_iter().peekable();
        while let (Some(x), Some(y)) = (l.peek(), r.peek()) {
            let next = if cmp(y, x)? == Ordering::Less { r.next() } else { l.next() };
            out.extend(next);
        }
        out.extend(l);
        out.extend(r);
        Ok(out)
    }

    /// Sorts by the key the block maps each item to.
    pub(crate) fn sort_by_block(&self, items: Vec<Value>, block: &Value) -> Result<Vec<Value>, Unwind> {
        let mut keyed = Vec::with_capacity(items.len());
        for v in items {
            let k = self.yield_block(block, std::slice::from_ref(&v))?;
            keyed.push(Value::array(vec![k, v]));
        }
        let sorted = self.sort_values(keyed, &mut |x, y| {
            self.compare(&pair_part(x, 0), &pair_part(y, 0))
        })?;
        Ok(sorted.iter().map(|p| pair_part(p, 1)).collect())
    }

    /// `Object#hash`.
    pub(crate) fn hash_of(&self, v: &Value) -> i64 {
        let key = crate::core::HashKey::of(v);
        crate::core::fast_hasher().hash_one(&key) as i64
    }
}

fn pair_part(v: &Value, i: usize) -> Value {
    match v {
        Value::Array(a) => a.get(i).unwrap_or(Value::Nil),
        _ => Value::Nil,
    }
}
