use std::rc::Rc;

use mrb_ir::{BlockDef, Expr, RangeExpr, StrPart};
use smallvec::SmallVec;

use crate::core::{Frame, ProcBody, RHash, RProc, RRange, Value};
use crate::errors::Unwind;
use crate::state::State;

impl State {
    pub(crate) fn eval_str_parts(&self, parts: &[StrPart], f: &Frame) -> Result<Vec<u8>, Unwind> {
        let mut out = Vec::new();
        for part in parts {
            match part {
                StrPart::Lit(bytes) => out.extend_from_slice(bytes),
                StrPart::Code(body) => {
                    let v = self.eval_body(body, f)?;
                    out.extend_from_slice(&self.to_s_value(&v)?);
                }
            }
        }
        Ok(out)
    }

    /// Evaluates arguments or array items, expanding `*splat`.
    pub(crate) fn eval_list(&self, items: &[Expr], f: &Frame) -> Result<Vec<Value>, Unwind> {
        let mut out: SmallVec<[Value; 4]> = SmallVec::new();
        for item in items {
            match item {
                Expr::Splat(inner) => {
                    let v = self.eval(inner, f)?;
                    out.extend(self.splat_items(v)?);
                }
                other => out.push(self.eval(other, f)?),
            }
        }
        Ok(out.into_vec())
    }

    pub(crate) fn splat_items(&self, v: Value) -> Result<Vec<Value>, Unwind> {
        Ok(match v {
            Value::Nil => Vec::new(),
            Value::Array(a) => a.to_vec(),
            Value::Range(_) | Value::Hash(_) => self.iter_items(&v)?,
            other => vec![other],
        })
    }

    pub(super) fn eval_hash(&self, pairs: &[(Expr, Expr)], f: &Frame) -> Result<Value, Unwind> {
        let h = RHash::default();
        for (k, v) in pairs {
            let k = self.eval(k, f)?;
            let v = self.eval(v, f)?;
            h.insert(k, v);
        }
        Ok(Value::Hash(Rc::new(h)))
    }

    pub(super) fn eval_range(&self, r: &RangeExpr, f: &Frame) -> Result<Value, Unwind> {
        let lo = self.eval(&r.lo, f)?;
        let hi = self.eval(&r.hi, f)?;
        self.range_new(lo, hi, r.exclusive)
    }

    pub(crate) fn range_new(&self, lo: Value, hi: Value, exclusive: bool) -> Result<Value, Unwind> {
        let comparable = matches!(
            (&lo, &hi),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_))
                | (Value::Str(_), Value::Str(_))
                | (Value::Nil, _)
                | (_, Value::Nil)
        );
        if !comparable && self.compare(&lo, &hi).is_err() {
            return Err(self.arg_error("bad value for range"));
        }
        Ok(Value::Range(Rc::new(RRange { lo, hi, exclusive })))
    }

    pub(crate) fn make_block(&self, def: &Rc<BlockDef>, f: &Frame, lambda: bool, break_tag: u64) -> Value {
        Value::Proc(Rc::new(RProc {
            body: ProcBody::Block(def.clone()),
            frame: Some(f.clone()),
            lambda: lambda || def.lambda,
            break_tag,
        }))
    }
}
