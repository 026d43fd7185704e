//! Range.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::core::{BuiltinFn, CallArgs, RRange, Value};
use crate::errors::{Unwind, messages};
use crate::state::State;

use super::enumerable;
use super::string::succ_bytes;

type R = Result<Value, Unwind>;

pub(super) fn install(s: &State) {
    let range = s.core().range;
    s.define_class_builtin(range, "new", range_s_new);
    for (name, f) in [
        ("each", range_each as BuiltinFn),
        ("reverse_each", range_reverse_each),
        ("to_a", range_to_a),
        ("to_ary", range_to_a),
        ("entries", range_to_a),
        ("begin", range_begin),
        ("end", range_end),
        ("first", range_first),
        ("last", range_last),
        ("min", range_min),
        ("max", range_max),
        ("sum", range_sum),
        ("size", range_size),
        ("count", range_count),
        ("include?", range_include),
        ("member?", range_include),
        ("===", range_include),
        ("cover?", range_include),
        ("exclude_end?", range_exclude_end),
        ("step", range_step),
        ("%", range_step),
        ("to_s", range_to_s),
        ("inspect", range_inspect),
        ("==", range_eq),
        ("eql?", range_eq),
    ] {
        s.define_builtin(range, name, f);
    }
}

fn recv_range(a: &CallArgs<'_>) -> Rc<RRange> {
    match &a.recv {
        Value::Range(r) => r.clone(),
        _ => Rc::new(RRange {
            lo: Value::Nil,
            hi: Value::Nil,
            exclusive: false,
        }),
    }
}

/// Last integer member of a range with an integer start, or `None` when
/// the range is endless.
fn int_end(s: &State, r: &RRange) -> Result<Option<i64>, Unwind> {
    let last = match &r.hi {
        Value::Nil => return Ok(None),
        Value::Int(h) => *h,
        Value::Float(f) if f.is_infinite() && *f > 0.0 => return Ok(None),
        Value::Float(f) => {
            let fl = f.floor();
            if r.exclusive && fl == *f {
                return Ok(Some(fl as i64 - 1));
            }
            return Ok(Some(fl as i64));
        }
        other => return Err(s.implicit_conversion(other, "Integer")),
    };
    Ok(Some(if r.exclusive { last - 1 } else { last }))
}

impl State {
    /// Members of a range, materialized.
    pub(crate) fn range_items(&self, r: &RRange) -> Result<Vec<Value>, Unwind> {
        match &r.lo {
            Value::Int(lo) => match int_end(self, r)? {
                Some(hi) => Ok((*lo..=hi).map(Value::Int).collect()),
                None => Err(self.error(
                    self.core().range_error,
                    "cannot convert endless range to an array",
                )),
            },
            Value::Str(lo) => {
                let Value::Str(hi) = &r.hi else {
                    return Err(self.type_error(format!("can't iterate from {}", self.obj_classname(&r.lo))));
                };
                let (lo, hi) = (lo.to_vec(), hi.to_vec());
                let mut out = Vec::new();
                if lo > hi && lo.len() >= hi.len() {
                    return Ok(out);
                }
                let mut cur = lo;
                while cur.len() <= hi.len() {
                    if cur == hi {
                        if !r.exclusive {
                            out.push(Value::str(cur));
                        }
                        break;
                    }
                    out.push(Value::str(cur.clone()));
                    cur = succ_bytes(&cur);
                }
                Ok(out)
            }
            Value::Float(_) => Err(self.type_error(messages::CANT_ITERATE_FLOAT)),
            other => Err(self.type_error(format!("can't iterate from {}", self.obj_classname(other)))),
        }
    }
}

fn range_s_new(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 2, 3)?;
    s.range_new(a.args[0].clone(), a.args[1].clone(), a.arg(2).truthy())
}

/// Integer ranges are walked lazily so endless ranges can be broken out of.
fn range_each(s: &State, a: &CallArgs<'_>) -> R {
    let r = recv_range(a);
    let Some(blk) = a.block else {
        return Ok(Value::array(s.range_items(&r)?));
    };
    if let Value::Int(lo) = r.lo {
        let hi = int_end(s, &r)?;
        let mut i = lo;
        while hi.is_none_or(|h| i <= h) {
            s.yield_block(blk, &[Value::Int(i)])?;
            match i.checked_add(1) {
                Some(n) => i = n,
                None => break,
            }
        }
        return Ok(a.recv.clone());
    }
    for v in s.range_items(&r)? {
        s.yield_block(blk, &[v])?;
    }
    Ok(a.recv.clone())
}

fn range_reverse_each(s: &State, a: &CallArgs<'_>) -> R {
    let mut items = s.range_items(&recv_range(a))?;
    items.reverse();
    let Some(blk) = a.block else {
        return Ok(Value::array(items));
    };
    for v in items {
        s.yield_block(blk, &[v])?;
    }
    Ok(a.recv.clone())
}

fn range_to_a(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::array(s.range_items(&recv_range(a))?))
}

fn range_begin(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(recv_range(a).lo.clone())
}

fn range_end(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(recv_range(a).hi.clone())
}

fn range_first(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 1)?;
    let r = recv_range(a);
    let Some(n) = a.args.first() else {
        return Ok(r.lo.clone());
    };
    let n = s.int_arg(n)?;
    if n < 0 {
        return Err(s.arg_error("negative array size (or size too big)"));
    }
    if let Value::Int(lo) = r.lo {
        let hi = int_end(s, &r)?;
        let end = lo.saturating_add(n - 1);
        let end = hi.map_or(end, |h| end.min(h));
        return Ok(Value::array((lo..=end).map(Value::Int).collect()));
    }
    Ok(Value::array(s.range_items(&r)?.into_iter().take(n as usize).collect()))
}

fn range_last(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 1)?;
    let r = recv_range(a);
    let Some(n) = a.args.first() else {
        return Ok(r.hi.clone());
    };
    let n = s.int_arg(n)?;
    if n < 0 {
        return Err(s.arg_error("negative array size"));
    }
    let items = s.range_items(&r)?;
    let skip = items.len().saturating_sub(n as usize);
    Ok(Value::array(items[skip..].to_vec()))
}

fn is_empty_range(s: &State, r: &RRange) -> Result<bool, Unwind> {
    if r.hi.is_nil() || r.lo.is_nil() {
        return Ok(false);
    }
    let o = s.compare(&r.lo, &r.hi)?;
    Ok(o == Ordering::Greater || (o == Ordering::Equal && r.exclusive))
}

fn range_min(s: &State, a: &CallArgs<'_>) -> R {
    let r = recv_range(a);
    if a.block.is_some() || !a.args.is_empty() {
        return enumerable::enum_min(s, a);
    }
    if is_empty_range(s, &r)? {
        return Ok(Value::Nil);
    }
    Ok(r.lo.clone())
}

fn range_max(s: &State, a: &CallArgs<'_>) -> R {
    let r = recv_range(a);
    if a.block.is_some() || !a.args.is_empty() {
        return enumerable::enum_max(s, a);
    }
    if is_empty_range(s, &r)? {
        return Ok(Value::Nil);
    }
    match (&r.lo, &r.hi, r.exclusive) {
        (_, Value::Nil, _) => Err(s.error(s.core().range_error, "cannot get the maximum of endless range")),
        (Value::Int(_), Value::Int(h), true) => Ok(Value::Int(h - 1)),
        (_, Value::Float(_), true) => Err(s.type_error("cannot exclude non Integer end value")),
        (_, hi, _) => Ok(hi.clone()),
    }
}

fn range_sum(s: &State, a: &CallArgs<'_>) -> R {
    let r = recv_range(a);
    if let (None, Value::Int(lo), Value::Int(_)) = (a.block, &r.lo, &r.hi) {
        let init = a.args.first().cloned().unwrap_or(Value::Int(0));
        if let (Value::Int(init), Some(hi)) = (&init, int_end(s, &r)?) {
            if hi < *lo {
                return Ok(Value::Int(*init));
            }
            let n = (hi as i128) - (*lo as i128) + 1;
            let total = n * (*lo as i128 + hi as i128) / 2 + *init as i128;
            if let Ok(v) = i64::try_from(total) {
                return Ok(Value::Int(v));
            }
            return Ok(Value::Float(total as f64));
        }
    }
    enumerable::enum_sum(s, a)
}

fn range_size(s: &State, a: &CallArgs<'_>) -> R {
    let r = recv_range(a);
    match (&r.lo, &r.hi) {
        (Value::Int(lo), Value::Int(_) | Value::Float(_)) => Ok(match int_end(s, &r)? {
            Some(hi) => Value::Int((hi - lo + 1).max(0)),
            None => Value::Float(f64::INFINITY),
        }),
        (Value::Int(_), Value::Nil) => Ok(Value::Float(f64::INFINITY)),
        (Value::Float(_), _) => Err(s.type_error(messages::CANT_ITERATE_FLOAT)),
        _ => Ok(Value::Nil),
    }
}

fn range_count(s: &State, a: &CallArgs<'_>) -> R {
    if a.block.is_none() && a.args.is_empty() {
        if let Value::Int(_) = recv_range(a).lo {
            return range_size(s, a);
        }
    }
    enumerable::enum_count(s, a)
}

/// Bound check with `<=>`; incomparable values are simply not covered.
pub(crate) fn covers(s: &State, r: &RRange, v: &Value) -> bool {
    let above_lo = r.lo.is_nil() || matches!(s.compare(&r.lo, v), Ok(Ordering::Less | Ordering::Equal));
    let below_hi = r.hi.is_nil()
        || match s.compare(v, &r.hi) {
            Ok(Ordering::Less) => true,
            Ok(Ordering::Equal) => !r.exclusive,
            _ => false,
        };
    above_lo && below_hi
}

fn range_include(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let v = &a.args[0];
    let r = recv_range(a);
    if matches!((&r.lo, v), (Value::Int(_) | Value::Float(_) | Value::Nil, Value::Str(_)))
        || matches!((&r.lo, v), (Value::Str(_), Value::Int(_) | Value::Float(_)))
    {
        return Ok(Value::Bool(false));
    }
    Ok(Value::Bool(covers(s, &r, v)))
}

fn range_exclude_end(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(recv_range(a).exclusive))
}

fn range_step(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let r = recv_range(a);
    let step = &a.args[0];
    let mut out = Vec::new();
    let mut emit = |v: Value| -> Result<(), Unwind> {
        match a.block {
            Some(blk) => s.yield_block(blk, &[v]).map(|_| ()),
            None => {
                out.push(v);
                Ok(())
            }
        }
    };
    match (&r.lo, step) {
        (Value::Int(lo), Value::Int(by)) => {
            if *by <= 0 {
                return Err(s.arg_error(if *by == 0 { "step can't be 0" } else { "step can't be negative" }));
            }
            let hi = int_end(s, &r)?;
            let mut i = *lo;
            while hi.is_none_or(|h| i <= h) {
                emit(Value::Int(i))?;
                match i.checked_add(*by) {
                    Some(n) => i = n,
                    None => break,
                }
            }
        }
        _ => {
            let lo = s.float_arg(&r.lo)?;
            let hi = s.float_arg(&r.hi)?;
            let by = s.float_arg(step)?;
            if by <= 0.0 {
                return Err(s.arg_error(if by == 0.0 { "step can't be 0" } else { "step can't be negative" }));
            }
            let n = ((hi - lo) / by + f64::EPSILON * 4.0).floor();
            if n >= 0.0 && n.is_finite() {
                for i in 0..=(n as i64) {
                    let v = lo + i as f64 * by;
                    if r.exclusive && v >= hi {
                        break;
                    }
                    emit(Value::Float(v))?;
                }
            }
        }
    }
    Ok(match a.block {
        Some(_) => a.recv.clone(),
        None => Value::array(out),
    })
}

fn render(s: &State, a: &CallArgs<'_>, part: fn(&State, &Value) -> Result<String, Unwind>) -> R {
    let r = recv_range(a);
    let lo = if r.lo.is_nil() { String::new() } else { part(s, &r.lo)? };
    let hi = if r.hi.is_nil() { String::new() } else { part(s, &r.hi)? };
    let dots = if r.exclusive { "..." } else { ".." };
    Ok(Value::str(format!("{lo}{dots}{hi}")))
}

fn range_to_s(s: &State, a: &CallArgs<'_>) -> R {
    render(s, a, |s, v| Ok(String::from_utf8_lossy(&s.to_s_value(v)?).into_owned()))
}

fn range_inspect(s: &State, a: &CallArgs<'_>) -> R {
    render(s, a, |s, v| s.inspect_value(v))
}

fn range_eq(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let Value::Range(other) = &a.args[0] else {
        return Ok(Value::Bool(false));
    };
    let r = recv_range(a);
    Ok(Value::Bool(
        r.exclusive == other.exclusive
            && s.values_eq(&r.lo, &other.lo)?
            && s.values_eq(&r.hi, &other.hi)?,
    ))
}
