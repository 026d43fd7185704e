//! Array.

use std::rc::Rc;

use crate::core::{BuiltinFn, CallArgs, FastHashMap, HashKey, RArray, Value, fast_map_new};
use crate::errors::{Unwind, messages};
use crate::state::State;

use super::{range_span, start_len_span};

type R = Result<Value, Unwind>;

pub(super) fn install(s: &State) {
    let array = s.core().array;
    s.define_class_builtin(array, "new", ary_new);
    s.define_class_builtin(array, "[]", ary_s_create);
    for (name, f) in [
        ("[]", ary_aref as BuiltinFn),
        ("slice", ary_aref),
        ("[]=", ary_aset),
        ("at", ary_at),
        ("fetch", ary_fetch),
        ("dig", ary_dig),
        ("values_at", ary_values_at),
        ("first", ary_first),
        ("last", ary_last),
        ("push", ary_push),
        ("append", ary_push),
        ("<<", ary_push_one),
        ("pop", ary_pop),
        ("shift", ary_shift),
        ("unshift", ary_unshift),
        ("prepend", ary_unshift),
        ("insert", ary_insert),
        ("concat", ary_concat),
        ("length", ary_length),
        ("size", ary_length),
        ("empty?", ary_empty),
        ("==", ary_eq),
        ("eql?", ary_eql),
        ("<=>", ary_cmp),
        ("+", ary_plus),
        ("-", ary_minus),
        ("difference", ary_minus),
        ("*", ary_times),
        ("&", ary_and),
        ("intersection", ary_and),
        ("|", ary_or),
        ("union", ary_or),
        ("to_s", ary_inspect),
        ("inspect", ary_inspect),
        ("to_a", ary_to_a),
        ("to_ary", ary_to_a),
        ("entries", ary_to_a),
        ("join", ary_join),
        ("reverse", ary_reverse),
        ("reverse!", ary_reverse_bang),
        ("rotate", ary_rotate),
        ("sort", ary_sort),
        ("sort!", ary_sort_bang),
        ("sort_by!", ary_sort_by_bang),
        ("uniq", ary_uniq),
        ("uniq!", ary_uniq_bang),
        ("flatten", ary_flatten),
        ("flatten!", ary_flatten_bang),
        ("compact", ary_compact),
        ("compact!", ary_compact_bang),
        ("delete", ary_delete),
        ("delete_at", ary_delete_at),
        ("delete_if", ary_delete_if),
        ("reject!", ary_reject_bang),
        ("select!", ary_select_bang),
        ("filter!", ary_select_bang),
        ("keep_if", ary_keep_if),
        ("map!", ary_map_bang),
        ("collect!", ary_map_bang),
        ("clear", ary_clear),
        ("replace", ary_replace),
        ("fill", ary_fill),
        ("each", ary_each),
        ("each_index", ary_each_index),
        ("reverse_each", ary_reverse_each),
        ("with_index", ary_with_index),
        ("each_with_index", ary_each_with_index),
        ("index", ary_index),
        ("find_index", ary_index),
        ("rindex", ary_rindex),
        ("include?", ary_include),
        ("assoc", ary_assoc),
        ("product", ary_product),
        ("transpose", ary_transpose),
        ("combination", ary_combination),
    ] {
        s.define_builtin(array, name, f);
    }
}

fn recv_ary(a: &CallArgs<'_>) -> Rc<RArray> {
    match &a.recv {
        Value::Array(r) => r.clone(),
        _ => Rc::new(RArray::default()),
    }
}

fn items(a: &CallArgs<'_>) -> Vec<Value> {
    recv_ary(a).to_vec()
}

fn set_items(a: &CallArgs<'_>, v: Vec<Value>) {
    *recv_ary(a).items.borrow_mut() = v;
}

fn ary_arg(s: &State, v: &Value) -> Result<Vec<Value>, Unwind> {
    match v {
        Value::Array(x) => Ok(x.to_vec()),
        other => Err(s.implicit_conversion(other, "Array")),
    }
}

// -------------------------------------------------------------------------
// Construction and element access
// -------------------------------------------------------------------------

fn ary_new(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 2)?;
    match a.args.first() {
        None => Ok(Value::array(Vec::new())),
        Some(Value::Array(src)) if a.args.len() == 1 => Ok(Value::array(src.to_vec())),
        Some(n) => {
            let n = s.int_arg(n)?;
            if n < 0 {
                return Err(s.arg_error(messages::NEGATIVE_ARRAY_SIZE));
            }
            let mut out = Vec::with_capacity(n as usize);
            for i in 0..n {
                out.push(match a.block {
                    Some(blk) => s.yield_block(blk, &[Value::Int(i)])?,
                    None => a.arg(1),
                });
            }
            Ok(Value::array(out))
        }
    }
}

fn ary_s_create(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::array(a.args.to_vec()))
}

fn ary_aref(s: &State, a: &CallArgs<'_>) -> R {
    let ary = recv_ary(a);
    let len = ary.len();
    let span = match a.args {
        [Value::Range(r)] => range_span(s, r, len)?,
        [i] => {
            let i = s.int_arg(i)?;
            let i = if i < 0 { i + len as i64 } else { i };
            return Ok(if i < 0 { Value::Nil } else { ary.get(i as usize).unwrap_or(Value::Nil) });
        }
        [start, count] => start_len_span(s.int_arg(start)?, s.int_arg(count)?, len),
        _ => {
            return Err(s.arg_error(crate::core::class::arity_message(a.args.len(), "1..2")));
        }
    };
    Ok(match span {
        Some((start, count)) => Value::array(ary.items.borrow()[start..start + count].to_vec()),
        None => Value::Nil,
    })
}

fn ary_at(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    ary_aref(s, a)
}

fn ary_aset(s: &State, a: &CallArgs<'_>) -> R {
    let ary = recv_ary(a);
    let len = ary.len();
    let (span, value) = match a.args {
        [Value::Range(r), v] => match range_span(s, r, len)? {
            Some(span) => (span, v),
            None => {
                return Err(s.error(s.core().range_error, format!("{} out of range", s.inspect(&a.args[0]))));
            }
        },
        [i, v] => {
            let i = s.int_arg(i)?;
            let at = if i < 0 { i + len as i64 } else { i };
            if at < 0 {
                return Err(s.error(
                    s.core().index_error,
                    format!("index {i} too small for array; minimum: -{len}"),
                ));
            }
            let at = at as usize;
            let mut items = ary.items.borrow_mut();
            if at >= items.len() {
                items.resize(at + 1, Value::Nil);
            }
            items[at] = v.clone();
            return Ok(v.clone());
        }
        [start, count, v] => {
            let (start, count) = (s.int_arg(start)?, s.int_arg(count)?);
            if count < 0 {
                return Err(s.error(s.core().index_error, format!("negative length ({count})")));
            }
            let at = if start < 0 { start + len as i64 } else { start };
            if at < 0 {
                return Err(s.error(
                    s.core().index_error,
                    format!("index {start} too small for array; minimum: -{len}"),
                ));
            }
            let at = at as usize;
            ((at, (count as usize).min(len.saturating_sub(at))), v)
        }
        _ => return Err(s.arg_error(crate::core::class::arity_message(a.args.len(), "2..3"))),
    };
    let (start, count) = span;
    let replacement = match value {
        Value::Array(x) => x.to_vec(),
        other => vec![other.clone()],
    };
    let mut items = ary.items.borrow_mut();
    if start > items.len() {
        items.resize(start, Value::Nil);
    }
    let end = (start + count).min(items.len());
    items.splice(start..end, replacement);
    Ok(value.clone())
}

fn ary_fetch(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 2)?;
    let ary = recv_ary(a);
    let i = s.int_arg(&a.args[0])?;
    let at = if i < 0 { i + ary.len() as i64 } else { i };
    if let Some(v) = usize::try_from(at).ok().and_then(|at| ary.get(at)) {
        return Ok(v);
    }
    match (a.block, a.args.get(1)) {
        (Some(blk), _) => s.yield_block(blk, &[a.args[0].clone()]),
        (None, Some(default)) => Ok(default.clone()),
        (None, None) => Err(s.error(
            s.core().index_error,
            format!("index {i} outside of array bounds: {}...{}", -(ary.len() as i64), ary.len()),
        )),
    }
}

fn ary_dig(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, usize::MAX)?;
    let mut cur = ary_aref(s, &a.with_args(&a.args[..1]))?;
    for key in &a.args[1..] {
        if cur.is_nil() {
            return Ok(Value::Nil);
        }
        cur = s.call_method(&cur, s.intern("dig"), std::slice::from_ref(key), None)?;
    }
    Ok(cur)
}

fn ary_values_at(s: &State, a: &CallArgs<'_>) -> R {
    let mut out = Vec::with_capacity(a.args.len());
    for idx in a.args {
        out.push(ary_aref(s, &a.with_args(std::slice::from_ref(idx)))?);
    }
    Ok(Value::array(out))
}

fn ary_first(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 1)?;
    let items = items(a);
    match a.args.first() {
        None => Ok(items.first().cloned().unwrap_or(Value::Nil)),
        Some(n) => {
            let n = s.int_arg(n)?;
            if n < 0 {
                return Err(s.arg_error("negative array size"));
            }
            Ok(Value::array(items.into_iter().take(n as usize).collect()))
        }
    }
}

fn ary_last(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 1)?;
    let items = items(a);
    match a.args.first() {
        None => Ok(items.last().cloned().unwrap_or(Value::Nil)),
        Some(n) => {
            let n = s.int_arg(n)?;
            if n < 0 {
                return Err(s.arg_error("negative array size"));
            }
            let skip = items.len().saturating_sub(n as usize);
            Ok(Value::array(items[skip..].to_vec()))
        }
    }
}

// -------------------------------------------------------------------------
// Mutation
// -------------------------------------------------------------------------

fn ary_push(_s: &State, a: &CallArgs<'_>) -> R {
    let ary = recv_ary(a);
    ary.items.borrow_mut().extend_from_slice(a.args);
    Ok(a.recv.clone())
}

fn ary_push_one(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    ary_push(s, a)
}

fn take_end(s: &State, a: &CallArgs<'_>, front: bool) -> R {
    s.check_args(a, 0, 1)?;
    let ary = recv_ary(a);
    let mut items = ary.items.borrow_mut();
    match a.args.first() {
        None => Ok(if front {
            if items.is_empty() { Value::Nil } else { items.remove(0) }
        } else {
            items.pop().unwrap_or(Value::Nil)
        }),
        Some(n) => {
            let n = s.int_arg(n)?;
            if n < 0 {
                return Err(s.arg_error("negative array size"));
            }
            let n = (n as usize).min(items.len());
            let taken: Vec<Value> = if front {
                items.drain(..n).collect()
            } else {
                let at = items.len() - n;
                items.drain(at..).collect()
            };
            Ok(Value::array(taken))
        }
    }
}

fn ary_pop(s: &State, a: &CallArgs<'_>) -> R {
    take_end(s, a, false)
}

fn ary_shift(s: &State, a: &CallArgs<'_>) -> R {
    take_end(s, a, true)
}

fn ary_unshift(_s: &State, a: &CallArgs<'_>) -> R {
    let ary = recv_ary(a);
    ary.items.borrow_mut().splice(0..0, a.args.iter().cloned());
    Ok(a.recv.clone())
}

fn ary_insert(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, usize::MAX)?;
    let ary = recv_ary(a);
    let len = ary.len() as i64;
    let i = s.int_arg(&a.args[0])?;
    let at = if i < 0 { i + len + 1 } else { i };
    if at < 0 {
        return Err(s.error(
            s.core().index_error,
            format!("index {i} too small for array; minimum: -{}", len + 1),
        ));
    }
    let at = at as usize;
    let mut items = ary.items.borrow_mut();
    if at > items.len() {
        items.resize(at, Value::Nil);
    }
    items.splice(at..at, a.args[1..].iter().cloned());
    Ok(a.recv.clone())
}

fn ary_concat(s: &State, a: &CallArgs<'_>) -> R {
    let mut extra = Vec::new();
    for v in a.args {
        extra.extend(ary_arg(s, v)?);
    }
    recv_ary(a).items.borrow_mut().extend(extra);
    Ok(a.recv.clone())
}

fn ary_delete(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let target = &a.args[0];
    let mut kept = Vec::new();
    let mut found = None;
    for v in items(a) {
        if s.values_eq(&v, target)? {
            found = Some(v);
        } else {
            kept.push(v);
        }
    }
    set_items(a, kept);
    match (found, a.block) {
        (Some(v), _) => Ok(v),
        (None, Some(blk)) => s.yield_block(blk, &[target.clone()]),
        (None, None) => Ok(Value::Nil),
    }
}

fn ary_delete_at(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let ary = recv_ary(a);
    let len = ary.len() as i64;
    let i = s.int_arg(&a.args[0])?;
    let at = if i < 0 { i + len } else { i };
    if at < 0 || at >= len {
        return Ok(Value::Nil);
    }
    Ok(ary.items.borrow_mut().remove(at as usize))
}

/// Keeps items for which the block's truthiness equals `keep`.
fn filter_in_place(s: &State, a: &CallArgs<'_>, keep: bool) -> Result<bool, Unwind> {
    let blk = s.need_block(a)?;
    let before = items(a);
    let mut kept = Vec::with_capacity(before.len());
    for v in &before {
        if s.yield_block(blk, std::slice::from_ref(v))?.truthy() == keep {
            kept.push(v.clone());
        }
    }
    let changed = kept.len() != before.len();
    set_items(a, kept);
    Ok(changed)
}

fn ary_delete_if(s: &State, a: &CallArgs<'_>) -> R {
    filter_in_place(s, a, false)?;
    Ok(a.recv.clone())
}

fn ary_reject_bang(s: &State, a: &CallArgs<'_>) -> R {
    Ok(if filter_in_place(s, a, false)? { a.recv.clone() } else { Value::Nil })
}

fn ary_select_bang(s: &State, a: &CallArgs<'_>) -> R {
    Ok(if filter_in_place(s, a, true)? { a.recv.clone() } else { Value::Nil })
}

fn ary_keep_if(s: &State, a: &CallArgs<'_>) -> R {
    filter_in_place(s, a, true)?;
    Ok(a.recv.clone())
}

fn ary_map_bang(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    let mut out = Vec::new();
    for v in items(a) {
        out.push(s.yield_block(blk, &[v])?);
    }
    set_items(a, out);
    Ok(a.recv.clone())
}

fn ary_clear(_s: &State, a: &CallArgs<'_>) -> R {
    set_items(a, Vec::new());
    Ok(a.recv.clone())
}

fn ary_replace(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let new = ary_arg(s, &a.args[0])?;
    set_items(a, new);
    Ok(a.recv.clone())
}

fn ary_fill(s: &State, a: &CallArgs<'_>) -> R {
    let len = recv_ary(a).len();
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        out.push(match a.block {
            Some(blk) => s.yield_block(blk, &[Value::Int(i as i64)])?,
            None => {
                s.check_args(a, 1, 1)?;
                a.args[0].clone()
            }
        });
    }
    set_items(a, out);
    Ok(a.recv.clone())
}

// -------------------------------------------------------------------------
// Comparison and set operations
// -------------------------------------------------------------------------

fn ary_length(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Int(recv_ary(a).len() as i64))
}

fn ary_empty(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(recv_ary(a).is_empty()))
}

fn ary_eq(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let Value::Array(other) = &a.args[0] else {
        return Ok(Value::Bool(false));
    };
    if a.recv.identical(&a.args[0]) {
        return Ok(Value::Bool(true));
    }
    let (x, y) = (items(a), other.to_vec());
    if x.len() != y.len() {
        return Ok(Value::Bool(false));
    }
    for (p, q) in x.iter().zip(&y) {
        if !s.values_eq(p, q)? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn ary_eql(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    Ok(Value::Bool(
        matches!(a.args[0], Value::Array(_)) && HashKey::of(&a.recv) == HashKey::of(&a.args[0]),
    ))
}

fn ary_cmp(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let Value::Array(other) = &a.args[0] else {
        return Ok(Value::Nil);
    };
    let (x, y) = (items(a), other.to_vec());
    for (p, q) in x.iter().zip(&y) {
        let o = s.compare(p, q)?;
        if o.is_ne() {
            return Ok(Value::Int(o as i64));
        }
    }
    Ok(Value::Int(x.len().cmp(&y.len()) as i64))
}

fn ary_plus(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let mut out = items(a);
    out.extend(ary_arg(s, &a.args[0])?);
    Ok(Value::array(out))
}

fn key_set(items: &[Value]) -> FastHashMap<HashKey, ()> {
    let mut set = fast_map_new();
    for v in items {
        set.insert(HashKey::of(v), ());
    }
    set
}

fn dedup(items: Vec<Value>) -> Vec<Value> {
    let mut seen: FastHashMap<HashKey, ()> = fast_map_new();
    items
        .into_iter()
        .filter(|v| seen.insert(HashKey::of(v), ()).is_none())
        .collect()
}

fn ary_minus(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let other = key_set(&ary_arg(s, &a.args[0])?);
    Ok(Value::array(
        items(a).into_iter().filter(|v| !other.contains_key(&HashKey::of(v))).collect(),
    ))
}

fn ary_and(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let other = key_set(&ary_arg(s, &a.args[0])?);
    Ok(Value::array(dedup(
        items(a).into_iter().filter(|v| other.contains_key(&HashKey::of(v))).collect(),
    )))
}

fn ary_or(s: &State, a: &CallArgs<'_>) -> R {
    let mut all = items(a);
    for v in a.args {
        all.extend(ary_arg(s, v)?);
    }
    Ok(Value::array(dedup(all)))
}

fn ary_times(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    match &a.args[0] {
        Value::Str(sep) => Ok(Value::str(join(s, &items(a), &sep.to_vec(), 0)?)),
        n => {
            let n = s.int_arg(n)?;
            if n < 0 {
                return Err(s.arg_error("negative argument"));
            }
            let items = items(a);
            let mut out = Vec::with_capacity(items.len() * n as usize);
            for _ in 0..n {
                out.extend(items.iter().cloned());
            }
            Ok(Value::array(out))
        }
    }
}

fn ary_include(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    for v in items(a) {
        if s.values_eq(&v, &a.args[0])? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn ary_index(s: &State, a: &CallArgs<'_>) -> R {
    for (i, v) in items(a).into_iter().enumerate() {
        let hit = match (a.args.first(), a.block) {
            (Some(target), _) => s.values_eq(&v, target)?,
            (None, Some(blk)) => s.yield_block(blk, &[v])?.truthy(),
            (None, None) => return Ok(Value::Nil),
        };
        if hit {
            return Ok(Value::Int(i as i64));
        }
    }
    Ok(Value::Nil)
}

fn ary_rindex(s: &State, a: &CallArgs<'_>) -> R {
    for (i, v) in items(a).into_iter().enumerate().rev() {
        let hit = match (a.args.first(), a.block) {
            (Some(target), _) => s.values_eq(&v, target)?,
            (None, Some(blk)) => s.yield_block(blk, &[v])?.truthy(),
            (None, None) => return Ok(Value::Nil),
        };
        if hit {
            return Ok(Value::Int(i as i64));
        }
    }
    Ok(Value::Nil)
}

fn ary_assoc(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    for v in items(a) {
        if let Value::Array(pair) = &v {
            if let Some(k) = pair.get(0) {
                if s.values_eq(&k, &a.args[0])? {
                    return Ok(v);
                }
            }
        }
    }
    Ok(Value::Nil)
}

// -------------------------------------------------------------------------
// Rendering and reshaping
// -------------------------------------------------------------------------

fn ary_inspect(s: &State, a: &CallArgs<'_>) -> R {
    let mut out = String::from("[");
    for (i, v) in items(a).iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        if v.identical(&a.recv) {
            out.push_str("[...]");
        } else {
            out.push_str(&s.inspect_value(v)?);
        }
    }
    out.push(']');
    Ok(Value::str(out))
}

fn ary_to_a(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(a.recv.clone())
}

fn join(s: &State, items: &[Value], sep: &[u8], depth: usize) -> Result<Vec<u8>, Unwind> {
    if depth > 64 {
        return Err(s.arg_error("recursive array join"));
    }
    let mut out = Vec::new();
    for (i, v) in items.iter().enumerate() {
        if i > 0 {
            out.extend_from_slice(sep);
        }
        match v {
            Value::Array(inner) => out.extend(join(s, &inner.to_vec(), sep, depth + 1)?),
            other => out.extend(s.to_s_value(other)?),
        }
    }
    Ok(out)
}

fn ary_join(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 1)?;
    let sep = match a.args.first() {
        None | Some(Value::Nil) => Vec::new(),
        Some(v) => s.str_arg(v)?,
    };
    Ok(Value::str(join(s, &items(a), &sep, 0)?))
}

fn ary_reverse(_s: &State, a: &CallArgs<'_>) -> R {
    let mut v = items(a);
    v.reverse();
    Ok(Value::array(v))
}

fn ary_reverse_bang(_s: &State, a: &CallArgs<'_>) -> R {
    recv_ary(a).items.borrow_mut().reverse();
    Ok(a.recv.clone())
}

fn ary_rotate(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 1)?;
    let mut v = items(a);
    if v.is_empty() {
        return Ok(Value::array(v));
    }
    let n = match a.args.first() {
        Some(n) => s.int_arg(n)?,
        None => 1,
    };
    let k = n.rem_euclid(v.len() as i64) as usize;
    v.rotate_left(k);
    Ok(Value::array(v))
}

fn sorted(s: &State, a: &CallArgs<'_>) -> Result<Vec<Value>, Unwind> {
    s.sort_values(items(a), &mut |x, y| s.order(a.block, x, y))
}

fn ary_sort(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::array(sorted(s, a)?))
}

fn ary_sort_bang(s: &State, a: &CallArgs<'_>) -> R {
    let v = sorted(s, a)?;
    set_items(a, v);
    Ok(a.recv.clone())
}

fn ary_sort_by_bang(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    let v = s.sort_by_block(items(a), blk)?;
    set_items(a, v);
    Ok(a.recv.clone())
}

fn uniq_items(s: &State, a: &CallArgs<'_>) -> Result<Vec<Value>, Unwind> {
    let Some(blk) = a.block else {
        return Ok(dedup(items(a)));
    };
    let mut seen: FastHashMap<HashKey, ()> = fast_map_new();
    let mut out = Vec::new();
    for v in items(a) {
        let k = s.yield_block(blk, std::slice::from_ref(&v))?;
        if seen.insert(HashKey::of(&k), ()).is_none() {
            out.push(v);
        }
    }
    Ok(out)
}

fn ary_uniq(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::array(uniq_items(s, a)?))
}

fn ary_uniq_bang(s: &State, a: &CallArgs<'_>) -> R {
    let before = recv_ary(a).len();
    let v = uniq_items(s, a)?;
    let changed = v.len() != before;
    set_items(a, v);
    Ok(if changed { a.recv.clone() } else { Value::Nil })
}

fn flatten_into(
    s: &State,
    items: &[Value],
    depth: Option<i64>,
    stack: &mut Vec<usize>,
    out: &mut Vec<Value>,
) -> Result<bool, Unwind> {
    let mut changed = false;
    for v in items {
        match v {
            Value::Array(inner) if depth.is_none_or(|d| d > 0) => {
                let id = v.ptr().unwrap_or(0);
                if stack.contains(&id) {
                    return Err(s.arg_error("tried to flatten recursive array"));
                }
                stack.push(id);
                flatten_into(s, &inner.to_vec(), depth.map(|d| d - 1), stack, out)?;
                stack.pop();
                changed = true;
            }
            other => out.push(other.clone()),
        }
    }
    Ok(changed)
}

fn flattened(s: &State, a: &CallArgs<'_>) -> Result<(Vec<Value>, bool), Unwind> {
    s.check_args(a, 0, 1)?;
    let depth = match a.args.first() {
        None | Some(Value::Nil) => None,
        Some(v) => Some(s.int_arg(v)?).filter(|d| *d >= 0),
    };
    let mut out = Vec::new();
    let mut stack = vec![a.recv.ptr().unwrap_or(0)];
    let changed = flatten_into(s, &items(a), depth, &mut stack, &mut out)?;
    Ok((out, changed))
}

fn ary_flatten(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::array(flattened(s, a)?.0))
}

fn ary_flatten_bang(s: &State, a: &CallArgs<'_>) -> R {
    let (v, changed) = flattened(s, a)?;
    set_items(a, v);
    Ok(if changed { a.recv.clone() } else { Value::Nil })
}

fn ary_compact(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::array(items(a).into_iter().filter(|v| !v.is_nil()).collect()))
}

fn ary_compact_bang(_s: &State, a: &CallArgs<'_>) -> R {
    let before = recv_ary(a).len();
    let v: Vec<Value> = items(a).into_iter().filter(|v| !v.is_nil()).collect();
    let changed = v.len() != before;
    set_items(a, v);
    Ok(if changed { a.recv.clone() } else { Value::Nil })
}

fn ary_product(s: &State, a: &CallArgs<'_>) -> R {
    let mut acc: Vec<Vec<Value>> = items(a).into_iter().map(|v| vec![v]).collect();
    for other in a.args {
        let other = ary_arg(s, other)?;
        let mut next = Vec::with_capacity(acc.len() * other.len());
        for prefix in &acc {
            for v in &other {
                let mut row = prefix.clone();
                row.push(v.clone());
                next.push(row);
            }
        }
        acc = next;
    }
    Ok(Value::array(acc.into_iter().map(Value::array).collect()))
}

fn ary_transpose(s: &State, a: &CallArgs<'_>) -> R {
    let rows = items(a)
        .iter()
        .map(|r| ary_arg(s, r))
        .collect::<Result<Vec<_>, _>>()?;
    let Some(width) = rows.first().map(Vec::len) else {
        return Ok(Value::array(Vec::new()));
    };
    if let Some(bad) = rows.iter().find(|r| r.len() != width) {
        return Err(s.error(
            s.core().index_error,
            format!("element size differs ({} should be {width})", bad.len()),
        ));
    }
    Ok(Value::array(
        (0..width)
            .map(|c| Value::array(rows.iter().map(|r| r[c].clone()).collect()))
            .collect(),
    ))
}

fn combinations(items: &[Value], k: usize) -> Vec<Vec<Value>> {
    if k == 0 {
        return vec![Vec::new()];
    }
    let mut out = Vec::new();
    for (i, v) in items.iter().enumerate() {
        for mut rest in combinations(&items[i + 1..], k - 1) {
            rest.insert(0, v.clone());
            out.push(rest);
        }
    }
    out
}

fn ary_combination(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let k = s.int_arg(&a.args[0])?;
    let combos = if k < 0 { Vec::new() } else { combinations(&items(a), k as usize) };
    let values: Vec<Value> = combos.into_iter().map(Value::array).collect();
    match a.block {
        Some(blk) => {
            for v in values {
                s.yield_block(blk, &[v])?;
            }
            Ok(a.recv.clone())
        }
        None => Ok(Value::array(values)),
    }
}

// -------------------------------------------------------------------------
// Iteration
// -------------------------------------------------------------------------

/// Walks by index so the block may grow or shrink the array.
fn ary_each(s: &State, a: &CallArgs<'_>) -> R {
    let Some(blk) = a.block else {
        return Ok(a.recv.clone());
    };
    let ary = recv_ary(a);
    let mut i = 0;
    while let Some(v) = ary.get(i) {
        s.yield_block(blk, &[v])?;
        i += 1;
    }
    Ok(a.recv.clone())
}

fn ary_each_index(s: &State, a: &CallArgs<'_>) -> R {
    let Some(blk) = a.block else {
        return Ok(Value::array((0..recv_ary(a).len() as i64).map(Value::Int).collect()));
    };
    let ary = recv_ary(a);
    let mut i = 0;
    while i < ary.len() {
        s.yield_block(blk, &[Value::Int(i as i64)])?;
        i += 1;
    }
    Ok(a.recv.clone())
}

fn ary_reverse_each(s: &State, a: &CallArgs<'_>) -> R {
    let mut v = items(a);
    v.reverse();
    let Some(blk) = a.block else {
        return Ok(Value::array(v));
    };
    for x in v {
        s.yield_block(blk, &[x])?;
    }
    Ok(a.recv.clone())
}

fn ary_each_with_index(s: &State, a: &CallArgs<'_>) -> R {
    let Some(blk) = a.block else {
        return Ok(Value::array(
            items(a)
                .into_iter()
                .enumerate()
                .map(|(i, v)| Value::array(vec![v, Value::Int(i as i64)]))
                .collect(),
        ));
    };
    let ary = recv_ary(a);
    let mut i = 0;
    while let Some(v) = ary.get(i) {
        s.yield_block(blk, &[v, Value::Int(i as i64)])?;
        i += 1;
    }
    Ok(a.recv.clone())
}

/// `each.with_index` / `map.with_index`: yields item and index, collecting
/// the block's results.
fn ary_with_index(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 1)?;
    let offset = match a.args.first() {
        Some(v) => s.int_arg(v)?,
        None => 0,
    };
    let pairs = items(a)
        .into_iter()
        .enumerate()
        .map(|(i, v)| (v, Value::Int(i as i64 + offset)));
    let Some(blk) = a.block else {
        return Ok(Value::array(pairs.map(|(v, i)| Value::array(vec![v, i])).collect()));
    };
    let mut out = Vec::new();
    for (v, i) in pairs {
        out.push(s.yield_block(blk, &[v, i])?);
    }
    Ok(Value::array(out))
}
