//! Enumerable and Comparable.
//!
//! Enumerable methods materialize the receiver's items first (see
//! `State::iter_items`), so `each` runs to completion before any block.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::core::{BuiltinFn, CallArgs, FastHashMap, HashKey, RHash, Value, fast_map_new};
use crate::errors::Unwind;
use crate::state::State;

type R = Result<Value, Unwind>;

pub(super) fn install(s: &State) {
    let core = s.core().clone();
    for (name, f) in [
        ("map", enum_map as BuiltinFn),
        ("collect", enum_map),
        ("flat_map", enum_flat_map),
        ("collect_concat", enum_flat_map),
        ("select", enum_select),
        ("filter", enum_select),
        ("reject", enum_reject),
        ("filter_map", enum_filter_map),
        ("find", enum_find),
        ("detect", enum_find),
        ("find_index", enum_find_index),
        ("each_with_index", enum_each_with_index),
        ("each_with_object", enum_each_with_object),
        ("reduce", enum_reduce),
        ("inject", enum_reduce),
        ("sum", enum_sum),
        ("count", enum_count),
        ("min", enum_min),
        ("max", enum_max),
        ("min_by", enum_min_by),
        ("max_by", enum_max_by),
        ("minmax", enum_minmax),
        ("sort", enum_sort),
        ("sort_by", enum_sort_by),
        ("include?", enum_include),
        ("member?", enum_include),
        ("to_a", enum_to_a),
        ("entries", enum_to_a),
        ("first", enum_first),
        ("take", enum_take),
        ("drop", enum_drop),
        ("take_while", enum_take_while),
        ("drop_while", enum_drop_while),
        ("any?", enum_any),
        ("all?", enum_all),
        ("none?", enum_none),
        ("one?", enum_one),
        ("group_by", enum_group_by),
        ("partition", enum_partition),
        ("chunk_while", enum_chunk_while),
        ("each_slice", enum_each_slice),
        ("each_cons", enum_each_cons),
        ("zip", enum_zip),
        ("tally", enum_tally),
        ("uniq", enum_uniq),
        ("to_h", enum_to_h),
        ("each_entry", enum_each_entry),
    ] {
        s.define_builtin(core.enumerable, name, f);
    }

    for (name, f) in [
        ("<", cmp_lt as BuiltinFn),
        ("<=", cmp_le),
        (">", cmp_gt),
        (">=", cmp_ge),
        ("==", cmp_eq),
        ("between?", cmp_between),
        ("clamp", cmp_clamp),
    ] {
        s.define_builtin(core.comparable, name, f);
    }
}

fn items(s: &State, a: &CallArgs<'_>) -> Result<Vec<Value>, Unwind> {
    s.iter_items(&a.recv)
}

fn call1(s: &State, blk: &Value, v: &Value) -> R {
    s.yield_block(blk, std::slice::from_ref(v))
}

/// Pattern argument matched with `===`, or the block, or plain truthiness.
fn test(s: &State, a: &CallArgs<'_>, v: &Value) -> Result<bool, Unwind> {
    if let Some(pattern) = a.args.first() {
        return Ok(s
            .call_method(pattern, s.intern("==="), std::slice::from_ref(v), None)?
            .truthy());
    }
    match a.block {
        Some(blk) => Ok(call1(s, blk, v)?.truthy()),
        None => Ok(v.truthy()),
    }
}

// -------------------------------------------------------------------------
// Mapping and filtering
// -------------------------------------------------------------------------

pub(super) fn enum_map(s: &State, a: &CallArgs<'_>) -> R {
    let items = items(s, a)?;
    let Some(blk) = a.block else {
        return Ok(Value::array(items));
    };
    let mut out = Vec::with_capacity(items.len());
    for v in &items {
        out.push(call1(s, blk, v)?);
    }
    Ok(Value::array(out))
}

fn enum_flat_map(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    let mut out = Vec::new();
    for v in items(s, a)? {
        match call1(s, blk, &v)? {
            Value::Array(inner) => out.extend(inner.to_vec()),
            other => out.push(other),
        }
    }
    Ok(Value::array(out))
}

fn select_where(s: &State, a: &CallArgs<'_>, keep: bool) -> R {
    let items = items(s, a)?;
    let Some(blk) = a.block else {
        return Ok(Value::array(items));
    };
    let mut out = Vec::new();
    for v in items {
        if call1(s, blk, &v)?.truthy() == keep {
            out.push(v);
        }
    }
    Ok(Value::array(out))
}

fn enum_select(s: &State, a: &CallArgs<'_>) -> R {
    select_where(s, a, true)
}

fn enum_reject(s: &State, a: &CallArgs<'_>) -> R {
    select_where(s, a, false)
}

fn enum_filter_map(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    let mut out = Vec::new();
    for v in items(s, a)? {
        let r = call1(s, blk, &v)?;
        if r.truthy() {
            out.push(r);
        }
    }
    Ok(Value::array(out))
}

fn enum_find(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    for v in items(s, a)? {
        if call1(s, blk, &v)?.truthy() {
            return Ok(v);
        }
    }
    Ok(Value::Nil)
}

fn enum_find_index(s: &State, a: &CallArgs<'_>) -> R {
    for (i, v) in items(s, a)?.iter().enumerate() {
        let hit = match (a.args.first(), a.block) {
            (Some(target), _) => s.values_eq(v, target)?,
            (None, Some(blk)) => call1(s, blk, v)?.truthy(),
            (None, None) => return Ok(Value::Nil),
        };
        if hit {
            return Ok(Value::Int(i as i64));
        }
    }
    Ok(Value::Nil)
}

fn enum_each_with_index(s: &State, a: &CallArgs<'_>) -> R {
    let items = items(s, a)?;
    let Some(blk) = a.block else {
        return Ok(Value::array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| Value::array(vec![v, Value::Int(i as i64)]))
                .collect(),
        ));
    };
    for (i, v) in items.into_iter().enumerate() {
        s.yield_block(blk, &[v, Value::Int(i as i64)])?;
    }
    Ok(a.recv.clone())
}

fn enum_each_with_object(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let blk = s.need_block(a)?;
    let memo = a.args[0].clone();
    for v in items(s, a)? {
        s.yield_block(blk, &[v, memo.clone()])?;
    }
    Ok(memo)
}

fn enum_each_entry(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    for v in items(s, a)? {
        call1(s, blk, &v)?;
    }
    Ok(a.recv.clone())
}

// -------------------------------------------------------------------------
// Folding
// -------------------------------------------------------------------------

/// `inject(init, :sym)`, `inject(:sym)`, `inject(init) { }` and `inject { }`.
fn enum_reduce(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 2)?;
    let (init, op) = match (a.args, a.block) {
        ([init, op], _) => (Some(init.clone()), Some(op)),
        ([Value::Sym(_) | Value::Str(_)], None) => (None, a.args.first()),
        ([init], Some(_)) => (Some(init.clone()), None),
        ([], Some(_)) => (None, None),
        _ => return Err(s.arg_error("no block given")),
    };
    let op = match op {
        Some(v) => Some(s.intern(&s.name_arg(v)?)),
        None => None,
    };
    let mut rest = items(s, a)?.into_iter();
    let mut acc = match init {
        Some(v) => v,
        None => match rest.next() {
            Some(first) => first,
            None => return Ok(Value::Nil),
        },
    };
    for v in rest {
        acc = match (op, a.block) {
            (Some(mid), _) => s.call_method(&acc, mid, &[v], None)?,
            (None, Some(blk)) => s.yield_block(blk, &[acc, v])?,
            (None, None) => acc,
        };
    }
    Ok(acc)
}

pub(super) fn enum_sum(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 1)?;
    let mut acc = a.args.first().cloned().unwrap_or(Value::Int(0));
    let plus = s.intern("+");
    for v in items(s, a)? {
        let v = match a.block {
            Some(blk) => call1(s, blk, &v)?,
            None => v,
        };
        acc = match (&acc, &v) {
            (Value::Int(x), Value::Int(y)) => match x.checked_add(*y) {
                Some(n) => Value::Int(n),
                None => Value::Float(*x as f64 + *y as f64),
            },
            _ => s.call_method(&acc, plus, &[v], None)?,
        };
    }
    Ok(acc)
}

pub(super) fn enum_count(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 1)?;
    let items = items(s, a)?;
    if a.args.is_empty() && a.block.is_none() {
        return Ok(Value::Int(items.len() as i64));
    }
    let mut n = 0;
    for v in &items {
        let hit = match a.args.first() {
            Some(target) => s.values_eq(v, target)?,
            None => test(s, a, v)?,
        };
        if hit {
            n += 1;
        }
    }
    Ok(Value::Int(n))
}

fn extreme(s: &State, a: &CallArgs<'_>, want: Ordering) -> R {
    s.check_args(a, 0, 1)?;
    let items = items(s, a)?;
    if let Some(n) = a.args.first() {
        let n = s.int_arg(n)?.max(0) as usize;
        let mut sorted = s.sort_values(items, &mut |x, y| s.order(a.block, x, y))?;
        if want == Ordering::Greater {
            sorted.reverse();
        }
        sorted.truncate(n);
        return Ok(Value::array(sorted));
    }
    let mut best: Option<Value> = None;
    for v in items {
        let better = match &best {
            None => true,
            Some(b) => s.order(a.block, &v, b)? == want,
        };
        if better {
            best = Some(v);
        }
    }
    Ok(best.unwrap_or(Value::Nil))
}

pub(super) fn enum_min(s: &State, a: &CallArgs<'_>) -> R {
    extreme(s, a, Ordering::Less)
}

pub(super) fn enum_max(s: &State, a: &CallArgs<'_>) -> R {
    extreme(s, a, Ordering::Greater)
}

fn extreme_by(s: &State, a: &CallArgs<'_>, want: Ordering) -> R {
    let blk = s.need_block(a)?;
    let mut best: Option<(Value, Value)> = None;
    for v in items(s, a)? {
        let key = call1(s, blk, &v)?;
        let better = match &best {
            None => true,
            Some((bk, _)) => s.compare(&key, bk)? == want,
        };
        if better {
            best = Some((key, v));
        }
    }
    Ok(best.map_or(Value::Nil, |(_, v)| v))
}

fn enum_min_by(s: &State, a: &CallArgs<'_>) -> R {
    extreme_by(s, a, Ordering::Less)
}

fn enum_max_by(s: &State, a: &CallArgs<'_>) -> R {
    extreme_by(s, a, Ordering::Greater)
}

fn enum_minmax(s: &State, a: &CallArgs<'_>) -> R {
    let min = extreme(s, &a.with_args(&[]), Ordering::Less)?;
    let max = extreme(s, &a.with_args(&[]), Ordering::Greater)?;
    Ok(Value::array(vec![min, max]))
}

fn enum_sort(s: &State, a: &CallArgs<'_>) -> R {
    let items = items(s, a)?;
    Ok(Value::array(s.sort_values(items, &mut |x, y| s.order(a.block, x, y))?))
}

fn enum_sort_by(s: &State, a: &CallArgs<'_>) -> R {
    let items = items(s, a)?;
    let Some(blk) = a.block else {
        return Ok(Value::array(items));
    };
    Ok(Value::array(s.sort_by_block(items, blk)?))
}

fn enum_include(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    for v in items(s, a)? {
        if s.values_eq(&v, &a.args[0])? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn enum_to_a(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::array(items(s, a)?))
}

// -------------------------------------------------------------------------
// Slicing
// -------------------------------------------------------------------------

fn count_arg(s: &State, v: &Value) -> Result<usize, Unwind> {
    let n = s.int_arg(v)?;
    if n < 0 {
        return Err(s.arg_error("attempt to take negative size"));
    }
    Ok(n as usize)
}

fn enum_first(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 1)?;
    let items = items(s, a)?;
    match a.args.first() {
        None => Ok(items.into_iter().next().unwrap_or(Value::Nil)),
        Some(n) => {
            let n = count_arg(s, n)?;
            Ok(Value::array(items.into_iter().take(n).collect()))
        }
    }
}

fn enum_take(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let n = count_arg(s, &a.args[0])?;
    Ok(Value::array(items(s, a)?.into_iter().take(n).collect()))
}

fn enum_drop(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let n = s.int_arg(&a.args[0])?;
    if n < 0 {
        return Err(s.arg_error("attempt to drop negative size"));
    }
    Ok(Value::array(items(s, a)?.into_iter().skip(n as usize).collect()))
}

fn enum_take_while(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    let mut out = Vec::new();
    for v in items(s, a)? {
        if !call1(s, blk, &v)?.truthy() {
            break;
        }
        out.push(v);
    }
    Ok(Value::array(out))
}

fn enum_drop_while(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    let items = items(s, a)?;
    let mut start = items.len();
    for (i, v) in items.iter().enumerate() {
        if !call1(s, blk, v)?.truthy() {
            start = i;
            break;
        }
    }
    Ok(Value::array(items[start..].to_vec()))
}

fn slices(s: &State, a: &CallArgs<'_>, overlapping: bool) -> R {
    s.check_args(a, 1, 1)?;
    let n = s.int_arg(&a.args[0])?;
    if n <= 0 {
        return Err(s.arg_error("invalid size"));
    }
    let n = n as usize;
    let items = items(s, a)?;
    let groups: Vec<Value> = if overlapping {
        items.windows(n).map(|w| Value::array(w.to_vec())).collect()
    } else {
        items.chunks(n).map(|c| Value::array(c.to_vec())).collect()
    };
    let Some(blk) = a.block else {
        return Ok(Value::array(groups));
    };
    for g in groups {
        s.yield_block(blk, &[g])?;
    }
    Ok(Value::Nil)
}

fn enum_each_slice(s: &State, a: &CallArgs<'_>) -> R {
    slices(s, a, false)
}

fn enum_each_cons(s: &State, a: &CallArgs<'_>) -> R {
    slices(s, a, true)
}

// -------------------------------------------------------------------------
// Predicates
// -------------------------------------------------------------------------

fn enum_any(s: &State, a: &CallArgs<'_>) -> R {
    for v in items(s, a)? {
        if test(s, a, &v)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn enum_all(s: &State, a: &CallArgs<'_>) -> R {
    for v in items(s, a)? {
        if !test(s, a, &v)? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn enum_none(s: &State, a: &CallArgs<'_>) -> R {
    for v in items(s, a)? {
        if test(s, a, &v)? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn enum_one(s: &State, a: &CallArgs<'_>) -> R {
    let mut hits = 0;
    for v in items(s, a)? {
        if test(s, a, &v)? {
            hits += 1;
            if hits > 1 {
                return Ok(Value::Bool(false));
            }
        }
    }
    Ok(Value::Bool(hits == 1))
}

// -------------------------------------------------------------------------
// Grouping
// -------------------------------------------------------------------------

fn enum_group_by(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    let groups = RHash::default();
    for v in items(s, a)? {
        let key = call1(s, blk, &v)?;
        match groups.get(&key) {
            Some(Value::Array(list)) => list.push(v),
            _ => groups.insert(key, Value::array(vec![v])),
        }
    }
    Ok(Value::Hash(Rc::new(groups)))
}

fn enum_partition(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    let (mut yes, mut no) = (Vec::new(), Vec::new());
    for v in items(s, a)? {
        if call1(s, blk, &v)?.truthy() {
            yes.push(v);
        } else {
            no.push(v);
        }
    }
    Ok(Value::array(vec![Value::array(yes), Value::array(no)]))
}

fn enum_chunk_while(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    let mut chunks: Vec<Vec<Value>> = Vec::new();
    for v in items(s, a)? {
        let joins = match chunks.last().and_then(|c| c.last()) {
            Some(prev) => s.yield_block(blk, &[prev.clone(), v.clone()])?.truthy(),
            None => false,
        };
        match chunks.last_mut() {
            Some(c) if joins => c.push(v),
            _ => chunks.push(vec![v]),
        }
    }
    Ok(Value::array(chunks.into_iter().map(Value::array).collect()))
}

fn enum_zip(s: &State, a: &CallArgs<'_>) -> R {
    let others = a
        .args
        .iter()
        .map(|o| s.iter_items(o))
        .collect::<Result<Vec<_>, _>>()?;
    let rows: Vec<Value> = items(s, a)?
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            let mut row = vec![v];
            row.extend(others.iter().map(|o| o.get(i).cloned().unwrap_or(Value::Nil)));
            Value::array(row)
        })
        .collect();
    let Some(blk) = a.block else {
        return Ok(Value::array(rows));
    };
    for r in rows {
        s.yield_block(blk, &[r])?;
    }
    Ok(Value::Nil)
}

fn enum_tally(s: &State, a: &CallArgs<'_>) -> R {
    let counts = RHash::default();
    for v in items(s, a)? {
        let n = match counts.get(&v) {
            Some(Value::Int(n)) => n + 1,
            _ => 1,
        };
        counts.insert(v, Value::Int(n));
    }
    Ok(Value::Hash(Rc::new(counts)))
}

fn enum_uniq(s: &State, a: &CallArgs<'_>) -> R {
    let mut seen: FastHashMap<HashKey, ()> = fast_map_new();
    let mut out = Vec::new();
    for v in items(s, a)? {
        let key = match a.block {
            Some(blk) => call1(s, blk, &v)?,
            None => v.clone(),
        };
        if seen.insert(HashKey::of(&key), ()).is_none() {
            out.push(v);
        }
    }
    Ok(Value::array(out))
}

fn enum_to_h(s: &State, a: &CallArgs<'_>) -> R {
    let out = RHash::default();
    for v in items(s, a)? {
        let v = match a.block {
            Some(blk) => call1(s, blk, &v)?,
            None => v,
        };
        match &v {
            Value::Array(p) if p.len() == 2 => {
                out.insert(p.get(0).unwrap_or(Value::Nil), p.get(1).unwrap_or(Value::Nil));
            }
            other => {
                return Err(s.type_error(format!(
                    "wrong element type {} (expected array)",
                    s.obj_classname(other)
                )));
            }
        }
    }
    Ok(Value::Hash(Rc::new(out)))
}

// -------------------------------------------------------------------------
// Comparable
// -------------------------------------------------------------------------

fn cmp_with(s: &State, a: &CallArgs<'_>, test: fn(Ordering) -> bool) -> R {
    s.check_args(a, 1, 1)?;
    Ok(Value::Bool(test(s.compare(&a.recv, &a.args[0])?)))
}

fn cmp_lt(s: &State, a: &CallArgs<'_>) -> R {
    cmp_with(s, a, Ordering::is_lt)
}

fn cmp_le(s: &State, a: &CallArgs<'_>) -> R {
    cmp_with(s, a, Ordering::is_le)
}

fn cmp_gt(s: &State, a: &CallArgs<'_>) -> R {
    cmp_with(s, a, Ordering::is_gt)
}

fn cmp_ge(s: &State, a: &CallArgs<'_>) -> R {
    cmp_with(s, a, Ordering::is_ge)
}

/// Equal when `<=>` says so; a failing `<=>` means not equal.
fn cmp_eq(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    if a.recv.identical(&a.args[0]) {
        return Ok(Value::Bool(true));
    }
    match s.call_method(&a.recv, s.intern("<=>"), &a.args[..1], None) {
        Ok(Value::Int(0)) => Ok(Value::Bool(true)),
        Ok(_) | Err(Unwind::Raise(_)) => Ok(Value::Bool(false)),
        Err(other) => Err(other),
    }
}

fn cmp_between(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 2, 2)?;
    Ok(Value::Bool(
        s.compare(&a.recv, &a.args[0])?.is_ge() && s.compare(&a.recv, &a.args[1])?.is_le(),
    ))
}

fn cmp_clamp(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 2)?;
    let (lo, hi) = match a.args {
        [Value::Range(r)] => (r.lo.clone(), r.hi.clone()),
        [lo, hi] => (lo.clone(), hi.clone()),
        _ => return Err(s.type_error("wrong argument type (expected Range)")),
    };
    if !lo.is_nil() && !hi.is_nil() && s.compare(&lo, &hi)?.is_gt() {
        return Err(s.arg_error("min argument must be less than or equal to max argument"));
    }
    if !lo.is_nil() && s.compare(&a.recv, &lo)?.is_lt() {
        return Ok(lo);
    }
    if !hi.is_nil() && s.compare(&a.recv, &hi)?.is_gt() {
        return Ok(hi);
    }
    Ok(a.recv.clone())
}
