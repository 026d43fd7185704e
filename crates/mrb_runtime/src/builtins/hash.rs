//! Hash. Insertion ordered; string keys are copied on insert.

use std::rc::Rc;

use crate::core::{BuiltinFn, CallArgs, RHash, Value};
use crate::errors::Unwind;
use crate::state::State;

type R = Result<Value, Unwind>;

pub(super) fn install(s: &State) {
    let hash = s.core().hash;
    s.define_class_builtin(hash, "new", hash_new);
    for (name, f) in [
        ("[]", hash_aref as BuiltinFn),
        ("[]=", hash_aset),
        ("store", hash_aset),
        ("fetch", hash_fetch),
        ("dig", hash_dig),
        ("key?", hash_has_key),
        ("has_key?", hash_has_key),
        ("include?", hash_has_key),
        ("member?", hash_has_key),
        ("value?", hash_has_value),
        ("has_value?", hash_has_value),
        ("key", hash_key),
        ("keys", hash_keys),
        ("values", hash_values),
        ("values_at", hash_values_at),
        ("length", hash_length),
        ("size", hash_length),
        ("count", hash_count),
        ("empty?", hash_empty),
        ("each", hash_each),
        ("each_pair", hash_each),
        ("each_key", hash_each_key),
        ("each_value", hash_each_value),
        ("select", hash_select),
        ("filter", hash_select),
        ("reject", hash_reject),
        ("filter_map", hash_filter_map),
        ("delete", hash_delete),
        ("delete_if", hash_delete_if),
        ("keep_if", hash_keep_if),
        ("merge", hash_merge),
        ("merge!", hash_update),
        ("update", hash_update),
        ("to_a", hash_to_a),
        ("to_h", hash_to_h),
        ("to_s", hash_inspect),
        ("inspect", hash_inspect),
        ("==", hash_eq),
        ("default", hash_default),
        ("default=", hash_set_default),
        ("transform_values", hash_transform_values),
        ("transform_keys", hash_transform_keys),
        ("invert", hash_invert),
        ("clear", hash_clear),
        ("replace", hash_replace),
        ("sort_by", hash_sort_by),
        ("min_by", hash_min_by),
        ("max_by", hash_max_by),
        ("sum", hash_sum),
        ("any?", hash_any),
        ("all?", hash_all),
        ("find", hash_find),
        ("detect", hash_find),
        ("map", hash_map),
        ("collect", hash_map),
        ("flat_map", hash_flat_map),
        ("group_by", hash_group_by),
        ("partition", hash_partition),
        ("sort", hash_sort),
        ("each_with_object", hash_each_with_object),
        ("each_with_index", hash_each_with_index),
        ("reduce", hash_reduce),
        ("inject", hash_reduce),
        ("first", hash_first),
        ("slice", hash_slice),
        ("except", hash_except),
        ("compact", hash_compact),
        ("shift", hash_shift),
    ] {
        s.define_builtin(hash, name, f);
    }
}

fn recv_hash(a: &CallArgs<'_>) -> Rc<RHash> {
    match &a.recv {
        Value::Hash(h) => h.clone(),
        _ => Rc::new(RHash::default()),
    }
}

fn pair(k: Value, v: Value) -> Value {
    Value::array(vec![k, v])
}

fn hash_from(entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
    let h = RHash::default();
    for (k, v) in entries {
        h.insert(k, v);
    }
    Value::Hash(Rc::new(h))
}

/// Lookup that falls back to the default proc or value.
fn lookup(s: &State, hv: &Value, h: &RHash, key: &Value) -> R {
    if let Some(v) = h.get(key) {
        return Ok(v);
    }
    let default_proc = h.default_proc.borrow().clone();
    match default_proc {
        Some(p) => s.yield_block(&p, &[hv.clone(), key.clone()]),
        None => Ok(h.default.borrow().clone()),
    }
}

fn hash_new(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 1)?;
    let h = RHash::default();
    *h.default.borrow_mut() = a.arg(0);
    *h.default_proc.borrow_mut() = a.block.cloned();
    Ok(Value::Hash(Rc::new(h)))
}

fn hash_aref(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    lookup(s, &a.recv, &recv_hash(a), &a.args[0])
}

fn hash_aset(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 2, 2)?;
    recv_hash(a).insert(a.args[0].clone(), a.args[1].clone());
    Ok(a.args[1].clone())
}

fn hash_fetch(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 2)?;
    let key = &a.args[0];
    if let Some(v) = recv_hash(a).get(key) {
        return Ok(v);
    }
    match (a.block, a.args.get(1)) {
        (Some(blk), _) => s.yield_block(blk, std::slice::from_ref(key)),
        (None, Some(default)) => Ok(default.clone()),
        (None, None) => Err(s.error(
            s.core().key_error,
            format!("key not found: {}", s.inspect(key)),
        )),
    }
}

fn hash_dig(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, usize::MAX)?;
    let mut cur = lookup(s, &a.recv, &recv_hash(a), &a.args[0])?;
    for key in &a.args[1..] {
        if cur.is_nil() {
            return Ok(Value::Nil);
        }
        cur = s.call_method(&cur, s.intern("dig"), std::slice::from_ref(key), None)?;
    }
    Ok(cur)
}

fn hash_has_key(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    Ok(Value::Bool(recv_hash(a).get(&a.args[0]).is_some()))
}

fn hash_has_value(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    for (_, v) in recv_hash(a).entries() {
        if s.values_eq(&v, &a.args[0])? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn hash_key(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    for (k, v) in recv_hash(a).entries() {
        if s.values_eq(&v, &a.args[0])? {
            return Ok(k);
        }
    }
    Ok(Value::Nil)
}

fn hash_keys(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::array(recv_hash(a).keys()))
}

fn hash_values(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::array(recv_hash(a).entries().into_iter().map(|(_, v)| v).collect()))
}

fn hash_values_at(s: &State, a: &CallArgs<'_>) -> R {
    let h = recv_hash(a);
    let mut out = Vec::with_capacity(a.args.len());
    for k in a.args {
        out.push(lookup(s, &a.recv, &h, k)?);
    }
    Ok(Value::array(out))
}

fn hash_length(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Int(recv_hash(a).len() as i64))
}

fn hash_count(s: &State, a: &CallArgs<'_>) -> R {
    let Some(blk) = a.block else {
        return hash_length(s, a);
    };
    let mut n = 0;
    for (k, v) in recv_hash(a).entries() {
        if yield_pair(s, blk, k, v)?.truthy() {
            n += 1;
        }
    }
    Ok(Value::Int(n))
}

fn hash_empty(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(recv_hash(a).is_empty()))
}

// -------------------------------------------------------------------------
// Iteration. Blocks receive `|key, value|`; a one-parameter block gets the
// pair as an array through auto-splat rules.
// -------------------------------------------------------------------------

fn yield_pair(s: &State, blk: &Value, k: Value, v: Value) -> R {
    s.yield_block(blk, &[pair(k, v)])
}

fn hash_each(s: &State, a: &CallArgs<'_>) -> R {
    let Some(blk) = a.block else {
        return hash_to_a(s, a);
    };
    for (k, v) in recv_hash(a).entries() {
        yield_pair(s, blk, k, v)?;
    }
    Ok(a.recv.clone())
}

fn hash_each_key(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    for k in recv_hash(a).keys() {
        s.yield_block(blk, &[k])?;
    }
    Ok(a.recv.clone())
}

fn hash_each_value(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    for (_, v) in recv_hash(a).entries() {
        s.yield_block(blk, &[v])?;
    }
    Ok(a.recv.clone())
}

fn filtered(s: &State, a: &CallArgs<'_>, keep: bool) -> Result<Vec<(Value, Value)>, Unwind> {
    let blk = s.need_block(a)?;
    let mut out = Vec::new();
    for (k, v) in recv_hash(a).entries() {
        if yield_pair(s, blk, k.clone(), v.clone())?.truthy() == keep {
            out.push((k, v));
        }
    }
    Ok(out)
}

fn hash_select(s: &State, a: &CallArgs<'_>) -> R {
    Ok(hash_from(filtered(s, a, true)?))
}

fn hash_reject(s: &State, a: &CallArgs<'_>) -> R {
    Ok(hash_from(filtered(s, a, false)?))
}

fn replace_entries(h: &RHash, entries: Vec<(Value, Value)>) {
    h.map.borrow_mut().clear();
    for (k, v) in entries {
        h.insert(k, v);
    }
}

fn hash_delete_if(s: &State, a: &CallArgs<'_>) -> R {
    let kept = filtered(s, a, false)?;
    replace_entries(&recv_hash(a), kept);
    Ok(a.recv.clone())
}

fn hash_keep_if(s: &State, a: &CallArgs<'_>) -> R {
    let kept = filtered(s, a, true)?;
    replace_entries(&recv_hash(a), kept);
    Ok(a.recv.clone())
}

fn hash_filter_map(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    let mut out = Vec::new();
    for (k, v) in recv_hash(a).entries() {
        let r = yield_pair(s, blk, k, v)?;
        if r.truthy() {
            out.push(r);
        }
    }
    Ok(Value::array(out))
}

fn hash_map(s: &State, a: &CallArgs<'_>) -> R {
    let Some(blk) = a.block else {
        return hash_to_a(s, a);
    };
    let mut out = Vec::new();
    for (k, v) in recv_hash(a).entries() {
        out.push(yield_pair(s, blk, k, v)?);
    }
    Ok(Value::array(out))
}

fn hash_flat_map(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    let mut out = Vec::new();
    for (k, v) in recv_hash(a).entries() {
        match yield_pair(s, blk, k, v)? {
            Value::Array(items) => out.extend(items.to_vec()),
            other => out.push(other),
        }
    }
    Ok(Value::array(out))
}

fn hash_group_by(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    let groups = RHash::default();
    for (k, v) in recv_hash(a).entries() {
        let key = yield_pair(s, blk, k.clone(), v.clone())?;
        match groups.get(&key) {
            Some(Value::Array(list)) => list.push(pair(k, v)),
            _ => groups.insert(key, Value::array(vec![pair(k, v)])),
        }
    }
    Ok(Value::Hash(Rc::new(groups)))
}

fn hash_partition(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    let (mut yes, mut no) = (Vec::new(), Vec::new());
    for (k, v) in recv_hash(a).entries() {
        let hit = yield_pair(s, blk, k.clone(), v.clone())?.truthy();
        if hit { yes.push(pair(k, v)) } else { no.push(pair(k, v)) }
    }
    Ok(Value::array(vec![Value::array(yes), Value::array(no)]))
}

fn hash_any(s: &State, a: &CallArgs<'_>) -> R {
    let Some(blk) = a.block else {
        return Ok(Value::Bool(!recv_hash(a).is_empty()));
    };
    for (k, v) in recv_hash(a).entries() {
        if yield_pair(s, blk, k, v)?.truthy() {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn hash_all(s: &State, a: &CallArgs<'_>) -> R {
    let Some(blk) = a.block else {
        return Ok(Value::Bool(true));
    };
    for (k, v) in recv_hash(a).entries() {
        if !yield_pair(s, blk, k, v)?.truthy() {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn hash_find(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    for (k, v) in recv_hash(a).entries() {
        if yield_pair(s, blk, k.clone(), v.clone())?.truthy() {
            return Ok(pair(k, v));
        }
    }
    Ok(Value::Nil)
}

fn pairs(a: &CallArgs<'_>) -> Vec<Value> {
    recv_hash(a).entries().into_iter().map(|(k, v)| pair(k, v)).collect()
}

fn hash_sort_by(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    Ok(Value::array(s.sort_by_block(pairs(a), blk)?))
}

fn hash_sort(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::array(s.sort_values(pairs(a), &mut |x, y| s.order(a.block, x, y))?))
}

fn extreme_by(s: &State, a: &CallArgs<'_>, want: std::cmp::Ordering) -> R {
    let blk = s.need_block(a)?;
    let mut best: Option<(Value, Value)> = None;
    for p in pairs(a) {
        let key = s.yield_block(blk, std::slice::from_ref(&p))?;
        let better = match &best {
            None => true,
            Some((bk, _)) => s.compare(&key, bk)? == want,
        };
        if better {
            best = Some((key, p));
        }
    }
    Ok(best.map_or(Value::Nil, |(_, p)| p))
}

fn hash_min_by(s: &State, a: &CallArgs<'_>) -> R {
    extreme_by(s, a, std::cmp::Ordering::Less)
}

fn hash_max_by(s: &State, a: &CallArgs<'_>) -> R {
    extreme_by(s, a, std::cmp::Ordering::Greater)
}

fn hash_sum(s: &State, a: &CallArgs<'_>) -> R {
    let mut acc = a.args.first().cloned().unwrap_or(Value::Int(0));
    let plus = s.intern("+");
    for p in pairs(a) {
        let v = match a.block {
            Some(blk) => s.yield_block(blk, &[p])?,
            None => p,
        };
        acc = s.call_method(&acc, plus, &[v], None)?;
    }
    Ok(acc)
}

fn hash_each_with_object(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let blk = s.need_block(a)?;
    let memo = a.args[0].clone();
    for p in pairs(a) {
        s.yield_block(blk, &[p, memo.clone()])?;
    }
    Ok(memo)
}

fn hash_each_with_index(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    for (i, p) in pairs(a).into_iter().enumerate() {
        s.yield_block(blk, &[p, Value::Int(i as i64)])?;
    }
    Ok(a.recv.clone())
}

fn hash_reduce(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    let mut items = pairs(a).into_iter();
    let mut acc = match a.args.first() {
        Some(init) => init.clone(),
        None => match items.next() {
            Some(first) => first,
            None => return Ok(Value::Nil),
        },
    };
    for p in items {
        acc = s.yield_block(blk, &[acc, p])?;
    }
    Ok(acc)
}

fn hash_first(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 1)?;
    let all = pairs(a);
    match a.args.first() {
        None => Ok(all.into_iter().next().unwrap_or(Value::Nil)),
        Some(n) => {
            let n = s.int_arg(n)?.max(0) as usize;
            Ok(Value::array(all.into_iter().take(n).collect()))
        }
    }
}

// -------------------------------------------------------------------------
// Mutation and transformation
// -------------------------------------------------------------------------

fn hash_delete(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    match (recv_hash(a).remove(&a.args[0]), a.block) {
        (Some(v), _) => Ok(v),
        (None, Some(blk)) => s.yield_block(blk, &[a.args[0].clone()]),
        (None, None) => Ok(Value::Nil),
    }
}

fn merge_into(s: &State, target: &RHash, a: &CallArgs<'_>) -> Result<(), Unwind> {
    for other in a.args {
        let Value::Hash(other) = other else {
            return Err(s.implicit_conversion(other, "Hash"));
        };
        for (k, v) in other.entries() {
            let v = match (a.block, target.get(&k)) {
                (Some(blk), Some(old)) => s.yield_block(blk, &[k.clone(), old, v])?,
                _ => v,
            };
            target.insert(k, v);
        }
    }
    Ok(())
}

fn hash_merge(s: &State, a: &CallArgs<'_>) -> R {
    let src = recv_hash(a);
    let copy = RHash::default();
    for (k, v) in src.entries() {
        copy.insert(k, v);
    }
    *copy.default.borrow_mut() = src.default.borrow().clone();
    *copy.default_proc.borrow_mut() = src.default_proc.borrow().clone();
    merge_into(s, &copy, a)?;
    Ok(Value::Hash(Rc::new(copy)))
}

fn hash_update(s: &State, a: &CallArgs<'_>) -> R {
    merge_into(s, &recv_hash(a), a)?;
    Ok(a.recv.clone())
}

fn hash_to_a(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::array(pairs(a)))
}

fn hash_to_h(s: &State, a: &CallArgs<'_>) -> R {
    let Some(blk) = a.block else {
        return Ok(a.recv.clone());
    };
    let out = RHash::default();
    for (k, v) in recv_hash(a).entries() {
        match yield_pair(s, blk, k, v)? {
            Value::Array(p) if p.len() == 2 => {
                out.insert(p.get(0).unwrap_or(Value::Nil), p.get(1).unwrap_or(Value::Nil));
            }
            other => {
                return Err(s.type_error(format!(
                    "wrong element type {} (expected array)",
                    s.obj_classname(&other)
                )));
            }
        }
    }
    Ok(Value::Hash(Rc::new(out)))
}

/// `{:a=>1, "b"=>2}`
fn hash_inspect(s: &State, a: &CallArgs<'_>) -> R {
    let mut out = String::from("{");
    for (i, (k, v)) in recv_hash(a).entries().into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&s.inspect_value(&k)?);
        out.push_str("=>");
        if v.identical(&a.recv) {
            out.push_str("{...}");
        } else {
            out.push_str(&s.inspect_value(&v)?);
        }
    }
    out.push('}');
    Ok(Value::str(out))
}

fn hash_eq(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let Value::Hash(other) = &a.args[0] else {
        return Ok(Value::Bool(false));
    };
    let mine = recv_hash(a);
    if mine.len() != other.len() {
        return Ok(Value::Bool(false));
    }
    for (k, v) in mine.entries() {
        match other.get(&k) {
            Some(w) if s.values_eq(&v, &w)? => {}
            _ => return Ok(Value::Bool(false)),
        }
    }
    Ok(Value::Bool(true))
}

fn hash_default(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(recv_hash(a).default.borrow().clone())
}

fn hash_set_default(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    *recv_hash(a).default.borrow_mut() = a.args[0].clone();
    Ok(a.args[0].clone())
}

fn hash_transform_values(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    let mut out = Vec::new();
    for (k, v) in recv_hash(a).entries() {
        out.push((k, s.yield_block(blk, &[v])?));
    }
    Ok(hash_from(out))
}

fn hash_transform_keys(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    let mut out = Vec::new();
    for (k, v) in recv_hash(a).entries() {
        out.push((s.yield_block(blk, &[k])?, v));
    }
    Ok(hash_from(out))
}

fn hash_invert(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(hash_from(recv_hash(a).entries().into_iter().map(|(k, v)| (v, k))))
}

fn hash_clear(_s: &State, a: &CallArgs<'_>) -> R {
    recv_hash(a).map.borrow_mut().clear();
    Ok(a.recv.clone())
}

fn hash_replace(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let Value::Hash(other) = &a.args[0] else {
        return Err(s.implicit_conversion(&a.args[0], "Hash"));
    };
    replace_entries(&recv_hash(a), other.entries());
    Ok(a.recv.clone())
}

fn hash_slice(_s: &State, a: &CallArgs<'_>) -> R {
    let h = recv_hash(a);
    Ok(hash_from(a.args.iter().filter_map(|k| h.get(k).map(|v| (k.clone(), v)))))
}

fn hash_except(_s: &State, a: &CallArgs<'_>) -> R {
    let drop = RHash::default();
    for k in a.args {
        drop.insert(k.clone(), Value::Nil);
    }
    Ok(hash_from(
        recv_hash(a).entries().into_iter().filter(|(k, _)| drop.get(k).is_none()),
    ))
}

fn hash_compact(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(hash_from(recv_hash(a).entries().into_iter().filter(|(_, v)| !v.is_nil())))
}

fn hash_shift(_s: &State, a: &CallArgs<'_>) -> R {
    let h = recv_hash(a);
    let first = h.map.borrow_mut().shift_remove_index(0);
    Ok(first.map_or(Value::Nil, |(_, (k, v))| pair(k, v)))
}
