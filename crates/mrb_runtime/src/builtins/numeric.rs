//! Integer, Float, Numeric and Math.
//!
//! Integer arithmetic is checked; a result that does not fit in `i64`
//! becomes a Float instead of a bignum.

use std::cmp::Ordering;

use crate::core::{BuiltinFn, CallArgs, ClassId, Value};
use crate::errors::{Unwind, messages};
use crate::format;
use crate::state::State;

type R = Result<Value, Unwind>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

pub(super) fn install(s: &State) {
    let core = s.core().clone();
    for (name, f) in [
        ("+", num_add as BuiltinFn),
        ("-", num_sub),
        ("*", num_mul),
        ("/", num_div),
        ("%", num_mod),
        ("modulo", num_mod),
        ("**", num_pow),
        ("pow", num_pow),
        ("-@", num_neg),
        ("+@", num_pos),
        ("==", num_eq),
        ("===", num_eq),
        ("eql?", num_eql),
        ("<=>", num_cmp),
        ("<", num_lt),
        ("<=", num_le),
        (">", num_gt),
        (">=", num_ge),
        ("divmod", num_divmod),
        ("div", num_intdiv),
        ("fdiv", num_fdiv),
        ("quo", num_fdiv),
        ("abs", num_abs),
        ("magnitude", num_abs),
        ("zero?", num_zero),
        ("nonzero?", num_nonzero),
        ("positive?", num_positive),
        ("negative?", num_negative),
        ("integer?", num_integer_p),
        ("to_f", num_to_f),
        ("step", num_step),
        ("coerce", num_coerce),
    ] {
        s.define_builtin(core.numeric, name, f);
    }

    for (name, f) in [
        ("to_s", int_to_s as BuiltinFn),
        ("inspect", int_to_s),
        ("to_i", num_itself),
        ("to_int", num_itself),
        ("floor", int_floor),
        ("ceil", int_ceil),
        ("round", int_round),
        ("truncate", int_floor),
        ("times", int_times),
        ("upto", int_upto),
        ("downto", int_downto),
        ("succ", int_succ),
        ("next", int_succ),
        ("pred", int_pred),
        ("chr", int_chr),
        ("ord", num_itself),
        ("even?", int_even),
        ("odd?", int_odd),
        ("~", int_invert),
        ("&", int_and),
        ("|", int_or),
        ("^", int_xor),
        ("<<", int_lshift),
        (">>", int_rshift),
        ("[]", int_bit),
        ("gcd", int_gcd),
        ("lcm", int_lcm),
        ("digits", int_digits),
        ("bit_length", int_bit_length),
        ("size", int_size),
    ] {
        s.define_builtin(core.integer, name, f);
    }

    for (name, f) in [
        ("to_s", flo_to_s as BuiltinFn),
        ("inspect", flo_to_s),
        ("to_i", flo_to_i),
        ("to_int", flo_to_i),
        ("truncate", flo_to_i),
        ("floor", flo_floor),
        ("ceil", flo_ceil),
        ("round", flo_round),
        ("nan?", flo_nan),
        ("infinite?", flo_infinite),
        ("finite?", flo_finite),
    ] {
        s.define_builtin(core.float, name, f);
    }
    for (name, v) in [
        ("INFINITY", f64::INFINITY),
        ("NAN", f64::NAN),
        ("EPSILON", f64::EPSILON),
        ("MAX", f64::MAX),
        ("MIN", f64::MIN_POSITIVE),
    ] {
        s.const_set(core.float, s.intern(name), Value::Float(v));
    }
    s.const_set(core.float, s.intern("DIG"), Value::Int(f64::DIGITS as i64));

    install_math(s, core.math, core.argument_error);
}

// -------------------------------------------------------------------------
// Arithmetic
// -------------------------------------------------------------------------

fn coerce_error(s: &State, recv: &Value, other: &Value) -> Unwind {
    let what = match other {
        Value::Nil => "nil".to_string(),
        Value::Bool(b) => b.to_string(),
        v => s.obj_classname(v),
    };
    s.type_error(format!("{what} can't be coerced into {}", s.obj_classname(recv)))
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

fn floor_mod(a: i64, b: i64) -> i64 {
    let r = a.checked_rem(b).unwrap_or(0);
    if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r }
}

fn float_mod(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && ((r < 0.0) != (b < 0.0)) { r + b } else { r }
}

fn int_op(s: &State, op: Op, a: i64, b: i64) -> R {
    let (fa, fb) = (a as f64, b as f64);
    Ok(match op {
        Op::Add => a.checked_add(b).map_or(Value::Float(fa + fb), Value::Int),
        Op::Sub => a.checked_sub(b).map_or(Value::Float(fa - fb), Value::Int),
        Op::Mul => a.checked_mul(b).map_or(Value::Float(fa * fb), Value::Int),
        Op::Div => {
            if b == 0 {
                return Err(s.error(s.core().zero_division_error, messages::DIVIDED_BY_ZERO));
            }
            floor_div(a, b).map_or(Value::Float(fa / fb), Value::Int)
        }
        Op::Mod => {
            if b == 0 {
                return Err(s.error(s.core().zero_division_error, messages::DIVIDED_BY_ZERO));
            }
            Value::Int(floor_mod(a, b))
        }
        Op::Pow => {
            if b < 0 {
                Value::Float(fa.powf(fb))
            } else {
                u32::try_from(b)
                    .ok()
                    .and_then(|e| a.checked_pow(e))
                    .map_or(Value::Float(fa.powf(fb)), Value::Int)
            }
        }
    })
}

fn float_op(op: Op, a: f64, b: f64) -> f64 {
    match op {
        Op::Add => a + b,
        Op::Sub => a - b,
        Op::Mul => a * b,
        Op::Div => a / b,
        Op::Mod => float_mod(a, b),
        Op::Pow => a.powf(b),
    }
}

fn arith(s: &State, op: Op, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let rhs = &a.args[0];
    match (&a.recv, rhs) {
        (Value::Int(x), Value::Int(y)) => int_op(s, op, *x, *y),
        _ => match (a.recv.as_f64(), rhs.as_f64()) {
            (Some(x), Some(y)) => Ok(Value::Float(float_op(op, x, y))),
            _ => Err(coerce_error(s, &a.recv, rhs)),
        },
    }
}

fn num_add(s: &State, a: &CallArgs<'_>) -> R {
    arith(s, Op::Add, a)
}

fn num_sub(s: &State, a: &CallArgs<'_>) -> R {
    arith(s, Op::Sub, a)
}

fn num_mul(s: &State, a: &CallArgs<'_>) -> R {
    arith(s, Op::Mul, a)
}

fn num_div(s: &State, a: &CallArgs<'_>) -> R {
    arith(s, Op::Div, a)
}

fn num_mod(s: &State, a: &CallArgs<'_>) -> R {
    arith(s, Op::Mod, a)
}

fn num_pow(s: &State, a: &CallArgs<'_>) -> R {
    arith(s, Op::Pow, a)
}

fn num_neg(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(match a.recv {
        Value::Int(i) => i.checked_neg().map_or(Value::Float(-(i as f64)), Value::Int),
        Value::Float(f) => Value::Float(-f),
        ref other => other.clone(),
    })
}

fn num_pos(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(a.recv.clone())
}

fn num_itself(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(a.recv.clone())
}

fn num_intdiv(s: &State, a: &CallArgs<'_>) -> R {
    let q = arith(s, Op::Div, a)?;
    match q {
        Value::Float(f) => float_to_int(s, f.floor()),
        other => Ok(other),
    }
}

fn num_fdiv(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    match (a.recv.as_f64(), a.args[0].as_f64()) {
        (Some(x), Some(y)) => Ok(Value::Float(x / y)),
        _ => Err(coerce_error(s, &a.recv, &a.args[0])),
    }
}

fn num_divmod(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let rhs = &a.args[0];
    if let (Value::Int(x), Value::Int(y)) = (&a.recv, rhs) {
        let q = int_op(s, Op::Div, *x, *y)?;
        let r = int_op(s, Op::Mod, *x, *y)?;
        return Ok(Value::array(vec![q, r]));
    }
    match (a.recv.as_f64(), rhs.as_f64()) {
        (Some(_), Some(y)) if y == 0.0 => {
            Err(s.error(s.core().zero_division_error, messages::DIVIDED_BY_ZERO))
        }
        (Some(x), Some(y)) => {
            let q = float_to_int(s, (x / y).floor())?;
            Ok(Value::array(vec![q, Value::Float(float_mod(x, y))]))
        }
        _ => Err(coerce_error(s, &a.recv, rhs)),
    }
}

fn num_coerce(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    match (&a.recv, &a.args[0]) {
        (Value::Int(_), Value::Int(_)) => Ok(Value::array(vec![a.args[0].clone(), a.recv.clone()])),
        (x, y) => match (x.as_f64(), y.as_f64()) {
            (Some(fx), Some(fy)) => Ok(Value::array(vec![Value::Float(fy), Value::Float(fx)])),
            _ => Err(coerce_error(s, x, y)),
        },
    }
}

// -------------------------------------------------------------------------
// Comparison
// -------------------------------------------------------------------------

fn num_partial_cmp(x: &Value, y: &Value) -> Option<Option<Ordering>> {
    match (x, y) {
        (Value::Int(a), Value::Int(b)) => Some(Some(a.cmp(b))),
        _ => match (x.as_f64(), y.as_f64()) {
            (Some(a), Some(b)) => Some(a.partial_cmp(&b)),
            _ => None,
        },
    }
}

fn num_eq(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    Ok(Value::Bool(matches!(
        num_partial_cmp(&a.recv, &a.args[0]),
        Some(Some(Ordering::Equal))
    )))
}

fn num_eql(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    Ok(Value::Bool(match (&a.recv, &a.args[0]) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        _ => false,
    }))
}

fn num_cmp(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    Ok(match num_partial_cmp(&a.recv, &a.args[0]) {
        Some(Some(o)) => Value::Int(o as i64),
        _ => Value::Nil,
    })
}

fn relation(s: &State, a: &CallArgs<'_>, test: fn(Ordering) -> bool) -> R {
    s.check_args(a, 1, 1)?;
    match num_partial_cmp(&a.recv, &a.args[0]) {
        Some(Some(o)) => Ok(Value::Bool(test(o))),
        Some(None) => Ok(Value::Bool(false)),
        None => Err(s.arg_error(format!(
            "comparison of {} with {} failed",
            s.obj_classname(&a.recv),
            s.inspect(&a.args[0])
        ))),
    }
}

fn num_lt(s: &State, a: &CallArgs<'_>) -> R {
    relation(s, a, Ordering::is_lt)
}

fn num_le(s: &State, a: &CallArgs<'_>) -> R {
    relation(s, a, Ordering::is_le)
}

fn num_gt(s: &State, a: &CallArgs<'_>) -> R {
    relation(s, a, Ordering::is_gt)
}

fn num_ge(s: &State, a: &CallArgs<'_>) -> R {
    relation(s, a, Ordering::is_ge)
}

// -------------------------------------------------------------------------
// Predicates and conversions shared by Integer and Float
// -------------------------------------------------------------------------

fn num_abs(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(match a.recv {
        Value::Int(i) => i.checked_abs().map_or(Value::Float((i as f64).abs()), Value::Int),
        Value::Float(f) => Value::Float(f.abs()),
        ref other => other.clone(),
    })
}

fn num_zero(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(a.recv.as_f64() == Some(0.0)))
}

fn num_nonzero(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(if a.recv.as_f64() == Some(0.0) { Value::Nil } else { a.recv.clone() })
}

fn num_positive(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(a.recv.as_f64().is_some_and(|f| f > 0.0)))
}

fn num_negative(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(a.recv.as_f64().is_some_and(|f| f < 0.0)))
}

fn num_integer_p(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(matches!(a.recv, Value::Int(_))))
}

fn num_to_f(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Float(a.recv.as_f64().unwrap_or(0.0)))
}

/// `Numeric#step(limit, step = 1)`; float iteration counts steps up front
/// so accumulated error cannot add or drop a value.
fn num_step(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 2)?;
    let limit = &a.args[0];
    let step = a.args.get(1).cloned().unwrap_or(Value::Int(1));
    let mut items = Vec::new();
    let emit = |v: Value, items: &mut Vec<Value>| -> Result<(), Unwind> {
        match a.block {
            Some(blk) => s.yield_block(blk, &[v]).map(|_| ()),
            None => {
                items.push(v);
                Ok(())
            }
        }
    };
    match (&a.recv, limit, &step) {
        (Value::Int(from), Value::Int(to), Value::Int(by)) => {
            if *by == 0 {
                return Err(s.arg_error("step can't be 0"));
            }
            let mut i = *from;
            while (*by > 0 && i <= *to) || (*by < 0 && i >= *to) {
                emit(Value::Int(i), &mut items)?;
                match i.checked_add(*by) {
                    Some(n) => i = n,
                    None => break,
                }
            }
        }
        _ => {
            let from = s.float_arg(&a.recv)?;
            let to = s.float_arg(limit)?;
            let by = s.float_arg(&step)?;
            if by == 0.0 {
                return Err(s.arg_error("step can't be 0"));
            }
            let n = ((to - from) / by + f64::EPSILON * 4.0).floor();
            if n >= 0.0 && n.is_finite() {
                for i in 0..=(n as i64) {
                    emit(Value::Float(from + i as f64 * by), &mut items)?;
                }
            }
        }
    }
    Ok(match a.block {
        Some(_) => a.recv.clone(),
        None => Value::array(items),
    })
}

// -------------------------------------------------------------------------
// Integer
// -------------------------------------------------------------------------

fn recv_int(a: &CallArgs<'_>) -> i64 {
    a.recv.as_int().unwrap_or(0)
}

fn int_to_s(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 1)?;
    let base = match a.args.first() {
        Some(b) => s.int_arg(b)?,
        None => 10,
    };
    if !(2..=36).contains(&base) {
        return Err(s.arg_error(format!("invalid radix {base}")));
    }
    Ok(Value::str(format::int_to_s_radix(recv_int(a), base as u32)))
}

fn pow10(n: i64) -> Option<i64> {
    u32::try_from(n).ok().and_then(|e| 10i64.checked_pow(e))
}

/// Rounding mode for `Integer#floor/ceil/round` with negative digits.
fn int_to_digits(s: &State, a: &CallArgs<'_>, mode: fn(i64, i64) -> i64) -> R {
    s.check_args(a, 0, 1)?;
    let x = recv_int(a);
    let nd = match a.args.first() {
        Some(v) => s.int_arg(v)?,
        None => 0,
    };
    if nd >= 0 {
        return Ok(Value::Int(x));
    }
    Ok(Value::Int(match pow10(-nd) {
        Some(p) => mode(x, p),
        None => 0,
    }))
}

fn int_floor(s: &State, a: &CallArgs<'_>) -> R {
    int_to_digits(s, a, |x, p| floor_div(x, p).unwrap_or(0).saturating_mul(p))
}

fn int_ceil(s: &State, a: &CallArgs<'_>) -> R {
    int_to_digits(s, a, |x, p| {
        floor_div(x.saturating_neg(), p)
            .unwrap_or(0)
            .saturating_mul(p)
            .saturating_neg()
    })
}

fn int_round(s: &State, a: &CallArgs<'_>) -> R {
    int_to_digits(s, a, |x, p| {
        let (q, r) = (x.unsigned_abs() / p as u64, x.unsigned_abs() % p as u64);
        let m = if r * 2 >= p as u64 { q + 1 } else { q };
        let v = (m as i64).saturating_mul(p);
        if x < 0 { -v } else { v }
    })
}

fn int_times(s: &State, a: &CallArgs<'_>) -> R {
    let n = recv_int(a);
    let Some(blk) = a.block else {
        return Ok(Value::array((0..n.max(0)).map(Value::Int).collect()));
    };
    for i in 0..n {
        s.yield_block(blk, &[Value::Int(i)])?;
    }
    Ok(a.recv.clone())
}

fn int_range_walk(s: &State, a: &CallArgs<'_>, up: bool) -> R {
    s.check_args(a, 1, 1)?;
    let from = recv_int(a);
    let to = s.int_arg(&a.args[0])?;
    let seq: Box<dyn Iterator<Item = i64>> = if up {
        Box::new(from..=to)
    } else {
        Box::new((to..=from).rev())
    };
    match a.block {
        None => Ok(Value::array(seq.map(Value::Int).collect())),
        Some(blk) => {
            for i in seq {
                s.yield_block(blk, &[Value::Int(i)])?;
            }
            Ok(a.recv.clone())
        }
    }
}

fn int_upto(s: &State, a: &CallArgs<'_>) -> R {
    int_range_walk(s, a, true)
}

fn int_downto(s: &State, a: &CallArgs<'_>) -> R {
    int_range_walk(s, a, false)
}

fn int_succ(s: &State, a: &CallArgs<'_>) -> R {
    int_op(s, Op::Add, recv_int(a), 1)
}

fn int_pred(s: &State, a: &CallArgs<'_>) -> R {
    int_op(s, Op::Sub, recv_int(a), 1)
}

fn int_chr(s: &State, a: &CallArgs<'_>) -> R {
    let n = recv_int(a);
    match u8::try_from(n) {
        Ok(b) => Ok(Value::str(vec![b])),
        Err(_) => Err(s.error(s.core().range_error, format!("{n} out of char range"))),
    }
}

fn int_even(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(recv_int(a) % 2 == 0))
}

fn int_odd(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(recv_int(a) % 2 != 0))
}

fn int_invert(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Int(!recv_int(a)))
}

fn int_bitop(s: &State, a: &CallArgs<'_>, f: fn(i64, i64) -> i64) -> R {
    s.check_args(a, 1, 1)?;
    match &a.args[0] {
        Value::Int(y) => Ok(Value::Int(f(recv_int(a), *y))),
        other => Err(coerce_error(s, &a.recv, other)),
    }
}

fn int_and(s: &State, a: &CallArgs<'_>) -> R {
    int_bitop(s, a, |x, y| x & y)
}

fn int_or(s: &State, a: &CallArgs<'_>) -> R {
    int_bitop(s, a, |x, y| x | y)
}

fn int_xor(s: &State, a: &CallArgs<'_>) -> R {
    int_bitop(s, a, |x, y| x ^ y)
}

fn shift_left(x: i64, by: i64) -> Value {
    if by < 0 {
        return shift_right(x, -by);
    }
    if x == 0 {
        return Value::Int(0);
    }
    match u32::try_from(by) {
        Ok(n) if n < 63 && x.unsigned_abs() < (1u64 << (63 - n)) => Value::Int(x << n),
        _ => Value::Float(x as f64 * 2f64.powf(by as f64)),
    }
}

fn shift_right(x: i64, by: i64) -> Value {
    if by < 0 {
        return shift_left(x, -by);
    }
    Value::Int(if by >= 64 { if x < 0 { -1 } else { 0 } } else { x >> by })
}

fn int_lshift(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    Ok(shift_left(recv_int(a), s.int_arg(&a.args[0])?))
}

fn int_rshift(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    Ok(shift_right(recv_int(a), s.int_arg(&a.args[0])?))
}

fn int_bit(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let i = s.int_arg(&a.args[0])?;
    let x = recv_int(a);
    Ok(Value::Int(match i {
        i if i < 0 => 0,
        i if i >= 63 => (x < 0) as i64,
        i => (x >> i) & 1,
    }))
}

fn gcd(mut x: i64, mut y: i64) -> i64 {
    x = x.saturating_abs();
    y = y.saturating_abs();
    while y != 0 {
        (x, y) = (y, x % y);
    }
    x
}

fn int_gcd(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    Ok(Value::Int(gcd(recv_int(a), s.int_arg(&a.args[0])?)))
}

fn int_lcm(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let (x, y) = (recv_int(a), s.int_arg(&a.args[0])?);
    if x == 0 || y == 0 {
        return Ok(Value::Int(0));
    }
    int_op(s, Op::Mul, (x / gcd(x, y)).saturating_abs(), y.saturating_abs())
}

fn int_digits(s: &State, a: &CallArgs<'_>) -> R {
    let mut n = recv_int(a);
    if n < 0 {
        return Err(s.error(s.core().argument_error, "out of domain"));
    }
    let mut out = vec![Value::Int(n % 10)];
    n /= 10;
    while n > 0 {
        out.push(Value::Int(n % 10));
        n /= 10;
    }
    Ok(Value::array(out))
}

fn int_bit_length(_s: &State, a: &CallArgs<'_>) -> R {
    let n = recv_int(a);
    let v = if n < 0 { !n } else { n };
    Ok(Value::Int(64 - v.leading_zeros() as i64))
}

fn int_size(_s: &State, _a: &CallArgs<'_>) -> R {
    Ok(Value::Int(8))
}

// -------------------------------------------------------------------------
// Float
// -------------------------------------------------------------------------

fn recv_float(a: &CallArgs<'_>) -> f64 {
    a.recv.as_f64().unwrap_or(0.0)
}

/// Truncated float as an Integer; NaN and infinities raise `FloatDomainError`.
pub(crate) fn float_to_int(s: &State, f: f64) -> R {
    if !f.is_finite() || f >= 9.223_372_036_854_776e18 || f < -9.223_372_036_854_776e18 {
        return Err(s.error(s.core().float_domain_error, format::float_to_s(f)));
    }
    Ok(Value::Int(f.trunc() as i64))
}

fn flo_to_s(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::str(format::float_to_s(recv_float(a))))
}

fn flo_to_i(s: &State, a: &CallArgs<'_>) -> R {
    float_to_int(s, recv_float(a))
}

fn flo_digits(s: &State, a: &CallArgs<'_>, f: fn(f64) -> f64) -> R {
    s.check_args(a, 0, 1)?;
    let x = recv_float(a);
    let nd = match a.args.first() {
        Some(v) => s.int_arg(v)?,
        None => 0,
    };
    if nd > 0 {
        if nd >= f64::DIGITS as i64 + 1 || !x.is_finite() {
            return Ok(Value::Float(x));
        }
        let p = 10f64.powi(nd as i32);
        let r = f(x * p) / p;
        return Ok(Value::Float(if r.is_finite() { r } else { x }));
    }
    if nd < 0 {
        let p = 10f64.powi((-nd).min(308) as i32);
        return float_to_int(s, f(x / p) * p);
    }
    float_to_int(s, f(x))
}

fn flo_floor(s: &State, a: &CallArgs<'_>) -> R {
    flo_digits(s, a, f64::floor)
}

fn flo_ceil(s: &State, a: &CallArgs<'_>) -> R {
    flo_digits(s, a, f64::ceil)
}

fn flo_round(s: &State, a: &CallArgs<'_>) -> R {
    flo_digits(s, a, f64::round)
}

fn flo_nan(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(recv_float(a).is_nan()))
}

fn flo_infinite(_s: &State, a: &CallArgs<'_>) -> R {
    let f = recv_float(a);
    Ok(match f {
        f if f == f64::INFINITY => Value::Int(1),
        f if f == f64::NEG_INFINITY => Value::Int(-1),
        _ => Value::Nil,
    })
}

fn flo_finite(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(recv_float(a).is_finite()))
}

// -------------------------------------------------------------------------
// Math
// -------------------------------------------------------------------------

fn install_math(s: &State, math: ClassId, argument_error: ClassId) {
    let _ = s.define_class_under(math, "DomainError", Some(argument_error));
    s.const_set(math, s.intern("PI"), Value::Float(std::f64::consts::PI));
    s.const_set(math, s.intern("E"), Value::Float(std::f64::consts::E));
    for (name, f) in [
        ("sqrt", m_sqrt as BuiltinFn),
        ("cbrt", m_cbrt),
        ("sin", m_sin),
        ("cos", m_cos),
        ("tan", m_tan),
        ("asin", m_asin),
        ("acos", m_acos),
        ("atan", m_atan),
        ("exp", m_exp),
        ("log", m_log),
        ("log2", m_log2),
        ("log10", m_log10),
        ("atan2", m_atan2),
        ("hypot", m_hypot),
    ] {
        s.define_class_builtin(math, name, f);
    }
}

fn domain_error(s: &State, name: &str) -> Unwind {
    let class = s
        .class_get_under(s.core().math, "DomainError")
        .unwrap_or(s.core().argument_error);
    s.error(class, format!("Numerical argument is out of domain - \"{name}\""))
}

fn unary(s: &State, a: &CallArgs<'_>, name: &str, ok: fn(f64) -> bool, f: fn(f64) -> f64) -> R {
    s.check_args(a, 1, 1)?;
    let x = s.float_arg(&a.args[0])?;
    if !ok(x) {
        return Err(domain_error(s, name));
    }
    Ok(Value::Float(f(x)))
}

fn any(_: f64) -> bool {
    true
}

fn unit(x: f64) -> bool {
    x.is_nan() || (-1.0..=1.0).contains(&x)
}

fn non_negative(x: f64) -> bool {
    x.is_nan() || x >= 0.0
}

fn m_sqrt(s: &State, a: &CallArgs<'_>) -> R {
    unary(s, a, "sqrt", non_negative, f64::sqrt)
}

fn m_cbrt(s: &State, a: &CallArgs<'_>) -> R {
    unary(s, a, "cbrt", any, f64::cbrt)
}

fn m_sin(s: &State, a: &CallArgs<'_>) -> R {
    unary(s, a, "sin", any, f64::sin)
}

fn m_cos(s: &State, a: &CallArgs<'_>) -> R {
    unary(s, a, "cos", any, f64::cos)
}

fn m_tan(s: &State, a: &CallArgs<'_>) -> R {
    unary(s, a, "tan", any, f64::tan)
}

fn m_asin(s: &State, a: &CallArgs<'_>) -> R {
    unary(s, a, "asin", unit, f64::asin)
}

fn m_acos(s: &State, a: &CallArgs<'_>) -> R {
    unary(s, a, "acos", unit, f64::acos)
}

fn m_atan(s: &State, a: &CallArgs<'_>) -> R {
    unary(s, a, "atan", any, f64::atan)
}

fn m_exp(s: &State, a: &CallArgs<'_>) -> R {
    unary(s, a, "exp", any, f64::exp)
}

fn m_log2(s: &State, a: &CallArgs<'_>) -> R {
    unary(s, a, "log2", non_negative, f64::log2)
}

fn m_log10(s: &State, a: &CallArgs<'_>) -> R {
    unary(s, a, "log10", non_negative, f64::log10)
}

fn m_log(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 2)?;
    let x = s.float_arg(&a.args[0])?;
    if !non_negative(x) {
        return Err(domain_error(s, "log"));
    }
    match a.args.get(1) {
        None => Ok(Value::Float(x.ln())),
        Some(b) => {
            let base = s.float_arg(b)?;
            if !non_negative(base) {
                return Err(domain_error(s, "log"));
            }
            Ok(Value::Float(x.ln() / base.ln()))
        }
    }
}

fn m_atan2(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 2, 2)?;
    Ok(Value::Float(s.float_arg(&a.args[0])?.atan2(s.float_arg(&a.args[1])?)))
}

fn m_hypot(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 2, 2)?;
    Ok(Value::Float(s.float_arg(&a.args[0])?.hypot(s.float_arg(&a.args[1])?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floored_division() {
        assert_eq!(floor_div(7, 2), Some(3));
        assert_eq!(floor_div(-7, 2), Some(-4));
        assert_eq!(floor_div(7, -2), Some(-4));
        assert_eq!(floor_div(i64::MIN, -1), None);
        assert_eq!(floor_mod(-7, 2), 1);
        assert_eq!(floor_mod(7, -2), -1);
        assert_eq!(float_mod(-7.5, 2.0), 0.5);
    }

    #[test]
    fn shifts() {
        assert!(matches!(shift_left(1, 10), Value::Int(1024)));
        assert!(matches!(shift_right(-5, 1), Value::Int(-3)));
        assert!(matches!(shift_right(5, 100), Value::Int(0)));
        assert!(matches!(shift_left(1, 70), Value::Float(_)));
    }

    #[test]
    fn gcd_is_non_negative() {
        assert_eq!(gcd(12, -18), 6);
        assert_eq!(gcd(0, 5), 5);
    }
}
