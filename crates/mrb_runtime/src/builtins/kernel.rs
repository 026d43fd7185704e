//! Kernel: output, raising, loops and conversion functions.

use std::rc::Rc;

use crate::core::{BuiltinFn, CallArgs, RProc, Value};
use crate::errors::{Unwind, messages};
use crate::state::State;

type R = Result<Value, Unwind>;

pub(super) fn install(s: &State) {
    let kernel = s.core().kernel;
    for (name, f) in [
        ("puts", k_puts as BuiltinFn),
        ("print", k_print),
        ("p", k_p),
        ("pp", k_p),
        ("raise", k_raise),
        ("fail", k_raise),
        ("loop", k_loop),
        ("lambda", k_lambda),
        ("proc", k_proc),
        ("Integer", k_integer),
        ("Float", k_float),
        ("String", k_string),
        ("Array", k_array),
        ("format", k_format),
        ("sprintf", k_format),
        ("printf", k_printf),
        ("caller", k_caller),
    ] {
        s.define_builtin(kernel, name, f);
    }
}

/// Appends the `puts` rendering of `v`; arrays print one item per line.
fn puts_value(s: &State, v: &Value, out: &mut Vec<u8>, depth: usize) -> Result<(), Unwind> {
    if let Value::Array(a) = v {
        if depth < 64 {
            let items = a.to_vec();
            if items.is_empty() && depth == 0 {
                out.push(b'\n');
            }
            for item in &items {
                puts_value(s, item, out, depth + 1)?;
            }
            return Ok(());
        }
    }
    let bytes = s.to_s_value(v)?;
    out.extend_from_slice(&bytes);
    if bytes.last() != Some(&b'\n') {
        out.push(b'\n');
    }
    Ok(())
}

fn k_puts(s: &State, a: &CallArgs<'_>) -> R {
    let mut out = Vec::new();
    if a.args.is_empty() {
        out.push(b'\n');
    }
    for v in a.args {
        puts_value(s, v, &mut out, 0)?;
    }
    s.write_out(&out);
    Ok(Value::Nil)
}

fn k_print(s: &State, a: &CallArgs<'_>) -> R {
    let mut out = Vec::new();
    for v in a.args {
        out.extend_from_slice(&s.to_s_value(v)?);
    }
    s.write_out(&out);
    Ok(Value::Nil)
}

fn k_p(s: &State, a: &CallArgs<'_>) -> R {
    let mut out = String::new();
    for v in a.args {
        out.push_str(&s.inspect_value(v)?);
        out.push('\n');
    }
    s.write_out(out.as_bytes());
    Ok(match a.args {
        [] => Value::Nil,
        [one] => one.clone(),
        many => Value::array(many.to_vec()),
    })
}

/// Builds the exception `raise` arguments describe.
pub(crate) fn make_raise(s: &State, args: &[Value]) -> Result<Value, Unwind> {
    let core = s.core();
    match args {
        [] => Ok(s.make_exception(core.runtime_error, messages::UNHANDLED_EXCEPTION)),
        [Value::Str(msg)] => Ok(s.make_exception(core.runtime_error, &msg.to_string_lossy())),
        [e @ Value::Exception(_)] => Ok(e.clone()),
        [e @ Value::Exception(_), msg] => {
            let copy = s.call_method(e, s.intern("dup"), &[], None)?;
            if let Value::Exception(o) = &copy {
                o.ivars.borrow_mut().insert(s.mesg, msg.clone());
            }
            Ok(copy)
        }
        [class @ Value::Class(id), rest @ ..] if s.is_subclass(*id, core.exception) => {
            let e = s.call_method(class, s.intern("new"), &rest[..rest.len().min(1)], None)?;
            match e {
                Value::Exception(_) => Ok(e),
                _ => Err(s.type_error(messages::EXCEPTION_EXPECTED)),
            }
        }
        _ => Err(s.type_error(messages::EXCEPTION_EXPECTED)),
    }
}

fn k_raise(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 3)?;
    let e = make_raise(s, a.args)?;
    Err(Unwind::Raise(e))
}

/// Runs the block until it breaks; `StopIteration` ends the loop quietly.
fn k_loop(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    loop {
        match s.yield_block(blk, &[]) {
            Ok(_) => {}
            Err(Unwind::Raise(e)) if s.is_a(&e, s.core().stop_iteration) => {
                return Ok(Value::Nil);
            }
            Err(e) => return Err(e),
        }
    }
}

fn k_lambda(s: &State, a: &CallArgs<'_>) -> R {
    let Some(Value::Proc(p)) = a.block else {
        return Err(s.arg_error("tried to create Proc object without a block"));
    };
    Ok(Value::Proc(Rc::new(RProc {
        body: p.body.clone(),
        frame: p.frame.clone(),
        lambda: true,
        break_tag: p.break_tag,
    })))
}

fn k_proc(s: &State, a: &CallArgs<'_>) -> R {
    match a.block {
        Some(b) => Ok(b.clone()),
        None => Err(s.arg_error("tried to create Proc object without a block")),
    }
}

/// Parses Ruby integer syntax: optional sign, `0x`/`0b`/`0o` prefixes and `_`.
pub(crate) fn parse_int_strict(text: &str) -> Option<i64> {
    let t = text.trim();
    let (neg, body) = match t.as_bytes().first() {
        Some(b'-') => (true, &t[1..]),
        Some(b'+') => (false, &t[1..]),
        _ => (false, t),
    };
    let lower = body.to_ascii_lowercase();
    let (radix, digits) = if let Some(d) = lower.strip_prefix("0x") {
        (16, d.to_string())
    } else if let Some(d) = lower.strip_prefix("0b") {
        (2, d.to_string())
    } else if let Some(d) = lower.strip_prefix("0o") {
        (8, d.to_string())
    } else {
        (10, lower.clone())
    };
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return None;
    }
    let clean: String = digits.chars().filter(|c| *c != '_').collect();
    let n = i64::from_str_radix(&clean, radix).ok()?;
    Some(if neg { -n } else { n })
}

fn k_integer(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 2)?;
    match &a.args[0] {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(f) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
        Value::Float(f) => Err(s.error(s.core().float_domain_error, crate::format::float_to_s(*f))),
        Value::Str(text) => {
            let t = text.to_string_lossy();
            parse_int_strict(&t).map(Value::Int).ok_or_else(|| {
                s.arg_error(format!(
                    "invalid value for Integer(): {}",
                    crate::format::inspect_bytes(t.as_bytes())
                ))
            })
        }
        Value::Nil => Err(s.type_error("can't convert nil into Integer")),
        other => s.call_method(other, s.intern("to_i"), &[], None),
    }
}

fn k_float(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    match &a.args[0] {
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Str(text) => {
            let t = text.to_string_lossy();
            let clean: String = t.trim().chars().filter(|c| *c != '_').collect();
            clean.parse::<f64>().ok().filter(|_| !clean.is_empty()).map(Value::Float).ok_or_else(|| {
                s.arg_error(format!(
                    "invalid value for Float(): {}",
                    crate::format::inspect_bytes(t.as_bytes())
                ))
            })
        }
        Value::Nil => Err(s.type_error("can't convert nil into Float")),
        other => s.call_method(other, s.intern("to_f"), &[], None),
    }
}

fn k_string(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    Ok(Value::str(s.to_s_value(&a.args[0])?))
}

fn k_array(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    Ok(match &a.args[0] {
        Value::Nil => Value::array(Vec::new()),
        v @ Value::Array(_) => v.clone(),
        other => Value::array(s.splat_items(other.clone())?),
    })
}

fn k_format(s: &State, a: &CallArgs<'_>) -> R {
    let Some((fmt, rest)) = a.args.split_first() else {
        return Err(s.arg_error("too few arguments"));
    };
    let fmt = s.str_arg(fmt)?;
    Ok(Value::str(super::sprintf(s, &fmt, rest)?))
}

fn k_printf(s: &State, a: &CallArgs<'_>) -> R {
    if a.args.is_empty() {
        return Ok(Value::Nil);
    }
    let out = k_format(s, a)?;
    if let Value::Str(bytes) = out {
        s.write_out(&bytes.to_vec());
    }
    Ok(Value::Nil)
}

fn k_caller(_s: &State, _a: &CallArgs<'_>) -> R {
    Ok(Value::array(Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::parse_int_strict;

    #[test]
    fn integer_syntax() {
        assert_eq!(parse_int_strict("42"), Some(42));
        assert_eq!(parse_int_strict(" -0x1f "), Some(-31));
        assert_eq!(parse_int_strict("1_000"), Some(1000));
        assert_eq!(parse_int_strict("0b101"), Some(5));
        assert_eq!(parse_int_strict("12abc"), None);
        assert_eq!(parse_int_strict("_1"), None);
        assert_eq!(parse_int_strict(""), None);
    }
}
