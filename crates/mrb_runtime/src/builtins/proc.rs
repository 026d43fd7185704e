//! Proc.

use crate::core::class::block_arity;
use crate::core::{BuiltinFn, CallArgs, ProcBody, Value};
use crate::errors::{Unwind, messages};
use crate::state::State;

type R = Result<Value, Unwind>;

pub(super) fn install(s: &State) {
    let proc_class = s.core().proc_class;
    s.define_class_builtin(proc_class, "new", proc_s_new);
    for (name, f) in [
        ("call", proc_call as BuiltinFn),
        ("()", proc_call),
        ("[]", proc_call),
        ("yield", proc_call),
        ("===", proc_call),
        ("to_proc", proc_to_proc),
        ("lambda?", proc_lambda_p),
        ("arity", proc_arity),
        ("parameters", proc_parameters),
        ("inspect", proc_inspect),
        ("to_s", proc_inspect),
    ] {
        s.define_builtin(proc_class, name, f);
    }
}

fn proc_s_new(s: &State, a: &CallArgs<'_>) -> R {
    match a.block {
        Some(b @ Value::Proc(_)) => Ok(b.clone()),
        _ => Err(s.arg_error("tried to create Proc object without a block")),
    }
}

fn proc_call(s: &State, a: &CallArgs<'_>) -> R {
    let Value::Proc(p) = &a.recv else {
        return Err(s.type_error(messages::NOT_A_PROC));
    };
    s.call_proc(p, a.args, a.block, None)
}

fn proc_to_proc(_: &State, a: &CallArgs<'_>) -> R {
    Ok(a.recv.clone())
}

fn proc_lambda_p(_: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(matches!(&a.recv, Value::Proc(p) if p.is_lambda())))
}

fn arity_of(v: &Value) -> i64 {
    let Value::Proc(p) = v else {
        return -1;
    };
    match &p.body {
        ProcBody::Block(def) => block_arity(def),
        ProcBody::Symbol(_) => -2,
        ProcBody::Top(_) => 0,
        ProcBody::Method(..) | ProcBody::Collect(_) => -1,
    }
}

fn proc_arity(_: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Int(arity_of(&a.recv)))
}

/// `[[:req, :x], [:opt, :y], [:rest, :z], [:block, :b]]`; plain procs
/// report required parameters as `:opt`.
fn proc_parameters(s: &State, a: &CallArgs<'_>) -> R {
    let Value::Proc(p) = &a.recv else {
        return Ok(Value::array(Vec::new()));
    };
    let ProcBody::Block(def) = &p.body else {
        return Ok(Value::array(Vec::new()));
    };
    let pair = |kind: &str, name: &str| {
        Value::array(vec![Value::Sym(s.intern(kind)), Value::Sym(s.intern(name))])
    };
    let req_kind = if p.lambda { "req" } else { "opt" };
    let params = &def.params;
    let mut out: Vec<Value> = params.required.iter().map(|n| pair(req_kind, n)).collect();
    out.extend(params.optional.iter().map(|(n, _)| pair("opt", n)));
    out.extend(params.rest.iter().map(|n| pair("rest", n)));
    out.extend(params.post.iter().map(|n| pair(req_kind, n)));
    out.extend(params.block.iter().map(|n| pair("block", n)));
    Ok(Value::array(out))
}

fn proc_inspect(_: &State, a: &CallArgs<'_>) -> R {
    let lambda = matches!(&a.recv, Value::Proc(p) if p.is_lambda());
    let id = a.recv.ptr().unwrap_or(0);
    Ok(Value::str(if lambda {
        format!("#<Proc:0x{id:x} (lambda)>")
    } else {
        format!("#<Proc:0x{id:x}>")
    }))
}
