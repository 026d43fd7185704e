//! Exception and its subclasses.

use std::rc::Rc;

use crate::core::{BuiltinFn, CallArgs, RObject, Value};
use crate::errors::Unwind;
use crate::state::State;

type R = Result<Value, Unwind>;

pub(super) fn install(s: &State) {
    let exception = s.core().exception;
    s.define_class_builtin(exception, "exception", exc_s_exception);
    for (name, f) in [
        ("initialize", exc_initialize as BuiltinFn),
        ("exception", exc_exception),
        ("message", exc_message),
        ("to_s", exc_to_s),
        ("inspect", exc_inspect),
        ("full_message", exc_full_message),
        ("backtrace", exc_backtrace),
        ("set_backtrace", exc_set_backtrace),
        ("==", exc_eq),
    ] {
        s.define_builtin(exception, name, f);
    }
}

fn payload<'v>(s: &State, v: &'v Value) -> Result<&'v Rc<RObject>, Unwind> {
    match v {
        Value::Exception(o) => Ok(o),
        other => Err(s.type_error(format!("{} is not an exception", s.inspect(other)))),
    }
}

fn set_message(s: &State, o: &RObject, msg: Value) {
    o.ivars.borrow_mut().insert(s.mesg, msg);
}

/// `Exception.exception(*args)` is `new`.
fn exc_s_exception(s: &State, a: &CallArgs<'_>) -> R {
    s.call_method(&a.recv, s.intern("new"), a.args, a.block)
}

fn exc_initialize(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 1)?;
    let o = payload(s, &a.recv)?;
    set_message(s, o, a.arg(0));
    Ok(Value::Nil)
}

/// Without an argument the receiver itself; otherwise a copy with the new message.
fn exc_exception(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 1)?;
    let Some(msg) = a.args.first() else {
        return Ok(a.recv.clone());
    };
    let o = payload(s, &a.recv)?;
    let copy = RObject::new(o.class());
    *copy.ivars.borrow_mut() = o.ivars.borrow().clone();
    set_message(s, &copy, msg.clone());
    Ok(Value::Exception(Rc::new(copy)))
}

fn exc_message(s: &State, a: &CallArgs<'_>) -> R {
    s.call_method(&a.recv, s.intern("to_s"), &[], None)
}

fn exc_to_s(s: &State, a: &CallArgs<'_>) -> R {
    let o = payload(s, &a.recv)?;
    let mesg = o.ivars.borrow().get(&s.mesg).cloned();
    match mesg {
        Some(v @ Value::Str(_)) => Ok(v),
        None | Some(Value::Nil) => Ok(Value::str(s.obj_classname(&a.recv))),
        Some(other) => Ok(Value::str(s.to_s_value(&other)?)),
    }
}

fn message_text(s: &State, v: &Value) -> Result<String, Unwind> {
    let msg = s.call_method(v, s.intern("message"), &[], None)?;
    Ok(String::from_utf8_lossy(&s.to_s_value(&msg)?).into_owned())
}

/// `#<RuntimeError: msg>`, or the bare class name when the message is empty.
fn exc_inspect(s: &State, a: &CallArgs<'_>) -> R {
    let class = s.obj_classname(&a.recv);
    let msg = message_text(s, &a.recv)?;
    Ok(Value::str(if msg.is_empty() {
        class
    } else {
        format!("#<{class}: {msg}>")
    }))
}

fn exc_full_message(s: &State, a: &CallArgs<'_>) -> R {
    let class = s.obj_classname(&a.recv);
    let msg = message_text(s, &a.recv)?;
    Ok(Value::str(format!("{}: {msg} ({class})", s.current_file())))
}

fn exc_backtrace(s: &State, a: &CallArgs<'_>) -> R {
    let o = payload(s, &a.recv)?;
    let bt = o.ivars.borrow().get(&s.intern("__bt__")).cloned();
    Ok(bt.unwrap_or(Value::Nil))
}

fn exc_set_backtrace(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let o = payload(s, &a.recv)?;
    o.ivars.borrow_mut().insert(s.intern("__bt__"), a.args[0].clone());
    Ok(a.args[0].clone())
}

/// Same class and same message.
fn exc_eq(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let other = &a.args[0];
    if a.recv.identical(other) {
        return Ok(Value::Bool(true));
    }
    if !matches!(other, Value::Exception(_)) || s.class_of(&a.recv) != s.class_of(other) {
        return Ok(Value::Bool(false));
    }
    Ok(Value::Bool(message_text(s, &a.recv)? == message_text(s, other)?))
}
