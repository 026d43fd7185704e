//! Object, NilClass, TrueClass and FalseClass.

use std::rc::Rc;

use crate::core::{BuiltinFn, CallArgs, ProcBody, RArray, RHash, RObject, RProc, RString, Value};
use crate::errors::Unwind;
use crate::state::State;

type R = Result<Value, Unwind>;

pub(super) fn install(s: &State) {
    let object = s.core().object;
    for (name, f) in [
        ("==", obj_eq as BuiltinFn),
        ("equal?", obj_eq),
        ("eql?", obj_eql),
        ("!=", obj_ne),
        ("!", obj_not),
        ("===", obj_eqq),
        ("=~", obj_match),
        ("<=>", obj_cmp),
        ("class", obj_class),
        ("singleton_class", obj_singleton_class),
        ("to_s", obj_to_s),
        ("inspect", obj_inspect),
        ("nil?", obj_nil_p),
        ("is_a?", obj_is_a),
        ("kind_of?", obj_is_a),
        ("instance_of?", obj_instance_of),
        ("respond_to?", obj_respond_to),
        ("send", obj_send),
        ("__send__", obj_send),
        ("public_send", obj_send),
        ("method", obj_method),
        ("object_id", obj_object_id),
        ("__id__", obj_object_id),
        ("hash", obj_hash),
        ("instance_variable_get", obj_ivar_get),
        ("instance_variable_set", obj_ivar_set),
        ("instance_variable_defined?", obj_ivar_defined),
        ("instance_variables", obj_ivars),
        ("dup", obj_dup),
        ("clone", obj_dup),
        ("freeze", obj_itself),
        ("frozen?", obj_frozen),
        ("itself", obj_itself),
        ("tap", obj_tap),
        ("then", obj_then),
        ("yield_self", obj_then),
        ("extend", obj_extend),
        ("initialize", obj_initialize),
    ] {
        s.define_builtin(object, name, f);
    }

    let nil = s.core().nil;
    s.define_builtin(nil, "to_s", nil_to_s);
    s.define_builtin(nil, "to_a", nil_to_a);
    s.define_builtin(nil, "to_h", nil_to_h);
    s.define_builtin(nil, "to_i", nil_to_i);
    s.define_builtin(nil, "to_f", nil_to_f);
    s.define_builtin(nil, "inspect", nil_inspect);
    s.define_builtin(nil, "nil?", nil_nil_p);
    s.define_builtin(nil, "&", bool_and);
    s.define_builtin(nil, "|", bool_or);

    for class in [s.core().true_class, s.core().false_class] {
        s.define_builtin(class, "to_s", bool_to_s);
        s.define_builtin(class, "inspect", bool_to_s);
        s.define_builtin(class, "&", bool_and);
        s.define_builtin(class, "|", bool_or);
        s.define_builtin(class, "^", bool_xor);
    }
}

fn obj_eq(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(a.recv.identical(&a.arg(0))))
}

fn obj_eql(s: &State, a: &CallArgs<'_>) -> R {
    let other = a.arg(0);
    Ok(Value::Bool(match (&a.recv, &other) {
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => false,
        (Value::Object(_), _) => a.recv.identical(&other),
        _ => s.values_eq(&a.recv, &other)?,
    }))
}

fn obj_ne(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(!s.values_eq(&a.recv, &a.arg(0))?))
}

fn obj_not(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(!a.recv.truthy()))
}

fn obj_eqq(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(s.values_eq(&a.recv, &a.arg(0))?))
}

fn obj_match(_s: &State, _a: &CallArgs<'_>) -> R {
    Ok(Value::Nil)
}

fn obj_cmp(s: &State, a: &CallArgs<'_>) -> R {
    Ok(if s.values_eq(&a.recv, &a.arg(0))? {
        Value::Int(0)
    } else {
        Value::Nil
    })
}

fn obj_class(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Class(s.real_class_of(&a.recv)))
}

fn obj_singleton_class(s: &State, a: &CallArgs<'_>) -> R {
    match s.singleton_class(&a.recv) {
        Some(id) => Ok(Value::Class(id)),
        None => Err(s.type_error("can't define singleton")),
    }
}

fn obj_to_s(s: &State, a: &CallArgs<'_>) -> R {
    if a.recv.identical(s.main()) {
        return Ok(Value::str("main"));
    }
    Ok(Value::str(s.default_to_s(&a.recv)))
}

fn obj_inspect(s: &State, a: &CallArgs<'_>) -> R {
    let Value::Object(o) = &a.recv else {
        return obj_to_s(s, a);
    };
    if a.recv.identical(s.main()) {
        return Ok(Value::str("main"));
    }
    let ivars: Vec<_> = o
        .ivars
        .borrow()
        .iter()
        .map(|(k, v)| (*k, v.clone()))
        .collect();
    let mut out = format!("#<{}", s.obj_classname(&a.recv));
    for (i, (k, v)) in ivars.iter().enumerate() {
        out.push_str(if i == 0 { " " } else { ", " });
        out.push_str(&s.sym_name(*k));
        out.push('=');
        out.push_str(&s.inspect_value(v)?);
    }
    out.push('>');
    Ok(Value::str(out))
}

fn obj_nil_p(_s: &State, _a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(false))
}

fn class_arg(s: &State, v: &Value) -> Result<crate::core::ClassId, Unwind> {
    match v {
        Value::Class(id) | Value::Module(id) => Ok(*id),
        _ => Err(s.type_error("class or module required")),
    }
}

fn obj_is_a(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let c = class_arg(s, &a.args[0])?;
    Ok(Value::Bool(s.is_a(&a.recv, c)))
}

fn obj_instance_of(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let c = class_arg(s, &a.args[0])?;
    Ok(Value::Bool(s.real_class_of(&a.recv) == c))
}

fn obj_respond_to(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 2)?;
    let name = s.name_arg(&a.args[0])?;
    let class = s.class_of(&a.recv);
    Ok(Value::Bool(s.find_method(class, s.intern(&name)).is_some()))
}

fn obj_send(s: &State, a: &CallArgs<'_>) -> R {
    let Some((name, rest)) = a.args.split_first() else {
        return Err(s.arg_error("no method name given"));
    };
    let mid = s.intern(&s.name_arg(name)?);
    s.call_method(&a.recv, mid, rest, a.block)
}

fn obj_method(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let name = s.name_arg(&a.args[0])?;
    let mid = s.intern(&name);
    if s.find_method(s.class_of(&a.recv), mid).is_none() {
        return Err(s.error(
            s.core().name_error,
            format!("undefined method '{name}' for {}", s.describe_receiver(&a.recv)),
        ));
    }
    Ok(Value::Proc(Rc::new(RProc {
        body: ProcBody::Method(a.recv.clone(), mid),
        frame: None,
        lambda: true,
        break_tag: 0,
    })))
}

fn obj_object_id(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Int(match &a.recv {
        Value::Nil => 8,
        Value::Bool(true) => 20,
        Value::Bool(false) => 0,
        Value::Int(i) => i.wrapping_mul(2).wrapping_add(1),
        Value::Class(id) | Value::Module(id) => 16 * (id.index() as i64 + 1),
        other => other.ptr().map_or_else(|| s.hash_of(other), |p| (p >> 3) as i64),
    }))
}

fn obj_hash(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Int(s.hash_of(&a.recv)))
}

fn ivar_name(s: &State, v: &Value) -> Result<crate::core::Sym, Unwind> {
    let name = s.name_arg(v)?;
    if !name.starts_with('@') {
        return Err(s.error(
            s.core().name_error,
            format!("'{name}' is not allowed as an instance variable name"),
        ));
    }
    Ok(s.intern(&name))
}

fn obj_ivar_get(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    Ok(s.ivar_get(&a.recv, ivar_name(s, &a.args[0])?))
}

fn obj_ivar_set(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 2, 2)?;
    let name = ivar_name(s, &a.args[0])?;
    s.ivar_set(&a.recv, name, a.args[1].clone())?;
    Ok(a.args[1].clone())
}

fn obj_ivar_defined(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let name = ivar_name(s, &a.args[0])?;
    Ok(Value::Bool(match &a.recv {
        Value::Object(o) | Value::Exception(o) => o.ivars.borrow().contains_key(&name),
        Value::Class(id) | Value::Module(id) => s.with_class(*id, |c| c.ivars.contains_key(&name)),
        _ => false,
    }))
}

fn obj_ivars(s: &State, a: &CallArgs<'_>) -> R {
    let names: Vec<_> = match &a.recv {
        Value::Object(o) | Value::Exception(o) => o.ivars.borrow().keys().copied().collect(),
        Value::Class(id) | Value::Module(id) => s.with_class(*id, |c| c.ivars.keys().copied().collect()),
        _ => Vec::new(),
    };
    Ok(Value::array(
        names
            .into_iter()
            .filter(|n| s.sym_name(*n).starts_with('@'))
            .map(Value::Sym)
            .collect(),
    ))
}

fn obj_dup(s: &State, a: &CallArgs<'_>) -> R {
    Ok(match &a.recv {
        Value::Str(x) => Value::Str(Rc::new(RString::new(x.to_vec()))),
        Value::Array(x) => Value::Array(Rc::new(RArray::new(x.to_vec()))),
        Value::Hash(h) => {
            let copy = RHash::default();
            for (k, v) in h.entries() {
                copy.insert(k, v);
            }
            *copy.default.borrow_mut() = h.default.borrow().clone();
            *copy.default_proc.borrow_mut() = h.default_proc.borrow().clone();
            Value::Hash(Rc::new(copy))
        }
        Value::Object(o) => {
            let copy = RObject::new(s.real_class_of(&a.recv));
            *copy.ivars.borrow_mut() = o.ivars.borrow().clone();
            Value::Object(Rc::new(copy))
        }
        Value::Exception(o) => {
            let copy = RObject::new(s.real_class_of(&a.recv));
            *copy.ivars.borrow_mut() = o.ivars.borrow().clone();
            Value::Exception(Rc::new(copy))
        }
        other => other.clone(),
    })
}

fn obj_frozen(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(matches!(
        a.recv,
        Value::Nil | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Sym(_)
    )))
}

fn obj_itself(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(a.recv.clone())
}

fn obj_tap(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    s.yield_block(blk, std::slice::from_ref(&a.recv))?;
    Ok(a.recv.clone())
}

fn obj_then(s: &State, a: &CallArgs<'_>) -> R {
    let blk = s.need_block(a)?;
    s.yield_block(blk, std::slice::from_ref(&a.recv))
}

fn obj_extend(s: &State, a: &CallArgs<'_>) -> R {
    let Some(meta) = s.singleton_class(&a.recv) else {
        return Err(s.type_error("can't define singleton"));
    };
    for m in a.args {
        match m {
            Value::Module(id) => s.include_module(meta, *id),
            other => {
                return Err(s.type_error(format!(
                    "wrong argument type {} (expected Module)",
                    s.obj_classname(other)
                )));
            }
        }
    }
    Ok(a.recv.clone())
}

fn obj_initialize(_s: &State, _a: &CallArgs<'_>) -> R {
    Ok(Value::Nil)
}

fn nil_to_s(_s: &State, _a: &CallArgs<'_>) -> R {
    Ok(Value::str(""))
}

fn nil_to_a(_s: &State, _a: &CallArgs<'_>) -> R {
    Ok(Value::array(Vec::new()))
}

fn nil_to_h(_s: &State, _a: &CallArgs<'_>) -> R {
    Ok(Value::Hash(Rc::new(RHash::default())))
}

fn nil_to_i(_s: &State, _a: &CallArgs<'_>) -> R {
    Ok(Value::Int(0))
}

fn nil_to_f(_s: &State, _a: &CallArgs<'_>) -> R {
    Ok(Value::Float(0.0))
}

fn nil_inspect(_s: &State, _a: &CallArgs<'_>) -> R {
    Ok(Value::str("nil"))
}

fn nil_nil_p(_s: &State, _a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(true))
}

fn bool_to_s(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::str(if a.recv.truthy() { "true" } else { "false" }))
}

fn bool_and(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(a.recv.truthy() && a.arg(0).truthy()))
}

fn bool_or(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(a.recv.truthy() || a.arg(0).truthy()))
}

fn bool_xor(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(a.recv.truthy() != a.arg(0).truthy()))
}
