//! Module and Class.

use std::rc::Rc;

use crate::core::{BuiltinFn, CallArgs, ClassId, ClassKind, Method, ProcBody, RObject, RProc, Value};
use crate::errors::Unwind;
use crate::state::State;

type R = Result<Value, Unwind>;

pub(super) fn install(s: &State) {
    let module = s.core().module;
    for (name, f) in [
        ("name", mod_name as BuiltinFn),
        ("to_s", mod_to_s),
        ("inspect", mod_to_s),
        ("===", mod_eqq),
        ("==", mod_eq),
        ("<", mod_lt),
        ("<=", mod_le),
        ("ancestors", mod_ancestors),
        ("include", mod_include),
        ("include?", mod_include_p),
        ("attr_accessor", mod_attr_accessor),
        ("attr_reader", mod_attr_reader),
        ("attr", mod_attr_reader),
        ("attr_writer", mod_attr_writer),
        ("define_method", mod_define_method),
        ("alias_method", mod_alias_method),
        ("method_defined?", mod_method_defined),
        ("public_method_defined?", mod_method_defined),
        ("instance_methods", mod_instance_methods),
        ("const_get", mod_const_get),
        ("const_set", mod_const_set),
        ("const_defined?", mod_const_defined),
        ("constants", mod_constants),
        ("private", mod_visibility),
        ("public", mod_visibility),
        ("protected", mod_visibility),
        ("module_function", mod_visibility),
        ("private_constant", mod_visibility),
        ("private_class_method", mod_visibility),
    ] {
        s.define_builtin(module, name, f);
    }

    let class = s.core().class;
    s.define_builtin(class, "new", class_new);
    s.define_builtin(class, "allocate", class_allocate);
    s.define_builtin(class, "superclass", class_superclass);
    s.define_class_builtin(class, "new", class_class_new);
}

fn self_class(s: &State, a: &CallArgs<'_>) -> Result<ClassId, Unwind> {
    match &a.recv {
        Value::Class(id) | Value::Module(id) => Ok(*id),
        other => Err(s.type_error(format!("{} is not a class/module", s.inspect(other)))),
    }
}

fn class_value(s: &State, id: ClassId) -> Value {
    match s.class_kind(id) {
        ClassKind::Module => Value::Module(id),
        _ => Value::Class(id),
    }
}

fn mod_name(s: &State, a: &CallArgs<'_>) -> R {
    let id = self_class(s, a)?;
    Ok(match s.with_class(id, |c| c.name.clone()) {
        Some(n) => Value::str(n),
        None => Value::Nil,
    })
}

fn mod_to_s(s: &State, a: &CallArgs<'_>) -> R {
    let id = self_class(s, a)?;
    Ok(Value::str(s.class_name(id)))
}

fn mod_eqq(s: &State, a: &CallArgs<'_>) -> R {
    let id = self_class(s, a)?;
    Ok(Value::Bool(s.is_a(&a.arg(0), id)))
}

fn mod_eq(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(a.recv.identical(&a.arg(0))))
}

fn other_class(s: &State, v: &Value) -> Result<ClassId, Unwind> {
    match v {
        Value::Class(id) | Value::Module(id) => Ok(*id),
        _ => Err(s.type_error("compared with non class/module")),
    }
}

fn mod_lt(s: &State, a: &CallArgs<'_>) -> R {
    let id = self_class(s, a)?;
    let other = other_class(s, &a.arg(0))?;
    Ok(if id == other {
        Value::Bool(false)
    } else if s.is_subclass(id, other) {
        Value::Bool(true)
    } else if s.is_subclass(other, id) {
        Value::Bool(false)
    } else {
        Value::Nil
    })
}

fn mod_le(s: &State, a: &CallArgs<'_>) -> R {
    let id = self_class(s, a)?;
    let other = other_class(s, &a.arg(0))?;
    if id == other {
        return Ok(Value::Bool(true));
    }
    mod_lt(s, a)
}

fn mod_ancestors(s: &State, a: &CallArgs<'_>) -> R {
    let id = self_class(s, a)?;
    Ok(Value::array(
        s.ancestors(id).into_iter().map(|c| class_value(s, c)).collect(),
    ))
}

fn mod_include(s: &State, a: &CallArgs<'_>) -> R {
    let id = self_class(s, a)?;
    for m in a.args {
        match m {
            Value::Module(mid) => s.include_module(id, *mid),
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

fn mod_include_p(s: &State, a: &CallArgs<'_>) -> R {
    let id = self_class(s, a)?;
    let Value::Module(m) = a.arg(0) else {
        return Ok(Value::Bool(false));
    };
    Ok(Value::Bool(id != m && s.is_subclass(id, m)))
}

fn define_attrs(s: &State, a: &CallArgs<'_>, reader: bool, writer: bool) -> R {
    let id = self_class(s, a)?;
    let mut defined = Vec::new();
    for arg in a.args {
        let name = s.name_arg(arg)?;
        let ivar = s.intern(&format!("@{name}"));
        if reader {
            let mid = s.intern(&name);
            s.add_method(id, mid, Method::AttrReader(ivar));
            defined.push(Value::Sym(mid));
        }
        if writer {
            let mid = s.intern(&format!("{name}="));
            s.add_method(id, mid, Method::AttrWriter(ivar));
            defined.push(Value::Sym(mid));
        }
    }
    Ok(Value::array(defined))
}

fn mod_attr_accessor(s: &State, a: &CallArgs<'_>) -> R {
    define_attrs(s, a, true, true)
}

fn mod_attr_reader(s: &State, a: &CallArgs<'_>) -> R {
    define_attrs(s, a, true, false)
}

fn mod_attr_writer(s: &State, a: &CallArgs<'_>) -> R {
    define_attrs(s, a, false, true)
}

fn mod_define_method(s: &State, a: &CallArgs<'_>) -> R {
    let id = self_class(s, a)?;
    s.check_args(a, 1, 2)?;
    let name = s.name_arg(&a.args[0])?;
    let body = match (a.args.get(1), a.block) {
        (Some(Value::Proc(p)), _) | (None, Some(Value::Proc(p))) => p.clone(),
        _ => return Err(s.arg_error("tried to create Proc object without a block")),
    };
    let mid = s.intern(&name);
    if matches!(body.body, ProcBody::Top(_) | ProcBody::Collect(_)) {
        return Err(s.arg_error("unsupported method body"));
    }
    let lambda = RProc {
        body: body.body.clone(),
        frame: body.frame.clone(),
        lambda: true,
        break_tag: s.fresh_tag(),
    };
    s.add_method(id, mid, Method::Block(Rc::new(lambda)));
    Ok(Value::Sym(mid))
}

fn mod_alias_method(s: &State, a: &CallArgs<'_>) -> R {
    let id = self_class(s, a)?;
    s.check_args(a, 2, 2)?;
    let new = s.intern(&s.name_arg(&a.args[0])?);
    let old_name = s.name_arg(&a.args[1])?;
    let Some((_, m)) = s.find_method(id, s.intern(&old_name)) else {
        return Err(s.error(
            s.core().name_error,
            format!("undefined method '{old_name}' for class '{}'", s.class_name(id)),
        ));
    };
    s.add_method(id, new, m);
    Ok(Value::Sym(new))
}

fn mod_method_defined(s: &State, a: &CallArgs<'_>) -> R {
    let id = self_class(s, a)?;
    s.check_args(a, 1, 2)?;
    let mid = s.intern(&s.name_arg(&a.args[0])?);
    Ok(Value::Bool(s.find_method(id, mid).is_some()))
}

fn mod_instance_methods(s: &State, a: &CallArgs<'_>) -> R {
    let id = self_class(s, a)?;
    let inherit = a.args.first().is_none_or(Value::truthy);
    let classes = if inherit {
        s.ancestors(id)
            .into_iter()
            .filter(|c| *c != s.core().object && *c != s.core().kernel)
            .collect()
    } else {
        vec![id]
    };
    let mut names = Vec::new();
    for c in classes {
        let mut own: Vec<_> = s.with_class(c, |k| k.methods.keys().copied().collect());
        own.sort();
        for m in own {
            if !names.contains(&m) {
                names.push(m);
            }
        }
    }
    Ok(Value::array(names.into_iter().map(Value::Sym).collect()))
}

fn const_name(s: &State, v: &Value) -> Result<crate::core::Sym, Unwind> {
    let name = s.name_arg(v)?;
    if !name.starts_with(|c: char| c.is_ascii_uppercase()) {
        return Err(s.error(
            s.core().name_error,
            format!("wrong constant name {name}"),
        ));
    }
    Ok(s.intern(&name))
}

fn mod_const_get(s: &State, a: &CallArgs<'_>) -> R {
    let id = self_class(s, a)?;
    s.check_args(a, 1, 2)?;
    let name = const_name(s, &a.args[0])?;
    s.ancestors(id)
        .into_iter()
        .chain(std::iter::once(s.core().object))
        .find_map(|c| s.const_get_own(c, name))
        .ok_or_else(|| s.uninitialized_constant(&s.sym_name(name)))
}

fn mod_const_set(s: &State, a: &CallArgs<'_>) -> R {
    let id = self_class(s, a)?;
    s.check_args(a, 2, 2)?;
    let name = const_name(s, &a.args[0])?;
    s.const_set(id, name, a.args[1].clone());
    Ok(a.args[1].clone())
}

fn mod_const_defined(s: &State, a: &CallArgs<'_>) -> R {
    let id = self_class(s, a)?;
    s.check_args(a, 1, 2)?;
    let name = const_name(s, &a.args[0])?;
    Ok(Value::Bool(
        s.ancestors(id)
            .into_iter()
            .chain(std::iter::once(s.core().object))
            .any(|c| s.const_get_own(c, name).is_some()),
    ))
}

fn mod_constants(s: &State, a: &CallArgs<'_>) -> R {
    let id = self_class(s, a)?;
    let names: Vec<_> = s.with_class(id, |c| c.consts.keys().copied().collect());
    Ok(Value::array(names.into_iter().map(Value::Sym).collect()))
}

/// Visibility is not enforced; these only return their argument.
fn mod_visibility(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(match a.args {
        [] => Value::Nil,
        [one] => one.clone(),
        many => Value::array(many.to_vec()),
    })
}

/// `Class#new`: allocate, then `initialize` with the same arguments and block.
fn class_new(s: &State, a: &CallArgs<'_>) -> R {
    let obj = class_allocate(s, a)?;
    s.call_method(&obj, s.intern("initialize"), a.args, a.block)?;
    Ok(obj)
}

fn class_allocate(s: &State, a: &CallArgs<'_>) -> R {
    let id = self_class(s, a)?;
    if s.class_kind(id) != ClassKind::Class {
        return Err(s.type_error(format!("can't create instance of {}", s.class_name(id))));
    }
    let builtin = [
        s.core().integer,
        s.core().float,
        s.core().symbol,
        s.core().nil,
        s.core().true_class,
        s.core().false_class,
    ];
    if builtin.iter().any(|b| s.is_subclass(id, *b)) {
        return Err(s.error(
            s.core().no_method_error,
            format!("undefined method 'new' for class {}", s.class_name(id)),
        ));
    }
    let obj = Rc::new(RObject::new(id));
    Ok(if s.is_subclass(id, s.core().exception) {
        Value::Exception(obj)
    } else {
        Value::Object(obj)
    })
}

fn class_superclass(s: &State, a: &CallArgs<'_>) -> R {
    let id = self_class(s, a)?;
    let mut sup = s.superclass(id);
    while let Some(c) = sup {
        if s.class_kind(c) != ClassKind::Singleton {
            break;
        }
        sup = s.superclass(c);
    }
    Ok(sup.map_or(Value::Nil, Value::Class))
}

/// `Class.new(superclass = Object) { body }`
fn class_class_new(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 1)?;
    let sup = match a.args.first() {
        Some(Value::Class(id)) => *id,
        Some(_) => return Err(s.type_error("superclass must be a Class")),
        None => s.core().object,
    };
    let id = s.new_class(None, ClassKind::Class, Some(sup));
    let class = Value::Class(id);
    if let Some(Value::Proc(p)) = a.block {
        s.call_proc(p, std::slice::from_ref(&class), None, Some(&class))?;
    }
    Ok(class)
}
