use mrb_ir::{AssignExpr, AssignOp, ConstRef, MultiAssignExpr, OpAssignExpr, Target};

use crate::core::{ClassId, Frame, Sym, Value};
use crate::errors::Unwind;
use crate::state::State;

/// An assignable location with its receiver and arguments already evaluated.
enum Place<'t> {
    LVar(&'t str),
    IVar(Sym),
    GVar(Sym),
    Const(ClassId, Sym),
    Index(Value, Vec<Value>),
    Attr(Value, Sym, Sym),
}

impl State {
    pub(crate) fn ivar_get(&self, obj: &Value, name: Sym) -> Value {
        match obj {
            Value::Object(o) | Value::Exception(o) => {
                o.ivars.borrow().get(&name).cloned().unwrap_or(Value::Nil)
            }
            Value::Class(id) | Value::Module(id) => self
                .with_class(*id, |c| c.ivars.get(&name).cloned())
                .unwrap_or(Value::Nil),
            _ => Value::Nil,
        }
    }

    pub(crate) fn ivar_set(&self, obj: &Value, name: Sym, v: Value) -> Result<(), Unwind> {
        match obj {
            Value::Object(o) | Value::Exception(o) => {
                o.ivars.borrow_mut().insert(name, v);
                Ok(())
            }
            Value::Class(id) | Value::Module(id) => {
                self.with_class_mut(*id, |c| c.ivars.insert(name, v));
                Ok(())
            }
            other => Err(self.error(
                self.core().frozen_error,
                format!("can't modify frozen {}", self.obj_classname(other)),
            )),
        }
    }

    pub(super) fn eval_const(&self, c: &ConstRef, f: &Frame) -> Result<Value, Unwind> {
        let name = self.intern(&c.name);
        if c.top_level {
            return self
                .const_get_own(self.core().object, name)
                .ok_or_else(|| self.uninitialized_constant(&c.name));
        }
        match &c.scope {
            None => self.const_lookup(name, f),
            Some(scope) => {
                let outer = match self.eval(scope, f)? {
                    Value::Class(id) | Value::Module(id) => id,
                    other => {
                        return Err(self.type_error(format!(
                            "{} is not a class/module",
                            self.inspect(&other)
                        )));
                    }
                };
                self.const_in_ancestors(outer, name).ok_or_else(|| {
                    self.uninitialized_constant(&format!("{}::{}", self.class_name(outer), c.name))
                })
            }
        }
    }

    /// Lexical scopes first, then the ancestors of the innermost scope, then Object.
    fn const_lookup(&self, name: Sym, f: &Frame) -> Result<Value, Unwind> {
        let mut cref = Some(&f.cref);
        while let Some(cr) = cref {
            if cr.parent.is_none() {
                break;
            }
            if let Some(v) = self.const_get_own(cr.class, name) {
                return Ok(v);
            }
            cref = cr.parent.as_ref();
        }
        if let Some(v) = self.const_in_ancestors(f.cref.class, name) {
            return Ok(v);
        }
        self.const_get_own(self.core().object, name)
            .ok_or_else(|| self.uninitialized_constant(&self.sym_name(name)))
    }

    fn const_in_ancestors(&self, class: ClassId, name: Sym) -> Option<Value> {
        self.ancestors(class)
            .into_iter()
            .find_map(|c| self.const_get_own(c, name))
    }

    pub(crate) fn uninitialized_constant(&self, path: &str) -> Unwind {
        self.error(
            self.core().name_error,
            format!("uninitialized constant {path}"),
        )
    }

    fn resolve_place<'t>(&self, t: &'t Target, f: &Frame) -> Result<Place<'t>, Unwind> {
        Ok(match t {
            Target::LVar(name) => Place::LVar(name),
            Target::IVar(name) => Place::IVar(self.intern(name)),
            Target::GVar(name) => Place::GVar(self.intern(name)),
            Target::Const(c) => {
                let outer = if c.top_level {
                    self.core().object
                } else {
                    match &c.scope {
                        None => f.cref.class,
                        Some(scope) => match self.eval(scope, f)? {
                            Value::Class(id) | Value::Module(id) => id,
                            other => {
                                return Err(self.type_error(format!(
                                    "{} is not a class/module",
                                    self.inspect(&other)
                                )));
                            }
                        },
                    }
                };
                Place::Const(outer, self.intern(&c.name))
            }
            Target::Index { recv, args } => {
                let r = self.eval(recv, f)?;
                let a = self.eval_list(args, f)?;
                Place::Index(r, a)
            }
            Target::Attr { recv, name } => {
                let r = self.eval(recv, f)?;
                Place::Attr(r, self.intern(name), self.intern(&format!("{name}=")))
            }
            Target::Splat(inner) => return self.resolve_place(inner, f),
        })
    }

    /// Current value of a place; unset variables and constants read as nil.
    fn place_get(&self, p: &Place<'_>, f: &Frame) -> Result<Value, Unwind> {
        match p {
            Place::LVar(name) => Ok(f.env.get(name).unwrap_or(Value::Nil)),
            Place::IVar(s) => Ok(self.ivar_get(&f.self_val, *s)),
            Place::GVar(s) => Ok(self.gvar_get(*s)),
            Place::Const(outer, s) => Ok(self.const_get_own(*outer, *s).unwrap_or(Value::Nil)),
            Place::Index(r, a) => self.call_method(r, self.intern("[]"), a, None),
            Place::Attr(r, getter, _) => self.call_method(r, *getter, &[], None),
        }
    }

    fn place_set(&self, p: Place<'_>, v: Value, f: &Frame) -> Result<(), Unwind> {
        match p {
            Place::LVar(name) => f.env.set(name, v),
            Place::IVar(s) => self.ivar_set(&f.self_val, s, v)?,
            Place::GVar(s) => self.gvar_set(s, v),
            Place::Const(outer, s) => self.const_set(outer, s, v),
            Place::Index(r, mut a) => {
                a.push(v);
                self.call_method(&r, self.intern("[]="), &a, None)?;
            }
            Place::Attr(r, _, setter) => {
                self.call_method(&r, setter, &[v], None)?;
            }
        }
        Ok(())
    }

    pub(super) fn eval_assign(&self, a: &AssignExpr, f: &Frame) -> Result<Value, Unwind> {
        let place = self.resolve_place(&a.target, f)?;
        let v = self.eval(&a.value, f)?;
        self.place_set(place, v.clone(), f)?;
        Ok(v)
    }

    pub(super) fn eval_op_assign(&self, a: &OpAssignExpr, f: &Frame) -> Result<Value, Unwind> {
        let place = self.resolve_place(&a.target, f)?;
        let old = self.place_get(&place, f)?;
        let new = match a.op {
            AssignOp::Or if old.truthy() => return Ok(old),
            AssignOp::And if !old.truthy() => return Ok(old),
            AssignOp::Or | AssignOp::And => self.eval(&a.value, f)?,
            AssignOp::Binary(op) => {
                let rhs = self.eval(&a.value, f)?;
                self.call_method(&old, self.intern(op), &[rhs], None)?
            }
        };
        self.place_set(place, new.clone(), f)?;
        Ok(new)
    }

    pub(super) fn eval_multi_assign(&self, a: &MultiAssignExpr, f: &Frame) -> Result<Value, Unwind> {
        let rhs = self.eval(&a.value, f)?;
        let items = match &rhs {
            Value::Array(arr) => arr.to_vec(),
            other => vec![other.clone()],
        };
        let splat = a.targets.iter().position(|t| matches!(t, Target::Splat(_)));
        let n = a.targets.len();
        for (i, t) in a.targets.iter().enumerate() {
            let v = match splat {
                Some(s) if i == s => {
                    let after = n - s - 1;
                    let end = items.len().saturating_sub(after).max(s);
                    Value::array(items.get(s..end).map(<[Value]>::to_vec).unwrap_or_default())
                }
                Some(s) if i > s => {
                    let from_end = n - i;
                    items
                        .len()
                        .checked_sub(from_end)
                        .filter(|&j| j >= s)
                        .and_then(|j| items.get(j).cloned())
                        .unwrap_or(Value::Nil)
                }
                _ => items.get(i).cloned().unwrap_or(Value::Nil),
            };
            let place = self.resolve_place(t, f)?;
            self.place_set(place, v, f)?;
        }
        Ok(rhs)
    }
}
