use std::rc::Rc;

use mrb_ir::{BeginExpr, Body, CaseExpr, ClassDef, ConstRef, MethodDef, ModuleDef, SClassDef, WhileExpr};

use crate::core::class::RubyMethod;
use crate::core::env::Cref;
use crate::core::{ClassId, Env, Frame, Method, Value};
use crate::errors::Unwind;
use crate::state::State;

impl State {
    pub(crate) fn eval_begin(&self, b: &BeginExpr, f: &Frame) -> Result<Value, Unwind> {
        let r = match self.eval_body(&b.body, f) {
            Err(Unwind::Raise(exc)) if !b.rescues.is_empty() => self.rescue(b, exc, f),
            Ok(v) => match &b.else_body {
                Some(body) => self.eval_body(body, f),
                None => Ok(v),
            },
            other => other,
        };
        if let Some(ensure) = &b.ensure {
            self.eval_body(ensure, f)?;
        }
        r
    }

    fn rescue(&self, b: &BeginExpr, exc: Value, f: &Frame) -> Result<Value, Unwind> {
        for clause in b.rescues.iter() {
            let classes = if clause.classes.is_empty() {
                vec![Value::Class(self.core().standard_error)]
            } else {
                self.eval_list(&clause.classes, f)?
            };
            let mut matched = false;
            for c in &classes {
                match c {
                    Value::Class(id) | Value::Module(id) => {
                        if self.is_a(&exc, *id) {
                            matched = true;
                            break;
                        }
                    }
                    _ => {
                        return Err(self.type_error("class or module required for rescue clause"));
                    }
                }
            }
            if matched {
                if let Some(var) = &clause.var {
                    f.env.set(var, exc.clone());
                }
                self.gvar_set(self.intern("$!"), exc);
                return self.eval_body(&clause.body, f);
            }
        }
        Err(Unwind::Raise(exc))
    }

    pub(super) fn eval_while(&self, w: &WhileExpr, f: &Frame) -> Result<Value, Unwind> {
        loop {
            if self.eval(&w.cond, f)?.truthy() == w.until {
                return Ok(Value::Nil);
            }
            match self.eval_body(&w.body, f) {
                Ok(_) | Err(Unwind::LoopNext) => {}
                Err(Unwind::LoopBreak(v)) => return Ok(v),
                Err(e) => return Err(e),
            }
        }
    }

    pub(super) fn eval_case(&self, c: &CaseExpr, f: &Frame) -> Result<Value, Unwind> {
        let subject = match &c.subject {
            Some(s) => Some(self.eval(s, f)?),
            None => None,
        };
        let eqq = self.intern("===");
        for when in c.whens.iter() {
            let patterns = self.eval_list(&when.patterns, f)?;
            for pat in &patterns {
                let hit = match &subject {
                    Some(s) => self.call_method(pat, eqq, std::slice::from_ref(s), None)?.truthy(),
                    None => pat.truthy(),
                };
                if hit {
                    return self.eval_body(&when.body, f);
                }
            }
        }
        match &c.else_body {
            Some(body) => self.eval_body(body, f),
            None => Ok(Value::Nil),
        }
    }

    pub(super) fn eval_def(&self, def: &Rc<MethodDef>, f: &Frame) -> Result<Value, Unwind> {
        let mid = self.intern(&def.name);
        let target = if def.singleton {
            self.singleton_class(&f.self_val).ok_or_else(|| {
                self.type_error(format!(
                    "can't define singleton method for {}",
                    self.obj_classname(&f.self_val)
                ))
            })?
        } else {
            f.def_target
        };
        let m = RubyMethod {
            def: def.clone(),
            cref: f.cref.clone(),
        };
        self.add_method(target, mid, Method::Ruby(Rc::new(m)));
        Ok(Value::Sym(mid))
    }

    /// The class a `class`/`module` path is defined in.
    fn definition_outer(&self, path: &ConstRef, f: &Frame) -> Result<ClassId, Unwind> {
        if path.top_level {
            return Ok(self.core().object);
        }
        match &path.scope {
            None => Ok(f.cref.class),
            Some(e) => match self.eval(e, f)? {
                Value::Class(id) | Value::Module(id) => Ok(id),
                other => Err(self.type_error(format!(
                    "{} is not a class/module",
                    self.inspect(&other)
                ))),
            },
        }
    }

    pub(super) fn eval_class_def(&self, c: &ClassDef, f: &Frame) -> Result<Value, Unwind> {
        let outer = self.definition_outer(&c.path, f)?;
        let superclass = match &c.superclass {
            Some(e) => match self.eval(e, f)? {
                Value::Class(id) => Some(id),
                _ => return Err(self.type_error("superclass must be a Class")),
            },
            None => None,
        };
        let id = self
            .define_class_under(outer, &c.path.name, superclass)
            .map_err(|msg| self.type_error(msg))?;
        self.eval_class_body(id, Value::Class(id), &c.body, f)
    }

    pub(super) fn eval_module_def(&self, m: &ModuleDef, f: &Frame) -> Result<Value, Unwind> {
        let outer = self.definition_outer(&m.path, f)?;
        let id = self
            .define_module_under(outer, &m.path.name)
            .map_err(|msg| self.type_error(msg))?;
        self.eval_class_body(id, Value::Module(id), &m.body, f)
    }

    pub(super) fn eval_sclass(&self, s: &SClassDef, f: &Frame) -> Result<Value, Unwind> {
        let target = self.eval(&s.target, f)?;
        let Some(meta) = self.singleton_class(&target) else {
            return Err(self.type_error(format!(
                "can't define singleton for {}",
                self.obj_classname(&target)
            )));
        };
        self.eval_class_body(meta, Value::Class(meta), &s.body, f)
    }

    fn eval_class_body(&self, id: ClassId, self_val: Value, body: &Body, f: &Frame) -> Result<Value, Unwind> {
        let frame = Frame {
            self_val,
            env: Env::new(None),
            def_target: id,
            cref: Rc::new(Cref {
                class: id,
                parent: Some(f.cref.clone()),
            }),
            method: None,
            block: None,
            return_tag: self.fresh_tag(),
            break_tag: 0,
        };
        self.eval_body(body, &frame)
    }
}
