use std::rc::Rc;

use mrb_ir::{BlockArg, CallExpr, Params, SuperExpr};

use crate::core::class::{RubyMethod, arity_message, params_expected};
use crate::core::env::MethodCtx;
use crate::core::{CallArgs, ClassId, Env, Frame, Method, ProcBody, RProc, Sym, Value};
use crate::errors::{Unwind, messages};
use crate::state::{CallInfo, State};

use super::{STACK_GROW_SIZE, STACK_RED_ZONE};

impl State {
    pub(super) fn eval_call(&self, c: &CallExpr, f: &Frame) -> Result<Value, Unwind> {
        if c.recv.is_none() {
            match c.name.as_str() {
                "block_given?" => return Ok(Value::Bool(f.block.is_some())),
                "__method__" => {
                    return Ok(f
                        .method
                        .as_ref()
                        .map_or(Value::Nil, |m| Value::Sym(m.name)));
                }
                _ => {}
            }
        }
        let recv = match &c.recv {
            Some(r) => self.eval(r, f)?,
            None => f.self_val.clone(),
        };
        let args = self.eval_list(&c.args, f)?;
        let (block, tag) = self.eval_block_arg(c.block.as_ref(), f)?;
        let mid = self.intern(&c.name);
        let vcall = c.recv.is_none() && c.args.is_empty() && c.block.is_none();
        let r = self.dispatch(&recv, mid, &args, block.as_ref(), vcall);
        match (r, tag) {
            (Err(Unwind::Break(v, t)), Some(tag)) if t == tag => Ok(v),
            (r, _) => r,
        }
    }

    /// The block of a call and, for block literals, the tag `break` unwinds to.
    fn eval_block_arg(
        &self,
        arg: Option<&BlockArg>,
        f: &Frame,
    ) -> Result<(Option<Value>, Option<u64>), Unwind> {
        match arg {
            None => Ok((None, None)),
            Some(BlockArg::Literal(def)) => {
                let tag = self.fresh_tag();
                Ok((Some(self.make_block(def, f, false, tag)), Some(tag)))
            }
            Some(BlockArg::Pass(e)) => match self.eval(e, f)? {
                Value::Nil => Ok((None, None)),
                p @ Value::Proc(_) => Ok((Some(p), None)),
                Value::Sym(s) => Ok((
                    Some(Value::Proc(Rc::new(RProc::internal(ProcBody::Symbol(s))))),
                    None,
                )),
                other => Err(self.type_error(format!(
                    "wrong argument type {} (expected Proc)",
                    self.obj_classname(&other)
                ))),
            },
        }
    }

    pub(crate) fn call_method(
        &self,
        recv: &Value,
        mid: Sym,
        args: &[Value],
        block: Option<&Value>,
    ) -> Result<Value, Unwind> {
        self.dispatch(recv, mid, args, block, false)
    }

    fn dispatch(
        &self,
        recv: &Value,
        mid: Sym,
        args: &[Value],
        block: Option<&Value>,
        vcall: bool,
    ) -> Result<Value, Unwind> {
        let class = self.class_of(recv);
        match self.find_method(class, mid) {
            Some((owner, m)) => self.invoke(recv, owner, mid, m, args, block),
            None => self.method_missing(recv, mid, args, block, vcall),
        }
    }

    fn method_missing(
        &self,
        recv: &Value,
        mid: Sym,
        args: &[Value],
        block: Option<&Value>,
        vcall: bool,
    ) -> Result<Value, Unwind> {
        let mm = self.intern("method_missing");
        if let Some((owner, m @ Method::Ruby(_))) = self.find_method(self.class_of(recv), mm) {
            let mut full = Vec::with_capacity(args.len() + 1);
            full.push(Value::Sym(mid));
            full.extend_from_slice(args);
            return self.invoke(recv, owner, mm, m, &full, block);
        }
        let name = self.sym_name(mid);
        let desc = self.describe_receiver(recv);
        if vcall {
            Err(self.error(
                self.core().name_error,
                format!("undefined local variable or method '{name}' for {desc}"),
            ))
        } else {
            Err(self.error(
                self.core().no_method_error,
                format!("undefined method '{name}' for {desc}"),
            ))
        }
    }

    pub(crate) fn describe_receiver(&self, v: &Value) -> String {
        match v {
            Value::Nil => "nil".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Class(id) => format!("class {}", self.class_name(*id)),
            Value::Module(id) => format!("module {}", self.class_name(*id)),
            _ if v.identical(self.main()) => "main".to_string(),
            _ => format!("an instance of {}", self.obj_classname(v)),
        }
    }

    pub(crate) fn invoke(
        &self,
        recv: &Value,
        owner: ClassId,
        mid: Sym,
        m: Method,
        args: &[Value],
        block: Option<&Value>,
    ) -> Result<Value, Unwind> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.invoke_method(recv, owner, mid, m, args, block)
        })
    }

    fn invoke_method(
        &self,
        recv: &Value,
        owner: ClassId,
        mid: Sym,
        m: Method,
        args: &[Value],
        block: Option<&Value>,
    ) -> Result<Value, Unwind> {
        match m {
            Method::Builtin(fun) => fun(
                self,
                &CallArgs {
                    recv: recv.clone(),
                    args,
                    block,
                    mid,
                },
            ),
            Method::Native {
                fun,
                aspec,
                class,
                mid: defined_as,
            } => {
                aspec.check(args.len()).map_err(|msg| self.arg_error(msg))?;
                self.enter()?;
                self.push_call(CallInfo {
                    target_class: class,
                    mid: defined_as,
                    args: args.to_vec(),
                    block: block.cloned(),
                });
                let prior = self.replace_exc(None);
                let result = fun(self, recv.clone());
                self.pop_call();
                self.leave();
                match self.replace_exc(prior) {
                    Some(e) => Err(Unwind::Raise(e)),
                    None => Ok(result),
                }
            }
            Method::Ruby(rm) => self.invoke_ruby(recv, owner, mid, &rm, args, block),
            Method::AttrReader(iv) => {
                if !args.is_empty() {
                    return Err(self.arg_error(arity_message(args.len(), "0")));
                }
                Ok(self.ivar_get(recv, iv))
            }
            Method::AttrWriter(iv) => {
                let [v] = args else {
                    return Err(self.arg_error(arity_message(args.len(), "1")));
                };
                self.ivar_set(recv, iv, v.clone())?;
                Ok(v.clone())
            }
            Method::Block(p) => self.call_proc(&p, args, block, Some(recv)),
        }
    }

    fn invoke_ruby(
        &self,
        recv: &Value,
        owner: ClassId,
        mid: Sym,
        rm: &RubyMethod,
        args: &[Value],
        block: Option<&Value>,
    ) -> Result<Value, Unwind> {
        self.enter()?;
        let tag = self.fresh_tag();
        let frame = Frame {
            self_val: recv.clone(),
            env: Env::new(None),
            def_target: rm.cref.class,
            cref: rm.cref.clone(),
            method: Some(Rc::new(MethodCtx {
                owner,
                name: mid,
                def: rm.def.clone(),
            })),
            block: block.cloned(),
            return_tag: tag,
            break_tag: 0,
        };
        let r = self
            .bind_params(&rm.def.params, args, block, true, &frame)
            .and_then(|()| self.eval_begin(&rm.def.body, &frame));
        self.leave();
        match r {
            Err(Unwind::Return(v, t)) if t == tag => Ok(v),
            other => other,
        }
    }

    /// Binds arguments into `f.env`. Strict binding (methods and lambdas)
    /// checks the count; block binding pads with nil, drops extras and
    /// spreads a single array over several parameters.
    fn bind_params(
        &self,
        params: &Params,
        args: &[Value],
        block: Option<&Value>,
        strict: bool,
        f: &Frame,
    ) -> Result<(), Unwind> {
        let required = params.required_count();
        let optional = params.optional.len();
        let spread;
        let args = match args {
            [Value::Array(a)] if !strict && params.is_multi() => {
                spread = a.to_vec();
                &spread[..]
            }
            _ => args,
        };
        if strict && (args.len() < required || (params.rest.is_none() && args.len() > required + optional)) {
            let expected = params_expected(required, optional, params.rest.is_some());
            return Err(self.arg_error(arity_message(args.len(), &expected)));
        }
        let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Nil);
        let pre = params.required.len();
        for (i, name) in params.required.iter().enumerate() {
            f.env.define(name, arg(i));
        }
        let avail_opt = args.len().saturating_sub(required).min(optional);
        for (j, (name, default)) in params.optional.iter().enumerate() {
            let v = if j < avail_opt {
                arg(pre + j)
            } else {
                self.eval(default, f)?
            };
            f.env.define(name, v);
        }
        let rest_start = pre + avail_opt;
        let post_start = args.len().saturating_sub(params.post.len()).max(rest_start);
        if let Some(name) = &params.rest {
            let rest = args.get(rest_start..post_start).map(<[Value]>::to_vec).unwrap_or_default();
            f.env.define(name, Value::array(rest));
        }
        for (k, name) in params.post.iter().enumerate() {
            f.env.define(name, arg(post_start + k));
        }
        if let Some(name) = &params.block {
            f.env.define(name, block.cloned().unwrap_or(Value::Nil));
        }
        Ok(())
    }

    /// Calls a proc. `self_override` rebinds `self` for `define_method` bodies.
    pub(crate) fn call_proc(
        &self,
        p: &Rc<RProc>,
        args: &[Value],
        block: Option<&Value>,
        self_override: Option<&Value>,
    ) -> Result<Value, Unwind> {
        match &p.body {
            ProcBody::Block(def) => {
                let Some(captured) = &p.frame else {
                    return Ok(Value::Nil);
                };
                let mut frame = captured.clone();
                frame.env = Env::new(Some(captured.env.clone()));
                frame.break_tag = p.break_tag;
                if let Some(s) = self_override {
                    frame.self_val = s.clone();
                    frame.block = block.cloned();
                }
                if p.lambda {
                    frame.return_tag = self.fresh_tag();
                }
                self.enter()?;
                let r = self
                    .bind_params(&def.params, args, block, p.lambda, &frame)
                    .and_then(|()| self.eval_body(&def.body, &frame));
                self.leave();
                match r {
                    Err(Unwind::Next(v)) => Ok(v),
                    Err(Unwind::Return(v, t)) if p.lambda && t == frame.return_tag => Ok(v),
                    Err(Unwind::Break(v, t)) if p.lambda && t == p.break_tag => Ok(v),
                    other => other,
                }
            }
            ProcBody::Symbol(mid) => match args.split_first() {
                Some((recv, rest)) => self.call_method(recv, *mid, rest, block),
                None => Err(self.arg_error(messages::NO_RECEIVER)),
            },
            ProcBody::Method(recv, mid) => self.call_method(recv, *mid, args, block),
            ProcBody::Collect(buf) => {
                let v = match args {
                    [one] => one.clone(),
                    many => Value::array(many.to_vec()),
                };
                buf.borrow_mut().push(v);
                Ok(Value::Nil)
            }
            ProcBody::Top(_) => Ok(self.run_proc(&Value::Proc(p.clone()))),
        }
    }

    /// Calls a block value, as `yield` does.
    pub(crate) fn yield_block(&self, block: &Value, args: &[Value]) -> Result<Value, Unwind> {
        match block {
            Value::Proc(p) => self.call_proc(p, args, None, None),
            other => self.call_method(other, self.intern("call"), args, None),
        }
    }

    pub(super) fn eval_yield(&self, args: &[Value], f: &Frame) -> Result<Value, Unwind> {
        match &f.block {
            Some(b) => self.yield_block(b, args),
            None => Err(self.error(self.core().local_jump_error, messages::NO_BLOCK_GIVEN)),
        }
    }

    pub(super) fn eval_super(&self, s: &SuperExpr, f: &Frame) -> Result<Value, Unwind> {
        let Some(ctx) = &f.method else {
            return Err(self.error(self.core().runtime_error, messages::SUPER_OUTSIDE_METHOD));
        };
        let args = match &s.args {
            Some(args) => self.eval_list(args, f)?,
            None => self.zsuper_args(&ctx.def.params, f)?,
        };
        let (block, tag) = match &s.block {
            Some(_) => self.eval_block_arg(s.block.as_ref(), f)?,
            None => (f.block.clone(), None),
        };
        let ancestors = self.ancestors(self.class_of(&f.self_val));
        let start = ancestors.iter().position(|c| *c == ctx.owner).map_or(0, |i| i + 1);
        let found = ancestors[start.min(ancestors.len())..].iter().find_map(|c| {
            self.with_class(*c, |k| k.methods.get(&ctx.name).cloned())
                .map(|m| (*c, m))
        });
        let Some((owner, m)) = found else {
            return Err(self.error(
                self.core().no_method_error,
                format!("super: no superclass method '{}'", self.sym_name(ctx.name)),
            ));
        };
        let r = self.invoke(&f.self_val, owner, ctx.name, m, &args, block.as_ref());
        match (r, tag) {
            (Err(Unwind::Break(v, t)), Some(tag)) if t == tag => Ok(v),
            (r, _) => r,
        }
    }

    /// Arguments of a bare `super`: the current values of the method's parameters.
    fn zsuper_args(&self, params: &Params, f: &Frame) -> Result<Vec<Value>, Unwind> {
        let get = |name: &String| f.env.get(name).unwrap_or(Value::Nil);
        let mut out: Vec<Value> = params.required.iter().map(get).collect();
        out.extend(params.optional.iter().map(|(name, _)| get(name)));
        if let Some(rest) = &params.rest {
            out.extend(self.splat_items(get(rest))?);
        }
        out.extend(params.post.iter().map(get));
        Ok(out)
    }
}
