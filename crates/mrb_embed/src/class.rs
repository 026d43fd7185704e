//! Class and module handles.

use std::sync::Arc;

use mrb_runtime::{ClassId, Value as RValue};
use tracing::debug;

use crate::args::Args;
use crate::context::Context;
use crate::convert::IntoArgs;
use crate::error::{Error, Result};
use crate::registry::{self, NativeFunction};
use crate::trampoline::trampoline;
use crate::value::Value;

/// A scope that classes and modules can be defined in or looked up from.
pub trait Namespace {
    fn class_id(&self) -> ClassId;
}

fn define_native(
    ctx: &Context,
    target: ClassId,
    name: &str,
    f: Arc<dyn NativeFunction>,
    args: Args,
) {
    let state = ctx.state();
    let sym = state.intern(name);
    registry::global().register(ctx.id(), target, sym, f);
    state.define_method(target, sym, trampoline, args.aspec());
    debug!(context = %ctx.id(), class = %state.class_name(target), method = name, "host method defined");
}

fn singleton_of(ctx: &Context, owner: RValue) -> Result<ClassId> {
    let state = ctx.state();
    state
        .singleton_class(&owner)
        .ok_or_else(|| Error::Argument(format!("{} has no singleton class", state.inspect(&owner))))
}

#[derive(Clone, Copy)]
pub struct Class<'ctx> {
    ctx: &'ctx Context,
    id: ClassId,
}

impl<'ctx> Class<'ctx> {
    pub(crate) fn new(ctx: &'ctx Context, id: ClassId) -> Self {
        Self { ctx, id }
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Fully qualified name, e.g. `Outer::Inner`.
    pub fn name(&self) -> String {
        self.ctx.state().class_name(self.id)
    }

    pub fn as_value(&self) -> Value<'ctx> {
        Value::new(self.ctx, RValue::Class(self.id))
    }

    /// Defines instance method `name`, replacing any earlier host function.
    pub fn define_method<F>(&self, name: &str, f: F, args: Args) -> Result<()>
    where
        F: for<'c> Fn(&'c Context, Value<'c>) -> Result<Value<'c>> + Send + Sync + 'static,
    {
        define_native(self.ctx, self.id, name, Arc::new(f), args);
        Ok(())
    }

    /// Defines `name` on the class itself.
    pub fn define_class_method<F>(&self, name: &str, f: F, args: Args) -> Result<()>
    where
        F: for<'c> Fn(&'c Context, Value<'c>) -> Result<Value<'c>> + Send + Sync + 'static,
    {
        let meta = singleton_of(self.ctx, RValue::Class(self.id))?;
        define_native(self.ctx, meta, name, Arc::new(f), args);
        Ok(())
    }

    /// `Class#new` with `args`.
    pub fn new_instance(&self, args: impl IntoArgs) -> Result<Value<'ctx>> {
        self.as_value().call("new", args)
    }
}

impl Namespace for Class<'_> {
    fn class_id(&self) -> ClassId {
        self.id
    }
}

impl std::fmt::Debug for Class<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Class({})", self.name())
    }
}

#[derive(Clone, Copy)]
pub struct Module<'ctx> {
    ctx: &'ctx Context,
    id: ClassId,
}

impl<'ctx> Module<'ctx> {
    pub(crate) fn new(ctx: &'ctx Context, id: ClassId) -> Self {
        Self { ctx, id }
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> String {
        self.ctx.state().class_name(self.id)
    }

    pub fn as_value(&self) -> Value<'ctx> {
        Value::new(self.ctx, RValue::Module(self.id))
    }

    /// Instance method for classes that include the module.
    pub fn define_method<F>(&self, name: &str, f: F, args: Args) -> Result<()>
    where
        F: for<'c> Fn(&'c Context, Value<'c>) -> Result<Value<'c>> + Send + Sync + 'static,
    {
        define_native(self.ctx, self.id, name, Arc::new(f), args);
        Ok(())
    }

    /// Module function, e.g. `Tools.greet`.
    pub fn define_class_method<F>(&self, name: &str, f: F, args: Args) -> Result<()>
    where
        F: for<'c> Fn(&'c Context, Value<'c>) -> Result<Value<'c>> + Send + Sync + 'static,
    {
        let meta = singleton_of(self.ctx, RValue::Module(self.id))?;
        define_native(self.ctx, meta, name, Arc::new(f), args);
        Ok(())
    }
}

impl Namespace for Module<'_> {
    fn class_id(&self) -> ClassId {
        self.id
    }
}

impl std::fmt::Debug for Module<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Module({})", self.name())
    }
}
