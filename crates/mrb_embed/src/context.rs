//! Execution contexts.

use std::rc::{Rc, Weak};

use mrb_runtime::{RProc, State, StateId, Value as RValue};
use tracing::{debug, warn};

use crate::class::{Class, Module, Namespace};
use crate::convert::{HostValue, IntoArgs, ToValue};
use crate::error::{Error, ParseError, Result, RunError};
use crate::options::Options;
use crate::parsed::ParsedScript;
use crate::registry;
use crate::value::Value;

pub(crate) struct ContextInner {
    state: State,
    options: Options,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        let id = self.state.id();
        registry::global().detach(id);
        debug!(context = %id, "context closed");
    }
}

/// One engine instance plus its host methods.
///
/// A context is tied to the thread that created it. Values borrow it, so
/// nothing can touch the engine once it is closed.
pub struct Context {
    inner: Rc<ContextInner>,
}

impl Context {
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        let state = State::open();
        state.set_capture_output(options.capture_output);
        let id = state.id();
        let inner = Rc::new(ContextInner { state, options });
        let weak: Weak<ContextInner> = Rc::downgrade(&inner);
        inner.state.set_ud(weak);
        registry::global().attach(id);
        debug!(context = %id, "context opened");
        Context { inner }
    }

    /// The context owning `state`, while it is still registered.
    pub(crate) fn recover(state: &State) -> Option<Context> {
        let inner = state.ud()?.downcast::<ContextInner>().ok()?;
        registry::global()
            .is_attached(inner.state.id())
            .then_some(Context { inner })
    }

    pub fn id(&self) -> StateId {
        self.inner.state.id()
    }

    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    pub(crate) fn state(&self) -> &State {
        &self.inner.state
    }

    /// True when both handles refer to the same engine.
    pub fn same(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Releases the engine; the same as dropping the context.
    pub fn close(self) {
        drop(self);
    }

    // ---------------------------------------------------------------------
    // Loading and running
    // ---------------------------------------------------------------------

    /// Compiles and runs `code` with `args` as `ARGV`.
    ///
    /// With `no_exec` the compiled script is returned as a Proc instead.
    pub fn load_string(&self, code: &str, args: impl IntoArgs) -> Result<Value<'_>> {
        let script = self.compile(code)?;
        self.set_argv(args);
        if self.inner.options.no_exec {
            return Ok(Value::new(self, RValue::Proc(script)));
        }
        self.run_raw(&RValue::Proc(script))
    }

    /// `load_string` followed by `Value::to_host`.
    pub fn load_string_result(&self, code: &str, args: impl IntoArgs) -> Result<HostValue> {
        self.load_string(code, args).map(|v| v.to_host())
    }

    /// Compiles `code` without running it.
    pub fn parse(&self, code: &str) -> Result<ParsedScript<'_>> {
        let script = self.compile(code)?;
        Ok(ParsedScript::new(self, RValue::Proc(script)))
    }

    fn compile(&self, code: &str) -> Result<Rc<RProc>> {
        let options = &self.inner.options;
        self.state()
            .parse(code, &options.compile_context())
            .map_err(|e| {
                let e = ParseError::from(e);
                if !options.capture_errors {
                    warn!(file = %options.filename, line = e.line, "{}", e.message);
                }
                Error::Parse(e)
            })
    }

    pub(crate) fn set_argv(&self, args: impl IntoArgs) {
        let state = self.state();
        let argv = state.ary_new(args.into_args(self));
        state.define_global_const("ARGV", argv);
    }

    pub(crate) fn run_raw(&self, script: &RValue) -> Result<Value<'_>> {
        let out = self.state().run_proc(script);
        self.check_exception()?;
        Ok(Value::new(self, out))
    }

    /// Takes a raised exception out of the engine when errors are captured.
    pub(crate) fn check_exception(&self) -> Result<()> {
        if !self.inner.options.capture_errors {
            return Ok(());
        }
        let state = self.state();
        let Some(exc) = state.exc() else {
            return Ok(());
        };
        let message = state.exc_message(&exc);
        let class = state.obj_classname(&exc);
        state.clear_exc();
        debug!(context = %self.id(), %class, %message, "uncaught exception");
        Err(RunError { class, message }.into())
    }

    /// Exception left in the engine when `capture_errors` is off.
    pub fn pending_exception(&self) -> Option<Value<'_>> {
        self.state().exc().map(|e| Value::new(self, e))
    }

    pub fn clear_exception(&self) {
        self.state().clear_exc();
    }

    /// Drains output written by `puts`, `print` and `p` under `capture_output`.
    pub fn take_output(&self) -> Vec<u8> {
        self.state().take_output()
    }

    // ---------------------------------------------------------------------
    // Values
    // ---------------------------------------------------------------------

    pub fn to_value<T: ToValue + ?Sized>(&self, v: &T) -> Value<'_> {
        Value::new(self, v.to_raw(self))
    }

    pub fn nil(&self) -> Value<'_> {
        Value::new(self, RValue::Nil)
    }

    /// Arguments of the host method being called; empty outside one.
    pub fn args(&self) -> Vec<Value<'_>> {
        self.state()
            .get_args()
            .into_iter()
            .map(|v| Value::new(self, v))
            .collect()
    }

    /// Block passed to the host method being called.
    pub fn block(&self) -> Option<Value<'_>> {
        self.state().get_block().map(|v| Value::new(self, v))
    }

    // ---------------------------------------------------------------------
    // Classes and modules
    // ---------------------------------------------------------------------

    pub fn object_class(&self) -> Class<'_> {
        Class::new(self, self.state().object_class())
    }

    /// Defines a top-level class, or returns the existing one.
    pub fn define_class(&self, name: &str, superclass: Option<&Class<'_>>) -> Result<Class<'_>> {
        self.define_class_under(name, superclass, &self.object_class())
    }

    /// Defines class `name` inside `outer`, or returns the existing one.
    /// A different explicit superclass is an error.
    pub fn define_class_under(
        &self,
        name: &str,
        superclass: Option<&Class<'_>>,
        outer: &dyn Namespace,
    ) -> Result<Class<'_>> {
        let state = self.state();
        let id = state
            .define_class_under(outer.class_id(), name, superclass.map(Class::id))
            .map_err(Error::Argument)?;
        debug!(context = %self.id(), class = %state.class_name(id), "class defined");
        Ok(Class::new(self, id))
    }

    pub fn define_module(&self, name: &str, outer: &dyn Namespace) -> Result<Module<'_>> {
        let state = self.state();
        let id = state
            .define_module_under(outer.class_id(), name)
            .map_err(Error::Argument)?;
        debug!(context = %self.id(), module = %state.class_name(id), "module defined");
        Ok(Module::new(self, id))
    }

    /// Class `name` as seen from `outer`; `None` when missing.
    pub fn get_class(&self, name: &str, outer: &dyn Namespace) -> Option<Class<'_>> {
        self.state()
            .class_get_under(outer.class_id(), name)
            .map(|id| Class::new(self, id))
    }

    pub fn has_class(&self, name: &str, outer: &dyn Namespace) -> bool {
        self.get_class(name, outer).is_some()
    }

    pub fn get_module(&self, name: &str, outer: &dyn Namespace) -> Option<Module<'_>> {
        self.state()
            .module_get_under(outer.class_id(), name)
            .map(|id| Module::new(self, id))
    }

    pub fn has_module(&self, name: &str, outer: &dyn Namespace) -> bool {
        self.get_module(name, outer).is_some()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id())
            .field("options", &self.inner.options)
            .finish()
    }
}
