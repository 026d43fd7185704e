//! Script values borrowed from a context.

use std::fmt;

use indexmap::IndexMap;
use mrb_runtime::{Value as RValue, ValueTag};

use crate::context::Context;
use crate::convert::{FromValue, HostValue, IntoArgs, to_host};
use crate::error::{Error, Result};
use crate::value_type::ValueType;

/// One script value. It cannot outlive the context it belongs to; several
/// `Value`s may share one script object.
#[derive(Clone)]
pub struct Value<'ctx> {
    ctx: &'ctx Context,
    raw: RValue,
}

impl<'ctx> Value<'ctx> {
    pub(crate) fn new(ctx: &'ctx Context, raw: RValue) -> Self {
        Self { ctx, raw }
    }

    pub fn context(&self) -> &'ctx Context {
        self.ctx
    }

    /// The engine value.
    pub fn raw(&self) -> &RValue {
        &self.raw
    }

    pub(crate) fn into_raw(self) -> RValue {
        self.raw
    }

    pub fn value_type(&self) -> ValueType {
        self.raw.tag().into()
    }

    /// Name of the value's class, e.g. `"String"` or `"NilClass"`.
    pub fn class_name(&self) -> String {
        self.ctx.state().obj_classname(&self.raw)
    }

    // ---------------------------------------------------------------------
    // Predicates
    // ---------------------------------------------------------------------

    fn tag_is(&self, tag: ValueTag) -> bool {
        self.raw.tag() == tag
    }

    pub fn is_nil(&self) -> bool {
        self.tag_is(ValueTag::Nil)
    }

    pub fn is_true(&self) -> bool {
        self.tag_is(ValueTag::True)
    }

    pub fn is_false(&self) -> bool {
        self.tag_is(ValueTag::False)
    }

    pub fn is_bool(&self) -> bool {
        self.is_true() || self.is_false()
    }

    pub fn is_int(&self) -> bool {
        self.tag_is(ValueTag::Integer)
    }

    pub fn is_float(&self) -> bool {
        self.tag_is(ValueTag::Float)
    }

    pub fn is_symbol(&self) -> bool {
        self.tag_is(ValueTag::Symbol)
    }

    pub fn is_string(&self) -> bool {
        self.tag_is(ValueTag::String)
    }

    pub fn is_array(&self) -> bool {
        self.tag_is(ValueTag::Array)
    }

    pub fn is_hash(&self) -> bool {
        self.tag_is(ValueTag::Hash)
    }

    pub fn is_proc(&self) -> bool {
        self.tag_is(ValueTag::Proc)
    }

    pub fn is_exception(&self) -> bool {
        self.tag_is(ValueTag::Exception)
    }

    // ---------------------------------------------------------------------
    // Narrowing
    // ---------------------------------------------------------------------

    fn mismatch(&self, expected: ValueType) -> Error {
        Error::Type {
            expected,
            actual: self.value_type(),
        }
    }

    pub fn to_bool(&self) -> Result<bool> {
        match self.raw {
            RValue::Bool(b) => Ok(b),
            _ => Err(self.mismatch(ValueType::True)),
        }
    }

    pub fn to_int(&self) -> Result<i64> {
        match self.raw {
            RValue::Int(i) => Ok(i),
            _ => Err(self.mismatch(ValueType::Integer)),
        }
    }

    pub fn to_float(&self) -> Result<f64> {
        match self.raw {
            RValue::Float(f) => Ok(f),
            _ => Err(self.mismatch(ValueType::Float)),
        }
    }

    /// String contents, or a symbol's name. Invalid UTF-8 is replaced.
    #[allow(clippy::inherent_to_string_shadow_display)]
    pub fn to_string(&self) -> Result<String> {
        self.to_bytes()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match &self.raw {
            RValue::Str(s) => Ok(s.to_vec()),
            RValue::Sym(s) => Ok(self.ctx.state().sym_name(*s).into_bytes()),
            _ => Err(self.mismatch(ValueType::String)),
        }
    }

    /// Array elements as host values; fails on a kind the bridge cannot carry.
    pub fn to_array(&self) -> Result<Vec<HostValue>> {
        match self.to_host() {
            HostValue::Array(items) => {
                reject_unsupported(items.iter())?;
                Ok(items)
            }
            _ => Err(self.mismatch(ValueType::Array)),
        }
    }

    /// Hash entries with string keys; fails on a kind the bridge cannot carry.
    pub fn to_map(&self) -> Result<IndexMap<String, HostValue>> {
        match self.to_host() {
            HostValue::Map(map) => {
                reject_unsupported(map.values())?;
                Ok(map)
            }
            _ => Err(self.mismatch(ValueType::Hash)),
        }
    }

    /// Full conversion; kinds without a host form become `HostValue::Unsupported`.
    pub fn to_host(&self) -> HostValue {
        to_host(self.ctx.state(), &self.raw)
    }

    /// Typed extraction, e.g. `v.get::<i64>()` or `v.get::<Vec<String>>()`.
    pub fn get<T: FromValue>(&self) -> Result<T> {
        T::from_value(self)
    }

    // ---------------------------------------------------------------------
    // Calls
    // ---------------------------------------------------------------------

    /// Calls method `name` on this value.
    pub fn call(&self, name: &str, args: impl IntoArgs) -> Result<Value<'ctx>> {
        let state = self.ctx.state();
        let args = args.into_args(self.ctx);
        let out = state.funcall(&self.raw, name, &args);
        self.ctx.check_exception()?;
        Ok(Value::new(self.ctx, out))
    }

    /// Runs a Proc, such as the script returned under `no_exec`.
    pub fn run(&self) -> Result<Value<'ctx>> {
        if !self.is_proc() {
            return Err(Error::Argument(format!("cannot run {}", self.value_type())));
        }
        let out = self.ctx.state().run_proc(&self.raw);
        self.ctx.check_exception()?;
        Ok(Value::new(self.ctx, out))
    }

    /// `inspect` rendering.
    pub fn inspect(&self) -> String {
        self.ctx.state().inspect(&self.raw)
    }
}

fn reject_unsupported<'a>(mut items: impl Iterator<Item = &'a HostValue>) -> Result<()> {
    match items.find_map(HostValue::first_unsupported) {
        Some(t) => Err(Error::Unsupported(t)),
        None => Ok(()),
    }
}

/// `to_s` rendering.
impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.ctx.state().to_s(&self.raw)))
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.inspect())
    }
}
