//! Conversions between host data and engine values.
//!
//! `ToValue` goes host → engine, `to_host`/`FromValue` go engine → host.
//! Containers convert element by element; kinds with no host form become
//! `HostValue::Unsupported`.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use indexmap::IndexMap;
use mrb_runtime::{State, Value as RValue};
use tracing::trace;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::value::Value;
use crate::value_type::ValueType;

/// Owned host form of an engine value.
#[derive(Clone, Debug, PartialEq)]
pub enum HostValue {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// A string that is not valid UTF-8.
    Bytes(Vec<u8>),
    Array(Vec<HostValue>),
    Map(IndexMap<String, HostValue>),
    /// A value of a kind the bridge does not carry.
    Unsupported(ValueType),
}

impl HostValue {
    /// First unsupported kind found, searching containers depth first.
    pub fn first_unsupported(&self) -> Option<ValueType> {
        match self {
            HostValue::Unsupported(t) => Some(*t),
            HostValue::Array(items) => items.iter().find_map(HostValue::first_unsupported),
            HostValue::Map(map) => map.values().find_map(HostValue::first_unsupported),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, HostValue::Nil)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            HostValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        HostValue::Bool(b)
    }
}

impl From<i64> for HostValue {
    fn from(i: i64) -> Self {
        HostValue::Int(i)
    }
}

impl From<f64> for HostValue {
    fn from(f: f64) -> Self {
        HostValue::Float(f)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::String(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        HostValue::String(s)
    }
}

impl From<Vec<HostValue>> for HostValue {
    fn from(items: Vec<HostValue>) -> Self {
        HostValue::Array(items)
    }
}

impl From<IndexMap<String, HostValue>> for HostValue {
    fn from(map: IndexMap<String, HostValue>) -> Self {
        HostValue::Map(map)
    }
}

fn bytes_to_host(bytes: Vec<u8>) -> HostValue {
    match String::from_utf8(bytes) {
        Ok(s) => HostValue::String(s),
        Err(e) => HostValue::Bytes(e.into_bytes()),
    }
}

/// Hash keys become strings: string bytes, a symbol's name, or `to_s`.
fn map_key(state: &State, key: &RValue) -> String {
    match key {
        RValue::Str(s) => s.to_string_lossy(),
        RValue::Sym(s) => state.sym_name(*s),
        other => String::from_utf8_lossy(&state.to_s(other)).into_owned(),
    }
}

pub(crate) fn to_host(state: &State, v: &RValue) -> HostValue {
    trace!(kind = %ValueType::from(v.tag()), "to host");
    let mut open = Vec::new();
    convert_to_host(state, v, &mut open)
}

fn convert_to_host(state: &State, v: &RValue, open: &mut Vec<usize>) -> HostValue {
    match v {
        RValue::Array(a) => guarded(open, Rc::as_ptr(a) as usize, ValueType::Array, |open| {
            HostValue::Array(
                a.to_vec()
                    .iter()
                    .map(|x| convert_to_host(state, x, open))
                    .collect(),
            )
        }),
        RValue::Hash(h) => guarded(open, Rc::as_ptr(h) as usize, ValueType::Hash, |open| {
            HostValue::Map(
                h.entries()
                    .iter()
                    .map(|(k, v)| (map_key(state, k), convert_to_host(state, v, open)))
                    .collect(),
            )
        }),
        _ => scalar_to_host(state, v),
    }
}

/// `open` holds the containers on the current path; meeting one of them
/// again means the value contains itself and that branch is `Unsupported`.
fn guarded(
    open: &mut Vec<usize>,
    addr: usize,
    kind: ValueType,
    convert: impl FnOnce(&mut Vec<usize>) -> HostValue,
) -> HostValue {
    if open.contains(&addr) {
        trace!(%kind, "recursive container");
        return HostValue::Unsupported(kind);
    }
    open.push(addr);
    let out = convert(open);
    open.pop();
    out
}

fn scalar_to_host(state: &State, v: &RValue) -> HostValue {
    match v {
        RValue::Nil => HostValue::Nil,
        RValue::Bool(b) => HostValue::Bool(*b),
        RValue::Int(i) => HostValue::Int(*i),
        RValue::Float(f) => HostValue::Float(*f),
        RValue::Sym(s) => HostValue::String(state.sym_name(*s)),
        RValue::Str(s) => bytes_to_host(s.to_vec()),
        other => HostValue::Unsupported(other.tag().into()),
    }
}

fn host_to_raw(state: &State, v: &HostValue) -> RValue {
    match v {
        HostValue::Nil | HostValue::Unsupported(_) => RValue::Nil,
        HostValue::Bool(b) => RValue::Bool(*b),
        HostValue::Int(i) => RValue::Int(*i),
        HostValue::Float(f) => RValue::Float(*f),
        HostValue::String(s) => state.str_new(s.as_bytes()),
        HostValue::Bytes(b) => state.str_new(b),
        HostValue::Array(items) => state.ary_new(items.iter().map(|x| host_to_raw(state, x)).collect()),
        HostValue::Map(map) => {
            let hash = state.hash_new();
            for (k, v) in map {
                state.hash_set(&hash, state.str_new(k.as_bytes()), host_to_raw(state, v));
            }
            hash
        }
    }
}

// -------------------------------------------------------------------------
// Host → engine
// -------------------------------------------------------------------------

/// Host data that can become an engine value of a given context.
pub trait ToValue {
    fn to_raw(&self, ctx: &Context) -> RValue;
}

macro_rules! int_to_value {
    ($($t:ty),*) => {$(
        impl ToValue for $t {
            fn to_raw(&self, _: &Context) -> RValue {
                RValue::Int(*self as i64)
            }
        }
    )*};
}

int_to_value!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl ToValue for f32 {
    fn to_raw(&self, _: &Context) -> RValue {
        RValue::Float(f64::from(*self))
    }
}

impl ToValue for f64 {
    fn to_raw(&self, _: &Context) -> RValue {
        RValue::Float(*self)
    }
}

impl ToValue for bool {
    fn to_raw(&self, _: &Context) -> RValue {
        RValue::Bool(*self)
    }
}

impl ToValue for str {
    fn to_raw(&self, ctx: &Context) -> RValue {
        ctx.state().str_new(self.as_bytes())
    }
}

impl ToValue for String {
    fn to_raw(&self, ctx: &Context) -> RValue {
        self.as_str().to_raw(ctx)
    }
}

/// Raw bytes for a script string; NULs and invalid UTF-8 are kept.
#[derive(Clone, Copy, Debug)]
pub struct Bytes<'a>(pub &'a [u8]);

impl ToValue for Bytes<'_> {
    fn to_raw(&self, ctx: &Context) -> RValue {
        ctx.state().str_new(self.0)
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_raw(&self, ctx: &Context) -> RValue {
        ctx.state().ary_new(self.iter().map(|x| x.to_raw(ctx)).collect())
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_raw(&self, ctx: &Context) -> RValue {
        self.as_slice().to_raw(ctx)
    }
}

impl<T: ToValue, const N: usize> ToValue for [T; N] {
    fn to_raw(&self, ctx: &Context) -> RValue {
        self.as_slice().to_raw(ctx)
    }
}

fn map_to_raw<'m, K, V>(ctx: &Context, entries: impl Iterator<Item = (&'m K, &'m V)>) -> RValue
where
    K: AsRef<str> + 'm,
    V: ToValue + 'm,
{
    let state = ctx.state();
    let hash = state.hash_new();
    for (k, v) in entries {
        state.hash_set(&hash, state.str_new(k.as_ref().as_bytes()), v.to_raw(ctx));
    }
    hash
}

impl<K: AsRef<str>, V: ToValue, S> ToValue for HashMap<K, V, S> {
    fn to_raw(&self, ctx: &Context) -> RValue {
        map_to_raw(ctx, self.iter())
    }
}

impl<K: AsRef<str>, V: ToValue> ToValue for BTreeMap<K, V> {
    fn to_raw(&self, ctx: &Context) -> RValue {
        map_to_raw(ctx, self.iter())
    }
}

impl<K: AsRef<str>, V: ToValue, S> ToValue for IndexMap<K, V, S> {
    fn to_raw(&self, ctx: &Context) -> RValue {
        map_to_raw(ctx, self.iter())
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_raw(&self, ctx: &Context) -> RValue {
        match self {
            Some(v) => v.to_raw(ctx),
            None => RValue::Nil,
        }
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_raw(&self, ctx: &Context) -> RValue {
        (**self).to_raw(ctx)
    }
}

/// `Unsupported` becomes nil.
impl ToValue for HostValue {
    fn to_raw(&self, ctx: &Context) -> RValue {
        host_to_raw(ctx.state(), self)
    }
}

/// A value of the same context passes through; one from another context
/// is copied through its host form.
impl ToValue for Value<'_> {
    fn to_raw(&self, ctx: &Context) -> RValue {
        if self.context().same(ctx) {
            self.raw().clone()
        } else {
            host_to_raw(ctx.state(), &self.to_host())
        }
    }
}

/// Argument lists for `ARGV` and host-side calls.
pub trait IntoArgs {
    fn into_args(self, ctx: &Context) -> Vec<RValue>;
}

impl IntoArgs for () {
    fn into_args(self, _: &Context) -> Vec<RValue> {
        Vec::new()
    }
}

impl<T: ToValue> IntoArgs for Vec<T> {
    fn into_args(self, ctx: &Context) -> Vec<RValue> {
        self.iter().map(|x| x.to_raw(ctx)).collect()
    }
}

impl<T: ToValue> IntoArgs for &[T] {
    fn into_args(self, ctx: &Context) -> Vec<RValue> {
        self.iter().map(|x| x.to_raw(ctx)).collect()
    }
}

impl<T: ToValue, const N: usize> IntoArgs for [T; N] {
    fn into_args(self, ctx: &Context) -> Vec<RValue> {
        self.iter().map(|x| x.to_raw(ctx)).collect()
    }
}

impl<T: ToValue, const N: usize> IntoArgs for &[T; N] {
    fn into_args(self, ctx: &Context) -> Vec<RValue> {
        self.iter().map(|x| x.to_raw(ctx)).collect()
    }
}

// -------------------------------------------------------------------------
// Engine → host
// -------------------------------------------------------------------------

/// Typed extraction used by `Value::get`.
pub trait FromValue: Sized {
    fn from_value(v: &Value<'_>) -> Result<Self>;
}

macro_rules! int_from_value {
    ($($t:ty),*) => {$(
        impl FromValue for $t {
            fn from_value(v: &Value<'_>) -> Result<Self> {
                v.to_int().map(|i| i as $t)
            }
        }
    )*};
}

int_from_value!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl FromValue for f64 {
    fn from_value(v: &Value<'_>) -> Result<Self> {
        v.to_float()
    }
}

impl FromValue for f32 {
    fn from_value(v: &Value<'_>) -> Result<Self> {
        v.to_float().map(|f| f as f32)
    }
}

impl FromValue for bool {
    fn from_value(v: &Value<'_>) -> Result<Self> {
        v.to_bool()
    }
}

impl FromValue for String {
    fn from_value(v: &Value<'_>) -> Result<Self> {
        v.to_string()
    }
}

impl FromValue for HostValue {
    fn from_value(v: &Value<'_>) -> Result<Self> {
        Ok(v.to_host())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(v: &Value<'_>) -> Result<Self> {
        if v.is_nil() {
            Ok(None)
        } else {
            T::from_value(v).map(Some)
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(v: &Value<'_>) -> Result<Self> {
        let ctx = v.context();
        let items = ctx.state().ary_entries(v.raw()).ok_or_else(|| Error::Type {
            expected: ValueType::Array,
            actual: v.value_type(),
        })?;
        items
            .into_iter()
            .map(|raw| T::from_value(&Value::new(ctx, raw)))
            .collect()
    }
}

impl<T: FromValue> FromValue for IndexMap<String, T> {
    fn from_value(v: &Value<'_>) -> Result<Self> {
        let ctx = v.context();
        let state = ctx.state();
        let entries = state.hash_entries(v.raw()).ok_or_else(|| Error::Type {
            expected: ValueType::Hash,
            actual: v.value_type(),
        })?;
        entries
            .into_iter()
            .map(|(k, raw)| Ok((map_key(state, &k), T::from_value(&Value::new(ctx, raw))?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_unsupported_searches_nested_containers() {
        let mut map = IndexMap::new();
        map.insert("ok".to_string(), HostValue::Int(1));
        map.insert(
            "deep".to_string(),
            HostValue::Array(vec![HostValue::Nil, HostValue::Unsupported(ValueType::Range)]),
        );
        assert_eq!(HostValue::Map(map).first_unsupported(), Some(ValueType::Range));
        assert_eq!(HostValue::from("x").first_unsupported(), None);
    }

    #[test]
    fn invalid_utf8_stays_bytes() {
        assert_eq!(bytes_to_host(b"ok".to_vec()), HostValue::String("ok".into()));
        assert_eq!(bytes_to_host(vec![0xff, 0]), HostValue::Bytes(vec![0xff, 0]));
    }
}
