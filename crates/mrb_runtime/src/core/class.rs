//! Classes, modules and method tables.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use mrb_ir::{BlockDef, MethodDef};

use super::env::Cref;
use super::value::{ClassId, FastHashMap, RProc, Sym, Value, fast_map_new};
use crate::errors::Unwind;
use crate::state::State;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Module,
    /// Singleton class of a class or object; holds its class methods.
    Singleton,
}

#[derive(Debug)]
pub struct RClass {
    /// Full constant path such as `Outer::Inner`; `None` for singletons.
    pub name: Option<String>,
    pub kind: ClassKind,
    pub superclass: Option<ClassId>,
    /// Included modules, most recent last.
    pub includes: Vec<ClassId>,
    pub methods: FastHashMap<Sym, Method>,
    pub consts: IndexMap<Sym, Value>,
    /// Class-level instance variables.
    pub ivars: FastHashMap<Sym, Value>,
    pub meta: Option<ClassId>,
    /// What a singleton class is attached to.
    pub attached: Option<Value>,
}

impl RClass {
    pub fn new(name: Option<String>, kind: ClassKind, superclass: Option<ClassId>) -> Self {
        Self {
            name,
            kind,
            superclass,
            includes: Vec::new(),
            methods: fast_map_new(),
            consts: IndexMap::new(),
            ivars: fast_map_new(),
            meta: None,
            attached: None,
        }
    }
}

/// Engine-implemented method.
pub type BuiltinFn = fn(&State, &CallArgs<'_>) -> Result<Value, Unwind>;

/// Host-registered method. Failures are reported through the exception slot.
pub type NativeFn = fn(&State, Value) -> Value;

/// Arguments of a builtin call.
pub struct CallArgs<'a> {
    pub recv: Value,
    pub args: &'a [Value],
    pub block: Option<&'a Value>,
    pub mid: Sym,
}

pub struct RubyMethod {
    pub def: Rc<MethodDef>,
    pub cref: Rc<Cref>,
}

#[derive(Clone)]
pub enum Method {
    Ruby(Rc<RubyMethod>),
    Builtin(BuiltinFn),
    /// A host method. `class` and `mid` are where it was defined; aliases
    /// and subclasses keep them.
    Native {
        fun: NativeFn,
        aspec: Aspec,
        class: ClassId,
        mid: Sym,
    },
    AttrReader(Sym),
    AttrWriter(Sym),
    /// `define_method(:name) { ... }`
    Block(Rc<RProc>),
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Ruby(m) => write!(f, "Ruby({})", m.def.name),
            Method::Builtin(_) => f.write_str("Builtin"),
            Method::Native { aspec, .. } => write!(f, "Native({aspec:?})"),
            Method::AttrReader(s) => write!(f, "AttrReader({s:?})"),
            Method::AttrWriter(s) => write!(f, "AttrWriter({s:?})"),
            Method::Block(_) => f.write_str("Block"),
        }
    }
}

/// Argument count accepted by a native method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Aspec {
    Any,
    None,
    Req(u32),
    Opt(u32),
    Arg { req: u32, opt: u32 },
}

impl Aspec {
    fn bounds(self) -> Option<(u32, u32)> {
        match self {
            Aspec::Any => None,
            Aspec::None => Some((0, 0)),
            Aspec::Req(n) => Some((n, n)),
            Aspec::Opt(n) => Some((0, n)),
            Aspec::Arg { req, opt } => Some((req, req + opt)),
        }
    }

    /// Checks `given` and returns the `ArgumentError` message on mismatch.
    pub fn check(self, given: usize) -> Result<(), String> {
        let Some((min, max)) = self.bounds() else {
            return Ok(());
        };
        if given >= min as usize && given <= max as usize {
            return Ok(());
        }
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{min}..{max}")
        };
        Err(arity_message(given, &expected))
    }
}

pub(crate) fn arity_message(given: usize, expected: &str) -> String {
    format!("wrong number of arguments (given {given}, expected {expected})")
}

/// `expected` text for a Ruby parameter list.
pub(crate) fn params_expected(required: usize, optional: usize, rest: bool) -> String {
    if rest {
        format!("{required}+")
    } else if optional == 0 {
        required.to_string()
    } else {
        format!("{}..{}", required, required + optional)
    }
}

/// Arity reported by `Proc#arity`.
pub(crate) fn block_arity(def: &BlockDef) -> i64 {
    let req = def.params.required_count() as i64;
    if def.params.rest.is_some() || !def.params.optional.is_empty() {
        -(req + 1)
    } else {
        req
    }
}
