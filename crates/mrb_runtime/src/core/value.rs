//! Runtime value representation.
//!
//! Immediates are stored inline; strings, arrays, hashes, procs and objects
//! are `Rc`-shared and mutated through `RefCell`. There is no tracing GC, so
//! reference cycles leak until the state is dropped.

use std::cell::{Cell, RefCell};
use std::hash::Hash;
use std::rc::Rc;

use ahash::RandomState;
use hashbrown::HashMap;
use indexmap::IndexMap;
use mrb_ir::{BlockDef, Program};

use super::env::Frame;

pub type FastHashMap<K, V> = HashMap<K, V, RandomState>;
pub type FastIndexMap<K, V> = IndexMap<K, V, RandomState>;

pub fn fast_hasher() -> RandomState {
    RandomState::with_seeds(0, 0, 0, 0)
}

pub fn fast_map_new<K: Eq + Hash, V>() -> FastHashMap<K, V> {
    HashMap::with_hasher(fast_hasher())
}

pub fn fast_index_map_new<K: Eq + Hash, V>() -> FastIndexMap<K, V> {
    IndexMap::with_hasher(fast_hasher())
}

/// Interned symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sym(pub(crate) u32);

/// Index of a class or module in the state's class arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub(crate) u32);

impl ClassId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Coarse kind of a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueTag {
    Nil,
    True,
    False,
    Integer,
    Float,
    Symbol,
    String,
    Array,
    Hash,
    Range,
    Proc,
    Object,
    Exception,
    Class,
    Module,
}

#[derive(Clone, Debug)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Sym(Sym),
    Str(Rc<RString>),
    Array(Rc<RArray>),
    Hash(Rc<RHash>),
    Range(Rc<RRange>),
    Proc(Rc<RProc>),
    Object(Rc<RObject>),
    Exception(Rc<RObject>),
    Class(ClassId),
    Module(ClassId),
}

impl Value {
    pub fn tag(&self) -> ValueTag {
        match self {
            Value::Nil => ValueTag::Nil,
            Value::Bool(true) => ValueTag::True,
            Value::Bool(false) => ValueTag::False,
            Value::Int(_) => ValueTag::Integer,
            Value::Float(_) => ValueTag::Float,
            Value::Sym(_) => ValueTag::Symbol,
            Value::Str(_) => ValueTag::String,
            Value::Array(_) => ValueTag::Array,
            Value::Hash(_) => ValueTag::Hash,
            Value::Range(_) => ValueTag::Range,
            Value::Proc(_) => ValueTag::Proc,
            Value::Object(_) => ValueTag::Object,
            Value::Exception(_) => ValueTag::Exception,
            Value::Class(_) => ValueTag::Class,
            Value::Module(_) => ValueTag::Module,
        }
    }

    #[inline]
    pub fn truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn str(bytes: impl Into<Vec<u8>>) -> Value {
        Value::Str(Rc::new(RString::new(bytes.into())))
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RArray::new(items)))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Value::Str(s) => Some(s.to_vec()),
            _ => None,
        }
    }

    /// Object identity (`equal?`).
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Sym(a), Value::Sym(b)) => a == b,
            (Value::Class(a), Value::Class(b)) | (Value::Module(a), Value::Module(b)) => a == b,
            _ => match (self.ptr(), other.ptr()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Address of the shared payload, for identity and `object_id`.
    pub(crate) fn ptr(&self) -> Option<usize> {
        let p = match self {
            Value::Str(r) => Rc::as_ptr(r) as *const u8,
            Value::Array(r) => Rc::as_ptr(r) as *const u8,
            Value::Hash(r) => Rc::as_ptr(r) as *const u8,
            Value::Range(r) => Rc::as_ptr(r) as *const u8,
            Value::Proc(r) => Rc::as_ptr(r) as *const u8,
            Value::Object(r) | Value::Exception(r) => Rc::as_ptr(r) as *const u8,
            _ => return None,
        };
        Some(p as usize)
    }
}

#[derive(Debug, Default)]
pub struct RString {
    bytes: RefCell<Vec<u8>>,
}

impl RString {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: RefCell::new(bytes),
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.borrow().clone()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes.borrow()).into_owned()
    }

    pub fn len(&self) -> usize {
        self.bytes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.borrow().is_empty()
    }

    pub fn with<T>(&self, f: impl FnOnce(&[u8]) -> T) -> T {
        f(&self.bytes.borrow())
    }

    pub fn push_bytes(&self, more: &[u8]) {
        self.bytes.borrow_mut().extend_from_slice(more);
    }

    pub fn replace(&self, bytes: Vec<u8>) {
        *self.bytes.borrow_mut() = bytes;
    }
}

#[derive(Debug, Default)]
pub struct RArray {
    pub(crate) items: RefCell<Vec<Value>>,
}

impl RArray {
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items: RefCell::new(items),
        }
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn get(&self, i: usize) -> Option<Value> {
        self.items.borrow().get(i).cloned()
    }

    pub fn push(&self, v: Value) {
        self.items.borrow_mut().push(v);
    }
}

/// Hash key: contents for strings and immediates, identity for everything else.
///
/// Integers and floats are distinct keys, as with `eql?`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HashKey {
    Nil,
    Bool(bool),
    Int(i64),
    Float(u64),
    Sym(Sym),
    Str(Vec<u8>),
    Array(Vec<HashKey>),
    Class(ClassId),
    Ptr(usize),
}

impl HashKey {
    pub fn of(v: &Value) -> HashKey {
        Self::of_nested(v, &mut Vec::new())
    }

    /// An array nested inside itself keys by identity at the repeat.
    fn of_nested(v: &Value, open: &mut Vec<usize>) -> HashKey {
        match v {
            Value::Nil => HashKey::Nil,
            Value::Bool(b) => HashKey::Bool(*b),
            Value::Int(i) => HashKey::Int(*i),
            Value::Float(f) => HashKey::Float(if *f == 0.0 { 0 } else { f.to_bits() }),
            Value::Sym(s) => HashKey::Sym(*s),
            Value::Str(s) => HashKey::Str(s.to_vec()),
            Value::Array(a) => {
                let addr = Rc::as_ptr(a) as usize;
                if open.contains(&addr) {
                    return HashKey::Ptr(addr);
                }
                open.push(addr);
                let items = a.items.borrow().iter().map(|x| Self::of_nested(x, open)).collect();
                open.pop();
                HashKey::Array(items)
            }
            Value::Class(c) | Value::Module(c) => HashKey::Class(*c),
            other => HashKey::Ptr(other.ptr().unwrap_or(0)),
        }
    }
}

#[derive(Debug)]
pub struct RHash {
    pub(crate) map: RefCell<FastIndexMap<HashKey, (Value, Value)>>,
    pub(crate) default: RefCell<Value>,
    /// Block given to `Hash.new`; called with the hash and the missing key.
    pub(crate) default_proc: RefCell<Option<Value>>,
}

impl Default for RHash {
    fn default() -> Self {
        Self {
            map: RefCell::new(fast_index_map_new()),
            default: RefCell::new(Value::Nil),
            default_proc: RefCell::new(None),
        }
    }
}

impl RHash {
    pub fn get(&self, key: &Value) -> Option<Value> {
        self.map.borrow().get(&HashKey::of(key)).map(|(_, v)| v.clone())
    }

    /// String keys are copied so later mutation of the caller's string does
    /// not change the stored key.
    pub fn insert(&self, key: Value, value: Value) {
        let key = match key {
            Value::Str(s) => Value::str(s.to_vec()),
            other => other,
        };
        let hk = HashKey::of(&key);
        let mut map = self.map.borrow_mut();
        match map.get_mut(&hk) {
            Some(slot) => slot.1 = value,
            None => {
                map.insert(hk, (key, value));
            }
        }
    }

    pub fn remove(&self, key: &Value) -> Option<Value> {
        self.map
            .borrow_mut()
            .shift_remove(&HashKey::of(key))
            .map(|(_, v)| v)
    }

    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.map.borrow().values().cloned().collect()
    }

    pub fn keys(&self) -> Vec<Value> {
        self.map.borrow().values().map(|(k, _)| k.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.map.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.borrow().is_empty()
    }
}

#[derive(Debug)]
pub struct RRange {
    pub lo: Value,
    pub hi: Value,
    pub exclusive: bool,
}

/// Class-based object; exceptions use the same layout.
#[derive(Debug)]
pub struct RObject {
    pub(crate) class: Cell<ClassId>,
    pub(crate) ivars: RefCell<FastIndexMap<Sym, Value>>,
}

impl RObject {
    pub fn new(class: ClassId) -> Self {
        Self {
            class: Cell::new(class),
            ivars: RefCell::new(fast_index_map_new()),
        }
    }

    pub fn class(&self) -> ClassId {
        self.class.get()
    }
}

#[derive(Clone, Debug)]
pub enum ProcBody {
    /// Compiled top-level script.
    Top(Rc<TopLevel>),
    Block(Rc<BlockDef>),
    /// `&:name`
    Symbol(Sym),
    /// `obj.method(:name)`
    Method(Value, Sym),
    /// Internal block that gathers yielded values.
    Collect(Rc<RefCell<Vec<Value>>>),
}

#[derive(Debug)]
pub struct TopLevel {
    pub program: Program,
    pub filename: String,
}

#[derive(Debug)]
pub struct RProc {
    pub(crate) body: ProcBody,
    /// Defining context of a block; `None` for scripts and internal procs.
    pub(crate) frame: Option<Frame>,
    pub(crate) lambda: bool,
    /// Unwind tag of the call site the block literal was attached to.
    pub(crate) break_tag: u64,
}

impl RProc {
    pub fn is_lambda(&self) -> bool {
        self.lambda
    }

    pub fn is_script(&self) -> bool {
        matches!(self.body, ProcBody::Top(_))
    }

    pub(crate) fn internal(body: ProcBody) -> Self {
        Self {
            body,
            frame: None,
            lambda: false,
            break_tag: 0,
        }
    }
}
