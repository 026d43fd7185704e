//! Core runtime infrastructure.
//!
//! - `Value` and the heap payload types
//! - `Env`, `Frame` and lexical class scopes
//! - class and method tables
//! - symbol interning

pub mod class;
pub mod env;
pub mod symbol;
pub mod value;

pub use class::{Aspec, BuiltinFn, CallArgs, ClassKind, Method, NativeFn, RClass};
pub use env::{Env, Frame};
pub use value::*;
