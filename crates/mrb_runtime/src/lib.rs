//! mrb_runtime: a tree-walking interpreter for a Ruby subset.
//!
//! `State` is one interpreter instance. Scripts compile to a top-level
//! `RProc`; running one either produces a `Value` or leaves the raised
//! exception in the state's exception slot for the host to inspect.

#![allow(clippy::collapsible_if)]
#![allow(clippy::collapsible_else_if)]
#![allow(clippy::new_without_default)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::manual_range_contains)]
#![allow(clippy::get_first)]
#![allow(clippy::if_same_then_else)]
#![allow(clippy::unnecessary_cast)]
#![allow(clippy::len_zero)]
#![allow(clippy::ptr_arg)]
#![allow(clippy::type_complexity)]

pub mod core;
pub mod errors;
pub mod format;
mod ast_exec;
mod builtins;
mod state;

pub use core::{
    Aspec, ClassId, ClassKind, NativeFn, RArray, RHash, RObject, RProc, RRange, RString, Sym,
    Value, ValueTag,
};
pub use errors::{SyntaxError, Unwind};
pub use state::{CallInfo, CompileContext, CoreClasses, State, StateId};
