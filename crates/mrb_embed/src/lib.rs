//! mrb_embed: run Ruby-subset scripts inside a Rust program.
//!
//! A [`Context`] owns one interpreter. Host data crosses into scripts through
//! [`ToValue`] and comes back through [`Value`] accessors or [`HostValue`].
//! Host functions registered with [`Class::define_method`] are reached from
//! scripts through one trampoline that looks them up by context, class and
//! method name.
//!
//! ```no_run
//! use mrb_embed::{Args, Context, Error};
//!
//! let ctx = Context::new();
//! let tools = ctx.define_class("Tools", None)?;
//! tools.define_class_method(
//!     "greet",
//!     |ctx, _this| {
//!         let name = ctx.args()[0].to_string()?;
//!         Ok(ctx.to_value(&format!("hello, {name}")))
//!     },
//!     Args::required(1),
//! )?;
//! let v = ctx.load_string("Tools.greet(ARGV[0])", ["world"])?;
//! assert_eq!(v.to_string()?, "hello, world");
//! # Ok::<(), Error>(())
//! ```

mod args;
mod class;
mod context;
mod convert;
mod error;
mod options;
mod parsed;
pub mod registry;
mod trampoline;
mod value;
mod value_type;

pub use args::Args;
pub use class::{Class, Module, Namespace};
pub use context::Context;
pub use convert::{Bytes, FromValue, HostValue, IntoArgs, ToValue};
pub use error::{Error, ParseError, Result, RunError};
pub use options::Options;
pub use parsed::ParsedScript;
pub use registry::NativeFunction;
pub use value::Value;
pub use value_type::ValueType;

/// The underlying interpreter.
pub use mrb_runtime as engine;
