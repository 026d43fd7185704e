//!
//!
//!
mod ast;

pub use ast::*;
