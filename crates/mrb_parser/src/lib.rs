//! mrb_parser: Ruby-subset source to `mrb_ir` syntax trees.
//!
//! `parse_program` lexes and parses in one step; `Parser` is exposed for callers
//! that already hold a token stream.
mod expr;
mod interp;
mod parser;
mod stmt;

pub use mrb_ir::*;
pub use parser::{ParseResult, Parser, parse_program};
