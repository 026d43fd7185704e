//! mrb_lexer: lexer crate.
//!
//! Tokenizes Ruby-subset source and collects diagnostics.
//! Entry point: `Lexer::new(input).lex()`.
mod keywords;
mod lexer;

pub use lexer::{LexResult, Lexer};
