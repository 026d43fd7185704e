//! Non-local control flow and common error messages.

use std::fmt;

use crate::core::Value;

/// Why evaluation left an expression early.
///
/// Tags pair `return` and `break` with the activation or call site they
/// unwind to; fresh tags come from `State::fresh_tag`.
#[derive(Clone, Debug)]
pub enum Unwind {
    /// A raised exception object.
    Raise(Value),
    Return(Value, u64),
    /// `break` out of a block.
    Break(Value, u64),
    /// `next` in a block.
    Next(Value),
    LoopBreak(Value),
    LoopNext,
}

/// Parse failure reported by `State::parse`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: u32,
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for SyntaxError {}

pub mod messages {
    pub const DIVIDED_BY_ZERO: &str = "divided by 0";
    pub const NO_BLOCK_GIVEN: &str = "no block given (yield)";
    pub const UNHANDLED_EXCEPTION: &str = "unhandled exception";
    pub const EXCEPTION_EXPECTED: &str = "exception class/object expected";
    pub const STACK_TOO_DEEP: &str = "stack level too deep";
    pub const BREAK_FROM_PROC: &str = "break from proc-closure";
    pub const UNEXPECTED_NEXT: &str = "unexpected next";
    pub const SUPER_OUTSIDE_METHOD: &str = "super called outside of method";
    pub const NOT_A_PROC: &str = "not a proc";
    pub const CANT_ITERATE_FLOAT: &str = "can't iterate from Float";
    pub const NO_RECEIVER: &str = "no receiver given";
    pub const NEGATIVE_ARRAY_SIZE: &str = "negative array size";
}
