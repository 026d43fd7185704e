//! Host-facing errors.

use crate::value_type::ValueType;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An exception escaped the script; the engine's slot is already cleared.
    #[error(transparent)]
    Run(#[from] RunError),

    /// The source did not compile and was not executed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("type mismatch: expected {expected}, got {actual}")]
    Type { expected: ValueType, actual: ValueType },

    /// A strict container accessor met a value kind with no host form.
    #[error("unsupported value type: {0}")]
    Unsupported(ValueType),

    /// Failure reported by a host function.
    #[error("{0}")]
    Native(String),

    #[error("invalid argument: {0}")]
    Argument(String),
}

impl Error {
    pub fn native(msg: impl Into<String>) -> Self {
        Error::Native(msg.into())
    }
}

/// An uncaught script exception.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RunError {
    /// Class name of the exception, e.g. `RuntimeError`.
    pub class: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("parse error: line {line}: {message}")]
pub struct ParseError {
    /// 1-based.
    pub line: u32,
    pub message: String,
}

impl From<mrb_runtime::SyntaxError> for ParseError {
    fn from(e: mrb_runtime::SyntaxError) -> Self {
        ParseError {
            line: e.line,
            message: e.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        let run = Error::from(RunError {
            class: "RuntimeError".into(),
            message: "kaboom".into(),
        });
        assert_eq!(run.to_string(), "kaboom");
        let parse = Error::from(ParseError {
            line: 1,
            message: "syntax error, unexpected '.'".into(),
        });
        assert_eq!(parse.to_string(), "parse error: line 1: syntax error, unexpected '.'");
        let ty = Error::Type {
            expected: ValueType::Integer,
            actual: ValueType::String,
        };
        assert_eq!(ty.to_string(), "type mismatch: expected Integer, got String");
        assert_eq!(Error::native("boom").to_string(), "boom");
    }
}
