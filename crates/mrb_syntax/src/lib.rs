//! mrb_syntax: shared syntax types.
//!
//! Spans, source text with line lookup, tokens, diagnostics and string
//! literal helpers used by the lexer, parser and engine.
mod diagnostic;
mod loc;
mod source;
mod span;
mod str_util;
mod token;
mod util;

pub use diagnostic::Diagnostic;
pub use loc::{DiagnosticKind, DiagnosticsFormatter};
pub use source::SourceText;
pub use span::{ByteIndex, Span};
pub use str_util::{
    StrPiece, find_interpolation_end, scan_quoted, split_interpolation, unescape_double,
    unescape_single,
};
pub use token::{Token, TokenKind};
pub use util::{is_const_start, is_ident_continue, is_ident_start};
