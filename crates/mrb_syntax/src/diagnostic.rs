//! Syntax errors reported by the lexer and parser.

use crate::{DiagnosticKind, DiagnosticsFormatter, Span};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn error_kind(kind: DiagnosticKind, span: Option<Span>) -> Self {
        Self {
            message: DiagnosticsFormatter::format(&kind),
            span,
        }
    }
}
