//! Diagnostic kinds and their message text.
//!
//! Messages follow the wording scripts are used to seeing from Ruby
//! tooling (`syntax error, unexpected ...`).

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    // Lexer
    UnterminatedString,
    UnterminatedComment,
    UnexpectedChar(char),
    InvalidNumber(String),

    // Parser
    Unexpected(String),
    UnexpectedExpecting { found: String, expected: String },
    InvalidAssignmentTarget,
    DynamicConstantAssignment,
    MissingEnd(&'static str),
    TooDeeplyNested,

    Raw(String),
}

pub struct DiagnosticsFormatter;

impl DiagnosticsFormatter {
    pub fn format(kind: &DiagnosticKind) -> String {
        match kind {
            DiagnosticKind::UnterminatedString => "unterminated string meets end of file".into(),
            DiagnosticKind::UnterminatedComment => "embedded document meets end of file".into(),
            DiagnosticKind::UnexpectedChar(c) => {
                format!("Invalid char '{}' in expression", c.escape_default())
            }
            DiagnosticKind::InvalidNumber(s) => format!("invalid numeric literal '{s}'"),
            DiagnosticKind::Unexpected(found) => format!("syntax error, unexpected {found}"),
            DiagnosticKind::UnexpectedExpecting { found, expected } => {
                format!("syntax error, unexpected {found}, expecting {expected}")
            }
            DiagnosticKind::InvalidAssignmentTarget => {
                "syntax error, cannot assign to this expression".into()
            }
            DiagnosticKind::DynamicConstantAssignment => "dynamic constant assignment".into(),
            DiagnosticKind::MissingEnd(what) => {
                format!("syntax error, unexpected end of file, expecting keyword_end for '{what}'")
            }
            DiagnosticKind::TooDeeplyNested => "syntax error, too deeply nested".into(),
            DiagnosticKind::Raw(s) => s.clone(),
        }
    }
}
