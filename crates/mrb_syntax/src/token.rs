//! Token definitions.
//!
//! Keywords, operators, literals and delimiters of the Ruby subset.
//! Newlines are significant and emitted as tokens where they can end a statement.
use crate::Span;

/// Token kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Newline that terminates a statement.
    Newline,
    /// `;`
    Semi,

    /// Local variable or method name, possibly ending in `?` or `!`.
    Ident,
    /// Capitalized name.
    Const,
    /// `@name`
    IVar,
    /// `$name`
    GVar,
    /// `name:` inside hashes and argument lists.
    Label,
    /// Integer literal.
    Int,
    /// Float literal.
    Float,
    /// Single-quoted string.
    Str,
    /// Double-quoted string (escapes and `#{}` interpolation).
    DStr,
    /// `:name` or `:+`
    Symbol,
    /// `:"name"`
    DSym,
    /// `%w[...]` word list.
    Words,

    KwAnd,
    KwBegin,
    KwBreak,
    KwCase,
    KwClass,
    KwDef,
    KwDo,
    KwElse,
    KwElsif,
    KwEnd,
    KwEnsure,
    KwFalse,
    KwIf,
    KwModule,
    KwNext,
    KwNil,
    KwNot,
    KwOr,
    KwRescue,
    KwReturn,
    KwSelf,
    KwSuper,
    KwThen,
    KwTrue,
    KwUnless,
    KwUntil,
    KwWhen,
    KwWhile,
    KwYield,
    /// `__FILE__`
    KwFile,

    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `..`
    DotDot,
    /// `...`
    DotDotDot,
    /// `::`
    Colon2,
    /// `:`
    Colon,
    /// `?`
    Question,
    /// `->`
    Arrow,
    /// `=>`
    FatArrow,

    /// `=`
    Eq,
    /// `==`
    EqEq,
    /// `===`
    EqEqEq,
    /// `!=`
    Ne,
    /// `!`
    Bang,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
    /// `<=>`
    Cmp,
    Plus,
    Minus,
    Star,
    /// `**`
    Pow,
    Slash,
    Percent,
    Amp,
    AmpAmp,
    Pipe,
    PipePipe,
    Caret,
    Tilde,
    /// `<<`
    Shl,
    /// `>>`
    Shr,

    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    /// `||=`
    OrEq,
    /// `&&=`
    AndEq,

    /// End of file.
    Eof,
}

impl TokenKind {
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::KwAnd
                | TokenKind::KwBegin
                | TokenKind::KwBreak
                | TokenKind::KwCase
                | TokenKind::KwClass
                | TokenKind::KwDef
                | TokenKind::KwDo
                | TokenKind::KwElse
                | TokenKind::KwElsif
                | TokenKind::KwEnd
                | TokenKind::KwEnsure
                | TokenKind::KwFalse
                | TokenKind::KwIf
                | TokenKind::KwModule
                | TokenKind::KwNext
                | TokenKind::KwNil
                | TokenKind::KwNot
                | TokenKind::KwOr
                | TokenKind::KwRescue
                | TokenKind::KwReturn
                | TokenKind::KwSelf
                | TokenKind::KwSuper
                | TokenKind::KwThen
                | TokenKind::KwTrue
                | TokenKind::KwUnless
                | TokenKind::KwUntil
                | TokenKind::KwWhen
                | TokenKind::KwWhile
                | TokenKind::KwYield
                | TokenKind::KwFile
        )
    }

    /// Whether a newline directly after this token continues the expression.
    pub fn continues_line(self) -> bool {
        matches!(
            self,
            TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Comma
                | TokenKind::Dot
                | TokenKind::Colon2
                | TokenKind::Colon
                | TokenKind::Question
                | TokenKind::Arrow
                | TokenKind::FatArrow
                | TokenKind::Label
                | TokenKind::Eq
                | TokenKind::EqEq
                | TokenKind::EqEqEq
                | TokenKind::Ne
                | TokenKind::Bang
                | TokenKind::Lt
                | TokenKind::Gt
                | TokenKind::Le
                | TokenKind::Ge
                | TokenKind::Cmp
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Pow
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::Amp
                | TokenKind::AmpAmp
                | TokenKind::PipePipe
                | TokenKind::Caret
                | TokenKind::Tilde
                | TokenKind::Shl
                | TokenKind::Shr
                | TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::StarEq
                | TokenKind::SlashEq
                | TokenKind::PercentEq
                | TokenKind::OrEq
                | TokenKind::AndEq
                | TokenKind::KwAnd
                | TokenKind::KwOr
                | TokenKind::KwNot
        )
    }

    /// Whether this token can end an expression (so a following `/` or `%` is an operator).
    pub fn ends_expr(self) -> bool {
        matches!(
            self,
            TokenKind::Ident
                | TokenKind::Const
                | TokenKind::IVar
                | TokenKind::GVar
                | TokenKind::Int
                | TokenKind::Float
                | TokenKind::Str
                | TokenKind::DStr
                | TokenKind::Symbol
                | TokenKind::DSym
                | TokenKind::Words
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::KwEnd
                | TokenKind::KwSelf
                | TokenKind::KwNil
                | TokenKind::KwTrue
                | TokenKind::KwFalse
                | TokenKind::KwFile
        )
    }

    /// Name used in "unexpected ..." parse errors.
    pub fn describe(self, text: &str) -> String {
        match self {
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::Newline => "'\\n'".to_string(),
            TokenKind::Ident => "local variable or method".to_string(),
            TokenKind::Const => "constant".to_string(),
            TokenKind::IVar => "instance variable".to_string(),
            TokenKind::GVar => "global variable".to_string(),
            TokenKind::Label => "label".to_string(),
            TokenKind::Int => "integer literal".to_string(),
            TokenKind::Float => "float literal".to_string(),
            TokenKind::Str | TokenKind::DStr => "string literal".to_string(),
            TokenKind::Symbol | TokenKind::DSym => "symbol literal".to_string(),
            TokenKind::Words => "word list".to_string(),
            k if k.is_keyword() => format!("keyword_{text}"),
            _ => format!("'{text}'"),
        }
    }
}

/// Token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// Token kind.
    pub kind: TokenKind,
    /// Span in source text.
    pub span: Span,
}
