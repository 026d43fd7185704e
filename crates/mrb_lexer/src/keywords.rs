use mrb_syntax::TokenKind;

pub(crate) static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "and" => TokenKind::KwAnd,
    "begin" => TokenKind::KwBegin,
    "break" => TokenKind::KwBreak,
    "case" => TokenKind::KwCase,
    "class" => TokenKind::KwClass,
    "def" => TokenKind::KwDef,
    "do" => TokenKind::KwDo,
    "else" => TokenKind::KwElse,
    "elsif" => TokenKind::KwElsif,
    "end" => TokenKind::KwEnd,
    "ensure" => TokenKind::KwEnsure,
    "false" => TokenKind::KwFalse,
    "if" => TokenKind::KwIf,
    "module" => TokenKind::KwModule,
    "next" => TokenKind::KwNext,
    "nil" => TokenKind::KwNil,
    "not" => TokenKind::KwNot,
    "or" => TokenKind::KwOr,
    "rescue" => TokenKind::KwRescue,
    "return" => TokenKind::KwReturn,
    "self" => TokenKind::KwSelf,
    "super" => TokenKind::KwSuper,
    "then" => TokenKind::KwThen,
    "true" => TokenKind::KwTrue,
    "unless" => TokenKind::KwUnless,
    "until" => TokenKind::KwUntil,
    "when" => TokenKind::KwWhen,
    "while" => TokenKind::KwWhile,
    "yield" => TokenKind::KwYield,
    "__FILE__" => TokenKind::KwFile,
};
