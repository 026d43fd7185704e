pub fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic() || !c.is_ascii()
}

pub fn is_ident_continue(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

/// Constants start with an uppercase ASCII letter.
pub fn is_const_start(c: char) -> bool {
    c.is_ascii_uppercase()
}
