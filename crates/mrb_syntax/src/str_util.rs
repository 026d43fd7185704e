/// Contents of a single-quoted literal: only `\\` and `\'` are escapes.
pub fn unescape_single(s: &str) -> Vec<u8> {
    let mut res = Vec::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' && i + 1 < bytes.len() && matches!(bytes[i + 1], b'\\' | b'\'') {
            res.push(bytes[i + 1]);
            i += 2;
            continue;
        }
        res.push(b);
        i += 1;
    }
    res
}

/// Contents of a double-quoted literal (without interpolation).
///
/// Escapes may produce bytes that are not valid UTF-8 (`\xff`), so the result is raw bytes.
/// Unknown escapes yield the escaped character itself.
pub fn unescape_double(s: &str) -> Vec<u8> {
    let mut res = Vec::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    let mut buf = [0u8; 4];
    while let Some(c) = chars.next() {
        if c != '\\' {
            res.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let Some(e) = chars.next() else {
            res.push(b'\\');
            break;
        };
        match e {
            'n' => res.push(b'\n'),
            't' => res.push(b'\t'),
            'r' => res.push(b'\r'),
            '0' if !chars.peek().is_some_and(|c| c.is_digit(8)) => res.push(0),
            's' => res.push(b' '),
            'e' => res.push(0x1b),
            'a' => res.push(0x07),
            'b' => res.push(0x08),
            'f' => res.push(0x0c),
            'v' => res.push(0x0b),
            'x' => {
                let mut v: u32 = 0;
                let mut n = 0;
                while n < 2 {
                    match chars.peek().and_then(|c| c.to_digit(16)) {
                        Some(d) => {
                            v = v * 16 + d;
                            chars.next();
                            n += 1;
                        }
                        None => break,
                    }
                }
                if n == 0 {
                    res.push(b'x');
                } else {
                    res.push(v as u8);
                }
            }
            'u' => {
                let mut code: u32 = 0;
                if chars.peek() == Some(&'{') {
                    chars.next();
                    while let Some(d) = chars.peek().and_then(|c| c.to_digit(16)) {
                        code = code.saturating_mul(16).saturating_add(d);
                        chars.next();
                    }
                    if chars.peek() == Some(&'}') {
                        chars.next();
                    }
                } else {
                    for _ in 0..4 {
                        match chars.peek().and_then(|c| c.to_digit(16)) {
                            Some(d) => {
                                code = code * 16 + d;
                                chars.next();
                            }
                            None => break,
                        }
                    }
                }
                let ch = char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER);
                res.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
            d if d.is_digit(8) => {
                let mut v = d.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(x) => {
                            v = v * 8 + x;
                            chars.next();
                        }
                        None => break,
                    }
                }
                res.push(v as u8);
            }
            other => res.extend_from_slice(other.encode_utf8(&mut buf).as_bytes()),
        }
    }
    res
}

/// Piece of a double-quoted literal body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StrPiece<'a> {
    /// Raw (still escaped) text.
    Lit(&'a str),
    /// Source of an `#{...}` expression and its byte offset inside the body.
    Expr(&'a str, usize),
}

/// Index of the byte after the quoted literal that opens at `start`, or `None` if unterminated.
pub fn scan_quoted(s: &str, start: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'#' if quote == b'"' && bytes.get(i + 1) == Some(&b'{') => {
                i = find_interpolation_end(s, i + 2)? + 1;
            }
            b if b == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// Given the index just after `#{`, returns the index of the matching `}`.
pub fn find_interpolation_end(s: &str, start: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                depth += 1;
                i += 1;
            }
            b'}' => {
                if depth == 0 {
                    return Some(i);
                }
                depth -= 1;
                i += 1;
            }
            b'"' | b'\'' => i = scan_quoted(s, i)?,
            _ => i += 1,
        }
    }
    None
}

/// Splits the body of a double-quoted literal into text and interpolated expressions.
pub fn split_interpolation(body: &str) -> Vec<StrPiece<'_>> {
    let bytes = body.as_bytes();
    let mut out = Vec::new();
    let mut lit_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'#' if bytes.get(i + 1) == Some(&b'{') => {
                let Some(end) = find_interpolation_end(body, i + 2) else {
                    break;
                };
                if lit_start < i {
                    out.push(StrPiece::Lit(&body[lit_start..i]));
                }
                out.push(StrPiece::Expr(&body[i + 2..end], i + 2));
                i = end + 1;
                lit_start = i;
            }
            _ => i += 1,
        }
    }
    if lit_start < body.len() {
        out.push(StrPiece::Lit(&body[lit_start.min(body.len())..]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_quoted_escapes_keep_raw_bytes() {
        assert_eq!(unescape_double(r"a\tb\x00\xff"), b"a\tb\x00\xff".to_vec());
        assert_eq!(unescape_double(r"\u{263a}"), "\u{263a}".as_bytes().to_vec());
        assert_eq!(unescape_double(r"\q"), b"q".to_vec());
    }

    #[test]
    fn single_quoted_only_unescapes_quote_and_backslash() {
        assert_eq!(unescape_single(r"it\'s \n"), br"it's \n".to_vec());
    }

    #[test]
    fn interpolation_respects_nested_braces_and_strings() {
        let pieces = split_interpolation(r#"a #{h["}"] + {x: 1}[:x]} b"#);
        assert_eq!(pieces.len(), 3, "{pieces:?}");
        assert!(matches!(pieces[1], StrPiece::Expr(e, 4) if e == r#"h["}"] + {x: 1}[:x]"#));
        assert_eq!(pieces[2], StrPiece::Lit(" b"));
    }
}
