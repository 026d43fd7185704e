//! Number and literal formatting.

/// `Integer#to_s`.
pub fn int_to_s(i: i64) -> String {
    itoa::Buffer::new().format(i).to_string()
}

/// `Integer#to_s(base)` for bases 2 through 36.
pub fn int_to_s_radix(i: i64, base: u32) -> String {
    if base == 10 {
        return int_to_s(i);
    }
    let mut n = i.unsigned_abs() as u128;
    let mut digits = Vec::new();
    loop {
        let d = (n % base as u128) as u32;
        digits.push(std::char::from_digit(d, base).unwrap_or('?'));
        n /= base as u128;
        if n == 0 {
            break;
        }
    }
    if i < 0 {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

/// Shortest round-trip digits of `|f|` and the decimal point position:
/// `f = 0.DIGITS * 10^decpt`.
fn decimal_digits(f: f64) -> (String, i32) {
    let mut buf = ryu::Buffer::new();
    let s = buf.format_finite(f.abs());
    let (mant, exp) = match s.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (s, 0),
    };
    let (int_part, frac_part) = mant.split_once('.').unwrap_or((mant, ""));
    let mut digits = String::with_capacity(int_part.len() + frac_part.len());
    digits.push_str(int_part);
    digits.push_str(frac_part);
    let mut decpt = int_part.len() as i32 + exp;
    let lead = digits.len() - digits.trim_start_matches('0').len();
    digits.drain(..lead);
    decpt -= lead as i32;
    let keep = digits.trim_end_matches('0').len();
    digits.truncate(keep);
    if digits.is_empty() {
        return ("0".to_string(), 1);
    }
    (digits, decpt)
}

/// `Float#to_s`: fixed notation for `1e-4 <= |f| < 1e16`, otherwise `1.0e+20` style.
pub fn float_to_s(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let (digits, decpt) = decimal_digits(f);
    let mut out = String::new();
    if f.is_sign_negative() {
        out.push('-');
    }
    if -4 < decpt && decpt <= 16 {
        if decpt <= 0 {
            out.push_str("0.");
            out.extend(std::iter::repeat_n('0', (-decpt) as usize));
            out.push_str(&digits);
        } else if digits.len() <= decpt as usize {
            out.push_str(&digits);
            out.extend(std::iter::repeat_n('0', decpt as usize - digits.len()));
            out.push_str(".0");
        } else {
            let (a, b) = digits.split_at(decpt as usize);
            out.push_str(a);
            out.push('.');
            out.push_str(b);
        }
    } else {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        out.push('.');
        out.push_str(if rest.is_empty() { "0" } else { rest });
        out.push_str(&format!("e{:+03}", decpt - 1));
    }
    out
}

/// Double-quoted `String#inspect` body.
pub fn inspect_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    let text = String::from_utf8_lossy(bytes);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\x1b' => out.push_str("\\e"),
            '\0' => out.push_str("\\0"),
            '#' if matches!(chars.peek(), Some('{' | '$' | '@')) => out.push_str("\\#"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Whether `:name` needs no quoting.
fn is_plain_symbol(name: &str) -> bool {
    const OPERATORS: &[&str] = &[
        "+", "-", "*", "/", "%", "**", "==", "===", "!=", "<", "<=", ">", ">=", "<=>", "<<",
        ">>", "!", "[]", "[]=", "&", "|", "^", "~", "+@", "-@", "=~",
    ];
    if OPERATORS.contains(&name) {
        return true;
    }
    let body = name
        .strip_prefix("@@")
        .or_else(|| name.strip_prefix('@'))
        .or_else(|| name.strip_prefix('$'))
        .unwrap_or(name);
    let body = body
        .strip_suffix(['?', '!', '='])
        .unwrap_or(body);
    let mut chars = body.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// `Symbol#inspect`.
pub fn inspect_symbol(name: &str) -> String {
    if is_plain_symbol(name) {
        format!(":{name}")
    } else {
        format!(":{}", inspect_bytes(name.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_render_like_ruby() {
        assert_eq!(float_to_s(1.0), "1.0");
        assert_eq!(float_to_s(-2.5), "-2.5");
        assert_eq!(float_to_s(0.1), "0.1");
        assert_eq!(float_to_s(0.0001), "0.0001");
        assert_eq!(float_to_s(0.00001), "1.0e-05");
        assert_eq!(float_to_s(1e15), "1000000000000000.0");
        assert_eq!(float_to_s(1e16), "1.0e+16");
        assert_eq!(float_to_s(1.5e20), "1.5e+20");
        assert_eq!(float_to_s(f64::INFINITY), "Infinity");
        assert_eq!(float_to_s(f64::NAN), "NaN");
        assert_eq!(float_to_s(-0.0), "-0.0");
    }

    #[test]
    fn radix() {
        assert_eq!(int_to_s_radix(255, 16), "ff");
        assert_eq!(int_to_s_radix(-5, 2), "-101");
        assert_eq!(int_to_s_radix(0, 8), "0");
    }

    #[test]
    fn symbols_quote_when_needed() {
        assert_eq!(inspect_symbol("foo"), ":foo");
        assert_eq!(inspect_symbol("empty?"), ":empty?");
        assert_eq!(inspect_symbol("<=>"), ":<=>");
        assert_eq!(inspect_symbol("a b"), ":\"a b\"");
    }

    #[test]
    fn strings_escape() {
        assert_eq!(inspect_bytes(b"a\"b\n"), "\"a\\\"b\\n\"");
        assert_eq!(inspect_bytes(b"#{x}"), "\"\\#{x}\"");
    }
}
