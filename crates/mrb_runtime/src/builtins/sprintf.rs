//! `format` directives.

use crate::core::Value;
use crate::errors::Unwind;
use crate::format;
use crate::state::State;

#[derive(Default)]
struct Spec {
    left: bool,
    zero: bool,
    plus: bool,
    space: bool,
    alt: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

struct Args<'a> {
    list: &'a [Value],
    next: usize,
}

impl Args<'_> {
    fn take(&mut self, s: &State) -> Result<Value, Unwind> {
        let v = self
            .list
            .get(self.next)
            .cloned()
            .ok_or_else(|| s.arg_error("too few arguments"))?;
        self.next += 1;
        Ok(v)
    }
}

fn char_count(bytes: &[u8]) -> usize {
    bytes.iter().filter(|b| (**b & 0xC0) != 0x80).count()
}

fn pad(out: &mut Vec<u8>, body: &[u8], spec: &Spec) {
    let width = spec.width.unwrap_or(0);
    let len = char_count(body);
    if len >= width {
        out.extend_from_slice(body);
        return;
    }
    let fill = width - len;
    if spec.left {
        out.extend_from_slice(body);
        out.resize(out.len() + fill, b' ');
    } else {
        out.resize(out.len() + fill, b' ');
        out.extend_from_slice(body);
    }
}

/// Pads a signed number; zero padding goes between the sign/prefix and digits.
fn pad_number(out: &mut Vec<u8>, sign: &str, prefix: &str, digits: &str, spec: &Spec, zero_ok: bool) {
    let width = spec.width.unwrap_or(0);
    let len = sign.len() + prefix.len() + digits.len();
    if spec.zero && !spec.left && zero_ok && len < width {
        let mut body = String::with_capacity(width);
        body.push_str(sign);
        body.push_str(prefix);
        body.extend(std::iter::repeat_n('0', width - len));
        body.push_str(digits);
        out.extend_from_slice(body.as_bytes());
    } else {
        pad(out, format!("{sign}{prefix}{digits}").as_bytes(), spec);
    }
}

fn sign_of(negative: bool, spec: &Spec) -> &'static str {
    if negative {
        "-"
    } else if spec.plus {
        "+"
    } else if spec.space {
        " "
    } else {
        ""
    }
}

fn int_value(s: &State, v: &Value) -> Result<i64, Unwind> {
    match v {
        Value::Int(i) => Ok(*i),
        Value::Float(f) => match super::numeric::float_to_int(s, f.floor())? {
            Value::Int(i) => Ok(i),
            _ => Ok(0),
        },
        Value::Str(text) => super::kernel::parse_int_strict(&text.to_string_lossy()).ok_or_else(|| {
            s.arg_error(format!(
                "invalid value for Integer(): {}",
                text.with(format::inspect_bytes)
            ))
        }),
        Value::Nil => Err(s.type_error("can't convert nil into Integer")),
        other => Err(s.implicit_conversion(other, "Integer")),
    }
}

fn float_value(s: &State, v: &Value) -> Result<f64, Unwind> {
    match v {
        Value::Str(text) => text
            .to_string_lossy()
            .trim()
            .parse::<f64>()
            .map_err(|_| s.arg_error(format!("invalid value for Float(): {}", text.with(format::inspect_bytes)))),
        Value::Nil => Err(s.type_error("can't convert nil into Float")),
        other => s.float_arg(other),
    }
}

/// `1.5e3` style with a signed, two-digit exponent.
fn exp_notation(f: f64, precision: usize, upper: bool) -> String {
    let raw = format!("{:.*e}", precision, f);
    let (mant, exp) = raw.split_once('e').unwrap_or((&raw, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    let e = if upper { 'E' } else { 'e' };
    format!("{mant}{e}{sign}{:02}", exp.abs())
}

fn strip_fraction_zeros(s: &str) -> String {
    let (mant, exp) = match s.find(['e', 'E']) {
        Some(i) => s.split_at(i),
        None => (s, ""),
    };
    let mant = if mant.contains('.') {
        mant.trim_end_matches('0').trim_end_matches('.')
    } else {
        mant
    };
    format!("{mant}{exp}")
}

fn general(f: f64, precision: usize, alt: bool, upper: bool) -> String {
    let p = precision.max(1);
    if f == 0.0 {
        let body = if alt { format!("{:.*}", p - 1, 0.0) } else { "0".to_string() };
        return body;
    }
    let sci = exp_notation(f, p - 1, false);
    let x: i32 = sci
        .rsplit_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);
    let body = if (p as i32) > x && x >= -4 {
        format!("{:.*}", (p as i32 - 1 - x) as usize, f)
    } else {
        exp_notation(f, p - 1, upper)
    };
    if alt { body } else { strip_fraction_zeros(&body) }
}

fn format_float(out: &mut Vec<u8>, f: f64, conv: u8, spec: &Spec) {
    let sign = sign_of(f.is_sign_negative() && !f.is_nan(), spec);
    if !f.is_finite() {
        let word = if f.is_nan() { "NaN" } else { "Inf" };
        pad_number(out, sign, "", word, spec, false);
        return;
    }
    let a = f.abs();
    let precision = spec.precision.unwrap_or(6);
    let digits = match conv {
        b'f' => format!("{:.*}", precision, a),
        b'e' | b'E' => exp_notation(a, precision, conv == b'E'),
        _ => general(a, precision, spec.alt, conv == b'G'),
    };
    pad_number(out, sign, "", &digits, spec, true);
}

fn format_int(out: &mut Vec<u8>, n: i64, conv: u8, spec: &Spec) {
    let (radix, prefix) = match conv {
        b'x' => (16, "0x"),
        b'X' => (16, "0X"),
        b'o' => (8, "0"),
        b'b' => (2, "0b"),
        b'B' => (2, "0B"),
        _ => (10, ""),
    };
    let mut digits = format::int_to_s_radix(n, radix).trim_start_matches('-').to_string();
    if conv == b'X' {
        digits.make_ascii_uppercase();
    }
    if let Some(p) = spec.precision {
        if digits.len() < p {
            digits = format!("{}{digits}", "0".repeat(p - digits.len()));
        }
    }
    let prefix = if spec.alt && n != 0 { prefix } else { "" };
    pad_number(out, sign_of(n < 0, spec), prefix, &digits, spec, spec.precision.is_none());
}

fn lookup_named(s: &State, args: &Args<'_>, name: &str) -> Result<Value, Unwind> {
    match args.list.first() {
        Some(Value::Hash(h)) => {
            let key = Value::Sym(s.intern(name));
            h.get(&key)
                .ok_or_else(|| s.error(s.core().key_error, format!("key<{name}> not found")))
        }
        _ => Err(s.arg_error("one hash required")),
    }
}

fn parse_flags(fmt: &[u8], i: &mut usize, spec: &mut Spec) {
    while let Some(&f) = fmt.get(*i) {
        match f {
            b'-' => spec.left = true,
            b'0' => spec.zero = true,
            b'+' => spec.plus = true,
            b' ' => spec.space = true,
            b'#' => spec.alt = true,
            _ => break,
        }
        *i += 1;
    }
}

/// Renders `fmt` with `args` the way `Kernel#format` does.
pub(crate) fn sprintf(s: &State, fmt: &[u8], args: &[Value]) -> Result<Vec<u8>, Unwind> {
    let mut out = Vec::with_capacity(fmt.len() + 16);
    let mut args = Args { list: args, next: 0 };
    let mut i = 0;
    while i < fmt.len() {
        let c = fmt[i];
        if c != b'%' {
            out.push(c);
            i += 1;
            continue;
        }
        let start = i;
        i += 1;
        let mut spec = Spec::default();
        let mut named: Option<Value> = None;
        parse_flags(fmt, &mut i, &mut spec);
        if let Some(open @ (b'<' | b'{')) = fmt.get(i).copied() {
            let close = if open == b'<' { b'>' } else { b'}' };
            let Some(len) = fmt[i + 1..].iter().position(|b| *b == close) else {
                return Err(s.arg_error("malformed name - unmatched parenthesis"));
            };
            let name = String::from_utf8_lossy(&fmt[i + 1..i + 1 + len]).into_owned();
            let v = lookup_named(s, &args, &name)?;
            i += len + 2;
            if open == b'{' {
                pad(&mut out, &s.to_s_value(&v)?, &spec);
                continue;
            }
            named = Some(v);
            parse_flags(fmt, &mut i, &mut spec);
        }
        if fmt.get(i) == Some(&b'*') {
            let w = s.int_arg(&args.take(s)?)?;
            if w < 0 {
                spec.left = true;
            }
            spec.width = Some(w.unsigned_abs() as usize);
            i += 1;
        } else {
            let digits_start = i;
            while fmt.get(i).is_some_and(u8::is_ascii_digit) {
                i += 1;
            }
            if i > digits_start {
                spec.width = std::str::from_utf8(&fmt[digits_start..i]).ok().and_then(|t| t.parse().ok());
            }
        }
        if fmt.get(i) == Some(&b'.') {
            i += 1;
            if fmt.get(i) == Some(&b'*') {
                let p = s.int_arg(&args.take(s)?)?;
                spec.precision = usize::try_from(p).ok();
                i += 1;
            } else {
                let digits_start = i;
                while fmt.get(i).is_some_and(u8::is_ascii_digit) {
                    i += 1;
                }
                spec.precision = Some(
                    std::str::from_utf8(&fmt[digits_start..i])
                        .ok()
                        .and_then(|t| t.parse().ok())
                        .unwrap_or(0),
                );
            }
        }
        let Some(&conv) = fmt.get(i) else {
            return Err(s.arg_error("incomplete format specifier; use %% (double %) instead"));
        };
        i += 1;
        if conv == b'%' {
            out.push(b'%');
            continue;
        }
        let mut next = || match named.take() {
            Some(v) => Ok(v),
            None => args.take(s),
        };
        match conv {
            b'd' | b'i' | b'u' | b'x' | b'X' | b'o' | b'b' | b'B' => {
                let n = int_value(s, &next()?)?;
                format_int(&mut out, n, conv, &spec);
            }
            b'f' | b'e' | b'E' | b'g' | b'G' => {
                let f = float_value(s, &next()?)?;
                format_float(&mut out, f, conv, &spec);
            }
            b's' | b'p' => {
                let v = next()?;
                let mut body = if conv == b's' {
                    s.to_s_value(&v)?
                } else {
                    s.inspect_value(&v)?.into_bytes()
                };
                if let Some(p) = spec.precision {
                    let cut = String::from_utf8_lossy(&body).chars().take(p).collect::<String>();
                    body = cut.into_bytes();
                }
                pad(&mut out, &body, &spec);
            }
            b'c' => {
                let body = match next()? {
                    Value::Str(text) => {
                        let t = text.to_string_lossy();
                        t.chars().next().map(String::from).unwrap_or_default()
                    }
                    v => {
                        let n = s.int_arg(&v)?;
                        u32::try_from(n)
                            .ok()
                            .and_then(char::from_u32)
                            .map(String::from)
                            .ok_or_else(|| s.error(s.core().range_error, format!("{n} out of char range")))?
                    }
                };
                pad(&mut out, body.as_bytes(), &spec);
            }
            _ => {
                return Err(s.arg_error(format!(
                    "malformed format string - {}",
                    String::from_utf8_lossy(&fmt[start..i])
                )));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponent_has_two_digits() {
        assert_eq!(exp_notation(12345.678, 2, false), "1.23e+04");
        assert_eq!(exp_notation(0.00012, 1, true), "1.2E-04");
    }

    #[test]
    fn general_picks_notation() {
        assert_eq!(general(100000.0, 6, false, false), "100000");
        assert_eq!(general(1234567.0, 6, false, false), "1.23457e+06");
        assert_eq!(general(0.0001, 6, false, false), "0.0001");
        assert_eq!(general(1.5, 6, false, false), "1.5");
    }
}
