//! String and Symbol.
//!
//! Strings are byte buffers; lengths and indexes count UTF-8 characters.

use std::rc::Rc;

use crate::core::{BuiltinFn, CallArgs, ProcBody, RProc, RString, Value};
use crate::errors::Unwind;
use crate::format;
use crate::state::State;

use super::{range_span, start_len_span};

type R = Result<Value, Unwind>;

pub(super) fn install(s: &State) {
    let core = s.core().clone();
    s.define_class_builtin(core.string, "new", str_new);
    for (name, f) in [
        ("initialize", str_initialize as BuiltinFn),
        ("+", str_plus),
        ("*", str_times),
        ("%", str_format),
        ("==", str_eq),
        ("===", str_eq),
        ("eql?", str_eq),
        ("<=>", str_cmp),
        ("length", str_length),
        ("size", str_length),
        ("bytesize", str_bytesize),
        ("empty?", str_empty),
        ("to_s", str_to_s),
        ("to_str", str_to_s),
        ("inspect", str_inspect),
        ("dump", str_inspect),
        ("to_sym", str_to_sym),
        ("intern", str_to_sym),
        ("to_i", str_to_i),
        ("to_f", str_to_f),
        ("hex", str_hex),
        ("oct", str_oct),
        ("upcase", str_upcase),
        ("downcase", str_downcase),
        ("capitalize", str_capitalize),
        ("swapcase", str_swapcase),
        ("reverse", str_reverse),
        ("strip", str_strip),
        ("lstrip", str_lstrip),
        ("rstrip", str_rstrip),
        ("chomp", str_chomp),
        ("chop", str_chop),
        ("squeeze", str_squeeze),
        ("succ", str_succ),
        ("next", str_succ),
        ("upcase!", str_upcase_bang),
        ("downcase!", str_downcase_bang),
        ("capitalize!", str_capitalize_bang),
        ("swapcase!", str_swapcase_bang),
        ("reverse!", str_reverse_bang),
        ("strip!", str_strip_bang),
        ("lstrip!", str_lstrip_bang),
        ("rstrip!", str_rstrip_bang),
        ("chomp!", str_chomp_bang),
        ("chop!", str_chop_bang),
        ("squeeze!", str_squeeze_bang),
        ("sub!", str_sub_bang),
        ("gsub!", str_gsub_bang),
        ("chars", str_chars),
        ("each_char", str_each_char),
        ("bytes", str_bytes),
        ("each_byte", str_each_byte),
        ("lines", str_lines),
        ("each_line", str_each_line),
        ("split", str_split),
        ("include?", str_include),
        ("start_with?", str_start_with),
        ("end_with?", str_end_with),
        ("delete_prefix", str_delete_prefix),
        ("delete_suffix", str_delete_suffix),
        ("index", str_index),
        ("rindex", str_rindex),
        ("[]", str_aref),
        ("slice", str_aref),
        ("[]=", str_aset),
        ("sub", str_sub),
        ("gsub", str_gsub),
        ("tr", str_tr),
        ("delete", str_delete),
        ("count", str_count),
        ("scan", str_scan),
        ("replace", str_replace),
        ("<<", str_append),
        ("concat", str_concat),
        ("prepend", str_prepend),
        ("insert", str_insert),
        ("clear", str_clear),
        ("center", str_center),
        ("ljust", str_ljust),
        ("rjust", str_rjust),
        ("ord", str_ord),
        ("casecmp", str_casecmp),
        ("casecmp?", str_casecmp_p),
        ("partition", str_partition),
        ("rpartition", str_rpartition),
        ("force_encoding", str_itself),
        ("b", str_dup),
        ("+@", str_dup),
        ("-@", str_itself),
    ] {
        s.define_builtin(core.string, name, f);
    }

    for (name, f) in [
        ("to_s", sym_to_s as BuiltinFn),
        ("id2name", sym_to_s),
        ("name", sym_to_s),
        ("to_sym", str_itself),
        ("inspect", sym_inspect),
        ("to_proc", sym_to_proc),
        ("length", sym_length),
        ("size", sym_length),
        ("<=>", sym_cmp),
        ("upcase", sym_upcase),
        ("downcase", sym_downcase),
        ("empty?", sym_empty),
        ("start_with?", sym_start_with),
        ("end_with?", sym_end_with),
        ("[]", sym_aref),
    ] {
        s.define_builtin(core.symbol, name, f);
    }
}

// -------------------------------------------------------------------------
// Character helpers
// -------------------------------------------------------------------------

/// Byte offset of every character start, plus the total length.
fn char_starts(bytes: &[u8]) -> Vec<usize> {
    let mut out: Vec<usize> = bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| (**b & 0xC0) != 0x80)
        .map(|(i, _)| i)
        .collect();
    out.push(bytes.len());
    out
}

fn char_len(bytes: &[u8]) -> usize {
    bytes.iter().filter(|b| (**b & 0xC0) != 0x80).count()
}

fn char_index_of_byte(bytes: &[u8], pos: usize) -> usize {
    char_len(&bytes[..pos])
}

fn split_chars(bytes: &[u8]) -> Vec<Vec<u8>> {
    let starts = char_starts(bytes);
    starts.windows(2).map(|w| bytes[w[0]..w[1]].to_vec()).collect()
}

fn find(hay: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > hay.len() {
        return None;
    }
    if needle.is_empty() {
        return Some(from);
    }
    hay[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn rfind(hay: &[u8], needle: &[u8], upto: usize) -> Option<usize> {
    let upto = upto.min(hay.len());
    if needle.is_empty() {
        return Some(upto);
    }
    (0..=upto)
        .rev()
        .find(|&i| hay.len() >= i + needle.len() && &hay[i..i + needle.len()] == needle)
}

fn recv_str(a: &CallArgs<'_>) -> Rc<RString> {
    match &a.recv {
        Value::Str(r) => r.clone(),
        _ => Rc::new(RString::default()),
    }
}

fn recv_bytes(a: &CallArgs<'_>) -> Vec<u8> {
    recv_str(a).to_vec()
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\x0b' | b'\x0c' | b'\r' | 0)
}

/// Expands a `tr`-style character set such as `a-z` or `^aeiou`.
fn char_set(spec: &str) -> (bool, Vec<char>) {
    let (negate, body) = match spec.strip_prefix('^') {
        Some(rest) if !rest.is_empty() => (true, rest),
        _ => (false, spec),
    };
    let cs: Vec<char> = body.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < cs.len() {
        if i + 2 < cs.len() && cs[i + 1] == '-' && cs[i] <= cs[i + 2] {
            out.extend(cs[i]..=cs[i + 2]);
            i += 3;
        } else {
            out.push(cs[i]);
            i += 1;
        }
    }
    (negate, out)
}

fn in_set(set: &(bool, Vec<char>), c: char) -> bool {
    set.1.contains(&c) != set.0
}

// -------------------------------------------------------------------------
// Construction, comparison and conversion
// -------------------------------------------------------------------------

fn str_new(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 1)?;
    let bytes = match a.args.first() {
        Some(v) => s.str_arg(v)?,
        None => Vec::new(),
    };
    Ok(Value::str(bytes))
}

fn str_initialize(_s: &State, _a: &CallArgs<'_>) -> R {
    Ok(Value::Nil)
}

fn str_itself(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(a.recv.clone())
}

fn str_dup(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::str(recv_bytes(a)))
}

fn str_plus(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let mut out = recv_bytes(a);
    out.extend_from_slice(&s.str_arg(&a.args[0])?);
    Ok(Value::str(out))
}

fn str_times(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let n = s.int_arg(&a.args[0])?;
    if n < 0 {
        return Err(s.arg_error("negative argument"));
    }
    Ok(Value::str(recv_bytes(a).repeat(n as usize)))
}

fn str_format(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let args = match &a.args[0] {
        Value::Array(items) => items.to_vec(),
        other => vec![other.clone()],
    };
    Ok(Value::str(super::sprintf(s, &recv_bytes(a), &args)?))
}

fn str_eq(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(match a.args.first() {
        Some(Value::Str(other)) => recv_str(a).with(|x| other.with(|y| x == y)),
        _ => false,
    }))
}

fn str_cmp(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(match a.args.first() {
        Some(Value::Str(other)) => {
            Value::Int(recv_str(a).with(|x| other.with(|y| x.cmp(y))) as i64)
        }
        _ => Value::Nil,
    })
}

fn str_casecmp(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let Value::Str(other) = &a.args[0] else {
        return Ok(Value::Nil);
    };
    let x = recv_bytes(a).to_ascii_lowercase();
    let y = other.to_vec().to_ascii_lowercase();
    Ok(Value::Int(x.cmp(&y) as i64))
}

fn str_casecmp_p(s: &State, a: &CallArgs<'_>) -> R {
    Ok(match str_casecmp(s, a)? {
        Value::Int(n) => Value::Bool(n == 0),
        other => other,
    })
}

fn str_length(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Int(recv_str(a).with(char_len) as i64))
}

fn str_bytesize(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Int(recv_str(a).len() as i64))
}

fn str_empty(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(recv_str(a).is_empty()))
}

fn str_to_s(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(a.recv.clone())
}

fn str_inspect(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::str(recv_str(a).with(format::inspect_bytes)))
}

fn str_to_sym(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Sym(s.intern(&recv_str(a).to_string_lossy())))
}

/// Leading integer in `radix`; trailing garbage is ignored.
fn parse_int_prefix(text: &str, radix: u32) -> i64 {
    let t = text.trim_start();
    let (neg, mut body) = match t.as_bytes().first() {
        Some(b'-') => (true, &t[1..]),
        Some(b'+') => (false, &t[1..]),
        _ => (false, t),
    };
    let lower = body.to_ascii_lowercase();
    let prefix = match radix {
        16 => Some("0x"),
        2 => Some("0b"),
        8 => Some("0o"),
        _ => None,
    };
    if let Some(p) = prefix {
        if lower.starts_with(p) {
            body = &body[2..];
        }
    }
    let mut n: i64 = 0;
    let mut last_underscore = true;
    for c in body.chars() {
        if c == '_' && !last_underscore {
            last_underscore = true;
            continue;
        }
        let Some(d) = c.to_digit(radix) else {
            break;
        };
        last_underscore = false;
        n = n.saturating_mul(radix as i64).saturating_add(d as i64);
    }
    if neg { -n } else { n }
}

fn str_to_i(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 1)?;
    let base = match a.args.first() {
        Some(v) => s.int_arg(v)?,
        None => 10,
    };
    if !(2..=36).contains(&base) {
        return Err(s.arg_error(format!("invalid radix {base}")));
    }
    Ok(Value::Int(parse_int_prefix(&recv_str(a).to_string_lossy(), base as u32)))
}

fn str_hex(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Int(parse_int_prefix(&recv_str(a).to_string_lossy(), 16)))
}

fn str_oct(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Int(parse_int_prefix(&recv_str(a).to_string_lossy(), 8)))
}

/// Longest prefix that parses as a float.
pub(crate) fn parse_float_prefix(text: &str) -> f64 {
    let t: String = text.trim_start().chars().filter(|c| *c != '_').collect();
    let bytes = t.as_bytes();
    let mut end = 0;
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i = 1;
    }
    let digits = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };
    let j = digits(i);
    if j > i {
        end = j;
        i = j;
        if bytes.get(i) == Some(&b'.') {
            let k = digits(i + 1);
            if k > i + 1 {
                end = k;
                i = k;
            }
        }
        if matches!(bytes.get(i), Some(b'e' | b'E')) {
            let mut k = i + 1;
            if matches!(bytes.get(k), Some(b'+' | b'-')) {
                k += 1;
            }
            let m = digits(k);
            if m > k {
                end = m;
            }
        }
    }
    t[..end].parse().unwrap_or(0.0)
}

fn str_to_f(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Float(parse_float_prefix(&recv_str(a).to_string_lossy())))
}

fn str_ord(s: &State, a: &CallArgs<'_>) -> R {
    match recv_str(a).to_string_lossy().chars().next() {
        Some(c) => Ok(Value::Int(c as i64)),
        None => Err(s.arg_error("empty string")),
    }
}

// -------------------------------------------------------------------------
// Case, whitespace and other transforms
// -------------------------------------------------------------------------

fn upcase(b: &[u8]) -> Vec<u8> {
    String::from_utf8_lossy(b).to_uppercase().into_bytes()
}

fn downcase(b: &[u8]) -> Vec<u8> {
    String::from_utf8_lossy(b).to_lowercase().into_bytes()
}

fn capitalize(b: &[u8]) -> Vec<u8> {
    let text = String::from_utf8_lossy(b);
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => {
            let mut out: String = first.to_uppercase().collect();
            out.push_str(&chars.as_str().to_lowercase());
            out.into_bytes()
        }
        None => Vec::new(),
    }
}

fn swapcase(b: &[u8]) -> Vec<u8> {
    String::from_utf8_lossy(b)
        .chars()
        .flat_map(|c| -> Vec<char> {
            if c.is_uppercase() {
                c.to_lowercase().collect()
            } else {
                c.to_uppercase().collect()
            }
        })
        .collect::<String>()
        .into_bytes()
}

fn reverse(b: &[u8]) -> Vec<u8> {
    split_chars(b).into_iter().rev().flatten().collect()
}

fn lstrip(b: &[u8]) -> Vec<u8> {
    let start = b.iter().position(|c| !is_space(*c)).unwrap_or(b.len());
    b[start..].to_vec()
}

fn rstrip(b: &[u8]) -> Vec<u8> {
    let end = b.iter().rposition(|c| !is_space(*c)).map_or(0, |i| i + 1);
    b[..end].to_vec()
}

fn strip(b: &[u8]) -> Vec<u8> {
    rstrip(&lstrip(b))
}

fn chomp_newline(b: &[u8]) -> Vec<u8> {
    if b.ends_with(b"\r\n") {
        b[..b.len() - 2].to_vec()
    } else if b.ends_with(b"\n") || b.ends_with(b"\r") {
        b[..b.len() - 1].to_vec()
    } else {
        b.to_vec()
    }
}

fn chop(b: &[u8]) -> Vec<u8> {
    if b.ends_with(b"\r\n") {
        return b[..b.len() - 2].to_vec();
    }
    let starts = char_starts(b);
    match starts.len() {
        0 | 1 => Vec::new(),
        n => b[..starts[n - 2]].to_vec(),
    }
}

fn squeeze_with(b: &[u8], set: Option<&(bool, Vec<char>)>) -> Vec<u8> {
    let mut out = String::new();
    let mut prev: Option<char> = None;
    for c in String::from_utf8_lossy(b).chars() {
        if prev == Some(c) && set.is_none_or(|st| in_set(st, c)) {
            continue;
        }
        out.push(c);
        prev = Some(c);
    }
    out.into_bytes()
}

/// `str.succ`: increments the rightmost alphanumeric run with carry.
pub(crate) fn succ_bytes(b: &[u8]) -> Vec<u8> {
    let mut v = b.to_vec();
    if v.is_empty() {
        return v;
    }
    if !v.iter().any(u8::is_ascii_alphanumeric) {
        let mut i = v.len();
        loop {
            if i == 0 {
                v.insert(0, 1);
                return v;
            }
            i -= 1;
            if v[i] == u8::MAX {
                v[i] = 0;
            } else {
                v[i] += 1;
                return v;
            }
        }
    }
    let mut carry = None;
    for i in (0..v.len()).rev() {
        let c = v[i];
        if !c.is_ascii_alphanumeric() {
            continue;
        }
        match c {
            b'z' => {
                v[i] = b'a';
                carry = Some((i, b'a'));
            }
            b'Z' => {
                v[i] = b'A';
                carry = Some((i, b'A'));
            }
            b'9' => {
                v[i] = b'0';
                carry = Some((i, b'1'));
            }
            _ => {
                v[i] += 1;
                return v;
            }
        }
    }
    if let Some((pos, ins)) = carry {
        v.insert(pos, ins);
    }
    v
}

fn transform(a: &CallArgs<'_>, f: fn(&[u8]) -> Vec<u8>) -> R {
    Ok(Value::str(recv_str(a).with(f)))
}

/// In-place variant: returns nil when nothing changed.
fn transform_bang(a: &CallArgs<'_>, f: fn(&[u8]) -> Vec<u8>) -> R {
    let rs = recv_str(a);
    let new = rs.with(f);
    if rs.with(|old| old == new.as_slice()) {
        return Ok(Value::Nil);
    }
    rs.replace(new);
    Ok(a.recv.clone())
}

macro_rules! transforms {
    ($($name:ident, $bang:ident => $f:expr;)*) => {
        $(
            fn $name(_s: &State, a: &CallArgs<'_>) -> R {
                transform(a, $f)
            }

            fn $bang(_s: &State, a: &CallArgs<'_>) -> R {
                transform_bang(a, $f)
            }
        )*
    };
}

transforms! {
    str_upcase, str_upcase_bang => upcase;
    str_downcase, str_downcase_bang => downcase;
    str_capitalize, str_capitalize_bang => capitalize;
    str_swapcase, str_swapcase_bang => swapcase;
    str_reverse, str_reverse_bang => reverse;
    str_strip, str_strip_bang => strip;
    str_lstrip, str_lstrip_bang => lstrip;
    str_rstrip, str_rstrip_bang => rstrip;
    str_chop, str_chop_bang => chop;
}

fn chomp_value(s: &State, a: &CallArgs<'_>) -> Result<Vec<u8>, Unwind> {
    s.check_args(a, 0, 1)?;
    let b = recv_bytes(a);
    Ok(match a.args.first() {
        None => chomp_newline(&b),
        Some(Value::Nil) => b,
        Some(v) => {
            let suffix = s.str_arg(v)?;
            if suffix.is_empty() {
                let mut out = b;
                while out.ends_with(b"\n") {
                    out = chomp_newline(&out);
                }
                out
            } else if b.ends_with(&suffix) {
                b[..b.len() - suffix.len()].to_vec()
            } else {
                b
            }
        }
    })
}

fn str_chomp(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::str(chomp_value(s, a)?))
}

fn str_chomp_bang(s: &State, a: &CallArgs<'_>) -> R {
    let new = chomp_value(s, a)?;
    let rs = recv_str(a);
    if rs.with(|old| old == new.as_slice()) {
        return Ok(Value::Nil);
    }
    rs.replace(new);
    Ok(a.recv.clone())
}

fn squeeze_value(s: &State, a: &CallArgs<'_>) -> Result<Vec<u8>, Unwind> {
    s.check_args(a, 0, 1)?;
    let set = match a.args.first() {
        Some(v) => Some(char_set(&String::from_utf8_lossy(&s.str_arg(v)?))),
        None => None,
    };
    Ok(recv_str(a).with(|b| squeeze_with(b, set.as_ref())))
}

fn str_squeeze(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::str(squeeze_value(s, a)?))
}

fn str_squeeze_bang(s: &State, a: &CallArgs<'_>) -> R {
    let new = squeeze_value(s, a)?;
    let rs = recv_str(a);
    if rs.with(|old| old == new.as_slice()) {
        return Ok(Value::Nil);
    }
    rs.replace(new);
    Ok(a.recv.clone())
}

fn str_succ(_s: &State, a: &CallArgs<'_>) -> R {
    transform(a, succ_bytes)
}

// -------------------------------------------------------------------------
// Iteration and splitting
// -------------------------------------------------------------------------

fn yield_each(s: &State, a: &CallArgs<'_>, items: Vec<Value>) -> R {
    match a.block {
        Some(blk) => {
            for v in items {
                s.yield_block(blk, &[v])?;
            }
            Ok(a.recv.clone())
        }
        None => Ok(Value::array(items)),
    }
}

fn char_values(a: &CallArgs<'_>) -> Vec<Value> {
    recv_str(a).with(split_chars).into_iter().map(Value::str).collect()
}

fn str_chars(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::array(char_values(a)))
}

fn str_each_char(s: &State, a: &CallArgs<'_>) -> R {
    yield_each(s, a, char_values(a))
}

fn byte_values(a: &CallArgs<'_>) -> Vec<Value> {
    recv_bytes(a).into_iter().map(|b| Value::Int(b as i64)).collect()
}

fn str_bytes(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::array(byte_values(a)))
}

fn str_each_byte(s: &State, a: &CallArgs<'_>) -> R {
    yield_each(s, a, byte_values(a))
}

fn line_values(a: &CallArgs<'_>) -> Vec<Value> {
    let b = recv_bytes(a);
    b.split_inclusive(|c| *c == b'\n').map(|l| Value::str(l.to_vec())).collect()
}

fn str_lines(_s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::array(line_values(a)))
}

fn str_each_line(s: &State, a: &CallArgs<'_>) -> R {
    yield_each(s, a, line_values(a))
}

fn str_split(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 0, 2)?;
    let b = recv_bytes(a);
    let limit = match a.args.get(1) {
        Some(v) => s.int_arg(v)?,
        None => 0,
    };
    let sep = match a.args.first() {
        None | Some(Value::Nil) => None,
        Some(v) => Some(s.str_arg(v)?),
    };
    let max = if limit > 0 { limit as usize } else { usize::MAX };
    let mut fields: Vec<Vec<u8>> = Vec::new();
    match sep.as_deref() {
        None | Some(b" ") => {
            let mut rest = lstrip(&b);
            while !rest.is_empty() {
                if fields.len() + 1 == max {
                    fields.push(rest);
                    break;
                }
                let end = rest.iter().position(|c| is_space(*c)).unwrap_or(rest.len());
                fields.push(rest[..end].to_vec());
                rest = lstrip(&rest[end..]);
            }
        }
        Some([]) => {
            let chars = split_chars(&b);
            for (i, c) in chars.iter().enumerate() {
                if fields.len() + 1 == max {
                    fields.push(chars[i..].concat());
                    break;
                }
                fields.push(c.clone());
            }
        }
        Some(sep) => {
            let mut from = 0;
            loop {
                if fields.len() + 1 == max {
                    fields.push(b[from..].to_vec());
                    break;
                }
                match find(&b, sep, from) {
                    Some(p) => {
                        fields.push(b[from..p].to_vec());
                        from = p + sep.len();
                    }
                    None => {
                        fields.push(b[from..].to_vec());
                        break;
                    }
                }
            }
            if b.is_empty() {
                fields.clear();
            }
        }
    }
    if limit == 0 {
        while fields.last().is_some_and(Vec::is_empty) {
            fields.pop();
        }
    }
    Ok(Value::array(fields.into_iter().map(Value::str).collect()))
}

fn str_scan(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let pat = s.str_arg(&a.args[0])?;
    let b = recv_bytes(a);
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(p) = find(&b, &pat, from) {
        found.push(Value::str(pat.clone()));
        from = p + pat.len().max(1);
    }
    yield_each(s, a, found)
}

// -------------------------------------------------------------------------
// Searching and slicing
// -------------------------------------------------------------------------

fn str_include(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let needle = s.str_arg(&a.args[0])?;
    Ok(Value::Bool(find(&recv_bytes(a), &needle, 0).is_some()))
}

fn str_start_with(s: &State, a: &CallArgs<'_>) -> R {
    let b = recv_bytes(a);
    for v in a.args {
        if b.starts_with(&s.str_arg(v)?) {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn str_end_with(s: &State, a: &CallArgs<'_>) -> R {
    let b = recv_bytes(a);
    for v in a.args {
        if b.ends_with(&s.str_arg(v)?) {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn str_delete_prefix(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let b = recv_bytes(a);
    let p = s.str_arg(&a.args[0])?;
    Ok(Value::str(b.strip_prefix(p.as_slice()).unwrap_or(&b).to_vec()))
}

fn str_delete_suffix(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let b = recv_bytes(a);
    let p = s.str_arg(&a.args[0])?;
    Ok(Value::str(b.strip_suffix(p.as_slice()).unwrap_or(&b).to_vec()))
}

fn char_offset(s: &State, b: &[u8], v: Option<&Value>, default: usize) -> Result<Option<usize>, Unwind> {
    let starts = char_starts(b);
    let n = starts.len() as i64 - 1;
    let i = match v {
        Some(v) => s.int_arg(v)?,
        None => return Ok(Some(default.min(b.len()))),
    };
    let i = if i < 0 { i + n } else { i };
    if i < 0 || i > n {
        return Ok(None);
    }
    Ok(Some(starts[i as usize]))
}

fn str_index(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 2)?;
    let b = recv_bytes(a);
    let needle = s.str_arg(&a.args[0])?;
    let Some(from) = char_offset(s, &b, a.args.get(1), 0)? else {
        return Ok(Value::Nil);
    };
    Ok(find(&b, &needle, from).map_or(Value::Nil, |p| Value::Int(char_index_of_byte(&b, p) as i64)))
}

fn str_rindex(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 2)?;
    let b = recv_bytes(a);
    let needle = s.str_arg(&a.args[0])?;
    let Some(upto) = char_offset(s, &b, a.args.get(1), b.len())? else {
        return Ok(Value::Nil);
    };
    Ok(rfind(&b, &needle, upto).map_or(Value::Nil, |p| Value::Int(char_index_of_byte(&b, p) as i64)))
}

/// Byte span selected by `[]`-style arguments.
fn select_span(s: &State, b: &[u8], args: &[Value]) -> Result<Option<(usize, usize)>, Unwind> {
    let starts = char_starts(b);
    let n = starts.len() - 1;
    let to_bytes = |span: Option<(usize, usize)>| {
        span.map(|(start, count)| (starts[start], starts[start + count]))
    };
    match args {
        [Value::Range(r)] => Ok(to_bytes(range_span(s, r, n)?)),
        [Value::Str(sub)] => {
            let needle = sub.to_vec();
            Ok(find(b, &needle, 0).map(|p| (p, p + needle.len())))
        }
        [i] => {
            let i = s.int_arg(i)?;
            let i = if i < 0 { i + n as i64 } else { i };
            if i < 0 || i >= n as i64 {
                return Ok(None);
            }
            Ok(to_bytes(Some((i as usize, 1))))
        }
        [start, len] => {
            let (start, len) = (s.int_arg(start)?, s.int_arg(len)?);
            Ok(to_bytes(start_len_span(start, len, n)))
        }
        _ => Err(s.arg_error(crate::core::class::arity_message(args.len(), "1..2"))),
    }
}

fn str_aref(s: &State, a: &CallArgs<'_>) -> R {
    let b = recv_bytes(a);
    Ok(match select_span(s, &b, a.args)? {
        Some((from, to)) => Value::str(b[from..to].to_vec()),
        None => Value::Nil,
    })
}

fn str_aset(s: &State, a: &CallArgs<'_>) -> R {
    let Some((value, index)) = a.args.split_last() else {
        return Err(s.arg_error(crate::core::class::arity_message(0, "2..3")));
    };
    let rs = recv_str(a);
    let b = rs.to_vec();
    let Some((from, to)) = select_span(s, &b, index)? else {
        return Err(s.error(
            s.core().index_error,
            format!("index {} out of string", s.inspect(&index[0])),
        ));
    };
    let mut out = b[..from].to_vec();
    out.extend_from_slice(&s.str_arg(value)?);
    out.extend_from_slice(&b[to..]);
    rs.replace(out);
    Ok(value.clone())
}

/// Expands `\0`/`\&` in a replacement string to the matched text.
fn expand_replacement(rep: &[u8], matched: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rep.len());
    let mut i = 0;
    while i < rep.len() {
        if rep[i] == b'\\' && i + 1 < rep.len() {
            match rep[i + 1] {
                b'0' | b'&' => {
                    out.extend_from_slice(matched);
                    i += 2;
                    continue;
                }
                b'\\' => {
                    out.push(b'\\');
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }
        out.push(rep[i]);
        i += 1;
    }
    out
}

fn substitute(s: &State, a: &CallArgs<'_>, global: bool) -> Result<Vec<u8>, Unwind> {
    s.check_args(a, 1, 2)?;
    let b = recv_bytes(a);
    let pat = s.str_arg(&a.args[0])?;
    let mut out = Vec::with_capacity(b.len());
    let mut from = 0;
    while let Some(p) = find(&b, &pat, from) {
        out.extend_from_slice(&b[from..p]);
        let matched = &b[p..p + pat.len()];
        let rep = match (a.args.get(1), a.block) {
            (Some(Value::Hash(h)), _) => {
                let v = h.get(&Value::str(matched.to_vec())).unwrap_or(Value::Nil);
                s.to_s_value(&v)?
            }
            (Some(r), _) => expand_replacement(&s.str_arg(r)?, matched),
            (None, Some(blk)) => {
                let v = s.yield_block(blk, &[Value::str(matched.to_vec())])?;
                s.to_s_value(&v)?
            }
            (None, None) => return Err(s.arg_error(crate::core::class::arity_message(1, "2"))),
        };
        out.extend_from_slice(&rep);
        if pat.is_empty() {
            if let Some(c) = split_chars(&b[p..]).first() {
                out.extend_from_slice(c);
                from = p + c.len();
            } else {
                from = b.len() + 1;
            }
        } else {
            from = p + pat.len();
        }
        if !global || from > b.len() {
            break;
        }
    }
    if from <= b.len() {
        out.extend_from_slice(&b[from..]);
    }
    Ok(out)
}

fn str_sub(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::str(substitute(s, a, false)?))
}

fn str_gsub(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::str(substitute(s, a, true)?))
}

fn sub_in_place(s: &State, a: &CallArgs<'_>, global: bool) -> R {
    let new = substitute(s, a, global)?;
    let rs = recv_str(a);
    if rs.with(|old| old == new.as_slice()) {
        return Ok(Value::Nil);
    }
    rs.replace(new);
    Ok(a.recv.clone())
}

fn str_sub_bang(s: &State, a: &CallArgs<'_>) -> R {
    sub_in_place(s, a, false)
}

fn str_gsub_bang(s: &State, a: &CallArgs<'_>) -> R {
    sub_in_place(s, a, true)
}

fn set_arg(s: &State, v: &Value) -> Result<(bool, Vec<char>), Unwind> {
    Ok(char_set(&String::from_utf8_lossy(&s.str_arg(v)?)))
}

fn str_tr(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 2, 2)?;
    let from = set_arg(s, &a.args[0])?;
    let (_, to) = set_arg(s, &a.args[1])?;
    let text = recv_str(a).to_string_lossy();
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if !in_set(&from, c) {
            out.push(c);
            continue;
        }
        let Some(last) = to.last() else {
            continue;
        };
        let mapped = if from.0 {
            *last
        } else {
            let k = from.1.iter().position(|x| *x == c).unwrap_or(0);
            to.get(k).copied().unwrap_or(*last)
        };
        out.push(mapped);
    }
    Ok(Value::str(out))
}

fn str_delete(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, usize::MAX)?;
    let sets = a.args.iter().map(|v| set_arg(s, v)).collect::<Result<Vec<_>, _>>()?;
    let text = recv_str(a).to_string_lossy();
    let out: String = text
        .chars()
        .filter(|c| !sets.iter().all(|st| in_set(st, *c)))
        .collect();
    Ok(Value::str(out))
}

fn str_count(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, usize::MAX)?;
    let sets = a.args.iter().map(|v| set_arg(s, v)).collect::<Result<Vec<_>, _>>()?;
    let text = recv_str(a).to_string_lossy();
    Ok(Value::Int(
        text.chars().filter(|c| sets.iter().all(|st| in_set(st, *c))).count() as i64,
    ))
}

fn partition_at(b: &[u8], at: Option<usize>, sep: &[u8], from_right: bool) -> Value {
    let parts = match at {
        Some(p) => [b[..p].to_vec(), sep.to_vec(), b[p + sep.len()..].to_vec()],
        None if from_right => [Vec::new(), Vec::new(), b.to_vec()],
        None => [b.to_vec(), Vec::new(), Vec::new()],
    };
    Value::array(parts.into_iter().map(Value::str).collect())
}

fn str_partition(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let b = recv_bytes(a);
    let sep = s.str_arg(&a.args[0])?;
    Ok(partition_at(&b, find(&b, &sep, 0), &sep, false))
}

fn str_rpartition(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    let b = recv_bytes(a);
    let sep = s.str_arg(&a.args[0])?;
    Ok(partition_at(&b, rfind(&b, &sep, b.len()), &sep, true))
}

// -------------------------------------------------------------------------
// Mutation and padding
// -------------------------------------------------------------------------

fn str_replace(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    recv_str(a).replace(s.str_arg(&a.args[0])?);
    Ok(a.recv.clone())
}

fn append_one(s: &State, rs: &RString, v: &Value) -> Result<(), Unwind> {
    match v {
        Value::Int(n) => {
            let c = u32::try_from(*n)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| s.error(s.core().range_error, format!("{n} out of char range")))?;
            rs.push_bytes(c.to_string().as_bytes());
        }
        other => rs.push_bytes(&s.str_arg(other)?),
    }
    Ok(())
}

fn str_append(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 1, 1)?;
    append_one(s, &recv_str(a), &a.args[0])?;
    Ok(a.recv.clone())
}

fn str_concat(s: &State, a: &CallArgs<'_>) -> R {
    let rs = recv_str(a);
    let parts = a.args.to_vec();
    for v in &parts {
        append_one(s, &rs, v)?;
    }
    Ok(a.recv.clone())
}

fn str_prepend(s: &State, a: &CallArgs<'_>) -> R {
    let rs = recv_str(a);
    let mut out = Vec::new();
    for v in a.args {
        out.extend_from_slice(&s.str_arg(v)?);
    }
    out.extend_from_slice(&rs.to_vec());
    rs.replace(out);
    Ok(a.recv.clone())
}

fn str_insert(s: &State, a: &CallArgs<'_>) -> R {
    s.check_args(a, 2, 2)?;
    let rs = recv_str(a);
    let b = rs.to_vec();
    let idx = s.int_arg(&a.args[0])?;
    let starts = char_starts(&b);
    let n = starts.len() as i64 - 1;
    let at = if idx < 0 { idx + n + 1 } else { idx };
    if at < 0 || at > n {
        return Err(s.error(s.core().index_error, format!("index {idx} out of string")));
    }
    let pos = starts[at as usize];
    let mut out = b[..pos].to_vec();
    out.extend_from_slice(&s.str_arg(&a.args[1])?);
    out.extend_from_slice(&b[pos..]);
    rs.replace(out);
    Ok(a.recv.clone())
}

fn str_clear(_s: &State, a: &CallArgs<'_>) -> R {
    recv_str(a).replace(Vec::new());
    Ok(a.recv.clone())
}

#[derive(Clone, Copy)]
enum Justify {
    Left,
    Right,
    Center,
}

fn justify(s: &State, a: &CallArgs<'_>, how: Justify) -> R {
    s.check_args(a, 1, 2)?;
    let width = s.int_arg(&a.args[0])?.max(0) as usize;
    let pad = match a.args.get(1) {
        Some(v) => s.str_arg(v)?,
        None => b" ".to_vec(),
    };
    if pad.is_empty() {
        return Err(s.arg_error("zero width padding"));
    }
    let b = recv_bytes(a);
    let len = char_len(&b);
    if width <= len {
        return Ok(Value::str(b));
    }
    let pad_chars = split_chars(&pad);
    let fill = |n: usize| -> Vec<u8> { pad_chars.iter().cycle().take(n).flatten().copied().collect() };
    let total = width - len;
    let (left, right) = match how {
        Justify::Left => (0, total),
        Justify::Right => (total, 0),
        Justify::Center => (total / 2, total - total / 2),
    };
    let mut out = fill(left);
    out.extend_from_slice(&b);
    out.extend_from_slice(&fill(right));
    Ok(Value::str(out))
}

fn str_center(s: &State, a: &CallArgs<'_>) -> R {
    justify(s, a, Justify::Center)
}

fn str_ljust(s: &State, a: &CallArgs<'_>) -> R {
    justify(s, a, Justify::Left)
}

fn str_rjust(s: &State, a: &CallArgs<'_>) -> R {
    justify(s, a, Justify::Right)
}

// -------------------------------------------------------------------------
// Symbol
// -------------------------------------------------------------------------

fn recv_sym_name(s: &State, a: &CallArgs<'_>) -> String {
    match a.recv {
        Value::Sym(sym) => s.sym_name(sym),
        _ => String::new(),
    }
}

fn sym_to_s(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::str(recv_sym_name(s, a)))
}

fn sym_inspect(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::str(format::inspect_symbol(&recv_sym_name(s, a))))
}

fn sym_to_proc(_s: &State, a: &CallArgs<'_>) -> R {
    match a.recv {
        Value::Sym(sym) => Ok(Value::Proc(Rc::new(RProc::internal(ProcBody::Symbol(sym))))),
        ref other => Ok(other.clone()),
    }
}

fn sym_length(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Int(recv_sym_name(s, a).chars().count() as i64))
}

fn sym_cmp(s: &State, a: &CallArgs<'_>) -> R {
    Ok(match a.args.first() {
        Some(Value::Sym(other)) => Value::Int(recv_sym_name(s, a).cmp(&s.sym_name(*other)) as i64),
        _ => Value::Nil,
    })
}

fn sym_upcase(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Sym(s.intern(&recv_sym_name(s, a).to_uppercase())))
}

fn sym_downcase(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Sym(s.intern(&recv_sym_name(s, a).to_lowercase())))
}

fn sym_empty(s: &State, a: &CallArgs<'_>) -> R {
    Ok(Value::Bool(recv_sym_name(s, a).is_empty()))
}

fn sym_start_with(s: &State, a: &CallArgs<'_>) -> R {
    let name = recv_sym_name(s, a);
    for v in a.args {
        if name.as_bytes().starts_with(&s.str_arg(v)?) {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn sym_end_with(s: &State, a: &CallArgs<'_>) -> R {
    let name = recv_sym_name(s, a);
    for v in a.args {
        if name.as_bytes().ends_with(&s.str_arg(v)?) {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn sym_aref(s: &State, a: &CallArgs<'_>) -> R {
    let b = recv_sym_name(s, a).into_bytes();
    Ok(match select_span(s, &b, a.args)? {
        Some((from, to)) => Value::str(b[from..to].to_vec()),
        None => Value::Nil,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn succ_carries() {
        assert_eq!(succ_bytes(b"az"), b"ba");
        assert_eq!(succ_bytes(b"zz"), b"aaa");
        assert_eq!(succ_bytes(b"a9"), b"b0");
        assert_eq!(succ_bytes(b"Zz"), b"AAa");
        assert_eq!(succ_bytes(b"1.9"), b"2.0");
    }

    #[test]
    fn character_sets() {
        let set = char_set("a-c");
        assert_eq!(set.1, vec!['a', 'b', 'c']);
        assert!(in_set(&char_set("^aeiou"), 'x'));
        assert!(!in_set(&char_set("^aeiou"), 'e'));
    }

    #[test]
    fn numeric_prefixes() {
        assert_eq!(parse_int_prefix("  42abc", 10), 42);
        assert_eq!(parse_int_prefix("-1_000", 10), -1000);
        assert_eq!(parse_int_prefix("ff", 16), 255);
        assert_eq!(parse_int_prefix("0xff", 16), 255);
        assert_eq!(parse_int_prefix("abc", 10), 0);
        assert_eq!(parse_float_prefix("3.25kg"), 3.25);
        assert_eq!(parse_float_prefix("1e3"), 1000.0);
        assert_eq!(parse_float_prefix("1."), 1.0);
        assert_eq!(parse_float_prefix("x"), 0.0);
    }

    #[test]
    fn utf8_positions() {
        let b = "héllo".as_bytes();
        assert_eq!(char_len(b), 5);
        assert_eq!(reverse(b), "olléh".as_bytes());
        assert_eq!(chop(b), "héll".as_bytes());
    }
}
