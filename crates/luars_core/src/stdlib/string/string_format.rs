// string.format implementation
// printf-style directives with Lua/C numeric conventions, byte-string output.

use crate::lua_value::{LuaNumber, LuaValue};
use crate::lua_vm::lua_limits::{DEFAULT_FLOAT_PRECISION, MAX_FORMAT_DIGITS, MAX_FORMAT_FIELD};
use crate::lua_vm::{LuaError, LuaResult};
use crate::stdlib::basic::parse_number::parse_lua_number;

const FLAG_MINUS: u8 = 1;
const FLAG_PLUS: u8 = 2;
const FLAG_ZERO: u8 = 4;
const FLAG_HASH: u8 = 8;
const FLAG_SPACE: u8 = 16;

/// One parsed `%...` directive
#[derive(Debug, Clone, Copy)]
struct FormatSpec {
    flags: u8,
    /// -1 until resolved from a `*` argument
    width: i64,
    has_prec: bool,
    /// -1 until resolved from a `*` argument
    prec: i64,
    conversion: u8,
}

impl FormatSpec {
    #[inline]
    fn has(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    fn has_modifiers(&self) -> bool {
        self.flags != 0 || self.width != 0 || self.has_prec
    }
}

/// `invalid conversion '%...' to 'format'` quoting the directive that starts at `start`
fn invalid_conversion(fmt: &[u8], start: usize) -> LuaError {
    let body = fmt[start..]
        .iter()
        .position(|c| !b"-+ #0123456789.*hlL".contains(c))
        .map_or(fmt.len(), |p| (start + p + 1).min(fmt.len()));
    LuaError::Format(format!(
        "invalid conversion '%{}' to 'format'",
        String::from_utf8_lossy(&fmt[start..body])
    ))
}

/// Read a run of decimal digits; `None` when it is longer than `MAX_FORMAT_DIGITS`.
fn read_digits(fmt: &[u8], i: &mut usize) -> Option<i64> {
    let begin = *i;
    let mut value: i64 = 0;
    while *i < fmt.len() && fmt[*i].is_ascii_digit() {
        value = value * 10 + (fmt[*i] - b'0') as i64;
        *i += 1;
        if *i - begin > MAX_FORMAT_DIGITS {
            return None;
        }
    }
    Some(value)
}

/// Parse the directive body starting after `%`; returns the spec and the index
/// of its conversion byte.
fn parse_spec(fmt: &[u8], start: usize) -> LuaResult<(FormatSpec, usize)> {
    let mut i = start;
    let mut flags = 0;
    while i < fmt.len() {
        match fmt[i] {
            b'-' => flags |= FLAG_MINUS,
            b'+' => flags |= FLAG_PLUS,
            b'0' => flags |= FLAG_ZERO,
            b'#' => flags |= FLAG_HASH,
            b' ' => flags |= FLAG_SPACE,
            _ => break,
        }
        i += 1;
    }

    let mut width: i64 = 0;
    if i < fmt.len() && fmt[i] == b'*' {
        width = -1;
        i += 1;
    } else {
        width = read_digits(fmt, &mut i).ok_or_else(|| invalid_conversion(fmt, start))?;
    }

    let mut has_prec = false;
    let mut prec: i64 = 0;
    if i < fmt.len() && fmt[i] == b'.' {
        has_prec = true;
        i += 1;
        if i < fmt.len() && fmt[i] == b'*' {
            prec = -1;
            i += 1;
        } else {
            prec = read_digits(fmt, &mut i).ok_or_else(|| invalid_conversion(fmt, start))?;
        }
    }

    // length modifiers are accepted and ignored
    while i < fmt.len() && matches!(fmt[i], b'h' | b'l' | b'L') {
        i += 1;
    }

    if i >= fmt.len() {
        return Err(LuaError::Format(
            "invalid format (missing specifier)".to_string(),
        ));
    }

    Ok((
        FormatSpec {
            flags,
            width,
            has_prec,
            prec,
            conversion: fmt[i],
        },
        i,
    ))
}

/// Argument cursor; argument numbers count the format string as #1
struct FormatArgs<'a> {
    args: &'a [LuaValue],
    next: usize,
}

impl<'a> FormatArgs<'a> {
    fn bad_argument(n: usize, extra: &str) -> LuaError {
        LuaError::Format(format!("bad argument #{} to 'format' ({})", n, extra))
    }

    fn next_arg(&mut self) -> LuaResult<(usize, &'a LuaValue)> {
        let n = self.next + 2;
        match self.args.get(self.next) {
            Some(v) => {
                self.next += 1;
                Ok((n, v))
            }
            None => Err(Self::bad_argument(n, "no value")),
        }
    }

    fn number(&mut self) -> LuaResult<(usize, LuaNumber)> {
        let (n, v) = self.next_arg()?;
        let num = match v {
            LuaValue::Number(num) => *num,
            LuaValue::String(s) => parse_lua_number(s)
                .ok_or_else(|| Self::bad_argument(n, "number expected, got string"))?,
            other => {
                return Err(Self::bad_argument(
                    n,
                    &format!("number expected, got {}", other.type_name()),
                ));
            }
        };
        Ok((n, num))
    }

    fn integer(&mut self) -> LuaResult<i64> {
        let (n, num) = self.number()?;
        num.as_integer()
            .ok_or_else(|| Self::bad_argument(n, "number has no integer representation"))
    }

    fn float(&mut self) -> LuaResult<f64> {
        Ok(self.number()?.1.as_f64())
    }
}

/// `string.format(fmt, ...)`
pub fn format(fmt: &[u8], args: &[LuaValue], max_size: usize) -> LuaResult<Vec<u8>> {
    let mut out = Vec::with_capacity(fmt.len() + 16);
    let mut args = FormatArgs { args, next: 0 };
    let mut i = 0;

    while i < fmt.len() {
        if fmt[i] != b'%' {
            // copy the literal run up to the next '%'
            let j = fmt[i..]
                .iter()
                .position(|&c| c == b'%')
                .map_or(fmt.len(), |p| i + p);
            out.extend_from_slice(&fmt[i..j]);
            i = j;
            continue;
        }

        i += 1;
        if i >= fmt.len() {
            return Err(LuaError::Format(
                "invalid format (ends with '%')".to_string(),
            ));
        }
        if fmt[i] == b'%' {
            out.push(b'%');
            i += 1;
            continue;
        }

        let start = i;
        let (mut spec, end) = parse_spec(fmt, start)?;
        i = end + 1;

        if spec.width == -1 {
            let w = args.integer()?;
            if w < 0 {
                spec.flags |= FLAG_MINUS;
            }
            if w.unsigned_abs() > MAX_FORMAT_FIELD as u64 {
                return Err(invalid_conversion(fmt, start));
            }
            spec.width = w.unsigned_abs() as i64;
        }
        if spec.prec == -1 {
            let p = args.integer()?;
            if p < 0 {
                spec.has_prec = false;
                spec.prec = 0;
            } else if p > MAX_FORMAT_FIELD {
                return Err(invalid_conversion(fmt, start));
            } else {
                spec.prec = p;
            }
        }

        match spec.conversion {
            b'd' | b'i' | b'u' | b'o' | b'x' | b'X' => {
                let v = args.integer()?;
                out.extend_from_slice(format_int(v, &spec).as_bytes());
            }
            b'a' | b'A' => {
                let x = args.float()?;
                out.extend_from_slice(format_hex_float(x, &spec).as_bytes());
            }
            b'f' | b'F' | b'e' | b'E' | b'g' | b'G' => {
                let x = args.float()?;
                out.extend_from_slice(format_float(x, &spec).as_bytes());
            }
            b'c' => {
                let code = args.integer()?;
                pad_bytes(&mut out, &[code as u8], &spec);
            }
            b's' => {
                let (_, v) = args.next_arg()?;
                let mut s = v.to_lua_bytes();
                if spec.has_prec && s.len() > spec.prec as usize {
                    s.truncate(spec.prec as usize);
                }
                pad_bytes(&mut out, &s, &spec);
            }
            b'q' => {
                if spec.has_modifiers() {
                    return Err(LuaError::Format(
                        "specifier '%q' cannot have modifiers".to_string(),
                    ));
                }
                let (_, v) = args.next_arg()?;
                format_quoted(&mut out, v);
            }
            c => {
                return Err(LuaError::Format(format!(
                    "invalid format specifier '{}'",
                    c as char
                )));
            }
        }

        if out.len() > max_size {
            return Err(LuaError::Format("resulting string too large".to_string()));
        }
    }

    Ok(out)
}

// ======================== Padding ========================

/// Pad `s` to the spec width. With `num_pad` and the `0` flag, zeros go after
/// any sign and `0x` prefix.
fn pad(s: String, spec: &FormatSpec, num_pad: bool) -> String {
    let width = spec.width.max(0) as usize;
    if s.len() >= width {
        return s;
    }
    let n = width - s.len();
    if spec.has(FLAG_MINUS) {
        return s + &" ".repeat(n);
    }
    if num_pad && spec.has(FLAG_ZERO) {
        let b = s.as_bytes();
        let mut split = usize::from(matches!(b.first(), Some(b'-' | b'+' | b' ')));
        if b.len() >= split + 2 && b[split] == b'0' && matches!(b[split + 1], b'x' | b'X') {
            split += 2;
        }
        let mut padded = String::with_capacity(width);
        padded.push_str(&s[..split]);
        padded.push_str(&"0".repeat(n));
        padded.push_str(&s[split..]);
        return padded;
    }
    " ".repeat(n) + &s
}

fn pad_bytes(out: &mut Vec<u8>, s: &[u8], spec: &FormatSpec) {
    let width = spec.width.max(0) as usize;
    let n = width.saturating_sub(s.len());
    if !spec.has(FLAG_MINUS) {
        out.resize(out.len() + n, b' ');
    }
    out.extend_from_slice(s);
    if spec.has(FLAG_MINUS) {
        out.resize(out.len() + n, b' ');
    }
}

fn add_sign(s: String, spec: &FormatSpec) -> String {
    if spec.has(FLAG_PLUS) {
        format!("+{}", s)
    } else if spec.has(FLAG_SPACE) {
        format!(" {}", s)
    } else {
        s
    }
}

// ======================== Integers ========================

fn format_int(v: i64, spec: &FormatSpec) -> String {
    let conv = spec.conversion;
    let signed = matches!(conv, b'd' | b'i');
    // unsigned conversions reinterpret negatives as 64-bit unsigned
    let u = if signed { v.unsigned_abs() } else { v as u64 };

    let mut digits = match conv {
        b'o' => format!("{:o}", u),
        b'x' => format!("{:x}", u),
        b'X' => format!("{:X}", u),
        _ => itoa::Buffer::new().format(u).to_string(),
    };

    if spec.has_prec {
        let prec = spec.prec as usize;
        if prec == 0 && v == 0 {
            digits.clear();
        } else if digits.len() < prec {
            digits = "0".repeat(prec - digits.len()) + &digits;
        }
    }

    let mut prefix = "";
    if spec.has(FLAG_HASH) {
        match conv {
            b'o' if !digits.starts_with('0') => prefix = "0",
            b'x' if v != 0 => prefix = "0x",
            b'X' if v != 0 => prefix = "0X",
            _ => {}
        }
    }

    let body = format!("{}{}", prefix, digits);
    let result = if signed && v < 0 {
        format!("-{}", body)
    } else if signed {
        add_sign(body, spec)
    } else {
        body
    };

    // the 0 flag is ignored when a precision is given
    pad(result, spec, !spec.has_prec)
}

// ======================== Floats ========================

fn non_finite(x: f64, upper: bool, spec: &FormatSpec) -> String {
    let s = if x.is_nan() {
        // NaN always reports a sign
        if upper { "-NAN" } else { "-nan" }.to_string()
    } else if x > 0.0 {
        add_sign(if upper { "INF" } else { "inf" }.to_string(), spec)
    } else if upper {
        "-INF".to_string()
    } else {
        "-inf".to_string()
    };
    pad(s, spec, false)
}

/// `d.ddde±XX` for a non-negative finite value
fn fmt_exp(abs: f64, prec: usize) -> String {
    let s = format!("{:.*e}", prec, abs);
    let (mantissa, exp) = s.split_at(s.find('e').unwrap_or(s.len()));
    let exp: i32 = exp.get(1..).and_then(|e| e.parse().ok()).unwrap_or(0);
    format!(
        "{}e{}{:02}",
        mantissa,
        if exp < 0 { '-' } else { '+' },
        exp.unsigned_abs()
    )
}

/// Decimal exponent of `abs` once rounded to `prec + 1` significant digits
fn rounded_exponent(abs: f64, prec: usize) -> i32 {
    let s = format!("{:.*e}", prec, abs);
    s.find('e')
        .and_then(|p| s[p + 1..].parse().ok())
        .unwrap_or(0)
}

fn insert_point(body: &mut String) {
    if body.contains('.') {
        return;
    }
    match body.find(['e', 'E', 'p', 'P']) {
        Some(p) => body.insert(p, '.'),
        None => body.push('.'),
    }
}

fn strip_trailing_zeros(body: String) -> String {
    let exp_at = body.find(['e', 'E']).unwrap_or(body.len());
    let (mantissa, exp) = body.split_at(exp_at);
    if !mantissa.contains('.') {
        return body;
    }
    let trimmed = mantissa.trim_end_matches('0').trim_end_matches('.');
    format!("{}{}", trimmed, exp)
}

/// `%g` body of a non-negative finite value, C threshold rules
pub(crate) fn format_float_g(abs: f64, prec: usize, alt: bool, upper: bool) -> String {
    let p = if prec == 0 { 1 } else { prec };
    let x = rounded_exponent(abs, p - 1);
    let mut body = if x < -4 || x >= p as i32 {
        fmt_exp(abs, p - 1)
    } else {
        format!("{:.*}", (p as i32 - 1 - x) as usize, abs)
    };
    if alt {
        insert_point(&mut body);
    } else {
        body = strip_trailing_zeros(body);
    }
    if upper { body.to_ascii_uppercase() } else { body }
}

fn format_float(x: f64, spec: &FormatSpec) -> String {
    let conv = spec.conversion;
    let upper = conv.is_ascii_uppercase();
    if !x.is_finite() {
        return non_finite(x, upper, spec);
    }

    let neg = x.is_sign_negative();
    let abs = x.abs();
    let prec = if spec.has_prec {
        spec.prec as usize
    } else {
        DEFAULT_FLOAT_PRECISION
    };
    let alt = spec.has(FLAG_HASH);

    let body = match conv.to_ascii_lowercase() {
        b'f' => {
            let mut b = format!("{:.*}", prec, abs);
            if alt {
                insert_point(&mut b);
            }
            b
        }
        b'e' => {
            let mut b = fmt_exp(abs, prec);
            if alt {
                insert_point(&mut b);
            }
            if upper { b.to_ascii_uppercase() } else { b }
        }
        _ => format_float_g(abs, prec, alt, upper),
    };

    let result = if neg {
        format!("-{}", body)
    } else {
        add_sign(body, spec)
    };
    pad(result, spec, true)
}

/// `0xh.hhhp±d` body of a non-negative finite value.
/// Subnormals are normalized so the leading digit is always 1.
fn hex_float_body(abs: f64, spec: &FormatSpec) -> String {
    if abs == 0.0 {
        return match spec.prec {
            p if spec.has_prec && p > 0 => format!("0x0.{}p+0", "0".repeat(p as usize)),
            _ => "0x0p+0".to_string(),
        };
    }

    let bits = abs.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i64;
    let frac = bits & ((1u64 << 52) - 1);
    let (mut mant, exponent) = if biased == 0 {
        let shift = frac.leading_zeros() as i64 - 11;
        (frac << shift, -1022 - shift)
    } else {
        (frac | (1u64 << 52), biased - 1023)
    };

    let digits = if spec.has_prec && (spec.prec as usize) < 13 {
        // round to nearest, ties to even, on the dropped bits
        let keep = spec.prec as u32 * 4;
        let drop = 52 - keep;
        let rem = mant & ((1u64 << drop) - 1);
        let half = 1u64 << (drop - 1);
        mant >>= drop;
        if rem > half || (rem == half && mant & 1 == 1) {
            mant += 1;
        }
        let lead = mant >> keep;
        let fr = mant & ((1u64 << keep) - 1);
        let frac_hex = if keep == 0 {
            String::new()
        } else {
            format!("{:0width$x}", fr, width = spec.prec as usize)
        };
        (lead, frac_hex)
    } else {
        let lead = mant >> 52;
        let mut frac_hex = format!("{:013x}", mant & ((1u64 << 52) - 1));
        if spec.has_prec {
            let want = spec.prec as usize;
            frac_hex.push_str(&"0".repeat(want - 13));
        } else {
            let trimmed = frac_hex.trim_end_matches('0').len();
            frac_hex.truncate(trimmed);
        }
        (lead, frac_hex)
    };

    let (lead, frac_hex) = digits;
    let sign = if exponent >= 0 { "+" } else { "" };
    if frac_hex.is_empty() {
        format!("0x{:x}p{}{}", lead, sign, exponent)
    } else {
        format!("0x{:x}.{}p{}{}", lead, frac_hex, sign, exponent)
    }
}

fn format_hex_float(x: f64, spec: &FormatSpec) -> String {
    let upper = spec.conversion == b'A';
    if !x.is_finite() {
        return non_finite(x, upper, spec);
    }
    let neg = x.is_sign_negative();
    let mut body = hex_float_body(x.abs(), spec);
    if spec.has(FLAG_HASH) {
        insert_point(&mut body);
    }
    if upper {
        body = body.to_ascii_uppercase();
    }
    let result = if neg {
        format!("-{}", body)
    } else {
        add_sign(body, spec)
    };
    pad(result, spec, true)
}

// ======================== %q ========================

fn format_quoted(out: &mut Vec<u8>, v: &LuaValue) {
    match v {
        LuaValue::Nil => out.extend_from_slice(b"nil"),
        LuaValue::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        LuaValue::Number(LuaNumber::Int(i)) => {
            if *i == i64::MIN {
                // "-9223372036854775808" would read back as a float
                out.extend_from_slice(b"0x8000000000000000");
            } else {
                out.extend_from_slice(itoa::Buffer::new().format(*i).as_bytes());
            }
        }
        LuaValue::Number(LuaNumber::Float(f)) => {
            let s = if f.is_nan() {
                "(0/0)".to_string()
            } else if f.is_infinite() {
                if *f > 0.0 { "1e9999" } else { "-1e9999" }.to_string()
            } else {
                let spec = FormatSpec {
                    flags: 0,
                    width: 0,
                    has_prec: false,
                    prec: 0,
                    conversion: b'a',
                };
                format_hex_float(*f, &spec)
            };
            out.extend_from_slice(s.as_bytes());
        }
        LuaValue::String(s) => quote_string(out, s),
    }
}

fn quote_string(out: &mut Vec<u8>, s: &[u8]) {
    out.push(b'"');
    for (i, &c) in s.iter().enumerate() {
        match c {
            b'"' | b'\\' | b'\n' => {
                out.push(b'\\');
                out.push(c);
            }
            _ if c == 0 || c.is_ascii_control() => {
                // a following digit would extend the escape
                let next_is_digit = s.get(i + 1).is_some_and(|n| n.is_ascii_digit());
                let esc = if next_is_digit {
                    format!("\\{:03}", c)
                } else {
                    format!("\\{}", c)
                };
                out.extend_from_slice(esc.as_bytes());
            }
            _ => out.push(c),
        }
    }
    out.push(b'"');
}
