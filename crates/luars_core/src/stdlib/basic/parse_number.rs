use crate::lua_value::LuaNumber;

/// C `isspace` in the "C" locale
#[inline]
fn is_lua_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

fn trim_lua_space(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|&c| !is_lua_space(c)).unwrap_or(s.len());
    let end = s.iter().rposition(|&c| !is_lua_space(c)).map_or(start, |p| p + 1);
    &s[start..end]
}

fn split_sign(s: &[u8]) -> (bool, &[u8]) {
    match s.first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    }
}

#[inline]
fn hex_value(c: u8) -> Option<u32> {
    (c as char).to_digit(16)
}

/// Convert a Lua numeric literal (as accepted by `tonumber` and string coercion).
/// Surrounding whitespace is ignored; anything else left over rejects the text.
pub fn parse_lua_number(s: &[u8]) -> Option<LuaNumber> {
    let s = trim_lua_space(s);
    if s.is_empty() {
        return None;
    }

    let (neg, body) = split_sign(s);
    if body.len() >= 2 && body[0] == b'0' && (body[1] == b'x' || body[1] == b'X') {
        return parse_hex(&body[2..], neg);
    }

    parse_decimal(s)
}

fn parse_hex(s: &[u8], neg: bool) -> Option<LuaNumber> {
    // Plain hex integer wraps around modulo 2^64
    if !s.is_empty() && s.iter().all(|c| c.is_ascii_hexdigit()) {
        let mut acc: u64 = 0;
        for &c in s {
            acc = acc.wrapping_mul(16).wrapping_add(hex_value(c)? as u64);
        }
        let i = acc as i64;
        return Some(LuaNumber::Int(if neg { i.wrapping_neg() } else { i }));
    }

    parse_hex_float(s).map(|f| LuaNumber::Float(if neg { -f } else { f }))
}

/// `H*[.H*][p[+-]D+]` with at least one hex digit and a `.` or `p` present.
fn parse_hex_float(s: &[u8]) -> Option<f64> {
    let mut mantissa: u64 = 0;
    let mut exp: i64 = 0;
    let mut sticky = false;
    let mut any_digit = false;
    let mut seen_dot = false;
    let mut i = 0;

    while i < s.len() {
        let c = s[i];
        if c == b'.' {
            if seen_dot {
                return None;
            }
            seen_dot = true;
        } else if let Some(d) = hex_value(c) {
            any_digit = true;
            if mantissa < (1u64 << 60) {
                mantissa = mantissa * 16 + d as u64;
                if seen_dot {
                    exp -= 4;
                }
            } else {
                // mantissa is full, remember dropped bits for rounding
                sticky |= d != 0;
                if !seen_dot {
                    exp += 4;
                }
            }
        } else {
            break;
        }
        i += 1;
    }

    if !any_digit {
        return None;
    }

    if i < s.len() {
        if s[i] != b'p' && s[i] != b'P' {
            return None;
        }
        let (exp_neg, digits) = split_sign(&s[i + 1..]);
        if digits.is_empty() || !digits.iter().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let mut e: i64 = 0;
        for &c in digits {
            // saturate far outside the representable range
            e = (e * 10 + (c - b'0') as i64).min(1 << 20);
        }
        exp += if exp_neg { -e } else { e };
    } else if !seen_dot {
        return None;
    }

    if mantissa == 0 {
        return Some(0.0);
    }
    if sticky {
        mantissa |= 1;
    }
    Some(ldexp(mantissa as f64, exp))
}

/// `x * 2^e` in steps that keep every intermediate product exact
pub(crate) fn ldexp(mut x: f64, mut e: i64) -> f64 {
    const STEP: i64 = 1000;
    while e > STEP {
        x *= pow2(STEP);
        e -= STEP;
        if x.is_infinite() {
            return x;
        }
    }
    while e < -STEP {
        x *= pow2(-STEP);
        e += STEP;
        if x == 0.0 {
            return x;
        }
    }
    x * pow2(e)
}

#[inline]
fn pow2(e: i64) -> f64 {
    debug_assert!((-1022..=1023).contains(&e));
    f64::from_bits(((e + 1023) as u64) << 52)
}

/// `[+-]D*[.D*][(e|E)[+-]D+]` with at least one mantissa digit
fn is_decimal_literal(s: &[u8]) -> bool {
    let (_, s) = split_sign(s);
    let mut i = 0;
    let mut digits = 0;
    while i < s.len() && s[i].is_ascii_digit() {
        i += 1;
        digits += 1;
    }
    if i < s.len() && s[i] == b'.' {
        i += 1;
        while i < s.len() && s[i].is_ascii_digit() {
            i += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return false;
    }
    if i < s.len() && (s[i] == b'e' || s[i] == b'E') {
        let (_, exp) = split_sign(&s[i + 1..]);
        return !exp.is_empty() && exp.iter().all(|c| c.is_ascii_digit());
    }
    i == s.len()
}

fn parse_decimal(s: &[u8]) -> Option<LuaNumber> {
    if !is_decimal_literal(s) {
        return None;
    }
    // validated above, so the text is plain ASCII
    let text = std::str::from_utf8(s).ok()?;

    let is_integer_form = !s.iter().any(|&c| matches!(c, b'.' | b'e' | b'E'));
    if is_integer_form {
        // overflowing decimal integers become floats
        if let Ok(i) = text.parse::<i64>() {
            return Some(LuaNumber::Int(i));
        }
    }

    text.parse::<f64>().ok().map(LuaNumber::Float)
}

/// `tonumber(s, base)`: optionally signed digits of `base` (2..=36), wrapping modulo 2^64.
pub fn parse_lua_number_base(s: &[u8], base: u32) -> Option<LuaNumber> {
    debug_assert!((2..=36).contains(&base));
    let s = trim_lua_space(s);
    let (neg, digits) = split_sign(s);
    if digits.is_empty() {
        return None;
    }

    let mut acc: u64 = 0;
    for &c in digits {
        let d = (c as char).to_digit(36)?;
        if d >= base {
            return None;
        }
        acc = acc.wrapping_mul(base as u64).wrapping_add(d as u64);
    }

    let i = acc as i64;
    Some(LuaNumber::Int(if neg { i.wrapping_neg() } else { i }))
}
