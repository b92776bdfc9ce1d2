// Math library helpers that live in the numeric model
// Implements: abs, ceil, floor, fmod, max, min, modf, tointeger, type, ult
// plus the random generator (see prng.rs)
pub mod prng;

use crate::lua_value::{LuaNumber, LuaValue, float_to_integer};
use crate::lua_vm::{LuaError, LuaResult};
use crate::stdlib::basic::parse_number::parse_lua_number;

pub use prng::Prng;

/// `math.type(x)`: "integer", "float", or `None` for non-numbers
pub fn math_type(value: &LuaValue) -> Option<&'static str> {
    match value {
        LuaValue::Number(LuaNumber::Int(_)) => Some("integer"),
        LuaValue::Number(LuaNumber::Float(_)) => Some("float"),
        _ => None,
    }
}

/// `math.tointeger(x)`: the integer value of `x` when it has one
pub fn tointeger(value: &LuaValue) -> Option<i64> {
    match value {
        LuaValue::Number(n) => n.as_integer(),
        LuaValue::String(s) => parse_lua_number(s).and_then(|n| n.as_integer()),
        _ => None,
    }
}

/// `math.ult(m, n)`: unsigned comparison
#[inline]
pub fn ult(m: i64, n: i64) -> bool {
    (m as u64) < (n as u64)
}

/// Integral floats that fit become integers, others stay floats
fn float_to_lua_int(f: f64) -> LuaNumber {
    match float_to_integer(f) {
        Some(i) => LuaNumber::Int(i),
        None => LuaNumber::Float(f),
    }
}

pub fn floor(n: LuaNumber) -> LuaNumber {
    match n {
        LuaNumber::Int(_) => n,
        LuaNumber::Float(f) => float_to_lua_int(f.floor()),
    }
}

pub fn ceil(n: LuaNumber) -> LuaNumber {
    match n {
        LuaNumber::Int(_) => n,
        LuaNumber::Float(f) => float_to_lua_int(f.ceil()),
    }
}

pub fn abs(n: LuaNumber) -> LuaNumber {
    match n {
        LuaNumber::Int(i) => LuaNumber::Int(i.wrapping_abs()),
        LuaNumber::Float(f) => LuaNumber::Float(f.abs()),
    }
}

/// `math.modf(x)`: integral part rounded toward zero and the fractional part.
/// Integers come back unchanged with a float `0.0`; floats keep a float
/// integral part, and infinities have no fraction.
pub fn modf(n: LuaNumber) -> (LuaNumber, f64) {
    match n {
        LuaNumber::Int(_) => (n, 0.0),
        LuaNumber::Float(f) => {
            let ip = f.trunc();
            let frac = if f == ip { 0.0 } else { f - ip };
            (LuaNumber::Float(ip), frac)
        }
    }
}

/// `math.fmod(a, b)`: C remainder, truncated toward zero
pub fn fmod(a: LuaNumber, b: LuaNumber) -> LuaResult<LuaNumber> {
    match (a, b) {
        (LuaNumber::Int(m), LuaNumber::Int(d)) => {
            if d == 0 {
                return Err(LuaError::bad_argument(2, "fmod", "zero"));
            }
            // d == -1 would overflow for i64::MIN
            if d == -1 {
                return Ok(LuaNumber::Int(0));
            }
            Ok(LuaNumber::Int(m % d))
        }
        _ => Ok(LuaNumber::Float(a.as_f64() % b.as_f64())),
    }
}

fn extreme(
    args: &[LuaNumber],
    fname: &str,
    replaces: fn(&LuaNumber, &LuaNumber) -> bool,
) -> LuaResult<LuaNumber> {
    let (first, rest) = args
        .split_first()
        .ok_or_else(|| LuaError::bad_argument(1, fname, "number expected, got no value"))?;
    let mut best = *first;
    for n in rest {
        if replaces(n, &best) {
            best = *n;
        }
    }
    Ok(best)
}

/// `math.max(...)`: the winning operand keeps its subtype
pub fn max(args: &[LuaNumber]) -> LuaResult<LuaNumber> {
    extreme(args, "max", |n, best| best.less_than(n))
}

/// `math.min(...)`: the winning operand keeps its subtype
pub fn min(args: &[LuaNumber]) -> LuaResult<LuaNumber> {
    extreme(args, "min", |n, best| n.less_than(best))
}
