// Lua 5.4 numeric model
// Integers and floats are distinct subtypes of `number`; arithmetic result
// typing follows the reference operators exactly.

use std::fmt;

use crate::lua_vm::lua_limits::LUAI_NUMFFORMAT_PRECISION;
use crate::lua_vm::{LuaError, LuaResult};
use crate::stdlib::string::string_format::format_float_g;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NumericType {
    Int,
    Float,
}

/// A Lua number.
/// `Int(4)` and `Float(4.0)` compare unequal here; use `raw_equal` for Lua equality.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LuaNumber {
    Int(i64),
    Float(f64),
}

/// Binary arithmetic and bitwise operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    IDiv,
    BAnd,
    BOr,
    BXor,
    Shl,
    Shr,
}

impl ArithOp {
    #[inline]
    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            ArithOp::BAnd | ArithOp::BOr | ArithOp::BXor | ArithOp::Shl | ArithOp::Shr
        )
    }

    /// Operators whose result is a float regardless of operand types
    #[inline]
    pub fn forces_float(self) -> bool {
        matches!(self, ArithOp::Div | ArithOp::Pow)
    }
}

/// Classify a host float: non-finite, negative zero and fractional values are floats.
pub fn infer_numeric_type(n: f64) -> NumericType {
    if !n.is_finite() || (n == 0.0 && n.is_sign_negative()) || n.fract() != 0.0 {
        NumericType::Float
    } else {
        NumericType::Int
    }
}

/// Exact float -> integer conversion (C Lua's lua_numbertointeger).
/// `i64::MAX as f64` rounds up to 2^63, which is out of range.
#[inline]
pub fn float_to_integer(f: f64) -> Option<i64> {
    if f >= (i64::MIN as f64) && f < -(i64::MIN as f64) && f == f.floor() {
        Some(f as i64)
    } else {
        None
    }
}

/// Shape a raw host result into a Lua number of the requested subtype.
/// Integer zero is always canonical positive zero; float negative zero survives.
pub fn normalize_arithmetic_result(n: f64, ty: NumericType) -> LuaNumber {
    match ty {
        NumericType::Int => match float_to_integer(n) {
            Some(0) => LuaNumber::Int(0),
            Some(i) => LuaNumber::Int(i),
            None => LuaNumber::Float(n),
        },
        NumericType::Float => LuaNumber::Float(n),
    }
}

/// Subtype of `a op b`: float if either operand is a float or the operator is `/` or `^`.
pub fn result_type(op: ArithOp, a: LuaNumber, b: LuaNumber) -> NumericType {
    if op.forces_float() || a.is_float() || b.is_float() {
        NumericType::Float
    } else {
        NumericType::Int
    }
}

impl LuaNumber {
    #[inline(always)]
    pub fn numeric_type(&self) -> NumericType {
        match self {
            LuaNumber::Int(_) => NumericType::Int,
            LuaNumber::Float(_) => NumericType::Float,
        }
    }

    #[inline(always)]
    pub fn is_integer(&self) -> bool {
        matches!(self, LuaNumber::Int(_))
    }

    #[inline(always)]
    pub fn is_float(&self) -> bool {
        matches!(self, LuaNumber::Float(_))
    }

    #[inline(always)]
    pub fn as_f64(&self) -> f64 {
        match *self {
            LuaNumber::Int(i) => i as f64,
            LuaNumber::Float(f) => f,
        }
    }

    /// Integer value when the number is integral and in range
    #[inline(always)]
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            LuaNumber::Int(i) => Some(i),
            LuaNumber::Float(f) => float_to_integer(f),
        }
    }

    /// Like `as_integer`, but fails with Lua's message instead of truncating
    pub fn to_integer(&self) -> LuaResult<i64> {
        self.as_integer().ok_or_else(LuaError::no_integer_rep)
    }

    /// Lua `==` on numbers: compares mathematical values across subtypes
    pub fn raw_equal(&self, other: &LuaNumber) -> bool {
        match (*self, *other) {
            (LuaNumber::Int(a), LuaNumber::Int(b)) => a == b,
            (LuaNumber::Float(a), LuaNumber::Float(b)) => a == b,
            (LuaNumber::Int(i), LuaNumber::Float(f)) | (LuaNumber::Float(f), LuaNumber::Int(i)) => {
                float_to_integer(f) == Some(i)
            }
        }
    }

    /// Lua `<`, exact across subtypes
    pub fn less_than(&self, other: &LuaNumber) -> bool {
        match (*self, *other) {
            (LuaNumber::Int(a), LuaNumber::Int(b)) => a < b,
            (LuaNumber::Float(a), LuaNumber::Float(b)) => a < b,
            (LuaNumber::Int(i), LuaNumber::Float(f)) => int_lt_float(i, f),
            (LuaNumber::Float(f), LuaNumber::Int(i)) => float_lt_int(f, i),
        }
    }

    /// Lua `tostring` for numbers: integers in decimal, floats as `%.14g`
    /// with `.0` appended when the result would read back as an integer.
    pub fn to_lua_string(&self) -> String {
        match *self {
            LuaNumber::Int(i) => {
                let mut buf = itoa::Buffer::new();
                buf.format(i).to_string()
            }
            LuaNumber::Float(f) => float_to_lua_string(f),
        }
    }
}

impl fmt::Display for LuaNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_lua_string())
    }
}

impl From<i64> for LuaNumber {
    fn from(i: i64) -> Self {
        LuaNumber::Int(i)
    }
}

impl From<f64> for LuaNumber {
    fn from(f: f64) -> Self {
        LuaNumber::Float(f)
    }
}

fn float_to_lua_string(f: f64) -> String {
    if f.is_nan() {
        return "-nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let mut s = String::new();
    if f.is_sign_negative() {
        s.push('-');
    }
    s.push_str(&format_float_g(f.abs(), LUAI_NUMFFORMAT_PRECISION, false, false));
    // looks like an int?
    if s.bytes().all(|b| b == b'-' || b.is_ascii_digit()) {
        s.push_str(".0");
    }
    s
}

fn int_lt_float(i: i64, f: f64) -> bool {
    if f.is_nan() {
        return false;
    }
    // i < f  <=>  i < ceil(f)
    let c = f.ceil();
    if c >= -(i64::MIN as f64) {
        true
    } else if c < i64::MIN as f64 {
        false
    } else {
        i < c as i64
    }
}

fn float_lt_int(f: f64, i: i64) -> bool {
    if f.is_nan() {
        return false;
    }
    // f < i  <=>  floor(f) < i
    let fl = f.floor();
    if fl >= -(i64::MIN as f64) {
        false
    } else if fl < i64::MIN as f64 {
        true
    } else {
        (fl as i64) < i
    }
}

// ======================== Arithmetic ========================

/// Evaluate `a op b` with Lua 5.4 semantics.
pub fn arith(op: ArithOp, a: LuaNumber, b: LuaNumber) -> LuaResult<LuaNumber> {
    if op.is_bitwise() {
        let x = a.to_integer()?;
        let y = b.to_integer()?;
        let r = match op {
            ArithOp::BAnd => x & y,
            ArithOp::BOr => x | y,
            ArithOp::BXor => x ^ y,
            ArithOp::Shl => shift_left(x, y),
            _ => shift_left(x, y.wrapping_neg()),
        };
        return Ok(LuaNumber::Int(r));
    }

    match (result_type(op, a, b), a, b) {
        (NumericType::Int, LuaNumber::Int(x), LuaNumber::Int(y)) => {
            let r = match op {
                ArithOp::Add => x.wrapping_add(y),
                ArithOp::Sub => x.wrapping_sub(y),
                ArithOp::Mul => x.wrapping_mul(y),
                ArithOp::IDiv => int_idiv(x, y)?,
                _ => int_mod(x, y)?,
            };
            Ok(LuaNumber::Int(r))
        }
        _ => {
            let x = a.as_f64();
            let y = b.as_f64();
            let r = match op {
                ArithOp::Add => x + y,
                ArithOp::Sub => x - y,
                ArithOp::Mul => x * y,
                ArithOp::Div => x / y,
                ArithOp::Pow => {
                    if y == 2.0 {
                        x * x
                    } else {
                        x.powf(y)
                    }
                }
                ArithOp::IDiv => (x / y).floor(),
                _ => float_mod(x, y),
            };
            Ok(LuaNumber::Float(r))
        }
    }
}

/// Unary minus
pub fn unm(a: LuaNumber) -> LuaNumber {
    match a {
        LuaNumber::Int(i) => LuaNumber::Int(i.wrapping_neg()),
        LuaNumber::Float(f) => LuaNumber::Float(-f),
    }
}

/// Unary bitwise not
pub fn bnot(a: LuaNumber) -> LuaResult<LuaNumber> {
    Ok(LuaNumber::Int(!a.to_integer()?))
}

/// Logical shift; negative counts shift right, counts past 63 clear everything
#[inline]
pub fn shift_left(x: i64, y: i64) -> i64 {
    if y <= -64 || y >= 64 {
        0
    } else if y >= 0 {
        ((x as u64) << y) as i64
    } else {
        ((x as u64) >> (-y)) as i64
    }
}

/// Floor division on integers (luaV_idiv)
pub fn int_idiv(m: i64, n: i64) -> LuaResult<i64> {
    if n == 0 {
        return Err(LuaError::Arithmetic(
            "attempt to perform 'n//0'".to_string(),
        ));
    }
    if n == -1 {
        return Ok(m.wrapping_neg());
    }
    let q = m / n;
    if (m ^ n) < 0 && m % n != 0 {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

/// Modulo on integers with the sign of the divisor (luaV_mod)
pub fn int_mod(m: i64, n: i64) -> LuaResult<i64> {
    if n == 0 {
        return Err(LuaError::Arithmetic("attempt to perform 'n%0'".to_string()));
    }
    if n == -1 {
        return Ok(0);
    }
    let r = m % n;
    if r != 0 && (r ^ n) < 0 {
        Ok(r + n)
    } else {
        Ok(r)
    }
}

/// Float modulo (luai_nummod): C fmod, then move the result to the divisor's sign
pub fn float_mod(a: f64, b: f64) -> f64 {
    let m = a % b;
    if (m > 0.0 && b < 0.0) || (m < 0.0 && b > 0.0) {
        m + b
    } else {
        m
    }
}
