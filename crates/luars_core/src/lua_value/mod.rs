// Lua 5.4 value vocabulary used by the runtime core
// Strings are byte strings; numbers keep their integer/float subtype.
mod lua_convert;
mod lua_number;

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use lua_convert::{coerce_numeric, coerce_numeric_pair, to_integer, tonumber};
pub use lua_number::{
    ArithOp, LuaNumber, NumericType, arith, bnot, float_mod, float_to_integer, infer_numeric_type,
    int_idiv, int_mod, normalize_arithmetic_result, result_type, shift_left, unm,
};

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LuaValue {
    #[default]
    Nil,
    Boolean(bool),
    Number(LuaNumber),
    String(Vec<u8>),
}

impl LuaValue {
    #[inline(always)]
    pub const fn nil() -> Self {
        LuaValue::Nil
    }

    #[inline(always)]
    pub const fn boolean(b: bool) -> Self {
        LuaValue::Boolean(b)
    }

    #[inline(always)]
    pub const fn integer(i: i64) -> Self {
        LuaValue::Number(LuaNumber::Int(i))
    }

    #[inline(always)]
    pub const fn float(n: f64) -> Self {
        LuaValue::Number(LuaNumber::Float(n))
    }

    #[inline(always)]
    pub fn string(s: impl Into<Vec<u8>>) -> Self {
        LuaValue::String(s.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            LuaValue::Nil => "nil",
            LuaValue::Boolean(_) => "boolean",
            LuaValue::Number(_) => "number",
            LuaValue::String(_) => "string",
        }
    }

    #[inline(always)]
    pub fn is_nil(&self) -> bool {
        matches!(self, LuaValue::Nil)
    }

    /// Lua truthiness: only nil and false are false
    #[inline(always)]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, LuaValue::Nil | LuaValue::Boolean(false))
    }

    #[inline(always)]
    pub fn as_number(&self) -> Option<LuaNumber> {
        match self {
            LuaValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Integer value of an integral number (no string coercion)
    #[inline(always)]
    pub fn as_integer(&self) -> Option<i64> {
        self.as_number().and_then(|n| n.as_integer())
    }

    #[inline(always)]
    pub fn as_float(&self) -> Option<f64> {
        self.as_number().map(|n| n.as_f64())
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            LuaValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Lua `tostring` rendering as bytes
    pub fn to_lua_bytes(&self) -> Vec<u8> {
        match self {
            LuaValue::String(s) => s.clone(),
            other => other.to_string().into_bytes(),
        }
    }
}

impl fmt::Display for LuaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LuaValue::Nil => f.write_str("nil"),
            LuaValue::Boolean(b) => write!(f, "{}", b),
            LuaValue::Number(n) => write!(f, "{}", n),
            LuaValue::String(s) => f.write_str(&String::from_utf8_lossy(s)),
        }
    }
}

impl From<LuaNumber> for LuaValue {
    fn from(n: LuaNumber) -> Self {
        LuaValue::Number(n)
    }
}

impl From<i64> for LuaValue {
    fn from(i: i64) -> Self {
        LuaValue::integer(i)
    }
}

impl From<f64> for LuaValue {
    fn from(n: f64) -> Self {
        LuaValue::float(n)
    }
}

impl From<bool> for LuaValue {
    fn from(b: bool) -> Self {
        LuaValue::Boolean(b)
    }
}

impl From<&str> for LuaValue {
    fn from(s: &str) -> Self {
        LuaValue::String(s.as_bytes().to_vec())
    }
}

impl From<String> for LuaValue {
    fn from(s: String) -> Self {
        LuaValue::String(s.into_bytes())
    }
}

impl From<&[u8]> for LuaValue {
    fn from(s: &[u8]) -> Self {
        LuaValue::String(s.to_vec())
    }
}

impl From<Vec<u8>> for LuaValue {
    fn from(s: Vec<u8>) -> Self {
        LuaValue::String(s)
    }
}
