// Value -> number coercions used by arithmetic and library functions

use super::{ArithOp, LuaNumber, LuaValue, NumericType, result_type};
use crate::lua_vm::{LuaError, LuaResult};
use crate::stdlib::basic::parse_number::{parse_lua_number, parse_lua_number_base};

/// Coerce an arithmetic operand: numbers pass through, numeric strings are parsed.
pub fn coerce_numeric(value: &LuaValue) -> LuaResult<LuaNumber> {
    match value {
        LuaValue::Number(n) => Ok(*n),
        LuaValue::String(s) => parse_lua_number(s).ok_or_else(|| {
            LuaError::Arithmetic("attempt to perform arithmetic on a string value".to_string())
        }),
        other => Err(LuaError::Arithmetic(format!(
            "attempt to perform arithmetic on a {} value",
            other.type_name()
        ))),
    }
}

/// Coerce both operands of `a op b` and report the subtype of the result.
pub fn coerce_numeric_pair(
    a: &LuaValue,
    b: &LuaValue,
    op: ArithOp,
) -> LuaResult<(LuaNumber, LuaNumber, NumericType)> {
    let (x, y) = match (a, b) {
        // fast path, no string parsing
        (LuaValue::Number(x), LuaValue::Number(y)) => (*x, *y),
        _ => (coerce_numeric(a)?, coerce_numeric(b)?),
    };
    Ok((x, y, result_type(op, x, y)))
}

/// Integer value of an operand, or `number has no integer representation`.
/// Never truncates.
pub fn to_integer(value: &LuaValue) -> LuaResult<i64> {
    match value {
        LuaValue::Number(n) => n.to_integer(),
        LuaValue::String(_) => coerce_numeric(value)?.to_integer(),
        other => Err(LuaError::Arithmetic(format!(
            "attempt to perform bitwise operation on a {} value",
            other.type_name()
        ))),
    }
}

/// Lua `tonumber(v [, base])`
pub fn tonumber(value: &LuaValue, base: Option<i64>) -> LuaResult<Option<LuaNumber>> {
    match base {
        None => Ok(match value {
            LuaValue::Number(n) => Some(*n),
            LuaValue::String(s) => parse_lua_number(s),
            _ => None,
        }),
        Some(base) => {
            if !(2..=36).contains(&base) {
                return Err(LuaError::bad_argument(2, "tonumber", "base out of range"));
            }
            match value {
                LuaValue::String(s) => Ok(parse_lua_number_base(s, base as u32)),
                other => Err(LuaError::bad_argument(
                    1,
                    "tonumber",
                    &format!("string expected, got {}", other.type_name()),
                )),
            }
        }
    }
}
