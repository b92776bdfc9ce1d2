// Lua Runtime Core
// Numeric model, number parsing, patterns, string.format, string.pack and the math PRNG

#[cfg(test)]
mod test;

pub mod lua_value;
pub mod lua_vm;
pub mod stdlib;

pub use lua_value::{LuaNumber, LuaValue, NumericType};
pub use lua_vm::{LuaError, LuaResult, LuaState, SafeOption};
pub use stdlib::string::pack::PackValue;
pub use stdlib::string::pattern::{GMatch, Replacement};
