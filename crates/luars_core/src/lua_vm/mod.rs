// Lua runtime state
// Owns the per-state limits and the random generator shared by every library call
mod lua_error;
pub mod lua_limits;
mod lua_state;
mod safe_option;

pub use lua_error::LuaError;
pub use lua_state::LuaState;
pub use safe_option::SafeOption;

pub type LuaResult<T> = Result<T, LuaError>;
