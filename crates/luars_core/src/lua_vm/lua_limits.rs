//! Centralized limits for the runtime core.
//!
//! Mirrors Lua 5.4's `luaconf.h` / `lstrlib.c` constants so that
//! every magic number lives in one place.

// ===== Patterns =====

/// Maximum number of captures a pattern may open.
/// Matches Lua's LUA_MAXCAPTURES.
pub const LUA_MAXCAPTURES: usize = 32;

/// Maximum recursion depth of the pattern matcher.
/// Matches Lua's MAXCCALLS as used by lstrlib.c.
pub const MAXCCALLS_PATTERN: usize = 200;

// ===== Strings =====

/// Maximum size of a string produced by format/gsub/pack.
pub const MAX_STRING_SIZE: usize = i32::MAX as usize;

// ===== string.format =====

/// Default precision of `%f`, `%e`, `%g`.
pub const DEFAULT_FLOAT_PRECISION: usize = 6;

/// Most digits a literal width or precision may have (lstrlib's 2-digit limit).
pub const MAX_FORMAT_DIGITS: usize = 2;

/// Largest width or precision, literal or taken from a `*` argument.
pub const MAX_FORMAT_FIELD: i64 = 99;

// ===== string.pack =====

/// Size of the native integer (`j`, `J`, `T`, `l`, `L`).
pub const SZINT: usize = 8;

/// Largest integral size accepted by `i[n]` / `I[n]`.
pub const MAXINTSIZE: usize = 16;

/// Native maximum alignment used when `!` has no size.
pub const MAXALIGN: usize = 8;

/// Default size of `i` / `I` without a size.
pub const DEFAULT_INT_SIZE: usize = 4;

// ===== math.random =====

/// Number of outputs discarded after seeding.
pub const PRNG_DISCARD: usize = 16;

/// Precision of `%.14g`, used when converting floats to strings.
pub const LUAI_NUMFFORMAT_PRECISION: usize = 14;
