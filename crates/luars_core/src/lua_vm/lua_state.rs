// Runtime object: one per script execution context.
// Every numeric and string library entry point hangs off it so that limits
// and the random generator never leak between states.

use std::future::Future;

use crate::lua_value::{ArithOp, LuaNumber, LuaValue, arith, coerce_numeric_pair, tonumber};
use crate::lua_vm::safe_option::SafeOption;
use crate::lua_vm::{LuaError, LuaResult};
use crate::stdlib::math::Prng;
use crate::stdlib::string::pack::{self, PackValue};
use crate::stdlib::string::pattern::{self, FindResult, GMatch, Replacement};
use crate::stdlib::string::string_format;

/// Execution state for the numeric/string runtime core
pub struct LuaState {
    option: SafeOption,
    prng: Prng,
}

impl Default for LuaState {
    fn default() -> Self {
        Self::new()
    }
}

impl LuaState {
    /// Reference limits, clock-seeded generator
    pub fn new() -> Self {
        Self::with_option(SafeOption::default())
    }

    pub fn with_option(option: SafeOption) -> Self {
        LuaState {
            option,
            prng: Prng::new(),
        }
    }

    /// Reference limits and a fixed seed, for reproducible `random` sequences
    pub fn with_seed(seed1: i64, seed2: i64) -> Self {
        LuaState {
            option: SafeOption::default(),
            prng: Prng::with_seed(seed1, seed2),
        }
    }

    pub fn safe_option(&self) -> &SafeOption {
        &self.option
    }

    pub fn set_safe_option(&mut self, option: SafeOption) {
        self.option = option;
    }

    pub fn prng_mut(&mut self) -> &mut Prng {
        &mut self.prng
    }

    // ===== Numeric model =====

    /// `a op b` on arbitrary values, coercing numeric strings
    pub fn arith(&self, op: ArithOp, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaValue> {
        let (x, y, _) = coerce_numeric_pair(a, b, op)?;
        arith(op, x, y).map(LuaValue::Number)
    }

    /// `tostring(v)` as bytes
    pub fn tostring(&self, value: &LuaValue) -> Vec<u8> {
        value.to_lua_bytes()
    }

    /// `tonumber(v [, base])`
    pub fn tonumber(&self, value: &LuaValue, base: Option<i64>) -> LuaResult<Option<LuaNumber>> {
        tonumber(value, base)
    }

    // ===== string library =====

    /// `string.find(s, pattern [, init [, plain]])`
    pub fn find(
        &self,
        src: &[u8],
        pat: &[u8],
        init: Option<i64>,
        plain: bool,
    ) -> LuaResult<Option<FindResult>> {
        pattern::find(
            src,
            pat,
            init.unwrap_or(1),
            plain,
            self.option.max_pattern_depth,
        )
    }

    /// `string.match(s, pattern [, init])`
    pub fn str_match(
        &self,
        src: &[u8],
        pat: &[u8],
        init: Option<i64>,
    ) -> LuaResult<Option<Vec<LuaValue>>> {
        pattern::str_match(src, pat, init.unwrap_or(1), self.option.max_pattern_depth)
    }

    /// `string.gmatch(s, pattern [, init])`
    pub fn gmatch<'a>(&self, src: &'a [u8], pat: &'a [u8], init: Option<i64>) -> GMatch<'a> {
        GMatch::new(src, pat, init.unwrap_or(1), self.option.max_pattern_depth)
    }

    /// `string.gsub(s, pattern, repl [, n])`
    pub fn gsub(
        &self,
        src: &[u8],
        pat: &[u8],
        repl: Replacement<'_>,
        max_count: Option<i64>,
    ) -> LuaResult<(Vec<u8>, usize)> {
        pattern::gsub(
            src,
            pat,
            repl,
            max_count,
            self.option.max_pattern_depth,
            self.option.max_string_size,
        )
    }

    /// `string.gsub` with an awaitable replacement callback
    pub async fn gsub_async<F, Fut>(
        &self,
        src: &[u8],
        pat: &[u8],
        f: F,
        max_count: Option<i64>,
    ) -> LuaResult<(Vec<u8>, usize)>
    where
        F: FnMut(Vec<LuaValue>) -> Fut,
        Fut: Future<Output = LuaResult<LuaValue>>,
    {
        pattern::gsub_async(
            src,
            pat,
            f,
            max_count,
            self.option.max_pattern_depth,
            self.option.max_string_size,
        )
        .await
    }

    /// `string.format(fmt, ...)`
    pub fn format(&self, fmt: &[u8], args: &[LuaValue]) -> LuaResult<Vec<u8>> {
        string_format::format(fmt, args, self.option.max_string_size)
    }

    /// `string.pack(fmt, ...)`
    pub fn pack(&self, fmt: &[u8], args: &[PackValue]) -> LuaResult<Vec<u8>> {
        pack::pack(fmt, args, self.option.max_string_size)
    }

    /// `string.packsize(fmt)`
    pub fn packsize(&self, fmt: &[u8]) -> LuaResult<usize> {
        pack::packsize(fmt)
    }

    /// `string.unpack(fmt, s [, init])`: the values and the 1-based position after them
    pub fn unpack(
        &self,
        fmt: &[u8],
        data: &[u8],
        init: Option<i64>,
    ) -> LuaResult<(Vec<PackValue>, usize)> {
        pack::unpack(fmt, data, init.unwrap_or(1))
    }

    // ===== math library =====

    /// `math.random([m [, n]])`
    pub fn random(&mut self, args: &[LuaValue]) -> LuaResult<LuaNumber> {
        self.prng.random(args)
    }

    /// `math.randomseed([x [, y]])`
    pub fn randomseed(&mut self, args: &[LuaValue]) -> LuaResult<(i64, i64)> {
        self.prng.randomseed(args)
    }

    /// `math.fmod(a, b)` on arbitrary values
    pub fn fmod(&self, a: &LuaValue, b: &LuaValue) -> LuaResult<LuaNumber> {
        let x = number_arg(a, 1, "fmod")?;
        let y = number_arg(b, 2, "fmod")?;
        crate::stdlib::math::fmod(x, y)
    }
}

fn number_arg(value: &LuaValue, n: usize, fname: &str) -> LuaResult<LuaNumber> {
    match tonumber(value, None)? {
        Some(num) => Ok(num),
        None => Err(LuaError::bad_argument(
            n,
            fname,
            &format!("number expected, got {}", value.type_name()),
        )),
    }
}
