// math.random / math.randomseed: xoshiro256**
// One generator per runtime object, never shared between states.

use std::sync::OnceLock;
use std::time::Instant;

use crate::lua_value::{LuaNumber, LuaValue};
use crate::lua_vm::lua_limits::PRNG_DISCARD;
use crate::lua_vm::{LuaError, LuaResult};
use crate::stdlib::basic::parse_number::parse_lua_number;

/// 2^-53: scales the top 53 bits of a draw into [0, 1)
const TWO_POW_NEG_53: f64 = 1.0 / 9007199254740992.0;

/// Nanoseconds on a monotonic clock started by the first call
fn monotonic_nanos() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

#[inline(always)]
fn splitmix64(mut x: u64) -> u64 {
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D049BB133111EB);
    x ^ (x >> 31)
}

#[derive(Debug, Clone)]
pub struct Prng {
    state: [u64; 4],
}

impl Default for Prng {
    fn default() -> Self {
        Self::new()
    }
}

impl Prng {
    /// A generator seeded from the clock
    pub fn new() -> Self {
        let mut prng = Prng { state: [0; 4] };
        prng.auto_seed();
        prng
    }

    /// A generator with a fixed seed, for reproducible sequences
    pub fn with_seed(seed1: i64, seed2: i64) -> Self {
        let mut prng = Prng { state: [0; 4] };
        prng.set_seed(seed1, seed2);
        prng
    }

    #[inline]
    pub fn next_rand(&mut self) -> u64 {
        let s = &mut self.state;
        let result = s[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = s[1] << 17;
        s[2] ^= s[0];
        s[3] ^= s[1];
        s[1] ^= s[2];
        s[0] ^= s[3];
        s[2] ^= t;
        s[3] = s[3].rotate_left(45);
        result
    }

    /// Install a seed pair and return it.
    pub fn set_seed(&mut self, seed1: i64, seed2: i64) -> (i64, i64) {
        let n1 = seed1 as u64;
        let n2 = seed2 as u64;
        self.state = [splitmix64(n1), splitmix64(n1 | 0xff), splitmix64(n2), splitmix64(0)];
        // discard initial values to "spread" the seed
        for _ in 0..PRNG_DISCARD {
            self.next_rand();
        }
        tracing::debug!(seed1, seed2, "prng seeded");
        (seed1, seed2)
    }

    /// Seed from wall-clock milliseconds and a monotonic nanosecond counter.
    pub fn auto_seed(&mut self) -> (i64, i64) {
        let seed1 = chrono::Utc::now().timestamp_millis();
        let seed2 = monotonic_nanos() as i64;
        self.set_seed(seed1, seed2)
    }

    /// Uniform value in [0, n] by rejection against the smallest all-ones mask covering n
    pub fn project(&mut self, mut ran: u64, n: u64) -> u64 {
        if n & n.wrapping_add(1) == 0 {
            // n + 1 is a power of 2
            return ran & n;
        }
        let mut lim = n;
        lim |= lim >> 1;
        lim |= lim >> 2;
        lim |= lim >> 4;
        lim |= lim >> 8;
        lim |= lim >> 16;
        lim |= lim >> 32;
        loop {
            ran &= lim;
            if ran <= n {
                return ran;
            }
            ran = self.next_rand();
        }
    }

    /// Float in [0, 1)
    pub fn random_float(&mut self) -> f64 {
        (self.next_rand() >> 11) as f64 * TWO_POW_NEG_53
    }

    /// Integer in [low, up]
    pub fn random_range(&mut self, low: i64, up: i64) -> LuaResult<i64> {
        if low > up {
            return Err(LuaError::bad_argument(1, "random", "interval is empty"));
        }
        let rv = self.next_rand();
        let span = (up as u64).wrapping_sub(low as u64);
        Ok(self.project(rv, span).wrapping_add(low as u64) as i64)
    }

    /// `math.random(...)` with Lua's argument rules
    pub fn random(&mut self, args: &[LuaValue]) -> LuaResult<LuaNumber> {
        match args.len() {
            0 => Ok(LuaNumber::Float(self.random_float())),
            1 => {
                let up = integer_arg(args, 0, "random")?;
                if up == 0 {
                    // the whole 64 random bits
                    return Ok(LuaNumber::Int(self.next_rand() as i64));
                }
                self.random_range(1, up).map(LuaNumber::Int)
            }
            2 => {
                let low = integer_arg(args, 0, "random")?;
                let up = integer_arg(args, 1, "random")?;
                self.random_range(low, up).map(LuaNumber::Int)
            }
            _ => Err(LuaError::Argument("wrong number of arguments".to_string())),
        }
    }

    /// `math.randomseed([x [, y]])`; returns the two seed components used
    pub fn randomseed(&mut self, args: &[LuaValue]) -> LuaResult<(i64, i64)> {
        match args.first() {
            None | Some(LuaValue::Nil) if args.len() <= 1 => Ok(self.auto_seed()),
            _ => {
                let n1 = integer_arg(args, 0, "randomseed")?;
                let n2 = match args.get(1) {
                    None | Some(LuaValue::Nil) => 0,
                    Some(_) => integer_arg(args, 1, "randomseed")?,
                };
                Ok(self.set_seed(n1, n2))
            }
        }
    }
}

fn integer_arg(args: &[LuaValue], i: usize, fname: &str) -> LuaResult<i64> {
    let num = match &args[i] {
        LuaValue::Number(n) => *n,
        LuaValue::String(s) => parse_lua_number(s)
            .ok_or_else(|| LuaError::bad_argument(i + 1, fname, "number expected, got string"))?,
        other => {
            return Err(LuaError::bad_argument(
                i + 1,
                fname,
                &format!("number expected, got {}", other.type_name()),
            ));
        }
    };
    num.as_integer()
        .ok_or_else(|| LuaError::bad_argument(i + 1, fname, "number has no integer representation"))
}
