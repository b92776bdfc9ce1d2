// Lua pattern matching: string.find, string.match, string.gmatch, string.gsub
// Custom backtracking matcher over bytes, not a regex engine.
pub mod class;
pub mod engine;
mod gsub;

use crate::lua_value::LuaValue;
use crate::lua_vm::LuaResult;
use crate::stdlib::string::posrelat_start;
use engine::{MatchState, do_match, find_bytes, is_plain_pattern};

pub use gsub::{Replacement, ReplaceTable, TableKey, gsub, gsub_async};

/// A successful `string.find`: 1-based inclusive bounds plus explicit captures
#[derive(Debug, Clone, PartialEq)]
pub struct FindResult {
    pub start: usize,
    pub end: usize,
    pub captures: Vec<LuaValue>,
}

/// `string.find(s, pattern, init, plain)`
pub fn find(
    src: &[u8],
    pat: &[u8],
    init: i64,
    plain: bool,
    max_depth: usize,
) -> LuaResult<Option<FindResult>> {
    let init = posrelat_start(init, src.len()) - 1;
    if init > src.len() {
        return Ok(None);
    }

    if plain || is_plain_pattern(pat) {
        return Ok(find_bytes(&src[init..], pat).map(|off| FindResult {
            start: init + off + 1,
            end: init + off + pat.len(),
            captures: Vec::new(),
        }));
    }

    let (anchor, pat) = split_anchor(pat);
    let mut ms = MatchState::new(src, pat, max_depth);
    let mut s = init;
    loop {
        ms.reprep();
        if let Some(e) = do_match(&mut ms, s, 0)? {
            return Ok(Some(FindResult {
                start: s + 1,
                end: e,
                captures: ms.get_captures(s, e, false)?,
            }));
        }
        s += 1;
        if anchor || s > src.len() {
            return Ok(None);
        }
    }
}

/// `string.match(s, pattern, init)`: the captures, or the whole match when there are none
pub fn str_match(
    src: &[u8],
    pat: &[u8],
    init: i64,
    max_depth: usize,
) -> LuaResult<Option<Vec<LuaValue>>> {
    let init = posrelat_start(init, src.len()) - 1;
    if init > src.len() {
        return Ok(None);
    }

    let (anchor, pat) = split_anchor(pat);
    let mut ms = MatchState::new(src, pat, max_depth);
    let mut s = init;
    loop {
        ms.reprep();
        if let Some(e) = do_match(&mut ms, s, 0)? {
            return Ok(Some(ms.get_captures(s, e, true)?));
        }
        s += 1;
        if anchor || s > src.len() {
            return Ok(None);
        }
    }
}

#[inline]
fn split_anchor(pat: &[u8]) -> (bool, &[u8]) {
    match pat.first() {
        Some(b'^') => (true, &pat[1..]),
        _ => (false, pat),
    }
}

/// Iterator behind `string.gmatch`. A `^` is not an anchor here.
/// Stops after yielding the first error.
pub struct GMatch<'a> {
    src: &'a [u8],
    pat: &'a [u8],
    pos: usize,
    last_match: Option<usize>,
    max_depth: usize,
    done: bool,
}

impl<'a> GMatch<'a> {
    pub fn new(src: &'a [u8], pat: &'a [u8], init: i64, max_depth: usize) -> Self {
        let mut pos = posrelat_start(init, src.len()) - 1;
        if pos > src.len() {
            pos = src.len() + 1; // start after the end: no matches
        }
        Self {
            src,
            pat,
            pos,
            last_match: None,
            max_depth,
            done: false,
        }
    }
}

impl Iterator for GMatch<'_> {
    type Item = LuaResult<Vec<LuaValue>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut ms = MatchState::new(self.src, self.pat, self.max_depth);
        while self.pos <= self.src.len() {
            ms.reprep();
            match do_match(&mut ms, self.pos, 0) {
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Ok(Some(e)) if Some(e) != self.last_match => {
                    let start = self.pos;
                    self.pos = e;
                    self.last_match = Some(e);
                    return Some(ms.get_captures(start, e, true));
                }
                Ok(_) => self.pos += 1,
            }
        }
        self.done = true;
        None
    }
}
