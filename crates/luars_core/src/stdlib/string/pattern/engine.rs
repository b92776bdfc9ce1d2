// Core pattern matching engine: direct interpretation, no AST
//
// Follows C Lua's lstrlib.c design:
// - MatchState holds source, pattern and captures
// - do_match recursively walks the pattern with backtracking
// - Fixed capture slots (no heap alloc during matching)
// - An explicit depth limit turns runaway recursion into "pattern too complex"

use super::class::{L_ESC, class_end, match_bracket_class, single_match_byte};
use crate::lua_value::LuaValue;
use crate::lua_vm::lua_limits::LUA_MAXCAPTURES;
use crate::lua_vm::{LuaError, LuaResult};

/// Check if pattern has no special characters (can be matched as plain text).
/// Mirrors C Lua's `nospecials()` in lstrlib.c.
#[inline]
pub fn is_plain_pattern(pat: &[u8]) -> bool {
    !pat.iter().any(|&c| {
        matches!(
            c,
            b'%' | b'.' | b'[' | b'*' | b'+' | b'-' | b'?' | b'^' | b'$' | b'('
        )
    })
}

/// Find `needle` in `haystack`; an empty needle matches at 0.
#[inline]
pub fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    let first = needle[0];
    let last_start = haystack.len() - needle.len();
    let mut i = 0;
    while i <= last_start {
        match haystack[i..=last_start].iter().position(|&b| b == first) {
            Some(off) => {
                i += off;
                if &haystack[i..i + needle.len()] == needle {
                    return Some(i);
                }
                i += 1;
            }
            None => return None,
        }
    }
    None
}

/// Capture length: a byte count or one of the two markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureLen {
    Len(usize),
    Position,   // () position capture
    Unfinished, // opened, not closed yet
}

/// A single capture slot
#[derive(Debug, Clone, Copy)]
pub struct Capture {
    pub init: usize, // byte offset in source
    pub len: CaptureLen,
}

/// A capture value returned to callers, borrowed from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureValue {
    Substring(usize, usize), // byte start, byte end in source text
    Position(usize),         // 1-based byte position
}

impl CaptureValue {
    pub fn to_lua_value(self, src: &[u8]) -> LuaValue {
        match self {
            CaptureValue::Substring(s, e) => LuaValue::String(src[s..e].to_vec()),
            CaptureValue::Position(p) => LuaValue::integer(p as i64),
        }
    }
}

/// Match state: all matching context for one top-level operation
pub struct MatchState<'a> {
    pub src: &'a [u8],
    pub pat: &'a [u8],
    pub level: usize,
    pub captures: [Capture; LUA_MAXCAPTURES],
    max_depth: usize,
    depth: usize, // remaining recursion depth
}

impl<'a> MatchState<'a> {
    pub fn new(src: &'a [u8], pat: &'a [u8], max_depth: usize) -> Self {
        Self {
            src,
            pat,
            level: 0,
            captures: [Capture {
                init: 0,
                len: CaptureLen::Unfinished,
            }; LUA_MAXCAPTURES],
            max_depth,
            depth: max_depth,
        }
    }

    /// Reset before trying a new start offset (C Lua's reprepstate)
    #[inline]
    pub fn reprep(&mut self) {
        self.level = 0;
        self.depth = self.max_depth;
    }

    /// Capture `i` of a successful match `src[s..e]`.
    /// With no explicit captures, index 0 stands for the whole match.
    pub fn get_capture(&self, i: usize, s: usize, e: usize) -> LuaResult<CaptureValue> {
        if i >= self.level {
            if i != 0 {
                return Err(LuaError::Pattern(format!(
                    "invalid capture index %{}",
                    i + 1
                )));
            }
            return Ok(CaptureValue::Substring(s, e));
        }
        let cap = self.captures[i];
        match cap.len {
            CaptureLen::Unfinished => Err(LuaError::Pattern("unfinished capture".to_string())),
            CaptureLen::Position => Ok(CaptureValue::Position(cap.init + 1)),
            CaptureLen::Len(l) => Ok(CaptureValue::Substring(cap.init, cap.init + l)),
        }
    }

    /// All captures of a match; the whole match when the pattern has none
    /// and `whole_if_none` is set (find reports only explicit captures).
    pub fn get_captures(&self, s: usize, e: usize, whole_if_none: bool) -> LuaResult<Vec<LuaValue>> {
        let n = if self.level == 0 && whole_if_none {
            1
        } else {
            self.level
        };
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            out.push(self.get_capture(i, s, e)?.to_lua_value(self.src));
        }
        Ok(out)
    }

    #[inline]
    fn single_match(&self, s: usize, p: usize, ep: usize) -> bool {
        s < self.src.len() && single_match_byte(self.src[s], self.pat, p, ep)
    }
}

/// Try to match `pat[p..]` against `src[s..]`.
/// Returns the end of the match, `None` on failure, `Err` on malformed patterns.
pub fn do_match(ms: &mut MatchState, s: usize, p: usize) -> LuaResult<Option<usize>> {
    if ms.depth == 0 {
        tracing::debug!(max_depth = ms.max_depth, "pattern matcher ran out of depth");
        return Err(LuaError::Pattern("pattern too complex".to_string()));
    }
    ms.depth -= 1;
    let result = match_inner(ms, s, p);
    ms.depth += 1;
    result
}

fn match_inner(ms: &mut MatchState, mut s: usize, mut p: usize) -> LuaResult<Option<usize>> {
    let pat = ms.pat;
    // Tail-call optimization: loop instead of recursing for sequential elements
    loop {
        if p >= pat.len() {
            return Ok(Some(s));
        }

        match pat[p] {
            b'(' => {
                return if p + 1 < pat.len() && pat[p + 1] == b')' {
                    start_capture(ms, s, p + 2, CaptureLen::Position)
                } else {
                    start_capture(ms, s, p + 1, CaptureLen::Unfinished)
                };
            }
            b')' => return end_capture(ms, s, p + 1),
            b'$' if p + 1 == pat.len() => {
                return Ok(if s == ms.src.len() { Some(s) } else { None });
            }
            L_ESC if p + 1 < pat.len() && pat[p + 1] == b'b' => {
                match match_balance(ms, s, p + 2)? {
                    Some(ns) => {
                        s = ns;
                        p += 4;
                        continue;
                    }
                    None => return Ok(None),
                }
            }
            L_ESC if p + 1 < pat.len() && pat[p + 1] == b'f' => {
                p += 2;
                if p >= pat.len() || pat[p] != b'[' {
                    return Err(LuaError::Pattern(
                        "missing '[' after '%f' in pattern".to_string(),
                    ));
                }
                let ep = class_end(pat, p)?;
                let prev = if s == 0 { 0 } else { ms.src[s - 1] };
                let cur = if s < ms.src.len() { ms.src[s] } else { 0 };
                if !match_bracket_class(prev, pat, p, ep - 1)
                    && match_bracket_class(cur, pat, p, ep - 1)
                {
                    p = ep;
                    continue;
                }
                return Ok(None);
            }
            L_ESC if p + 1 < pat.len() && pat[p + 1].is_ascii_digit() => {
                match match_capture(ms, s, pat[p + 1])? {
                    Some(ns) => {
                        s = ns;
                        p += 2;
                        continue;
                    }
                    None => return Ok(None),
                }
            }
            _ => {}
        }

        // Normal pattern element (literal, `.`, `%class`, `[set]`)
        let ep = class_end(pat, p)?;
        let suffix = pat.get(ep).copied();
        if !ms.single_match(s, p, ep) {
            if matches!(suffix, Some(b'*' | b'?' | b'-')) {
                // accepts empty match
                p = ep + 1;
                continue;
            }
            return Ok(None);
        }

        match suffix {
            Some(b'?') => {
                if let Some(res) = do_match(ms, s + 1, ep + 1)? {
                    return Ok(Some(res));
                }
                p = ep + 1;
            }
            Some(b'+') => return max_expand(ms, s + 1, p, ep),
            Some(b'*') => return max_expand(ms, s, p, ep),
            Some(b'-') => return min_expand(ms, s, p, ep),
            _ => {
                s += 1;
                p = ep;
            }
        }
    }
}

/// Greedy repetition (`*`, and `+` after its first byte)
fn max_expand(ms: &mut MatchState, s: usize, p: usize, ep: usize) -> LuaResult<Option<usize>> {
    let mut i = 0;
    while ms.single_match(s + i, p, ep) {
        i += 1;
    }
    // Try from most to least (greedy)
    loop {
        if let Some(res) = do_match(ms, s + i, ep + 1)? {
            return Ok(Some(res));
        }
        if i == 0 {
            return Ok(None);
        }
        i -= 1;
    }
}

/// Lazy repetition (`-`)
fn min_expand(ms: &mut MatchState, mut s: usize, p: usize, ep: usize) -> LuaResult<Option<usize>> {
    loop {
        if let Some(res) = do_match(ms, s, ep + 1)? {
            return Ok(Some(res));
        }
        if ms.single_match(s, p, ep) {
            s += 1;
        } else {
            return Ok(None);
        }
    }
}

fn start_capture(
    ms: &mut MatchState,
    s: usize,
    p: usize,
    what: CaptureLen,
) -> LuaResult<Option<usize>> {
    let level = ms.level;
    if level >= LUA_MAXCAPTURES {
        return Err(LuaError::Pattern("too many captures".to_string()));
    }
    ms.captures[level] = Capture { init: s, len: what };
    ms.level = level + 1;
    let res = do_match(ms, s, p)?;
    if res.is_none() {
        ms.level -= 1; // undo capture
    }
    Ok(res)
}

fn end_capture(ms: &mut MatchState, s: usize, p: usize) -> LuaResult<Option<usize>> {
    let l = capture_to_close(ms)?;
    ms.captures[l].len = CaptureLen::Len(s - ms.captures[l].init);
    let res = do_match(ms, s, p)?;
    if res.is_none() {
        ms.captures[l].len = CaptureLen::Unfinished; // undo close on backtrack
    }
    Ok(res)
}

fn capture_to_close(ms: &MatchState) -> LuaResult<usize> {
    (0..ms.level)
        .rev()
        .find(|&l| ms.captures[l].len == CaptureLen::Unfinished)
        .ok_or_else(|| LuaError::Pattern("invalid pattern capture".to_string()))
}

/// Balanced match `%bxy`; `p` points at `x`
fn match_balance(ms: &MatchState, s: usize, p: usize) -> LuaResult<Option<usize>> {
    if p + 1 >= ms.pat.len() {
        return Err(LuaError::Pattern(
            "malformed pattern (missing arguments to '%b')".to_string(),
        ));
    }
    let open = ms.pat[p];
    let close = ms.pat[p + 1];
    if s >= ms.src.len() || ms.src[s] != open {
        return Ok(None);
    }
    let mut cont = 1;
    let mut i = s + 1;
    while i < ms.src.len() {
        let c = ms.src[i];
        if c == close {
            cont -= 1;
            if cont == 0 {
                return Ok(Some(i + 1));
            }
        } else if c == open {
            cont += 1;
        }
        i += 1;
    }
    Ok(None)
}

/// Back reference `%1`-`%9`
fn match_capture(ms: &MatchState, s: usize, digit: u8) -> LuaResult<Option<usize>> {
    let l = digit as i32 - b'1' as i32;
    if l < 0 || l as usize >= ms.level || ms.captures[l as usize].len == CaptureLen::Unfinished {
        return Err(LuaError::Pattern(format!("invalid capture index %{}", l + 1)));
    }
    let cap = ms.captures[l as usize];
    match cap.len {
        CaptureLen::Len(len) => {
            if ms.src.len() - s >= len && ms.src[cap.init..cap.init + len] == ms.src[s..s + len] {
                Ok(Some(s + len))
            } else {
                Ok(None)
            }
        }
        // a position capture has no text to compare against
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &[u8], pat: &[u8]) -> LuaResult<Option<usize>> {
        let mut ms = MatchState::new(src, pat, 200);
        do_match(&mut ms, 0, 0)
    }

    #[test]
    fn test_is_plain_pattern() {
        assert!(is_plain_pattern(b"hello world"));
        assert!(is_plain_pattern(b"a)b"));
        assert!(!is_plain_pattern(b"a.b"));
        assert!(!is_plain_pattern(b"50%"));
    }

    #[test]
    fn test_find_bytes() {
        assert_eq!(find_bytes(b"hello world", b"wor"), Some(6));
        assert_eq!(find_bytes(b"aaab", b"ab"), Some(2));
        assert_eq!(find_bytes(b"abc", b""), Some(0));
        assert_eq!(find_bytes(b"ab", b"abc"), None);
    }

    #[test]
    fn test_quantifiers() {
        assert_eq!(run(b"aaab", b"a*"), Ok(Some(3)));
        assert_eq!(run(b"aaab", b"a-b"), Ok(Some(4)));
        assert_eq!(run(b"b", b"a?b"), Ok(Some(1)));
        assert_eq!(run(b"b", b"a+"), Ok(None));
    }

    #[test]
    fn test_depth_limit() {
        let src = vec![b'a'; 300];
        let mut ms = MatchState::new(&src, b"a?a?a?a?a?b", 3);
        assert_eq!(
            do_match(&mut ms, 0, 0),
            Err(LuaError::Pattern("pattern too complex".to_string()))
        );
    }
}
