// string.gsub: replacement by string template, lookup table or callback.
// The callback may be async; it is awaited at the call site and nowhere else.

use std::future::Future;

use ahash::AHashMap;

use super::engine::{CaptureValue, MatchState, do_match, find_bytes, is_plain_pattern};
use crate::lua_value::LuaValue;
use crate::lua_vm::{LuaError, LuaResult};

/// Key of a gsub lookup table: captures are either strings or positions
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableKey {
    Integer(i64),
    String(Vec<u8>),
}

impl From<i64> for TableKey {
    fn from(i: i64) -> Self {
        TableKey::Integer(i)
    }
}

impl From<&str> for TableKey {
    fn from(s: &str) -> Self {
        TableKey::String(s.as_bytes().to_vec())
    }
}

impl From<&[u8]> for TableKey {
    fn from(s: &[u8]) -> Self {
        TableKey::String(s.to_vec())
    }
}

pub type ReplaceTable = AHashMap<TableKey, LuaValue>;

/// The third argument of `string.gsub`
pub enum Replacement<'a> {
    /// Template with `%0`-`%9` and `%%`
    String(&'a [u8]),
    /// Looked up with the first capture (or the whole match)
    Table(&'a ReplaceTable),
    /// Called with every capture (or the whole match)
    Function(&'a mut dyn FnMut(Vec<LuaValue>) -> LuaResult<LuaValue>),
}

/// Walks the subject left to right, copying unmatched bytes and
/// handing each accepted match to the caller.
struct GsubCursor<'a> {
    ms: MatchState<'a>,
    src: &'a [u8],
    anchor: bool,
    plain: bool,
    pos: usize,
    last_match: Option<usize>,
    count: i64,
    max_count: i64,
    max_size: usize,
    done: bool,
    out: Vec<u8>,
}

impl<'a> GsubCursor<'a> {
    fn new(
        src: &'a [u8],
        pat: &'a [u8],
        max_count: Option<i64>,
        max_depth: usize,
        max_size: usize,
    ) -> Self {
        let (anchor, pat) = match pat.first() {
            Some(b'^') => (true, &pat[1..]),
            _ => (false, pat),
        };
        // literal search only when the fast path can't diverge on empty matches
        let plain = !anchor && !pat.is_empty() && is_plain_pattern(pat);
        Self {
            ms: MatchState::new(src, pat, max_depth),
            src,
            anchor,
            plain,
            pos: 0,
            last_match: None,
            count: 0,
            max_count: max_count.unwrap_or(src.len() as i64 + 1),
            max_size,
            done: false,
            out: Vec::with_capacity(src.len()),
        }
    }

    /// Advance to the next accepted match `src[s..e]`, copying the bytes skipped on the way.
    fn next_match(&mut self) -> LuaResult<Option<(usize, usize)>> {
        if self.plain {
            return Ok(self.next_plain_match());
        }
        while !self.done && self.count < self.max_count {
            self.ms.reprep();
            match do_match(&mut self.ms, self.pos, 0)? {
                Some(e) if Some(e) != self.last_match => {
                    let s = self.pos;
                    self.count += 1;
                    self.pos = e;
                    self.last_match = Some(e);
                    self.done = self.anchor;
                    return Ok(Some((s, e)));
                }
                _ if self.pos < self.src.len() => {
                    self.out.push(self.src[self.pos]);
                    self.pos += 1;
                }
                _ => self.done = true,
            }
            if self.anchor {
                self.done = true;
            }
        }
        Ok(None)
    }

    fn next_plain_match(&mut self) -> Option<(usize, usize)> {
        if self.done || self.count >= self.max_count {
            return None;
        }
        let pat = self.ms.pat;
        match find_bytes(&self.src[self.pos..], pat) {
            Some(off) => {
                let s = self.pos + off;
                self.out.extend_from_slice(&self.src[self.pos..s]);
                self.count += 1;
                self.pos = s + pat.len();
                Some((s, self.pos))
            }
            None => {
                self.done = true;
                None
            }
        }
    }

    fn capture(&self, i: usize, s: usize, e: usize) -> LuaResult<CaptureValue> {
        self.ms.get_capture(i, s, e)
    }

    /// Expand a replacement template for the match `src[s..e]`
    fn add_template(&mut self, repl: &[u8], s: usize, e: usize) -> LuaResult<()> {
        let mut i = 0;
        while i < repl.len() {
            let c = repl[i];
            i += 1;
            if c != b'%' {
                self.out.push(c);
                continue;
            }
            match repl.get(i) {
                Some(b'%') => self.out.push(b'%'),
                Some(&d) if d.is_ascii_digit() => {
                    let cap = if d == b'0' {
                        CaptureValue::Substring(s, e)
                    } else {
                        self.capture((d - b'1') as usize, s, e)?
                    };
                    self.push_capture(cap);
                }
                _ => {
                    return Err(LuaError::Pattern(
                        "invalid use of '%' in replacement string".to_string(),
                    ));
                }
            }
            i += 1;
        }
        Ok(())
    }

    fn push_capture(&mut self, cap: CaptureValue) {
        match cap {
            CaptureValue::Substring(cs, ce) => self.out.extend_from_slice(&self.src[cs..ce]),
            CaptureValue::Position(p) => {
                let mut buf = itoa::Buffer::new();
                self.out.extend_from_slice(buf.format(p).as_bytes());
            }
        }
    }

    /// Apply a table/function result: false or nil keeps the original text
    fn add_value(&mut self, value: LuaValue, s: usize, e: usize) -> LuaResult<()> {
        match value {
            LuaValue::Nil | LuaValue::Boolean(false) => {
                self.out.extend_from_slice(&self.src[s..e]);
            }
            LuaValue::String(bytes) => self.out.extend_from_slice(&bytes),
            LuaValue::Number(n) => self.out.extend_from_slice(n.to_lua_string().as_bytes()),
            other => {
                return Err(LuaError::Pattern(format!(
                    "invalid replacement value (a {})",
                    other.type_name()
                )));
            }
        }
        Ok(())
    }

    fn lookup_key(&self, s: usize, e: usize) -> LuaResult<TableKey> {
        Ok(match self.capture(0, s, e)? {
            CaptureValue::Substring(cs, ce) => TableKey::String(self.src[cs..ce].to_vec()),
            CaptureValue::Position(p) => TableKey::Integer(p as i64),
        })
    }

    fn check_size(&self) -> LuaResult<()> {
        if self.out.len() > self.max_size {
            return Err(LuaError::Pattern("resulting string too large".to_string()));
        }
        Ok(())
    }

    fn finish(mut self) -> LuaResult<(Vec<u8>, usize)> {
        self.out.extend_from_slice(&self.src[self.pos..]);
        self.check_size()?;
        tracing::trace!(count = self.count, "gsub finished");
        Ok((self.out, self.count as usize))
    }
}

/// `string.gsub(s, pattern, repl, n)`: returns the new string and the number of substitutions.
/// `max_count` defaults to `#s + 1`.
pub fn gsub(
    src: &[u8],
    pat: &[u8],
    repl: Replacement<'_>,
    max_count: Option<i64>,
    max_depth: usize,
    max_size: usize,
) -> LuaResult<(Vec<u8>, usize)> {
    let mut cur = GsubCursor::new(src, pat, max_count, max_depth, max_size);
    match repl {
        Replacement::String(template) => {
            while let Some((s, e)) = cur.next_match()? {
                cur.add_template(template, s, e)?;
                cur.check_size()?;
            }
        }
        Replacement::Table(table) => {
            while let Some((s, e)) = cur.next_match()? {
                let key = cur.lookup_key(s, e)?;
                let value = table.get(&key).cloned().unwrap_or_default();
                cur.add_value(value, s, e)?;
                cur.check_size()?;
            }
        }
        Replacement::Function(f) => {
            while let Some((s, e)) = cur.next_match()? {
                let caps = cur.ms.get_captures(s, e, true)?;
                let value = f(caps)?;
                cur.add_value(value, s, e)?;
                cur.check_size()?;
            }
        }
    }
    cur.finish()
}

/// `string.gsub` with an async callback. Each callback resolves before the
/// next match is attempted, so replacements apply strictly left to right.
pub async fn gsub_async<F, Fut>(
    src: &[u8],
    pat: &[u8],
    mut f: F,
    max_count: Option<i64>,
    max_depth: usize,
    max_size: usize,
) -> LuaResult<(Vec<u8>, usize)>
where
    F: FnMut(Vec<LuaValue>) -> Fut,
    Fut: Future<Output = LuaResult<LuaValue>>,
{
    let mut cur = GsubCursor::new(src, pat, max_count, max_depth, max_size);
    while let Some((s, e)) = cur.next_match()? {
        let caps = cur.ms.get_captures(s, e, true)?;
        let value = f(caps).await?;
        cur.add_value(value, s, e)?;
        cur.check_size()?;
    }
    cur.finish()
}
