// Tests for string.find, string.match, string.gmatch and string.gsub
use crate::lua_value::to_integer;
use crate::stdlib::string::pattern::{FindResult, ReplaceTable, TableKey};
use crate::*;

fn s(text: &str) -> LuaValue {
    LuaValue::string(text)
}

fn found(start: usize, end: usize, captures: Vec<LuaValue>) -> Option<FindResult> {
    Some(FindResult {
        start,
        end,
        captures,
    })
}

fn pattern_error(msg: &str) -> LuaError {
    LuaError::Pattern(msg.to_string())
}

#[test]
fn test_string_find() {
    let state = LuaState::new();
    assert_eq!(
        state.find(b"hello world", b"wor", None, false),
        Ok(found(7, 9, vec![]))
    );
    assert_eq!(state.find(b"hello", b"l+", None, false), Ok(found(3, 4, vec![])));
    assert_eq!(state.find(b"hello", b"xyz", None, false), Ok(None));
    assert_eq!(state.find(b"a.b", b".", None, true), Ok(found(2, 2, vec![])));
    assert_eq!(state.find(b"hello", b"l", Some(-2), false), Ok(found(4, 4, vec![])));
    assert_eq!(
        state.find(b"key = value", b"(%w+)%s*=%s*(%w+)", None, false),
        Ok(found(1, 11, vec![s("key"), s("value")]))
    );
}

#[test]
fn test_string_find_init_bounds() {
    let state = LuaState::new();
    // the empty pattern matches right after the end
    assert_eq!(state.find(b"hello", b"", Some(6), false), Ok(found(6, 5, vec![])));
    assert_eq!(state.find(b"hello", b"", Some(10), false), Ok(None));
    assert_eq!(state.find(b"hello", b"h", Some(-100), false), Ok(found(1, 1, vec![])));
    assert_eq!(state.find(b"hello", b"h", Some(0), false), Ok(found(1, 1, vec![])));
}

#[test]
fn test_string_find_anchors() {
    let state = LuaState::new();
    assert_eq!(state.find(b"hello", b"^h", None, false), Ok(found(1, 1, vec![])));
    assert_eq!(state.find(b"hello", b"^e", None, false), Ok(None));
    assert_eq!(state.find(b"hello", b"o$", None, false), Ok(found(5, 5, vec![])));
    assert_eq!(state.find(b"hello", b"l$", None, false), Ok(None));

    // an anchored pattern only matches at init
    assert_eq!(state.find(b"abcabc", b"^abc", Some(2), false), Ok(None));
    assert_eq!(
        state.find(b"abcabc", b"^abc", Some(4), false),
        Ok(found(4, 6, vec![]))
    );
    // '$' in the middle of a pattern is a literal
    assert_eq!(state.find(b"a$b", b"a$b", None, false), Ok(found(1, 3, vec![])));
}

#[test]
fn test_literal_fast_path_matches_general_path() {
    let state = LuaState::new();
    let subject = b"the quick brown fox jumps over the lazy dog";
    let cases: [(&[u8], &[u8]); 4] = [
        (b"o w", b"[o] w"),
        (b"the", b"t[h]e"),
        (b"dog", b"d%a?og"),
        (b"cat", b"c[a]t"),
    ];
    for (literal, general) in cases {
        let fast = state.find(subject, literal, None, false).unwrap();
        let slow = state.find(subject, general, None, false).unwrap();
        assert_eq!(fast, slow);
        assert_eq!(fast, state.find(subject, literal, None, true).unwrap());
    }
}

#[test]
fn test_string_match() {
    let state = LuaState::new();
    assert_eq!(state.str_match(b"hello 123", b"%d+", None), Ok(Some(vec![s("123")])));
    assert_eq!(
        state.str_match(b"2024-01-15", b"(%d+)-(%d+)-(%d+)", None),
        Ok(Some(vec![s("2024"), s("01"), s("15")]))
    );
    assert_eq!(
        state.str_match(b"hello", b"()ll()", None),
        Ok(Some(vec![LuaValue::integer(3), LuaValue::integer(5)]))
    );
    assert_eq!(state.str_match(b"hello", b"%d", None), Ok(None));
    assert_eq!(
        state.str_match(b"  trim me  ", b"^%s*(.-)%s*$", None),
        Ok(Some(vec![s("trim me")]))
    );
    assert_eq!(state.str_match(b"hello", b".", Some(-1)), Ok(Some(vec![s("o")])));
}

#[test]
fn test_pattern_items() {
    let state = LuaState::new();
    // balanced match
    assert_eq!(
        state.str_match(b"f(a(b)c) d", b"%b()", None),
        Ok(Some(vec![s("(a(b)c)")]))
    );
    // back reference
    assert_eq!(
        state.str_match(b"say \"hi\" ok", b"([\"'])(.-)%1", None),
        Ok(Some(vec![s("\""), s("hi")]))
    );
    // frontier
    assert_eq!(
        state.gsub(b"THE (quick) fox", b"%f[%a]%a+", Replacement::String(b"W"), None),
        Ok((b"W (W) W".to_vec(), 3))
    );
    // lazy vs greedy
    assert_eq!(state.str_match(b"<a><b>", b"<(.-)>", None), Ok(Some(vec![s("a")])));
    assert_eq!(state.str_match(b"<a><b>", b"<(.*)>", None), Ok(Some(vec![s("a><b")])));
    // sets, ranges, negation and escapes
    assert_eq!(state.str_match(b"x=0x1F;", b"[%x]+;", None), Ok(Some(vec![s("1F;")])));
    assert_eq!(state.str_match(b"abc123", b"[^a-c]+", None), Ok(Some(vec![s("123")])));
    assert_eq!(state.str_match(b"1+1=2", b"%d%+%d", None), Ok(Some(vec![s("1+1")])));
    assert_eq!(state.str_match(b"a\0b", b"%z", None), Ok(Some(vec![s("\0")])));
}

#[test]
fn test_pattern_errors() {
    let state = LuaState::new();
    assert_eq!(
        state.find(b"abc", b"[a", None, false),
        Err(pattern_error("malformed pattern (missing ']')"))
    );
    assert_eq!(
        state.find(b"abc", b"a%", None, false),
        Err(pattern_error("malformed pattern (ends with '%')"))
    );
    assert_eq!(
        state.find(b"abc", b"%b", None, false),
        Err(pattern_error("malformed pattern (missing arguments to '%b')"))
    );
    assert_eq!(
        state.find(b"abc", b"%fa", None, false),
        Err(pattern_error("missing '[' after '%f' in pattern"))
    );
    assert_eq!(
        state.find(b"abc", b"(a", None, false),
        Err(pattern_error("unfinished capture"))
    );
    assert_eq!(
        state.find(b"abc", b"a)", None, false),
        Err(pattern_error("invalid pattern capture"))
    );
    assert_eq!(
        state.find(b"abc", b"%1", None, false),
        Err(pattern_error("invalid capture index %1"))
    );
    assert_eq!(
        state.find(b"x", "()".repeat(33).as_bytes(), None, false),
        Err(pattern_error("too many captures"))
    );
}

#[test]
fn test_pattern_depth_limit() {
    let state = LuaState::with_option(SafeOption {
        max_pattern_depth: 10,
        ..SafeOption::default()
    });
    let subject = vec![b'a'; 30];
    let pat = "a?".repeat(20);
    assert_eq!(
        state.str_match(&subject, pat.as_bytes(), None),
        Err(pattern_error("pattern too complex"))
    );

    // the default depth is plenty for the same pattern
    let state = LuaState::new();
    assert_eq!(
        state.str_match(&subject, pat.as_bytes(), None),
        Ok(Some(vec![LuaValue::string(vec![b'a'; 20])]))
    );
}

#[test]
fn test_string_gmatch() {
    let state = LuaState::new();
    let words: Vec<Vec<LuaValue>> = state
        .gmatch(b"one two three", b"%a+", None)
        .collect::<LuaResult<_>>()
        .unwrap();
    assert_eq!(words, vec![vec![s("one")], vec![s("two")], vec![s("three")]]);

    let pairs: Vec<Vec<LuaValue>> = state
        .gmatch(b"a=1, b=2", b"(%w+)=(%w+)", None)
        .collect::<LuaResult<_>>()
        .unwrap();
    assert_eq!(pairs, vec![vec![s("a"), s("1")], vec![s("b"), s("2")]]);

    let from_init: Vec<Vec<LuaValue>> = state
        .gmatch(b"one two three", b"%a+", Some(5))
        .collect::<LuaResult<_>>()
        .unwrap();
    assert_eq!(from_init, vec![vec![s("two")], vec![s("three")]]);
}

#[test]
fn test_gmatch_empty_matches_advance() {
    let state = LuaState::new();
    let all: Vec<Vec<LuaValue>> = state
        .gmatch(b"abc", b"", None)
        .collect::<LuaResult<_>>()
        .unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.iter().all(|caps| caps == &vec![s("")]));

    let mut past_end = state.gmatch(b"abc", b"a", Some(10));
    assert!(past_end.next().is_none());
}

#[test]
fn test_gmatch_stops_after_error() {
    let state = LuaState::new();
    let mut it = state.gmatch(b"abc", b"[a", None);
    assert_eq!(
        it.next(),
        Some(Err(pattern_error("malformed pattern (missing ']')")))
    );
    assert!(it.next().is_none());
}

#[test]
fn test_gsub_string_replacement() {
    let state = LuaState::new();
    assert_eq!(
        state.gsub(b"hello world", b"o", Replacement::String(b"0"), None),
        Ok((b"hell0 w0rld".to_vec(), 2))
    );
    assert_eq!(
        state.gsub(b"hello world", b"(%w+)", Replacement::String(b"<%1>"), None),
        Ok((b"<hello> <world>".to_vec(), 2))
    );
    assert_eq!(
        state.gsub(b"hello world", b"(%w+) (%w+)", Replacement::String(b"%2 %1"), None),
        Ok((b"world hello".to_vec(), 1))
    );
    assert_eq!(
        state.gsub(b"50", b"%d+", Replacement::String(b"%0%%"), None),
        Ok((b"50%".to_vec(), 1))
    );
    assert_eq!(
        state.gsub(b"abc", b"b", Replacement::String(b"%x"), None),
        Err(pattern_error("invalid use of '%' in replacement string"))
    );
    assert_eq!(
        state.gsub(b"abc", b"b", Replacement::String(b"%2"), None),
        Err(pattern_error("invalid capture index %2"))
    );
}

#[test]
fn test_gsub_counts_and_anchors() {
    let state = LuaState::new();
    assert_eq!(
        state.gsub(b"hello", b"", Replacement::String(b"-"), None),
        Ok((b"-h-e-l-l-o-".to_vec(), 6))
    );
    assert_eq!(
        state.gsub(b"aaa", b"a", Replacement::String(b"b"), Some(2)),
        Ok((b"bba".to_vec(), 2))
    );
    assert_eq!(
        state.gsub(b"aaa", b"a", Replacement::String(b"b"), Some(0)),
        Ok((b"aaa".to_vec(), 0))
    );
    assert_eq!(
        state.gsub(b"hello hello", b"^hello", Replacement::String(b"X"), None),
        Ok((b"X hello".to_vec(), 1))
    );
    assert_eq!(
        state.gsub(b"hello", b"^x", Replacement::String(b"X"), None),
        Ok((b"hello".to_vec(), 0))
    );
    assert_eq!(
        state.gsub(b"abc", b"x*", Replacement::String(b"-"), None),
        Ok((b"-a-b-c-".to_vec(), 4))
    );
}

#[test]
fn test_gsub_table_replacement() {
    let state = LuaState::new();
    let mut table = ReplaceTable::default();
    table.insert(TableKey::from("name"), s("Lua"));
    table.insert(TableKey::from("ver"), LuaValue::integer(5));
    table.insert(TableKey::from("off"), LuaValue::boolean(false));

    assert_eq!(
        state.gsub(
            b"$name $ver $off $other",
            b"%$(%w+)",
            Replacement::Table(&table),
            None
        ),
        Ok((b"Lua 5 $off $other".to_vec(), 4))
    );

    // position captures look up integer keys
    let mut by_pos = ReplaceTable::default();
    by_pos.insert(TableKey::from(2), s("X"));
    assert_eq!(
        state.gsub(b"abc", b"()b", Replacement::Table(&by_pos), None),
        Ok((b"aXc".to_vec(), 1))
    );

    let mut bad = ReplaceTable::default();
    bad.insert(TableKey::from("a"), LuaValue::boolean(true));
    assert_eq!(
        state.gsub(b"abc", b"a", Replacement::Table(&bad), None),
        Err(pattern_error("invalid replacement value (a boolean)"))
    );
}

#[test]
fn test_gsub_function_replacement() {
    let state = LuaState::new();

    let mut upper = |caps: Vec<LuaValue>| -> LuaResult<LuaValue> {
        let bytes = caps[0].as_bytes().unwrap_or_default();
        Ok(LuaValue::String(bytes.to_ascii_uppercase()))
    };
    assert_eq!(
        state.gsub(b"hello world", b"%w+", Replacement::Function(&mut upper), None),
        Ok((b"HELLO WORLD".to_vec(), 2))
    );

    let mut seen = Vec::new();
    let mut keep = |caps: Vec<LuaValue>| -> LuaResult<LuaValue> {
        seen.push(caps);
        Ok(LuaValue::Nil)
    };
    assert_eq!(
        state.gsub(b"k1=v1 k2=v2", b"(%w+)=(%w+)", Replacement::Function(&mut keep), None),
        Ok((b"k1=v1 k2=v2".to_vec(), 2))
    );
    assert_eq!(
        seen,
        vec![vec![s("k1"), s("v1")], vec![s("k2"), s("v2")]]
    );

    let mut double = |caps: Vec<LuaValue>| -> LuaResult<LuaValue> {
        Ok(LuaValue::integer(to_integer(&caps[0])? * 2))
    };
    assert_eq!(
        state.gsub(b"1 2 3", b"%d", Replacement::Function(&mut double), None),
        Ok((b"2 4 6".to_vec(), 3))
    );

    let mut fail =
        |_caps: Vec<LuaValue>| -> LuaResult<LuaValue> { Err(LuaError::Callback("boom".to_string())) };
    assert_eq!(
        state.gsub(b"abc", b"b", Replacement::Function(&mut fail), None),
        Err(LuaError::Callback("boom".to_string()))
    );
}

#[test]
fn test_gsub_result_size_limit() {
    let state = LuaState::with_option(SafeOption {
        max_string_size: 16,
        ..SafeOption::default()
    });
    assert_eq!(
        state.gsub(b"aaaa", b"a", Replacement::String(b"bbbbbbbb"), None),
        Err(pattern_error("resulting string too large"))
    );
}
