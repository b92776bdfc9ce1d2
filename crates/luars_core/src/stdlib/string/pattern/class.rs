// Character class matching for Lua patterns
// Handles %a, %c, %d, %g, %l, %p, %s, %u, %w, %x, %z and their uppercase inverses
// Also handles [set] matching. Classes follow the "C" locale (ASCII only).

use crate::lua_vm::{LuaError, LuaResult};

pub const L_ESC: u8 = b'%';

/// Check if a byte matches a Lua character class letter.
/// Uppercase class letters invert the lowercase class; anything else matches literally.
#[inline(always)]
pub fn match_class(c: u8, cl: u8) -> bool {
    let res = match cl.to_ascii_lowercase() {
        b'a' => c.is_ascii_alphabetic(),
        b'c' => c.is_ascii_control(),
        b'd' => c.is_ascii_digit(),
        b'g' => c.is_ascii_graphic(),
        b'l' => c.is_ascii_lowercase(),
        b'p' => c.is_ascii_punctuation(),
        b's' => c == b' ' || (b'\t'..=b'\r').contains(&c),
        b'u' => c.is_ascii_uppercase(),
        b'w' => c.is_ascii_alphanumeric(),
        b'x' => c.is_ascii_hexdigit(),
        b'z' => c == 0,
        _ => return cl == c, // not a class letter, match literally
    };
    if cl.is_ascii_uppercase() { !res } else { res }
}

/// Return the pattern index after the single element starting at `pat[p]`
/// (past `[set]`, `%x` or a plain byte). Repetition suffixes are not consumed.
pub fn class_end(pat: &[u8], mut p: usize) -> LuaResult<usize> {
    let c = pat[p];
    p += 1;
    match c {
        L_ESC => {
            if p >= pat.len() {
                return Err(LuaError::Pattern(
                    "malformed pattern (ends with '%')".to_string(),
                ));
            }
            Ok(p + 1)
        }
        b'[' => {
            if p < pat.len() && pat[p] == b'^' {
                p += 1;
            }
            // the first byte of a set is always a member, even ']'
            loop {
                if p >= pat.len() {
                    return Err(LuaError::Pattern(
                        "malformed pattern (missing ']')".to_string(),
                    ));
                }
                let cc = pat[p];
                p += 1;
                if cc == L_ESC && p < pat.len() {
                    p += 1;
                }
                if p < pat.len() && pat[p] == b']' {
                    break;
                }
            }
            Ok(p + 1)
        }
        _ => Ok(p),
    }
}

/// Match `c` against the set `pat[p..=ec]`, where `pat[p]` is `[` and `pat[ec]` is `]`.
pub fn match_bracket_class(c: u8, pat: &[u8], mut p: usize, ec: usize) -> bool {
    let mut sig = true;
    if pat[p + 1] == b'^' {
        sig = false;
        p += 1;
    }
    p += 1;
    while p < ec {
        if pat[p] == L_ESC {
            p += 1;
            if match_class(c, pat[p]) {
                return sig;
            }
        } else if pat[p + 1] == b'-' && p + 2 < ec {
            if pat[p] <= c && c <= pat[p + 2] {
                return sig;
            }
            p += 2;
        } else if pat[p] == c {
            return sig;
        }
        p += 1;
    }
    !sig
}

/// Match a single byte against the element `pat[p..ep]`.
#[inline]
pub fn single_match_byte(c: u8, pat: &[u8], p: usize, ep: usize) -> bool {
    match pat[p] {
        b'.' => true,
        L_ESC => match_class(c, pat[p + 1]),
        b'[' => match_bracket_class(c, pat, p, ep - 1),
        pc => pc == c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_class() {
        assert!(match_class(b'a', b'a'));
        assert!(match_class(b'Z', b'a'));
        assert!(!match_class(b'1', b'a'));
        assert!(match_class(b'1', b'A'));
        assert!(match_class(b'\x7f', b'c'));
        assert!(match_class(b'\x0b', b's'));
        assert!(!match_class(b' ', b'g'));
        assert!(match_class(0, b'z'));
        assert!(match_class(b'.', b'.'));
        // non-ASCII bytes belong to no class
        assert!(!match_class(0xe9, b'a'));
        assert!(match_class(0xe9, b'W'));
    }

    #[test]
    fn test_class_end() {
        assert_eq!(class_end(b"%a+", 0), Ok(2));
        assert_eq!(class_end(b"[]]x", 0), Ok(3));
        assert_eq!(class_end(b"[^%]]", 0), Ok(5));
        assert!(class_end(b"[a", 0).is_err());
        assert!(class_end(b"%", 0).is_err());
    }

    #[test]
    fn test_bracket_class() {
        let pat = b"[a-f%d_]";
        assert!(match_bracket_class(b'c', pat, 0, 7));
        assert!(match_bracket_class(b'7', pat, 0, 7));
        assert!(match_bracket_class(b'_', pat, 0, 7));
        assert!(!match_bracket_class(b'g', pat, 0, 7));

        let neg = b"[^-a]";
        assert!(!match_bracket_class(b'-', neg, 0, 4));
        assert!(match_bracket_class(b'b', neg, 0, 4));
    }
}
