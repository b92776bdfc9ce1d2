// String library
// Implements: find, format, gmatch, gsub, match, pack, packsize, unpack
pub mod pack;
pub mod pattern;
pub mod string_format;

/// Translate a 1-based, possibly negative start position (C Lua's posrelatI).
/// Values below 1 clamp to 1; the result may exceed `len + 1`.
pub fn posrelat_start(pos: i64, len: usize) -> usize {
    if pos > 0 {
        pos as usize
    } else if pos == 0 || pos < -(len as i64) {
        1
    } else {
        (len as i64 + pos + 1) as usize
    }
}
