use super::lua_limits::{MAX_STRING_SIZE, MAXCCALLS_PATTERN};

#[derive(Debug, Clone)]
pub struct SafeOption {
    /// Maximum recursion depth of the pattern matcher
    pub max_pattern_depth: usize,
    /// Maximum length of a string built by format, gsub or pack
    pub max_string_size: usize,
}

impl Default for SafeOption {
    fn default() -> Self {
        Self {
            max_pattern_depth: MAXCCALLS_PATTERN,
            max_string_size: MAX_STRING_SIZE,
        }
    }
}
