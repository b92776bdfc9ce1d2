use thiserror::Error;

/// Errors raised by the runtime core.
/// `Display` yields exactly the message a Lua script would observe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LuaError {
    /// Coercion failures, integer division by zero, missing integer representation
    #[error("{0}")]
    Arithmetic(String),
    /// Malformed patterns and matcher limits
    #[error("{0}")]
    Pattern(String),
    /// string.format directive and argument errors
    #[error("{0}")]
    Format(String),
    /// string.pack / string.unpack / string.packsize errors
    #[error("{0}")]
    Pack(String),
    /// Generic `bad argument` errors from library helpers
    #[error("{0}")]
    Argument(String),
    /// Raised by a host supplied gsub callback, passed through untouched
    #[error("{0}")]
    Callback(String),
}

impl LuaError {
    pub fn message(&self) -> &str {
        match self {
            LuaError::Arithmetic(msg)
            | LuaError::Pattern(msg)
            | LuaError::Format(msg)
            | LuaError::Pack(msg)
            | LuaError::Argument(msg)
            | LuaError::Callback(msg) => msg,
        }
    }

    /// `bad argument #n to 'fname' (extra)`
    pub fn bad_argument(n: usize, fname: &str, extra: &str) -> Self {
        LuaError::Argument(format!("bad argument #{} to '{}' ({})", n, fname, extra))
    }

    pub fn no_integer_rep() -> Self {
        LuaError::Arithmetic("number has no integer representation".to_string())
    }
}
