//! Format interpreter error type.

use std::fmt;

use packbuf_buffers::BufferError;
use thiserror::Error;

/// Names the argument a pack field was sourced from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgRef {
    /// Zero-based index into the top-level argument list.
    Arg(usize),
    /// Zero-based index into the sequence of the enclosing scope.
    Item(usize),
    /// Key in the mapping of the enclosing scope.
    Key(String),
}

impl fmt::Display for ArgRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgRef::Arg(i) => write!(f, "argument #{i}"),
            ArgRef::Item(i) => write!(f, "item [{i}]"),
            ArgRef::Key(k) => write!(f, "field '{k}'"),
        }
    }
}

/// Error type for pack and unpack calls.
///
/// Every variant is fatal: the call returns no values. Running out of input
/// while unpacking is not an error and shows up as a `Null` result instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("invalid format '{letter}' at {pos}")]
    InvalidLetter { letter: char, pos: usize },
    #[error("invalid width {width} of format '{letter}' at {pos}")]
    InvalidWidth {
        letter: char,
        width: usize,
        pos: usize,
    },
    #[error("invalid count of format '{letter}' at {pos}")]
    InvalidCount { letter: char, pos: usize },
    #[error("unbalanced '{{' in format")]
    UnclosedScope,
    #[error("unbalanced '}}' in format at {pos}")]
    UnopenedScope { pos: usize },
    #[error("key at top level near '{key}'")]
    KeyAtTopLevel { key: String, pos: usize },
    #[error("key without format near '{key}'")]
    KeyWithoutFormat { key: String, pos: usize },
    #[error("keyed and positional fields mixed in one scope at {pos}")]
    MixedKeys { pos: usize },
    #[error("can only retrieve position out of block (at {pos})")]
    PositionInScope { pos: usize },
    #[error("keyed field '{key}' cannot repeat")]
    KeyedRepeat { key: String, pos: usize },
    #[error("length {len} does not fit a {width}-byte prefix")]
    LengthOverflow { len: usize, width: usize },
    #[error("{expected} expected in {arg}, got {found}")]
    ArgumentType {
        arg: ArgRef,
        expected: &'static str,
        found: &'static str,
    },
    #[error("missing {0}")]
    MissingArgument(ArgRef),
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

pub type Result<T> = std::result::Result<T, FormatError>;
