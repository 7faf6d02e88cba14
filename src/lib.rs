//! bytepatch — Scriptable In-Place File Editor
//!
//! This crate provides the command-language front end and execution engine for
//! the `bytepatch` CLI: a small script is compiled into an instruction
//! sequence, then executed against a single open file, moving the file's own
//! seek position as the cursor and reading, writing, or verifying bytes there.
//!
//! The command language is a strictly linear instruction sequence — no loops,
//! no conditionals, no variables:
//!
//! ```text
//! b6        # go to byte 6
//! e/world/  # verify the next 5 bytes are 'world'
//! b6
//! w/earth/  # overwrite them
//! q         # quit (implicit at end of script)
//! ```
//!
//! See [`parse_script`] for the grammar and [`Session`] for execution
//! semantics.

mod engine;
mod parse;

pub use engine::{Session, DEFAULT_PRINT_LEN};
pub use parse::{parse_script, Instruction};

use thiserror::Error;

/// A script failed to parse.
///
/// Parsing is all-or-nothing: on any `ScriptError` no instruction sequence is
/// produced and nothing is executed. Offsets are byte offsets into the script
/// source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// A character that is neither a command letter, whitespace, nor `#`.
    #[error("invalid character '{ch}' at offset {offset}")]
    InvalidCharacter { ch: char, offset: usize },

    /// A command that requires a numeric argument had no digits after it.
    #[error("'{cmd}' requires a numeric argument (offset {offset})")]
    MissingNumber { cmd: char, offset: usize },

    /// A run of digits too large for a 64-bit offset.
    #[error("numeric argument at offset {offset} does not fit in 64 bits")]
    NumberOutOfRange { offset: usize },

    /// A string command was not followed by an opening delimiter.
    #[error("'{cmd}' requires a delimited string argument (offset {offset})")]
    MissingDelimiter { cmd: char, offset: usize },

    /// The script ended before a string's closing delimiter.
    #[error("unterminated string argument starting at offset {offset}")]
    UnterminatedString { offset: usize },
}

/// An instruction failed during execution.
///
/// Execution stops at the first failure; the file cursor reflects exactly the
/// bytes consumed or produced before the failure was detected (no rollback).
#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An `e` verification could not read as many bytes as it expected.
    #[error("expected to read {expected} bytes, actually read {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// An `e` verification read the right number of bytes but they differ.
    #[error("expected '{expected}', got '{actual}'")]
    ExpectMismatch { expected: String, actual: String },

    /// An `l` command addressed a line the file does not contain.
    #[error("line {line} not found: file has fewer lines")]
    LineOutOfRange { line: u64 },
}

impl EditError {
    /// True when the failure is the file not matching an `e` expectation
    /// (content mismatch or too few bytes), as opposed to an I/O or
    /// addressing failure. The CLI maps this to its own exit code.
    pub fn is_expect_failure(&self) -> bool {
        matches!(
            self,
            EditError::ExpectMismatch { .. } | EditError::ShortRead { .. }
        )
    }
}
