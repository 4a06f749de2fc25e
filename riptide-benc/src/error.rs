//! Binary-codec error types.

use thiserror::Error;

/// Reasons a buffer fails to parse as bencode. All of these are recoverable
/// by discarding the offending buffer; none of them panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("input ended in the middle of a token")]
    Truncated,

    #[error("malformed integer at byte {0}")]
    MalformedInt(usize),

    #[error("malformed string length at byte {0}")]
    MalformedLen(usize),

    #[error("dict closed with a key missing its value")]
    OddDictArity,

    #[error("unmatched 'e' at byte {0}")]
    UnmatchedClose(usize),

    #[error("trailing data after the outermost value, starting at byte {0}")]
    TrailingData(usize),

    #[error("unexpected byte {byte:#04x} at byte {offset}")]
    UnexpectedByte { offset: usize, byte: u8 },

    #[error("dict key at byte {0} is not a string")]
    NonStringKey(usize),
}
