//! Text-codec error types.

use thiserror::Error;

/// Reasons a buffer fails to parse as JSON. Like the binary codec, every
/// failure is recoverable by discarding the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected byte {byte:#04x} at byte {pos}")]
    UnexpectedChar { pos: usize, byte: u8 },

    #[error("string starting at byte {0} is never closed")]
    UnterminatedString(usize),

    #[error("bad escape sequence at byte {0}")]
    BadEscape(usize),

    #[error("nesting deeper than {max} containers", max = super::decode::MAX_DEPTH)]
    DepthExceeded,

    #[error("mismatched or unclosed bracket at byte {0}")]
    BracketMismatch(usize),

    #[error("trailing comma at byte {0}")]
    TrailingComma(usize),

    #[error("document contains no value")]
    EmptyDocument,
}
