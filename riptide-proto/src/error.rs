//! Protocol error types.
//!
//! Framing and handshake errors are fatal to their connection; the caller
//! tears the connection down on seeing one. [`ProtoError::FrameTooLarge`]
//! from a send is returned to the caller without closing anything.

use crate::registry::MsgId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("frame length header is not eight hex digits")]
    BadLengthHeader,

    #[error("frame payload of {0} bytes exceeds the protocol maximum")]
    FrameTooLarge(usize),

    #[error("malformed version handshake")]
    BadHandshake,

    #[error("no common protocol version with peer range [{min}, {max}]")]
    UnsupportedVersion { min: i64, max: i64 },

    #[error("message does not fit the negotiated payload shape")]
    MalformedMessage,

    #[error("message {0:?} is not available at the negotiated version")]
    MessageNotSupported(String),

    #[error("correlation tags are not supported at the negotiated version")]
    TagsUnsupported,

    #[error("connection has not completed its version handshake")]
    NotVersioned,

    #[error("connection is closed")]
    ConnectionClosed,

    #[error("a handler is already registered for {0:?}")]
    HandlerAlreadyRegistered(MsgId),

    #[error("{0:?} cannot take a specific handler")]
    InvalidHandlerId(MsgId),

    #[error("binary payload: {0}")]
    Benc(#[from] riptide_benc::DecodeError),

    #[error("text payload: {0}")]
    Json(#[from] riptide_json::DecodeError),
}
