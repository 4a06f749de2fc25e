//! # riptide-proto
//!
//! The daemon / remote-control wire protocol: length-framed messages over an
//! ordered byte stream, with a one-shot version handshake per connection.
//!
//! This crate provides:
//! - Frame encoding and extraction (`frame`)
//! - The static message-name registry with per-message minimum versions
//!   (`registry`)
//! - A sans-io connection engine: handshake, payload codec selection,
//!   handler dispatch, and request/response correlation (`engine`)
//! - Builders for the JSON request/response payload convention (`rpc`)
//!
//! The engine performs no I/O of its own. An external event loop feeds it
//! received bytes and drains its outbound buffer.

pub mod engine;
pub mod error;
pub mod frame;
pub mod registry;
pub mod rpc;

pub use engine::{Connection, ConnState, Engine, HandlerTable, Reply};
pub use error::ProtoError;
pub use registry::MsgId;

/// Oldest protocol version this build speaks.
pub const PROTO_VERSION_MIN: u32 = 1;
/// Newest protocol version this build speaks.
pub const PROTO_VERSION_MAX: u32 = 2;

/// Frame header: the payload length as eight ASCII hex digits.
pub const HEADER_LEN: usize = 8;
/// Largest payload a frame may carry; header plus payload stays below 2^31.
pub const MAX_FRAME_PAYLOAD: usize = (i32::MAX as usize) - HEADER_LEN;
