//! Wire framing.
//!
//! Each message is `<8 ASCII hex digits of payload length><payload>`. The
//! extractor pulls as many complete frames as a buffer holds and leaves a
//! trailing partial frame for the caller to retry once more bytes arrive.

use crate::error::ProtoError;
use crate::{HEADER_LEN, MAX_FRAME_PAYLOAD};

/// Prepends the length header to `payload`.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, ProtoError> {
    if payload.len() > MAX_FRAME_PAYLOAD {
        return Err(ProtoError::FrameTooLarge(payload.len()));
    }
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(format!("{:08X}", payload.len()).as_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Extracts the first complete frame from `buf`.
///
/// Returns `Ok(Some((payload, consumed)))` for a complete frame,
/// `Ok(None)` when the buffer holds only a partial frame, and an error for a
/// header that is not hex or declares an oversize payload.
pub fn split_frame(buf: &[u8]) -> Result<Option<(&[u8], usize)>, ProtoError> {
    if buf.len() < HEADER_LEN {
        return Ok(None);
    }
    let header = &buf[..HEADER_LEN];
    if !header.iter().all(u8::is_ascii_hexdigit) {
        return Err(ProtoError::BadLengthHeader);
    }
    let text = std::str::from_utf8(header).map_err(|_| ProtoError::BadLengthHeader)?;
    let len = usize::from_str_radix(text, 16).map_err(|_| ProtoError::BadLengthHeader)?;
    if len > MAX_FRAME_PAYLOAD {
        return Err(ProtoError::FrameTooLarge(len));
    }

    let total = HEADER_LEN + len;
    if buf.len() < total {
        return Ok(None);
    }
    Ok(Some((&buf[HEADER_LEN..total], total)))
}
