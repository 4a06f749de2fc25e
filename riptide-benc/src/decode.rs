//! Bencode parsing.
//!
//! The parser is iterative: an explicit stack of open containers bounds
//! nesting depth by available heap instead of call-stack frames. A recursive
//! ancestor of this parser was vulnerable to stack smashing via
//! maliciously-deep input; keep it that way.

use crate::error::DecodeError;
use riptide_variant::{Variant, VariantStr};

type Entry = (VariantStr<'static>, Variant<'static>);

enum Open {
    List(Vec<Variant<'static>>),
    Dict {
        entries: Vec<Entry>,
        pending_key: Option<VariantStr<'static>>,
    },
}

/// Parses a complete bencoded value. The whole buffer must be consumed:
/// bytes after the outermost value are [`DecodeError::TrailingData`].
/// Decoded strings are always owned copies of the input.
pub fn decode(buf: &[u8]) -> Result<Variant<'static>, DecodeError> {
    let mut stack: Vec<Open> = Vec::new();
    let mut pos = 0usize;

    loop {
        if pos >= buf.len() {
            // Ran out of input with a container still open, or before any
            // token at all.
            return Err(DecodeError::Truncated);
        }

        match buf[pos] {
            b'i' => {
                let (value, end) = parse_int(buf, pos)?;
                pos = end;
                if let Some(done) = attach(&mut stack, Variant::Int(value), pos)? {
                    return finish(done, buf, pos);
                }
            }
            b'0'..=b'9' => {
                let (value, end) = parse_str(buf, pos)?;
                pos = end;
                if let Some(done) = attach_str(&mut stack, value, pos)? {
                    return finish(done, buf, pos);
                }
            }
            b'l' => {
                stack.push(Open::List(Vec::new()));
                pos += 1;
            }
            b'd' => {
                stack.push(Open::Dict {
                    entries: Vec::new(),
                    pending_key: None,
                });
                pos += 1;
            }
            b'e' => {
                let open = stack.pop().ok_or(DecodeError::UnmatchedClose(pos))?;
                pos += 1;
                let closed = match open {
                    Open::List(children) => Variant::List(children),
                    Open::Dict {
                        pending_key: Some(_),
                        ..
                    } => return Err(DecodeError::OddDictArity),
                    Open::Dict { entries, .. } => Variant::Dict(entries),
                };
                if let Some(done) = attach(&mut stack, closed, pos)? {
                    return finish(done, buf, pos);
                }
            }
            byte => return Err(DecodeError::UnexpectedByte { offset: pos, byte }),
        }
    }
}

/// Hands a completed non-key value to the innermost open container, or
/// reports it as the final result when no container is open.
fn attach(
    stack: &mut Vec<Open>,
    value: Variant<'static>,
    pos: usize,
) -> Result<Option<Variant<'static>>, DecodeError> {
    match stack.last_mut() {
        None => Ok(Some(value)),
        Some(Open::List(children)) => {
            children.push(value);
            Ok(None)
        }
        Some(Open::Dict {
            entries,
            pending_key,
        }) => match pending_key.take() {
            Some(key) => {
                entries.push((key, value));
                Ok(None)
            }
            // A value arrived where a key belongs; keys must be strings.
            None => Err(DecodeError::NonStringKey(pos)),
        },
    }
}

/// Like [`attach`], but a string in key position becomes the pending key.
fn attach_str(
    stack: &mut Vec<Open>,
    value: VariantStr<'static>,
    pos: usize,
) -> Result<Option<Variant<'static>>, DecodeError> {
    if let Some(Open::Dict {
        pending_key: pending_key @ None,
        ..
    }) = stack.last_mut()
    {
        *pending_key = Some(value);
        return Ok(None);
    }
    attach(stack, Variant::Str(value), pos)
}

fn finish(
    value: Variant<'static>,
    buf: &[u8],
    pos: usize,
) -> Result<Variant<'static>, DecodeError> {
    if pos != buf.len() {
        return Err(DecodeError::TrailingData(pos));
    }
    Ok(value)
}

/// `i<digits>e`, optionally negative, signed 64-bit. A leading zero is only
/// allowed when the value is exactly zero.
fn parse_int(buf: &[u8], pos: usize) -> Result<(i64, usize), DecodeError> {
    let body_start = pos + 1;
    let rel_end = buf[body_start..]
        .iter()
        .position(|&b| b == b'e')
        .ok_or(DecodeError::Truncated)?;
    let body = &buf[body_start..body_start + rel_end];

    let (negative, digits) = match body.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, body),
    };
    if digits.is_empty() {
        return Err(DecodeError::MalformedInt(pos));
    }

    let mut value: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return Err(DecodeError::MalformedInt(pos));
        }
        let digit = i64::from(b - b'0');
        // Accumulate toward the sign so that i64::MIN parses.
        value = value
            .checked_mul(10)
            .and_then(|v| {
                if negative {
                    v.checked_sub(digit)
                } else {
                    v.checked_add(digit)
                }
            })
            .ok_or(DecodeError::MalformedInt(pos))?;
    }

    if value != 0 && body[0] == b'0' {
        return Err(DecodeError::MalformedInt(pos));
    }

    Ok((value, body_start + rel_end + 1))
}

/// `<len>:<len bytes>`: unsigned decimal length, nothing but digits before
/// the colon.
fn parse_str(buf: &[u8], pos: usize) -> Result<(VariantStr<'static>, usize), DecodeError> {
    let mut len: usize = 0;
    let mut cursor = pos;
    loop {
        match buf.get(cursor) {
            None => return Err(DecodeError::Truncated),
            Some(b':') => {
                cursor += 1;
                break;
            }
            Some(&b) if b.is_ascii_digit() => {
                len = len
                    .checked_mul(10)
                    .and_then(|l| l.checked_add(usize::from(b - b'0')))
                    .ok_or(DecodeError::MalformedLen(pos))?;
                cursor += 1;
            }
            Some(_) => return Err(DecodeError::MalformedLen(pos)),
        }
    }

    let end = cursor.checked_add(len).ok_or(DecodeError::MalformedLen(pos))?;
    if end > buf.len() {
        return Err(DecodeError::Truncated);
    }
    Ok((VariantStr::Owned(buf[cursor..end].to_vec()), end))
}
