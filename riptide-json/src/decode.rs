//! Streaming JSON parsing.
//!
//! One pass, one byte at a time, with a depth-bounded explicit stack of open
//! containers. Nesting past [`MAX_DEPTH`] is a parse error rather than a
//! crash, and nothing here recurses on input structure.

use crate::error::DecodeError;
use riptide_variant::{Variant, VariantStr};
use tracing::debug;

/// Containers deeper than this fail with [`DecodeError::DepthExceeded`].
pub const MAX_DEPTH: usize = 64;

type Entry = (VariantStr<'static>, Variant<'static>);

enum Open {
    List(Vec<Variant<'static>>),
    Dict {
        entries: Vec<Entry>,
        pending_key: Option<VariantStr<'static>>,
    },
}

/// What the grammar allows at the current position.
#[derive(Clone, Copy, PartialEq)]
enum Expect {
    /// A value; a close bracket here means a trailing comma.
    Value,
    /// A value, or the `]` of a just-opened array.
    ValueOrClose,
    /// An object key; a `}` here means a trailing comma.
    Key,
    /// An object key, or the `}` of a just-opened object.
    KeyOrClose,
    /// The `:` between a key and its value.
    Colon,
    /// `,` or the closing bracket of the innermost container.
    CommaOrClose,
}

/// Parses a complete JSON document. Exactly one top-level value is required;
/// empty or whitespace-only input is [`DecodeError::EmptyDocument`], and
/// non-whitespace bytes after the value are an error. `null` decodes to an
/// empty string, the closest Variant kind to "present but valueless".
pub fn decode(buf: &[u8]) -> Result<Variant<'static>, DecodeError> {
    parse(buf).map_err(|err| {
        debug!(error = %err, len = buf.len(), "json parse failed");
        err
    })
}

fn parse(buf: &[u8]) -> Result<Variant<'static>, DecodeError> {
    let mut stack: Vec<Open> = Vec::new();
    let mut expect = Expect::Value;
    let mut pos = 0usize;
    let mut result: Option<Variant<'static>> = None;

    loop {
        pos = skip_ws(buf, pos);

        if let Some(done) = result.take() {
            return if pos == buf.len() {
                Ok(done)
            } else {
                Err(DecodeError::UnexpectedChar {
                    pos,
                    byte: buf[pos],
                })
            };
        }

        let Some(&byte) = buf.get(pos) else {
            return Err(if stack.is_empty() {
                DecodeError::EmptyDocument
            } else {
                DecodeError::BracketMismatch(pos)
            });
        };

        match expect {
            Expect::Value | Expect::ValueOrClose => match byte {
                b'{' => {
                    push_container(
                        &mut stack,
                        Open::Dict {
                            entries: Vec::new(),
                            pending_key: None,
                        },
                    )?;
                    expect = Expect::KeyOrClose;
                    pos += 1;
                }
                b'[' => {
                    push_container(&mut stack, Open::List(Vec::new()))?;
                    expect = Expect::ValueOrClose;
                    pos += 1;
                }
                b']' if expect == Expect::ValueOrClose => {
                    expect = close(&mut stack, b']', pos, &mut result)?;
                    pos += 1;
                }
                b']' => return Err(DecodeError::TrailingComma(pos)),
                b'"' => {
                    let (bytes, end) = parse_string(buf, pos)?;
                    pos = end;
                    expect = attach(&mut stack, Variant::Str(bytes.into()), &mut result);
                }
                b'-' | b'0'..=b'9' => {
                    let (value, end) = parse_number(buf, pos)?;
                    pos = end;
                    expect = attach(&mut stack, value, &mut result);
                }
                b't' | b'f' | b'n' => {
                    let (value, end) = parse_literal(buf, pos)?;
                    pos = end;
                    expect = attach(&mut stack, value, &mut result);
                }
                byte => return Err(DecodeError::UnexpectedChar { pos, byte }),
            },

            Expect::Key | Expect::KeyOrClose => match byte {
                b'"' => {
                    let (bytes, end) = parse_string(buf, pos)?;
                    pos = end;
                    match stack.last_mut() {
                        Some(Open::Dict { pending_key, .. }) => {
                            *pending_key = Some(bytes.into());
                        }
                        // Keys only arise with a dict on top.
                        _ => return Err(DecodeError::BracketMismatch(pos)),
                    }
                    expect = Expect::Colon;
                }
                b'}' if expect == Expect::KeyOrClose => {
                    expect = close(&mut stack, b'}', pos, &mut result)?;
                    pos += 1;
                }
                b'}' => return Err(DecodeError::TrailingComma(pos)),
                byte => return Err(DecodeError::UnexpectedChar { pos, byte }),
            },

            Expect::Colon => match byte {
                b':' => {
                    expect = Expect::Value;
                    pos += 1;
                }
                byte => return Err(DecodeError::UnexpectedChar { pos, byte }),
            },

            Expect::CommaOrClose => match (byte, stack.last()) {
                (b',', Some(Open::List(_))) => {
                    expect = Expect::Value;
                    pos += 1;
                }
                (b',', Some(Open::Dict { .. })) => {
                    expect = Expect::Key;
                    pos += 1;
                }
                (b']', _) | (b'}', _) => {
                    expect = close(&mut stack, byte, pos, &mut result)?;
                    pos += 1;
                }
                (byte, _) => return Err(DecodeError::UnexpectedChar { pos, byte }),
            },
        }
    }
}

fn push_container(stack: &mut Vec<Open>, open: Open) -> Result<(), DecodeError> {
    if stack.len() >= MAX_DEPTH {
        return Err(DecodeError::DepthExceeded);
    }
    stack.push(open);
    Ok(())
}

/// Pops the innermost container, checking the bracket kind matches, and
/// attaches the closed container one level up.
fn close(
    stack: &mut Vec<Open>,
    bracket: u8,
    pos: usize,
    result: &mut Option<Variant<'static>>,
) -> Result<Expect, DecodeError> {
    let closed = match (stack.pop(), bracket) {
        (Some(Open::List(children)), b']') => Variant::List(children),
        (Some(Open::Dict { entries, .. }), b'}') => Variant::Dict(entries),
        _ => return Err(DecodeError::BracketMismatch(pos)),
    };
    Ok(attach(stack, closed, result))
}

fn attach(
    stack: &mut Vec<Open>,
    value: Variant<'static>,
    result: &mut Option<Variant<'static>>,
) -> Expect {
    match stack.last_mut() {
        None => {
            *result = Some(value);
            // Unused; the result check runs first on the next iteration.
            Expect::Value
        }
        Some(Open::List(children)) => {
            children.push(value);
            Expect::CommaOrClose
        }
        Some(Open::Dict {
            entries,
            pending_key,
        }) => {
            if let Some(key) = pending_key.take() {
                entries.push((key, value));
            }
            Expect::CommaOrClose
        }
    }
}

fn skip_ws(buf: &[u8], mut pos: usize) -> usize {
    while let Some(b' ' | b'\t' | b'\n' | b'\r') = buf.get(pos) {
        pos += 1;
    }
    pos
}

/// Unescapes a quoted string starting at `pos` (the opening quote). Returns
/// the decoded bytes and the offset just past the closing quote.
///
/// `\uXXXX` escapes become the UTF-8 encoding of the named code point, with
/// UTF-16 surrogate pairs recombined into their supplementary-plane
/// character; an unpaired surrogate decodes to U+FFFD.
fn parse_string(buf: &[u8], pos: usize) -> Result<(Vec<u8>, usize), DecodeError> {
    let start = pos;
    let mut cursor = pos + 1;
    let mut out = Vec::new();

    loop {
        let Some(&byte) = buf.get(cursor) else {
            return Err(DecodeError::UnterminatedString(start));
        };
        match byte {
            b'"' => return Ok((out, cursor + 1)),
            b'\\' => {
                let escape_pos = cursor;
                cursor += 1;
                match buf.get(cursor) {
                    None => return Err(DecodeError::UnterminatedString(start)),
                    Some(b'"') => out.push(b'"'),
                    Some(b'\\') => out.push(b'\\'),
                    Some(b'/') => out.push(b'/'),
                    Some(b'b') => out.push(0x08),
                    Some(b'f') => out.push(0x0c),
                    Some(b'n') => out.push(b'\n'),
                    Some(b'r') => out.push(b'\r'),
                    Some(b't') => out.push(b'\t'),
                    Some(b'u') => {
                        let unit = parse_hex4(buf, cursor + 1, escape_pos)?;
                        cursor += 4;
                        let ch = match unit {
                            0xD800..=0xDBFF => {
                                // High surrogate; pair it with a following
                                // \uXXXX low surrogate when there is one.
                                match peek_low_surrogate(buf, cursor + 1) {
                                    Some(low) => {
                                        cursor += 6;
                                        let combined = 0x10000
                                            + ((u32::from(unit) - 0xD800) << 10)
                                            + (u32::from(low) - 0xDC00);
                                        char::from_u32(combined)
                                            .unwrap_or(char::REPLACEMENT_CHARACTER)
                                    }
                                    None => char::REPLACEMENT_CHARACTER,
                                }
                            }
                            0xDC00..=0xDFFF => char::REPLACEMENT_CHARACTER,
                            unit => {
                                char::from_u32(u32::from(unit))
                                    .unwrap_or(char::REPLACEMENT_CHARACTER)
                            }
                        };
                        let mut utf8 = [0u8; 4];
                        out.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
                    }
                    Some(_) => return Err(DecodeError::BadEscape(escape_pos)),
                }
                cursor += 1;
            }
            0x00..=0x1f => {
                return Err(DecodeError::UnexpectedChar { pos: cursor, byte });
            }
            byte => {
                // Raw UTF-8 passes through untouched.
                out.push(byte);
                cursor += 1;
            }
        }
    }
}

fn parse_hex4(buf: &[u8], pos: usize, escape_pos: usize) -> Result<u16, DecodeError> {
    let mut unit: u16 = 0;
    for i in 0..4 {
        let digit = buf
            .get(pos + i)
            .and_then(|b| char::from(*b).to_digit(16))
            .ok_or(DecodeError::BadEscape(escape_pos))?;
        unit = (unit << 4) | digit as u16;
    }
    Ok(unit)
}

/// Reads `\uXXXX` at `pos` if it names a low surrogate.
fn peek_low_surrogate(buf: &[u8], pos: usize) -> Option<u16> {
    if buf.get(pos) != Some(&b'\\') || buf.get(pos + 1) != Some(&b'u') {
        return None;
    }
    match parse_hex4(buf, pos + 2, pos) {
        Ok(unit @ 0xDC00..=0xDFFF) => Some(unit),
        _ => None,
    }
}

/// Scans one numeric literal, classifying it as Int or Real in the same
/// pass: digits only means Int, a `.` or exponent means Real. An integer
/// too large for i64 also falls back to Real.
fn parse_number(buf: &[u8], pos: usize) -> Result<(Variant<'static>, usize), DecodeError> {
    let start = pos;
    let mut cursor = pos;
    let mut is_real = false;

    if buf.get(cursor) == Some(&b'-') {
        cursor += 1;
    }
    let digits_start = cursor;
    let int_digits = eat_digits(buf, &mut cursor);
    if int_digits == 0 {
        return Err(bad_byte(buf, cursor));
    }
    // Leading zeros are not grammar: the integer part is `0` or starts
    // with a nonzero digit.
    if int_digits > 1 && buf[digits_start] == b'0' {
        return Err(bad_byte(buf, digits_start + 1));
    }
    if buf.get(cursor) == Some(&b'.') {
        is_real = true;
        cursor += 1;
        if eat_digits(buf, &mut cursor) == 0 {
            return Err(bad_byte(buf, cursor));
        }
    }
    if let Some(b'e' | b'E') = buf.get(cursor) {
        is_real = true;
        cursor += 1;
        if let Some(b'+' | b'-') = buf.get(cursor) {
            cursor += 1;
        }
        if eat_digits(buf, &mut cursor) == 0 {
            return Err(bad_byte(buf, cursor));
        }
    }

    let text = std::str::from_utf8(&buf[start..cursor]).map_err(|_| bad_byte(buf, start))?;
    let value = if is_real {
        Variant::Real(text.parse().map_err(|_| bad_byte(buf, start))?)
    } else {
        match text.parse::<i64>() {
            Ok(i) => Variant::Int(i),
            // Magnitude beyond i64; keep it, at reduced precision.
            Err(_) => Variant::Real(text.parse().map_err(|_| bad_byte(buf, start))?),
        }
    };
    Ok((value, cursor))
}

fn eat_digits(buf: &[u8], cursor: &mut usize) -> usize {
    let start = *cursor;
    while matches!(buf.get(*cursor), Some(b) if b.is_ascii_digit()) {
        *cursor += 1;
    }
    *cursor - start
}

fn bad_byte(buf: &[u8], pos: usize) -> DecodeError {
    DecodeError::UnexpectedChar {
        pos,
        byte: buf.get(pos).copied().unwrap_or(0),
    }
}

fn parse_literal(buf: &[u8], pos: usize) -> Result<(Variant<'static>, usize), DecodeError> {
    for (word, value) in [
        (&b"true"[..], Variant::Bool(true)),
        (&b"false"[..], Variant::Bool(false)),
        (&b"null"[..], Variant::str("")),
    ] {
        if buf[pos..].starts_with(word) {
            return Ok((value, pos + word.len()));
        }
    }
    Err(bad_byte(buf, pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars() {
        assert_eq!(decode(b"0").unwrap(), Variant::Int(0));
        assert_eq!(decode(b"-17").unwrap(), Variant::Int(-17));
        assert_eq!(decode(b"2.5").unwrap(), Variant::Real(2.5));
        assert_eq!(decode(b"1e3").unwrap(), Variant::Real(1000.0));
        assert_eq!(decode(b"true").unwrap(), Variant::Bool(true));
        assert_eq!(decode(b"false").unwrap(), Variant::Bool(false));
        assert_eq!(decode(b"\"hi\"").unwrap(), Variant::str("hi"));
    }

    #[test]
    fn test_null_decodes_to_empty_string() {
        assert_eq!(decode(b"null").unwrap(), Variant::str(""));
    }

    #[test]
    fn test_rejects_leading_zero_numbers() {
        assert!(matches!(
            decode(b"01"),
            Err(DecodeError::UnexpectedChar { pos: 1, .. })
        ));
        assert!(matches!(
            decode(b"-012"),
            Err(DecodeError::UnexpectedChar { pos: 2, .. })
        ));
        // A lone zero, with or without a fraction, is fine.
        assert_eq!(decode(b"0").unwrap(), Variant::Int(0));
        assert_eq!(decode(b"0.5").unwrap(), Variant::Real(0.5));
        assert_eq!(decode(b"-0.5").unwrap(), Variant::Real(-0.5));
    }

    #[test]
    fn test_integer_overflow_falls_back_to_real() {
        let v = decode(b"92233720368547758080").unwrap();
        assert!(matches!(v, Variant::Real(_)));
    }

    #[test]
    fn test_containers() {
        let v = decode(b" { \"a\" : [ 1 , 2 ] , \"b\" : { } } ").unwrap();
        assert_eq!(v.get_list("a").unwrap().len(), 2);
        assert_eq!(v.get_dict("b").unwrap().as_dict().unwrap().len(), 0);
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(decode(b"[]").unwrap(), Variant::new_list());
        assert_eq!(decode(b"{}").unwrap(), Variant::new_dict());
    }

    #[test]
    fn test_simple_escapes() {
        assert_eq!(
            decode(br#""a\"b\\c\/d\n""#).unwrap(),
            Variant::str("a\"b\\c/d\n")
        );
    }

    #[test]
    fn test_unicode_escape_backslash() {
        assert_eq!(decode(br#""\u005C""#).unwrap(), Variant::str("\\"));
    }

    #[test]
    fn test_unicode_escape_bmp() {
        assert_eq!(decode(br#""\u00e9""#).unwrap(), Variant::str("é"));
        assert_eq!(decode(br#""\u6c34""#).unwrap(), Variant::str("水"));
    }

    #[test]
    fn test_surrogate_pair_recombined() {
        // U+1D11E, musical G clef.
        assert_eq!(decode(br#""\uD834\uDD1E""#).unwrap(), Variant::str("𝄞"));
    }

    #[test]
    fn test_lone_surrogates_become_replacement_char() {
        assert_eq!(decode(br#""\uD834""#).unwrap(), Variant::str("\u{FFFD}"));
        assert_eq!(decode(br#""\uDD1E""#).unwrap(), Variant::str("\u{FFFD}"));
        assert_eq!(
            decode(br#""\uD834x""#).unwrap(),
            Variant::str("\u{FFFD}x")
        );
    }

    #[test]
    fn test_raw_utf8_passes_through() {
        assert_eq!(decode("\"héllo\"".as_bytes()).unwrap(), Variant::str("héllo"));
    }

    #[test]
    fn test_bad_escape() {
        assert!(matches!(decode(br#""\q""#), Err(DecodeError::BadEscape(_))));
        assert!(matches!(
            decode(br#""\u12g4""#),
            Err(DecodeError::BadEscape(_))
        ));
    }

    #[test]
    fn test_control_char_in_string() {
        assert!(matches!(
            decode(b"\"a\x01b\""),
            Err(DecodeError::UnexpectedChar { .. })
        ));
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(decode(b"\"abc"), Err(DecodeError::UnterminatedString(0)));
        assert_eq!(decode(b"\"abc\\"), Err(DecodeError::UnterminatedString(0)));
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(decode(b""), Err(DecodeError::EmptyDocument));
        assert_eq!(decode(b"   \n\t "), Err(DecodeError::EmptyDocument));
    }

    #[test]
    fn test_trailing_garbage() {
        assert!(matches!(
            decode(b"1 2"),
            Err(DecodeError::UnexpectedChar { pos: 2, .. })
        ));
        assert!(matches!(
            decode(b"{} x"),
            Err(DecodeError::UnexpectedChar { .. })
        ));
    }

    #[test]
    fn test_trailing_comma() {
        assert!(matches!(
            decode(b"[1,]"),
            Err(DecodeError::TrailingComma(3))
        ));
        assert!(matches!(
            decode(b"{\"a\":1,}"),
            Err(DecodeError::TrailingComma(7))
        ));
    }

    #[test]
    fn test_bracket_mismatch() {
        assert!(matches!(
            decode(b"[1}"),
            Err(DecodeError::BracketMismatch(_))
        ));
        assert!(matches!(
            decode(b"{\"a\":1]"),
            Err(DecodeError::BracketMismatch(_))
        ));
        assert!(matches!(decode(b"[1"), Err(DecodeError::BracketMismatch(_))));
    }

    #[test]
    fn test_missing_colon_or_value() {
        assert!(matches!(
            decode(b"{\"a\" 1}"),
            Err(DecodeError::UnexpectedChar { .. })
        ));
        assert!(matches!(
            decode(b"{\"a\":}"),
            Err(DecodeError::UnexpectedChar { .. })
        ));
    }

    #[test]
    fn test_depth_limit() {
        let ok = "[".repeat(MAX_DEPTH) + &"]".repeat(MAX_DEPTH);
        assert!(decode(ok.as_bytes()).is_ok());

        let too_deep = "[".repeat(MAX_DEPTH + 1) + &"]".repeat(MAX_DEPTH + 1);
        assert_eq!(
            decode(too_deep.as_bytes()),
            Err(DecodeError::DepthExceeded)
        );
    }

    #[test]
    fn test_duplicate_keys_first_match() {
        let v = decode(br#"{"a":1,"a":2}"#).unwrap();
        assert_eq!(v.get_int("a"), Some(1));
        assert_eq!(v.as_dict().unwrap().len(), 2);
    }
}
