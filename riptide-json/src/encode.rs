//! JSON serialization.
//!
//! Driven by the shared non-recursive walk, in insertion order. Number
//! formatting never consults the process locale: integers are plain decimal
//! and reals are fixed four-decimal text, truncated rather than rounded.

use riptide_variant::{walk, Variant, VariantStr, WalkHandler};

struct JsonWriter {
    out: Vec<u8>,
    pretty: bool,
    frames: Vec<Frame>,
}

struct Frame {
    is_dict: bool,
    children: usize,
    awaiting_value: bool,
}

impl JsonWriter {
    /// Comma / newline / indent before the next child of the open container.
    fn child_sep(&mut self) {
        let Some(frame) = self.frames.last() else {
            return;
        };
        if frame.children > 0 {
            self.out.push(b',');
        }
        if self.pretty {
            self.out.push(b'\n');
            let depth = self.frames.len();
            self.out.extend(std::iter::repeat(b' ').take(depth * 4));
        }
    }

    fn begin_value(&mut self) {
        match self.frames.last() {
            Some(frame) if frame.is_dict && frame.awaiting_value => {}
            Some(_) => self.child_sep(),
            None => {}
        }
    }

    fn end_value(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.children += 1;
            frame.awaiting_value = false;
        }
    }

    fn push_escaped(&mut self, bytes: &[u8]) {
        self.out.push(b'"');
        let mut rest = bytes;
        while !rest.is_empty() {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.push_chars(text);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        self.push_chars(text);
                    }
                    // Skip the undecodable bytes.
                    let bad = err.error_len().unwrap_or(after.len());
                    rest = &after[bad..];
                }
            }
        }
        self.out.push(b'"');
    }

    fn push_chars(&mut self, text: &str) {
        for ch in text.chars() {
            match ch {
                '"' => self.out.extend_from_slice(b"\\\""),
                '\\' => self.out.extend_from_slice(b"\\\\"),
                '\u{08}' => self.out.extend_from_slice(b"\\b"),
                '\u{0c}' => self.out.extend_from_slice(b"\\f"),
                '\n' => self.out.extend_from_slice(b"\\n"),
                '\r' => self.out.extend_from_slice(b"\\r"),
                '\t' => self.out.extend_from_slice(b"\\t"),
                ' '..='~' => self.out.push(ch as u8),
                ch => {
                    let cp = ch as u32;
                    if cp <= 0xFFFF {
                        self.push_unit(cp as u16);
                    } else {
                        // Outside the BMP: a UTF-16 surrogate pair.
                        let v = cp - 0x10000;
                        self.push_unit(0xD800 + (v >> 10) as u16);
                        self.push_unit(0xDC00 + (v & 0x3FF) as u16);
                    }
                }
            }
        }
    }

    fn push_unit(&mut self, unit: u16) {
        let text = format!("\\u{unit:04x}");
        self.out.extend_from_slice(text.as_bytes());
    }

    fn open_container(&mut self, is_dict: bool) {
        self.begin_value();
        self.out.push(if is_dict { b'{' } else { b'[' });
        self.frames.push(Frame {
            is_dict,
            children: 0,
            awaiting_value: false,
        });
    }
}

impl WalkHandler for JsonWriter {
    fn on_int(&mut self, value: i64) {
        self.begin_value();
        self.out.extend_from_slice(value.to_string().as_bytes());
        self.end_value();
    }

    fn on_bool(&mut self, value: bool) {
        self.begin_value();
        self.out
            .extend_from_slice(if value { b"true" } else { b"false" });
        self.end_value();
    }

    fn on_real(&mut self, value: f64) {
        self.begin_value();
        // Truncate toward zero at four decimal places. Scaling overflows
        // for very large magnitudes, but those have no fractional part to
        // truncate, so they format as-is.
        let scaled = value * 10_000.0;
        let text = if scaled.is_finite() {
            format!("{:.4}", scaled.trunc() / 10_000.0)
        } else {
            format!("{value:.4}")
        };
        self.out.extend_from_slice(text.as_bytes());
        self.end_value();
    }

    fn on_string(&mut self, value: &VariantStr<'_>) {
        let key_position = matches!(
            self.frames.last(),
            Some(frame) if frame.is_dict && !frame.awaiting_value
        );
        if key_position {
            self.child_sep();
            self.push_escaped(value.as_bytes());
            self.out
                .extend_from_slice(if self.pretty { b": " } else { b":" });
            if let Some(frame) = self.frames.last_mut() {
                frame.awaiting_value = true;
            }
        } else {
            self.begin_value();
            self.push_escaped(value.as_bytes());
            self.end_value();
        }
    }

    fn on_dict_begin(&mut self, _: &Variant<'_>) {
        self.open_container(true);
    }

    fn on_list_begin(&mut self, _: &Variant<'_>) {
        self.open_container(false);
    }

    fn on_container_end(&mut self, _: &Variant<'_>) {
        let frame = match self.frames.pop() {
            Some(frame) => frame,
            None => return,
        };
        if self.pretty && frame.children > 0 {
            self.out.push(b'\n');
            let depth = self.frames.len();
            self.out.extend(std::iter::repeat(b' ').take(depth * 4));
        }
        self.out.push(if frame.is_dict { b'}' } else { b']' });
        self.end_value();
    }
}

/// Serializes `value` as JSON, in dict insertion order, with a trailing
/// newline. With `pretty`, children sit one per line at four spaces per
/// nesting level and keys are separated from values by `": "`.
pub fn encode(value: &Variant<'_>, pretty: bool) -> Vec<u8> {
    let mut writer = JsonWriter {
        out: Vec::new(),
        pretty,
        frames: Vec::new(),
    };
    walk(value, false, &mut writer);
    writer.out.push(b'\n');
    writer.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use proptest::prelude::*;

    fn compact(value: &Variant<'_>) -> String {
        String::from_utf8(encode(value, false)).unwrap()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(compact(&Variant::Int(-17)), "-17\n");
        assert_eq!(compact(&Variant::Bool(true)), "true\n");
        assert_eq!(compact(&Variant::Bool(false)), "false\n");
        assert_eq!(compact(&Variant::str("hi")), "\"hi\"\n");
    }

    #[test]
    fn test_reals_truncate_to_four_decimals() {
        assert_eq!(compact(&Variant::Real(0.25)), "0.2500\n");
        assert_eq!(compact(&Variant::Real(0.123_99)), "0.1239\n");
        assert_eq!(compact(&Variant::Real(-0.123_99)), "-0.1239\n");
        assert_eq!(compact(&Variant::Real(2.0)), "2.0000\n");
    }

    #[test]
    fn test_huge_reals_round_trip() {
        // Magnitudes where the four-decimal scaling would overflow; the
        // output must still be a plain decimal literal.
        for value in [1.0e308, -1.0e308, 2.5e304] {
            let wire = encode(&Variant::Real(value), false);
            assert!(wire
                .iter()
                .all(|&b| b.is_ascii_digit() || matches!(b, b'-' | b'.' | b'\n')));
            assert_eq!(decode(&wire).unwrap(), Variant::Real(value));
        }
    }

    #[test]
    fn test_compact_containers() {
        let mut d = Variant::new_dict();
        d.insert("a", Variant::Int(1)).unwrap();
        let mut l = Variant::new_list();
        l.push(Variant::Int(2)).unwrap();
        l.push(Variant::str("x")).unwrap();
        d.insert("b", l).unwrap();
        assert_eq!(compact(&d), "{\"a\":1,\"b\":[2,\"x\"]}\n");
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut d = Variant::new_dict();
        d.insert("zeta", Variant::Int(1)).unwrap();
        d.insert("alpha", Variant::Int(2)).unwrap();
        assert_eq!(compact(&d), "{\"zeta\":1,\"alpha\":2}\n");
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(compact(&Variant::new_dict()), "{}\n");
        assert_eq!(compact(&Variant::new_list()), "[]\n");
        assert_eq!(
            String::from_utf8(encode(&Variant::new_dict(), true)).unwrap(),
            "{}\n"
        );
    }

    #[test]
    fn test_pretty_layout() {
        let mut inner = Variant::new_list();
        inner.push(Variant::Int(1)).unwrap();
        inner.push(Variant::Int(2)).unwrap();
        let mut d = Variant::new_dict();
        d.insert("a", Variant::Int(1)).unwrap();
        d.insert("b", inner).unwrap();

        let text = String::from_utf8(encode(&d, true)).unwrap();
        let expected = "\
{
    \"a\": 1,
    \"b\": [
        1,
        2
    ]
}
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            compact(&Variant::str("a\"b\\c\nd\te")),
            "\"a\\\"b\\\\c\\nd\\te\"\n"
        );
        // Control character below the named escapes.
        assert_eq!(compact(&Variant::str("\u{01}")), "\"\\u0001\"\n");
    }

    #[test]
    fn test_non_ascii_escapes_and_round_trips() {
        let original = "héllo 水 𝄞";
        let wire = encode(&Variant::str(original), false);
        let text = String::from_utf8(wire.clone()).unwrap();
        assert!(text.contains("\\u00e9"));
        assert!(text.contains("\\u6c34"));
        // Supplementary plane goes out as a surrogate pair.
        assert!(text.contains("\\ud834\\udd1e"));
        assert!(text.is_ascii());

        let back = decode(&wire).unwrap();
        assert_eq!(back.as_bytes().unwrap(), original.as_bytes());
    }

    #[test]
    fn test_invalid_utf8_bytes_are_dropped() {
        let v = Variant::str(vec![b'a', 0xff, b'b']);
        assert_eq!(compact(&v), "\"ab\"\n");
    }

    #[test]
    fn test_round_trip_nested() {
        let mut d = Variant::new_dict();
        d.insert("name", Variant::str("river")).unwrap();
        d.insert("on", Variant::Bool(true)).unwrap();
        let mut l = Variant::new_list();
        l.push(Variant::Int(1)).unwrap();
        l.push(Variant::Real(0.5)).unwrap();
        d.insert("vals", l).unwrap();

        for pretty in [false, true] {
            let back = decode(&encode(&d, pretty)).unwrap();
            assert_eq!(back, d);
        }
    }

    fn arb_tree() -> impl Strategy<Value = Variant<'static>> {
        let leaf = prop_oneof![
            any::<i64>().prop_map(Variant::Int),
            any::<bool>().prop_map(Variant::Bool),
            // Sixteenths are exact in binary and at most four decimal
            // places, so they survive the truncating formatter.
            (-100_000i64..100_000).prop_map(|n| Variant::Real(n as f64 / 16.0)),
            "[a-z0-9 ]{0,12}".prop_map(Variant::str),
        ];
        leaf.prop_recursive(4, 32, 6, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..6).prop_map(Variant::List),
                proptest::collection::vec(("[a-z]{1,8}", inner), 0..6).prop_map(|pairs| {
                    Variant::Dict(
                        pairs
                            .into_iter()
                            .map(|(k, v)| (riptide_variant::VariantStr::from(k), v))
                            .collect(),
                    )
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn test_round_trip_arbitrary_trees(tree in arb_tree(), pretty in any::<bool>()) {
            let back = decode(&encode(&tree, pretty)).unwrap();
            prop_assert_eq!(back, tree);
        }
    }
}
