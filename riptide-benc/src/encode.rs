//! Canonical bencode serialization.
//!
//! Emission is driven by the shared non-recursive walk; dicts are always
//! written in byte-lexicographic key order so that equal trees produce
//! byte-identical output.

use riptide_variant::{walk, Variant, VariantStr, WalkHandler};

struct BencWriter {
    out: Vec<u8>,
}

impl BencWriter {
    fn push_bytes(&mut self, bytes: &[u8]) {
        self.out
            .extend_from_slice(bytes.len().to_string().as_bytes());
        self.out.push(b':');
        self.out.extend_from_slice(bytes);
    }
}

impl WalkHandler for BencWriter {
    fn on_int(&mut self, value: i64) {
        self.out.push(b'i');
        self.out.extend_from_slice(value.to_string().as_bytes());
        self.out.push(b'e');
    }

    // Bencode has no boolean kind; booleans travel as 0/1 integers.
    fn on_bool(&mut self, value: bool) {
        self.out
            .extend_from_slice(if value { b"i1e" } else { b"i0e" });
    }

    // No real kind either; reals travel as fixed-precision decimal strings.
    fn on_real(&mut self, value: f64) {
        let text = format!("{value:.6}");
        self.push_bytes(text.as_bytes());
    }

    fn on_string(&mut self, value: &VariantStr<'_>) {
        self.push_bytes(value.as_bytes());
    }

    fn on_dict_begin(&mut self, _: &Variant<'_>) {
        self.out.push(b'd');
    }

    fn on_list_begin(&mut self, _: &Variant<'_>) {
        self.out.push(b'l');
    }

    fn on_container_end(&mut self, _: &Variant<'_>) {
        self.out.push(b'e');
    }
}

/// Serializes `value` in canonical form.
pub fn encode(value: &Variant<'_>) -> Vec<u8> {
    let mut writer = BencWriter { out: Vec::new() };
    walk(value, true, &mut writer);
    writer.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use proptest::prelude::*;

    #[test]
    fn test_encode_leaves() {
        assert_eq!(encode(&Variant::Int(64)), b"i64e");
        assert_eq!(encode(&Variant::Int(-3)), b"i-3e");
        assert_eq!(encode(&Variant::str("boat")), b"4:boat");
        assert_eq!(encode(&Variant::str("")), b"0:");
        assert_eq!(encode(&Variant::Bool(true)), b"i1e");
        assert_eq!(encode(&Variant::Bool(false)), b"i0e");
        assert_eq!(encode(&Variant::Real(0.25)), b"8:0.250000");
    }

    #[test]
    fn test_encode_containers() {
        let mut l = Variant::new_list();
        l.push(Variant::str("spam")).unwrap();
        l.push(Variant::Int(42)).unwrap();
        assert_eq!(encode(&l), b"l4:spami42ee");

        assert_eq!(encode(&Variant::new_list()), b"le");
        assert_eq!(encode(&Variant::new_dict()), b"de");
    }

    #[test]
    fn test_dicts_encode_sorted_regardless_of_insertion_order() {
        let mut a = Variant::new_dict();
        a.insert("zeta", Variant::Int(1)).unwrap();
        a.insert("alpha", Variant::Int(2)).unwrap();

        let mut b = Variant::new_dict();
        b.insert("alpha", Variant::Int(2)).unwrap();
        b.insert("zeta", Variant::Int(1)).unwrap();

        let wire = encode(&a);
        assert_eq!(wire, encode(&b));
        assert_eq!(wire, b"d5:alphai2e4:zetai1ee");
    }

    #[test]
    fn test_key_order_is_bytewise_not_lexical() {
        // 'Z' (0x5a) sorts before 'a' (0x61).
        let mut d = Variant::new_dict();
        d.insert("a", Variant::Int(1)).unwrap();
        d.insert("Z", Variant::Int(2)).unwrap();
        assert_eq!(encode(&d), b"d1:Zi2e1:ai1ee");
    }

    #[test]
    fn test_round_trip_nested() {
        let mut info = Variant::new_dict();
        info.insert("length", Variant::Int(1024)).unwrap();
        let mut top = Variant::new_dict();
        top.insert("info", info).unwrap();
        top.insert("name", Variant::str("river")).unwrap();

        let decoded = decode(&encode(&top)).unwrap();
        assert_eq!(decoded, top);
    }

    #[test]
    fn test_deep_tree_encodes_without_overflow() {
        let mut v = Variant::new_list();
        for _ in 0..200_000 {
            let mut outer = Variant::new_list();
            outer.push(v).unwrap();
            v = outer;
        }
        let wire = encode(&v);
        assert_eq!(wire.len(), 200_001 * 2);
    }

    // Strategy over the kinds bencode represents natively; dict keys are
    // pre-sorted and unique so decoded entry order matches the input.
    fn arb_tree() -> impl Strategy<Value = Variant<'static>> {
        let leaf = prop_oneof![
            any::<i64>().prop_map(Variant::Int),
            proptest::collection::vec(any::<u8>(), 0..24).prop_map(Variant::str),
        ];
        leaf.prop_recursive(4, 32, 6, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..6).prop_map(Variant::List),
                proptest::collection::btree_map(
                    proptest::collection::vec(any::<u8>(), 0..12),
                    inner,
                    0..6
                )
                .prop_map(|m| {
                    Variant::Dict(
                        m.into_iter()
                            .map(|(k, v)| (riptide_variant::VariantStr::from(k), v))
                            .collect(),
                    )
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn test_round_trip_arbitrary_trees(tree in arb_tree()) {
            let decoded = decode(&encode(&tree)).unwrap();
            prop_assert_eq!(decoded, tree);
        }
    }
}
