use proptest::prelude::*;
use reg_access::value::{decode_multi_string, encode_multi_string};
use reg_access::{Registry, RegistryError, RootKey, TypedValue, ValueType};

// Property-based tests for the value codec
// Registry payloads come from other processes, so decoding must never panic

fn registry_string() -> impl Strategy<Value = String> {
    "[^\\x00]{0,32}"
}

#[test]
fn none_round_trip() {
    let bytes = TypedValue::None.encode().unwrap();
    assert!(bytes.is_empty());
    assert_eq!(TypedValue::decode(ValueType::None, &bytes).unwrap(), TypedValue::None);
}

fn string_with_nul() -> impl Strategy<Value = String> {
    (registry_string(), registry_string()).prop_map(|(head, tail)| format!("{}\0{}", head, tail))
}

proptest! {
    #[test]
    fn strings_round_trip(s in registry_string()) {
        let value = TypedValue::String(s.clone());
        let bytes = value.encode().unwrap();
        prop_assert_eq!(bytes.len(), (s.encode_utf16().count() + 1) * 2);
        prop_assert_eq!(TypedValue::decode(ValueType::String, &bytes).unwrap(), value);
    }

    #[test]
    fn expand_strings_round_trip(s in registry_string()) {
        let value = TypedValue::ExpandString(s.clone());
        let bytes = value.encode().unwrap();
        prop_assert_eq!(bytes.len(), (s.encode_utf16().count() + 1) * 2);
        prop_assert_eq!(TypedValue::decode(ValueType::ExpandString, &bytes).unwrap(), value);
    }

    #[test]
    fn binary_round_trip(data in prop::collection::vec(any::<u8>(), 0..64)) {
        let value = TypedValue::Binary(data.clone());
        let bytes = value.encode().unwrap();
        prop_assert_eq!(&bytes, &data);
        prop_assert_eq!(TypedValue::decode(ValueType::Binary, &bytes).unwrap(), value);
    }

    #[test]
    fn multi_strings_round_trip(strings in prop::collection::vec(registry_string(), 0..8)) {
        let bytes = encode_multi_string(strings.as_slice()).unwrap();
        prop_assert_eq!(decode_multi_string(&bytes), strings);
    }

    #[test]
    fn embedded_nul_is_rejected(
        s in string_with_nul(),
        others in prop::collection::vec(registry_string(), 0..4),
    ) {
        prop_assert!(
            matches!(TypedValue::String(s.clone()).encode(), Err(RegistryError::InvalidValue(_))),
            "string accepted"
        );
        prop_assert!(
            matches!(
                TypedValue::ExpandString(s.clone()).encode(),
                Err(RegistryError::InvalidValue(_))
            ),
            "expand string accepted"
        );

        let mut strings = others;
        strings.push(s);
        prop_assert!(
            matches!(encode_multi_string(strings.as_slice()), Err(RegistryError::InvalidValue(_))),
            "multi string accepted"
        );
    }

    #[test]
    fn decoding_arbitrary_bytes_never_panics(data in prop::collection::vec(any::<u8>(), 0..64)) {
        let _ = decode_multi_string(&data);
        for value_type in [
            ValueType::None,
            ValueType::String,
            ValueType::ExpandString,
            ValueType::Binary,
            ValueType::Dword,
            ValueType::Qword,
        ] {
            let _ = TypedValue::decode(value_type, &data);
        }
    }

    #[test]
    fn integers_round_trip_through_key(dword in any::<u32>(), qword in any::<u64>()) {
        let registry = Registry::in_memory();
        let (key, _) = registry.create_key(RootKey::CURRENT_USER, r"Software\Props", None).unwrap();

        key.set_dword_value("d", dword).unwrap();
        key.set_qword_value("q", qword).unwrap();
        prop_assert_eq!(key.get_integer_value("d").unwrap(), (u64::from(dword), ValueType::Dword));
        prop_assert_eq!(key.get_integer_value("q").unwrap(), (qword, ValueType::Qword));
    }
}
