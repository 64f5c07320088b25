//! JSON round-trips for the `serde` feature.

#![cfg(feature = "serde")]

use reg_access::{AccessRights, KeyStatistics, Registry, RootKey, TypedValue, ValueType};

fn round_trip<T>(value: &T) -> T
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    let json = serde_json::to_string(value).unwrap();
    serde_json::from_str(&json).unwrap()
}

#[test]
fn test_value_type_json() {
    for value_type in [
        ValueType::None,
        ValueType::String,
        ValueType::MultiString,
        ValueType::Qword,
        ValueType::Unknown(0x1234),
    ] {
        assert_eq!(round_trip(&value_type), value_type);
    }
    assert_eq!(serde_json::to_string(&ValueType::Dword).unwrap(), "\"Dword\"");
}

#[test]
fn test_typed_value_json() {
    let values = [
        TypedValue::None,
        TypedValue::String("Hello World".into()),
        TypedValue::ExpandString("%PATH%;.".into()),
        TypedValue::MultiString(vec!["abc".into(), String::new(), "cba".into()]),
        TypedValue::Binary(vec![3, 2, 1, 0, 1, 2, 3]),
        TypedValue::Dword(0xffff),
        TypedValue::Qword(0xffff_ffff),
    ];
    for value in &values {
        assert_eq!(&round_trip(value), value);
    }

    let json = serde_json::to_value(TypedValue::Dword(7)).unwrap();
    assert_eq!(json, serde_json::json!({ "Dword": 7 }));
}

#[test]
fn test_key_statistics_json() {
    let registry = Registry::in_memory();
    let (key, _) = registry
        .create_key(RootKey::CURRENT_USER, r"Software\SerdeStats", None)
        .unwrap();
    key.set_string_value("Name", "value").unwrap();
    key.create_subkey("Child", None).unwrap();

    let stats = key.stat().unwrap();
    let restored: KeyStatistics = round_trip(&stats);
    assert_eq!(restored, stats);
    assert_eq!(restored.modified(), stats.modified());

    let json = serde_json::to_value(stats).unwrap();
    assert_eq!(json["subkey_count"], 1);
    assert_eq!(json["value_count"], 1);
}

#[test]
fn test_access_rights_json() {
    let access = AccessRights::WOW64_64KEY | AccessRights::READ;
    assert_eq!(round_trip(&access), access);
    assert_eq!(
        serde_json::to_string(&AccessRights::ALL_ACCESS).unwrap(),
        "983103"
    );
}
