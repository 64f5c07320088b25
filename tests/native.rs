//! Integration tests against the live Windows registry.
//!
//! Every test works below a freshly created `HKCU\Software\<name>` key and
//! removes it again.

#![cfg(windows)]

use reg_access::{AccessRights, Key, Registry, RegistryError, RootKey, ValueType};

fn rand_key_name(prefix: &str) -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{}{}_{}", prefix, std::process::id(), nanos)
}

struct Scratch {
    registry: Registry,
    software: Key,
    name: String,
    key: Key,
}

impl Scratch {
    fn new(prefix: &str) -> Self {
        let registry = Registry::native();
        let software = registry
            .open_key(RootKey::CURRENT_USER, "Software", Some(AccessRights::QUERY_VALUE))
            .unwrap();
        let name = rand_key_name(prefix);
        let (key, existed) = registry
            .create_key(
                &software,
                &name,
                Some(
                    AccessRights::CREATE_SUB_KEY
                        | AccessRights::QUERY_VALUE
                        | AccessRights::SET_VALUE
                        | AccessRights::ENUMERATE_SUB_KEYS,
                ),
            )
            .unwrap();
        assert!(!existed, "key {} already exists", name);
        Self {
            registry,
            software,
            name,
            key,
        }
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = self.key.close();
        let _ = self.registry.delete_key(&self.software, &self.name);
    }
}

#[test]
fn test_read_subkeys() {
    let registry = Registry::native();
    let classes = registry
        .open_key(
            RootKey::CLASSES_ROOT,
            "",
            Some(AccessRights::ENUMERATE_SUB_KEYS | AccessRights::QUERY_VALUE),
        )
        .unwrap();
    let names = classes.subkey_names(-1).unwrap();
    assert!(names.iter().any(|name| name == "CLSID"));
}

#[test]
fn test_create_open_delete() {
    let scratch = Scratch::new("TestCreateOpenDelete_");

    let (child, existed) = scratch
        .key
        .create_subkey("child", Some(AccessRights::QUERY_VALUE))
        .unwrap();
    assert!(!existed);
    child.close().unwrap();

    let (child, existed) = scratch
        .key
        .create_subkey("child", Some(AccessRights::QUERY_VALUE))
        .unwrap();
    assert!(existed);
    child.close().unwrap();

    assert_eq!(scratch.key.subkey_names(-1).unwrap(), vec!["child"]);
    scratch.registry.delete_key(&scratch.key, "child").unwrap();
    assert_eq!(
        scratch
            .registry
            .open_key(&scratch.key, "child", Some(AccessRights::QUERY_VALUE))
            .unwrap_err(),
        RegistryError::NotExist
    );
}

#[test]
fn test_values() {
    let scratch = Scratch::new("TestValues_");
    let key = &scratch.key;

    key.set_string_value("String3", "Hello World").unwrap();
    key.set_expand_string_value("ExpString6", "%NO_SUCH_VARIABLE%").unwrap();
    key.set_strings_value("MultiString2", &["abc", "", "cba"]).unwrap();
    key.set_binary_value("Binary2", &[1, 2, 3]).unwrap();
    key.set_dword_value("Dword4", 0xffff).unwrap();
    key.set_qword_value("Qword6", 0xffff_ffff).unwrap();

    assert_eq!(
        key.get_string_value("String3").unwrap(),
        ("Hello World".to_string(), ValueType::String)
    );
    assert_eq!(
        key.get_expanded_string_value("ExpString6").unwrap(),
        ("%NO_SUCH_VARIABLE%".to_string(), ValueType::ExpandString)
    );
    assert_eq!(
        key.get_strings_value("MultiString2").unwrap().0,
        vec!["abc", "", "cba"]
    );
    assert_eq!(key.get_binary_value("Binary2").unwrap().0, vec![1, 2, 3]);
    assert_eq!(key.get_integer_value("Dword4").unwrap(), (0xffff, ValueType::Dword));
    assert_eq!(key.get_integer_value("Qword6").unwrap(), (0xffff_ffff, ValueType::Qword));

    assert_eq!(key.get_value("Binary2", None).unwrap(), (3, ValueType::Binary));
    let mut short = [0u8; 2];
    assert_eq!(
        key.get_value("Binary2", Some(&mut short)),
        Err(RegistryError::ShortBuffer {
            required: 3,
            value_type: ValueType::Binary
        })
    );
    assert_eq!(
        key.get_integer_value("Binary2"),
        Err(RegistryError::UnexpectedType {
            actual: ValueType::Binary
        })
    );
    assert_eq!(key.get_string_value("Missing"), Err(RegistryError::NotExist));

    let stats = key.stat().unwrap();
    assert_eq!(stats.value_count, 6);
    assert_eq!(stats.max_value_name_len, 12);
    assert_eq!(stats.max_value_len, 38);
    assert!(stats.modified().is_some());

    for name in key.value_names(-1).unwrap() {
        key.delete_value(&name).unwrap();
    }
    assert!(key.value_names(-1).unwrap().is_empty());
}

#[test]
fn test_invalid_values() {
    let scratch = Scratch::new("TestInvalidValues_");
    let key = &scratch.key;

    key.set_value("Dword2", ValueType::Dword, &[1, 2, 3]).unwrap();
    key.set_value("Qword3", ValueType::Qword, &[1, 2, 3, 4, 5, 6, 7]).unwrap();
    key.set_value("MultiString4", ValueType::MultiString, &[b'a', 0, 0, b'b', 0]).unwrap();

    assert!(key.get_integer_value("Dword2").is_err());
    assert!(key.get_integer_value("Qword3").is_err());
    assert!(key.get_strings_value("MultiString4").unwrap().0.is_empty());
}

#[test]
fn test_open_remote_local_machine() {
    let registry = Registry::native();
    let key = registry.open_remote("", RootKey::LOCAL_MACHINE).unwrap();
    let software = key
        .open_subkey("SOFTWARE", Some(AccessRights::ENUMERATE_SUB_KEYS))
        .unwrap();
    assert!(!software.subkey_names(-1).unwrap().is_empty());

    assert!(matches!(
        registry.open_remote("", RootKey::CURRENT_USER),
        Err(RegistryError::InvalidValue(_))
    ));
}

#[test]
fn test_get_mui_string_value() {
    let registry = Registry::native();
    let zone = registry
        .open_key(
            RootKey::LOCAL_MACHINE,
            r"SOFTWARE\Microsoft\Windows NT\CurrentVersion\Time Zones\Pacific Standard Time",
            Some(AccessRights::READ),
        )
        .unwrap();

    for name in ["MUI_Std", "MUI_Dlt"] {
        let (raw, _) = zone.get_string_value(name).unwrap();
        assert!(raw.starts_with('@'), "{} is not an indirect string: {}", name, raw);
        let text = zone.get_mui_string_value(name).unwrap();
        assert!(!text.is_empty(), "{} resolved to an empty string", name);
        assert!(!text.starts_with('@'));
    }
}
