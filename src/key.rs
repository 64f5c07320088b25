//! Open registry keys and the value operations on them.
//!
//! A [`Key`] owns one native handle. Every operation borrows that handle for
//! the duration of a single backend call, so [`Key::close`] waits for
//! in-flight calls and any later call reports `RegistryError::HandleClosed`.

use crate::access::AccessRights;
use crate::backend::RegistryBackend;
use crate::error::{RegistryError, Result};
use crate::expand::expand_string;
use crate::handle::{HandleGuard, KeyHandle, RawKey};
use crate::registry::Registry;
use crate::utils::{read_dword, read_qword, read_utf16_string};
use crate::value::{decode_multi_string, encode_multi_string, encode_string, TypedValue};
use crate::value_type::ValueType;
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Windows FILETIME is 100-nanosecond intervals since 1601-01-01.
/// Unix epoch is 1970-01-01, difference is 11644473600 seconds.
const FILETIME_UNIX_DIFF: i64 = 11644473600;

/// Starting buffer size for typed reads.
const INITIAL_BUFFER: usize = 64;

/// Snapshot of a key's counts and size maxima (`RegQueryInfoKey`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyStatistics {
    /// Number of direct subkeys.
    pub subkey_count: u32,

    /// Longest subkey name, in UTF-16 units without terminator.
    pub max_subkey_len: u32,

    /// Number of values.
    pub value_count: u32,

    /// Longest value name, in UTF-16 units without terminator.
    pub max_value_name_len: u32,

    /// Largest value data, in bytes.
    pub max_value_len: u32,

    /// Last write time as a FILETIME.
    pub last_write: u64,
}

impl KeyStatistics {
    /// Converts the last write time to a UTC timestamp.
    pub fn modified(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        if self.last_write == 0 {
            return None;
        }

        let seconds = (self.last_write / 10_000_000) as i64 - FILETIME_UNIX_DIFF;
        let nanos = ((self.last_write % 10_000_000) * 100) as u32;

        chrono::DateTime::from_timestamp(seconds, nanos)
    }
}

/// Returns the current time as a FILETIME.
pub fn filetime_now() -> u64 {
    let now = chrono::Utc::now();
    let seconds = (now.timestamp() + FILETIME_UNIX_DIFF).max(0) as u64;
    seconds * 10_000_000 + u64::from(now.timestamp_subsec_nanos() / 100)
}

/// An open registry key.
///
/// The handle is released by [`Key::close`] or, failing that, when the key is
/// dropped.
pub struct Key {
    backend: Arc<dyn RegistryBackend>,
    handle: KeyHandle,
    path: String,
}

impl Key {
    pub(crate) fn new(backend: Arc<dyn RegistryBackend>, raw: RawKey, path: String) -> Self {
        Self {
            backend,
            handle: KeyHandle::new(raw),
            path,
        }
    }

    pub(crate) fn acquire(&self) -> Result<HandleGuard<'_>> {
        self.handle.acquire()
    }

    /// Returns true if this key was opened through `backend`.
    pub(crate) fn shares_backend(&self, backend: &Arc<dyn RegistryBackend>) -> bool {
        Arc::as_ptr(&self.backend) as *const () == Arc::as_ptr(backend) as *const ()
    }

    /// Returns the path this key was opened with, starting at its root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns true until the key has been closed.
    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    /// Returns the native identifier of this key.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::HandleClosed` after [`Key::close`].
    pub fn raw(&self) -> Result<RawKey> {
        Ok(self.handle.acquire()?.raw())
    }

    /// Releases the native handle.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::HandleClosed` if the key was already closed,
    /// or the status reported by the backend.
    pub fn close(&self) -> Result<()> {
        let raw = self.handle.take().ok_or(RegistryError::HandleClosed)?;
        debug!(path = %self.path, ?raw, "Closing key");
        self.backend.close_key(raw)
    }

    /// Opens a subkey of this key.
    ///
    /// See [`Registry::open_key`].
    pub fn open_subkey(&self, path: &str, access: Option<AccessRights>) -> Result<Key> {
        Registry::with_backend(Arc::clone(&self.backend)).open_key(self, path, access)
    }

    /// Creates or opens a subkey of this key.
    ///
    /// See [`Registry::create_key`].
    pub fn create_subkey(&self, path: &str, access: Option<AccessRights>) -> Result<(Key, bool)> {
        Registry::with_backend(Arc::clone(&self.backend)).create_key(self, path, access)
    }

    /// Queries a value into a caller-supplied buffer.
    ///
    /// # Arguments
    ///
    /// * `name` - Value name; the empty string names the default value
    /// * `buf` - Destination, or `None` to query only size and type
    ///
    /// Returns the size of the stored data in bytes and its type. With a
    /// large enough buffer that many bytes have been written to it.
    ///
    /// # Errors
    ///
    /// * `RegistryError::ShortBuffer` if `buf` cannot hold the data; it
    ///   carries the required size and the stored type, and `buf` is left
    ///   untouched
    /// * `RegistryError::NotExist` if the value does not exist
    pub fn get_value(&self, name: &str, buf: Option<&mut [u8]>) -> Result<(usize, ValueType)> {
        let guard = self.handle.acquire()?;
        self.backend.query_value(guard.raw(), name, buf)
    }

    /// Reads the whole stored data of a value.
    fn query(&self, name: &str) -> Result<(Vec<u8>, ValueType)> {
        let guard = self.handle.acquire()?;
        let mut buf = vec![0u8; INITIAL_BUFFER];

        loop {
            match self.backend.query_value(guard.raw(), name, Some(&mut buf)) {
                Ok((len, value_type)) => {
                    buf.truncate(len);
                    return Ok((buf, value_type));
                }
                Err(RegistryError::ShortBuffer { required, .. }) => {
                    // HKEY_PERFORMANCE_DATA does not report a size, keep growing
                    let size = required.max(buf.len() * 2);
                    debug!(name, size, "Growing value buffer");
                    buf.resize(size, 0);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Reads a REG_SZ or REG_EXPAND_SZ value.
    ///
    /// Environment references are returned unexpanded; see
    /// [`Key::get_expanded_string_value`].
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnexpectedType` carrying the stored type if the
    /// value is not a string.
    pub fn get_string_value(&self, name: &str) -> Result<(String, ValueType)> {
        let (data, value_type) = self.query(name)?;
        match value_type {
            ValueType::String | ValueType::ExpandString => {
                Ok((read_utf16_string(&data), value_type))
            }
            actual => Err(RegistryError::UnexpectedType { actual }),
        }
    }

    /// Reads a string value, expanding `%NAME%` references if it is stored as
    /// REG_EXPAND_SZ.
    pub fn get_expanded_string_value(&self, name: &str) -> Result<(String, ValueType)> {
        let (value, value_type) = self.get_string_value(name)?;
        match value_type {
            ValueType::ExpandString => Ok((expand_string(&value), value_type)),
            _ => Ok((value, value_type)),
        }
    }

    /// Reads a localized string (`RegLoadMUIString`).
    pub fn get_mui_string_value(&self, name: &str) -> Result<String> {
        let guard = self.handle.acquire()?;
        self.backend.load_mui_string(guard.raw(), name)
    }

    /// Reads a REG_MULTI_SZ value.
    ///
    /// Malformed data decodes leniently, usually to an empty list.
    pub fn get_strings_value(&self, name: &str) -> Result<(Vec<String>, ValueType)> {
        let (data, value_type) = self.query(name)?;
        match value_type {
            ValueType::MultiString => Ok((decode_multi_string(&data), value_type)),
            actual => Err(RegistryError::UnexpectedType { actual }),
        }
    }

    /// Reads a REG_DWORD or REG_QWORD value, widened to `u64`.
    ///
    /// # Errors
    ///
    /// * `RegistryError::UnexpectedType` for any other stored type
    /// * `RegistryError::InvalidLength` if the data is not 4 or 8 bytes
    pub fn get_integer_value(&self, name: &str) -> Result<(u64, ValueType)> {
        let (data, value_type) = self.query(name)?;
        match value_type {
            ValueType::Dword => Ok((u64::from(read_dword(&data)?), value_type)),
            ValueType::Qword => Ok((read_qword(&data)?, value_type)),
            actual => Err(RegistryError::UnexpectedType { actual }),
        }
    }

    /// Reads a REG_BINARY value.
    pub fn get_binary_value(&self, name: &str) -> Result<(Vec<u8>, ValueType)> {
        let (data, value_type) = self.query(name)?;
        match value_type {
            ValueType::Binary => Ok((data, value_type)),
            actual => Err(RegistryError::UnexpectedType { actual }),
        }
    }

    /// Reads a value that must be stored as `expected`.
    pub fn read_typed_value(&self, name: &str, expected: ValueType) -> Result<TypedValue> {
        let (data, value_type) = self.query(name)?;
        if value_type != expected {
            return Err(RegistryError::UnexpectedType { actual: value_type });
        }
        TypedValue::decode(value_type, &data)
    }

    /// Reads and decodes a value of any type.
    pub fn read_value(&self, name: &str) -> Result<TypedValue> {
        let (data, value_type) = self.query(name)?;
        TypedValue::decode(value_type, &data)
    }

    /// Stores raw bytes under `name` with the given type tag.
    ///
    /// The bytes are not validated against the tag.
    pub fn set_value(&self, name: &str, value_type: ValueType, data: &[u8]) -> Result<()> {
        let guard = self.handle.acquire()?;
        debug!(name, %value_type, len = data.len(), "Setting value");
        self.backend.set_value(guard.raw(), name, value_type, data)
    }

    /// Encodes and stores a typed value.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidValue` for string payloads containing
    /// NUL; the backend is not called in that case.
    pub fn set_typed_value(&self, name: &str, value: &TypedValue) -> Result<()> {
        let data = value.encode()?;
        self.set_value(name, value.value_type(), &data)
    }

    /// Stores a REG_SZ value.
    pub fn set_string_value(&self, name: &str, value: &str) -> Result<()> {
        self.set_value(name, ValueType::String, &encode_string(value)?)
    }

    /// Stores a REG_EXPAND_SZ value.
    pub fn set_expand_string_value(&self, name: &str, value: &str) -> Result<()> {
        self.set_value(name, ValueType::ExpandString, &encode_string(value)?)
    }

    /// Stores a REG_MULTI_SZ value.
    pub fn set_strings_value<S: AsRef<str>>(&self, name: &str, values: &[S]) -> Result<()> {
        self.set_value(name, ValueType::MultiString, &encode_multi_string(values)?)
    }

    /// Stores a REG_BINARY value.
    pub fn set_binary_value(&self, name: &str, value: &[u8]) -> Result<()> {
        self.set_value(name, ValueType::Binary, value)
    }

    /// Stores a REG_DWORD value.
    pub fn set_dword_value(&self, name: &str, value: u32) -> Result<()> {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, value);
        self.set_value(name, ValueType::Dword, &buf)
    }

    /// Stores a REG_QWORD value.
    pub fn set_qword_value(&self, name: &str, value: u64) -> Result<()> {
        let mut buf = [0u8; 8];
        LittleEndian::write_u64(&mut buf, value);
        self.set_value(name, ValueType::Qword, &buf)
    }

    /// Removes a value.
    pub fn delete_value(&self, name: &str) -> Result<()> {
        let guard = self.handle.acquire()?;
        self.backend.delete_value(guard.raw(), name)
    }

    /// Lists subkey names.
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of names; negative returns all of them
    pub fn subkey_names(&self, limit: isize) -> Result<Vec<String>> {
        let guard = self.handle.acquire()?;
        let raw = guard.raw();
        collect_names(limit, |index| self.backend.enum_key(raw, index))
    }

    /// Lists value names.
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of names; negative returns all of them
    pub fn value_names(&self, limit: isize) -> Result<Vec<String>> {
        let guard = self.handle.acquire()?;
        let raw = guard.raw();
        collect_names(limit, |index| self.backend.enum_value(raw, index))
    }

    /// Reports counts and size maxima of this key.
    pub fn stat(&self) -> Result<KeyStatistics> {
        let guard = self.handle.acquire()?;
        self.backend.query_info(guard.raw())
    }
}

fn collect_names<F>(limit: isize, mut next: F) -> Result<Vec<String>>
where
    F: FnMut(u32) -> Result<Option<String>>,
{
    let cap = usize::try_from(limit).ok();
    let mut names = Vec::new();
    let mut index = 0u32;

    while cap.map_or(true, |cap| names.len() < cap) {
        match next(index)? {
            Some(name) => names.push(name),
            None => break,
        }
        index += 1;
    }
    Ok(names)
}

impl Drop for Key {
    fn drop(&mut self) {
        if let Some(raw) = self.handle.release() {
            if let Err(err) = self.backend.close_key(raw) {
                warn!(path = %self.path, ?raw, error = %err, "Failed to release key handle");
            }
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("path", &self.path)
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::RootKey;

    fn scratch() -> Key {
        let (key, _) = Registry::in_memory()
            .create_key(RootKey::CURRENT_USER, r"Software\KeyTest", None)
            .unwrap();
        key
    }

    #[test]
    fn test_modified() {
        let stats = KeyStatistics::default();
        assert_eq!(stats.modified(), None);

        // 2020-01-01T00:00:00Z
        let stats = KeyStatistics {
            last_write: (1_577_836_800 + FILETIME_UNIX_DIFF as u64) * 10_000_000,
            ..Default::default()
        };
        assert_eq!(stats.modified().unwrap().timestamp(), 1_577_836_800);
    }

    #[test]
    fn test_filetime_now_is_after_2020() {
        assert!(filetime_now() > (1_577_836_800 + FILETIME_UNIX_DIFF as u64) * 10_000_000);
    }

    #[test]
    fn test_collect_names_limit() {
        let source = |index: u32| -> Result<Option<String>> {
            Ok((index < 3).then(|| format!("n{}", index)))
        };
        assert_eq!(collect_names(-1, source).unwrap().len(), 3);
        assert_eq!(collect_names(2, source).unwrap(), vec!["n0", "n1"]);
        assert!(collect_names(0, source).unwrap().is_empty());
        assert_eq!(collect_names(10, source).unwrap().len(), 3);
    }

    #[test]
    fn test_query_grows_buffer() {
        let key = scratch();
        let data: Vec<u8> = (0..200u8).collect();
        key.set_binary_value("big", &data).unwrap();
        assert_eq!(key.get_binary_value("big").unwrap(), (data, ValueType::Binary));
    }

    #[test]
    fn test_close_twice() {
        let key = scratch();
        key.close().unwrap();
        assert!(!key.is_open());
        assert_eq!(key.close(), Err(RegistryError::HandleClosed));
        assert_eq!(key.stat(), Err(RegistryError::HandleClosed));
        assert_eq!(key.raw(), Err(RegistryError::HandleClosed));
    }

    #[test]
    fn test_invalid_payload_not_stored() {
        let key = scratch();
        assert!(matches!(
            key.set_string_value("bad", "a\0b"),
            Err(RegistryError::InvalidValue(_))
        ));
        assert_eq!(key.get_value("bad", None), Err(RegistryError::NotExist));
    }
}
