//! The native registry boundary.
//!
//! [`RegistryBackend`] mirrors the Win32 registry calls one-to-one. Everything
//! above it (handles, codec, typed accessors) is backend-independent.

use crate::access::AccessRights;
use crate::error::Result;
use crate::handle::RawKey;
use crate::key::KeyStatistics;
use crate::value_type::ValueType;

pub mod memory;
#[cfg(windows)]
pub mod native;

pub use memory::MemoryBackend;
#[cfg(windows)]
pub use native::NativeBackend;

/// Raw registry operations.
///
/// Implementations report a missing key or value as
/// `RegistryError::NotExist` and pass every other failure through as
/// `RegistryError::Os` with the unmodified status code.
pub trait RegistryBackend: Send + Sync {
    /// Opens `path` below `parent` (`RegOpenKeyEx`).
    fn open_key(&self, parent: RawKey, path: &str, access: AccessRights) -> Result<RawKey>;

    /// Creates or opens `path` below `parent` (`RegCreateKeyEx`).
    ///
    /// The flag reports whether the key already existed.
    fn create_key(
        &self,
        parent: RawKey,
        path: &str,
        access: AccessRights,
    ) -> Result<(RawKey, bool)>;

    /// Deletes the childless key `path` below `parent` (`RegDeleteKey`).
    fn delete_key(&self, parent: RawKey, path: &str) -> Result<()>;

    /// Releases an identifier returned by this backend (`RegCloseKey`).
    fn close_key(&self, key: RawKey) -> Result<()>;

    /// Connects to a predefined root on `host` (`RegConnectRegistry`).
    fn connect_remote(&self, host: &str, root: RawKey) -> Result<RawKey>;

    /// Queries a value (`RegQueryValueEx`).
    ///
    /// Without a buffer only the size and type are reported. A buffer that is
    /// too small yields `RegistryError::ShortBuffer` carrying both.
    fn query_value(
        &self,
        key: RawKey,
        name: &str,
        buf: Option<&mut [u8]>,
    ) -> Result<(usize, ValueType)>;

    /// Stores raw bytes under `name` (`RegSetValueEx`).
    fn set_value(&self, key: RawKey, name: &str, value_type: ValueType, data: &[u8]) -> Result<()>;

    /// Removes a value (`RegDeleteValue`).
    fn delete_value(&self, key: RawKey, name: &str) -> Result<()>;

    /// Returns the name of the subkey at `index`, or `None` past the end
    /// (`RegEnumKeyEx`).
    fn enum_key(&self, key: RawKey, index: u32) -> Result<Option<String>>;

    /// Returns the name of the value at `index`, or `None` past the end
    /// (`RegEnumValue`).
    fn enum_value(&self, key: RawKey, index: u32) -> Result<Option<String>>;

    /// Reports key statistics (`RegQueryInfoKey`).
    fn query_info(&self, key: RawKey) -> Result<KeyStatistics>;

    /// Loads a localized string value (`RegLoadMUIString`).
    fn load_mui_string(&self, key: RawKey, name: &str) -> Result<String>;
}
