//! # Typed Windows Registry Access
//!
//! Key handles, a typed value codec and environment expansion on top of the
//! Win32 registry API.
//!
//! ## Features
//!
//! - **Typed values**: REG_SZ, REG_EXPAND_SZ, REG_MULTI_SZ, REG_BINARY,
//!   REG_DWORD and REG_QWORD encoded exactly as the registry stores them
//! - **Release-once handles**: a closed [`Key`] reports
//!   [`RegistryError::HandleClosed`] instead of touching a stale handle
//! - **Pluggable backend**: the live registry on Windows, an in-process tree
//!   everywhere else
//! - **Default access policy**: the registry view matching the pointer width of
//!   the running process
//!
//! ## Architecture
//!
//! 1. **Registry**: opens, creates and deletes keys below a [`RootKey`] or
//!    another [`Key`]
//! 2. **Key**: typed reads and writes, enumeration and statistics
//! 3. **Value codec**: [`TypedValue`] to and from registry bytes
//! 4. **Backend**: [`backend::RegistryBackend`], one method per native call
//!
//! ## Value Layout
//!
//! ```text
//! REG_SZ        "ab"          61 00 62 00 00 00
//! REG_MULTI_SZ  ["a", "b"]    61 00 00 00 62 00 00 00 00 00
//! REG_DWORD     0x04030201    01 02 03 04
//! REG_QWORD     1             01 00 00 00 00 00 00 00
//! ```
//!
//! ## Examples
//!
//! ### Reading and Writing Values
//!
//! ```rust
//! use reg_access::{Registry, RootKey, ValueType};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Registry::in_memory();
//! let (key, _) = registry.create_key(RootKey::CURRENT_USER, r"Software\Example", None)?;
//!
//! key.set_string_value("Name", "example")?;
//! key.set_strings_value("Paths", &["C:\\one", "C:\\two"])?;
//! key.set_qword_value("Size", 1 << 40)?;
//!
//! assert_eq!(key.get_string_value("Name")?, ("example".to_string(), ValueType::String));
//! assert_eq!(key.get_strings_value("Paths")?.0.len(), 2);
//! assert_eq!(key.get_integer_value("Size")?.0, 1 << 40);
//!
//! for name in key.value_names(-1)? {
//!     println!("{} = {}", name, key.read_value(&name)?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Three-Phase Reads
//!
//! ```rust
//! use reg_access::{Registry, RegistryError, RootKey};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Registry::in_memory();
//! let (key, _) = registry.create_key(RootKey::CURRENT_USER, r"Software\Example", None)?;
//! key.set_binary_value("Blob", &[1, 2, 3, 4, 5])?;
//!
//! // Size only
//! let (size, _) = key.get_value("Blob", None)?;
//! assert_eq!(size, 5);
//!
//! // Too small
//! let mut small = [0u8; 2];
//! assert!(matches!(
//!     key.get_value("Blob", Some(&mut small)),
//!     Err(RegistryError::ShortBuffer { required: 5, .. })
//! ));
//!
//! // Full read
//! let mut buf = vec![0u8; size];
//! key.get_value("Blob", Some(&mut buf))?;
//! assert_eq!(buf, [1, 2, 3, 4, 5]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod access;
pub mod backend;
pub mod error;
pub mod expand;
pub mod handle;
pub mod key;
pub mod registry;
pub mod utils;
pub mod value;
pub mod value_type;

// Re-export main types for convenience
pub use access::AccessRights;
pub use backend::{MemoryBackend, RegistryBackend};
#[cfg(windows)]
pub use backend::NativeBackend;
pub use error::{RegistryError, Result};
pub use expand::{expand_string, expand_with};
pub use handle::{RawKey, RootKey};
pub use key::{Key, KeyStatistics};
pub use registry::{Parent, Registry};
pub use value::TypedValue;
pub use value_type::ValueType;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
