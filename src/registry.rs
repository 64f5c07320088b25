//! Entry points for opening, creating and deleting keys.

use crate::access::AccessRights;
use crate::backend::{MemoryBackend, RegistryBackend};
use crate::error::{RegistryError, Result};
use crate::handle::{RawKey, RootKey};
use crate::key::Key;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// The key a path is resolved against.
#[derive(Debug, Clone, Copy)]
pub enum Parent<'a> {
    /// A predefined root.
    Root(RootKey),

    /// An open key.
    Key(&'a Key),
}

impl From<RootKey> for Parent<'_> {
    fn from(root: RootKey) -> Self {
        Parent::Root(root)
    }
}

impl<'a> From<&'a Key> for Parent<'a> {
    fn from(key: &'a Key) -> Self {
        Parent::Key(key)
    }
}

impl Parent<'_> {
    /// Runs `f` with the parent's identifier and path, keeping a parent key's
    /// handle borrowed until `f` returns.
    ///
    /// A parent key must have been opened through `backend`; identifiers are
    /// only meaningful to the backend that issued them.
    fn with_raw<T>(
        &self,
        backend: &Arc<dyn RegistryBackend>,
        f: impl FnOnce(RawKey, &str) -> Result<T>,
    ) -> Result<T> {
        match self {
            Parent::Root(root) => f(root.raw(), root.name()),
            Parent::Key(key) => {
                if !key.shares_backend(backend) {
                    return Err(RegistryError::InvalidValue(format!(
                        "parent key {} belongs to a different registry",
                        key.path()
                    )));
                }
                let guard = key.acquire()?;
                f(guard.raw(), key.path())
            }
        }
    }
}

impl fmt::Display for Parent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parent::Root(root) => write!(f, "{}", root),
            Parent::Key(key) => f.write_str(key.path()),
        }
    }
}

/// Handle factory over a [`RegistryBackend`].
///
/// Cloning is cheap; clones share the backend.
///
/// # Examples
///
/// ```rust
/// use reg_access::{Registry, RootKey};
///
/// let registry = Registry::in_memory();
/// let (key, existed) = registry.create_key(RootKey::CURRENT_USER, r"Software\Demo", None)?;
/// assert!(!existed);
///
/// key.set_dword_value("Answer", 42)?;
/// assert_eq!(key.get_integer_value("Answer")?.0, 42);
/// key.close()?;
/// # Ok::<(), reg_access::RegistryError>(())
/// ```
#[derive(Clone)]
pub struct Registry {
    backend: Arc<dyn RegistryBackend>,
}

impl Registry {
    /// Creates a registry over an empty in-process tree.
    pub fn in_memory() -> Self {
        Self::with_backend(Arc::new(MemoryBackend::new()))
    }

    /// Creates a registry over the live Windows registry.
    #[cfg(windows)]
    pub fn native() -> Self {
        Self::with_backend(Arc::new(crate::backend::NativeBackend::new()))
    }

    /// Creates a registry over any backend.
    pub fn with_backend(backend: Arc<dyn RegistryBackend>) -> Self {
        Self { backend }
    }

    /// Returns the shared backend.
    pub fn backend(&self) -> &Arc<dyn RegistryBackend> {
        &self.backend
    }

    /// Opens an existing key.
    ///
    /// # Arguments
    ///
    /// * `parent` - A [`RootKey`] or an open [`Key`]
    /// * `path` - Backslash-separated path below `parent`
    /// * `access` - Requested rights; `None` applies
    ///   [`AccessRights::platform_default`]
    ///
    /// # Errors
    ///
    /// * `RegistryError::NotExist` if the key does not exist
    /// * `RegistryError::HandleClosed` if `parent` is a closed key
    /// * `RegistryError::InvalidValue` if `parent` was opened through another
    ///   registry's backend
    #[instrument(skip(self, parent))]
    pub fn open_key<'a>(
        &self,
        parent: impl Into<Parent<'a>>,
        path: &str,
        access: Option<AccessRights>,
    ) -> Result<Key> {
        let access = AccessRights::resolve(access);
        parent.into().with_raw(&self.backend, |raw, parent_path| {
            let key = self.backend.open_key(raw, path, access)?;
            debug!(?key, ?access, "Opened key");
            Ok(self.key(key, parent_path, path))
        })
    }

    /// Creates a key, or opens it if it already exists.
    ///
    /// Missing intermediate keys are created as well. The returned flag is
    /// true if the key existed before the call.
    #[instrument(skip(self, parent))]
    pub fn create_key<'a>(
        &self,
        parent: impl Into<Parent<'a>>,
        path: &str,
        access: Option<AccessRights>,
    ) -> Result<(Key, bool)> {
        let access = AccessRights::resolve(access);
        parent.into().with_raw(&self.backend, |raw, parent_path| {
            let (key, existed) = self.backend.create_key(raw, path, access)?;
            debug!(?key, ?access, existed, "Created key");
            Ok((self.key(key, parent_path, path), existed))
        })
    }

    /// Deletes a key that has no subkeys.
    #[instrument(skip(self, parent))]
    pub fn delete_key<'a>(&self, parent: impl Into<Parent<'a>>, path: &str) -> Result<()> {
        parent
            .into()
            .with_raw(&self.backend, |raw, _| self.backend.delete_key(raw, path))
    }

    /// Opens a predefined root on another machine.
    ///
    /// An empty `host` names the local machine.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidValue` unless `root` is
    /// `LOCAL_MACHINE`, `USERS` or `PERFORMANCE_DATA`; the backend is not
    /// contacted in that case.
    #[instrument(skip(self, root), fields(root = %root))]
    pub fn open_remote(&self, host: &str, root: RootKey) -> Result<Key> {
        if !root.allows_remote() {
            return Err(RegistryError::InvalidValue(format!(
                "{} cannot be opened on a remote machine",
                root
            )));
        }

        let raw = self.backend.connect_remote(host, root.raw())?;
        let path = if host.is_empty() {
            root.name().to_string()
        } else {
            format!(r"\\{}\{}", host.trim_start_matches('\\'), root)
        };
        debug!(?raw, %path, "Connected to remote registry");
        Ok(Key::new(Arc::clone(&self.backend), raw, path))
    }

    fn key(&self, raw: RawKey, parent_path: &str, path: &str) -> Key {
        let path = path.trim_matches('\\');
        let full = if path.is_empty() {
            parent_path.to_string()
        } else {
            format!(r"{}\{}", parent_path, path)
        };
        Key::new(Arc::clone(&self.backend), raw, full)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_paths() {
        let registry = Registry::in_memory();
        let software = registry
            .open_key(RootKey::CURRENT_USER, "Software", None)
            .unwrap();
        assert_eq!(software.path(), r"HKEY_CURRENT_USER\Software");

        let (child, _) = software.create_subkey(r"Vendor\App", None).unwrap();
        assert_eq!(child.path(), r"HKEY_CURRENT_USER\Software\Vendor\App");
    }

    #[test]
    fn test_closed_parent() {
        let registry = Registry::in_memory();
        let software = registry
            .open_key(RootKey::LOCAL_MACHINE, "Software", None)
            .unwrap();
        software.close().unwrap();
        assert_eq!(
            software.open_subkey("Anything", None).unwrap_err(),
            RegistryError::HandleClosed
        );
        assert_eq!(
            registry.delete_key(&software, "Anything"),
            Err(RegistryError::HandleClosed)
        );
    }

    #[test]
    fn test_clone_shares_parent_keys() {
        let registry = Registry::in_memory();
        let clone = registry.clone();
        let software = registry
            .open_key(RootKey::CURRENT_USER, "Software", None)
            .unwrap();
        let (child, existed) = clone.create_key(&software, "FromClone", None).unwrap();
        assert!(!existed);
        child.close().unwrap();
        clone.delete_key(&software, "FromClone").unwrap();
    }

    #[test]
    fn test_remote_root_restricted() {
        let registry = Registry::in_memory();
        assert!(matches!(
            registry.open_remote("", RootKey::CURRENT_USER),
            Err(RegistryError::InvalidValue(_))
        ));
        let key = registry.open_remote("", RootKey::LOCAL_MACHINE).unwrap();
        assert_eq!(key.subkey_names(-1).unwrap(), vec!["Software"]);
    }
}
