//! Registry key handles.
//!
//! A [`RawKey`] is the identifier the native layer hands out. Predefined roots
//! ([`RootKey`]) are process-wide constants that are never closed; every other
//! identifier is owned by exactly one [`KeyHandle`] and released once.

use crate::error::{RegistryError, Result};
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

/// Native key identifier (an `HKEY` on Windows).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawKey(pub usize);

impl RawKey {
    /// Returns true if this identifier names a predefined root.
    pub fn is_predefined(&self) -> bool {
        RootKey::from_raw(*self).is_some()
    }
}

impl fmt::Debug for RawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawKey({:#x})", self.0)
    }
}

/// Predefined, always-open registry roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootKey(RawKey);

impl RootKey {
    /// HKEY_CLASSES_ROOT.
    pub const CLASSES_ROOT: Self = Self(RawKey(0x8000_0000));

    /// HKEY_CURRENT_USER.
    pub const CURRENT_USER: Self = Self(RawKey(0x8000_0001));

    /// HKEY_LOCAL_MACHINE.
    pub const LOCAL_MACHINE: Self = Self(RawKey(0x8000_0002));

    /// HKEY_USERS.
    pub const USERS: Self = Self(RawKey(0x8000_0003));

    /// HKEY_PERFORMANCE_DATA.
    pub const PERFORMANCE_DATA: Self = Self(RawKey(0x8000_0004));

    /// HKEY_CURRENT_CONFIG.
    pub const CURRENT_CONFIG: Self = Self(RawKey(0x8000_0005));

    /// Every predefined root, in HKEY order.
    pub const ALL: [Self; 6] = [
        Self::CLASSES_ROOT,
        Self::CURRENT_USER,
        Self::LOCAL_MACHINE,
        Self::USERS,
        Self::PERFORMANCE_DATA,
        Self::CURRENT_CONFIG,
    ];

    /// Returns the native identifier of this root.
    pub const fn raw(&self) -> RawKey {
        self.0
    }

    /// Looks up the root a native identifier names.
    pub fn from_raw(raw: RawKey) -> Option<Self> {
        Self::ALL.into_iter().find(|root| root.0 == raw)
    }

    /// Returns the conventional name of this root.
    pub fn name(&self) -> &'static str {
        match self.0 .0 {
            0x8000_0000 => "HKEY_CLASSES_ROOT",
            0x8000_0001 => "HKEY_CURRENT_USER",
            0x8000_0002 => "HKEY_LOCAL_MACHINE",
            0x8000_0003 => "HKEY_USERS",
            0x8000_0004 => "HKEY_PERFORMANCE_DATA",
            _ => "HKEY_CURRENT_CONFIG",
        }
    }

    /// Returns true if this root may be opened on a remote machine.
    pub fn allows_remote(&self) -> bool {
        matches!(
            *self,
            Self::LOCAL_MACHINE | Self::USERS | Self::PERFORMANCE_DATA
        )
    }
}

impl fmt::Display for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Exclusively owned, release-once guard around a [`RawKey`].
///
/// Operations hold the shared lock for the duration of their native call;
/// [`KeyHandle::take`] needs the exclusive lock, so a close can never overlap
/// an in-flight read or write on the same handle.
pub struct KeyHandle {
    raw: RwLock<Option<RawKey>>,
}

/// Shared borrow of an open handle.
pub struct HandleGuard<'a> {
    guard: RwLockReadGuard<'a, Option<RawKey>>,
}

impl HandleGuard<'_> {
    /// Returns the borrowed identifier.
    pub fn raw(&self) -> RawKey {
        // `KeyHandle::acquire` only hands out guards over `Some`
        self.guard.unwrap_or(RawKey(0))
    }
}

impl KeyHandle {
    /// Wraps a freshly opened identifier.
    pub fn new(raw: RawKey) -> Self {
        Self {
            raw: RwLock::new(Some(raw)),
        }
    }

    /// Borrows the identifier for one operation.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::HandleClosed` once the handle has been taken.
    pub fn acquire(&self) -> Result<HandleGuard<'_>> {
        let guard = self.raw.read().expect("key handle lock poisoned");
        if guard.is_none() {
            return Err(RegistryError::HandleClosed);
        }
        Ok(HandleGuard { guard })
    }

    /// Takes the identifier out, leaving the handle closed.
    ///
    /// Returns `None` if it was already taken.
    pub fn take(&self) -> Option<RawKey> {
        self.raw.write().expect("key handle lock poisoned").take()
    }

    /// Like [`KeyHandle::take`], but recovers the identifier from a poisoned
    /// lock. Used on drop, where a second panic would abort.
    pub fn release(&self) -> Option<RawKey> {
        self.raw
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Returns true while the identifier has not been taken.
    pub fn is_open(&self) -> bool {
        self.raw.read().expect("key handle lock poisoned").is_some()
    }
}

impl fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self.raw.read().expect("key handle lock poisoned") {
            Some(raw) => write!(f, "KeyHandle({:?})", raw),
            None => f.write_str("KeyHandle(closed)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_root_constants() {
        assert_eq!(RootKey::CLASSES_ROOT.raw(), RawKey(0x8000_0000));
        assert_eq!(RootKey::CURRENT_CONFIG.raw(), RawKey(0x8000_0005));
        assert_eq!(RootKey::from_raw(RawKey(0x8000_0002)), Some(RootKey::LOCAL_MACHINE));
        assert_eq!(RootKey::from_raw(RawKey(0x1234)), None);
        assert!(RawKey(0x8000_0003).is_predefined());
        assert_eq!(RootKey::USERS.to_string(), "HKEY_USERS");
    }

    #[test]
    fn test_remote_roots() {
        assert!(RootKey::LOCAL_MACHINE.allows_remote());
        assert!(RootKey::USERS.allows_remote());
        assert!(RootKey::PERFORMANCE_DATA.allows_remote());
        assert!(!RootKey::CURRENT_USER.allows_remote());
        assert!(!RootKey::CLASSES_ROOT.allows_remote());
    }

    #[test]
    fn test_release_once() {
        let handle = KeyHandle::new(RawKey(42));
        assert_eq!(handle.acquire().unwrap().raw(), RawKey(42));

        assert_eq!(handle.take(), Some(RawKey(42)));
        assert_eq!(handle.take(), None);
        assert!(!handle.is_open());
        assert!(matches!(handle.acquire(), Err(RegistryError::HandleClosed)));
    }

    #[test]
    fn test_release_after_poison() {
        let handle = Arc::new(KeyHandle::new(RawKey(7)));
        let poisoner = Arc::clone(&handle);
        let result = thread::spawn(move || {
            let _guard = poisoner.raw.write().unwrap();
            panic!("poison the handle lock");
        })
        .join();
        assert!(result.is_err());
        assert!(handle.raw.is_poisoned());

        assert_eq!(handle.release(), Some(RawKey(7)));
        assert_eq!(handle.release(), None);
    }
}
