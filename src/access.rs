//! Registry key access rights.
//!
//! See the Win32 "Registry Key Security and Access Rights" documentation for
//! the meaning of each bit.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Access mask requested when opening or creating a key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccessRights(pub u32);

impl AccessRights {
    /// Required to query the values of a key.
    pub const QUERY_VALUE: Self = Self(0x0001);

    /// Required to create, delete, or set a value.
    pub const SET_VALUE: Self = Self(0x0002);

    /// Required to create a subkey.
    pub const CREATE_SUB_KEY: Self = Self(0x0004);

    /// Required to enumerate the subkeys of a key.
    pub const ENUMERATE_SUB_KEYS: Self = Self(0x0008);

    /// Required to request change notifications.
    pub const NOTIFY: Self = Self(0x0010);

    /// Reserved for system use.
    pub const CREATE_LINK: Self = Self(0x0020);

    /// Operate on the 64-bit registry view. Ignored on 32-bit Windows.
    pub const WOW64_64KEY: Self = Self(0x0100);

    /// Operate on the 32-bit registry view. Ignored on 32-bit Windows.
    pub const WOW64_32KEY: Self = Self(0x0200);

    /// STANDARD_RIGHTS_READ, QUERY_VALUE, ENUMERATE_SUB_KEYS and NOTIFY.
    pub const READ: Self = Self(0x20019);

    /// STANDARD_RIGHTS_WRITE, SET_VALUE and CREATE_SUB_KEY.
    pub const WRITE: Self = Self(0x20006);

    /// Equivalent to [`AccessRights::READ`].
    pub const EXECUTE: Self = Self(0x20019);

    /// STANDARD_RIGHTS_REQUIRED plus every key-specific right.
    pub const ALL_ACCESS: Self = Self(0xF003F);

    /// Mask of the two registry view selectors.
    pub const WOW64_RES: Self = Self(0x0300);

    /// Creates access rights from a raw mask.
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw mask.
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is set.
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Returns true if no bit is set.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Access requested when the caller supplies none.
    ///
    /// A 64-bit process asks for the 64-bit view, a 32-bit process for the
    /// 32-bit view, both with [`AccessRights::ALL_ACCESS`]. Selecting the view
    /// explicitly keeps a narrower binary on 64-bit Windows from being
    /// redirected by WOW64.
    pub const fn platform_default() -> Self {
        #[cfg(target_pointer_width = "64")]
        {
            Self(Self::WOW64_64KEY.0 | Self::ALL_ACCESS.0)
        }
        #[cfg(not(target_pointer_width = "64"))]
        {
            Self(Self::WOW64_32KEY.0 | Self::ALL_ACCESS.0)
        }
    }

    /// Resolves an optional caller mask, falling back to the platform default
    /// when it is absent or zero.
    pub fn resolve(requested: Option<Self>) -> Self {
        match requested {
            Some(rights) if !rights.is_empty() => rights,
            _ => Self::platform_default(),
        }
    }
}

impl BitOr for AccessRights {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for AccessRights {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for AccessRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessRights({:#x})", self.0)
    }
}

impl From<u32> for AccessRights {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composites() {
        assert!(AccessRights::ALL_ACCESS.contains(AccessRights::QUERY_VALUE));
        assert!(AccessRights::ALL_ACCESS.contains(AccessRights::CREATE_LINK));
        assert!(AccessRights::READ.contains(AccessRights::ENUMERATE_SUB_KEYS));
        assert!(!AccessRights::READ.contains(AccessRights::SET_VALUE));
        assert!(AccessRights::WRITE.contains(AccessRights::CREATE_SUB_KEY));
        assert_eq!(AccessRights::EXECUTE, AccessRights::READ);
    }

    #[test]
    fn test_platform_default() {
        let rights = AccessRights::platform_default();
        assert!(rights.contains(AccessRights::ALL_ACCESS));

        #[cfg(target_pointer_width = "64")]
        assert_eq!(rights, AccessRights::WOW64_64KEY | AccessRights::ALL_ACCESS);
        #[cfg(not(target_pointer_width = "64"))]
        assert_eq!(rights, AccessRights::WOW64_32KEY | AccessRights::ALL_ACCESS);
    }

    #[test]
    fn test_resolve() {
        assert_eq!(AccessRights::resolve(None), AccessRights::platform_default());
        assert_eq!(
            AccessRights::resolve(Some(AccessRights::new(0))),
            AccessRights::platform_default()
        );
        assert_eq!(
            AccessRights::resolve(Some(AccessRights::QUERY_VALUE)),
            AccessRights::QUERY_VALUE
        );
    }
}
