//! Error types for registry access operations.
//!
//! Every failure is returned to the immediate caller. Nothing is retried:
//! registry calls either complete or report a status synchronously.

use crate::value_type::ValueType;
use thiserror::Error;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Win32 status: the system cannot find the file specified.
pub const ERROR_FILE_NOT_FOUND: u32 = 2;

/// Win32 status: access is denied.
pub const ERROR_ACCESS_DENIED: u32 = 5;

/// Win32 status: the handle is invalid.
pub const ERROR_INVALID_HANDLE: u32 = 6;

/// Win32 status: the network path was not found.
pub const ERROR_BAD_NETPATH: u32 = 53;

/// Win32 status: more data is available.
pub const ERROR_MORE_DATA: u32 = 234;

/// Win32 status: no more data is available.
pub const ERROR_NO_MORE_ITEMS: u32 = 259;

/// Errors that can occur while accessing the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Key or value does not exist.
    #[error("registry key or value does not exist")]
    NotExist,

    /// Destination buffer is too small to hold the stored value.
    #[error("buffer too small: {value_type} value needs {required} bytes")]
    ShortBuffer {
        /// Size in bytes the caller must provide.
        required: usize,
        /// Type of the stored value.
        value_type: ValueType,
    },

    /// Value exists but is stored with a different type.
    #[error("unexpected key value type: stored as {actual}")]
    UnexpectedType {
        /// Type the value is actually stored as.
        actual: ValueType,
    },

    /// Payload rejected before any native call was attempted.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// Stored integer data has the wrong width.
    #[error("{value_type} value is not {expected} bytes long (got {actual} bytes)")]
    InvalidLength {
        /// Type tag of the stored value.
        value_type: ValueType,
        /// Width required by the type.
        expected: usize,
        /// Width actually stored.
        actual: usize,
    },

    /// Operation attempted on a released or never-opened handle.
    #[error("registry handle is closed")]
    HandleClosed,

    /// Any other status reported by the native registry layer.
    #[error("registry call failed with status {code} ({code:#x})")]
    Os {
        /// Raw Win32 status code.
        code: u32,
    },
}

impl RegistryError {
    /// Maps a raw Win32 status code to an error.
    ///
    /// `ERROR_FILE_NOT_FOUND` becomes [`RegistryError::NotExist`]; everything
    /// else is surfaced unmodified as [`RegistryError::Os`].
    pub fn from_status(code: u32) -> Self {
        match code {
            ERROR_FILE_NOT_FOUND => Self::NotExist,
            _ => Self::Os { code },
        }
    }

    /// Creates an invalid value error for a string payload containing NUL.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use reg_access::error::RegistryError;
    /// let err = RegistryError::embedded_nul("Hello\0World");
    /// assert!(matches!(err, RegistryError::InvalidValue(_)));
    /// ```
    pub fn embedded_nul(payload: &str) -> Self {
        Self::InvalidValue(format!(
            "string {:?} contains an embedded NUL character",
            payload
        ))
    }

    /// Creates an invalid length error for fixed-width integer data.
    pub fn invalid_length(value_type: ValueType, expected: usize, actual: usize) -> Self {
        Self::InvalidLength {
            value_type,
            expected,
            actual,
        }
    }

    /// Returns the Win32 status code this error corresponds to, if any.
    pub fn status(&self) -> Option<u32> {
        match self {
            Self::NotExist => Some(ERROR_FILE_NOT_FOUND),
            Self::ShortBuffer { .. } => Some(ERROR_MORE_DATA),
            Self::HandleClosed => Some(ERROR_INVALID_HANDLE),
            Self::Os { code } => Some(*code),
            _ => None,
        }
    }
}
