//! Typed registry values and their on-disk encoding.
//!
//! Layout per type:
//!
//! ```text
//! REG_SZ / REG_EXPAND_SZ   UTF-16LE units, one NUL unit
//! REG_MULTI_SZ             s1 NUL s2 NUL ... sN NUL NUL   (empty list: NUL)
//! REG_BINARY               raw bytes, zero length allowed
//! REG_DWORD                4 bytes little-endian
//! REG_QWORD                8 bytes little-endian
//! ```

use crate::error::Result;
use crate::utils::{
    bytes_to_wide, read_dword, read_qword, read_utf16_string, to_wide_nul, wide_to_bytes,
    wide_to_string,
};
use crate::value_type::ValueType;
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

/// A registry value together with its type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TypedValue {
    /// No data.
    None,

    /// String value.
    String(String),

    /// String containing `%NAME%` environment references.
    ExpandString(String),

    /// Ordered list of strings.
    MultiString(Vec<String>),

    /// Binary data.
    Binary(Vec<u8>),

    /// 32-bit integer.
    Dword(u32),

    /// 64-bit integer.
    Qword(u64),
}

impl TypedValue {
    /// Returns the type tag this value is stored with.
    pub fn value_type(&self) -> ValueType {
        match self {
            TypedValue::None => ValueType::None,
            TypedValue::String(_) => ValueType::String,
            TypedValue::ExpandString(_) => ValueType::ExpandString,
            TypedValue::MultiString(_) => ValueType::MultiString,
            TypedValue::Binary(_) => ValueType::Binary,
            TypedValue::Dword(_) => ValueType::Dword,
            TypedValue::Qword(_) => ValueType::Qword,
        }
    }

    /// Encodes the value into the bytes the registry stores.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidValue` if a string payload contains an
    /// embedded NUL. Nothing is encoded in that case.
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            TypedValue::None => Ok(Vec::new()),
            TypedValue::String(s) | TypedValue::ExpandString(s) => encode_string(s),
            TypedValue::MultiString(strings) => encode_multi_string(strings.as_slice()),
            TypedValue::Binary(bytes) => Ok(bytes.clone()),
            TypedValue::Dword(value) => {
                let mut buf = vec![0u8; 4];
                LittleEndian::write_u32(&mut buf, *value);
                Ok(buf)
            }
            TypedValue::Qword(value) => {
                let mut buf = vec![0u8; 8];
                LittleEndian::write_u64(&mut buf, *value);
                Ok(buf)
            }
        }
    }

    /// Decodes raw registry bytes stored under `value_type`.
    ///
    /// String shapes are decoded leniently: a zero-length or malformed buffer
    /// yields the empty value of that shape instead of an error. Integers
    /// must have their exact width.
    ///
    /// Types without a dedicated variant (links, resource lists, big-endian
    /// dwords, unknown tags) come back as [`TypedValue::Binary`].
    pub fn decode(value_type: ValueType, data: &[u8]) -> Result<Self> {
        match value_type {
            ValueType::None => Ok(TypedValue::None),
            ValueType::String => Ok(TypedValue::String(read_utf16_string(data))),
            ValueType::ExpandString => Ok(TypedValue::ExpandString(read_utf16_string(data))),
            ValueType::MultiString => Ok(TypedValue::MultiString(decode_multi_string(data))),
            ValueType::Dword => Ok(TypedValue::Dword(read_dword(data)?)),
            ValueType::Qword => Ok(TypedValue::Qword(read_qword(data)?)),
            ValueType::Binary
            | ValueType::DwordBigEndian
            | ValueType::Link
            | ValueType::ResourceList
            | ValueType::FullResourceDescriptor
            | ValueType::ResourceRequirementsList
            | ValueType::Unknown(_) => Ok(TypedValue::Binary(data.to_vec())),
        }
    }

    /// Returns the string payload of a `String` or `ExpandString` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(s) | TypedValue::ExpandString(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer payload of a `Dword` or `Qword` value.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            TypedValue::Dword(value) => Some(u64::from(*value)),
            TypedValue::Qword(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::None => f.write_str("(none)"),
            TypedValue::String(s) | TypedValue::ExpandString(s) => f.write_str(s),
            TypedValue::MultiString(strings) => f.write_str(&strings.join(", ")),
            TypedValue::Binary(bytes) => f.write_str(&hex::encode_upper(bytes)),
            TypedValue::Dword(d) => write!(f, "{} (0x{:08X})", d, d),
            TypedValue::Qword(q) => write!(f, "{} (0x{:016X})", q, q),
        }
    }
}

/// Encodes a REG_SZ / REG_EXPAND_SZ payload.
pub fn encode_string(s: &str) -> Result<Vec<u8>> {
    Ok(wide_to_bytes(&to_wide_nul(s)?))
}

/// Encodes a REG_MULTI_SZ payload.
///
/// Every component is validated before anything is produced.
pub fn encode_multi_string<S: AsRef<str>>(strings: &[S]) -> Result<Vec<u8>> {
    let mut wide = Vec::new();
    for s in strings {
        wide.extend(to_wide_nul(s.as_ref())?);
    }
    wide.push(0);
    Ok(wide_to_bytes(&wide))
}

/// Decodes a REG_MULTI_SZ payload.
///
/// One trailing NUL unit is dropped, the rest is split on NUL units, and any
/// text after the last NUL is discarded. Stray or truncated data therefore
/// decodes to an empty list rather than an error.
pub fn decode_multi_string(data: &[u8]) -> Vec<String> {
    let mut wide = bytes_to_wide(data);
    if wide.last() == Some(&0) {
        wide.pop();
    }

    let mut strings = Vec::new();
    let mut from = 0;
    for (i, &unit) in wide.iter().enumerate() {
        if unit == 0 {
            strings.push(wide_to_string(&wide[from..i]));
            from = i + 1;
        }
    }
    strings
}
