//! Utility functions for UTF-16 string conversion and fixed-width integers.

use crate::error::{RegistryError, Result};
use crate::value_type::ValueType;
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use encoding_rs::UTF_16LE;
use std::io::Cursor;

/// Encodes a string as UTF-16 code units followed by one NUL unit.
///
/// # Errors
///
/// Returns `RegistryError::InvalidValue` if the string contains an embedded
/// NUL, since the registry would silently truncate it.
pub fn to_wide_nul(s: &str) -> Result<Vec<u16>> {
    if s.contains('\0') {
        return Err(RegistryError::embedded_nul(s));
    }
    let mut wide: Vec<u16> = s.encode_utf16().collect();
    wide.push(0);
    Ok(wide)
}

/// Serializes UTF-16 code units as little-endian bytes.
pub fn wide_to_bytes(wide: &[u16]) -> Vec<u8> {
    let mut bytes = vec![0u8; wide.len() * 2];
    LittleEndian::write_u16_into(wide, &mut bytes);
    bytes
}

/// Reinterprets little-endian bytes as UTF-16 code units.
///
/// A trailing odd byte cannot form a unit and is ignored.
pub fn bytes_to_wide(data: &[u8]) -> Vec<u16> {
    let mut wide = vec![0u16; data.len() / 2];
    LittleEndian::read_u16_into(&data[..wide.len() * 2], &mut wide);
    wide
}

/// Decodes UTF-16 code units up to (not including) the first NUL unit.
///
/// Unpaired surrogates are replaced rather than rejected.
pub fn wide_to_string(wide: &[u16]) -> String {
    let end = wide.iter().position(|&unit| unit == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..end])
}

/// Reads a UTF-16LE string from a byte slice, stopping at the first NUL.
///
/// Registry strings are normally null-terminated, but stored data is not
/// guaranteed to be well formed: odd lengths and missing terminators are
/// tolerated, and invalid sequences are replaced.
pub fn read_utf16_string(data: &[u8]) -> String {
    if data.len() < 2 {
        return String::new();
    }

    let even = &data[..data.len() & !1];
    let (decoded, _had_errors) = UTF_16LE.decode_without_bom_handling(even);
    let text: &str = &decoded;

    match text.find('\0') {
        Some(end) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Reads a u32 that must occupy exactly four bytes.
pub fn read_dword(data: &[u8]) -> Result<u32> {
    if data.len() != 4 {
        return Err(RegistryError::invalid_length(ValueType::Dword, 4, data.len()));
    }

    let mut cursor = Cursor::new(data);
    cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| RegistryError::invalid_length(ValueType::Dword, 4, data.len()))
}

/// Reads a u64 that must occupy exactly eight bytes.
pub fn read_qword(data: &[u8]) -> Result<u64> {
    if data.len() != 8 {
        return Err(RegistryError::invalid_length(ValueType::Qword, 8, data.len()));
    }

    let mut cursor = Cursor::new(data);
    cursor
        .read_u64::<LittleEndian>()
        .map_err(|_| RegistryError::invalid_length(ValueType::Qword, 8, data.len()))
}

/// Number of UTF-16 units needed to store `s`, excluding any terminator.
pub fn utf16_len(s: &str) -> u32 {
    s.encode_utf16().count() as u32
}
