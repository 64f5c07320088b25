//! Registry value type tags.
//!
//! The tag is stored next to every value and decides how its raw bytes are
//! interpreted by the codec in [`crate::value`].

use std::fmt;

/// Registry value data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueType {
    /// No value type.
    None,

    /// String (null-terminated).
    String,

    /// String with environment variables.
    ExpandString,

    /// Binary data.
    Binary,

    /// 32-bit little-endian integer.
    Dword,

    /// 32-bit big-endian integer.
    DwordBigEndian,

    /// Symbolic link (Unicode).
    Link,

    /// Multiple strings.
    MultiString,

    /// Resource list.
    ResourceList,

    /// Full resource descriptor.
    FullResourceDescriptor,

    /// Resource requirements list.
    ResourceRequirementsList,

    /// 64-bit little-endian integer.
    Qword,

    /// Non-standard value type carrying its raw tag.
    Unknown(u32),
}

/// Raw tag of [`ValueType::None`].
pub const REG_NONE: u32 = 0;
/// Raw tag of [`ValueType::String`].
pub const REG_SZ: u32 = 1;
/// Raw tag of [`ValueType::ExpandString`].
pub const REG_EXPAND_SZ: u32 = 2;
/// Raw tag of [`ValueType::Binary`].
pub const REG_BINARY: u32 = 3;
/// Raw tag of [`ValueType::Dword`].
pub const REG_DWORD: u32 = 4;
/// Raw tag of [`ValueType::DwordBigEndian`].
pub const REG_DWORD_BIG_ENDIAN: u32 = 5;
/// Raw tag of [`ValueType::Link`].
pub const REG_LINK: u32 = 6;
/// Raw tag of [`ValueType::MultiString`].
pub const REG_MULTI_SZ: u32 = 7;
/// Raw tag of [`ValueType::ResourceList`].
pub const REG_RESOURCE_LIST: u32 = 8;
/// Raw tag of [`ValueType::FullResourceDescriptor`].
pub const REG_FULL_RESOURCE_DESCRIPTOR: u32 = 9;
/// Raw tag of [`ValueType::ResourceRequirementsList`].
pub const REG_RESOURCE_REQUIREMENTS_LIST: u32 = 10;
/// Raw tag of [`ValueType::Qword`].
pub const REG_QWORD: u32 = 11;

impl ValueType {
    /// Converts a raw tag into a value type.
    ///
    /// Tags outside the predefined range are kept as [`ValueType::Unknown`].
    pub fn from_u32(value: u32) -> Self {
        match value {
            REG_NONE => ValueType::None,
            REG_SZ => ValueType::String,
            REG_EXPAND_SZ => ValueType::ExpandString,
            REG_BINARY => ValueType::Binary,
            REG_DWORD => ValueType::Dword,
            REG_DWORD_BIG_ENDIAN => ValueType::DwordBigEndian,
            REG_LINK => ValueType::Link,
            REG_MULTI_SZ => ValueType::MultiString,
            REG_RESOURCE_LIST => ValueType::ResourceList,
            REG_FULL_RESOURCE_DESCRIPTOR => ValueType::FullResourceDescriptor,
            REG_RESOURCE_REQUIREMENTS_LIST => ValueType::ResourceRequirementsList,
            REG_QWORD => ValueType::Qword,
            _ => ValueType::Unknown(value),
        }
    }

    /// Returns the raw tag stored by the registry.
    pub fn as_u32(&self) -> u32 {
        match self {
            ValueType::None => REG_NONE,
            ValueType::String => REG_SZ,
            ValueType::ExpandString => REG_EXPAND_SZ,
            ValueType::Binary => REG_BINARY,
            ValueType::Dword => REG_DWORD,
            ValueType::DwordBigEndian => REG_DWORD_BIG_ENDIAN,
            ValueType::Link => REG_LINK,
            ValueType::MultiString => REG_MULTI_SZ,
            ValueType::ResourceList => REG_RESOURCE_LIST,
            ValueType::FullResourceDescriptor => REG_FULL_RESOURCE_DESCRIPTOR,
            ValueType::ResourceRequirementsList => REG_RESOURCE_REQUIREMENTS_LIST,
            ValueType::Qword => REG_QWORD,
            ValueType::Unknown(value) => *value,
        }
    }

    /// Returns the name of this value type.
    pub fn name(&self) -> String {
        match self {
            ValueType::None => "REG_NONE".to_string(),
            ValueType::String => "REG_SZ".to_string(),
            ValueType::ExpandString => "REG_EXPAND_SZ".to_string(),
            ValueType::Binary => "REG_BINARY".to_string(),
            ValueType::Dword => "REG_DWORD".to_string(),
            ValueType::DwordBigEndian => "REG_DWORD_BIG_ENDIAN".to_string(),
            ValueType::Link => "REG_LINK".to_string(),
            ValueType::MultiString => "REG_MULTI_SZ".to_string(),
            ValueType::ResourceList => "REG_RESOURCE_LIST".to_string(),
            ValueType::FullResourceDescriptor => "REG_FULL_RESOURCE_DESCRIPTOR".to_string(),
            ValueType::ResourceRequirementsList => "REG_RESOURCE_REQUIREMENTS_LIST".to_string(),
            ValueType::Qword => "REG_QWORD".to_string(),
            ValueType::Unknown(value) => format!("REG_UNKNOWN_{:#010x}", value),
        }
    }

    /// Returns true for the string-shaped types read by `get_string_value`.
    pub fn is_string(&self) -> bool {
        matches!(self, ValueType::String | ValueType::ExpandString)
    }

    /// Returns true for the integer types read by `get_integer_value`.
    pub fn is_integer(&self) -> bool {
        matches!(self, ValueType::Dword | ValueType::Qword)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl From<u32> for ValueType {
    fn from(value: u32) -> Self {
        Self::from_u32(value)
    }
}

impl From<ValueType> for u32 {
    fn from(value: ValueType) -> Self {
        value.as_u32()
    }
}
