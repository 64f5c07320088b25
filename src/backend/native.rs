//! Win32 registry backend.

use crate::access::AccessRights;
use crate::backend::RegistryBackend;
use crate::error::{RegistryError, Result, ERROR_MORE_DATA, ERROR_NO_MORE_ITEMS};
use crate::handle::RawKey;
use crate::key::KeyStatistics;
use crate::utils::{to_wide_nul, wide_to_string};
use crate::value_type::ValueType;
use std::ptr;
use tracing::debug;
use windows_sys::Win32::Foundation::{GetLastError, ERROR_SUCCESS, FILETIME, WIN32_ERROR};
use windows_sys::Win32::System::Registry::{
    RegCloseKey, RegConnectRegistryW, RegCreateKeyExW, RegDeleteKeyW, RegDeleteValueW,
    RegEnumKeyExW, RegEnumValueW, RegLoadMUIStringW, RegOpenKeyExW, RegQueryInfoKeyW,
    RegQueryValueExW, RegSetValueExW, HKEY, REG_OPENED_EXISTING_KEY, REG_OPTION_NON_VOLATILE,
};
use windows_sys::Win32::System::SystemInformation::GetSystemDirectoryW;

/// Longest key name the registry accepts, in UTF-16 units.
const MAX_KEY_NAME: usize = 255;

/// Initial buffer for the system directory, in UTF-16 units.
const MAX_PATH: usize = 260;

/// Initial buffer for value names, grown on `ERROR_MORE_DATA`.
const VALUE_NAME_BUFFER: usize = 256;

/// Backend calling the Windows registry API.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackend;

impl NativeBackend {
    /// Creates the backend.
    pub fn new() -> Self {
        Self
    }
}

/// Converts an identifier to an `HKEY`.
///
/// Predefined roots are sign-extended, as `HKEY_*` constants are on 64-bit
/// Windows.
fn hkey(raw: RawKey) -> HKEY {
    if raw.is_predefined() {
        (raw.0 as u32 as i32 as isize) as HKEY
    } else {
        raw.0 as HKEY
    }
}

fn check(status: WIN32_ERROR) -> Result<()> {
    if status == ERROR_SUCCESS {
        Ok(())
    } else {
        Err(RegistryError::from_status(status))
    }
}

fn filetime_to_u64(ft: &FILETIME) -> u64 {
    (u64::from(ft.dwHighDateTime) << 32) | u64::from(ft.dwLowDateTime)
}

impl RegistryBackend for NativeBackend {
    fn open_key(&self, parent: RawKey, path: &str, access: AccessRights) -> Result<RawKey> {
        let path = to_wide_nul(path)?;
        let mut result: HKEY = ptr::null_mut();
        // SAFETY: `path` is NUL-terminated and outlives the call; `result` is
        // a valid out pointer.
        let status = unsafe {
            RegOpenKeyExW(hkey(parent), path.as_ptr(), 0, access.bits(), &mut result)
        };
        check(status)?;
        Ok(RawKey(result as usize))
    }

    fn create_key(
        &self,
        parent: RawKey,
        path: &str,
        access: AccessRights,
    ) -> Result<(RawKey, bool)> {
        let path = to_wide_nul(path)?;
        let mut result: HKEY = ptr::null_mut();
        let mut disposition = 0u32;
        // SAFETY: pointers are either null (optional class and security
        // attributes) or point at live locals.
        let status = unsafe {
            RegCreateKeyExW(
                hkey(parent),
                path.as_ptr(),
                0,
                ptr::null(),
                REG_OPTION_NON_VOLATILE,
                access.bits(),
                ptr::null(),
                &mut result,
                &mut disposition,
            )
        };
        check(status)?;
        Ok((RawKey(result as usize), disposition == REG_OPENED_EXISTING_KEY))
    }

    fn delete_key(&self, parent: RawKey, path: &str) -> Result<()> {
        let path = to_wide_nul(path)?;
        // SAFETY: `path` is NUL-terminated.
        check(unsafe { RegDeleteKeyW(hkey(parent), path.as_ptr()) })
    }

    fn close_key(&self, key: RawKey) -> Result<()> {
        // SAFETY: the caller owns `key` and releases it once.
        check(unsafe { RegCloseKey(hkey(key)) })
    }

    fn connect_remote(&self, host: &str, root: RawKey) -> Result<RawKey> {
        let host = to_wide_nul(host)?;
        let machine = if host.len() > 1 { host.as_ptr() } else { ptr::null() };
        let mut result: HKEY = ptr::null_mut();
        // SAFETY: `machine` is null or NUL-terminated; `result` is a valid out
        // pointer.
        check(unsafe { RegConnectRegistryW(machine, hkey(root), &mut result) })?;
        Ok(RawKey(result as usize))
    }

    fn query_value(
        &self,
        key: RawKey,
        name: &str,
        buf: Option<&mut [u8]>,
    ) -> Result<(usize, ValueType)> {
        let name = to_wide_nul(name)?;
        let mut value_type = 0u32;
        let (data, mut size) = match buf {
            Some(buf) => (buf.as_mut_ptr(), buf.len() as u32),
            None => (ptr::null_mut(), 0),
        };
        // SAFETY: `data` is null or valid for `size` bytes.
        let status = unsafe {
            RegQueryValueExW(
                hkey(key),
                name.as_ptr(),
                ptr::null(),
                &mut value_type,
                data,
                &mut size,
            )
        };

        let value_type = ValueType::from_u32(value_type);
        match status {
            ERROR_SUCCESS => Ok((size as usize, value_type)),
            ERROR_MORE_DATA => Err(RegistryError::ShortBuffer {
                required: size as usize,
                value_type,
            }),
            code => Err(RegistryError::from_status(code)),
        }
    }

    fn set_value(&self, key: RawKey, name: &str, value_type: ValueType, data: &[u8]) -> Result<()> {
        let name = to_wide_nul(name)?;
        let ptr = if data.is_empty() { ptr::null() } else { data.as_ptr() };
        // SAFETY: `ptr` is null or valid for `data.len()` bytes.
        check(unsafe {
            RegSetValueExW(hkey(key), name.as_ptr(), 0, value_type.as_u32(), ptr, data.len() as u32)
        })
    }

    fn delete_value(&self, key: RawKey, name: &str) -> Result<()> {
        let name = to_wide_nul(name)?;
        // SAFETY: `name` is NUL-terminated.
        check(unsafe { RegDeleteValueW(hkey(key), name.as_ptr()) })
    }

    fn enum_key(&self, key: RawKey, index: u32) -> Result<Option<String>> {
        let mut buf = vec![0u16; MAX_KEY_NAME + 1];
        loop {
            let mut len = buf.len() as u32;
            // SAFETY: `buf` holds `len` units; optional outputs are null.
            let status = unsafe {
                RegEnumKeyExW(
                    hkey(key),
                    index,
                    buf.as_mut_ptr(),
                    &mut len,
                    ptr::null(),
                    ptr::null_mut(),
                    ptr::null_mut(),
                    ptr::null_mut(),
                )
            };
            match status {
                ERROR_SUCCESS => return Ok(Some(wide_to_string(&buf[..len as usize]))),
                ERROR_NO_MORE_ITEMS => return Ok(None),
                ERROR_MORE_DATA => {
                    debug!(index, size = buf.len(), "Growing subkey name buffer");
                    buf.resize(buf.len() * 2, 0);
                }
                code => return Err(RegistryError::from_status(code)),
            }
        }
    }

    fn enum_value(&self, key: RawKey, index: u32) -> Result<Option<String>> {
        let mut buf = vec![0u16; VALUE_NAME_BUFFER];
        loop {
            let mut len = buf.len() as u32;
            // SAFETY: `buf` holds `len` units; type and data outputs are null.
            let status = unsafe {
                RegEnumValueW(
                    hkey(key),
                    index,
                    buf.as_mut_ptr(),
                    &mut len,
                    ptr::null(),
                    ptr::null_mut(),
                    ptr::null_mut(),
                    ptr::null_mut(),
                )
            };
            match status {
                ERROR_SUCCESS => return Ok(Some(wide_to_string(&buf[..len as usize]))),
                ERROR_NO_MORE_ITEMS => return Ok(None),
                ERROR_MORE_DATA => {
                    debug!(index, size = buf.len(), "Growing value name buffer");
                    buf.resize(buf.len() * 2, 0);
                }
                code => return Err(RegistryError::from_status(code)),
            }
        }
    }

    fn query_info(&self, key: RawKey) -> Result<KeyStatistics> {
        let mut stats = KeyStatistics::default();
        let mut last_write = FILETIME {
            dwLowDateTime: 0,
            dwHighDateTime: 0,
        };
        // SAFETY: every non-null pointer refers to a live local.
        check(unsafe {
            RegQueryInfoKeyW(
                hkey(key),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null(),
                &mut stats.subkey_count,
                &mut stats.max_subkey_len,
                ptr::null_mut(),
                &mut stats.value_count,
                &mut stats.max_value_name_len,
                &mut stats.max_value_len,
                ptr::null_mut(),
                &mut last_write,
            )
        })?;
        stats.last_write = filetime_to_u64(&last_write);
        Ok(stats)
    }

    fn load_mui_string(&self, key: RawKey, name: &str) -> Result<String> {
        let name = to_wide_nul(name)?;
        match load_mui(key, &name, ptr::null()) {
            // Resource modules named without a path resolve against the
            // system directory.
            Err(RegistryError::NotExist) => {
                let directory = system_directory()?;
                debug!(?key, "Retrying MUI load against the system directory");
                load_mui(key, &name, directory.as_ptr())
            }
            result => result,
        }
    }
}

fn load_mui(key: RawKey, name: &[u16], directory: *const u16) -> Result<String> {
    let mut buf = vec![0u16; 1024];
    loop {
        let mut needed = 0u32;
        // SAFETY: `name` is NUL-terminated, `directory` is null or
        // NUL-terminated, and `buf` is valid for the byte length passed.
        let status = unsafe {
            RegLoadMUIStringW(
                hkey(key),
                name.as_ptr(),
                buf.as_mut_ptr(),
                (buf.len() * 2) as u32,
                &mut needed,
                0,
                directory,
            )
        };
        match status {
            ERROR_SUCCESS => return Ok(wide_to_string(&buf)),
            ERROR_MORE_DATA => {
                let units = (needed as usize + 1) / 2;
                buf.resize(units.max(buf.len() * 2), 0);
            }
            code => return Err(RegistryError::from_status(code)),
        }
    }
}

/// Returns the NUL-terminated system directory.
fn system_directory() -> Result<Vec<u16>> {
    let mut buf = vec![0u16; MAX_PATH];
    loop {
        // SAFETY: `buf` is valid for `buf.len()` UTF-16 units.
        let len = unsafe { GetSystemDirectoryW(buf.as_mut_ptr(), buf.len() as u32) } as usize;
        if len == 0 {
            // SAFETY: reads the calling thread's last-error value.
            return Err(RegistryError::from_status(unsafe { GetLastError() }));
        }
        if len < buf.len() {
            buf.truncate(len + 1);
            return Ok(buf);
        }
        // Too small; `len` includes the terminator.
        buf.resize(len, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::RootKey;

    #[test]
    fn test_predefined_roots_are_sign_extended() {
        let expected = 0x8000_0001u32 as i32 as isize;
        assert_eq!(hkey(RootKey::CURRENT_USER.raw()) as isize, expected);
        assert_eq!(hkey(RawKey(0x1234)) as usize, 0x1234);
    }

    #[test]
    fn test_filetime_to_u64() {
        let ft = FILETIME {
            dwLowDateTime: 1,
            dwHighDateTime: 2,
        };
        assert_eq!(filetime_to_u64(&ft), (2u64 << 32) | 1);
    }
}
