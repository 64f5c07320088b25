//! Environment-variable expansion for REG_EXPAND_SZ strings.
//!
//! `%NAME%` is replaced by the value of `NAME`. A reference that cannot be
//! resolved stays in the output verbatim, and its closing `%` is free to open
//! the next reference, matching `ExpandEnvironmentStrings`.

use std::env;

/// Expands `%NAME%` references using the current process environment.
///
/// # Examples
///
/// ```rust
/// use reg_access::expand_string;
///
/// assert_eq!(expand_string("%NO_SUCH_VARIABLE%"), "%NO_SUCH_VARIABLE%");
/// ```
pub fn expand_string(value: &str) -> String {
    expand_with(value, |name| env::var(name).ok())
}

/// Expands `%NAME%` references using `lookup` to resolve names.
pub fn expand_with<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let Some(len) = after.find('%') else {
            // Unterminated reference
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..len];
        match (!name.is_empty()).then(|| lookup(name)).flatten() {
            Some(resolved) => {
                out.push_str(&resolved);
                rest = &after[len + 1..];
            }
            None => {
                out.push('%');
                out.push_str(name);
                rest = &after[len..];
            }
        }
    }

    out.push_str(rest);
    out
}
