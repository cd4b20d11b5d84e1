//! Field lookup inside a raw `Cookie` header value.

use crate::error::{Result, SlotfireError};

/// Return the value of the cookie named `field` in a `name=value; name=value`
/// string.
///
/// Names are matched exactly after trimming whitespace, so `bili_jct` does
/// not match `xbili_jct_old`. Values may themselves contain `=`. An empty
/// value counts as not found.
pub fn extract_field(cookie: &str, field: &str) -> Result<String> {
    cookie
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| name.trim() == field)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| SlotfireError::CookieFieldNotFound {
            field: field.to_string(),
        })
}

/// Show only the first few characters of a secret in log output.
pub fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if visible.len() == secret.len() {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}
