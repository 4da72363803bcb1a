//! Backend address resolution shared by the proxy and the clients.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Variables consulted for the backend base address, first defined wins.
pub const BACKEND_URL_VARS: [&str; 3] = ["BACKEND_API_URL", "PUBLIC_API_URL", "PUBLIC_API_BASE_URL"];

/// Resolve the backend base address from `lookup`, stripping one trailing
/// slash. Empty values count as unset.
pub fn resolve_backend_url(lookup: impl Fn(&str) -> Option<String>) -> String {
    let raw = BACKEND_URL_VARS
        .iter()
        .find_map(|key| lookup(key).filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_owned());
    strip_trailing_slash(raw.trim()).to_owned()
}

/// [`resolve_backend_url`] against the process environment.
#[must_use]
pub fn backend_url_from_env() -> String {
    resolve_backend_url(|key| std::env::var(key).ok())
}

#[must_use]
pub fn strip_trailing_slash(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

/// Parse a boolean-ish env var (`1/true/yes/on`, `0/false/no/off`).
#[must_use]
pub fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}
