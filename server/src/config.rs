//! Proxy configuration parsed from environment variables.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use session::config::resolve_backend_url;
use session::{FileTokenStore, TokenStore};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Parse { key: &'static str, value: String },
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
    #[error("token store unavailable: {0}")]
    TokenStore(#[from] session::token_store::StoreError),
}

/// Upstream timeouts. No request timeout unless configured; the transport's
/// own behavior applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyTimeouts {
    pub request: Option<Duration>,
    pub connect: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub backend_url: String,
    pub port: u16,
    pub timeouts: ProxyTimeouts,
    /// When set, requests without an `Authorization` header fall back to the
    /// token persisted here.
    pub token_dir: Option<PathBuf>,
}

impl ProxyConfig {
    /// Build typed proxy config from environment variables.
    ///
    /// - `BACKEND_API_URL` / `PUBLIC_API_URL` / `PUBLIC_API_BASE_URL`:
    ///   backend base address, first defined wins, default `http://localhost:8000`
    /// - `PORT`: default 3000
    /// - `PROXY_REQUEST_TIMEOUT_SECS`: unset means no timeout
    /// - `PROXY_CONNECT_TIMEOUT_SECS`: default 10
    /// - `PROXY_TOKEN_DIR`: optional fallback token store location
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ProxyConfig::from_env`] over an arbitrary lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend_url = resolve_backend_url(&lookup);
        let port = parse_var(&lookup, "PORT")?.unwrap_or(DEFAULT_PORT);
        let request = parse_var::<u64>(&lookup, "PROXY_REQUEST_TIMEOUT_SECS")?.map(Duration::from_secs);
        let connect = Duration::from_secs(
            parse_var(&lookup, "PROXY_CONNECT_TIMEOUT_SECS")?.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        );
        let token_dir = lookup("PROXY_TOKEN_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self { backend_url, port, timeouts: ProxyTimeouts { request, connect }, token_dir })
    }

    /// Open the fallback token store keyed by the backend origin, if configured.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing token document is unreadable.
    pub fn open_token_store(&self) -> Result<Option<Arc<dyn TokenStore>>, ConfigError> {
        let Some(dir) = &self.token_dir else {
            return Ok(None);
        };
        let store = FileTokenStore::open(dir, &self.backend_url)?;
        tracing::info!(path = %store.path().display(), "token fallback enabled");
        Ok(Some(Arc::new(store)))
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Parse { key, value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
