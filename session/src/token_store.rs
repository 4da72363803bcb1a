//! Bearer-token persistence.
//!
//! DESIGN
//! ======
//! The store is a capability injected into the session manager, API client
//! and proxy, so tests swap in [`MemoryTokenStore`]. Expiry is never checked
//! here; that belongs to the session manager.
//!
//! Every write replaces the whole value, so there are no read-modify-write
//! races between callers sharing one store.

#[cfg(test)]
#[path = "token_store_test.rs"]
mod token_store_test;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Fixed key the bearer token is stored under.
pub const TOKEN_KEY: &str = "token";

/// Synchronous get/set/clear over a single bearer token.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, token: &str);
    fn clear(&self);
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("token store io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("token store document is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

// =============================================================================
// MEMORY
// =============================================================================

/// Process-local store. Used by tests and by the proxy when no persistent
/// location is configured.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: &str) -> Self {
        Self { token: Mutex::new(Some(token.to_owned())) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token.lock().ok()?.clone()
    }

    fn set(&self, token: &str) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token.to_owned());
        }
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = None;
        }
    }
}

// =============================================================================
// FILE
// =============================================================================

/// Persistent store: one small JSON key/value document per origin.
///
/// The document is loaded once at [`FileTokenStore::open`]; afterwards the
/// cached value is authoritative and disk failures are logged, not raised.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    cached: Mutex<Option<String>>,
}

impl FileTokenStore {
    /// Open (or lazily create) the document for `origin` under `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing document cannot be read or parsed.
    pub fn open(dir: impl AsRef<Path>, origin: &str) -> Result<Self, StoreError> {
        let path = dir.as_ref().join(format!("{}.json", origin_file_stem(origin)));
        let token = read_document(&path)?.remove(TOKEN_KEY);
        Ok(Self { path, cached: Mutex::new(token) })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, token: Option<&str>) {
        if let Err(e) = write_document(&self.path, token) {
            tracing::warn!(error = %e, path = %self.path.display(), "token store write failed");
        }
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        self.cached.lock().ok()?.clone()
    }

    fn set(&self, token: &str) {
        if let Ok(mut slot) = self.cached.lock() {
            *slot = Some(token.to_owned());
        }
        self.persist(Some(token));
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.cached.lock() {
            *slot = None;
        }
        self.persist(None);
    }
}

/// Map an origin like `http://localhost:8000` to a safe file stem.
fn origin_file_stem(origin: &str) -> String {
    origin
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

fn read_document(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e.into()),
    }
}

fn write_document(path: &Path, token: Option<&str>) -> Result<(), StoreError> {
    let mut doc = read_document(path).unwrap_or_default();
    match token {
        Some(token) => doc.insert(TOKEN_KEY.to_owned(), token.to_owned()),
        None => doc.remove(TOKEN_KEY),
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(&doc)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
