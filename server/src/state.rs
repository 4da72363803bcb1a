//! Shared application state.
//!
//! `AppState` is injected into Axum handlers via the `State` extractor. The
//! proxy holds no per-request state, so cloning is just an `Arc` bump inside
//! the HTTP client.

use crate::proxy::Proxy;

#[derive(Clone)]
pub struct AppState {
    pub proxy: Proxy,
}

impl AppState {
    #[must_use]
    pub fn new(proxy: Proxy) -> Self {
        Self { proxy }
    }
}
