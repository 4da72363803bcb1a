//! Request proxy. Forwards same-origin `/api/*` calls to the backend.
//!
//! DESIGN
//! ======
//! Stateless per request: [`Proxy::forward`] takes a fully-described
//! [`ProxyRequest`] and returns the backend's status and JSON body. Axum
//! handlers in `routes` only translate inbound requests into that shape.
//!
//! ERROR HANDLING
//! ==============
//! Upstream failures relay the backend's status with its JSON error body
//! (or a generic one). Transport failures become a fixed 500; the cause is
//! logged and never sent to the client.

use std::sync::Arc;

use axum::Json;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use session::TokenStore;

use crate::config::{ConfigError, ProxyConfig};

pub const INTERNAL_ERROR_DETAIL: &str = "Internal server error";
pub const UPSTREAM_ERROR_DETAIL: &str = "Request failed";

/// Map an inbound same-origin path to the backend's path.
///
/// `/api/auth/...` moves under the versioned `/api/v1/auth/...`, the health
/// probe moves to `/api/v1/health`, and every other `/api/<suffix>` is
/// forwarded as-is.
#[must_use]
pub fn backend_path(inbound: &str) -> String {
    if let Some(rest) = inbound.strip_prefix("/api/auth") {
        if rest.is_empty() || rest.starts_with('/') {
            return format!("/api/v1/auth{rest}");
        }
    }
    if inbound == "/api/health" {
        return "/api/v1/health".to_owned();
    }
    inbound.to_owned()
}

// =============================================================================
// REQUEST / RESPONSE
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum ProxyBody {
    Empty,
    Json(Value),
    /// Only the login endpoint forwards form data.
    Form(Vec<(String, String)>),
}

#[derive(Clone, Debug)]
pub struct ProxyRequest {
    pub method: Method,
    /// Already-mapped backend path, see [`backend_path`].
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: ProxyBody,
    /// `detail` relayed when a failing upstream body is not JSON.
    pub failure_detail: &'static str,
}

impl ProxyRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            authorization: None,
            body: ProxyBody::Empty,
            failure_detail: UPSTREAM_ERROR_DETAIL,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProxyResponse {
    pub status: StatusCode,
    /// `None` relays an empty body.
    pub body: Option<Value>,
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("upstream returned {status}")]
    UpstreamFailure { status: StatusCode, body: Value },
    #[error("upstream transport failed: {0}")]
    TransportFailure(String),
    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            Self::UpstreamFailure { status, body } => (status, Json(body)).into_response(),
            Self::TransportFailure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "detail": INTERNAL_ERROR_DETAIL }))).into_response()
            }
            Self::BadRequest(detail) => (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))).into_response(),
        }
    }
}

// =============================================================================
// PROXY
// =============================================================================

#[derive(Clone)]
pub struct Proxy {
    client: reqwest::Client,
    backend_url: String,
    token_store: Option<Arc<dyn TokenStore>>,
}

impl Proxy {
    /// Build the upstream HTTP client from config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ProxyConfig, token_store: Option<Arc<dyn TokenStore>>) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder().connect_timeout(config.timeouts.connect);
        if let Some(timeout) = config.timeouts.request {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::HttpClientBuild(e.to_string()))?;
        Ok(Self { client, backend_url: config.backend_url.clone(), token_store })
    }

    fn url_for(&self, req: &ProxyRequest) -> String {
        match req.query.as_deref().filter(|q| !q.is_empty()) {
            Some(query) => format!("{}{}?{query}", self.backend_url, req.path),
            None => format!("{}{}", self.backend_url, req.path),
        }
    }

    /// Inbound header verbatim, else the stored token, else empty.
    fn authorization_for(&self, req: &ProxyRequest) -> String {
        req.authorization
            .clone()
            .or_else(|| {
                self.token_store
                    .as_ref()
                    .and_then(|store| store.get())
                    .map(|token| format!("Bearer {token}"))
            })
            .unwrap_or_default()
    }

    /// Forward one request and relay the outcome.
    ///
    /// # Errors
    ///
    /// [`ProxyError::UpstreamFailure`] for non-success statuses and
    /// [`ProxyError::TransportFailure`] when the backend cannot be reached or
    /// answers success with a non-JSON body.
    pub async fn forward(&self, req: ProxyRequest) -> Result<ProxyResponse, ProxyError> {
        let url = self.url_for(&req);
        let authorization = self.authorization_for(&req);

        let builder = self
            .client
            .request(req.method.clone(), &url)
            .header(AUTHORIZATION, authorization);
        let builder = match &req.body {
            ProxyBody::Empty => builder.header(CONTENT_TYPE, "application/json"),
            ProxyBody::Json(body) => builder.json(body),
            ProxyBody::Form(pairs) => builder.form(pairs),
        };

        let resp = builder.send().await.map_err(|e| {
            tracing::error!(error = %e, method = %req.method, %url, "upstream request failed");
            ProxyError::TransportFailure(e.to_string())
        })?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| {
            tracing::error!(error = %e, %url, "upstream body read failed");
            ProxyError::TransportFailure(e.to_string())
        })?;

        if !status.is_success() {
            let body = serde_json::from_slice::<Value>(&bytes)
                .unwrap_or_else(|_| json!({ "detail": req.failure_detail }));
            tracing::debug!(status = status.as_u16(), path = %req.path, "upstream rejected request");
            return Err(ProxyError::UpstreamFailure { status, body });
        }

        if req.method == Method::DELETE {
            return Ok(ProxyResponse { status: StatusCode::NO_CONTENT, body: None });
        }
        if bytes.is_empty() {
            return Ok(ProxyResponse { status, body: None });
        }

        let body = serde_json::from_slice::<Value>(&bytes).map_err(|e| {
            tracing::error!(error = %e, %url, "upstream success body is not JSON");
            ProxyError::TransportFailure(e.to_string())
        })?;
        Ok(ProxyResponse { status, body: Some(body) })
    }
}

#[cfg(test)]
#[path = "proxy_test.rs"]
mod tests;
