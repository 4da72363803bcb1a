//! Generic forwarding for every `/api/*` path without a dedicated handler.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Method, Uri};

use super::auth::INVALID_BODY_DETAIL;
use crate::proxy::{ProxyBody, ProxyError, ProxyRequest, ProxyResponse, backend_path};
use crate::state::AppState;

pub(crate) fn authorization_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Methods whose non-empty body must be JSON and is re-serialized upstream.
fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

pub(crate) fn parse_body(method: &Method, body: &[u8]) -> Result<ProxyBody, ProxyError> {
    if !carries_body(method) || body.is_empty() {
        return Ok(ProxyBody::Empty);
    }
    serde_json::from_slice(body)
        .map(ProxyBody::Json)
        .map_err(|_| ProxyError::BadRequest(INVALID_BODY_DETAIL.to_owned()))
}

/// `ANY /api/{*rest}`: map the path, then forward everything else as-is.
pub async fn forward(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ProxyResponse, ProxyError> {
    let mut req = ProxyRequest::new(method.clone(), backend_path(uri.path()));
    req.query = uri.query().map(str::to_owned);
    req.authorization = authorization_header(&headers);
    req.body = parse_body(&method, &body)?;
    state.proxy.forward(req).await
}

/// `GET /api/health`: backend health probe, no credentials.
pub async fn health(State(state): State<AppState>) -> Result<ProxyResponse, ProxyError> {
    state
        .proxy
        .forward(ProxyRequest::new(Method::GET, backend_path("/api/health")))
        .await
}
