//! Auth routes. Login and registration need request shaping before they
//! reach the backend; every other `/api/auth/*` call goes through the
//! generic forwarder.

use std::sync::LazyLock;

use axum::extract::{FromRequest, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method};
use axum::{Form, Json};
use regex::Regex;
use serde::Deserialize;
use session::types::RegisterRequest;

use super::forward::authorization_header;
use crate::proxy::{ProxyBody, ProxyError, ProxyRequest, ProxyResponse};
use crate::state::AppState;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

pub(crate) const INVALID_BODY_DETAIL: &str = "Invalid request body format";
pub(crate) const LOGIN_FAILED_DETAIL: &str = "Login failed";
pub(crate) const REGISTRATION_FAILED_DETAIL: &str = "Registration failed";

#[derive(Debug, Default, Deserialize)]
pub struct LoginCredentials {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterInput {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    confirm_password: Option<String>,
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/x-www-form-urlencoded"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Validate and normalize a registration payload.
pub(crate) fn normalize_registration(input: RegisterInput) -> Result<RegisterRequest, ProxyError> {
    let (Some(username), Some(email), Some(password)) =
        (non_empty(input.username), non_empty(input.email), non_empty(input.password))
    else {
        return Err(ProxyError::BadRequest("Username, email, and password are required".to_owned()));
    };
    if !is_valid_email(&email) {
        return Err(ProxyError::BadRequest("Invalid email format".to_owned()));
    }

    let confirm_password = non_empty(input.confirm_password).unwrap_or_else(|| password.clone());
    Ok(RegisterRequest {
        username: username.trim().to_owned(),
        email: email.trim().to_lowercase(),
        password,
        confirm_password,
    })
}

/// `POST /api/auth/login`: accepts form or JSON, forwards form data.
pub async fn login(State(state): State<AppState>, request: Request) -> Result<ProxyResponse, ProxyError> {
    let credentials = if is_form(request.headers()) {
        Form::<LoginCredentials>::from_request(request, &state)
            .await
            .map(|Form(c)| c)
            .map_err(|_| ProxyError::BadRequest(INVALID_BODY_DETAIL.to_owned()))?
    } else {
        Json::<LoginCredentials>::from_request(request, &state)
            .await
            .map(|Json(c)| c)
            .map_err(|_| ProxyError::BadRequest(INVALID_BODY_DETAIL.to_owned()))?
    };

    if credentials.username.is_empty() || credentials.password.is_empty() {
        return Err(ProxyError::BadRequest("Username and password are required".to_owned()));
    }

    tracing::info!(username = %credentials.username, "proxying login");
    let mut req = ProxyRequest::new(Method::POST, "/api/v1/auth/login");
    req.failure_detail = LOGIN_FAILED_DETAIL;
    req.body = ProxyBody::Form(vec![
        ("username".to_owned(), credentials.username),
        ("password".to_owned(), credentials.password),
    ]);
    state.proxy.forward(req).await
}

/// `POST /api/auth/register`: validate, normalize, forward as JSON.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<ProxyResponse, ProxyError> {
    let input: RegisterInput =
        serde_json::from_slice(&body).map_err(|_| ProxyError::BadRequest(INVALID_BODY_DETAIL.to_owned()))?;
    let request = normalize_registration(input)?;

    tracing::info!(username = %request.username, email = %request.email, password = "***", "proxying registration");
    let payload = serde_json::to_value(&request).map_err(|e| ProxyError::TransportFailure(e.to_string()))?;
    let mut req = ProxyRequest::new(Method::POST, "/api/v1/auth/register");
    req.failure_detail = REGISTRATION_FAILED_DETAIL;
    req.authorization = authorization_header(&headers);
    req.body = ProxyBody::Json(payload);
    state.proxy.forward(req).await
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
