//! Auth gateway: login, register and current-user calls to the backend.
//!
//! ERROR HANDLING
//! ==============
//! Every failure is normalized into an [`AuthError`] variant chosen from the
//! HTTP status (or transport failure), carrying the message the UI should
//! show. Callers match on the variant, never on the message text.

#[cfg(test)]
#[path = "gateway_test.rs"]
mod gateway_test;

use reqwest::StatusCode;

use crate::types::{LoginResponse, RegisterRequest, User, error_detail};

/// Path prefix of the backend's auth endpoints.
pub const BACKEND_AUTH_PREFIX: &str = "/api/v1/auth";
/// Path prefix of the same endpoints when reached through the proxy.
pub const PROXY_AUTH_PREFIX: &str = "/api/auth";

pub const NETWORK_ERROR_MESSAGE: &str =
    "Network error: Unable to connect to the server. Please check if the backend is running.";
pub const SERVER_ERROR_MESSAGE: &str = "Server error. Please try again later.";

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidCredentials(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    ServerError(String),
    #[error("{0}")]
    NetworkError(String),
    #[error("{0}")]
    Other(String),
}

impl AuthError {
    /// The user-facing message carried by any variant.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidCredentials(m)
            | Self::InvalidInput(m)
            | Self::Conflict(m)
            | Self::Unauthorized(m)
            | Self::ServerError(m)
            | Self::NetworkError(m)
            | Self::Other(m) => m,
        }
    }

    /// True for the 401 family.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::InvalidCredentials(_) | Self::Unauthorized(_))
    }

    fn network() -> Self {
        Self::NetworkError(NETWORK_ERROR_MESSAGE.to_owned())
    }
}

/// Which call produced a failing status; picks the 401 variant and the
/// fallback wording.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AuthOp {
    Login,
    Register,
    CurrentUser,
}

/// Map a non-success status plus optional backend `detail` to an error.
pub(crate) fn classify(op: AuthOp, status: StatusCode, detail: Option<String>) -> AuthError {
    match status.as_u16() {
        401 if op == AuthOp::CurrentUser => {
            AuthError::Unauthorized(detail.unwrap_or_else(|| "Could not validate credentials".to_owned()))
        }
        401 => AuthError::InvalidCredentials(detail.unwrap_or_else(|| "Invalid username or password".to_owned())),
        400 => AuthError::InvalidInput(detail.unwrap_or_else(|| "Invalid input data".to_owned())),
        409 => AuthError::Conflict("Username or email already exists".to_owned()),
        code if code >= 500 => AuthError::ServerError(SERVER_ERROR_MESSAGE.to_owned()),
        code => AuthError::Other(detail.unwrap_or_else(|| match op {
            AuthOp::Login => format!("Login failed: {code}"),
            AuthOp::Register => format!("Registration failed: {code}"),
            AuthOp::CurrentUser => format!("Failed to fetch user details: {code}"),
        })),
    }
}

/// Backend auth operations the session manager depends on.
#[async_trait::async_trait]
pub trait AuthGateway: Send + Sync {
    /// Exchange credentials for a bearer token and the user it belongs to.
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AuthError>;

    /// Create an account. Does not log in.
    async fn register(&self, request: &RegisterRequest) -> Result<(), AuthError>;

    /// Resolve a bearer token to its user.
    async fn fetch_current_user(&self, token: &str) -> Result<User, AuthError>;
}

// =============================================================================
// HTTP IMPLEMENTATION
// =============================================================================

/// [`AuthGateway`] over HTTP via `reqwest`.
#[derive(Clone, Debug)]
pub struct HttpAuthGateway {
    client: reqwest::Client,
    base_url: String,
    auth_prefix: String,
}

impl HttpAuthGateway {
    /// Talk to the backend directly at `base_url`.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            auth_prefix: BACKEND_AUTH_PREFIX.to_owned(),
        }
    }

    /// Route calls through the same-origin proxy's `/api/auth/*` paths.
    #[must_use]
    pub fn via_proxy(mut self) -> Self {
        PROXY_AUTH_PREFIX.clone_into(&mut self.auth_prefix);
        self
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}{}/{name}", self.base_url, self.auth_prefix)
    }
}

/// Read a failing response body and classify it.
async fn failure(op: AuthOp, resp: reqwest::Response) -> AuthError {
    let status = resp.status();
    let detail = resp
        .json::<serde_json::Value>()
        .await
        .ok()
        .as_ref()
        .and_then(error_detail);
    let err = classify(op, status, detail);
    tracing::debug!(status = status.as_u16(), ?op, error = %err, "auth request rejected");
    err
}

#[async_trait::async_trait]
impl AuthGateway for HttpAuthGateway {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let resp = self
            .client
            .post(self.endpoint("login"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "login request failed");
                AuthError::network()
            })?;

        if !resp.status().is_success() {
            return Err(failure(AuthOp::Login, resp).await);
        }
        resp.json::<LoginResponse>()
            .await
            .map_err(|e| AuthError::Other(format!("unexpected login response: {e}")))
    }

    async fn register(&self, request: &RegisterRequest) -> Result<(), AuthError> {
        let resp = self
            .client
            .post(self.endpoint("register"))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "register request failed");
                AuthError::network()
            })?;

        if !resp.status().is_success() {
            return Err(failure(AuthOp::Register, resp).await);
        }
        Ok(())
    }

    async fn fetch_current_user(&self, token: &str) -> Result<User, AuthError> {
        let resp = self
            .client
            .get(self.endpoint("me"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "current-user request failed");
                AuthError::network()
            })?;

        if !resp.status().is_success() {
            return Err(failure(AuthOp::CurrentUser, resp).await);
        }
        resp.json::<User>()
            .await
            .map_err(|e| AuthError::Other(format!("unexpected user response: {e}")))
    }
}
