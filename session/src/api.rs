//! Todo REST client.
//!
//! Attaches the stored bearer token to every call and enforces the
//! cross-cutting 401 rule: any `Unauthorized` answer forces a logout on the
//! shared [`SessionManager`] before the error reaches the caller.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::manager::SessionManager;
use crate::types::{Health, Todo, TodoCreate, TodoList, TodoUpdate, error_detail};

pub const DEFAULT_PAGE_LIMIT: u32 = 50;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("session expired, please log in again")]
    Unauthorized,
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

fn todos_path(limit: u32, offset: u32, completed: Option<bool>) -> String {
    let mut path = format!("/api/v1/todos?limit={limit}&offset={offset}");
    if let Some(completed) = completed {
        path.push_str(&format!("&completed={completed}"));
    }
    path
}

fn todo_path(id: i64) -> String {
    format!("/api/v1/todos/{id}")
}

fn status_failed_message(status: u16) -> String {
    format!("HTTP error! status: {status}")
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    session: SessionManager,
}

impl ApiClient {
    #[must_use]
    pub fn new(base_url: &str, session: SessionManager) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, session)
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: &str, session: SessionManager) -> Self {
        Self { client, base_url: base_url.trim_end_matches('/').to_owned(), session }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{path}", self.base_url);
        let mut req = self.client.request(method.clone(), &url);
        if let Some(token) = self.session.token_store().get() {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await.map_err(|e| {
            tracing::warn!(error = %e, %method, %url, "api request failed");
            ApiError::Transport(e.to_string())
        })?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            self.session.handle_unauthorized();
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let message = resp
                .json::<serde_json::Value>()
                .await
                .ok()
                .as_ref()
                .and_then(error_detail)
                .unwrap_or_else(|| status_failed_message(status.as_u16()));
            tracing::debug!(status = status.as_u16(), %method, path, "api request rejected");
            return Err(ApiError::Status { status: status.as_u16(), message });
        }
        Ok(resp)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        self.send(method, path, body)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn to_body<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, ApiError> {
        serde_json::to_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or unhealthy.
    pub async fn health_check(&self) -> Result<Health, ApiError> {
        self.call(Method::GET, "/api/v1/health", None).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] after forcing a logout on 401.
    pub async fn list_todos(&self, limit: u32, offset: u32, completed: Option<bool>) -> Result<Vec<Todo>, ApiError> {
        let list: TodoList = self
            .call(Method::GET, &todos_path(limit, offset, completed), None)
            .await?;
        Ok(list.into_todos())
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Status`] with status 404 for unknown ids.
    pub async fn get_todo(&self, id: i64) -> Result<Todo, ApiError> {
        self.call(Method::GET, &todo_path(id), None).await
    }

    /// # Errors
    ///
    /// Returns an error if the backend rejects the payload.
    pub async fn create_todo(&self, todo: &TodoCreate) -> Result<Todo, ApiError> {
        self.call(Method::POST, "/api/v1/todos", Some(Self::to_body(todo)?))
            .await
    }

    /// Full replace via `PUT`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    pub async fn update_todo(&self, id: i64, todo: &TodoUpdate) -> Result<Todo, ApiError> {
        self.call(Method::PUT, &todo_path(id), Some(Self::to_body(todo)?))
            .await
    }

    /// Partial update via `PATCH`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    pub async fn partial_update_todo(&self, id: i64, todo: &TodoUpdate) -> Result<Todo, ApiError> {
        self.call(Method::PATCH, &todo_path(id), Some(Self::to_body(todo)?))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the backend refuses the delete.
    pub async fn delete_todo(&self, id: i64) -> Result<(), ApiError> {
        self.send(Method::DELETE, &todo_path(id), None).await?;
        Ok(())
    }
}
