//! Wire types shared with the backend REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! The backend is the sole source of truth for users and todos. These types
//! mirror its JSON shapes exactly; nothing here is mutated locally except by
//! whole-value replacement.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};

/// Authenticated user as returned by `GET /api/v1/auth/me`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// Successful login body from `POST /api/v1/auth/login`.
#[derive(Clone, Debug, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub user: User,
}

/// Registration payload sent as JSON to `POST /api/v1/auth/register`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

// =============================================================================
// TODOS
// =============================================================================

/// A todo item. Timestamps are ISO-8601 strings passed through untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Body for `POST /api/v1/todos`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoCreate {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

/// Body for `PUT`/`PATCH /api/v1/todos/{id}`. Absent fields are omitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

/// The todo listing endpoint has returned both a bare array and a paged
/// wrapper object over time; accept either.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TodoList {
    Items(Vec<Todo>),
    Page {
        todos: Vec<Todo>,
        #[serde(default)]
        total_count: Option<u64>,
        #[serde(default)]
        limit: Option<u32>,
        #[serde(default)]
        offset: Option<u32>,
    },
}

impl TodoList {
    #[must_use]
    pub fn into_todos(self) -> Vec<Todo> {
        match self {
            Self::Items(todos) | Self::Page { todos, .. } => todos,
        }
    }
}

/// Body of `GET /api/v1/health`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Pull a human-readable message out of a backend error body.
///
/// The backend reports `{"detail": "..."}`, or for validation failures
/// `{"detail": [{"msg": "...", ...}]}`.
#[must_use]
pub fn error_detail(body: &serde_json::Value) -> Option<String> {
    match body.get("detail")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Array(items) => items
            .iter()
            .find_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
            .map(str::to_owned),
        _ => None,
    }
}
