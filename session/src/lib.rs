//! Client-side session handling for the todo app.
//!
//! SYSTEM CONTEXT
//! ==============
//! `token_store` persists the bearer token, `decoder` peeks at its expiry,
//! `gateway` talks to the backend's auth endpoints, and `manager` ties the
//! three into one login/logout lifecycle. `api` is the todo REST client that
//! every authenticated view goes through.

pub mod api;
pub mod config;
pub mod decoder;
pub mod gateway;
pub mod manager;
pub mod token_store;
pub mod types;

pub use api::{ApiClient, ApiError};
pub use decoder::{Claims, DecodeError};
pub use gateway::{AuthError, AuthGateway, HttpAuthGateway};
pub use manager::{Navigation, Session, SessionManager, SessionPhase};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use types::{Health, Todo, TodoCreate, TodoList, TodoUpdate, User};
