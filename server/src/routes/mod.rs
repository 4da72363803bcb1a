//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every browser-facing `/api/*` path is same-origin; these routes shape the
//! request where the backend needs it (login, register) and forward the rest
//! through [`crate::proxy::Proxy`].

pub mod auth;
pub mod forward;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{any, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/api/health", get(forward::health))
        .route("/api/{*rest}", any(forward::forward))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
