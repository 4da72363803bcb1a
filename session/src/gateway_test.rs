use super::*;
use std::collections::HashMap;

use axum::Router;
use axum::extract::Form;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use serde_json::json;

async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

async fn unreachable_base() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn alice() -> serde_json::Value {
    json!({ "id": 1, "username": "alice", "email": "alice@example.com" })
}

// =============================================================================
// classify
// =============================================================================

#[test]
fn classify_login_401_is_invalid_credentials_with_detail() {
    let err = classify(AuthOp::Login, StatusCode::UNAUTHORIZED, Some("Incorrect password".into()));
    assert_eq!(err, AuthError::InvalidCredentials("Incorrect password".into()));
}

#[test]
fn classify_current_user_401_is_unauthorized() {
    let err = classify(AuthOp::CurrentUser, StatusCode::UNAUTHORIZED, None);
    assert!(matches!(err, AuthError::Unauthorized(_)));
    assert!(err.is_unauthorized());
}

#[test]
fn classify_status_table() {
    assert!(matches!(classify(AuthOp::Register, StatusCode::BAD_REQUEST, None), AuthError::InvalidInput(m) if m == "Invalid input data"));
    assert!(matches!(classify(AuthOp::Register, StatusCode::CONFLICT, Some("dup".into())), AuthError::Conflict(m) if m == "Username or email already exists"));
    assert!(matches!(classify(AuthOp::Login, StatusCode::BAD_GATEWAY, Some("boom".into())), AuthError::ServerError(m) if m == SERVER_ERROR_MESSAGE));
    assert!(matches!(classify(AuthOp::Login, StatusCode::IM_A_TEAPOT, None), AuthError::Other(m) if m == "Login failed: 418"));
    assert!(matches!(classify(AuthOp::Register, StatusCode::UNPROCESSABLE_ENTITY, Some("bad email".into())), AuthError::Other(m) if m == "bad email"));
}

#[test]
fn message_returns_inner_text() {
    assert_eq!(AuthError::NetworkError("x".into()).message(), "x");
    assert_eq!(AuthError::Other("y".into()).to_string(), "y");
}

// =============================================================================
// HTTP
// =============================================================================

#[tokio::test]
async fn login_sends_form_and_parses_token() {
    let router = Router::new().route(
        "/api/v1/auth/login",
        post(|headers: HeaderMap, Form(form): Form<HashMap<String, String>>| async move {
            let content_type = headers.get("content-type").and_then(|v| v.to_str().ok()).unwrap_or_default();
            assert!(content_type.starts_with("application/x-www-form-urlencoded"));
            assert_eq!(form.get("username").map(String::as_str), Some("alice"));
            assert_eq!(form.get("password").map(String::as_str), Some("secret"));
            axum::Json(json!({ "access_token": "tok", "token_type": "bearer", "user": alice() }))
        }),
    );
    let gateway = HttpAuthGateway::new(&spawn_backend(router).await);

    let resp = gateway.login("alice", "secret").await.unwrap();
    assert_eq!(resp.access_token, "tok");
    assert_eq!(resp.user.username, "alice");
}

#[tokio::test]
async fn login_401_surfaces_backend_detail() {
    let router = Router::new().route(
        "/api/v1/auth/login",
        post(|| async {
            (StatusCode::UNAUTHORIZED, axum::Json(json!({ "detail": "Invalid credentials" }))).into_response()
        }),
    );
    let gateway = HttpAuthGateway::new(&spawn_backend(router).await);

    let err = gateway.login("alice", "wrong").await.unwrap_err();
    assert_eq!(err, AuthError::InvalidCredentials("Invalid credentials".into()));
}

#[tokio::test]
async fn login_5xx_with_html_body_is_server_error() {
    let router = Router::new().route(
        "/api/v1/auth/login",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>").into_response() }),
    );
    let gateway = HttpAuthGateway::new(&spawn_backend(router).await);

    let err = gateway.login("alice", "secret").await.unwrap_err();
    assert!(matches!(err, AuthError::ServerError(_)));
}

#[tokio::test]
async fn login_transport_failure_is_network_error() {
    let gateway = HttpAuthGateway::new(&unreachable_base().await);
    let err = gateway.login("alice", "secret").await.unwrap_err();
    assert_eq!(err, AuthError::NetworkError(NETWORK_ERROR_MESSAGE.into()));
}

#[tokio::test]
async fn register_sends_json_body() {
    let router = Router::new().route(
        "/api/v1/auth/register",
        post(|axum::Json(body): axum::Json<RegisterRequest>| async move {
            assert_eq!(body.confirm_password, "pw");
            axum::Json(alice())
        }),
    );
    let gateway = HttpAuthGateway::new(&spawn_backend(router).await);

    let request = RegisterRequest {
        username: "alice".into(),
        email: "alice@example.com".into(),
        password: "pw".into(),
        confirm_password: "pw".into(),
    };
    gateway.register(&request).await.unwrap();
}

#[tokio::test]
async fn register_conflict_maps_to_conflict() {
    let router = Router::new().route(
        "/api/v1/auth/register",
        post(|| async { (StatusCode::CONFLICT, axum::Json(json!({ "detail": "exists" }))).into_response() }),
    );
    let gateway = HttpAuthGateway::new(&spawn_backend(router).await);

    let request = RegisterRequest {
        username: "alice".into(),
        email: "alice@example.com".into(),
        password: "pw".into(),
        confirm_password: "pw".into(),
    };
    assert!(matches!(gateway.register(&request).await, Err(AuthError::Conflict(_))));
}

#[tokio::test]
async fn fetch_current_user_sends_bearer() {
    let router = Router::new().route(
        "/api/v1/auth/me",
        get(|headers: HeaderMap| async move {
            if headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer tok") {
                axum::Json(alice()).into_response()
            } else {
                StatusCode::UNAUTHORIZED.into_response()
            }
        }),
    );
    let gateway = HttpAuthGateway::new(&spawn_backend(router).await);

    assert_eq!(gateway.fetch_current_user("tok").await.unwrap().id, 1);
    assert!(matches!(gateway.fetch_current_user("other").await, Err(AuthError::Unauthorized(_))));
}

#[tokio::test]
async fn via_proxy_uses_unversioned_auth_paths() {
    let router = Router::new().route("/api/auth/me", get(|| async { axum::Json(alice()) }));
    let base = spawn_backend(router).await;
    let gateway = HttpAuthGateway::new(&format!("{base}/")).via_proxy();

    assert_eq!(gateway.fetch_current_user("tok").await.unwrap().username, "alice");
}
