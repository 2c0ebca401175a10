//! End-to-end tests for the assembled `AdminConsole`.
//!
//! A mock directory API serves login/logout, token verification and one
//! protected resource. Durable storage is a real file, so "reloading the
//! page" means building a second console over the same file.

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dirconsole::prelude::*;
use serde_json::{Value, json};
use tokio::net::TcpListener;

// ---------------------------------------------------------------------------
// Mock directory API
// ---------------------------------------------------------------------------

async fn login(Json(body): Json<Value>) -> Response {
    if body["username"] != "admin" || body["password"] != "secret" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid credentials"})),
        )
            .into_response();
    }
    Json(json!({
        "message": "Login successful",
        "data": {
            "admin": {
                "id": 1,
                "username": "admin",
                "email": "admin@example.com",
                "role": "super_admin",
                "is_active": true,
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z",
            },
            "token": "t-login",
            "expires_at": "2030-01-01T00:00:00Z",
        }
    }))
    .into_response()
}

async fn logout() -> StatusCode {
    StatusCode::OK
}

async fn verify_token(Json(body): Json<Value>) -> Json<Value> {
    if body["token"] == "console-ok" {
        Json(json!({"valid": true, "payload": {
            "admin_id": "42",
            "display_name": "Console Admin",
            "roles": ["Editor"],
            "permissions": ["businesses.read"],
            "issued_at": 1000,
            "exp": 999_999_999_999i64,
        }}))
    } else {
        Json(json!({"valid": false}))
    }
}

async fn businesses(headers: HeaderMap) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer t-login" || v == "Bearer console-ok");
    if authorized {
        Json(json!([{"id": 1, "name": "Cafe"}])).into_response()
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

async fn spawn_backend() -> String {
    let app = Router::new()
        .route("/api/v2/admin/auth/login", post(login))
        .route("/api/v2/admin/auth/logout", post(logout))
        .route("/api/v2/admin/console-auth/verify-token", post(verify_token))
        .route("/api/v2/businesses", get(businesses));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config_for(base: &str) -> ConsoleConfig {
    ConsoleConfig::default()
        .with_api_base_url(&format!("{base}/api/v2"))
        .unwrap()
        .with_console_url(base)
}

fn durable_file(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dirconsole-it-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir.join("session.json")
}

fn console_over(base: &str, path: &PathBuf) -> AdminConsole {
    AdminConsole::builder()
        .config(config_for(base))
        .durable_storage(Arc::new(FileStorage::open(path).unwrap()))
        .build()
        .unwrap()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_regular_session_survives_reload_until_logout() {
    let base = spawn_backend().await;
    let path = durable_file("reload");

    let first = console_over(&base, &path);
    assert_eq!(first.start().await, SessionState::Unauthenticated);
    first.session().login("admin", "secret").await.unwrap();
    let listed: Value = first.api().get("/businesses").await.unwrap();
    assert_eq!(listed[0]["name"], "Cafe");

    let reloaded = console_over(&base, &path);
    let state = reloaded.start().await;
    assert_eq!(state.mode(), Some(AuthMode::Regular));
    assert!(reloaded.session().is_super_admin());

    reloaded.session().logout();

    let after_logout = console_over(&base, &path);
    assert_eq!(after_logout.start().await, SessionState::Unauthenticated);
}

#[tokio::test]
async fn test_console_token_in_address_authenticates() {
    let base = spawn_backend().await;
    let host = Arc::new(ScriptedHost::new(
        "https://admin.example.com/businesses?admin_token=console-ok&page=2"
            .parse()
            .unwrap(),
    ));

    let console = AdminConsole::builder()
        .config(config_for(&base))
        .host(host.clone())
        .build()
        .unwrap();
    let state = console.start().await;

    assert_eq!(state.mode(), Some(AuthMode::Console));
    assert_eq!(
        console.session().identity().map(|i| i.username),
        Some("Console Admin".to_string())
    );
    assert!(console.session().has_permission("businesses.read"));
    assert!(!console.session().has_permission("businesses.delete"));
    assert_eq!(host.location().as_str(), "https://admin.example.com/businesses?page=2");

    let listed: Value = console.api().get("/businesses").await.unwrap();
    assert_eq!(listed[0]["id"], 1);
}

#[tokio::test]
async fn test_errors_convert_into_console_error() {
    let base = spawn_backend().await;
    let console = AdminConsole::builder().config(config_for(&base)).build().unwrap();
    console.start().await;

    let login: Result<_, ConsoleError> = console
        .session()
        .login("admin", "wrong")
        .await
        .map_err(Into::into);
    let err = login.unwrap_err();
    assert!(matches!(err, ConsoleError::Session(_)));
    assert_eq!(err.to_string(), "Invalid credentials");

    let listed: Result<Value, ConsoleError> =
        console.api().get("/businesses").await.map_err(Into::into);
    assert!(matches!(listed, Err(ConsoleError::Api(ApiError::Unauthorized))));
}

#[test]
fn test_builder_rejects_invalid_api_base() {
    let mut config = ConsoleConfig::default();
    config.api.base_url = "not a url".into();

    assert!(matches!(
        AdminConsole::builder().config(config).build(),
        Err(ConsoleError::Api(_))
    ));
}
