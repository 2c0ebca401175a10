//! Integration tests for `ConsoleBridge` against a local mock backend.
//!
//! One axum server plays both the directory backend (verify endpoint) and
//! the console (profile endpoint), so its address doubles as the trusted
//! console origin.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use dirconsole_bridge::{BridgeConfig, BridgeError, ConsoleBridge, ScriptedHost};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use url::Url;

// ---------------------------------------------------------------------------
// Mock backend
// ---------------------------------------------------------------------------

fn payload_json(admin_id: &str) -> Value {
    json!({
        "admin_id": admin_id,
        "username": "jdoe",
        "email": "jdoe@example.com",
        "roles": ["Super Admin"],
        "permissions": ["listings.read"],
        "issued_at": 1_700_000_000,
        "exp": 4_000_000_000i64,
    })
}

async fn verify_token(Json(body): Json<Value>) -> Response {
    let token = body.get("token").and_then(Value::as_str).unwrap_or_default();
    match token {
        "good" | "good-no-profile" => {
            Json(json!({"valid": true, "payload": payload_json("a1")})).into_response()
        }
        "expired" => Json(json!({"valid": false, "error": "Token expired"})).into_response(),
        "bare-invalid" => Json(json!({"valid": false})).into_response(),
        "forbidden" => (
            StatusCode::FORBIDDEN,
            Json(json!({"message": "Console access revoked"})),
        )
            .into_response(),
        "empty" => StatusCode::OK.into_response(),
        "html" => (StatusCode::OK, "<html>oops</html>").into_response(),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
    }
}

async fn profile(headers: HeaderMap) -> Response {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if auth == "Bearer good" {
        Json(json!({
            "id": "a1",
            "username": "jdoe",
            "displayName": "Jane Doe",
            "avatar": "https://cdn.example.com/jane.png",
            "roles": ["Super Admin"],
            "permissions": ["listings.read", "listings.write"],
            "exp": 4_000_000_000i64,
        }))
        .into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

/// Starts the mock on an ephemeral port and returns its base URL.
async fn spawn_backend() -> String {
    let app = Router::new()
        .route("/api/v2/admin/console-auth/verify-token", post(verify_token))
        .route("/api/auth/me", get(profile));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn bridge_for(base: &str, host: Arc<ScriptedHost>) -> ConsoleBridge {
    let config = BridgeConfig {
        api_base_url: format!("{base}/api/v2"),
        console_url: base.to_string(),
        request_timeout: Duration::from_secs(5),
        ..BridgeConfig::default()
    };
    ConsoleBridge::new(config, host).unwrap()
}

fn top_level_host() -> Arc<ScriptedHost> {
    Arc::new(ScriptedHost::new(
        Url::parse("https://admin.example.com/").unwrap(),
    ))
}

// =========================================================================
// verify()
// =========================================================================

#[tokio::test]
async fn test_verify_valid_token_returns_payload() {
    let base = spawn_backend().await;
    let bridge = bridge_for(&base, top_level_host());

    let payload = bridge.verify("good").await.unwrap();
    assert_eq!(payload.admin_id, "a1");
    assert!(payload.is_super_admin());
}

#[tokio::test]
async fn test_verify_invalid_uses_backend_error() {
    let base = spawn_backend().await;
    let bridge = bridge_for(&base, top_level_host());

    assert_eq!(
        bridge.verify("expired").await,
        Err(BridgeError::VerificationFailed("Token expired".into()))
    );
}

#[tokio::test]
async fn test_verify_invalid_without_error_says_invalid_token() {
    let base = spawn_backend().await;
    let bridge = bridge_for(&base, top_level_host());

    assert_eq!(
        bridge.verify("bare-invalid").await,
        Err(BridgeError::VerificationFailed("Invalid token".into()))
    );
}

#[tokio::test]
async fn test_verify_non_success_prefers_body_message() {
    let base = spawn_backend().await;
    let bridge = bridge_for(&base, top_level_host());

    let err = bridge.verify("forbidden").await.unwrap_err();
    assert_eq!(err.to_string(), "Console access revoked");
}

#[tokio::test]
async fn test_verify_non_success_without_body_reports_status() {
    let base = spawn_backend().await;
    let bridge = bridge_for(&base, top_level_host());

    let err = bridge.verify("anything-else").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Backend token verification failed with status 500"
    );
}

#[tokio::test]
async fn test_verify_empty_body_is_rejected() {
    let base = spawn_backend().await;
    let bridge = bridge_for(&base, top_level_host());

    let err = bridge.verify("empty").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Empty response from backend during token verification"
    );
}

#[tokio::test]
async fn test_verify_non_json_body_is_rejected() {
    let base = spawn_backend().await;
    let bridge = bridge_for(&base, top_level_host());

    let err = bridge.verify("html").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid JSON response from backend during token verification"
    );
}

#[tokio::test]
async fn test_verify_unreachable_backend_is_network_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let bridge = bridge_for(&format!("http://{addr}"), top_level_host());
    assert_eq!(
        bridge.verify("good").await,
        Err(BridgeError::NetworkError(
            "Failed to verify token with backend".into()
        ))
    );
}

// =========================================================================
// fetch_profile() / authenticate()
// =========================================================================

#[tokio::test]
async fn test_authenticate_prefers_console_profile() {
    let base = spawn_backend().await;
    let bridge = bridge_for(&base, top_level_host());

    let payload = bridge.authenticate("good").await.unwrap();
    assert_eq!(payload.display_name.as_deref(), Some("Jane Doe"));
    assert_eq!(
        payload.avatar_url.as_deref(),
        Some("https://cdn.example.com/jane.png")
    );
    assert!(payload.has_permission("listings.write"));
}

#[tokio::test]
async fn test_authenticate_falls_back_to_verified_payload() {
    let base = spawn_backend().await;
    let bridge = bridge_for(&base, top_level_host());

    assert!(bridge.fetch_profile("good-no-profile").await.is_none());

    let payload = bridge.authenticate("good-no-profile").await.unwrap();
    assert_eq!(payload.display_name, None);
    assert!(!payload.has_permission("listings.write"));
}

#[tokio::test]
async fn test_authenticate_verification_failure_skips_profile() {
    let base = spawn_backend().await;
    let bridge = bridge_for(&base, top_level_host());

    assert!(matches!(
        bridge.authenticate("expired").await,
        Err(BridgeError::VerificationFailed(_))
    ));
}

// =========================================================================
// listen_for_token()
// =========================================================================

#[tokio::test]
async fn test_listen_for_token_accepts_only_trusted_origin() {
    let host = Arc::new(
        ScriptedHost::new(Url::parse("https://admin.example.com/").unwrap())
            .embedded(),
    );
    let bridge = bridge_for("https://console.example.com", host.clone());

    let (tx, mut rx) = mpsc::unbounded_channel();
    assert!(bridge.listen_for_token(move |token| {
        let _ = tx.send(token);
    }));

    host.deliver(
        "https://evil.example.com",
        r#"{"type":"AUTH_TOKEN","token":"stolen"}"#,
    );
    host.deliver("https://console.example.com", r#"{"type":"REQUEST_TOKEN"}"#);
    host.deliver(
        "https://console.example.com",
        r#"{"type":"AUTH_TOKEN","token":"t1"}"#,
    );

    let token = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("token should arrive")
        .expect("listener alive");
    assert_eq!(token, "t1");
    assert!(rx.try_recv().is_err(), "nothing else accepted");
}

#[tokio::test]
async fn test_listen_for_token_attaches_once() {
    let host = Arc::new(
        ScriptedHost::new(Url::parse("https://admin.example.com/").unwrap())
            .embedded(),
    );
    let bridge = bridge_for("https://console.example.com", host.clone());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let first_tx = tx.clone();
    assert!(bridge.listen_for_token(move |t| {
        let _ = first_tx.send(("first", t));
    }));
    assert!(!bridge.listen_for_token(move |t| {
        let _ = tx.send(("second", t));
    }));

    host.deliver(
        "https://console.example.com",
        r#"{"type":"AUTH_TOKEN","token":"t2"}"#,
    );

    let (which, token) = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!((which, token.as_str()), ("first", "t2"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err(), "exactly one callback per message");
}
