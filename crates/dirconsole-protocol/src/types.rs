//! Core data types shared by every dirconsole layer.
//!
//! These are the structures the backends and the embedding console send
//! us, plus the identity we keep for the signed-in admin. The serde
//! attributes pin the exact JSON shapes; the tests at the bottom of this
//! file check them, because a mismatch means a stored session (or a
//! backend response) can no longer be read.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The console role name that grants super-admin rights.
///
/// Matching is exact: `"super admin"` or `"SuperAdmin"` do not count.
pub const SUPER_ADMIN_ROLE: &str = "Super Admin";

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Authorization level of an admin inside this console.
///
/// `#[serde(rename_all = "snake_case")]` gives the backend's spelling:
/// `"super_admin"`, `"admin"`, `"moderator"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Moderator,
}

impl Role {
    /// Derives the role of a console-authenticated admin.
    ///
    /// The console only tells us role *names*; the single one this app
    /// understands is [`SUPER_ADMIN_ROLE`]. Everyone else is a plain admin.
    pub fn from_console_roles<S: AsRef<str>>(roles: &[S]) -> Self {
        if roles.iter().any(|role| role.as_ref() == SUPER_ADMIN_ROLE) {
            Self::SuperAdmin
        } else {
            Self::Admin
        }
    }

    /// The snake_case name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::Moderator => "moderator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The signed-in admin as the rest of the console sees it.
///
/// Regular logins receive this straight from the login endpoint. Console
/// logins derive it from a [`ConsolePayload`] via
/// [`ConsolePayload::to_identity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Numeric backend id. Console-derived identities use `0` because the
    /// console only knows string ids.
    pub id: u64,
    pub username: String,
    pub email: String,
    /// The only authorization attribute outside console mode.
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ConsolePayload
// ---------------------------------------------------------------------------

/// The verified claims of a console-issued token.
///
/// Only ever produced by verifying a token (or enriching a verified one);
/// this app never issues payloads itself. Optional strings and lists
/// default to empty so that sparse backend responses still parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolePayload {
    pub admin_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Issue time, seconds since the Unix epoch.
    pub issued_at: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

impl ConsolePayload {
    /// Returns `true` once `exp` lies strictly in the past.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.exp < now.timestamp()
    }

    /// Exact role-name membership.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Exact permission membership. No wildcards, no prefixes.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// `true` if at least one of `permissions` is granted.
    /// An empty list grants nothing.
    pub fn has_any_permission<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        permissions.iter().any(|p| self.has_permission(p.as_ref()))
    }

    /// `true` if every one of `permissions` is granted.
    /// An empty list is trivially satisfied.
    pub fn has_all_permissions<S: AsRef<str>>(
        &self,
        permissions: &[S],
    ) -> bool {
        permissions.iter().all(|p| self.has_permission(p.as_ref()))
    }

    pub fn is_super_admin(&self) -> bool {
        self.has_role(SUPER_ADMIN_ROLE)
    }

    /// Builds the [`Identity`] shown for a console-authenticated admin.
    ///
    /// - `username`: first non-empty of display name, username, admin id
    /// - `email`: the payload's email, else `{admin_id}@console`
    /// - `role`: see [`Role::from_console_roles`]
    /// - `created_at`: `issued_at`; `updated_at`: `now`
    pub fn to_identity(&self, now: DateTime<Utc>) -> Identity {
        let username = [
            self.display_name.as_deref(),
            Some(self.username.as_str()),
            Some(self.admin_id.as_str()),
        ]
        .into_iter()
        .flatten()
        .find(|candidate| !candidate.is_empty())
        .unwrap_or_default()
        .to_string();

        let email = if self.email.is_empty() {
            format!("{}@console", self.admin_id)
        } else {
            self.email.clone()
        };

        Identity {
            id: 0,
            username,
            email,
            role: Role::from_console_roles(&self.roles),
            is_active: true,
            created_at: DateTime::from_timestamp(self.issued_at, 0)
                .unwrap_or(now),
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// FrameMessage: cross-document messages with the parent console
// ---------------------------------------------------------------------------

/// Messages exchanged with the embedding console window.
///
/// `#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]` produces
/// the console's shapes:
///
/// ```text
/// {"type":"AUTH_TOKEN","token":"..."}   console → app
/// {"type":"ADMIN_APP_READY"}            app → console
/// {"type":"REQUEST_TOKEN"}              app → console
/// ```
///
/// Unknown extra fields are ignored; an unknown `type` fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrameMessage {
    /// Console → app: here is a token to verify.
    AuthToken { token: String },
    /// App → console: the listener is attached, send a token.
    AdminAppReady,
    /// App → console: please send a fresh token.
    RequestToken,
}

// ---------------------------------------------------------------------------
// Verification envelopes
// ---------------------------------------------------------------------------

/// Body of `POST /admin/console-auth/verify-token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

/// Extra admin summary some backend versions attach to a verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminInfo {
    pub admin_id: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub is_super_admin: bool,
}

/// Response of the verification endpoint.
///
/// Success: `{"valid": true, "payload": {...}}`.
/// Failure: `{"valid": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ConsolePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_info: Option<AdminInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_message: Option<String>,
}

// ---------------------------------------------------------------------------
// Login envelopes
// ---------------------------------------------------------------------------

/// Body of the login request.
///
/// `Debug` is written by hand so the password never reaches a log line.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful login data: who logged in and the bearer token to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginData {
    pub admin: Identity,
    pub token: String,
    /// Kept as the backend sent it; see [`LoginData::expires_at_utc`].
    pub expires_at: String,
}

impl LoginData {
    /// Parses `expires_at` as RFC 3339, if it is one.
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.expires_at)
            .ok()
            .map(|at| at.with_timezone(&Utc))
    }
}

/// Response of the login endpoint: `{"message": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<LoginData>,
}

// ---------------------------------------------------------------------------
// Error bodies
// ---------------------------------------------------------------------------

/// Pulls a human-readable message out of an error response body.
///
/// Looks for a string `error` field first, then a string `message` field.
/// Anything else (non-JSON, non-string fields, empty strings) yields `None`
/// so the caller can fall back to its own generic text.
#[cfg(feature = "json")]
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .into_iter()
        .filter_map(|key| value.get(key).and_then(|v| v.as_str()))
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(roles: &[&str], permissions: &[&str]) -> ConsolePayload {
        ConsolePayload {
            admin_id: "42".into(),
            username: "jdoe".into(),
            email: "jdoe@example.com".into(),
            display_name: None,
            avatar_url: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            issued_at: 1000,
            exp: 999_999_999_999,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    // =====================================================================
    // Role
    // =====================================================================

    #[test]
    fn test_role_from_console_roles_super_admin_literal() {
        assert_eq!(
            Role::from_console_roles(&["Editor", "Super Admin"]),
            Role::SuperAdmin
        );
    }

    #[test]
    fn test_role_from_console_roles_is_case_sensitive() {
        assert_eq!(Role::from_console_roles(&["super admin"]), Role::Admin);
        assert_eq!(Role::from_console_roles::<&str>(&[]), Role::Admin);
    }

    #[test]
    fn test_role_deserializes_from_snake_case() {
        let role: Role = serde_json::from_str("\"moderator\"").unwrap();
        assert_eq!(role, Role::Moderator);
        assert_eq!(Role::SuperAdmin.to_string(), "super_admin");
    }

    // =====================================================================
    // ConsolePayload
    // =====================================================================

    #[test]
    fn test_payload_sparse_json_fills_defaults() {
        let json = r#"{"admin_id":"7","issued_at":1,"exp":2}"#;
        let p: ConsolePayload = serde_json::from_str(json).unwrap();
        assert!(p.roles.is_empty());
        assert!(p.permissions.is_empty());
        assert_eq!(p.username, "");
        assert_eq!(p.display_name, None);
    }

    #[test]
    fn test_payload_permissions_exact_membership() {
        let p = payload(&[], &["businesses.read", "reviews.*"]);
        assert!(p.has_permission("businesses.read"));
        assert!(!p.has_permission("reviews.delete"), "no wildcard expansion");
        assert!(!p.has_permission("businesses"));
    }

    #[test]
    fn test_payload_any_and_all_permissions() {
        let p = payload(&[], &["a", "b"]);
        assert!(p.has_any_permission(&["x", "b"]));
        assert!(!p.has_any_permission(&["x", "y"]));
        assert!(!p.has_any_permission::<&str>(&[]));
        assert!(p.has_all_permissions(&["a", "b"]));
        assert!(!p.has_all_permissions(&["a", "c"]));
        assert!(p.has_all_permissions::<&str>(&[]));
    }

    #[test]
    fn test_payload_is_expired_compares_against_now() {
        let mut p = payload(&[], &[]);
        p.exp = 500;
        assert!(p.is_expired(at(501)));
        assert!(!p.is_expired(at(500)));
    }

    #[test]
    fn test_to_identity_prefers_display_name() {
        let mut p = payload(&["Super Admin"], &[]);
        p.display_name = Some("Jane Doe".into());
        let identity = p.to_identity(at(2000));

        assert_eq!(identity.id, 0);
        assert_eq!(identity.username, "Jane Doe");
        assert_eq!(identity.role, Role::SuperAdmin);
        assert!(identity.is_active);
        assert_eq!(identity.created_at, at(1000));
        assert_eq!(identity.updated_at, at(2000));
    }

    #[test]
    fn test_to_identity_falls_back_to_admin_id() {
        let mut p = payload(&[], &[]);
        p.username = String::new();
        p.email = String::new();
        p.display_name = Some(String::new());
        let identity = p.to_identity(at(2000));

        assert_eq!(identity.username, "42");
        assert_eq!(identity.email, "42@console");
        assert_eq!(identity.role, Role::Admin);
    }

    // =====================================================================
    // FrameMessage
    // =====================================================================

    #[test]
    fn test_frame_message_auth_token_json_format() {
        let json = serde_json::to_value(FrameMessage::AuthToken {
            token: "abc".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "AUTH_TOKEN");
        assert_eq!(json["token"], "abc");
    }

    #[test]
    fn test_frame_message_outbound_json_format() {
        assert_eq!(
            serde_json::to_string(&FrameMessage::AdminAppReady).unwrap(),
            r#"{"type":"ADMIN_APP_READY"}"#
        );
        assert_eq!(
            serde_json::to_string(&FrameMessage::RequestToken).unwrap(),
            r#"{"type":"REQUEST_TOKEN"}"#
        );
    }

    #[test]
    fn test_frame_message_non_string_token_rejected() {
        let result: Result<FrameMessage, _> =
            serde_json::from_str(r#"{"type":"AUTH_TOKEN","token":42}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_frame_message_unknown_type_rejected() {
        let result: Result<FrameMessage, _> =
            serde_json::from_str(r#"{"type":"LOGOUT"}"#);
        assert!(result.is_err());
    }

    // =====================================================================
    // Envelopes
    // =====================================================================

    #[test]
    fn test_verify_response_failure_shape() {
        let r: VerifyResponse =
            serde_json::from_str(r#"{"valid":false,"error":"expired"}"#)
                .unwrap();
        assert!(!r.valid);
        assert_eq!(r.error.as_deref(), Some("expired"));
        assert!(r.payload.is_none());
    }

    #[test]
    fn test_login_response_parses_backend_shape() {
        let json = r#"{
            "message": "Login successful",
            "data": {
                "admin": {
                    "id": 3, "username": "root", "email": "root@example.com",
                    "role": "super_admin", "is_active": true,
                    "created_at": "2024-01-01T00:00:00Z",
                    "updated_at": "2024-06-01T12:30:00Z"
                },
                "token": "t1",
                "expires_at": "2024-06-02T12:30:00Z"
            }
        }"#;
        let r: LoginResponse = serde_json::from_str(json).unwrap();
        let data = r.data.unwrap();
        assert_eq!(data.admin.role, Role::SuperAdmin);
        assert_eq!(data.token, "t1");
        assert_eq!(
            data.expires_at_utc().map(|t| t.timestamp()),
            Some(1_717_331_400)
        );
    }

    #[test]
    fn test_login_request_debug_redacts_password() {
        let req = LoginRequest {
            username: "root".into(),
            password: "hunter2".into(),
        };
        let printed = format!("{req:?}");
        assert!(printed.contains("root"));
        assert!(!printed.contains("hunter2"));
    }

    // =====================================================================
    // extract_error_message
    // =====================================================================

    #[test]
    fn test_extract_error_message_prefers_error_field() {
        let body = r#"{"error":"Invalid credentials","message":"nope"}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("Invalid credentials")
        );
    }

    #[test]
    fn test_extract_error_message_skips_non_string_error() {
        let body = r#"{"error":{"code":1},"message":"Token expired"}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("Token expired")
        );
    }

    #[test]
    fn test_extract_error_message_non_json_is_none() {
        assert_eq!(extract_error_message("<html>502</html>"), None);
        assert_eq!(extract_error_message(""), None);
    }
}
