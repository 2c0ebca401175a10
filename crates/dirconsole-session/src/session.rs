//! Session types: the data structures that represent a signed-in admin.
//!
//! A "session" is this app's record of who is signed in. It tracks:
//! - WHO the admin is ([`Identity`])
//! - HOW they signed in ([`AuthMode`])
//! - WHAT credential to send with API calls (the bearer token)

use std::time::Duration;

use dirconsole_protocol::{ConsolePayload, Identity};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Where a forced logout sends the admin.
    ///
    /// Default: `/login`.
    pub login_path: String,

    /// How long startup waits for the parent console to post a token when
    /// the page is embedded. After that, startup falls back to a regular
    /// session (or none).
    ///
    /// Default: 10 seconds.
    pub embed_token_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            embed_token_timeout: Duration::from_secs(10),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// How the current admin signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMode {
    /// Username/password login. Token kept durably.
    Regular,
    /// Token issued by the embedding admin console. Token kept per tab.
    Console,
}

/// An authenticated admin.
///
/// Console sessions keep the verified [`ConsolePayload`]: its `roles` and
/// `permissions` are what the permission predicates consult.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Regular {
        identity: Identity,
        token: String,
    },
    Console {
        identity: Identity,
        token: String,
        payload: ConsolePayload,
    },
}

impl Session {
    pub fn mode(&self) -> AuthMode {
        match self {
            Self::Regular { .. } => AuthMode::Regular,
            Self::Console { .. } => AuthMode::Console,
        }
    }

    pub fn identity(&self) -> &Identity {
        match self {
            Self::Regular { identity, .. } | Self::Console { identity, .. } => {
                identity
            }
        }
    }

    pub fn token(&self) -> &str {
        match self {
            Self::Regular { token, .. } | Self::Console { token, .. } => token,
        }
    }

    /// The console payload, for console sessions only.
    pub fn payload(&self) -> Option<&ConsolePayload> {
        match self {
            Self::Regular { .. } => None,
            Self::Console { payload, .. } => Some(payload),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where the manager is in its lifecycle.
///
/// ```text
///   Uninitialized ──(start)──→ Restoring ──→ Authenticated(Regular)
///                                  │     ──→ Authenticated(Console)
///                                  └──────→ Unauthenticated
///
///   login:  any ──→ Authenticated(Regular)
///   logout: any ──→ Unauthenticated
/// ```
///
/// Within one page load the manager never goes back to `Restoring`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// `start()` hasn't been called.
    #[default]
    Uninitialized,

    /// Startup is looking for a session to restore.
    Restoring,

    /// An admin is signed in.
    Authenticated(Session),

    /// Nobody is signed in.
    Unauthenticated,
}

impl SessionState {
    /// `true` once startup has finished, whatever the outcome. Screens
    /// must not load data before this.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Authenticated(_) | Self::Unauthenticated)
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn mode(&self) -> Option<AuthMode> {
        self.session().map(Session::mode)
    }
}

// ---------------------------------------------------------------------------
// UnauthorizedOutcome
// ---------------------------------------------------------------------------

/// What [`SessionManager::handle_unauthorized`](crate::SessionManager::handle_unauthorized)
/// did about a 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthorizedOutcome {
    /// The session was cleared and the host sent to the login page.
    LoggedOut,
    /// Console session: left intact, the parent was asked for a fresh
    /// token, and the error goes back to the caller.
    Propagated,
}
