//! Error types for the session layer.

use dirconsole_store::StoreError;

/// Errors returned by [`SessionManager`](crate::SessionManager) operations.
///
/// Startup never returns one of these: restoration failures degrade to
/// [`SessionState::Unauthenticated`](crate::SessionState::Unauthenticated).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Username or password was empty. Rejected before any request.
    #[error("username and password are required")]
    InvalidCredentials,

    /// The login endpoint refused the credentials. Displays the backend's
    /// message unchanged so it can be shown inline.
    #[error("{0}")]
    LoginFailed(String),

    /// Another login call hasn't finished yet.
    #[error("a login is already in progress")]
    LoginInProgress,

    /// The auth backend could not be reached.
    #[error("{0}")]
    NetworkError(String),

    /// The session could not be persisted.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}
