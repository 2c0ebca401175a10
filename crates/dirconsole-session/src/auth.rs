//! The regular (username/password) authentication hook.
//!
//! The session layer doesn't know where credentials are checked. It
//! calls an [`AuthBackend`]: the HTTP gateway in production, a stub in
//! tests.

use dirconsole_protocol::LoginData;

use crate::SessionError;

/// Exchanges credentials for a bearer token and tells the server when a
/// session ends.
///
/// # Trait bounds
///
/// - `Send + Sync` → one backend is shared by every clone of the
///   [`SessionManager`](crate::SessionManager) and by the background
///   logout task.
/// - `'static` → it lives as long as the manager.
///
/// # Example
///
/// ```rust
/// use dirconsole_protocol::LoginData;
/// use dirconsole_session::{AuthBackend, SessionError};
///
/// /// Rejects everyone. Handy when only console logins are allowed.
/// struct ConsoleOnly;
///
/// impl AuthBackend for ConsoleOnly {
///     async fn login(
///         &self,
///         _username: &str,
///         _password: &str,
///     ) -> Result<LoginData, SessionError> {
///         Err(SessionError::LoginFailed("Use the admin console".into()))
///     }
///
///     async fn logout(&self, _token: &str) -> Result<(), SessionError> {
///         Ok(())
///     }
/// }
/// ```
pub trait AuthBackend: Send + Sync + 'static {
    /// Validates the credentials.
    ///
    /// # Returns
    /// - `Ok(LoginData)`: the admin and the token to send from now on
    /// - `Err(SessionError::LoginFailed)`: rejected, with the message to show
    /// - `Err(SessionError::NetworkError)`: no answer
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<LoginData, SessionError>> + Send;

    /// Notifies the server that `token` is no longer in use.
    ///
    /// Best-effort: the session is already gone locally when this runs.
    fn logout(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;
}
