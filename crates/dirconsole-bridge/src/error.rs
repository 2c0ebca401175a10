/// Errors that can occur while establishing trust with the console.
///
/// `VerificationFailed` and `NetworkError` display their message
/// unchanged, so it can be shown to an admin as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// The backend rejected the token, or answered with something that
    /// isn't a verification result.
    #[error("{0}")]
    VerificationFailed(String),

    /// The console's profile endpoint failed. Never fatal: callers fall
    /// back to the verified payload.
    #[error("profile fetch failed: {0}")]
    ProfileFetchFailed(String),

    /// The request never produced a response.
    #[error("{0}")]
    NetworkError(String),

    /// The HTTP client could not be constructed.
    #[error("http client setup failed: {0}")]
    ClientSetup(String),
}
