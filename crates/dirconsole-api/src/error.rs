//! Error types for the API gateway.

/// Errors returned by [`ApiClient`](crate::ApiClient) calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The configured base URL is empty.
    #[error("api base url is missing")]
    BaseUrlMissing,

    /// The configured base URL is not an absolute http(s) URL.
    #[error("invalid api base url: {0}")]
    InvalidBaseUrl(String),

    /// The request path was empty.
    #[error("invalid request path")]
    InvalidPath,

    /// The server answered 401. The session has already reacted (logout
    /// in regular mode, token request in console mode).
    #[error("Unauthorized")]
    Unauthorized,

    /// Any other non-2xx answer. `message` is the body's `error` or
    /// `message` field when present.
    #[error("request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// A 2xx body that isn't the expected JSON.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// The HTTP client could not be constructed.
    #[error("http client setup failed: {0}")]
    ClientSetup(String),
}
