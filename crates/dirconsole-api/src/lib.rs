//! REST gateway for the directory admin API.
//!
//! Two pieces, both over `reqwest`:
//!
//! - [`ApiClient`]: every CRUD call goes through it. It attaches the
//!   session's bearer token and hands 401s to the
//!   [`SessionManager`](dirconsole_session::SessionManager), which decides
//!   between a forced logout and asking the console for a new token.
//! - [`HttpAuthBackend`]: the login/logout endpoints, plugged into the
//!   session manager as its [`AuthBackend`](dirconsole_session::AuthBackend).

mod auth;
mod client;
mod error;

pub use auth::HttpAuthBackend;
pub use client::{
    ApiClient, ApiConfig, DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT, normalize_base_url,
};
pub use error::ApiError;
