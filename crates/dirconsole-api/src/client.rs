//! The authenticated API client.

use std::time::Duration;

use dirconsole_protocol::extract_error_message;
use dirconsole_session::{AuthBackend, SessionManager};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::ApiError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/v2";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the directory API lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base for every request path, e.g. `https://host/api/v2`.
    pub base_url: String,
    pub timeout: Duration,
    /// Login endpoint, relative to `base_url`.
    pub login_path: String,
    /// Logout endpoint, relative to `base_url`.
    pub logout_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            login_path: "/admin/auth/login".to_string(),
            logout_path: "/admin/auth/logout".to_string(),
        }
    }
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

/// JSON client for the directory API, bound to a session.
///
/// Every request carries `Authorization: Bearer <token>` while the session
/// has a token. Response bodies are decoded into the caller's type; the
/// client doesn't interpret them further.
pub struct ApiClient<B> {
    base_url: String,
    http: reqwest::Client,
    session: SessionManager<B>,
}

impl<B> Clone for ApiClient<B> {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            http: self.http.clone(),
            session: self.session.clone(),
        }
    }
}

impl<B> std::fmt::Debug for ApiClient<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl<B: AuthBackend> ApiClient<B> {
    /// # Errors
    /// [`ApiError::BaseUrlMissing`] / [`ApiError::InvalidBaseUrl`] for a
    /// bad `base_url`, [`ApiError::ClientSetup`] if reqwest can't start.
    pub fn new(config: &ApiConfig, session: SessionManager<B>) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(&config.base_url)?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::ClientSetup(e.to_string()))?;
        Ok(Self {
            base_url,
            http,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionManager<B> {
        &self.session
    }

    /// Absolute URL for `path`. `None` for an empty path.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }

    // -- Verbs ------------------------------------------------------------

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send::<(), T>(Method::GET, path, None).await
    }

    pub async fn post<Req, T>(&self, path: &str, body: &Req) -> Result<T, ApiError>
    where
        Req: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn put<Req, T>(&self, path: &str, body: &Req) -> Result<T, ApiError>
    where
        Req: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::PUT, path, Some(body)).await
    }

    pub async fn patch<Req, T>(&self, path: &str, body: &Req) -> Result<T, ApiError>
    where
        Req: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send::<(), T>(Method::DELETE, path, None).await
    }

    // -- Internals --------------------------------------------------------

    async fn send<Req, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Req>,
    ) -> Result<T, ApiError>
    where
        Req: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path).ok_or(ApiError::InvalidPath)?;

        let mut request = self.http.request(method.clone(), url.as_str());
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::debug!(%method, path, error = %e, "request failed");
            ApiError::Network(e.to_string())
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let outcome = self.session.handle_unauthorized();
            tracing::debug!(%method, path, ?outcome, "request unauthorized");
            return Err(ApiError::Unauthorized);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(http_error(status, &bytes));
        }

        // An empty 2xx body (204, bare 200) decodes like JSON `null`, so
        // `()`, `Option<_>` and `serde_json::Value` all accept it.
        let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &bytes
        };
        serde_json::from_slice(bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn http_error(status: StatusCode, body: &[u8]) -> ApiError {
    let text = String::from_utf8_lossy(body);
    let message = extract_error_message(&text).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    });
    ApiError::Http {
        status: status.as_u16(),
        message,
    }
}

/// Trims the base URL and drops trailing slashes; only absolute http(s)
/// URLs are accepted.
pub fn normalize_base_url(base_url: &str) -> Result<String, ApiError> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BaseUrlMissing);
    }
    match url::Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            Ok(trimmed.trim_end_matches('/').to_string())
        }
        _ => Err(ApiError::InvalidBaseUrl(trimmed.to_string())),
    }
}
