//! Username/password authentication over the admin API.

use dirconsole_protocol::{
    Codec, JsonCodec, LoginData, LoginRequest, LoginResponse, extract_error_message,
};
use dirconsole_session::{AuthBackend, SessionError};

use crate::ApiError;
use crate::client::{ApiConfig, normalize_base_url};

const LOGIN_FAILED: &str = "Login failed";

/// [`AuthBackend`] for the directory API's `/admin/auth/*` endpoints.
///
/// Independent of [`ApiClient`](crate::ApiClient): login has no token to
/// attach yet, and a failed login must never trigger the 401 handling.
#[derive(Debug, Clone)]
pub struct HttpAuthBackend {
    http: reqwest::Client,
    login_url: String,
    logout_url: String,
    codec: JsonCodec,
}

impl HttpAuthBackend {
    /// # Errors
    /// Same as [`ApiClient::new`](crate::ApiClient::new).
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(&config.base_url)?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::ClientSetup(e.to_string()))?;
        Ok(Self {
            http,
            login_url: join(&base_url, &config.login_path),
            logout_url: join(&base_url, &config.logout_path),
            codec: JsonCodec,
        })
    }
}

impl AuthBackend for HttpAuthBackend {
    async fn login(&self, username: &str, password: &str) -> Result<LoginData, SessionError> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let response = self
            .http
            .post(&self.login_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SessionError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SessionError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "login rejected");
            return Err(SessionError::LoginFailed(
                extract_error_message(&body).unwrap_or_else(|| LOGIN_FAILED.to_string()),
            ));
        }

        let parsed: LoginResponse = self.codec.decode(&body).map_err(|e| {
            tracing::debug!(error = %e, "login response is not a login envelope");
            SessionError::LoginFailed(LOGIN_FAILED.to_string())
        })?;

        match parsed {
            LoginResponse {
                data: Some(data), ..
            } => Ok(data),
            LoginResponse { message, .. } => Err(SessionError::LoginFailed(
                message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| LOGIN_FAILED.to_string()),
            )),
        }
    }

    async fn logout(&self, token: &str) -> Result<(), SessionError> {
        let response = self
            .http
            .post(&self.logout_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SessionError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SessionError::NetworkError(format!(
                "logout returned status {}",
                status.as_u16()
            )))
        }
    }
}

fn join(base_url: &str, path: &str) -> String {
    let path = path.trim();
    if path.starts_with('/') {
        format!("{base_url}{path}")
    } else {
        format!("{base_url}/{path}")
    }
}
