//! The console bridge: obtaining a verified identity from the embedding
//! admin console.
//!
//! A token reaches us one of two ways:
//!
//! ```text
//! 1. URL parameter   /?admin_token=abc        (console opened us in a tab)
//! 2. window message  {type:"AUTH_TOKEN",...}  (console embeds us in a frame)
//! ```
//!
//! Either way the raw token is worthless until the backend verifies it.
//! The bridge never decodes a token itself and never trusts a message
//! whose origin isn't exactly the configured console origin.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use dirconsole_protocol::{
    Codec, ConsolePayload, FrameMessage, JsonCodec, VerifyRequest,
    VerifyResponse, extract_error_message,
};
use serde::Deserialize;
use url::Url;

use crate::{BridgeError, Host, WindowMessage};

/// Console used when none (or an unparsable one) is configured.
pub const DEFAULT_CONSOLE_URL: &str = "https://admin-console.q84sale.com";

/// Profiles without an `exp` are trusted for this long.
const DEFAULT_PROFILE_TTL_SECS: i64 = 24 * 60 * 60;

// ---------------------------------------------------------------------------
// BridgeConfig
// ---------------------------------------------------------------------------

/// Where the bridge finds the backend and the console.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Base of the directory REST API, e.g. `http://localhost:8080/api/v2`.
    pub api_base_url: String,
    /// The console's URL. Only its origin is used.
    pub console_url: String,
    /// Query parameter carrying a console token.
    pub token_param: String,
    /// Verification endpoint, relative to `api_base_url`.
    pub verify_path: String,
    /// Profile endpoint, relative to the console origin.
    pub profile_path: String,
    /// Per-request timeout for verify/profile calls.
    pub request_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api/v2".to_string(),
            console_url: DEFAULT_CONSOLE_URL.to_string(),
            token_param: "admin_token".to_string(),
            verify_path: "/admin/console-auth/verify-token".to_string(),
            profile_path: "/api/auth/me".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

// ---------------------------------------------------------------------------
// ConsoleBridge
// ---------------------------------------------------------------------------

/// Handshake with the trusted console plus backend verification.
///
/// One bridge per page. It is shared (`Arc`) between the session manager
/// and the message listener task.
pub struct ConsoleBridge {
    host: Arc<dyn Host>,
    http: reqwest::Client,
    api_base_url: String,
    console_origin: String,
    token_param: String,
    verify_path: String,
    profile_path: String,
    /// Set by the first [`listen_for_token`](Self::listen_for_token) call.
    listener_attached: AtomicBool,
    codec: JsonCodec,
}

impl std::fmt::Debug for ConsoleBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleBridge")
            .field("api_base_url", &self.api_base_url)
            .field("console_origin", &self.console_origin)
            .field("token_param", &self.token_param)
            .finish_non_exhaustive()
    }
}

impl ConsoleBridge {
    /// Creates a bridge for `host`.
    ///
    /// # Errors
    /// Returns [`BridgeError::ClientSetup`] if the HTTP client can't be
    /// built (for example no TLS backend is available).
    pub fn new(
        config: BridgeConfig,
        host: Arc<dyn Host>,
    ) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BridgeError::ClientSetup(e.to_string()))?;

        Ok(Self {
            host,
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            console_origin: normalize_origin(&config.console_url),
            token_param: config.token_param,
            verify_path: config.verify_path,
            profile_path: config.profile_path,
            listener_attached: AtomicBool::new(false),
            codec: JsonCodec,
        })
    }

    /// The trusted console origin (`scheme://host[:port]`).
    pub fn origin(&self) -> &str {
        &self.console_origin
    }

    /// The page this bridge runs in.
    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    // -- Trigger detection ------------------------------------------------

    /// `true` if the address carries a console token or the page is
    /// embedded in a parent frame.
    pub fn should_attempt_console_auth(&self) -> bool {
        let has_param = self
            .host
            .location()
            .query_pairs()
            .any(|(key, _)| key == self.token_param.as_str());
        has_param || self.host.is_embedded()
    }

    // -- URL token --------------------------------------------------------

    /// Takes the console token out of the address bar.
    ///
    /// The parameter is removed via history replacement while every other
    /// parameter and the fragment are kept, so the token never survives
    /// in back/forward history. An empty value is stripped too but
    /// reported as no token.
    pub fn extract_token_from_url(&self) -> Option<String> {
        let mut url = self.host.location();

        let mut token: Option<String> = None;
        let mut found = false;
        let remaining: Vec<(String, String)> = url
            .query_pairs()
            .filter_map(|(key, value)| {
                if key == self.token_param.as_str() {
                    found = true;
                    if token.is_none() {
                        token = Some(value.into_owned());
                    }
                    None
                } else {
                    Some((key.into_owned(), value.into_owned()))
                }
            })
            .collect();

        if !found {
            return None;
        }

        if remaining.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(remaining.iter());
        }
        self.host.replace_location(&relative_location(&url));
        tracing::debug!("console token removed from address");

        token.filter(|t| !t.is_empty())
    }

    // -- Verification -----------------------------------------------------

    /// Verifies `token` with the backend.
    ///
    /// Never panics and never retries. Every failure comes back as a
    /// [`BridgeError`] carrying a message fit for display: the backend's
    /// own `error`/`message` text when it sent one, otherwise a generic
    /// description.
    pub async fn verify(
        &self,
        token: &str,
    ) -> Result<ConsolePayload, BridgeError> {
        let url = format!("{}{}", self.api_base_url, self.verify_path);
        let request = VerifyRequest {
            token: token.to_string(),
        };

        let response = match self.http.post(&url).json(&request).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(error = %e, "token verification request failed");
                return Err(BridgeError::NetworkError(
                    "Failed to verify token with backend".into(),
                ));
            }
        };

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            tracing::debug!(error = %e, "token verification body unreadable");
            BridgeError::NetworkError("Failed to verify token with backend".into())
        })?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "token verification rejected");
            let message = extract_error_message(&body).unwrap_or_else(|| {
                format!(
                    "Backend token verification failed with status {}",
                    status.as_u16()
                )
            });
            return Err(BridgeError::VerificationFailed(message));
        }

        if body.is_empty() {
            return Err(BridgeError::VerificationFailed(
                "Empty response from backend during token verification".into(),
            ));
        }

        let verdict: VerifyResponse = self.codec.decode(&body).map_err(|e| {
            tracing::debug!(error = %e, "token verification body is not a verdict");
            BridgeError::VerificationFailed(
                "Invalid JSON response from backend during token verification"
                    .into(),
            )
        })?;

        match verdict {
            VerifyResponse {
                valid: true,
                payload: Some(payload),
                ..
            } => {
                tracing::debug!(admin_id = %payload.admin_id, "console token verified");
                Ok(payload)
            }
            VerifyResponse { error, .. } => Err(BridgeError::VerificationFailed(
                error.unwrap_or_else(|| "Invalid token".into()),
            )),
        }
    }

    /// Best-effort profile enrichment from the console's `/me` endpoint.
    ///
    /// Any failure is logged and returns `None`; the caller keeps using
    /// the verified payload.
    pub async fn fetch_profile(&self, token: &str) -> Option<ConsolePayload> {
        match self.try_fetch_profile(token).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::debug!(error = %e, "using verified payload without profile");
                None
            }
        }
    }

    /// Verifies `token`, then enriches it with the console profile.
    ///
    /// Returns the profile when the console provides one, otherwise the
    /// verified payload. Only verification failures are errors.
    pub async fn authenticate(
        &self,
        token: &str,
    ) -> Result<ConsolePayload, BridgeError> {
        let verified = self.verify(token).await?;
        Ok(self.fetch_profile(token).await.unwrap_or(verified))
    }

    async fn try_fetch_profile(
        &self,
        token: &str,
    ) -> Result<ConsolePayload, BridgeError> {
        let url = format!("{}{}", self.console_origin, self.profile_path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| BridgeError::ProfileFetchFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::ProfileFetchFailed(format!(
                "status {}",
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| BridgeError::ProfileFetchFailed(e.to_string()))?;
        let profile: ConsoleProfile = self
            .codec
            .decode(&body)
            .map_err(|e| BridgeError::ProfileFetchFailed(e.to_string()))?;

        profile.into_payload(Utc::now().timestamp()).ok_or_else(|| {
            BridgeError::ProfileFetchFailed("profile has no admin id".into())
        })
    }

    // -- Window messages --------------------------------------------------

    /// Starts listening for tokens posted by the console.
    ///
    /// Only messages from the exact console origin whose data is
    /// `{type:"AUTH_TOKEN", token:<non-empty string>}` reach `on_token`;
    /// everything else is dropped. The listener lives until the host
    /// closes its message stream.
    ///
    /// Attaches at most once per bridge: later calls register nothing and
    /// return `false`. Must be called inside a Tokio runtime.
    pub fn listen_for_token<F>(&self, on_token: F) -> bool
    where
        F: Fn(String) + Send + 'static,
    {
        if self.listener_attached.swap(true, Ordering::SeqCst) {
            tracing::debug!("message listener already attached");
            return false;
        }

        let Some(mut messages) = self.host.take_messages() else {
            tracing::warn!("host offers no message stream, console messages unavailable");
            return false;
        };

        let origin = self.console_origin.clone();
        let codec = self.codec;
        tokio::spawn(async move {
            while let Some(message) = messages.recv().await {
                if let Some(token) = accept_token_message(&origin, &codec, &message)
                {
                    tracing::debug!("console token received via message");
                    on_token(token);
                }
            }
            tracing::debug!("message stream closed");
        });

        tracing::debug!("message listener attached");
        true
    }

    /// Tells the parent console the app is ready for a token.
    ///
    /// Returns `false` (and sends nothing) when the page isn't embedded.
    pub fn signal_ready(&self) -> bool {
        self.post_to_console(&FrameMessage::AdminAppReady)
    }

    /// Asks the parent console for a fresh token.
    ///
    /// Returns `false` (and sends nothing) when the page isn't embedded.
    pub fn request_token(&self) -> bool {
        self.post_to_console(&FrameMessage::RequestToken)
    }

    fn post_to_console(&self, message: &FrameMessage) -> bool {
        if !self.host.is_embedded() {
            return false;
        }
        match self.codec.encode(message) {
            Ok(text) => {
                // Targeted at the console origin only, never "*".
                self.host.post_to_parent(&text, &self.console_origin);
                tracing::debug!(?message, "posted to console");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to encode console message");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reduces a configured console URL to its origin.
///
/// Paths and trailing slashes in the configuration would otherwise break
/// the exact origin comparison. Unparsable or opaque URLs fall back to
/// [`DEFAULT_CONSOLE_URL`].
pub fn normalize_origin(console_url: &str) -> String {
    match Url::parse(console_url.trim()) {
        Ok(url) if url.origin().is_tuple() => url.origin().ascii_serialization(),
        _ => {
            tracing::error!(console_url, "invalid console URL, using default");
            DEFAULT_CONSOLE_URL.to_string()
        }
    }
}

/// `path[?query][#fragment]` of `url`.
fn relative_location(url: &Url) -> String {
    let mut relative = url.path().to_string();
    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        relative.push('?');
        relative.push_str(query);
    }
    if let Some(fragment) = url.fragment().filter(|f| !f.is_empty()) {
        relative.push('#');
        relative.push_str(fragment);
    }
    relative
}

/// Applies the trust rules to one inbound message.
fn accept_token_message(
    trusted_origin: &str,
    codec: &JsonCodec,
    message: &WindowMessage,
) -> Option<String> {
    if message.origin != trusted_origin {
        tracing::debug!(origin = %message.origin, "ignoring message from untrusted origin");
        return None;
    }
    match codec.decode::<FrameMessage>(&message.data) {
        Ok(FrameMessage::AuthToken { token }) if !token.is_empty() => Some(token),
        Ok(other) => {
            tracing::debug!(?other, "ignoring console message");
            None
        }
        Err(_) => {
            tracing::debug!("ignoring malformed console message");
            None
        }
    }
}

/// The console `/me` response, with the field spellings seen in the wild.
#[derive(Debug, Default, Deserialize)]
struct ConsoleProfile {
    #[serde(default)]
    admin_id: Option<serde_json::Value>,
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default, rename = "displayName")]
    display_name_camel: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
    #[serde(default)]
    roles: Option<Vec<String>>,
    #[serde(default)]
    permissions: Option<Vec<String>>,
    #[serde(default)]
    exp: Option<i64>,
}

impl ConsoleProfile {
    /// Normalizes into the canonical payload. `None` without an admin id.
    fn into_payload(self, now: i64) -> Option<ConsolePayload> {
        let admin_id = [self.admin_id, self.id]
            .into_iter()
            .flatten()
            .find_map(|value| match value {
                serde_json::Value::String(s) if !s.is_empty() => Some(s),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })?;

        Some(ConsolePayload {
            admin_id,
            username: self.username.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            display_name: first_non_empty(self.display_name_camel, self.display_name),
            avatar_url: first_non_empty(self.avatar, self.avatar_url),
            roles: self.roles.unwrap_or_default(),
            permissions: self.permissions.unwrap_or_default(),
            issued_at: now,
            exp: self
                .exp
                .filter(|exp| *exp != 0)
                .unwrap_or(now + DEFAULT_PROFILE_TTL_SECS),
        })
    }
}

fn first_non_empty(a: Option<String>, b: Option<String>) -> Option<String> {
    a.filter(|s| !s.is_empty()).or(b.filter(|s| !s.is_empty()))
}

// =========================================================================
// Tests
// =========================================================================
