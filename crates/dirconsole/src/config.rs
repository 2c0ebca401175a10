//! Environment-driven configuration.
//!
//! Every layer has its own config struct with sensible defaults.
//! [`ConsoleConfig`] bundles them and knows how to fill them in from the
//! process environment:
//!
//! | variable | effect |
//! |---|---|
//! | `DIRCONSOLE_API_BASE_URL` | API base URL, wins over hostname detection |
//! | `DIRCONSOLE_HOSTNAME` | hostname used to pick the API base URL |
//! | `DIRCONSOLE_CONSOLE_URL` | trusted console URL (origin is what counts) |
//! | `DIRCONSOLE_DEBUG_AUTH` | `true`/`1` turns on handshake debug logging |

use dirconsole_api::ApiConfig;
use dirconsole_bridge::{BridgeConfig, DEFAULT_CONSOLE_URL};
use dirconsole_session::SessionConfig;

use crate::ConsoleError;

pub const ENV_API_BASE_URL: &str = "DIRCONSOLE_API_BASE_URL";
pub const ENV_HOSTNAME: &str = "DIRCONSOLE_HOSTNAME";
pub const ENV_CONSOLE_URL: &str = "DIRCONSOLE_CONSOLE_URL";
pub const ENV_DEBUG_AUTH: &str = "DIRCONSOLE_DEBUG_AUTH";

const LOCAL_API: &str = "http://localhost:8080/api/v2";
const STAGING_API: &str = "https://staging-directories-apis.q84sale.com/api/v2";
const DEV_API: &str = "https://dev-directories-apis.q84sale.com/api/v2";
const PRODUCTION_API: &str = "https://directories-apis.q84sale.com/api/v2";

/// All configuration for one [`AdminConsole`](crate::AdminConsole).
#[derive(Debug, Clone, Default)]
pub struct ConsoleConfig {
    pub api: ApiConfig,
    pub bridge: BridgeConfig,
    pub session: SessionConfig,
    /// Verbose logging of the console handshake.
    pub debug_auth: bool,
}

impl ConsoleConfig {
    /// Reads the `DIRCONSOLE_*` variables.
    ///
    /// # Errors
    /// [`ConsoleError::Config`] if the resolved API base URL isn't an
    /// absolute http(s) URL.
    pub fn from_env() -> Result<Self, ConsoleError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through
    /// `lookup` instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConsoleError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).and_then(non_empty);

        let api_base = match var(ENV_API_BASE_URL) {
            Some(explicit) => explicit,
            None => {
                let hostname = var(ENV_HOSTNAME).unwrap_or_else(|| "localhost".to_string());
                api_base_for_hostname(&hostname).to_string()
            }
        };
        let console_url = var(ENV_CONSOLE_URL).unwrap_or_else(|| DEFAULT_CONSOLE_URL.to_string());
        let debug_auth = var(ENV_DEBUG_AUTH)
            .is_some_and(|flag| flag.eq_ignore_ascii_case("true") || flag == "1");

        let config = Self {
            debug_auth,
            ..Self::default()
        }
        .with_api_base_url(&api_base)?
        .with_console_url(console_url);

        tracing::debug!(
            api_base_url = %config.api.base_url,
            console_url = %config.bridge.console_url,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Points both the API client and token verification at `base_url`.
    ///
    /// # Errors
    /// [`ConsoleError::Config`] unless `base_url` is absolute http(s).
    pub fn with_api_base_url(mut self, base_url: &str) -> Result<Self, ConsoleError> {
        let base_url = normalize_base_url(base_url)?;
        self.api.base_url = base_url.clone();
        self.bridge.api_base_url = base_url;
        Ok(self)
    }

    /// Sets the trusted console URL.
    ///
    /// Never fails: an unusable URL falls back to the default console
    /// when the bridge is built.
    #[must_use]
    pub fn with_console_url(mut self, console_url: impl Into<String>) -> Self {
        self.bridge.console_url = console_url.into();
        self
    }
}

/// Picks the API deployment that serves `hostname`.
///
/// - contains `localhost` or `127.0.0.1` → local backend on port 8080
/// - contains `staging` → staging
/// - contains `dev` or `integration` → development
/// - anything else → production
pub fn api_base_for_hostname(hostname: &str) -> &'static str {
    let hostname = hostname.trim().to_ascii_lowercase();
    if hostname.contains("localhost") || hostname.contains("127.0.0.1") {
        LOCAL_API
    } else if hostname.contains("staging") {
        STAGING_API
    } else if hostname.contains("dev") || hostname.contains("integration") {
        DEV_API
    } else {
        PRODUCTION_API
    }
}

fn normalize_base_url(base_url: &str) -> Result<String, ConsoleError> {
    dirconsole_api::normalize_base_url(base_url).map_err(|e| {
        tracing::error!(base_url = base_url.trim(), error = %e, "invalid api base url");
        ConsoleError::Config(e.to_string())
    })
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    // =====================================================================
    // api_base_for_hostname()
    // =====================================================================

    #[test]
    fn test_api_base_for_hostname_local() {
        assert_eq!(api_base_for_hostname("localhost"), LOCAL_API);
        assert_eq!(api_base_for_hostname("127.0.0.1"), LOCAL_API);
        assert_eq!(api_base_for_hostname("admin.localhost"), LOCAL_API);
        assert_eq!(api_base_for_hostname("localhost.localdomain"), LOCAL_API);
    }

    #[test]
    fn test_api_base_for_hostname_environments() {
        assert_eq!(api_base_for_hostname("admin-staging.example.com"), STAGING_API);
        assert_eq!(api_base_for_hostname("admin.dev.example.com"), DEV_API);
        assert_eq!(api_base_for_hostname("integration-admin.example.com"), DEV_API);
        assert_eq!(api_base_for_hostname("admin.example.com"), PRODUCTION_API);
    }

    // =====================================================================
    // from_lookup()
    // =====================================================================

    #[test]
    fn test_from_lookup_defaults_to_local_backend() {
        let config = ConsoleConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.api.base_url, LOCAL_API);
        assert_eq!(config.bridge.api_base_url, LOCAL_API);
        assert_eq!(config.bridge.console_url, DEFAULT_CONSOLE_URL);
        assert!(!config.debug_auth);
    }

    #[test]
    fn test_from_lookup_explicit_base_wins_over_hostname() {
        let config = ConsoleConfig::from_lookup(lookup(&[
            (ENV_API_BASE_URL, "https://api.internal/api/v2/"),
            (ENV_HOSTNAME, "admin-staging.example.com"),
        ]))
        .unwrap();

        assert_eq!(config.api.base_url, "https://api.internal/api/v2");
        assert_eq!(config.bridge.api_base_url, "https://api.internal/api/v2");
    }

    #[test]
    fn test_from_lookup_hostname_and_console_and_debug() {
        let config = ConsoleConfig::from_lookup(lookup(&[
            (ENV_HOSTNAME, "admin-staging.example.com"),
            (ENV_CONSOLE_URL, "https://console.example.com"),
            (ENV_DEBUG_AUTH, "TRUE"),
        ]))
        .unwrap();

        assert_eq!(config.api.base_url, STAGING_API);
        assert_eq!(config.bridge.console_url, "https://console.example.com");
        assert!(config.debug_auth);
    }

    #[test]
    fn test_from_lookup_blank_values_are_ignored() {
        let config = ConsoleConfig::from_lookup(lookup(&[
            (ENV_API_BASE_URL, "   "),
            (ENV_CONSOLE_URL, ""),
        ]))
        .unwrap();

        assert_eq!(config.api.base_url, LOCAL_API);
        assert_eq!(config.bridge.console_url, DEFAULT_CONSOLE_URL);
    }

    #[test]
    fn test_from_lookup_rejects_non_http_base() {
        let result = ConsoleConfig::from_lookup(lookup(&[(ENV_API_BASE_URL, "ftp://x/y")]));
        assert!(matches!(result, Err(ConsoleError::Config(_))));
    }

    #[test]
    fn test_with_api_base_url_reports_api_validation_message() {
        let err = ConsoleConfig::default().with_api_base_url("not a url").unwrap_err();
        assert_eq!(err.to_string(), "invalid configuration: invalid api base url: not a url");
    }
}
