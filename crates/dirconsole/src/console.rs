//! `AdminConsole` builder: wires every layer together.
//!
//! ```text
//! Host + storages ─→ TokenStore ─┐
//!                  ConsoleBridge ─┼─→ SessionManager ─→ ApiClient
//!               HttpAuthBackend ─┘
//! ```

use std::sync::Arc;

use dirconsole_api::{ApiClient, HttpAuthBackend};
use dirconsole_bridge::{ConsoleBridge, Host, ScriptedHost};
use dirconsole_session::{AuthBackend, SessionManager, SessionState};
use dirconsole_store::{KeyValueStore, MemoryStorage, TokenStore};
use url::Url;

use crate::{ConsoleConfig, ConsoleError};

/// Where a headless console "is" when no host is supplied.
pub const DEFAULT_HOST_LOCATION: &str = "http://localhost/";

/// The assembled authentication core for one page.
///
/// Await [`start`](Self::start) before loading any data: until it
/// returns, nobody knows whether a session exists.
pub struct AdminConsole<B = HttpAuthBackend> {
    session: SessionManager<B>,
    api: ApiClient<B>,
    bridge: Arc<ConsoleBridge>,
    store: TokenStore,
}

impl<B> std::fmt::Debug for AdminConsole<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConsole")
            .field("bridge", &self.bridge)
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}

impl AdminConsole {
    pub fn builder() -> AdminConsoleBuilder {
        AdminConsoleBuilder::new()
    }
}

impl<B: AuthBackend> AdminConsole<B> {
    /// Restores the session; see
    /// [`SessionManager::start`](dirconsole_session::SessionManager::start).
    pub async fn start(&self) -> SessionState {
        self.session.start().await
    }

    pub fn session(&self) -> &SessionManager<B> {
        &self.session
    }

    pub fn api(&self) -> &ApiClient<B> {
        &self.api
    }

    pub fn bridge(&self) -> &Arc<ConsoleBridge> {
        &self.bridge
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for an [`AdminConsole`].
///
/// Anything not set gets a headless default: a [`ScriptedHost`] at
/// [`DEFAULT_HOST_LOCATION`] and in-memory storage for both scopes.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use dirconsole::prelude::*;
///
/// # async fn run() -> Result<(), ConsoleError> {
/// let console = AdminConsole::builder()
///     .config(ConsoleConfig::from_env()?)
///     .durable_storage(Arc::new(FileStorage::open("session.json")?))
///     .build()?;
///
/// match console.start().await {
///     SessionState::Authenticated(session) => println!("hello {}", session.identity().username),
///     _ => println!("please log in"),
/// }
/// # Ok(())
/// # }
/// ```
pub struct AdminConsoleBuilder {
    config: ConsoleConfig,
    host: Option<Arc<dyn Host>>,
    session_storage: Option<Arc<dyn KeyValueStore>>,
    durable_storage: Option<Arc<dyn KeyValueStore>>,
}

impl Default for AdminConsoleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AdminConsoleBuilder {
    /// Creates a builder with [`ConsoleConfig::default`].
    pub fn new() -> Self {
        Self {
            config: ConsoleConfig::default(),
            host: None,
            session_storage: None,
            durable_storage: None,
        }
    }

    pub fn config(mut self, config: ConsoleConfig) -> Self {
        self.config = config;
        self
    }

    /// The page environment (address, embedding, parent messaging).
    pub fn host(mut self, host: Arc<dyn Host>) -> Self {
        self.host = Some(host);
        self
    }

    /// Tab-scoped storage, holding console sessions.
    pub fn session_storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.session_storage = Some(storage);
        self
    }

    /// Durable storage, holding regular sessions.
    pub fn durable_storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.durable_storage = Some(storage);
        self
    }

    /// Builds with the HTTP login backend from the API config.
    pub fn build(self) -> Result<AdminConsole, ConsoleError> {
        let backend = HttpAuthBackend::new(&self.config.api)?;
        self.build_with_backend(backend)
    }

    /// Builds with a custom login backend.
    pub fn build_with_backend<B: AuthBackend>(
        self,
        backend: B,
    ) -> Result<AdminConsole<B>, ConsoleError> {
        let host: Arc<dyn Host> = match self.host {
            Some(host) => host,
            None => {
                let location = Url::parse(DEFAULT_HOST_LOCATION)
                    .map_err(|e| ConsoleError::Config(e.to_string()))?;
                Arc::new(ScriptedHost::new(location))
            }
        };
        let session_storage = self
            .session_storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()) as Arc<dyn KeyValueStore>);
        let durable_storage = self
            .durable_storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()) as Arc<dyn KeyValueStore>);

        let store = TokenStore::new(session_storage, durable_storage);
        let bridge = Arc::new(ConsoleBridge::new(self.config.bridge.clone(), host)?);
        let session = SessionManager::new(
            backend,
            Arc::clone(&bridge),
            store.clone(),
            self.config.session.clone(),
        );
        let api = ApiClient::new(&self.config.api, session.clone())?;

        tracing::info!(
            api_base_url = %api.base_url(),
            console_origin = %bridge.origin(),
            "admin console ready"
        );

        Ok(AdminConsole {
            session,
            api,
            bridge,
            store,
        })
    }
}
