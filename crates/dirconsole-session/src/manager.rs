//! The session manager: the state machine behind "who is signed in".
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Restoring a session at startup (cached console session, console
//!   handshake, cached regular session, in that order)
//! - Regular username/password login and logout
//! - Reacting to 401s from the API according to the session mode
//! - Answering permission questions for the screens
//!
//! # Concurrency note
//!
//! `SessionManager` is a cheap `Clone` handle around shared state, so the
//! API client, the console listener task and the UI can all hold one.
//! The current [`SessionState`] lives in a `watch` channel: reads never
//! wait on the network, and every transition is published to
//! subscribers. Login/logout bump an epoch counter so a network flow that
//! finishes after the admin already logged in or out drops its result
//! instead of resurrecting an old session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::Utc;
use dirconsole_bridge::ConsoleBridge;
use dirconsole_protocol::{ConsolePayload, Identity, LoginData, Role};
use dirconsole_store::TokenStore;
use tokio::sync::{mpsc, watch};

use crate::{
    AuthBackend, AuthMode, Session, SessionConfig, SessionError, SessionState,
    UnauthorizedOutcome,
};

/// Owns the admin's session for one page.
///
/// ## Lifecycle
///
/// ```text
/// start() ──→ [Restoring] ──→ [Authenticated(Console)]  ←─ console token refresh
///                  │     ──→ [Authenticated(Regular)]  ←─ login()
///                  └──────→ [Unauthenticated]          ←─ logout() / 401
/// ```
///
/// Create one per page and share clones of it; there is no global
/// instance.
pub struct SessionManager<B> {
    inner: Arc<Inner<B>>,
}

struct Inner<B> {
    backend: B,
    bridge: Arc<ConsoleBridge>,
    store: TokenStore,
    config: SessionConfig,

    /// Current state. `send_replace` works with zero subscribers.
    state: watch::Sender<SessionState>,

    /// Set by the first `start()`.
    started: AtomicBool,

    /// Bumped by every login/logout.
    epoch: AtomicU64,

    /// Held for the duration of one login request.
    login_guard: tokio::sync::Mutex<()>,
}

impl<B> Clone for SessionManager<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B> std::fmt::Debug for SessionManager<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("mode", &self.inner.state.borrow().mode())
            .finish_non_exhaustive()
    }
}

impl<B: AuthBackend> SessionManager<B> {
    /// Creates a manager in [`SessionState::Uninitialized`].
    ///
    /// Nothing happens until [`start`](Self::start) is awaited.
    pub fn new(
        backend: B,
        bridge: Arc<ConsoleBridge>,
        store: TokenStore,
        config: SessionConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Uninitialized);
        Self {
            inner: Arc::new(Inner {
                backend,
                bridge,
                store,
                config,
                state,
                started: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                login_guard: tokio::sync::Mutex::new(()),
            }),
        }
    }

    // -- Observation ------------------------------------------------------

    /// A snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// A receiver that sees every future transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn bridge(&self) -> &Arc<ConsoleBridge> {
        &self.inner.bridge
    }

    // -- Startup ----------------------------------------------------------

    /// Restores whatever session this page load has, then returns the
    /// resolved state.
    ///
    /// Order of attempts:
    ///
    /// 1. a cached, unexpired console session (no network)
    /// 2. the console handshake, if the address carries a token or the
    ///    page is embedded
    /// 3. a cached regular session (no network)
    ///
    /// Every failure falls through to the next step; the last resort is
    /// [`SessionState::Unauthenticated`]. Runs once: later calls wait for
    /// the first to resolve and return the current state.
    pub async fn start(&self) -> SessionState {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return self.resolved().await;
        }

        let epoch = self.epoch();
        self.publish(SessionState::Restoring);

        let restored = self.restore(epoch).await;
        if self.epoch() == epoch {
            self.publish(restored);
        } else {
            tracing::debug!("startup result superseded by login/logout");
        }
        self.state()
    }

    async fn resolved(&self) -> SessionState {
        let mut rx = self.subscribe();
        match rx.wait_for(SessionState::is_resolved).await {
            Ok(state) => (*state).clone(),
            Err(_) => self.state(),
        }
    }

    async fn restore(&self, epoch: u64) -> SessionState {
        if let Some(session) = self.restore_cached_console() {
            tracing::info!(
                username = %session.identity().username,
                "console session restored"
            );
            if let Some(tokens) = self.attach_console_listener() {
                self.spawn_token_refresh(tokens);
            }
            return SessionState::Authenticated(session);
        }

        if self.inner.bridge.should_attempt_console_auth() {
            if let Some(session) = self.console_handshake(epoch).await {
                tracing::info!(
                    username = %session.identity().username,
                    "console session established"
                );
                return SessionState::Authenticated(session);
            }
            tracing::debug!("console authentication unavailable, trying regular session");
        }

        match self.inner.store.load_regular() {
            Ok(Some(record)) => {
                tracing::info!(
                    username = %record.identity.username,
                    "regular session restored"
                );
                return SessionState::Authenticated(Session::Regular {
                    identity: record.identity,
                    token: record.token,
                });
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "could not read regular session");
            }
        }

        tracing::info!("no session to restore");
        SessionState::Unauthenticated
    }

    fn restore_cached_console(&self) -> Option<Session> {
        let record = match self.inner.store.load_console() {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "could not read console session");
                return None;
            }
        };

        if record.payload.is_expired(Utc::now()) {
            tracing::info!("cached console session expired");
            if let Err(e) = self.inner.store.clear() {
                tracing::warn!(error = %e, "failed to clear expired console session");
            }
            return None;
        }

        Some(Session::Console {
            identity: record.identity,
            token: record.token,
            payload: record.payload,
        })
    }

    /// URL token first; otherwise, when embedded, ask the parent and wait
    /// for its answer.
    async fn console_handshake(&self, epoch: u64) -> Option<Session> {
        let bridge = &self.inner.bridge;
        let mut tokens = self.attach_console_listener();

        let session = if let Some(token) = bridge.extract_token_from_url() {
            self.authenticate_console(token, epoch).await
        } else if let Some(rx) = tokens.as_mut() {
            bridge.signal_ready();
            match tokio::time::timeout(self.inner.config.embed_token_timeout, rx.recv())
                .await
            {
                Ok(Some(token)) => self.authenticate_console(token, epoch).await,
                Ok(None) => None,
                Err(_) => {
                    tracing::info!(
                        timeout = ?self.inner.config.embed_token_timeout,
                        "console sent no token"
                    );
                    None
                }
            }
        } else {
            None
        };

        if let Some(rx) = tokens {
            self.spawn_token_refresh(rx);
        }
        session
    }

    /// Listens for console tokens when embedded. `None` when top-level or
    /// when the listener was already taken.
    fn attach_console_listener(&self) -> Option<mpsc::UnboundedReceiver<String>> {
        if !self.inner.bridge.host().is_embedded() {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let attached = self.inner.bridge.listen_for_token(move |token| {
            let _ = tx.send(token);
        });
        attached.then_some(rx)
    }

    fn spawn_token_refresh(&self, mut tokens: mpsc::UnboundedReceiver<String>) {
        let manager = self.clone();
        tokio::spawn(async move {
            while let Some(token) = tokens.recv().await {
                manager.refresh_console(token).await;
            }
        });
    }

    /// A token the parent sent after startup.
    async fn refresh_console(&self, token: String) {
        // Tokens queued while startup is still running wait for its outcome.
        let state = self.resolved().await;
        if state.mode() == Some(AuthMode::Regular) {
            tracing::debug!("ignoring console token during a regular session");
            return;
        }

        let epoch = self.epoch();
        if let Some(session) = self.authenticate_console(token, epoch).await {
            tracing::info!(
                username = %session.identity().username,
                "console session refreshed"
            );
            self.publish(SessionState::Authenticated(session));
        }
    }

    /// Verifies `token` and persists the resulting console session.
    ///
    /// `None` on any failure; nothing is persisted in that case.
    async fn authenticate_console(&self, token: String, epoch: u64) -> Option<Session> {
        let payload = match self.inner.bridge.authenticate(&token).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "console token rejected");
                return None;
            }
        };

        if self.epoch() != epoch {
            tracing::debug!("console token superseded by login/logout");
            return None;
        }

        match self.establish_console(token, payload) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(error = %e, "failed to persist console session");
                None
            }
        }
    }

    fn establish_console(
        &self,
        token: String,
        payload: ConsolePayload,
    ) -> Result<Session, SessionError> {
        let identity = payload.to_identity(Utc::now());
        if let Err(e) = self.inner.store.persist_console(&token, &identity, &payload) {
            if let Err(clear) = self.inner.store.clear() {
                tracing::warn!(error = %clear, "failed to clear partial console session");
            }
            return Err(e.into());
        }
        Ok(Session::Console {
            identity,
            token,
            payload,
        })
    }

    // -- Login / logout ---------------------------------------------------

    /// Signs in with a username and password.
    ///
    /// On success the token and identity are stored durably, any console
    /// session is discarded, and the state becomes
    /// `Authenticated(Regular)`. On failure the state is unchanged.
    ///
    /// # Errors
    /// - [`SessionError::InvalidCredentials`]: empty username or password
    /// - [`SessionError::LoginInProgress`]: another login hasn't returned
    /// - [`SessionError::LoginFailed`]: rejected, with the backend's message
    /// - [`SessionError::NetworkError`]: backend unreachable
    /// - [`SessionError::Storage`]: the session couldn't be saved
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Identity, SessionError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(SessionError::InvalidCredentials);
        }

        let Ok(_guard) = self.inner.login_guard.try_lock() else {
            return Err(SessionError::LoginInProgress);
        };

        let LoginData { admin, token, .. } =
            match self.inner.backend.login(username, password).await {
                Ok(data) => data,
                Err(e) => {
                    tracing::info!(username, error = %e, "login failed");
                    return Err(e);
                }
            };

        if let Err(e) = self.inner.store.persist_regular(&token, &admin) {
            // The write may have stopped halfway through swapping scopes.
            if let Err(clear) = self.inner.store.clear() {
                tracing::warn!(error = %clear, "failed to clear partial regular session");
            }
            return Err(e.into());
        }
        self.bump_epoch();
        self.publish(SessionState::Authenticated(Session::Regular {
            identity: admin.clone(),
            token,
        }));

        tracing::info!(username = %admin.username, role = %admin.role, "logged in");
        Ok(admin)
    }

    /// Signs out from any state.
    ///
    /// Both storage scopes are cleared and the state becomes
    /// `Unauthenticated` before this returns. The server is notified in
    /// the background; that notification's failure is only logged. Use
    /// [`logout_notified`](Self::logout_notified) when the caller is
    /// about to shut the runtime down.
    pub fn logout(&self) {
        let Some(token) = self.sign_out() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("no runtime, skipping logout notification");
            return;
        };
        let manager = self.clone();
        runtime.spawn(async move {
            manager.notify_logout(&token).await;
        });
    }

    /// Like [`logout`](Self::logout), but waits for the server
    /// notification to finish.
    pub async fn logout_notified(&self) {
        if let Some(token) = self.sign_out() {
            self.notify_logout(&token).await;
        }
    }

    /// Local half of a logout. Returns the token that was in use.
    fn sign_out(&self) -> Option<String> {
        self.bump_epoch();
        if let Err(e) = self.inner.store.clear() {
            tracing::warn!(error = %e, "failed to clear stored session");
        }
        let previous = self.inner.state.send_replace(SessionState::Unauthenticated);

        let session = previous.session()?;
        tracing::info!(
            username = %session.identity().username,
            mode = ?session.mode(),
            "logged out"
        );
        Some(session.token().to_string())
    }

    async fn notify_logout(&self, token: &str) {
        if let Err(e) = self.inner.backend.logout(token).await {
            tracing::debug!(error = %e, "logout notification failed");
        }
    }

    /// Reacts to a 401 from the API.
    ///
    /// Regular (or no) session: logs out and sends the host to the login
    /// page. Console session: the console owns that token, so the session
    /// stays and the parent is asked for a fresh token instead.
    pub fn handle_unauthorized(&self) -> UnauthorizedOutcome {
        if self.is_console_auth() {
            let asked = self.inner.bridge.request_token();
            tracing::debug!(asked, "unauthorized in console mode, session kept");
            return UnauthorizedOutcome::Propagated;
        }

        tracing::info!("unauthorized, forcing logout");
        self.logout();
        self.inner.bridge.host().navigate(&self.inner.config.login_path);
        UnauthorizedOutcome::LoggedOut
    }

    // -- Accessors --------------------------------------------------------

    pub fn is_authenticated(&self) -> bool {
        self.inspect(|state| state.session().is_some())
    }

    pub fn is_console_auth(&self) -> bool {
        self.inspect(|state| state.mode() == Some(AuthMode::Console))
    }

    /// The signed-in admin.
    pub fn identity(&self) -> Option<Identity> {
        self.inspect(|state| state.session().map(|s| s.identity().clone()))
    }

    /// The bearer token for API calls.
    pub fn token(&self) -> Option<String> {
        self.inspect(|state| state.session().map(|s| s.token().to_string()))
    }

    /// The verified console payload, in console mode only.
    pub fn console_payload(&self) -> Option<ConsolePayload> {
        self.inspect(|state| state.session().and_then(Session::payload).cloned())
    }

    // -- Permissions ------------------------------------------------------
    //
    // Outside console mode every permission check passes: regular admins
    // are fully trusted by this app. In console mode the checks use exact
    // membership in the verified payload.

    pub fn has_permission(&self, permission: &str) -> bool {
        self.inspect(|state| match state.session().and_then(Session::payload) {
            Some(payload) => payload.has_permission(permission),
            None => true,
        })
    }

    pub fn has_any_permission<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        self.inspect(|state| match state.session().and_then(Session::payload) {
            Some(payload) => payload.has_any_permission(permissions),
            None => true,
        })
    }

    pub fn has_all_permissions<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        self.inspect(|state| match state.session().and_then(Session::payload) {
            Some(payload) => payload.has_all_permissions(permissions),
            None => true,
        })
    }

    /// Console mode: the payload's roles contain `"Super Admin"`.
    /// Regular mode: the identity's role is `super_admin`.
    pub fn is_super_admin(&self) -> bool {
        self.inspect(|state| match state.session() {
            Some(Session::Console { payload, .. }) => payload.is_super_admin(),
            Some(Session::Regular { identity, .. }) => {
                identity.role == Role::SuperAdmin
            }
            None => false,
        })
    }

    /// Console mode: exact membership in the payload's roles.
    /// Regular mode: compares against the identity's role name.
    pub fn has_role(&self, role: &str) -> bool {
        self.inspect(|state| match state.session() {
            Some(Session::Console { payload, .. }) => payload.has_role(role),
            Some(Session::Regular { identity, .. }) => identity.role.as_str() == role,
            None => false,
        })
    }

    // -- Internals --------------------------------------------------------

    fn inspect<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    fn publish(&self, state: SessionState) {
        self.inner.state.send_replace(state);
    }

    fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    fn bump_epoch(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
    }
}

// =========================================================================
// Tests
// =========================================================================
