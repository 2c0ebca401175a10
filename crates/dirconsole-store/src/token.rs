//! The token store: which scope owns the token, and what is cached with it.
//!
//! Persisted layout (keys shared with earlier builds of the console):
//!
//! ```text
//! session scope:  admin_token, admin_user, console_payload, console_auth
//! durable scope:  admin_token, admin_user
//! ```
//!
//! `console_auth = "true"` marks the session scope as the active one.
//! Every write clears the other scope in the same call, so at most one
//! scope ever holds a token.

use std::sync::Arc;

use dirconsole_protocol::{Codec, ConsolePayload, Identity, JsonCodec};
use serde::de::DeserializeOwned;

use crate::{KeyValueStore, StoreError};

const TOKEN_KEY: &str = "admin_token";
const IDENTITY_KEY: &str = "admin_user";
const PAYLOAD_KEY: &str = "console_payload";
const CONSOLE_FLAG_KEY: &str = "console_auth";

/// Which persistence scope owns a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenScope {
    /// Tab-scoped. Used for console-issued tokens only.
    Session,
    /// Survives across sessions. Used for regular logins only.
    Durable,
}

/// Everything cached for a console session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleRecord {
    pub token: String,
    pub identity: Identity,
    pub payload: ConsolePayload,
}

/// Everything cached for a regular session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegularRecord {
    pub token: String,
    pub identity: Identity,
}

/// Single source of truth for "is there a token, and which scope owns it".
///
/// No network, no validation: only storage policy. Cloning is cheap and
/// clones share the same backends.
#[derive(Clone)]
pub struct TokenStore {
    session: Arc<dyn KeyValueStore>,
    durable: Arc<dyn KeyValueStore>,
    codec: JsonCodec,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}

impl TokenStore {
    pub fn new(
        session: Arc<dyn KeyValueStore>,
        durable: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            session,
            durable,
            codec: JsonCodec,
        }
    }

    // -- Token-only policy ------------------------------------------------

    /// Writes `token` into `scope` and deletes the other scope's token.
    pub fn save(&self, token: &str, scope: TokenScope) -> Result<(), StoreError> {
        match scope {
            TokenScope::Session => {
                self.session.set(TOKEN_KEY, token)?;
                self.durable.remove(TOKEN_KEY)?;
            }
            TokenScope::Durable => {
                self.durable.set(TOKEN_KEY, token)?;
                self.session.remove(TOKEN_KEY)?;
            }
        }
        Ok(())
    }

    /// Returns the active token and its scope.
    ///
    /// If both scopes hold a token (only possible if something outside
    /// this store wrote one), the session scope wins.
    pub fn load(&self) -> Result<Option<(String, TokenScope)>, StoreError> {
        if let Some(token) = non_empty(self.session.get(TOKEN_KEY)?) {
            return Ok(Some((token, TokenScope::Session)));
        }
        Ok(non_empty(self.durable.get(TOKEN_KEY)?)
            .map(|token| (token, TokenScope::Durable)))
    }

    /// Removes the token and every cached identity/payload from both scopes.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.clear_session()?;
        self.clear_durable()
    }

    /// `true` when the session scope is marked as the active one.
    pub fn is_console_active(&self) -> bool {
        matches!(
            self.session.get(CONSOLE_FLAG_KEY),
            Ok(Some(flag)) if flag == "true"
        )
    }

    // -- Full session records ---------------------------------------------

    /// Persists a console session in the session scope and wipes the
    /// durable scope.
    pub fn persist_console(
        &self,
        token: &str,
        identity: &Identity,
        payload: &ConsolePayload,
    ) -> Result<(), StoreError> {
        // Encode first so a serialization failure writes nothing.
        let identity = self.codec.encode(identity)?;
        let payload = self.codec.encode(payload)?;

        self.save(token, TokenScope::Session)?;
        self.session.set(IDENTITY_KEY, &identity)?;
        self.session.set(PAYLOAD_KEY, &payload)?;
        self.session.set(CONSOLE_FLAG_KEY, "true")?;
        self.clear_durable()
    }

    /// Persists a regular session in the durable scope and wipes the
    /// session scope.
    pub fn persist_regular(
        &self,
        token: &str,
        identity: &Identity,
    ) -> Result<(), StoreError> {
        let identity = self.codec.encode(identity)?;

        self.save(token, TokenScope::Durable)?;
        self.durable.set(IDENTITY_KEY, &identity)?;
        self.clear_session()
    }

    /// Reads a cached console session.
    ///
    /// Returns `Ok(None)` unless the console flag, token, identity and
    /// payload are all present. Undecodable cached JSON is logged, removed,
    /// and reported as `Ok(None)`.
    pub fn load_console(&self) -> Result<Option<ConsoleRecord>, StoreError> {
        if !self.is_console_active() {
            return Ok(None);
        }
        let Some(token) = non_empty(self.session.get(TOKEN_KEY)?) else {
            return Ok(None);
        };
        let (Some(identity), Some(payload)) = (
            self.session.get(IDENTITY_KEY)?,
            self.session.get(PAYLOAD_KEY)?,
        ) else {
            return Ok(None);
        };

        let decoded = self
            .decode::<Identity>(IDENTITY_KEY, &identity)
            .and_then(|identity| {
                let payload =
                    self.decode::<ConsolePayload>(PAYLOAD_KEY, &payload)?;
                Ok((identity, payload))
            });

        match decoded {
            Ok((identity, payload)) => Ok(Some(ConsoleRecord {
                token,
                identity,
                payload,
            })),
            Err(e) => {
                tracing::warn!(error = %e, "discarding corrupted console session");
                self.clear_session()?;
                Ok(None)
            }
        }
    }

    /// Reads a cached regular session from the durable scope.
    ///
    /// Same corruption policy as [`load_console`](Self::load_console).
    pub fn load_regular(&self) -> Result<Option<RegularRecord>, StoreError> {
        let Some(token) = non_empty(self.durable.get(TOKEN_KEY)?) else {
            return Ok(None);
        };
        let Some(identity) = self.durable.get(IDENTITY_KEY)? else {
            return Ok(None);
        };

        match self.decode::<Identity>(IDENTITY_KEY, &identity) {
            Ok(identity) => Ok(Some(RegularRecord { token, identity })),
            Err(e) => {
                tracing::warn!(error = %e, "discarding corrupted regular session");
                self.clear_durable()?;
                Ok(None)
            }
        }
    }

    // -- Internals --------------------------------------------------------

    fn decode<T: DeserializeOwned>(
        &self,
        key: &'static str,
        text: &str,
    ) -> Result<T, StoreError> {
        self.codec
            .decode(text)
            .map_err(|source| StoreError::Corrupted { key, source })
    }

    fn clear_session(&self) -> Result<(), StoreError> {
        for key in [TOKEN_KEY, IDENTITY_KEY, PAYLOAD_KEY, CONSOLE_FLAG_KEY] {
            self.session.remove(key)?;
        }
        Ok(())
    }

    fn clear_durable(&self) -> Result<(), StoreError> {
        for key in [TOKEN_KEY, IDENTITY_KEY] {
            self.durable.remove(key)?;
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// =========================================================================
// Tests
// =========================================================================
