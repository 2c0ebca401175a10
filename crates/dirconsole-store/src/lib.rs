//! Token storage for dirconsole.
//!
//! Provides the [`KeyValueStore`] trait that abstracts over the two
//! persistence scopes a browser offers (tab-scoped `sessionStorage` and
//! durable `localStorage`) and the [`TokenStore`] that enforces the
//! token policy on top of them.
//!
//! # Feature Flags
//!
//! - `file` (default): [`FileStorage`], a durable JSON file backend for
//!   native hosts.
//!
//! On `wasm32` targets [`WebStorage`] binds the real browser storages.

mod error;
#[cfg(feature = "file")]
mod file;
mod token;
#[cfg(target_arch = "wasm32")]
mod web;

pub use error::StoreError;
#[cfg(feature = "file")]
pub use file::FileStorage;
pub use token::{ConsoleRecord, RegularRecord, TokenScope, TokenStore};
#[cfg(target_arch = "wasm32")]
pub use web::{WebStorage, WebStorageKind};

use std::collections::HashMap;
use std::sync::Mutex;

/// A flat string-to-string store: the shape of browser `Storage`.
///
/// Implementations must be idempotent: removing a missing key and
/// setting a key to its current value both succeed without effect.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Deletes `key`.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// An in-process [`KeyValueStore`].
///
/// Lives exactly as long as the value, which is what "session-scoped"
/// means for a native host. Also the storage every test uses.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A panic while holding the lock can't leave a half-written
        // HashMap entry behind, so a poisoned lock is still usable.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock().remove(key);
        Ok(())
    }
}
