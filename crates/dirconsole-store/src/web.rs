//! Browser `sessionStorage` / `localStorage` binding (wasm32 only).
//!
//! `web_sys::Storage` wraps a `JsValue`, which is neither `Send` nor
//! `Sync`, so the handle is looked up on every call instead of stored.

use wasm_bindgen::JsValue;

use crate::{KeyValueStore, StoreError};

/// Which browser storage to bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebStorageKind {
    /// `window.sessionStorage`: cleared when the tab closes.
    Session,
    /// `window.localStorage`: survives across sessions.
    Local,
}

/// A [`KeyValueStore`] over one of the window's storages.
#[derive(Debug, Clone, Copy)]
pub struct WebStorage {
    kind: WebStorageKind,
}

impl WebStorage {
    pub fn session() -> Self {
        Self {
            kind: WebStorageKind::Session,
        }
    }

    pub fn local() -> Self {
        Self {
            kind: WebStorageKind::Local,
        }
    }

    fn storage(&self) -> Result<web_sys::Storage, StoreError> {
        let window = web_sys::window()
            .ok_or_else(|| StoreError::Backend("no window".into()))?;
        let storage = match self.kind {
            WebStorageKind::Session => window.session_storage(),
            WebStorageKind::Local => window.local_storage(),
        };
        storage
            .map_err(js_error)?
            .ok_or_else(|| StoreError::Backend("storage unavailable".into()))
    }
}

impl KeyValueStore for WebStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.storage()?.get_item(key).map_err(js_error)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.storage()?.set_item(key, value).map_err(js_error)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.storage()?.remove_item(key).map_err(js_error)
    }
}

fn js_error(value: JsValue) -> StoreError {
    StoreError::Backend(format!("{value:?}"))
}
