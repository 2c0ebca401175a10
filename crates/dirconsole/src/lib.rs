//! # dirconsole
//!
//! Session and console-auth core for the directory admin console.
//!
//! An admin reaches the console one of two ways: by logging in with a
//! username and password, or by being sent over from the trusted admin
//! console (token in the address, or posted into an embedding frame).
//! This crate assembles the layers that handle both:
//!
//! | layer | crate |
//! |---|---|
//! | wire/data types | [`protocol`] |
//! | token persistence policy | [`store`] |
//! | console handshake + verification | [`bridge`] |
//! | session state machine + permissions | [`session`] |
//! | authenticated REST calls | [`api`] |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dirconsole::prelude::*;
//!
//! # async fn run() -> Result<(), ConsoleError> {
//! let config = ConsoleConfig::from_env()?;
//! init_logging(config.debug_auth);
//!
//! let console = AdminConsole::builder().config(config).build()?;
//! if console.start().await.session().is_none() {
//!     console.session().login("admin", "secret").await?;
//! }
//! let businesses: serde_json::Value = console.api().get("/businesses").await?;
//! # let _ = businesses;
//! # Ok(())
//! # }
//! ```

mod config;
mod console;
mod error;
mod logging;

pub use config::{
    ConsoleConfig, ENV_API_BASE_URL, ENV_CONSOLE_URL, ENV_DEBUG_AUTH, ENV_HOSTNAME,
    api_base_for_hostname,
};
pub use console::{AdminConsole, AdminConsoleBuilder, DEFAULT_HOST_LOCATION};
pub use error::ConsoleError;
pub use logging::init_logging;

pub use dirconsole_api as api;
pub use dirconsole_bridge as bridge;
pub use dirconsole_protocol as protocol;
pub use dirconsole_session as session;
pub use dirconsole_store as store;

/// Everything a screen usually needs, in one import.
pub mod prelude {
    pub use crate::{AdminConsole, ConsoleConfig, ConsoleError, init_logging};
    pub use dirconsole_api::{ApiClient, ApiConfig, ApiError, HttpAuthBackend};
    pub use dirconsole_bridge::{BridgeConfig, ConsoleBridge, Host, ScriptedHost};
    pub use dirconsole_protocol::{ConsolePayload, Identity, Role};
    pub use dirconsole_session::{
        AuthBackend, AuthMode, Session, SessionConfig, SessionManager, SessionState,
        UnauthorizedOutcome,
    };
    pub use dirconsole_store::{FileStorage, KeyValueStore, MemoryStorage, TokenStore};
}
