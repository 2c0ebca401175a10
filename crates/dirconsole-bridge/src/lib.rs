//! Console bridge for dirconsole.
//!
//! The admin app can be opened by a trusted admin console, either in a new
//! tab (token in the address) or inside a frame (token via window
//! messages). This crate turns that raw token into a verified
//! [`ConsolePayload`](dirconsole_protocol::ConsolePayload):
//!
//! ```text
//! console ──token──▶ ConsoleBridge ──POST verify──▶ backend
//!                         │
//!                         └──GET /me (best effort)──▶ console
//! ```
//!
//! The page itself is abstracted behind the [`Host`] trait so the flow
//! is independent of whether it runs in a browser, a webview shell, or a
//! test.

mod bridge;
mod error;
mod host;

pub use bridge::{BridgeConfig, ConsoleBridge, DEFAULT_CONSOLE_URL, normalize_origin};
pub use error::BridgeError;
pub use host::{Host, ScriptedHost, WindowMessage};
