//! Admin session management for dirconsole.
//!
//! This crate owns the lifecycle of an admin's session:
//!
//! 1. **Authentication**: regular username/password logins go through an
//!    [`AuthBackend`]; console logins go through the
//!    [`ConsoleBridge`](dirconsole_bridge::ConsoleBridge)
//! 2. **Session tracking**: exactly one [`Session`] at a time, observable
//!    through [`SessionManager::subscribe`]
//! 3. **Authorization**: permission predicates whose meaning depends on
//!    how the admin signed in
//!
//! # How it fits in the stack
//!
//! ```text
//! API client (above)  ← reads the token, reports 401s
//!     ↕
//! Session layer (this crate)  ← state machine + permission checks
//!     ↕
//! Store / Bridge (below)  ← persistence policy, console handshake
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod manager;
mod session;

pub use auth::AuthBackend;
pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{
    AuthMode, Session, SessionConfig, SessionState, UnauthorizedOutcome,
};
