//! Data and wire types for dirconsole.
//!
//! This crate defines every shape that crosses a boundary of the
//! authentication core:
//!
//! - **Types** ([`Identity`], [`ConsolePayload`], [`FrameMessage`], the
//!   verify/login envelopes) that the backends and the embedding console
//!   exchange with us.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) that turns those types into
//!   the strings we keep in storage and back.
//! - **Errors** ([`ProtocolError`]) for encoding/decoding failures.
//!
//! # Architecture
//!
//! ```text
//! Storage / HTTP / window messages (strings) → Protocol (typed values) → Session
//! ```
//!
//! Nothing in here performs I/O.

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
#[cfg(feature = "json")]
pub use types::extract_error_message;
pub use types::{
    AdminInfo, ConsolePayload, FrameMessage, Identity,
    LoginData, LoginRequest, LoginResponse, Role, VerifyRequest,
    VerifyResponse, SUPER_ADMIN_ROLE,
};
