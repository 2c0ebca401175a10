//! Error types for the protocol layer.
//!
//! Each crate in dirconsole defines its own error enum. A `ProtocolError`
//! always means a value could not be turned into (or recovered from) its
//! serialized form; it never describes a network or storage problem.

/// Errors that can occur while encoding or decoding protocol values.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (Rust value → string).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (string → Rust value).
    ///
    /// Common causes: malformed JSON left behind by an older build,
    /// truncated writes, or a field with the wrong type.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The value parsed but breaks a protocol rule (for example a frame
    /// message carrying an empty token).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
