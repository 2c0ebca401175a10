//! Unified error type for dirconsole.

use dirconsole_api::ApiError;
use dirconsole_bridge::BridgeError;
use dirconsole_protocol::ProtocolError;
use dirconsole_session::SessionError;
use dirconsole_store::StoreError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `dirconsole` crate, you deal with this single error
/// type instead of importing errors from each sub-crate. `#[from]` on
/// each variant lets `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// Encoding or decoding a wire/storage value failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A storage backend failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Console handshake or token verification failed.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Login/logout failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// An API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_session_error_keeps_message() {
        let err: ConsoleError = SessionError::LoginFailed("Invalid credentials".into()).into();
        assert!(matches!(err, ConsoleError::Session(_)));
        assert_eq!(err.to_string(), "Invalid credentials");
    }

    #[test]
    fn test_from_bridge_error() {
        let err: ConsoleError = BridgeError::VerificationFailed("Invalid token".into()).into();
        assert!(matches!(err, ConsoleError::Bridge(_)));
    }

    #[test]
    fn test_from_api_error() {
        let err: ConsoleError = ApiError::Unauthorized.into();
        assert!(matches!(err, ConsoleError::Api(ApiError::Unauthorized)));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: ConsoleError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, ConsoleError::Protocol(_)));
    }
}
