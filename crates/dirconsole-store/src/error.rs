use dirconsole_protocol::ProtocolError;

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying storage refused the operation (quota, missing
    /// `window`, private browsing, ...).
    #[error("storage backend failed: {0}")]
    Backend(String),

    /// Reading or writing the backing file failed.
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be serialized for storage.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A stored value exists but can't be decoded.
    ///
    /// The token store never returns this from its session accessors; it
    /// logs, deletes the offending keys, and reports "no session".
    #[error("stored value under {key:?} is corrupted: {source}")]
    Corrupted {
        key: &'static str,
        #[source]
        source: ProtocolError,
    },
}
