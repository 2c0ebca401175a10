//! Codec trait and implementations for serializing values to text.
//!
//! Browser storage and window messages carry strings, so unlike a binary
//! wire codec this one works on `String`/`&str`. The storage and bridge
//! layers don't care HOW a value is serialized; they only need something
//! that implements [`Codec`].

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust values to text and decode text back.
///
/// ## Trait bounds
///
/// - `Send + Sync` → the codec is shared by the token store and the
///   message listener task.
/// - `'static` → it owns everything it needs, so it can live inside
///   long-lived async tasks.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a string.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a string back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the text is malformed or doesn't
    /// match the expected shape.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &str,
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// JSON is the layout browser storage already holds, so sessions
/// written by one build stay readable by the next.
///
/// ## Example
///
/// ```rust
/// use dirconsole_protocol::{Codec, FrameMessage, JsonCodec};
///
/// let codec = JsonCodec;
/// let text = codec.encode(&FrameMessage::RequestToken).unwrap();
/// assert_eq!(text, r#"{"type":"REQUEST_TOKEN"}"#);
///
/// let decoded: FrameMessage = codec.decode(&text).unwrap();
/// assert_eq!(decoded, FrameMessage::RequestToken);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &str,
    ) -> Result<T, ProtocolError> {
        serde_json::from_str(data).map_err(ProtocolError::Decode)
    }
}
