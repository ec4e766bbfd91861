//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, or a
    /// field of the wrong type. An unknown `"type"` tag is *not* an
    /// error; it decodes to [`ClientMessage::Unknown`](crate::ClientMessage::Unknown).
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
