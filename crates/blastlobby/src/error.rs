//! Unified error type for the Blastlobby server.

use blastlobby_protocol::ProtocolError;
use blastlobby_room::RoomError;
use blastlobby_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum BlastlobbyError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (full, not found, unavailable).
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastlobby_protocol::RoomId;

    #[test]
    fn test_from_transport_error() {
        let peer: std::net::SocketAddr = "127.0.0.1:4000".parse().unwrap();
        let err = TransportError::HandshakeTimedOut(peer);
        let top: BlastlobbyError = err.into();
        assert!(matches!(top, BlastlobbyError::Transport(_)));
        assert!(top.to_string().contains("127.0.0.1:4000"));
    }

    #[test]
    fn test_from_protocol_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err();
        let top: BlastlobbyError = ProtocolError::Decode(json_err).into();
        assert!(matches!(top, BlastlobbyError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotFound(RoomId::from_index(1));
        let top: BlastlobbyError = err.into();
        assert!(matches!(top, BlastlobbyError::Room(_)));
        assert!(top.to_string().contains("room_1"));
    }
}
