//! Error types for the room layer.

use blastlobby_protocol::RoomId;
use blastlobby_transport::ConnectionId;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The connection is not a member of this room.
    #[error("{0} is not a member of room {1}")]
    NotMember(ConnectionId, RoomId),

    /// The connection was already admitted to this room.
    #[error("{0} already in room {1}")]
    AlreadyInRoom(ConnectionId, RoomId),

    /// The member already holds a nickname.
    #[error("{0} is already registered")]
    AlreadyRegistered(ConnectionId),

    /// Another registered member uses this nickname.
    #[error("nickname {0:?} is taken")]
    NicknameTaken(String),

    /// The room already holds its maximum number of registered players.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The room has started or filled up and admits no one new.
    #[error("room {0} is not accepting connections")]
    NotJoinable(RoomId),

    /// The room's command channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

impl RoomError {
    /// Returns `true` for registration refusals that end the member's
    /// session.
    pub fn ends_session(&self) -> bool {
        matches!(self, Self::NicknameTaken(_) | Self::RoomFull(_))
    }
}
