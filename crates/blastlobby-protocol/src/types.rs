//! Wire types exchanged between browser clients and the room server.
//!
//! Every message is a single JSON object discriminated by its `"type"`
//! field. Client messages and server messages are separate enums so each
//! side can only produce what it is allowed to send.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A unique identifier for a room, e.g. `room_0`.
///
/// Rooms are numbered in creation order. `#[serde(transparent)]` puts the
/// plain string on the wire rather than a wrapper object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Builds the id of the `index`-th room ever created (0-based).
    pub fn from_index(index: usize) -> Self {
        Self(format!("room_{index}"))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

/// One cell of the arena grid.
///
/// Serialized as the bare integer the client renders from:
/// `0` empty, `1` permanent wall, `2` destructible block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tile {
    Empty = 0,
    Wall = 1,
    Destructible = 2,
}

impl TryFrom<u8> for Tile {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Empty),
            1 => Ok(Self::Wall),
            2 => Ok(Self::Destructible),
            other => Err(other),
        }
    }
}

impl Serialize for Tile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for Tile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u8::deserialize(deserializer)?;
        Tile::try_from(raw)
            .map_err(|v| D::Error::custom(format!("invalid tile value {v}")))
    }
}

/// A rectangular grid of tiles, indexed `[row][col]`.
///
/// On the wire this is a plain 2D array of integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameMap {
    tiles: Vec<Vec<Tile>>,
}

impl GameMap {
    /// Creates a `rows × cols` map filled with `fill`.
    pub fn filled(rows: usize, cols: usize, fill: Tile) -> Self {
        Self {
            tiles: vec![vec![fill; cols]; rows],
        }
    }

    pub fn rows(&self) -> usize {
        self.tiles.len()
    }

    pub fn cols(&self) -> usize {
        self.tiles.first().map_or(0, Vec::len)
    }

    /// Returns the tile at `(row, col)`, or `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<Tile> {
        self.tiles.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Overwrites the tile at `(row, col)`. Out-of-bounds writes are ignored.
    pub fn set(&mut self, row: usize, col: usize, tile: Tile) {
        if let Some(cell) = self.tiles.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = tile;
        }
    }

    /// Iterates over rows, top to bottom.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[Tile]> {
        self.tiles.iter().map(Vec::as_slice)
    }
}

// ---------------------------------------------------------------------------
// Payload pieces
// ---------------------------------------------------------------------------

/// Opaque body of a gameplay relay (`player_move`, `bomb_placed`, ...).
///
/// The server never looks inside; every field except `"type"` is passed
/// through to the other members untouched.
pub type RelayPayload = serde_json::Map<String, serde_json::Value>;

/// A player's spawn entry in `start_game`. `x`/`y` are pixel coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub nickname: String,
    pub x: i32,
    pub y: i32,
}

/// One chat line as stored in the room history and broadcast to members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub nickname: String,
    pub message: String,
    /// Server receipt time, milliseconds since the Unix epoch.
    pub timestamp: u64,
    #[serde(rename = "roomId")]
    pub room_id: RoomId,
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Messages a client may send to its room.
///
/// Internally tagged: `{"type": "register", "nickname": "bob"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Claim a nickname and become a registered player.
    Register { nickname: String },

    /// Say something in the lobby chat.
    Chat { message: String },

    /// Position/animation update, relayed to everyone else.
    PlayerMove(RelayPayload),

    /// A bomb was dropped, relayed to everyone else.
    BombPlaced(RelayPayload),

    /// A bomb went off, relayed to everyone else.
    Explosion(RelayPayload),

    /// A power-up appeared or was picked up, relayed to everyone else.
    Ability(RelayPayload),

    /// Any `"type"` this server doesn't know. Ignored.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Converts a gameplay relay into the message forwarded to peers.
    ///
    /// Returns `None` for anything that isn't a relay.
    pub fn into_relay(self) -> Option<ServerMessage> {
        match self {
            Self::PlayerMove(p) => Some(ServerMessage::PlayerMove(p)),
            Self::BombPlaced(p) => Some(ServerMessage::BombPlaced(p)),
            Self::Explosion(p) => Some(ServerMessage::Explosion(p)),
            Self::Ability(p) => Some(ServerMessage::Ability(p)),
            Self::Register { .. } | Self::Chat { .. } | Self::Unknown => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Messages the server sends to one or more room members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Registration refused: another member already uses that nickname.
    NicknameTaken,

    /// Registration refused: the room already holds its maximum players.
    RoomFull,

    /// Current number of registered players in the room.
    PlayerCount {
        count: usize,
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },

    /// A chat line (live, or replayed from history on registration).
    Chat(ChatRecord),

    /// Seconds left before the game starts. Reaches `-1` for a countdown
    /// that started at zero.
    Countdown { seconds: i32 },

    /// The game begins: spawn roster plus the arena.
    StartGame {
        players: Vec<PlayerInfo>,
        map: GameMap,
    },

    PlayerMove(RelayPayload),
    BombPlaced(RelayPayload),
    Explosion(RelayPayload),
    Ability(RelayPayload),
}
