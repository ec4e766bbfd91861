//! Wire protocol for Blastlobby.
//!
//! This crate defines what clients and the room server say to each other:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`GameMap`], etc.):
//!   the JSON objects that travel on the wire, tagged by a `"type"` field.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! The protocol layer knows nothing about connections or rooms.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Room (membership, broadcast)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ChatRecord, ClientMessage, GameMap, PlayerInfo, RelayPayload, RoomId,
    ServerMessage, Tile,
};
