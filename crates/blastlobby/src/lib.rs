//! # Blastlobby
//!
//! WebSocket lobby server for a four-player Bomberman-style game.
//!
//! Clients connect, are placed into a waiting room, register a nickname,
//! chat, and relay gameplay messages. A room starts its match after a
//! countdown and hands every player a spawn point and the generated arena.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blastlobby::prelude::*;
//!
//! # async fn start() -> Result<(), BlastlobbyError> {
//! let server = Server::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::BlastlobbyError;
pub use server::{Server, ServerBuilder};

pub mod prelude {
    pub use crate::{BlastlobbyError, Server, ServerBuilder};
    pub use blastlobby_protocol::{
        ChatRecord, ClientMessage, GameMap, PlayerInfo, RoomId, ServerMessage,
        Tile,
    };
    pub use blastlobby_room::{RoomConfig, RoomStatus};
}
