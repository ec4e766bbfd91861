//! Room lifecycle management for Blastlobby.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! members, chat history, status, and auto-start countdown.
//!
//! # Key types
//!
//! - [`RoomManager`]: room directory and matchmaking
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomStatus`]: `Waiting` → `InGame`
//! - [`RoomConfig`]: capacity, countdown lengths, spawn layout
//! - [`generate_map`]: procedural arena for a new room

mod config;
mod countdown;
mod error;
mod manager;
pub mod map;
mod room;

pub use config::{RoomConfig, RoomStatus};
pub use error::RoomError;
pub use manager::RoomManager;
pub use map::{generate_map, generate_map_with};
pub use room::{MemberSender, RoomHandle, RoomInfo};
