//! Room manager: owns the room directory and places connections.

use blastlobby_protocol::RoomId;
use blastlobby_transport::ConnectionId;

use crate::map::generate_map;
use crate::room::spawn_room;
use crate::{MemberSender, RoomConfig, RoomError, RoomHandle, RoomInfo};

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Owns every room ever created and implements matchmaking.
///
/// Rooms are kept in creation order and never removed; the next room id
/// is derived from how many exist. The manager only reaches into a room
/// through its [`RoomHandle`], never by locking room state.
///
/// Matchmaking asks every room for its info in turn, one actor round trip
/// each, while the caller holds the manager lock. Since rooms are never
/// reclaimed, placing a connection costs O(rooms created so far) for the
/// life of the process.
pub struct RoomManager {
    rooms: Vec<RoomHandle>,
    config: RoomConfig,
}

impl RoomManager {
    /// Creates an empty manager whose rooms use `config`.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: Vec::new(),
            config: config.validated(),
        }
    }

    /// Creates a new room with a freshly generated map.
    pub fn create_room(&mut self) -> RoomHandle {
        let room_id = RoomId::from_index(self.rooms.len());
        let handle = spawn_room(
            room_id.clone(),
            self.config.clone(),
            generate_map(),
            DEFAULT_CHANNEL_SIZE,
        );
        self.rooms.push(handle.clone());
        tracing::info!(%room_id, rooms = self.rooms.len(), "room created");
        handle
    }

    /// Returns the first room that is still waiting and has a free slot,
    /// creating one if none does.
    pub async fn find_available_room(&mut self) -> RoomHandle {
        tracing::debug!(rooms = self.rooms.len(), "looking for available room");

        for handle in &self.rooms {
            match handle.info().await {
                Ok(info) if info.is_joinable() => {
                    tracing::debug!(
                        room_id = %info.room_id,
                        players = info.registered,
                        "found available room"
                    );
                    return handle.clone();
                }
                Ok(info) => {
                    tracing::trace!(
                        room_id = %info.room_id,
                        players = info.registered,
                        status = %info.status,
                        "room not joinable"
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, "room did not answer info request");
                }
            }
        }

        self.create_room()
    }

    /// Places a new connection into an available room and admits it.
    ///
    /// If the chosen room stops being joinable between the scan and the
    /// admission (its countdown fired), a new room is created instead.
    pub async fn join_or_create(
        &mut self,
        conn_id: ConnectionId,
        sender: MemberSender,
    ) -> Result<RoomHandle, RoomError> {
        let room = self.find_available_room().await;
        match room.admit(conn_id, sender.clone()).await {
            Ok(()) => Ok(room),
            Err(RoomError::NotJoinable(room_id)) => {
                tracing::debug!(%room_id, %conn_id, "room closed before admission");
                let room = self.create_room();
                room.admit(conn_id, sender).await?;
                Ok(room)
            }
            Err(e) => Err(e),
        }
    }

    /// Returns info about a specific room.
    pub async fn get_room_info(
        &self,
        room_id: &RoomId,
    ) -> Result<RoomInfo, RoomError> {
        let handle = self
            .rooms
            .iter()
            .find(|h| h.room_id() == room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        handle.info().await
    }

    /// Lists all rooms that are currently joinable.
    ///
    /// Rooms that fail to respond are skipped.
    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        let mut infos = Vec::with_capacity(self.rooms.len());
        for handle in &self.rooms {
            if let Ok(info) = handle.info().await {
                if info.is_joinable() {
                    infos.push(info);
                }
            }
        }
        infos
    }

    /// Shuts every room down, closing all member channels.
    pub async fn shutdown_all(&self) {
        for handle in &self.rooms {
            if let Err(e) = handle.shutdown().await {
                tracing::debug!(error = %e, "room already stopped");
            }
        }
        tracing::info!(rooms = self.rooms.len(), "all rooms shut down");
    }

    /// Returns the number of rooms created so far.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Lists all room IDs in creation order.
    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.iter().map(|h| h.room_id().clone()).collect()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}
