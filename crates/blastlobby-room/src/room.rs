//! Room actor: an isolated Tokio task that owns one lobby.
//!
//! Everything a room knows (members, chat history, status, countdown)
//! lives inside a single task and is only touched while that task handles
//! one command at a time. Connection handlers talk to it through a cheap
//! [`RoomHandle`]. Outbound messages leave through per-member bounded
//! channels, so a broadcast never waits on a slow socket. When a member's
//! queue is full, its copy of the message is dropped.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use blastlobby_protocol::{ChatRecord, GameMap, PlayerInfo, RoomId, ServerMessage};
use blastlobby_transport::ConnectionId;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use crate::countdown::Countdown;
use crate::{RoomConfig, RoomError, RoomStatus};

/// Channel sender for delivering outbound messages to one member.
///
/// Bounded: the room never waits on it, and drops what does not fit.
pub type MemberSender = mpsc::Sender<ServerMessage>;

/// Commands sent to a room actor through its channel.
///
/// Variants with a `reply` are request/response; the rest are
/// fire-and-forget.
pub(crate) enum RoomCommand {
    /// Add a fresh, unregistered member.
    Admit {
        conn_id: ConnectionId,
        sender: MemberSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Claim a nickname for an admitted member.
    Register {
        conn_id: ConnectionId,
        nickname: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Append to chat history and broadcast.
    Chat {
        conn_id: ConnectionId,
        message: String,
    },

    /// Forward a gameplay message to every other member.
    Relay {
        conn_id: ConnectionId,
        message: ServerMessage,
    },

    /// Remove a member (connection lost).
    Leave {
        conn_id: ConnectionId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Request a metadata snapshot.
    GetInfo { reply: oneshot::Sender<RoomInfo> },

    /// Drop every member and stop the actor.
    Shutdown,
}

/// A snapshot of room metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub status: RoomStatus,
    /// Members holding a nickname.
    pub registered: usize,
    /// All admitted members, registered or not.
    pub connected: usize,
    pub capacity: usize,
}

impl RoomInfo {
    /// `true` while the room is waiting and has a free player slot.
    pub fn is_joinable(&self) -> bool {
        self.status.is_waiting() && self.registered < self.capacity
    }
}

/// Handle to a running room actor.
///
/// Cheap to clone; the [`RoomManager`](crate::RoomManager) holds one per
/// room and every connection handler holds one for its own room.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Admits a connection as an unregistered member.
    ///
    /// Fails with [`RoomError::NotJoinable`] once the room has started or
    /// holds `capacity` registered players.
    pub async fn admit(
        &self,
        conn_id: ConnectionId,
        sender: MemberSender,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Admit {
            conn_id,
            sender,
            reply,
        })
        .await?
    }

    /// Registers `nickname` for an admitted member.
    ///
    /// On [`RoomError::NicknameTaken`] or [`RoomError::RoomFull`] the
    /// member has already been told why and removed from the room.
    pub async fn register(
        &self,
        conn_id: ConnectionId,
        nickname: String,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Register {
            conn_id,
            nickname,
            reply,
        })
        .await?
    }

    /// Sends a chat line from a member (fire-and-forget).
    pub async fn chat(
        &self,
        conn_id: ConnectionId,
        message: String,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Chat { conn_id, message }).await
    }

    /// Relays a gameplay message to everyone except the sender
    /// (fire-and-forget).
    pub async fn relay(
        &self,
        conn_id: ConnectionId,
        message: ServerMessage,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Relay { conn_id, message }).await
    }

    /// Removes a member after its connection went away.
    pub async fn leave(&self, conn_id: ConnectionId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Leave { conn_id, reply })
            .await?
    }

    /// Requests the current room info.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::GetInfo { reply }).await
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(make(reply_tx)).await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }
}

/// Nickname and join position of a registered member.
struct Registration {
    nickname: String,
    /// Registration sequence number; decides spawn slot order.
    order: u64,
}

struct Member {
    sender: MemberSender,
    registration: Option<Registration>,
}

impl Member {
    fn nickname(&self) -> Option<&str> {
        self.registration.as_ref().map(|r| r.nickname.as_str())
    }
}

/// The internal room state. Runs inside a Tokio task.
struct RoomActor {
    room_id: RoomId,
    status: RoomStatus,
    config: RoomConfig,
    members: HashMap<ConnectionId, Member>,
    history: Vec<ChatRecord>,
    map: GameMap,
    countdown: Countdown,
    next_registration: u64,
    last_timestamp: u64,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop until shutdown or until every handle is gone.
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                seconds = self.countdown.tick() => self.on_countdown_tick(seconds),
            }
        }

        tracing::info!(room_id = %self.room_id, "room actor stopped");
    }

    /// Returns `false` when the actor should stop.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Admit {
                conn_id,
                sender,
                reply,
            } => {
                let _ = reply.send(self.handle_admit(conn_id, sender));
            }
            RoomCommand::Register {
                conn_id,
                nickname,
                reply,
            } => {
                let _ = reply.send(self.handle_register(conn_id, nickname));
            }
            RoomCommand::Chat { conn_id, message } => {
                self.handle_chat(conn_id, message);
            }
            RoomCommand::Relay { conn_id, message } => {
                self.handle_relay(conn_id, message);
            }
            RoomCommand::Leave { conn_id, reply } => {
                let _ = reply.send(self.handle_leave(conn_id));
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown => {
                tracing::info!(
                    room_id = %self.room_id,
                    members = self.members.len(),
                    "room shutting down"
                );
                self.countdown.cancel();
                // Dropping the senders lets every writer task drain and close.
                self.members.clear();
                return false;
            }
        }
        true
    }

    fn handle_admit(
        &mut self,
        conn_id: ConnectionId,
        sender: MemberSender,
    ) -> Result<(), RoomError> {
        if !self.info().is_joinable() {
            return Err(RoomError::NotJoinable(self.room_id.clone()));
        }
        if self.members.contains_key(&conn_id) {
            return Err(RoomError::AlreadyInRoom(conn_id, self.room_id.clone()));
        }

        self.members.insert(
            conn_id,
            Member {
                sender,
                registration: None,
            },
        );
        tracing::info!(
            room_id = %self.room_id,
            %conn_id,
            connected = self.members.len(),
            "member admitted"
        );
        Ok(())
    }

    fn handle_register(
        &mut self,
        conn_id: ConnectionId,
        nickname: String,
    ) -> Result<(), RoomError> {
        let Some(member) = self.members.get(&conn_id) else {
            return Err(RoomError::NotMember(conn_id, self.room_id.clone()));
        };
        if member.registration.is_some() {
            return Err(RoomError::AlreadyRegistered(conn_id));
        }

        if self.is_nickname_taken(&nickname) {
            tracing::info!(
                room_id = %self.room_id,
                %conn_id,
                %nickname,
                "nickname taken, rejecting"
            );
            self.reject(conn_id, ServerMessage::NicknameTaken);
            return Err(RoomError::NicknameTaken(nickname));
        }
        if self.registered_count() >= self.config.capacity {
            tracing::info!(room_id = %self.room_id, %conn_id, "room full, rejecting");
            self.reject(conn_id, ServerMessage::RoomFull);
            return Err(RoomError::RoomFull(self.room_id.clone()));
        }

        let order = self.next_registration;
        self.next_registration += 1;
        if let Some(member) = self.members.get_mut(&conn_id) {
            member.registration = Some(Registration {
                nickname: nickname.clone(),
                order,
            });
        }
        tracing::info!(
            room_id = %self.room_id,
            %conn_id,
            %nickname,
            players = self.registered_count(),
            "member registered"
        );

        // Late joiners catch up on the lobby chat before anything else.
        for record in &self.history {
            self.send_to(conn_id, ServerMessage::Chat(record.clone()));
        }

        self.broadcast_player_count();
        self.check_auto_start();
        Ok(())
    }

    fn handle_chat(&mut self, conn_id: ConnectionId, message: String) {
        let Some(nickname) = self
            .members
            .get(&conn_id)
            .and_then(Member::nickname)
            .map(str::to_owned)
        else {
            tracing::debug!(
                room_id = %self.room_id,
                %conn_id,
                "chat from unregistered member, ignoring"
            );
            return;
        };

        let record = ChatRecord {
            nickname,
            message,
            timestamp: self.next_timestamp(),
            room_id: self.room_id.clone(),
        };
        self.history.push(record.clone());
        self.broadcast(&ServerMessage::Chat(record));
    }

    fn handle_relay(&mut self, conn_id: ConnectionId, message: ServerMessage) {
        let registered = self
            .members
            .get(&conn_id)
            .is_some_and(|m| m.registration.is_some());
        if !registered {
            tracing::debug!(
                room_id = %self.room_id,
                %conn_id,
                "relay from unregistered member, ignoring"
            );
            return;
        }
        self.broadcast_except(conn_id, &message);
    }

    fn handle_leave(&mut self, conn_id: ConnectionId) -> Result<(), RoomError> {
        if !self.members.contains_key(&conn_id) {
            return Err(RoomError::NotMember(conn_id, self.room_id.clone()));
        }
        self.remove_member(conn_id);
        Ok(())
    }

    /// Sends `reason` to the member, then removes it like any departure.
    fn reject(&mut self, conn_id: ConnectionId, reason: ServerMessage) {
        self.send_to(conn_id, reason);
        self.remove_member(conn_id);
    }

    fn remove_member(&mut self, conn_id: ConnectionId) {
        let Some(member) = self.members.remove(&conn_id) else {
            return;
        };
        tracing::info!(
            room_id = %self.room_id,
            %conn_id,
            nickname = ?member.nickname(),
            connected = self.members.len(),
            "member left"
        );
        self.broadcast_player_count();
        self.check_auto_start();
    }

    // -- Auto-start --------------------------------------------------------

    /// Re-evaluates the countdown after any membership change.
    ///
    /// Every call restarts the countdown, so it always reflects the
    /// latest head count. No-op once the game is running.
    fn check_auto_start(&mut self) {
        if self.status == RoomStatus::InGame {
            return;
        }

        let registered = self.registered_count();
        let seconds = match registered {
            0 => return,
            n if n >= self.config.capacity => self.config.full_room_countdown_secs,
            _ => self.config.small_room_countdown_secs,
        };

        tracing::info!(
            room_id = %self.room_id,
            players = registered,
            seconds,
            restarted = self.countdown.is_running(),
            "countdown started"
        );
        self.countdown.start(seconds);
    }

    fn on_countdown_tick(&mut self, seconds: i32) {
        self.broadcast(&ServerMessage::Countdown { seconds });
        if seconds <= 0 {
            self.countdown.cancel();
            self.start_game();
        }
    }

    fn start_game(&mut self) {
        self.status = RoomStatus::InGame;

        let mut registered: Vec<&Registration> = self
            .members
            .values()
            .filter_map(|m| m.registration.as_ref())
            .collect();
        registered.sort_by_key(|r| r.order);

        let players: Vec<PlayerInfo> = registered
            .iter()
            .enumerate()
            .map(|(slot, r)| {
                let (x, y) = self.config.spawn_position(slot);
                PlayerInfo {
                    nickname: r.nickname.clone(),
                    x,
                    y,
                }
            })
            .collect();

        tracing::info!(
            room_id = %self.room_id,
            players = players.len(),
            "game started"
        );
        self.broadcast(&ServerMessage::StartGame {
            players,
            map: self.map.clone(),
        });
    }

    // -- Delivery ----------------------------------------------------------

    fn broadcast_player_count(&self) {
        self.broadcast(&ServerMessage::PlayerCount {
            count: self.registered_count(),
            room_id: self.room_id.clone(),
        });
    }

    fn broadcast(&self, msg: &ServerMessage) {
        for (conn_id, member) in &self.members {
            self.deliver(*conn_id, member, msg.clone());
        }
    }

    fn broadcast_except(&self, excluded: ConnectionId, msg: &ServerMessage) {
        for (conn_id, member) in &self.members {
            if *conn_id != excluded {
                self.deliver(*conn_id, member, msg.clone());
            }
        }
    }

    fn send_to(&self, conn_id: ConnectionId, msg: ServerMessage) {
        if let Some(member) = self.members.get(&conn_id) {
            self.deliver(conn_id, member, msg);
        }
    }

    /// Best effort. A full queue means the member is not keeping up and
    /// loses this message. A closed one means its writer is gone; the
    /// reader will report the departure.
    fn deliver(&self, conn_id: ConnectionId, member: &Member, msg: ServerMessage) {
        match member.sender.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::debug!(
                    room_id = %self.room_id,
                    %conn_id,
                    "member outbox full, message dropped"
                );
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(
                    room_id = %self.room_id,
                    %conn_id,
                    "member channel closed, message dropped"
                );
            }
        }
    }

    // -- Queries -----------------------------------------------------------

    fn registered_count(&self) -> usize {
        self.members
            .values()
            .filter(|m| m.registration.is_some())
            .count()
    }

    fn is_nickname_taken(&self, nickname: &str) -> bool {
        self.members
            .values()
            .any(|m| m.nickname() == Some(nickname))
    }

    /// Wall-clock milliseconds, never going backwards within this room.
    fn next_timestamp(&mut self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64);
        self.last_timestamp = self.last_timestamp.max(now);
        self.last_timestamp
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id.clone(),
            status: self.status,
            registered: self.registered_count(),
            connected: self.members.len(),
            capacity: self.config.capacity,
        }
    }
}

/// Spawns a new room actor task and returns a handle to it.
///
/// `channel_size` bounds the command queue; senders wait when it is full.
pub(crate) fn spawn_room(
    room_id: RoomId,
    config: RoomConfig,
    map: GameMap,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = RoomActor {
        room_id: room_id.clone(),
        status: RoomStatus::Waiting,
        countdown: Countdown::new(config.tick_interval),
        config,
        members: HashMap::new(),
        history: Vec::new(),
        map,
        next_registration: 0,
        last_timestamp: 0,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
