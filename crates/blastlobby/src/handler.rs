//! Per-connection handler: handshake, placement, message routing, cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Complete the WebSocket handshake within the configured timeout
//!   2. Place the connection into a waiting room (or a new one)
//!   3. Spawn a writer task draining the member's bounded outbox
//!   4. Loop: receive client messages → forward to the room
//!   5. Leave the room; the writer closes the socket once the outbox ends

use std::sync::Arc;

use blastlobby_protocol::{ClientMessage, Codec, ServerMessage};
use blastlobby_room::{RoomError, RoomHandle};
use blastlobby_transport::{
    Connection, PendingConnection, PendingWebSocket, TransportError,
    WebSocketConnection,
};
use tokio::sync::mpsc;

use crate::BlastlobbyError;
use crate::server::ServerState;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    pending: PendingWebSocket,
    state: Arc<ServerState<C>>,
) -> Result<(), BlastlobbyError> {
    let peer = pending.peer_addr();
    let conn = match tokio::time::timeout(
        state.handshake_timeout,
        pending.upgrade(),
    )
    .await
    {
        Ok(Ok(conn)) => Arc::new(conn),
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            tracing::info!(%peer, "handshake timed out");
            return Err(TransportError::HandshakeTimedOut(peer).into());
        }
    };
    let conn_id = conn.id();
    tracing::debug!(%conn_id, %peer, "handling new connection");

    let (outbox_tx, outbox_rx) = mpsc::channel(state.outbox_capacity);

    // Lock only for placement, drop before any network I/O.
    let (room, room_count) = {
        let mut rooms = state.rooms.lock().await;
        let room = rooms.join_or_create(conn_id, outbox_tx).await?;
        (room, rooms.room_count())
    };
    tracing::info!(
        %conn_id,
        room_id = %room.room_id(),
        rooms = room_count,
        "connection placed"
    );

    let writer = tokio::spawn(write_outbox(
        Arc::clone(&conn),
        Arc::clone(&state),
        outbox_rx,
    ));

    let result = read_messages(&conn, &state, &room).await;

    // The room drops this member's outbox sender, which ends the writer.
    match room.leave(conn_id).await {
        Ok(()) | Err(RoomError::NotMember(..)) => {}
        Err(e) => tracing::debug!(%conn_id, error = %e, "leave failed"),
    }
    if let Err(e) = writer.await {
        tracing::warn!(%conn_id, error = %e, "writer task failed");
    }

    result
}

/// Forwards client messages to the room until the session ends.
async fn read_messages<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    room: &RoomHandle,
) -> Result<(), BlastlobbyError> {
    let conn_id = conn.id();

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                return Err(e.into());
            }
        };

        let msg: ClientMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode message");
                continue;
            }
        };

        match msg {
            ClientMessage::Register { nickname } => {
                match room.register(conn_id, nickname).await {
                    Ok(()) => {}
                    Err(e) if e.ends_session() => {
                        tracing::info!(%conn_id, reason = %e, "registration refused");
                        return Ok(());
                    }
                    Err(RoomError::Unavailable(room_id)) => {
                        return Err(RoomError::Unavailable(room_id).into());
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "register ignored");
                    }
                }
            }
            ClientMessage::Chat { message } => {
                room.chat(conn_id, message).await?;
            }
            ClientMessage::Unknown => {
                tracing::debug!(%conn_id, "ignoring unknown message type");
            }
            relayed => {
                if let Some(out) = relayed.into_relay() {
                    room.relay(conn_id, out).await?;
                }
            }
        }
    }
}

/// Encodes and sends everything the room queues for this member, in
/// order, then closes the connection.
async fn write_outbox<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut outbox: mpsc::Receiver<ServerMessage>,
) {
    let conn_id = conn.id();

    while let Some(msg) = outbox.recv().await {
        let bytes = match state.codec.encode(&msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to encode message");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }

    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
}
