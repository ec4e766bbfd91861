//! Integration tests for the Blastlobby server, handler, and full
//! connection flow over real loopback WebSockets.

use std::time::Duration;

use blastlobby::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::io::AsyncReadExt;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Rooms that never start on their own during a test.
fn lobby_config() -> RoomConfig {
    RoomConfig {
        full_room_countdown_secs: 3600,
        small_room_countdown_secs: 3600,
        ..RoomConfig::default()
    }
}

/// Rooms that start almost immediately.
fn fast_config() -> RoomConfig {
    RoomConfig {
        tick_interval: Duration::from_millis(50),
        ..RoomConfig::default()
    }
}

/// Starts a server on a random port and returns the address.
async fn start_server(config: RoomConfig) -> String {
    let server = Server::builder()
        .bind("127.0.0.1:0")
        .room_config(config)
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send_json(ws: &mut ClientWs, value: Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("send");
}

async fn recv_json(ws: &mut ClientWs) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for message")
        .expect("stream ended")
        .expect("websocket error");
    serde_json::from_slice(&msg.into_data()).expect("server sends JSON")
}

/// Registers and waits for the resulting player count.
async fn register(ws: &mut ClientWs, nickname: &str) -> Value {
    send_json(ws, json!({ "type": "register", "nickname": nickname })).await;
    loop {
        let msg = recv_json(ws).await;
        if msg["type"] == "player_count" {
            return msg;
        }
    }
}

/// `true` once the server has closed the connection.
async fn closed(ws: &mut ClientWs) -> bool {
    loop {
        match tokio::time::timeout(Duration::from_secs(2), ws.next()).await {
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) | Ok(Some(Err(_))) => {
                return true;
            }
            Ok(Some(Ok(_))) => continue,
            Err(_) => return false,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_local_addr_has_assigned_port() {
    let server = Server::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");
    assert_ne!(server.local_addr().unwrap().port(), 0);
}

#[tokio::test]
async fn test_bind_invalid_address_fails() {
    let result = Server::builder().bind("not an address").build().await;
    assert!(matches!(result, Err(BlastlobbyError::Transport(_))));
}

#[tokio::test]
async fn test_register_gets_player_count() {
    let addr = start_server(lobby_config()).await;
    let mut ws = connect(&addr).await;

    let count = register(&mut ws, "ann").await;
    assert_eq!(
        count,
        json!({ "type": "player_count", "count": 1, "roomId": "room_0" })
    );
}

#[tokio::test]
async fn test_duplicate_nickname_is_rejected_and_closed() {
    let addr = start_server(lobby_config()).await;
    let mut ann = connect(&addr).await;
    register(&mut ann, "ann").await;

    let mut imposter = connect(&addr).await;
    send_json(&mut imposter, json!({ "type": "register", "nickname": "ann" }))
        .await;

    assert_eq!(recv_json(&mut imposter).await, json!({ "type": "nickname_taken" }));
    assert!(closed(&mut imposter).await, "rejected client should be closed");

    // The departure is announced to the room.
    let count = recv_json(&mut ann).await;
    assert_eq!(count["type"], "player_count");
    assert_eq!(count["count"], 1);
}

#[tokio::test]
async fn test_chat_is_echoed_and_replayed_to_late_joiners() {
    let addr = start_server(lobby_config()).await;
    let mut ann = connect(&addr).await;
    register(&mut ann, "ann").await;

    send_json(&mut ann, json!({ "type": "chat", "message": "hi all" })).await;
    let echo = recv_json(&mut ann).await;
    assert_eq!(echo["type"], "chat");
    assert_eq!(echo["nickname"], "ann");
    assert_eq!(echo["message"], "hi all");
    assert_eq!(echo["roomId"], "room_0");
    assert!(echo["timestamp"].as_u64().is_some());

    let mut bob = connect(&addr).await;
    send_json(&mut bob, json!({ "type": "register", "nickname": "bob" })).await;
    let replayed = recv_json(&mut bob).await;
    assert_eq!(replayed, echo);
    let count = recv_json(&mut bob).await;
    assert_eq!(
        count,
        json!({ "type": "player_count", "count": 2, "roomId": "room_0" })
    );
}

#[tokio::test]
async fn test_player_move_is_relayed_to_others_only() {
    let addr = start_server(lobby_config()).await;
    let mut ann = connect(&addr).await;
    register(&mut ann, "ann").await;
    let mut bob = connect(&addr).await;
    register(&mut bob, "bob").await;
    // ann also hears bob's arrival.
    assert_eq!(recv_json(&mut ann).await["count"], 2);

    let step = json!({
        "type": "player_move",
        "nickname": "ann",
        "position": { "x": 100, "y": 50 },
        "direction": "right",
    });
    send_json(&mut ann, step.clone()).await;
    assert_eq!(recv_json(&mut bob).await, step);

    // Anything ann receives next must come after her move was handled.
    send_json(&mut bob, json!({ "type": "chat", "message": "nice" })).await;
    let next = recv_json(&mut ann).await;
    assert_eq!(next["type"], "chat");
    assert_eq!(next["nickname"], "bob");
}

#[tokio::test]
async fn test_bomb_placed_is_relayed() {
    let addr = start_server(lobby_config()).await;
    let mut ann = connect(&addr).await;
    register(&mut ann, "ann").await;
    let mut bob = connect(&addr).await;
    register(&mut bob, "bob").await;

    let bomb = json!({ "type": "bomb_placed", "x": 3, "y": 4, "range": 2 });
    send_json(&mut bob, bomb.clone()).await;

    // Skip bob's arrival count.
    assert_eq!(recv_json(&mut ann).await["type"], "player_count");
    assert_eq!(recv_json(&mut ann).await, bomb);
}

#[tokio::test]
async fn test_garbage_and_unknown_types_are_ignored() {
    let addr = start_server(lobby_config()).await;
    let mut ws = connect(&addr).await;
    register(&mut ws, "ann").await;

    ws.send(Message::text("not json".to_string())).await.expect("send");
    send_json(&mut ws, json!({ "type": "dance", "style": "robot" })).await;
    send_json(&mut ws, json!({ "nickname": "no type" })).await;

    // The connection survives and still works.
    send_json(&mut ws, json!({ "type": "chat", "message": "still here" })).await;
    let msg = recv_json(&mut ws).await;
    assert_eq!(msg["type"], "chat");
    assert_eq!(msg["message"], "still here");
}

#[tokio::test]
async fn test_single_player_game_starts() {
    let addr = start_server(fast_config()).await;
    let mut ws = connect(&addr).await;
    register(&mut ws, "solo").await;

    assert_eq!(
        recv_json(&mut ws).await,
        json!({ "type": "countdown", "seconds": -1 })
    );

    let start = recv_json(&mut ws).await;
    assert_eq!(start["type"], "start_game");
    assert_eq!(
        start["players"],
        json!([{ "nickname": "solo", "x": 50, "y": 50 }])
    );

    let rows = start["map"].as_array().expect("map is an array of rows");
    assert_eq!(rows.len(), 13);
    for row in rows {
        let cells = row.as_array().expect("row is an array");
        assert_eq!(cells.len(), 15);
        assert!(cells.iter().all(|c| matches!(c.as_u64(), Some(0..=2))));
    }
}

#[tokio::test]
async fn test_fifth_connection_lands_in_next_room() {
    let addr = start_server(lobby_config()).await;

    let mut clients = Vec::new();
    for name in ["a", "b", "c", "d"] {
        let mut ws = connect(&addr).await;
        let count = register(&mut ws, name).await;
        assert_eq!(count["roomId"], "room_0");
        clients.push(ws);
    }

    let mut fifth = connect(&addr).await;
    let count = register(&mut fifth, "e").await;
    assert_eq!(
        count,
        json!({ "type": "player_count", "count": 1, "roomId": "room_1" })
    );
}

#[tokio::test]
async fn test_departure_updates_player_count() {
    let addr = start_server(lobby_config()).await;
    let mut ann = connect(&addr).await;
    register(&mut ann, "ann").await;
    let mut bob = connect(&addr).await;
    register(&mut bob, "bob").await;
    assert_eq!(recv_json(&mut ann).await["count"], 2);

    bob.close(None).await.expect("close");

    let count = recv_json(&mut ann).await;
    assert_eq!(count["type"], "player_count");
    assert_eq!(count["count"], 1);
}

#[tokio::test]
async fn test_shutdown_closes_clients() {
    let server = Server::builder()
        .bind("127.0.0.1:0")
        .room_config(lobby_config())
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr().unwrap().to_string();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let running = tokio::spawn(server.run_until(async {
        let _ = stop_rx.await;
    }));

    let mut ws = connect(&addr).await;
    register(&mut ws, "ann").await;

    stop_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(2), running)
        .await
        .expect("server should stop")
        .expect("server task should not panic");
    assert!(result.is_ok());
    assert!(closed(&mut ws).await, "client should be disconnected");
}

#[tokio::test]
async fn test_stalled_handshake_does_not_block_other_clients() {
    let server = Server::builder()
        .bind("127.0.0.1:0")
        .room_config(lobby_config())
        .handshake_timeout(Duration::from_millis(300))
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Opens TCP but never sends the upgrade request.
    let mut silent = tokio::net::TcpStream::connect(&addr)
        .await
        .expect("tcp connect");

    let count = tokio::time::timeout(Duration::from_secs(2), async {
        let mut ws = connect(&addr).await;
        register(&mut ws, "ann").await
    })
    .await
    .expect("a healthy client must not wait on a stalled handshake");
    assert_eq!(count["count"], 1);

    // The silent peer is dropped once its handshake deadline passes.
    let mut buf = [0u8; 1];
    let read = tokio::time::timeout(Duration::from_secs(2), silent.read(&mut buf))
        .await
        .expect("stalled peer should be disconnected");
    assert!(matches!(read, Ok(0) | Err(_)));
}
