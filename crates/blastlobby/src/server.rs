//! `Server` builder and accept loop.
//!
//! This is the entry point for running a Blastlobby server. It ties
//! together all the layers: transport → protocol → room.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use blastlobby_protocol::{Codec, JsonCodec};
use blastlobby_room::{RoomConfig, RoomManager};
use blastlobby_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::BlastlobbyError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The manager
/// lock serializes matchmaking; rooms themselves are never locked.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) rooms: Mutex<RoomManager>,
    pub(crate) codec: C,
    pub(crate) handshake_timeout: Duration,
    pub(crate) outbox_capacity: usize,
}

/// Builder for configuring and starting a Blastlobby server.
///
/// # Example
///
/// ```rust,no_run
/// use blastlobby::prelude::*;
///
/// # async fn start() -> Result<(), BlastlobbyError> {
/// let server = Server::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    handshake_timeout: Duration,
    outbox_capacity: usize,
}

impl ServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room_config: RoomConfig::default(),
            handshake_timeout: Duration::from_secs(5),
            outbox_capacity: 256,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration every room is created with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets how long a client may take to complete the WebSocket
    /// handshake before it is dropped.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets how many outbound messages may queue for one client. Messages
    /// beyond that are dropped for that client only.
    pub fn outbox_capacity(mut self, capacity: usize) -> Self {
        self.outbox_capacity = capacity.max(1);
        self
    }

    /// Binds the listener and prepares the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<Server<JsonCodec>, BlastlobbyError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            rooms: Mutex::new(RoomManager::new(self.room_config)),
            codec: JsonCodec,
            handshake_timeout: self.handshake_timeout,
            outbox_capacity: self.outbox_capacity,
        });

        Ok(Server { transport, state })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Blastlobby server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct Server<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl Server<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }
}

impl<C: Codec> Server<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), BlastlobbyError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// Each accepted connection gets its own handler task, which also runs
    /// the WebSocket handshake, so a stalled client never holds up the
    /// loop. On shutdown the listener stops accepting and every room is
    /// shut down, which closes all client connections.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), BlastlobbyError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!(addr = ?self.local_addr().ok(), "Blastlobby server running");

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(pending) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(pending, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracing::info!("shutdown requested");
        self.transport.shutdown().await?;
        self.state.rooms.lock().await.shutdown_all().await;
        Ok(())
    }
}
