//! `GambitServer` builder and accept loop.
//!
//! This is the entry point for running a Gambit match server. It ties
//! together all the layers: transport, protocol, session, rooms.

use std::sync::Arc;

use gambit_countdown::CountdownConfig;
use gambit_protocol::JsonCodec;
use gambit_room::{RoomStore, RulesFactory};
use gambit_session::{
    ConnectionRegistry, IdentityStore, MessageStore, RelationshipStore,
};
use gambit_transport::{Listener, WebSocketListener};
use tokio::sync::Mutex;

use crate::GambitError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// registry and room store sit behind `Mutex`; the external stores are
/// `Sync` and handle their own concurrency.
pub(crate) struct ServerState<I, R, M> {
    pub(crate) registry: Mutex<ConnectionRegistry>,
    pub(crate) rooms: Mutex<RoomStore>,
    pub(crate) identity: I,
    pub(crate) relationships: R,
    pub(crate) messages: M,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting a Gambit server.
///
/// # Example
///
/// ```rust,ignore
/// use gambit::GambitServer;
///
/// let server = GambitServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(identity, relationships, messages, rules)
///     .await?;
/// server.run().await
/// ```
pub struct GambitServerBuilder {
    bind_addr: String,
    countdown: CountdownConfig,
}

impl GambitServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            countdown: CountdownConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Overrides the pre-match countdown (tests use short intervals).
    pub fn countdown(mut self, countdown: CountdownConfig) -> Self {
        self.countdown = countdown;
        self
    }

    /// Builds and binds the server against the given external stores
    /// and rules engine factory.
    pub async fn build<I, R, M>(
        self,
        identity: I,
        relationships: R,
        messages: M,
        rules: Arc<dyn RulesFactory>,
    ) -> Result<GambitServer<I, R, M>, GambitError>
    where
        I: IdentityStore,
        R: RelationshipStore,
        M: MessageStore,
    {
        let listener = WebSocketListener::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: Mutex::new(ConnectionRegistry::new()),
            rooms: Mutex::new(RoomStore::new(rules, self.countdown)),
            identity,
            relationships,
            messages,
            codec: JsonCodec,
        });

        Ok(GambitServer { listener, state })
    }
}

impl Default for GambitServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Gambit match server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct GambitServer<I, R, M> {
    listener: WebSocketListener,
    state: Arc<ServerState<I, R, M>>,
}

impl<I, R, M> GambitServer<I, R, M>
where
    I: IdentityStore,
    R: RelationshipStore,
    M: MessageStore,
{
    /// Creates a new builder.
    pub fn builder() -> GambitServerBuilder {
        GambitServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a handler task per accepted connection. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), GambitError> {
        tracing::info!("Gambit server running");

        loop {
            match self.listener.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await
                        {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
