//! `TavernServer` builder and accept loop.
//!
//! This is the entry point for running a relay. It ties together all the
//! layers: transport → protocol → router (session + rooms + entities) →
//! dispatcher.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tavern_entity::EntityGateway;
use tavern_protocol::{Codec, JsonCodec};
use tavern_room::{DispatchConfig, Dispatcher};
use tavern_session::Authenticator;
use tavern_transport::{Transport, WebSocketConnection, WebSocketTransport};

use crate::TavernError;
use crate::handler::handle_connection;
use crate::router::{RelayConfig, Router};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The router
/// and dispatcher carry their own locks.
pub(crate) struct ServerState<E: EntityGateway, A: Authenticator, C: Codec> {
    pub(crate) router: Router<E, A>,
    pub(crate) dispatcher: Dispatcher<WebSocketConnection>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Option<Duration>,
}

/// Builder for configuring and starting a Tavern relay.
///
/// # Example
///
/// ```rust,no_run
/// use tavern::{MemoryGateway, OpenAuthenticator, TavernServerBuilder};
///
/// # async fn start() -> Result<(), tavern::TavernError> {
/// let server = TavernServerBuilder::new()
///     .bind("0.0.0.0:5000")
///     .build(MemoryGateway::new(), OpenAuthenticator)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct TavernServerBuilder {
    bind_addr: String,
    relay_config: RelayConfig,
    dispatch_config: DispatchConfig,
    idle_timeout: Option<Duration>,
}

impl TavernServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            relay_config: RelayConfig::default(),
            dispatch_config: DispatchConfig::default(),
            idle_timeout: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the routing policy.
    pub fn relay_config(mut self, config: RelayConfig) -> Self {
        self.relay_config = config;
        self
    }

    /// Bounds every outbound write.
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_config.send_timeout = timeout;
        self
    }

    /// Drops connections that stay silent for this long. Off by default.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Binds the listener and assembles the relay.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build<E: EntityGateway, A: Authenticator>(
        self,
        gateway: E,
        auth: A,
    ) -> Result<TavernServer<E, A, JsonCodec>, TavernError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            router: Router::new(gateway, auth, self.relay_config),
            dispatcher: Dispatcher::new(self.dispatch_config),
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(TavernServer { transport, state })
    }
}

impl Default for TavernServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Tavern relay.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TavernServer<E: EntityGateway, A: Authenticator, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<E, A, C>>,
}

impl<E, A, C> TavernServer<E, A, C>
where
    E: EntityGateway,
    A: Authenticator,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The router, for seeding or inspecting relay state.
    pub fn router(&self) -> &Router<E, A> {
        &self.state.router
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), TavernError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// Each accepted connection gets its own task. Connections already
    /// open keep running after the listener stops.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), TavernError> {
        tracing::info!(addr = ?self.local_addr().ok(), "tavern relay running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
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
                },
            }
        }

        self.transport.shutdown().await?;
        tracing::info!("tavern relay stopped");
        Ok(())
    }
}
