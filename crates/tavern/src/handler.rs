//! Per-connection handler: register, read loop, route, fan out.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register with the router and attach to the dispatcher
//!   2. Loop: receive a frame → decode → route → encode → deliver
//!   3. On exit (clean close, error, idle timeout, or panic) the guard
//!      detaches and unregisters the connection

use std::sync::Arc;

use tavern_entity::EntityGateway;
use tavern_protocol::{ClientEvent, Codec, Envelope, ServerEvent};
use tavern_room::DeliveryReport;
use tavern_session::Authenticator;
use tavern_transport::{Connection, ConnectionId, WebSocketConnection};

use crate::TavernError;
use crate::router::Outbound;
use crate::server::ServerState;

/// Drop guard that removes a connection from the relay when the handler
/// exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async locks.
struct ConnectionGuard<E: EntityGateway, A: Authenticator, C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<E, A, C>>,
}

impl<E: EntityGateway, A: Authenticator, C: Codec> Drop
    for ConnectionGuard<E, A, C>
{
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.dispatcher.detach(conn_id).await;
            state.router.disconnect(conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<E, A, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<E, A, C>>,
) -> Result<(), TavernError>
where
    E: EntityGateway,
    A: Authenticator,
    C: Codec,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::info!(%conn_id, "connection opened");

    state.router.connect(conn_id).await;
    state.dispatcher.attach(Arc::clone(&conn)).await;
    let _guard = ConnectionGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    loop {
        let received = match state.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, conn.recv()).await {
                Ok(received) => received,
                Err(_) => {
                    tracing::info!(%conn_id, "connection idle, closing");
                    break;
                }
            },
            None => conn.recv().await,
        };

        let data = match received {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let outbound = match state.codec.decode::<ClientEvent>(&data) {
            Ok(event) => state.router.route(conn_id, event).await,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "rejecting malformed event");
                vec![Outbound::to_sender(
                    conn_id,
                    ServerEvent::error(400, e.to_string()),
                )]
            }
        };

        let report = deliver_all(&state, outbound).await?;
        if !report.is_complete() {
            tracing::debug!(
                %conn_id,
                delivered = report.delivered,
                failed = report.failed,
                "partial delivery"
            );
        }
    }

    let _ = conn.close().await;
    // _guard drops here → detach + disconnect fire.
    Ok(())
}

/// Stamps, encodes, and fans out each outbound event in order.
async fn deliver_all<E, A, C>(
    state: &ServerState<E, A, C>,
    outbound: Vec<Outbound>,
) -> Result<DeliveryReport, TavernError>
where
    E: EntityGateway,
    A: Authenticator,
    C: Codec,
{
    let mut report = DeliveryReport::default();
    for Outbound {
        recipients, event, ..
    } in outbound
    {
        if recipients.is_empty() {
            tracing::debug!(event = event.kind(), "no recipients");
            continue;
        }
        let bytes = state.codec.encode(&Envelope::now(event))?;
        report.merge(state.dispatcher.deliver(&recipients, &bytes).await);
    }
    Ok(report)
}
