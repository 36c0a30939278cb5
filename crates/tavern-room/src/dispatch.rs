//! Broadcast dispatcher: writes one payload to many connections.
//!
//! The dispatcher owns the table of live links, separate from the relay's
//! registry/membership state. The router resolves *who* gets an event
//! under its own lock; the dispatcher only knows how to reach them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tavern_transport::{Connection, ConnectionId, TransportError};
use tokio::sync::RwLock;

use crate::RoomError;

/// Settings for outbound delivery.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Upper bound on a single transport write. A stalled client costs at
    /// most this much and never holds up other recipients.
    pub send_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(2),
        }
    }
}

/// Outcome of one [`Dispatcher::deliver`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Recipients the payload was written to.
    pub delivered: usize,
    /// Recipients that could not be reached.
    pub failed: usize,
    /// Per-recipient failure reasons.
    pub failures: Vec<RoomError>,
}

impl DeliveryReport {
    /// Returns `true` if every recipient got the payload.
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }

    /// Folds another report into this one.
    pub fn merge(&mut self, other: DeliveryReport) {
        self.delivered += other.delivered;
        self.failed += other.failed;
        self.failures.extend(other.failures);
    }
}

/// Fans payloads out to attached connections.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct Dispatcher<C: Connection> {
    links: RwLock<HashMap<ConnectionId, Arc<C>>>,
    config: DispatchConfig,
}

impl<C: Connection> Dispatcher<C> {
    /// Creates a dispatcher with no attached links.
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            links: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Makes a connection reachable. Replaces any link with the same id.
    pub async fn attach(&self, conn: Arc<C>) {
        let conn_id = conn.id();
        self.links.write().await.insert(conn_id, conn);
        tracing::debug!(%conn_id, "link attached");
    }

    /// Makes a connection unreachable and returns its link, if any.
    pub async fn detach(&self, conn_id: ConnectionId) -> Option<Arc<C>> {
        let link = self.links.write().await.remove(&conn_id);
        if link.is_some() {
            tracing::debug!(%conn_id, "link detached");
        }
        link
    }

    /// Returns `true` if a link is attached for `conn_id`.
    pub async fn is_attached(&self, conn_id: ConnectionId) -> bool {
        self.links.read().await.contains_key(&conn_id)
    }

    /// Number of attached links.
    pub async fn len(&self) -> usize {
        self.links.read().await.len()
    }

    /// Returns `true` if no link is attached.
    pub async fn is_empty(&self) -> bool {
        self.links.read().await.is_empty()
    }

    /// Writes `payload` to every recipient, concurrently.
    ///
    /// Duplicate ids are delivered once. A recipient that is not attached,
    /// whose write fails, or whose write exceeds `send_timeout` is counted
    /// as failed; the others are unaffected. There are no retries.
    pub async fn deliver(
        &self,
        recipients: &[ConnectionId],
        payload: &[u8],
    ) -> DeliveryReport {
        let mut ids = recipients.to_vec();
        ids.sort();
        ids.dedup();

        // Snapshot the links, then release the lock before any I/O.
        let targets: Vec<(ConnectionId, Option<Arc<C>>)> = {
            let links = self.links.read().await;
            ids.into_iter()
                .map(|id| (id, links.get(&id).cloned()))
                .collect()
        };

        let timeout = self.config.send_timeout;
        let attempts = targets.into_iter().map(|(conn_id, link)| async move {
            let Some(conn) = link else {
                return Err(RoomError::NotAttached(conn_id));
            };
            match tokio::time::timeout(timeout, conn.send(payload)).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(RoomError::DeliveryFailed {
                    conn: conn_id,
                    reason: e.to_string(),
                }),
                Err(_) => Err(RoomError::DeliveryFailed {
                    conn: conn_id,
                    reason: TransportError::Timeout(timeout).to_string(),
                }),
            }
        });

        let mut report = DeliveryReport::default();
        for outcome in join_all(attempts).await {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "delivery failed");
                    report.failed += 1;
                    report.failures.push(e);
                }
            }
        }
        report
    }
}
