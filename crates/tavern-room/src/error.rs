//! Error types for the room layer.

use tavern_transport::ConnectionId;

/// Why a single recipient did not get a payload.
///
/// These are recorded in a [`DeliveryReport`](crate::DeliveryReport) and
/// never abort delivery to the remaining recipients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No live link is attached for this connection (already gone).
    #[error("connection {0} is not attached")]
    NotAttached(ConnectionId),

    /// The transport write failed or did not finish in time.
    #[error("delivery to {conn} failed: {reason}")]
    DeliveryFailed { conn: ConnectionId, reason: String },
}
