//! Error types for the session layer.

use tavern_transport::ConnectionId;

/// Errors raised by the connection registry and authenticators.
///
/// None of these are fatal: the router answers the sender or logs and
/// moves on.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The connection is not (or no longer) registered.
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    /// A host join was refused by the [`Authenticator`](crate::Authenticator).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested identity is malformed, e.g. a player without an id.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),
}
