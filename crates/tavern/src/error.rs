//! Unified error type for the Tavern relay.

use tavern_entity::GatewayError;
use tavern_protocol::ProtocolError;
use tavern_room::RoomError;
use tavern_session::SessionError;
use tavern_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TavernError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (unknown connection, auth, identity).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (delivery).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The entity store refused a read or write.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl TavernError {
    /// The numeric code reported to a client in an `error` event.
    pub fn code(&self) -> u16 {
        match self {
            TavernError::Protocol(_) => 400,
            TavernError::Session(SessionError::AuthFailed(_)) => 401,
            TavernError::Session(SessionError::InvalidIdentity(_)) => 400,
            TavernError::Gateway(GatewayError::NotFound(_)) => 404,
            TavernError::Gateway(GatewayError::Conflict(_)) => 409,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tavern_protocol::{EntityRef, PlayerId};
    use tavern_transport::ConnectionId;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let tavern_err: TavernError = err.into();
        assert!(matches!(tavern_err, TavernError::Transport(_)));
        assert!(tavern_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let tavern_err: TavernError = err.into();
        assert!(matches!(tavern_err, TavernError::Protocol(_)));
        assert_eq!(tavern_err.code(), 400);
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::AuthFailed("nope".into());
        let tavern_err: TavernError = err.into();
        assert!(matches!(tavern_err, TavernError::Session(_)));
        assert_eq!(tavern_err.code(), 401);
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotAttached(ConnectionId::new(1));
        let tavern_err: TavernError = err.into();
        assert!(matches!(tavern_err, TavernError::Room(_)));
    }

    #[test]
    fn test_gateway_error_codes() {
        let missing: TavernError =
            GatewayError::NotFound(EntityRef::player(PlayerId(3))).into();
        let conflict: TavernError = GatewayError::Conflict("x".into()).into();
        assert_eq!(missing.code(), 404);
        assert_eq!(conflict.code(), 409);
    }
}
