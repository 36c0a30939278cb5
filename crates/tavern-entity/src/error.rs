//! Error types for the entity layer.

use tavern_protocol::EntityRef;

/// Why the entity store refused a read or an update.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// No record exists for this reference.
    #[error("{0} not found")]
    NotFound(EntityRef),

    /// The update would leave the record in an invalid state. Nothing was
    /// written.
    #[error("update rejected: {0}")]
    Conflict(String),
}
