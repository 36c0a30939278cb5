//! The seam between the relay and wherever character records live.

use std::future::Future;

use tavern_protocol::EntityRef;

use crate::{EntitySnapshot, FieldChange, GatewayError};

/// Read and write access to character records.
///
/// The relay calls this from connection tasks, so the returned futures
/// must be `Send`; implementations can still be written as `async fn`.
///
/// `apply_update` is all-or-nothing: either every change in the batch is
/// written, or none is and an error comes back.
pub trait EntityGateway: Send + Sync + 'static {
    /// Fetches a copy of a record.
    ///
    /// # Errors
    /// [`GatewayError::NotFound`] if the record does not exist.
    fn get_entity(
        &self,
        entity: EntityRef,
    ) -> impl Future<Output = Result<EntitySnapshot, GatewayError>> + Send;

    /// Applies a batch of changes to one record.
    ///
    /// # Errors
    /// [`GatewayError::NotFound`] if the record does not exist,
    /// [`GatewayError::Conflict`] if any change is invalid.
    fn apply_update(
        &self,
        entity: EntityRef,
        changes: &[FieldChange],
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}
