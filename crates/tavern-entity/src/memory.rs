//! In-process record store.

use std::collections::HashMap;

use tavern_protocol::EntityRef;
use tokio::sync::RwLock;

use crate::{EntityGateway, EntitySnapshot, FieldChange, GatewayError};

/// Keeps every record in a map behind a read/write lock.
///
/// Good enough for a single table's session and for tests. Records are
/// lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    records: RwLock<HashMap<EntityRef, EntitySnapshot>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a record under its own reference, replacing any previous one.
    pub async fn insert(&self, snapshot: EntitySnapshot) {
        let entity = snapshot.entity;
        self.records.write().await.insert(entity, snapshot);
        tracing::debug!(%entity, "entity stored");
    }

    /// Deletes a record. Returns it if it existed.
    pub async fn remove(&self, entity: EntityRef) -> Option<EntitySnapshot> {
        self.records.write().await.remove(&entity)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl EntityGateway for MemoryGateway {
    async fn get_entity(
        &self,
        entity: EntityRef,
    ) -> Result<EntitySnapshot, GatewayError> {
        self.records
            .read()
            .await
            .get(&entity)
            .cloned()
            .ok_or(GatewayError::NotFound(entity))
    }

    async fn apply_update(
        &self,
        entity: EntityRef,
        changes: &[FieldChange],
    ) -> Result<(), GatewayError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&entity)
            .ok_or(GatewayError::NotFound(entity))?;

        for change in changes {
            change.validate()?;
        }
        for change in changes {
            record.apply(change);
        }

        tracing::debug!(%entity, changes = changes.len(), "entity updated");
        Ok(())
    }
}
