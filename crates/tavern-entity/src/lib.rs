//! Character records for Tavern.
//!
//! The relay itself never owns character data. It reads and writes
//! records through the [`EntityGateway`] trait; [`MemoryGateway`] is the
//! in-process implementation used by the demo and the tests.
//!
//! - [`EntitySnapshot`]: one record: gauges, core stats, conditions, rolls
//! - [`FieldChange`]: one field-level write
//! - [`CoreStats`] / [`Origin`]: starting stats and background modifiers

mod error;
mod gateway;
mod memory;
mod model;

pub use error::GatewayError;
pub use gateway::EntityGateway;
pub use memory::MemoryGateway;
pub use model::{
    Conditions, CoreStats, EntitySnapshot, FieldChange, Origin, Vital,
};
