//! Rooms and broadcast fan-out for Tavern.
//!
//! # Key types
//!
//! - [`MembershipManager`]: which connections sit in which room
//! - [`Dispatcher`]: writes one payload to many connections at once
//! - [`DeliveryReport`]: how a fan-out went, per recipient
//! - [`DispatchConfig`]: send timeout
//!
//! Membership is pure bookkeeping; the dispatcher is the only part that
//! touches a [`Connection`](tavern_transport::Connection).

mod dispatch;
mod error;
mod membership;

pub use dispatch::{DeliveryReport, DispatchConfig, Dispatcher};
pub use error::RoomError;
pub use membership::MembershipManager;
