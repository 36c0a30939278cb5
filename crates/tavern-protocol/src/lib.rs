//! Wire protocol for Tavern.
//!
//! This crate defines what clients and the relay say to each other:
//!
//! - **Types** ([`PlayerId`], [`Role`], [`RoomName`], [`DiceKind`], ...):
//!   the shared vocabulary.
//! - **Events** ([`ClientEvent`], [`ServerEvent`], [`Envelope`]): one
//!   variant per recognized event type.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): events to bytes and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! It knows nothing about connections or rooms' members, only about
//! shapes.

mod codec;
mod error;
mod event;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use event::{ClientEvent, Envelope, ServerEvent};
pub use types::{
    ControlKind, DiceKind, EntityKind, EntityRef, PlayerId, Role, RoomName,
    StatKind, VoiceMode,
};
