//! # Tavern
//!
//! Real-time relay for tabletop role-playing companion apps.
//!
//! A host (the game master) and the players keep a WebSocket open to the
//! relay. The relay tracks who holds which role, groups connections into
//! rooms (`host_room`, `all_players`, `player_<id>`), and forwards chat,
//! dice rolls, stat changes, and environmental updates to the right
//! rooms. Character records live behind an [`EntityGateway`]; stat and
//! roll changes are written there before anyone hears about them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tavern::prelude::*;
//!
//! # async fn start() -> Result<(), TavernError> {
//! let server = TavernServerBuilder::new()
//!     .bind("0.0.0.0:5000")
//!     .build(MemoryGateway::new(), SharedSecretAuthenticator::new("owlbear"))
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod router;
mod server;

pub use error::TavernError;
pub use router::{DiceAuthority, Destination, Outbound, RelayConfig, Router};
pub use server::{TavernServer, TavernServerBuilder};

pub use tavern_entity::{
    CoreStats, EntityGateway, EntitySnapshot, FieldChange, GatewayError,
    MemoryGateway, Origin,
};
pub use tavern_protocol::{
    ClientEvent, Codec, ControlKind, DiceKind, EntityKind, EntityRef,
    Envelope, JsonCodec, PlayerId, Role, RoomName, ServerEvent, StatKind,
    VoiceMode,
};
pub use tavern_session::{
    Authenticator, OpenAuthenticator, SessionError, SharedSecretAuthenticator,
};

/// Everything needed to stand up a relay.
pub mod prelude {
    pub use crate::{
        Authenticator, EntityGateway, EntitySnapshot, MemoryGateway,
        OpenAuthenticator, RelayConfig, SharedSecretAuthenticator,
        TavernError, TavernServer, TavernServerBuilder,
    };
}
