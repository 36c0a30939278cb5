//! Connection identity for Tavern.
//!
//! This crate answers "who is on the other end of this connection?":
//!
//! 1. **Registry**: which connection holds the host role and which one is
//!    bound to each player ([`ConnectionRegistry`]).
//! 2. **Identity**: the role a connection claimed on join ([`Identity`]).
//! 3. **Host check**: the shared-secret gate in front of the host role
//!    ([`Authenticator`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Router (above)   ← owns the registry next to room membership
//!     ↕
//! Session (this crate)
//!     ↕
//! Protocol / Transport (below)  ← PlayerId, Role, ConnectionId
//! ```

mod auth;
mod error;
mod identity;
mod registry;

pub use auth::{Authenticator, OpenAuthenticator, SharedSecretAuthenticator};
pub use error::SessionError;
pub use identity::Identity;
pub use registry::ConnectionRegistry;
