//! Who a connection is, once it has joined.

use tavern_protocol::{PlayerId, Role};

use crate::SessionError;

/// The role a connection holds, plus its display name.
///
/// A player identity always carries its [`PlayerId`]; a host identity
/// never does. The constructors are the only way to build one, so the
/// pairing cannot drift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    role: Role,
    player_id: Option<PlayerId>,
    display_name: String,
}

impl Identity {
    /// Display name used when a host does not supply one.
    pub const DEFAULT_HOST_NAME: &'static str = "Host";

    /// A host identity.
    pub fn host(display_name: impl Into<String>) -> Self {
        Self {
            role: Role::Host,
            player_id: None,
            display_name: display_name.into(),
        }
    }

    /// A player identity bound to `player_id`.
    pub fn player(player_id: PlayerId, display_name: impl Into<String>) -> Self {
        Self {
            role: Role::Player,
            player_id: Some(player_id),
            display_name: display_name.into(),
        }
    }

    /// Builds an identity from the loose fields of a join request.
    ///
    /// Blank names fall back to `Host` or `Player <id>`.
    ///
    /// # Errors
    /// [`SessionError::InvalidIdentity`] when a player gives no id.
    pub fn from_join(
        role: Role,
        player_id: Option<PlayerId>,
        name: Option<&str>,
    ) -> Result<Self, SessionError> {
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        match role {
            Role::Host => Ok(Self::host(
                name.unwrap_or(Self::DEFAULT_HOST_NAME),
            )),
            Role::Player => {
                let id = player_id.ok_or_else(|| {
                    SessionError::InvalidIdentity(
                        "player_id is required for role player".into(),
                    )
                })?;
                let name = name
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("Player {}", id.0));
                Ok(Self::player(id, name))
            }
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Present iff the role is [`Role::Player`].
    pub fn player_id(&self) -> Option<PlayerId> {
        self.player_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }
}
