//! Inbound and outbound events.
//!
//! Both directions are internally tagged unions: the JSON object carries a
//! `type` discriminator next to the variant's fields, e.g.
//! `{"type": "send_message", "message": "..."}`. An unrecognized `type`
//! fails to decode, which is how unknown events are rejected at the edge.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::{
    ControlKind, DiceKind, EntityRef, PlayerId, Role, RoomName, StatKind,
    VoiceMode,
};

// ---------------------------------------------------------------------------
// ClientEvent
// ---------------------------------------------------------------------------

/// Events a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Bind this connection to a role. Players must name their character.
    JoinGame {
        role: Role,
        #[serde(default)]
        player_id: Option<PlayerId>,
        /// Display name shown next to chat lines and rolls.
        #[serde(default)]
        name: Option<String>,
        /// Shared secret, checked only for the host role.
        #[serde(default)]
        secret: Option<String>,
    },

    /// A chat line. The host addresses explicit players; a player always
    /// speaks to the host.
    SendMessage {
        message: String,
        #[serde(default)]
        target_players: Vec<PlayerId>,
        #[serde(default)]
        voice_mode: VoiceMode,
    },

    /// Host sets a player's gauge.
    UpdatePlayerStats {
        player_id: PlayerId,
        stat_type: StatKind,
        current: f64,
        max: f64,
    },

    /// A dice roll to show the whole table.
    DiceRollBroadcast {
        dice_type: DiceKind,
        /// Client-computed face; only honored when the relay trusts
        /// client rolls.
        #[serde(default)]
        result: Option<u32>,
        /// Character the roll belongs to. Defaults to the sender's own
        /// character for players.
        #[serde(default)]
        entity: Option<EntityRef>,
    },

    /// Host moves an environmental slider.
    EnvironmentalUpdate {
        control_type: ControlKind,
        value: u8,
        #[serde(default)]
        display_value: String,
    },

    /// Who is at the table right now?
    GetConnectedClients,
}

impl ClientEvent {
    /// The wire `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::JoinGame { .. } => "join_game",
            ClientEvent::SendMessage { .. } => "send_message",
            ClientEvent::UpdatePlayerStats { .. } => "update_player_stats",
            ClientEvent::DiceRollBroadcast { .. } => "dice_roll_broadcast",
            ClientEvent::EnvironmentalUpdate { .. } => "environmental_update",
            ClientEvent::GetConnectedClients => "get_connected_clients",
        }
    }
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// Events the relay sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Acknowledges `join_game` to the joining connection.
    JoinSuccess {
        role: Role,
        player_id: Option<PlayerId>,
        rooms: Vec<RoomName>,
    },

    /// A relayed chat line.
    NewMessage {
        sender_role: Role,
        sender_name: String,
        sender_player_id: Option<PlayerId>,
        message: String,
        message_type: VoiceMode,
    },

    /// Acknowledges a host chat line back to the host room.
    MessageSent {
        target_count: usize,
        target_players: Vec<PlayerId>,
        message: String,
    },

    /// A chat line could not be relayed.
    MessageError { error: String },

    /// A player's gauge changed (host view).
    PlayerStatsUpdated {
        player_id: PlayerId,
        stat_type: StatKind,
        current: f64,
        max: f64,
    },

    /// Your gauge changed (player view).
    StatsUpdated {
        player_id: PlayerId,
        stat_type: StatKind,
        current: f64,
        max: f64,
    },

    /// A dice roll everyone sees.
    DiceRollResult {
        roller_role: Role,
        roller_name: String,
        player_id: Option<PlayerId>,
        entity: Option<EntityRef>,
        dice_type: DiceKind,
        result: u32,
    },

    /// An environmental slider moved.
    EnvironmentalChange {
        control_type: ControlKind,
        value: u8,
        display_value: String,
    },

    /// Reply to `get_connected_clients`.
    ConnectedClientsUpdate {
        host_connected: bool,
        connected_players: Vec<PlayerId>,
        total_players: usize,
    },

    /// A request was rejected. `code` follows HTTP conventions
    /// (400 malformed, 403 not allowed, 404 unknown entity, 409 conflict).
    Error { code: u16, message: String },
}

impl ServerEvent {
    /// The wire `type` tag, for logging and tests.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::JoinSuccess { .. } => "join_success",
            ServerEvent::NewMessage { .. } => "new_message",
            ServerEvent::MessageSent { .. } => "message_sent",
            ServerEvent::MessageError { .. } => "message_error",
            ServerEvent::PlayerStatsUpdated { .. } => "player_stats_updated",
            ServerEvent::StatsUpdated { .. } => "stats_updated",
            ServerEvent::DiceRollResult { .. } => "dice_roll_result",
            ServerEvent::EnvironmentalChange { .. } => "environmental_change",
            ServerEvent::ConnectedClientsUpdate { .. } => {
                "connected_clients_update"
            }
            ServerEvent::Error { .. } => "error",
        }
    }

    /// Shorthand for an [`ServerEvent::Error`].
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        ServerEvent::Error {
            code,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// An outbound event stamped with the server's clock.
///
/// The event's fields are flattened next to `timestamp`, so clients see a
/// single flat object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Milliseconds since the UNIX epoch, assigned by the server.
    pub timestamp: u64,

    #[serde(flatten)]
    pub event: ServerEvent,
}

impl Envelope {
    /// Wraps an event with the current wall-clock time.
    pub fn now(event: ServerEvent) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self { timestamp, event }
    }
}
