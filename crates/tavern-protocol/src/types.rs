//! Identity and vocabulary types shared by every layer of the relay.
//!
//! Everything here travels on the wire, so the serde attributes define the
//! exact JSON spelling clients use (`"host"`, `"d20"`, `"player_7"`, ...).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// PlayerId
// ---------------------------------------------------------------------------

/// Stable identifier of a player character.
///
/// Serializes as a plain number. Deserialization also accepts the numeric
/// string form, since browser form values (checkbox `value`s) arrive as
/// strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(d)? {
            Raw::Number(n) => Ok(PlayerId(n)),
            Raw::Text(s) => s
                .trim()
                .parse()
                .map(PlayerId)
                .map_err(|_| serde::de::Error::custom(format!("invalid player id {s:?}"))),
        }
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Which side of the table a connection sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The game master.
    Host,
    /// A participant bound to one character record.
    Player,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Host => "host",
            Role::Player => "player",
        })
    }
}

// ---------------------------------------------------------------------------
// RoomName
// ---------------------------------------------------------------------------

/// Name of a broadcast room.
///
/// The string forms are fixed: `host_room`, `all_players`, `player_<id>`.
/// Serializes as that string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoomName {
    /// The singleton room holding the host connection.
    Host,
    /// Every identified player connection.
    AllPlayers,
    /// The private room of one player.
    Player(PlayerId),
}

impl RoomName {
    const HOST: &'static str = "host_room";
    const ALL_PLAYERS: &'static str = "all_players";
    const PLAYER_PREFIX: &'static str = "player_";

    /// The rooms a connection with the given role joins on `join_game`.
    pub fn for_role(role: Role, player_id: Option<PlayerId>) -> Vec<RoomName> {
        match (role, player_id) {
            (Role::Host, _) => vec![RoomName::Host],
            (Role::Player, Some(id)) => {
                vec![RoomName::Player(id), RoomName::AllPlayers]
            }
            (Role::Player, None) => vec![RoomName::AllPlayers],
        }
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomName::Host => f.write_str(Self::HOST),
            RoomName::AllPlayers => f.write_str(Self::ALL_PLAYERS),
            RoomName::Player(id) => write!(f, "{}{}", Self::PLAYER_PREFIX, id.0),
        }
    }
}

impl FromStr for RoomName {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Self::HOST => Ok(RoomName::Host),
            Self::ALL_PLAYERS => Ok(RoomName::AllPlayers),
            other => other
                .strip_prefix(Self::PLAYER_PREFIX)
                .and_then(|id| id.parse().ok())
                .map(|id| RoomName::Player(PlayerId(id)))
                .ok_or_else(|| {
                    ProtocolError::InvalidMessage(format!("unknown room {other:?}"))
                }),
        }
    }
}

impl Serialize for RoomName {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RoomName {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Chat, dice, stats, controls
// ---------------------------------------------------------------------------

/// Styling hint attached to chat messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceMode {
    #[default]
    Normal,
    /// Rendered as an unattributed, in-world voice.
    Mystery,
}

/// The fixed set of dice the table uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiceKind {
    D5,
    D10,
    D20,
    D100,
}

impl DiceKind {
    /// Every dice kind, smallest first.
    pub const ALL: [DiceKind; 4] =
        [DiceKind::D5, DiceKind::D10, DiceKind::D20, DiceKind::D100];

    /// Number of faces; a roll lands in `1..=sides()`.
    pub fn sides(self) -> u32 {
        match self {
            DiceKind::D5 => 5,
            DiceKind::D10 => 10,
            DiceKind::D20 => 20,
            DiceKind::D100 => 100,
        }
    }

    /// Returns `true` if `value` is a face of this die.
    pub fn admits(self, value: u32) -> bool {
        (1..=self.sides()).contains(&value)
    }
}

impl fmt::Display for DiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

/// A gauge with a current and a maximum value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatKind {
    Hp,
    Stamina,
}

/// Environmental controls the host adjusts for the whole table.
///
/// Each control is a five-step slider; the wire `value` is the step index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Saturation,
    Feeling,
    Temperature,
}

impl ControlKind {
    /// Display labels, indexed by slider step.
    pub fn scale(self) -> &'static [&'static str; 5] {
        match self {
            ControlKind::Saturation => {
                &["Full", "Fine", "Peckish", "Hungry", "Starving"]
            }
            ControlKind::Feeling => {
                &["Terrible", "Bad", "Good", "Great", "Excellent"]
            }
            ControlKind::Temperature => {
                &["Freezing", "Cold", "Normal", "Warm", "Hot"]
            }
        }
    }

    /// Label for a slider step, or `None` when out of range.
    pub fn label(self, step: u8) -> Option<&'static str> {
        self.scale().get(usize::from(step)).copied()
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// The kinds of character record the table tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Player,
    Enemy,
    Npc,
}

/// Points at one character record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: u64,
}

impl EntityRef {
    /// The record backing a player's character.
    pub fn player(id: PlayerId) -> Self {
        Self {
            kind: EntityKind::Player,
            id: id.0,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            EntityKind::Player => "player",
            EntityKind::Enemy => "enemy",
            EntityKind::Npc => "npc",
        };
        write!(f, "{kind}#{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&PlayerId(42)).unwrap(), "42");
    }

    #[test]
    fn test_player_id_deserializes_from_numeric_string() {
        let pid: PlayerId = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(pid, PlayerId(7));
    }

    #[test]
    fn test_player_id_rejects_non_numeric_string() {
        let result: Result<PlayerId, _> = serde_json::from_str("\"seven\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_room_name_string_forms() {
        assert_eq!(RoomName::Host.to_string(), "host_room");
        assert_eq!(RoomName::AllPlayers.to_string(), "all_players");
        assert_eq!(RoomName::Player(PlayerId(12)).to_string(), "player_12");
    }

    #[test]
    fn test_room_name_parses_its_own_display() {
        for name in [
            RoomName::Host,
            RoomName::AllPlayers,
            RoomName::Player(PlayerId(3)),
        ] {
            assert_eq!(name.to_string().parse::<RoomName>().unwrap(), name);
        }
    }

    #[test]
    fn test_room_name_rejects_unknown() {
        assert!("lobby".parse::<RoomName>().is_err());
        assert!("player_abc".parse::<RoomName>().is_err());
    }

    #[test]
    fn test_room_name_serializes_as_string() {
        let json = serde_json::to_string(&RoomName::Player(PlayerId(5))).unwrap();
        assert_eq!(json, "\"player_5\"");
    }

    #[test]
    fn test_rooms_for_player_role_include_private_and_shared() {
        let rooms = RoomName::for_role(Role::Player, Some(PlayerId(4)));
        assert_eq!(rooms, vec![RoomName::Player(PlayerId(4)), RoomName::AllPlayers]);
        assert_eq!(RoomName::for_role(Role::Host, None), vec![RoomName::Host]);
    }

    #[test]
    fn test_dice_kind_wire_names_and_ranges() {
        assert_eq!(serde_json::to_string(&DiceKind::D100).unwrap(), "\"d100\"");
        let d: DiceKind = serde_json::from_str("\"d20\"").unwrap();
        assert_eq!(d, DiceKind::D20);
        assert!(DiceKind::D5.admits(5));
        assert!(!DiceKind::D5.admits(0));
        assert!(!DiceKind::D5.admits(6));
    }

    #[test]
    fn test_dice_kind_rejects_unknown() {
        let result: Result<DiceKind, _> = serde_json::from_str("\"d6\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_control_kind_labels() {
        assert_eq!(ControlKind::Feeling.label(2), Some("Good"));
        assert_eq!(ControlKind::Temperature.label(4), Some("Hot"));
        assert_eq!(ControlKind::Saturation.label(5), None);
    }

    #[test]
    fn test_entity_ref_display() {
        let r = EntityRef {
            kind: EntityKind::Npc,
            id: 9,
        };
        assert_eq!(r.to_string(), "npc#9");
        assert_eq!(EntityRef::player(PlayerId(2)).to_string(), "player#2");
    }
}
