//! What a character record looks like, and the changes the relay makes
//! to one.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tavern_protocol::{ControlKind, DiceKind, EntityKind, EntityRef, StatKind};

use crate::GatewayError;

// ---------------------------------------------------------------------------
// Gauges
// ---------------------------------------------------------------------------

/// A current/max pair such as HP.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vital {
    pub current: f64,
    pub max: f64,
}

impl Vital {
    /// A full gauge.
    pub fn full(max: f64) -> Self {
        Self { current: max, max }
    }

    /// Checks that both values are finite, non-negative, and that the gauge
    /// is not over-full.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if !self.current.is_finite() || !self.max.is_finite() {
            return Err(GatewayError::Conflict("values must be finite".into()));
        }
        if self.current < 0.0 || self.max < 0.0 {
            return Err(GatewayError::Conflict(
                "values must not be negative".into(),
            ));
        }
        if self.current > self.max {
            return Err(GatewayError::Conflict(format!(
                "current {} exceeds max {}",
                self.current, self.max
            )));
        }
        Ok(())
    }
}

impl Default for Vital {
    fn default() -> Self {
        Self::full(100.0)
    }
}

// ---------------------------------------------------------------------------
// Core stats
// ---------------------------------------------------------------------------

/// A character's background, which shifts the starting core stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Vif,
    Martial,
    HommeDeFoie,
    Mediateur,
}

impl FromStr for Origin {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vif" => Ok(Origin::Vif),
            "martial" => Ok(Origin::Martial),
            "hommedefoie" => Ok(Origin::HommeDeFoie),
            "mediateur" => Ok(Origin::Mediateur),
            other => Err(GatewayError::Conflict(format!(
                "unknown origin {other:?}"
            ))),
        }
    }
}

/// The five core stats. `mny` is a money multiplier, the rest are scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoreStats {
    pub str: i32,
    pub stm: i32,
    pub spd: i32,
    pub luk: i32,
    pub mny: f64,
}

impl Default for CoreStats {
    fn default() -> Self {
        Self {
            str: 10,
            stm: 10,
            spd: 10,
            luk: 10,
            mny: 1.0,
        }
    }
}

impl CoreStats {
    /// Applies an origin's modifiers on top of these stats.
    ///
    /// ```
    /// use tavern_entity::{CoreStats, Origin};
    ///
    /// let stats = CoreStats::default().with_origin(Origin::Martial);
    /// assert_eq!(stats.str, 30);
    /// assert_eq!(stats.spd, 5);
    /// assert!((stats.mny - 1.2).abs() < 1e-9);
    /// ```
    pub fn with_origin(mut self, origin: Origin) -> Self {
        match origin {
            Origin::Vif => {
                self.str -= 15;
                self.spd += 10;
                self.stm += 10;
            }
            Origin::Martial => {
                self.str += 20;
                self.spd -= 5;
                self.mny += 0.2;
            }
            Origin::HommeDeFoie => {
                self.str -= 10;
                self.spd -= 5;
                self.stm += 20;
                self.mny -= 0.2;
            }
            Origin::Mediateur => {
                self.luk += 5;
                self.mny += 0.5;
            }
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// Narrative state labels, one per environmental control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    pub feeling: String,
    pub temperature: String,
    pub saturation: String,
}

impl Default for Conditions {
    fn default() -> Self {
        Self {
            feeling: "Good".into(),
            temperature: "Normal".into(),
            saturation: "Full".into(),
        }
    }
}

impl Conditions {
    pub fn get(&self, control: ControlKind) -> &str {
        match control {
            ControlKind::Feeling => &self.feeling,
            ControlKind::Temperature => &self.temperature,
            ControlKind::Saturation => &self.saturation,
        }
    }

    fn slot(&mut self, control: ControlKind) -> &mut String {
        match control {
            ControlKind::Feeling => &mut self.feeling,
            ControlKind::Temperature => &mut self.temperature,
            ControlKind::Saturation => &mut self.saturation,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A point-in-time copy of one character record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub entity: EntityRef,
    pub name: String,
    pub title: Option<String>,
    pub hp: Vital,
    pub stamina: Vital,
    pub stats: CoreStats,
    pub conditions: Conditions,
    /// Most recent roll per die. Missing until the first roll.
    pub last_rolls: HashMap<DiceKind, u32>,
}

impl EntitySnapshot {
    /// A fresh record with default gauges, stats, and conditions.
    pub fn new(entity: EntityRef, name: impl Into<String>) -> Self {
        Self {
            entity,
            name: name.into(),
            title: None,
            hp: Vital::default(),
            stamina: Vital::default(),
            stats: CoreStats::default(),
            conditions: Conditions::default(),
            last_rolls: HashMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_stats(mut self, stats: CoreStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn kind(&self) -> EntityKind {
        self.entity.kind
    }

    pub fn vital(&self, stat: StatKind) -> Vital {
        match stat {
            StatKind::Hp => self.hp,
            StatKind::Stamina => self.stamina,
        }
    }

    pub fn last_roll(&self, dice: DiceKind) -> Option<u32> {
        self.last_rolls.get(&dice).copied()
    }

    /// Writes one change. Callers validate first.
    pub(crate) fn apply(&mut self, change: &FieldChange) {
        match change {
            FieldChange::Vital { stat, current, max } => {
                let gauge = Vital {
                    current: *current,
                    max: *max,
                };
                match stat {
                    StatKind::Hp => self.hp = gauge,
                    StatKind::Stamina => self.stamina = gauge,
                }
            }
            FieldChange::LastRoll { dice, value } => {
                self.last_rolls.insert(*dice, *value);
            }
            FieldChange::Condition { control, label } => {
                *self.conditions.slot(*control) = label.clone();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Changes
// ---------------------------------------------------------------------------

/// One field-level write against a character record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum FieldChange {
    /// Replace a gauge.
    Vital {
        stat: StatKind,
        current: f64,
        max: f64,
    },
    /// Record the latest roll of a die.
    LastRoll { dice: DiceKind, value: u32 },
    /// Set a narrative condition to one of its scale labels.
    Condition { control: ControlKind, label: String },
}

impl FieldChange {
    /// Checks the change on its own, without looking at the record.
    pub fn validate(&self) -> Result<(), GatewayError> {
        match self {
            FieldChange::Vital { current, max, .. } => Vital {
                current: *current,
                max: *max,
            }
            .validate(),
            FieldChange::LastRoll { dice, value } => {
                if dice.admits(*value) {
                    Ok(())
                } else {
                    Err(GatewayError::Conflict(format!(
                        "{value} is not a face of a {dice}"
                    )))
                }
            }
            FieldChange::Condition { control, label } => {
                if control.scale().contains(&label.as_str()) {
                    Ok(())
                } else {
                    Err(GatewayError::Conflict(format!(
                        "{label:?} is not a {control:?} label"
                    )))
                }
            }
        }
    }
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldChange::Vital { stat, current, max } => {
                write!(f, "{stat:?} {current}/{max}")
            }
            FieldChange::LastRoll { dice, value } => write!(f, "{dice} = {value}"),
            FieldChange::Condition { control, label } => {
                write!(f, "{control:?} = {label}")
            }
        }
    }
}
