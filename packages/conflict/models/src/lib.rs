#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Conflict event taxonomy and the normalized event format.
//!
//! This crate defines the ACLED event type vocabulary used across the
//! peace-map workspace, the map-renderable [`ConflictEvent`] every raw
//! provider record is normalized into, and the aggregate [`PeaceScore`]
//! derived from a set of events.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Highest severity an event can be assigned.
pub const MAX_SEVERITY: u8 = 5;

/// ACLED event types.
///
/// The string forms are the exact labels ACLED uses in its `event_type`
/// field. Anything outside the fixed vocabulary is [`EventType::Other`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum EventType {
    /// Violent interactions between two organized armed groups
    #[serde(rename = "Battles")]
    #[strum(serialize = "Battles")]
    Battles,
    /// Violence by an organized armed group against unarmed non-combatants
    #[serde(rename = "Violence against civilians")]
    #[strum(serialize = "Violence against civilians")]
    ViolenceAgainstCivilians,
    /// Shelling, airstrikes, bombs and other one-sided remote violence
    #[serde(rename = "Explosions/Remote violence")]
    #[strum(serialize = "Explosions/Remote violence")]
    ExplosionsRemoteViolence,
    /// Public demonstrations without violence
    #[serde(rename = "Protests")]
    #[strum(serialize = "Protests")]
    Protests,
    /// Violent demonstrations
    #[serde(rename = "Riots")]
    #[strum(serialize = "Riots")]
    Riots,
    /// Non-violent activity by conflict actors (agreements, arrests, etc.)
    #[serde(rename = "Strategic developments")]
    #[strum(serialize = "Strategic developments")]
    StrategicDevelopments,
    /// Labels outside the vocabulary above
    #[serde(rename = "other")]
    #[strum(serialize = "other")]
    Other,
}

impl EventType {
    /// Parses an ACLED `event_type` label, falling back to
    /// [`EventType::Other`] for anything unrecognized.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        label.trim().parse().unwrap_or(Self::Other)
    }

    /// Whether this type counts as violent for peace scoring.
    #[must_use]
    pub const fn is_violent(self) -> bool {
        matches!(
            self,
            Self::ViolenceAgainstCivilians | Self::Battles | Self::ExplosionsRemoteViolence
        )
    }

    /// Whether this type counts as a protest for peace scoring.
    #[must_use]
    pub const fn is_protest(self) -> bool {
        matches!(self, Self::Protests)
    }

    /// Base severity before the fatality adjustment.
    #[must_use]
    pub const fn base_severity(self) -> u8 {
        match self {
            Self::ViolenceAgainstCivilians | Self::ExplosionsRemoteViolence => 3,
            Self::Battles => 2,
            Self::Protests
            | Self::Riots
            | Self::StrategicDevelopments
            | Self::Other => 1,
        }
    }

    /// Returns the coarse map category for this type.
    #[must_use]
    pub const fn category(self) -> EventCategory {
        match self {
            Self::Battles => EventCategory::Conflict,
            Self::ViolenceAgainstCivilians | Self::ExplosionsRemoteViolence => {
                EventCategory::Violence
            }
            Self::Protests => EventCategory::Protest,
            Self::Riots => EventCategory::Unrest,
            Self::StrategicDevelopments => EventCategory::Diplomatic,
            Self::Other => EventCategory::Other,
        }
    }

    /// The violent types, in the order ACLED filters list them.
    #[must_use]
    pub const fn violent() -> &'static [Self] {
        &[
            Self::ViolenceAgainstCivilians,
            Self::Battles,
            Self::ExplosionsRemoteViolence,
        ]
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Battles,
            Self::ViolenceAgainstCivilians,
            Self::ExplosionsRemoteViolence,
            Self::Protests,
            Self::Riots,
            Self::StrategicDevelopments,
            Self::Other,
        ]
    }
}

/// Coarse grouping of event types for map legends.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventCategory {
    /// Armed clashes
    Conflict,
    /// One-sided violence
    Violence,
    /// Peaceful demonstrations
    Protest,
    /// Riots
    Unrest,
    /// Strategic developments
    Diplomatic,
    /// Unclassified
    Other,
}

/// Marker intensity bucket derived from severity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Intensity {
    /// Severity 0-1
    Low,
    /// Severity 2-3
    Medium,
    /// Severity 4-5
    High,
}

impl Intensity {
    /// Buckets a severity value.
    #[must_use]
    pub const fn from_severity(severity: u8) -> Self {
        if severity > 3 {
            Self::High
        } else if severity > 1 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// A conflict event normalized from a raw provider record.
///
/// Coordinates are always present and finite: records without usable
/// coordinates never become a `ConflictEvent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictEvent {
    /// Provider event ID, or a stable hash of the raw record when absent.
    pub id: String,
    /// Event date (`YYYY-MM-DD`).
    pub date: String,
    /// Event type from the fixed vocabulary.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Country name as reported.
    pub country: String,
    /// Primary actor.
    pub actor: String,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Reported fatalities.
    pub fatalities: u32,
    /// Free-text notes.
    pub description: String,
    /// Derived severity, 0 through [`MAX_SEVERITY`].
    pub severity: u8,
    /// Hex marker color.
    pub color: String,
}

impl ConflictEvent {
    /// Marker intensity for this event.
    #[must_use]
    pub const fn intensity(&self) -> Intensity {
        Intensity::from_severity(self.severity)
    }
}

/// Qualitative status attached to a [`PeaceScore`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PeaceStatus {
    /// Score above 8
    Peaceful,
    /// Score above 5
    Moderate,
    /// Everything else
    Conflict,
}

impl PeaceStatus {
    /// Classifies a (rounded) score.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score > 8.0 {
            Self::Peaceful
        } else if score > 5.0 {
            Self::Moderate
        } else {
            Self::Conflict
        }
    }
}

/// Aggregate 0-10 peace score over a set of events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeaceScore {
    /// Score in `[0, 10]`, rounded to one decimal.
    pub score: f64,
    /// Status derived from `score`.
    pub status: PeaceStatus,
    /// Number of violent events counted.
    pub violent_events: u64,
    /// Number of protest events counted.
    pub protests: u64,
    /// Fatalities counted.
    pub fatalities: u64,
}

/// Peace index for a single country and year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeaceIndex {
    /// Country queried.
    pub country: String,
    /// Year queried.
    pub year: i32,
    /// Violent records returned by the provider.
    pub violent_records: usize,
    /// Protest and riot records returned by the provider.
    pub protest_records: usize,
    /// Score derived from both record sets.
    pub peace_score: PeaceScore,
}

/// Events and fatalities for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrendPoint {
    /// Month as `YYYY-MM`.
    pub month: String,
    /// Number of events reported for the month.
    pub events: u64,
    /// Sum of fatalities over the returned records.
    pub fatalities: u64,
}
