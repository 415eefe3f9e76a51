#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Normalization of raw ACLED records into [`ConflictEvent`]s.
//!
//! Records without usable coordinates are dropped; every other field has a
//! fallback, so a record with valid coordinates always produces an event.

pub mod parsing;
pub mod severity;

use std::collections::BTreeMap;

use peace_map_acled_models::RawRecord;
use peace_map_conflict_models::{ConflictEvent, EventType};
use sha2::{Digest, Sha256};

pub use severity::{marker_color, severity};

/// Placeholder used when a record has neither notes nor an event type.
pub const NO_DESCRIPTION: &str = "No description available";

/// Placeholder for a missing actor or country.
pub const UNKNOWN: &str = "Unknown";

/// Provider ID fields, in order of preference.
const ID_FIELDS: &[&str] = &["event_id_cnty", "event_id_no_cnty"];

/// Normalizes a batch of raw records, dropping those without valid
/// coordinates. The output is never longer than the input.
#[must_use]
pub fn transform(records: &[RawRecord]) -> Vec<ConflictEvent> {
    let events: Vec<ConflictEvent> = records.iter().filter_map(transform_record).collect();

    let dropped = records.len() - events.len();
    if dropped > 0 {
        log::debug!(
            "Dropped {dropped} of {} records without usable coordinates",
            records.len()
        );
    }

    events
}

/// Normalizes one raw record. Returns `None` when its coordinates are
/// missing, unparseable, non-finite or out of range.
#[must_use]
pub fn transform_record(record: &RawRecord) -> Option<ConflictEvent> {
    let (latitude, longitude) = parsing::parse_lat_lng(record)?;

    let type_label = parsing::get_str(record, "event_type");
    let event_type = type_label.map_or(EventType::Other, EventType::from_label);
    let fatalities = parsing::parse_fatalities(record.get("fatalities"));

    let description = parsing::get_str(record, "notes")
        .or(type_label)
        .unwrap_or(NO_DESCRIPTION);

    Some(ConflictEvent {
        id: event_id(record),
        date: parsing::get_str(record, "event_date")
            .unwrap_or_default()
            .to_string(),
        event_type,
        country: parsing::get_str(record, "country")
            .unwrap_or(UNKNOWN)
            .to_string(),
        actor: parsing::get_str(record, "actor1")
            .unwrap_or(UNKNOWN)
            .to_string(),
        latitude,
        longitude,
        fatalities,
        description: description.to_string(),
        severity: severity(event_type, fatalities),
        color: marker_color(event_type, fatalities).to_string(),
    })
}

/// The provider's event ID, or a SHA-256 of the record when it has none.
///
/// The hash covers the whole record serialized with sorted keys, so the
/// same record always gets the same ID.
#[must_use]
pub fn event_id(record: &RawRecord) -> String {
    for field in ID_FIELDS {
        if let Some(id) = parsing::get_str(record, field) {
            return id.to_string();
        }
        if let Some(n) = record.get(*field).and_then(serde_json::Value::as_i64) {
            return n.to_string();
        }
    }

    let sorted: BTreeMap<&String, &serde_json::Value> = record.iter().collect();
    let canonical = serde_json::to_string(&sorted).unwrap_or_default();
    hex::encode(Sha256::digest(canonical.as_bytes()))
}
