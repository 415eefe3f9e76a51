//! Sample dataset rendered when live data is unavailable.

use std::collections::BTreeMap;

use peace_map_acled_models::RawRecord;
use peace_map_analytics::score_counts;
use peace_map_conflict_models::{ConflictEvent, EventType, MonthlyTrendPoint, PeaceIndex};
use serde_json::json;

/// The five sample records, in ACLED's raw shape.
#[must_use]
pub fn sample_records() -> Vec<RawRecord> {
    [
        json!({
            "event_id_cnty": "fallback-1",
            "event_date": "2024-01-15",
            "event_type": "Battles",
            "country": "Ukraine",
            "admin1": "Kyiv",
            "latitude": "50.4501",
            "longitude": "30.5234",
            "fatalities": "25",
            "notes": "Ongoing conflict in Eastern Europe"
        }),
        json!({
            "event_id_cnty": "fallback-2",
            "event_date": "2024-01-14",
            "event_type": "Violence against civilians",
            "country": "Palestine",
            "admin1": "Gaza",
            "latitude": "31.5017",
            "longitude": "34.4668",
            "fatalities": "45",
            "notes": "Violence against civilians"
        }),
        json!({
            "event_id_cnty": "fallback-3",
            "event_date": "2024-01-13",
            "event_type": "Explosions/Remote violence",
            "country": "Syria",
            "admin1": "Aleppo",
            "latitude": "36.2048",
            "longitude": "38.0118",
            "fatalities": "8",
            "notes": "Remote violence incident"
        }),
        json!({
            "event_id_cnty": "fallback-4",
            "event_date": "2024-01-12",
            "event_type": "Violence against civilians",
            "country": "Nigeria",
            "admin1": "Plateau",
            "latitude": "9.0820",
            "longitude": "8.6753",
            "fatalities": "12",
            "notes": "Communal violence"
        }),
        json!({
            "event_id_cnty": "fallback-5",
            "event_date": "2024-01-11",
            "event_type": "Protests",
            "country": "Tunisia",
            "admin1": "Tunis",
            "latitude": "33.8869",
            "longitude": "9.5375",
            "fatalities": "0",
            "notes": "Peaceful protests"
        }),
    ]
    .into_iter()
    .filter_map(|value| match value {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    })
    .collect()
}

/// The sample records normalized like live data.
#[must_use]
pub fn sample_events() -> Vec<ConflictEvent> {
    peace_map_transform::transform(&sample_records())
}

/// Peace index computed over the sample events, labeled with the
/// requested country and year.
#[must_use]
pub fn sample_peace_index(country: &str, year: i32) -> PeaceIndex {
    let events = sample_events();
    let violent: Vec<&ConflictEvent> = events
        .iter()
        .filter(|e| e.event_type.is_violent())
        .collect();
    let protests = events
        .iter()
        .filter(|e| matches!(e.event_type, EventType::Protests | EventType::Riots))
        .count();
    let fatalities = violent.iter().map(|e| u64::from(e.fatalities)).sum();

    PeaceIndex {
        country: country.to_string(),
        year,
        violent_records: violent.len(),
        protest_records: protests,
        peace_score: score_counts(violent.len() as u64, protests as u64, fatalities),
    }
}

/// Monthly totals over the sample events, oldest first.
#[must_use]
pub fn sample_trend() -> Vec<MonthlyTrendPoint> {
    let mut months: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for event in sample_events() {
        let month = event.date.get(..7).unwrap_or(&event.date).to_string();
        let entry = months.entry(month).or_default();
        entry.0 += 1;
        entry.1 += u64::from(event.fatalities);
    }

    months
        .into_iter()
        .map(|(month, (events, fatalities))| MonthlyTrendPoint {
            month,
            events,
            fatalities,
        })
        .collect()
}
