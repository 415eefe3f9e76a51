//! Peace score over a set of events.

use peace_map_conflict_models::{ConflictEvent, PeaceScore, PeaceStatus};

/// Score for a set with no events.
pub const MAX_SCORE: f64 = 10.0;

const VIOLENT_WEIGHT: f64 = 0.1;
const VIOLENT_CAP: f64 = 5.0;
const PROTEST_WEIGHT: f64 = 0.05;
const PROTEST_CAP: f64 = 2.0;
const FATALITY_WEIGHT: f64 = 0.01;
const FATALITY_CAP: f64 = 3.0;

/// Scores a set of normalized events.
///
/// Violent events and protests are counted by type. Fatalities are summed
/// over every event.
#[must_use]
pub fn peace_score(events: &[ConflictEvent]) -> PeaceScore {
    let violent = events
        .iter()
        .filter(|e| e.event_type.is_violent())
        .count() as u64;
    let protests = events
        .iter()
        .filter(|e| e.event_type.is_protest())
        .count() as u64;
    let fatalities = events.iter().map(|e| u64::from(e.fatalities)).sum();

    score_counts(violent, protests, fatalities)
}

/// Scores pre-aggregated counts.
///
/// Each penalty is capped, so the score never drops below zero. The
/// status is derived from the rounded score.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn score_counts(violent: u64, protests: u64, fatalities: u64) -> PeaceScore {
    let mut score = MAX_SCORE;
    score -= (violent as f64 * VIOLENT_WEIGHT).min(VIOLENT_CAP);
    score -= (protests as f64 * PROTEST_WEIGHT).min(PROTEST_CAP);
    score -= (fatalities as f64 * FATALITY_WEIGHT).min(FATALITY_CAP);
    let score = ((score * 10.0).round() / 10.0).max(0.0);

    PeaceScore {
        score,
        status: PeaceStatus::from_score(score),
        violent_events: violent,
        protests,
        fatalities,
    }
}
