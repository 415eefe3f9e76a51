//! Per-event severity and marker color.

use peace_map_conflict_models::{EventType, MAX_SEVERITY};

/// Severity of an event: the type's base severity plus a fatality bump,
/// capped at [`MAX_SEVERITY`].
#[must_use]
pub fn severity(event_type: EventType, fatalities: u32) -> u8 {
    let bump = match fatalities {
        51.. => 3,
        11..=50 => 2,
        1..=10 => 1,
        0 => 0,
    };
    (event_type.base_severity() + bump).min(MAX_SEVERITY)
}

/// Hex marker color for an event.
#[must_use]
pub fn marker_color(event_type: EventType, fatalities: u32) -> &'static str {
    let s = severity(event_type, fatalities);
    match event_type {
        EventType::Protests => match s {
            4.. => "#ff4444",
            3 => "#ff8800",
            2 => "#ffcc00",
            _ => "#00cc00",
        },
        EventType::ViolenceAgainstCivilians => match s {
            5.. => "#0066cc",
            4 => "#8B4513",
            3 => "#ff4444",
            _ => "#ff8800",
        },
        EventType::Battles => match s {
            5.. => "#000000",
            4 => "#8B4513",
            3 => "#ff4444",
            _ => "#9966cc",
        },
        _ => match s {
            4.. => "#ff4444",
            3 => "#ff8800",
            _ => "#ffcc00",
        },
    }
}
