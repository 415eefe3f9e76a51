//! Query parameter building for the ACLED `read` endpoint.
//!
//! [`QueryBuilder`] prepends credentials and `format=json` to a
//! [`ConflictQuery`]'s parameters. The constructors in this module define
//! the standard queries behind each client operation.

use chrono::NaiveDate;
use peace_map_acled_models::{AcledConfig, BoundingBox, ConflictQuery, DateWindow, ExportFormat};
use peace_map_conflict_models::EventType;

/// Fields requested for map rendering.
pub const MAP_FIELDS: &[&str] = &[
    "event_id_cnty",
    "event_date",
    "event_type",
    "country",
    "latitude",
    "longitude",
    "fatalities",
    "notes",
    "actor1",
];

/// Fields requested for aggregate statistics only.
pub const STATS_FIELDS: &[&str] = &["event_id_cnty", "event_date", "event_type", "fatalities"];

/// Default limit for `fetch_recent`.
pub const RECENT_LIMIT: u32 = 1000;

/// First-attempt limit for `fetch_all`.
pub const FETCH_ALL_LIMIT: u32 = 5000;

/// Degraded limit for the single `fetch_all` retry.
pub const FETCH_ALL_FALLBACK_LIMIT: u32 = 1000;

/// Limit for country queries.
pub const COUNTRY_LIMIT: u32 = 5000;

/// Limit for bounding-box queries.
pub const REGION_LIMIT: u32 = 2000;

/// Page size the provider uses when paginating.
pub const PAGE_SIZE: u32 = 5000;

/// Builds the full parameter list for a request.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    config: &'a AcledConfig,
}

impl<'a> QueryBuilder<'a> {
    /// A builder using `config`'s credentials.
    #[must_use]
    pub const fn new(config: &'a AcledConfig) -> Self {
        Self { config }
    }

    /// Credentials, `format=json`, then the query's own parameters in
    /// name order.
    #[must_use]
    pub fn build(&self, query: &ConflictQuery) -> Vec<(String, String)> {
        self.build_as(query, ExportFormat::Json)
    }

    /// [`Self::build`] with `format` set to `format`.
    #[must_use]
    pub fn build_as(&self, query: &ConflictQuery, format: ExportFormat) -> Vec<(String, String)> {
        let mut params = vec![
            ("key".to_string(), self.config.access_key.clone()),
            ("email".to_string(), self.config.email.clone()),
            ("format".to_string(), format.to_string()),
        ];
        params.extend(
            query
                .params()
                .into_iter()
                .filter(|(name, _)| !matches!(name.as_str(), "key" | "email" | "format")),
        );
        params
    }
}

/// Events inside `window`, capped at `limit`.
#[must_use]
pub fn recent(window: DateWindow, limit: u32) -> ConflictQuery {
    ConflictQuery::new()
        .with_date_window(window)
        .with_fields(MAP_FIELDS)
        .with_limit(limit)
}

/// Violent events for one country and year.
#[must_use]
pub fn country(country: &str, year: i32) -> ConflictQuery {
    ConflictQuery::new()
        .with_country(country)
        .with_year(year)
        .with_event_types(EventType::violent())
        .with_fields(MAP_FIELDS)
        .with_limit(COUNTRY_LIMIT)
}

/// Events inside `bbox` and `window`.
#[must_use]
pub fn bounding_box(bbox: BoundingBox, window: DateWindow) -> ConflictQuery {
    ConflictQuery::new()
        .with_bounding_box(bbox)
        .with_date_window(window)
        .with_fields(MAP_FIELDS)
        .with_limit(REGION_LIMIT)
}

/// Events of the given types for one country and year, statistics fields
/// only.
#[must_use]
pub fn country_stats(country: &str, year: i32, types: &[EventType]) -> ConflictQuery {
    ConflictQuery::new()
        .with_country(country)
        .with_year(year)
        .with_event_types(types)
        .with_fields(STATS_FIELDS)
        .with_limit(COUNTRY_LIMIT)
}

/// All events for one country during the month containing `day`,
/// statistics fields only.
#[must_use]
pub fn country_month(country: &str, day: NaiveDate) -> ConflictQuery {
    ConflictQuery::new()
        .with_country(country)
        .with_date_window(DateWindow::month_of(day))
        .with_fields(STATS_FIELDS)
        .with_limit(COUNTRY_LIMIT)
}
