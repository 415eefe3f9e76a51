//! Subcommand execution against a live client, and the sample-data
//! equivalents used when that is not possible.

use chrono::{Datelike as _, Utc};
use clap::Subcommand;
use peace_map_acled::{
    AcledClient, BoundingBox, ConflictQuery, DateWindow, Endpoint, ExportFormat, RawRecord,
    Transport, query,
};
use peace_map_analytics::{AnalyticsError, monthly_trend, peace_index, peace_score};
use peace_map_conflict_models::{ConflictEvent, MonthlyTrendPoint, PeaceIndex, PeaceScore};
use serde::Serialize;

use crate::fallback;

/// Default lookback for date-windowed commands.
const DEFAULT_DAYS: &str = "30";

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Recent events, uncached
    Recent {
        /// Days to look back from today
        #[arg(long, default_value = DEFAULT_DAYS)]
        days: u32,
        /// Maximum number of events
        #[arg(long, default_value_t = query::RECENT_LIMIT)]
        limit: u32,
    },
    /// All events in the window, served from the cache when fresh
    All {
        /// Days to look back from today
        #[arg(long, default_value = DEFAULT_DAYS)]
        days: u32,
    },
    /// Violent events for one country and year
    Country {
        /// Country name as ACLED spells it (e.g., "Nigeria")
        country: String,
        /// Year (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,
    },
    /// Events inside a latitude/longitude rectangle
    Region {
        #[arg(long, allow_negative_numbers = true)]
        min_lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        max_lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        min_lng: f64,
        #[arg(long, allow_negative_numbers = true)]
        max_lng: f64,
        /// Days to look back from today
        #[arg(long, default_value = DEFAULT_DAYS)]
        days: u32,
    },
    /// Peace score over all events in the window
    Score {
        /// Days to look back from today
        #[arg(long, default_value = DEFAULT_DAYS)]
        days: u32,
    },
    /// Yearly peace index for one country
    PeaceIndex {
        /// Country name as ACLED spells it
        country: String,
        /// Year (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,
    },
    /// Monthly event and fatality totals for one country
    Trend {
        /// Country name as ACLED spells it
        country: String,
        /// Number of calendar months, including the current one
        #[arg(long, default_value = "6")]
        months: u32,
    },
    /// Raw records from one endpoint: events, deleted, actors, countries
    /// or regions
    Reference {
        #[arg(value_parser = parse_endpoint)]
        endpoint: Endpoint,
        /// Restrict to one country
        #[arg(long)]
        country: Option<String>,
        /// Maximum number of records
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Recent events as json, csv, xml or txt, printed as received
    Export {
        /// Days to look back from today
        #[arg(long, default_value = DEFAULT_DAYS)]
        days: u32,
        #[arg(long, default_value = "csv", value_parser = parse_format)]
        format: ExportFormat,
        /// Maximum number of events
        #[arg(long, default_value_t = query::RECENT_LIMIT)]
        limit: u32,
    },
    /// Remove every cached response
    ClearCache,
}

fn parse_endpoint(s: &str) -> Result<Endpoint, String> {
    s.parse()
        .map_err(|_| format!("unknown endpoint '{s}' (events, deleted, actors, countries, regions)"))
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    s.parse()
        .map_err(|_| format!("unknown format '{s}' (json, csv, xml, txt)"))
}

/// What a command prints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Output {
    Events(Vec<ConflictEvent>),
    Score(PeaceScore),
    Index(PeaceIndex),
    Trend(Vec<MonthlyTrendPoint>),
    Records(Vec<RawRecord>),
    /// Printed verbatim rather than as JSON.
    Text(String),
    Cleared { cleared: bool },
}

fn year_or_current(year: Option<i32>) -> i32 {
    year.unwrap_or_else(|| Utc::now().year())
}

/// Runs `command` against the live API.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if a request the command depends on fails.
/// The monthly trend never fails; it skips months instead.
pub async fn run<T: Transport>(
    client: &AcledClient<T>,
    command: &Commands,
) -> Result<Output, AnalyticsError> {
    let output = match command {
        Commands::Recent { days, limit } => {
            Output::Events(peace_map_transform::transform(&client.fetch_recent(*days, *limit).await?))
        }
        Commands::All { days } => {
            Output::Events(peace_map_transform::transform(&client.fetch_all(*days).await?))
        }
        Commands::Country { country, year } => {
            let records = client
                .fetch_by_country(country, year_or_current(*year))
                .await?;
            Output::Events(peace_map_transform::transform(&records))
        }
        Commands::Region {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
            days,
        } => {
            let bbox = BoundingBox {
                min_lat: *min_lat,
                max_lat: *max_lat,
                min_lng: *min_lng,
                max_lng: *max_lng,
            };
            let records = client.fetch_by_bounding_box(bbox, *days).await?;
            Output::Events(peace_map_transform::transform(&records))
        }
        Commands::Score { days } => {
            let events = peace_map_transform::transform(&client.fetch_all(*days).await?);
            Output::Score(peace_score(&events))
        }
        Commands::PeaceIndex { country, year } => {
            Output::Index(peace_index(client, country, year_or_current(*year)).await?)
        }
        Commands::Trend { country, months } => {
            let today = Utc::now().date_naive();
            Output::Trend(monthly_trend(client, country, *months, today).await)
        }
        Commands::Reference {
            endpoint,
            country,
            limit,
        } => {
            let mut query = ConflictQuery::new();
            if let Some(country) = country {
                query = query.with_country(country.as_str());
            }
            if let Some(limit) = limit {
                query = query.with_limit(*limit);
            }
            Output::Records(client.fetch_endpoint(*endpoint, &query).await?.records)
        }
        Commands::Export {
            days,
            format,
            limit,
        } => {
            let query = query::recent(DateWindow::ending_today(*days), *limit);
            Output::Text(client.download(&query, *format).await?)
        }
        Commands::ClearCache => {
            client.clear_cache();
            Output::Cleared {
                cleared: client.cache().is_some(),
            }
        }
    };

    Ok(output)
}

/// The sample-data equivalent of `command`.
#[must_use]
pub fn fallback(command: &Commands) -> Output {
    match command {
        Commands::Recent { .. }
        | Commands::All { .. }
        | Commands::Country { .. }
        | Commands::Region { .. } => Output::Events(fallback::sample_events()),
        Commands::Score { .. } => Output::Score(peace_score(&fallback::sample_events())),
        Commands::PeaceIndex { country, year } => {
            Output::Index(fallback::sample_peace_index(country, year_or_current(*year)))
        }
        Commands::Trend { .. } => Output::Trend(fallback::sample_trend()),
        Commands::Reference {
            endpoint: Endpoint::Events,
            ..
        }
        | Commands::Export { .. } => Output::Records(fallback::sample_records()),
        Commands::Reference { .. } => Output::Records(Vec::new()),
        Commands::ClearCache => Output::Cleared { cleared: false },
    }
}
