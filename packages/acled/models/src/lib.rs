#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! ACLED query, credential, and response envelope types.
//!
//! A [`ConflictQuery`] describes *what* to ask the ACLED `read` endpoint
//! for, independent of credentials. Its [`ConflictQuery::cache_key`] is a
//! canonical hash of every filter, so two different queries never share a
//! cache entry.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};
use peace_map_conflict_models::EventType;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default ACLED API host.
pub const DEFAULT_BASE_URL: &str = "https://api.acleddata.com";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Separator ACLED uses for OR conditions within a single parameter.
pub const OR_SEPARATOR: &str = ":OR:";

/// ACLED API endpoints that answer with the standard envelope.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Endpoint {
    /// Conflict events (`acled/read`)
    Events,
    /// Events removed from the dataset since publication (`deleted/read`)
    Deleted,
    /// Actor reference list (`actor/read`)
    Actors,
    /// Country reference list (`country/read`)
    Countries,
    /// Region reference list (`region/read`)
    Regions,
}

impl Endpoint {
    /// Path below the API host.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Events => "acled/read",
            Self::Deleted => "deleted/read",
            Self::Actors => "actor/read",
            Self::Countries => "country/read",
            Self::Regions => "region/read",
        }
    }
}

/// Response formats offered by the event endpoint.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
    Xml,
    Txt,
}

impl ExportFormat {
    /// Suffix appended to the endpoint path; JSON uses the bare path.
    #[must_use]
    pub const fn path_suffix(self) -> &'static str {
        match self {
            Self::Json => "",
            Self::Csv => ".csv",
            Self::Xml => ".xml",
            Self::Txt => ".txt",
        }
    }
}

/// A raw ACLED record: an opaque JSON object keyed by ACLED field names.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Credentials and endpoint for the ACLED API.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcledConfig {
    /// Registered account email.
    #[serde(default)]
    pub email: String,
    /// ACLED access key.
    #[serde(default)]
    pub access_key: String,
    /// API host, without a trailing path.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for AcledConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            access_key: String::new(),
            base_url: default_base_url(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AcledConfig {
    /// Creates a config for the default host.
    #[must_use]
    pub fn new(email: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            access_key: access_key.into(),
            ..Self::default()
        }
    }

    /// Whether both credentials are present.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.email.trim().is_empty() && !self.access_key.trim().is_empty()
    }

    /// The access key reduced to its first five characters, for logs.
    #[must_use]
    pub fn masked_key(&self) -> String {
        if self.access_key.is_empty() {
            return "NOT SET".to_string();
        }
        let prefix: String = self.access_key.chars().take(5).collect();
        format!("{prefix}...")
    }

    /// The email with everything before the `@` reduced to its first
    /// character, for logs.
    #[must_use]
    pub fn masked_email(&self) -> String {
        if self.email.is_empty() {
            return "NOT SET".to_string();
        }
        match self.email.split_once('@') {
            Some((user, domain)) => {
                let first: String = user.chars().take(1).collect();
                format!("{first}***@{domain}")
            }
            None => "***".to_string(),
        }
    }

    /// Full URL of the event `read` endpoint.
    #[must_use]
    pub fn read_url(&self) -> String {
        self.endpoint_url(Endpoint::Events)
    }

    /// Full URL of `endpoint`.
    #[must_use]
    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint.path())
    }

    /// Full URL of the event endpoint in `format`.
    #[must_use]
    pub fn export_url(&self, format: ExportFormat) -> String {
        format!("{}{}", self.read_url(), format.path_suffix())
    }
}

impl std::fmt::Debug for AcledConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcledConfig")
            .field("email", &self.masked_email())
            .field("access_key", &self.masked_key())
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    /// First day included.
    pub start: NaiveDate,
    /// Last day included.
    pub end: NaiveDate,
}

impl DateWindow {
    /// The window `[end - days, end]`.
    #[must_use]
    pub fn ending_on(end: NaiveDate, days: u32) -> Self {
        let start = end
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    /// The window ending on today's UTC date.
    #[must_use]
    pub fn ending_today(days: u32) -> Self {
        Self::ending_on(chrono::Utc::now().date_naive(), days)
    }

    /// The whole calendar month containing `day`.
    #[must_use]
    pub fn month_of(day: NaiveDate) -> Self {
        let start = day.with_day(1).unwrap_or(day);
        let end = start
            .checked_add_months(chrono::Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(day);
        Self { start, end }
    }

    /// `YYYY-MM` label of the window's start month.
    #[must_use]
    pub fn month_label(&self) -> String {
        self.start.format("%Y-%m").to_string()
    }

    /// The `event_date` parameter value (`start|end`).
    #[must_use]
    pub fn to_param(&self) -> String {
        format!(
            "{}|{}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// A latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lng: f64,
    /// Eastern edge.
    pub max_lng: f64,
}

impl BoundingBox {
    /// The `latitude` parameter value.
    #[must_use]
    pub fn latitude_param(&self) -> String {
        format!("{}|{}", self.min_lat, self.max_lat)
    }

    /// The `longitude` parameter value.
    #[must_use]
    pub fn longitude_param(&self) -> String {
        format!("{}|{}", self.min_lng, self.max_lng)
    }
}

/// A query against the ACLED `read` endpoint, without credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictQuery {
    /// Restrict to events inside this date window.
    pub date_window: Option<DateWindow>,
    /// Restrict to events inside this rectangle.
    pub bounding_box: Option<BoundingBox>,
    /// Restrict to one country.
    pub country: Option<String>,
    /// Restrict to one year.
    pub year: Option<i32>,
    /// Restrict to any of these event types.
    pub event_types: Vec<EventType>,
    /// Additional OR conditions (`field -> [a, b]` becomes `field=a:OR:b`).
    pub or_conditions: BTreeMap<String, Vec<String>>,
    /// Additional AND filters passed through verbatim.
    pub filters: BTreeMap<String, String>,
    /// Fields to return. Empty means the provider default.
    pub fields: Vec<String>,
    /// Result-count cap.
    pub limit: Option<u32>,
    /// One-based page number.
    pub page: Option<u32>,
}

impl ConflictQuery {
    /// An empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the date window.
    #[must_use]
    pub fn with_date_window(mut self, window: DateWindow) -> Self {
        self.date_window = Some(window);
        self
    }

    /// Sets the bounding box.
    #[must_use]
    pub fn with_bounding_box(mut self, bbox: BoundingBox) -> Self {
        self.bounding_box = Some(bbox);
        self
    }

    /// Sets the country filter.
    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Sets the year filter.
    #[must_use]
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Sets the event type filter.
    #[must_use]
    pub fn with_event_types(mut self, types: &[EventType]) -> Self {
        self.event_types = types.to_vec();
        self
    }

    /// Adds an OR condition over `values` for `field`.
    #[must_use]
    pub fn with_or_condition<S: Into<String>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        self.or_conditions
            .insert(field.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Adds a verbatim AND filter.
    #[must_use]
    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    /// Sets the returned fields.
    #[must_use]
    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }

    /// Sets the result-count cap.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the page number.
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Query parameters for this query, sorted by name, without
    /// credentials or `format`.
    #[must_use]
    pub fn params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();

        if let Some(window) = &self.date_window {
            params.insert("event_date".to_string(), window.to_param());
            params.insert("event_date_where".to_string(), "BETWEEN".to_string());
        }
        if let Some(bbox) = &self.bounding_box {
            params.insert("latitude".to_string(), bbox.latitude_param());
            params.insert("latitude_where".to_string(), "BETWEEN".to_string());
            params.insert("longitude".to_string(), bbox.longitude_param());
            params.insert("longitude_where".to_string(), "BETWEEN".to_string());
        }
        if let Some(country) = &self.country {
            params.insert("country".to_string(), country.clone());
        }
        if let Some(year) = self.year {
            params.insert("year".to_string(), year.to_string());
        }
        if !self.event_types.is_empty() {
            let joined = self
                .event_types
                .iter()
                .map(|t| -> &str { t.as_ref() })
                .collect::<Vec<_>>()
                .join(OR_SEPARATOR);
            params.insert("event_type".to_string(), joined);
        }
        for (field, values) in &self.or_conditions {
            params.insert(field.clone(), values.join(OR_SEPARATOR));
        }
        for (field, value) in &self.filters {
            params.insert(field.clone(), value.clone());
        }
        if !self.fields.is_empty() {
            params.insert("fields".to_string(), self.fields.join(","));
        }
        if let Some(limit) = self.limit {
            params.insert("limit".to_string(), limit.to_string());
        }
        if let Some(page) = self.page {
            params.insert("page".to_string(), page.to_string());
        }

        params
    }

    /// Canonical SHA-256 hex digest of [`Self::params`].
    ///
    /// Queries differing in any filter, window, limit or page produce
    /// different keys. The parameters are hashed in their JSON form so
    /// that separators inside values cannot alias other parameters.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let canonical = serde_json::to_vec(&self.params()).unwrap_or_default();
        hex::encode(Sha256::digest(canonical))
    }
}

/// The ACLED response envelope.
///
/// Every field is optional: the envelope is validated after parsing so
/// that missing pieces map to specific errors rather than a generic parse
/// failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Whether the provider considers the request successful.
    #[serde(default)]
    pub success: Option<bool>,
    /// Total matching records reported by the provider.
    #[serde(default)]
    pub count: Option<serde_json::Value>,
    /// The records.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    /// Error detail, either a string or an object.
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    /// Informational or error messages (an array, or a single string).
    #[serde(default)]
    pub messages: Option<serde_json::Value>,
    /// Provider data timestamp.
    #[serde(default)]
    pub last_update: Option<serde_json::Value>,
}

impl Envelope {
    /// Reported total count, when it is a number or numeric string.
    #[must_use]
    pub fn reported_count(&self) -> Option<u64> {
        match self.count.as_ref()? {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Best-effort error message, looked up in `error` (string),
    /// `error.message`, `error.error`, then the joined `messages`.
    #[must_use]
    pub fn error_message(&self) -> String {
        if let Some(error) = &self.error {
            if let Some(s) = error.as_str() {
                return s.to_string();
            }
            for key in ["message", "error"] {
                if let Some(s) = error.get(key).and_then(serde_json::Value::as_str) {
                    return s.to_string();
                }
            }
        }

        match &self.messages {
            Some(serde_json::Value::String(s)) if !s.is_empty() => return s.clone(),
            Some(serde_json::Value::Array(messages)) if !messages.is_empty() => {
                return messages
                    .iter()
                    .map(|m| m.as_str().map_or_else(|| m.to_string(), ToString::to_string))
                    .collect::<Vec<_>>()
                    .join("; ");
            }
            _ => {}
        }

        "Unknown error".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn window_is_inclusive_of_today() {
        let window = DateWindow::ending_on(date(2024, 3, 31), 30);
        assert_eq!(window.start, date(2024, 3, 1));
        assert_eq!(window.to_param(), "2024-03-01|2024-03-31");
    }

    #[test]
    fn month_window_spans_whole_month() {
        let window = DateWindow::month_of(date(2024, 2, 17));
        assert_eq!(window.to_param(), "2024-02-01|2024-02-29");
        assert_eq!(window.month_label(), "2024-02");
    }

    #[test]
    fn params_include_filters() {
        let query = ConflictQuery::new()
            .with_country("Ukraine")
            .with_year(2024)
            .with_event_types(EventType::violent())
            .with_limit(5000);
        let params = query.params();
        assert_eq!(params["country"], "Ukraine");
        assert_eq!(params["year"], "2024");
        assert_eq!(
            params["event_type"],
            "Violence against civilians:OR:Battles:OR:Explosions/Remote violence"
        );
        assert_eq!(params["limit"], "5000");
        assert!(!params.contains_key("event_date"));
    }

    #[test]
    fn bounding_box_params() {
        let query = ConflictQuery::new().with_bounding_box(BoundingBox {
            min_lat: 44.0,
            max_lat: 52.5,
            min_lng: 22.0,
            max_lng: 40.25,
        });
        let params = query.params();
        assert_eq!(params["latitude"], "44|52.5");
        assert_eq!(params["latitude_where"], "BETWEEN");
        assert_eq!(params["longitude"], "22|40.25");
    }

    #[test]
    fn or_conditions_are_joined() {
        let query =
            ConflictQuery::new().with_or_condition("country", ["Ukraine", "Syria"]);
        assert_eq!(query.params()["country"], "Ukraine:OR:Syria");
    }

    #[test]
    fn cache_key_differs_per_query() {
        let thirty = ConflictQuery::new()
            .with_date_window(DateWindow::ending_on(date(2024, 3, 31), 30))
            .with_limit(5000);
        let seven = ConflictQuery::new()
            .with_date_window(DateWindow::ending_on(date(2024, 3, 31), 7))
            .with_limit(5000);
        assert_ne!(thirty.cache_key(), seven.cache_key());
        assert_eq!(thirty.cache_key(), thirty.clone().cache_key());
        assert_eq!(thirty.cache_key().len(), 64);
    }

    #[test]
    fn cache_key_does_not_alias_separators_in_values() {
        let embedded = ConflictQuery::new().with_filter("a", "1&b=2");
        let separate = ConflictQuery::new()
            .with_filter("a", "1")
            .with_filter("b", "2");
        assert_ne!(embedded.cache_key(), separate.cache_key());

        let pipe = ConflictQuery::new().with_filter("a", "1=2");
        let split = ConflictQuery::new().with_filter("a=1", "2");
        assert_ne!(pipe.cache_key(), split.cache_key());
    }

    #[test]
    fn envelope_error_message_shapes() {
        let plain: Envelope =
            serde_json::from_str(r#"{"success":false,"error":"Invalid key"}"#).unwrap();
        assert_eq!(plain.error_message(), "Invalid key");

        let nested: Envelope =
            serde_json::from_str(r#"{"success":false,"error":{"status":400,"message":"Bad"}}"#)
                .unwrap();
        assert_eq!(nested.error_message(), "Bad");

        let messages: Envelope =
            serde_json::from_str(r#"{"success":false,"messages":["a","b"]}"#).unwrap();
        assert_eq!(messages.error_message(), "a; b");

        assert_eq!(Envelope::default().error_message(), "Unknown error");
    }

    #[test]
    fn reported_count_accepts_strings() {
        let env: Envelope = serde_json::from_str(r#"{"count":"12"}"#).unwrap();
        assert_eq!(env.reported_count(), Some(12));
    }

    #[test]
    fn config_from_toml_uses_defaults() {
        let config: AcledConfig =
            toml::from_str("email = \"a@b.org\"\naccess_key = \"abcdefgh\"").unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.has_credentials());
        assert_eq!(config.masked_key(), "abcde...");
        assert!(!format!("{config:?}").contains("abcdefgh"));
    }

    #[test]
    fn email_is_masked_in_debug_output() {
        let config = AcledConfig::new("analyst@example.org", "abcdefgh");
        assert_eq!(config.masked_email(), "a***@example.org");
        let shown = format!("{config:?}");
        assert!(!shown.contains("analyst"), "{shown}");
        assert_eq!(AcledConfig::default().masked_email(), "NOT SET");
        assert_eq!(AcledConfig::new("no-at-sign", "k").masked_email(), "***");
    }

    #[test]
    fn endpoint_urls() {
        let config = AcledConfig::new("a@b.org", "k");
        assert_eq!(
            config.endpoint_url(Endpoint::Deleted),
            "https://api.acleddata.com/deleted/read"
        );
        assert_eq!(
            config.endpoint_url(Endpoint::Actors),
            "https://api.acleddata.com/actor/read"
        );
        assert_eq!(config.endpoint_url(Endpoint::Events), config.read_url());
        assert_eq!(
            config.export_url(ExportFormat::Csv),
            "https://api.acleddata.com/acled/read.csv"
        );
        assert_eq!(config.export_url(ExportFormat::Json), config.read_url());
        assert_eq!("countries".parse::<Endpoint>().unwrap(), Endpoint::Countries);
        assert_eq!("xml".parse::<ExportFormat>().unwrap(), ExportFormat::Xml);
        assert!("events.csv".parse::<Endpoint>().is_err());
    }

    #[test]
    fn read_url_trims_trailing_slash() {
        let mut config = AcledConfig::new("a@b.org", "k");
        config.base_url = "http://localhost:8080/".to_string();
        assert_eq!(config.read_url(), "http://localhost:8080/acled/read");
    }
}
