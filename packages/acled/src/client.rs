//! The ACLED client and its fetch operations.

use std::time::Duration;

use peace_map_acled_models::{
    AcledConfig, BoundingBox, ConflictQuery, DateWindow, Endpoint, ExportFormat, RawRecord,
};
use peace_map_cache::ResultCache;

use crate::AcledError;
use crate::envelope::{AcledPage, check_status, parse_response};
use crate::query::{self, QueryBuilder};
use crate::transport::{ReqwestTransport, Transport};

/// Authenticated client for the ACLED `read` endpoint.
///
/// Construction fails without credentials, so every fetch operation can
/// assume they are present.
#[derive(Debug)]
pub struct AcledClient<T: Transport = ReqwestTransport> {
    config: AcledConfig,
    transport: T,
    cache: Option<ResultCache>,
}

impl AcledClient<ReqwestTransport> {
    /// Creates a client backed by `reqwest` with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`AcledError::MissingCredentials`] if the email or access
    /// key is empty, or [`AcledError::Network`] if the HTTP client cannot
    /// be built.
    pub fn new(config: AcledConfig) -> Result<Self, AcledError> {
        if !config.has_credentials() {
            return Err(AcledError::MissingCredentials);
        }
        let transport = ReqwestTransport::new(Duration::from_secs(config.timeout_secs))?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> AcledClient<T> {
    /// Creates a client over a custom transport.
    ///
    /// # Errors
    ///
    /// Returns [`AcledError::MissingCredentials`] if the email or access
    /// key is empty.
    pub fn with_transport(config: AcledConfig, transport: T) -> Result<Self, AcledError> {
        if !config.has_credentials() {
            return Err(AcledError::MissingCredentials);
        }
        log::debug!(
            "ACLED client for {} (email: {}, key: {})",
            config.base_url,
            config.masked_email(),
            config.masked_key()
        );
        Ok(Self {
            config,
            transport,
            cache: None,
        })
    }

    /// Enables response caching for [`Self::fetch_all`].
    #[must_use]
    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The client's configuration.
    #[must_use]
    pub const fn config(&self) -> &AcledConfig {
        &self.config
    }

    /// The underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// The response cache, if enabled.
    #[must_use]
    pub const fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_ref()
    }

    /// Clears every cached response.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear_all();
        }
    }

    /// Runs a single request for `query`. No caching, no retries.
    ///
    /// # Errors
    ///
    /// Returns [`AcledError`] if the request fails or the response is not
    /// a valid envelope.
    pub async fn fetch(&self, query: &ConflictQuery) -> Result<AcledPage, AcledError> {
        self.fetch_endpoint(Endpoint::Events, query).await
    }

    /// Runs a single request for `query` against `endpoint`. The reference
    /// endpoints share the event endpoint's envelope, so the same
    /// validation applies.
    ///
    /// # Errors
    ///
    /// Returns [`AcledError`] if the request fails or the response is not
    /// a valid envelope.
    pub async fn fetch_endpoint(
        &self,
        endpoint: Endpoint,
        query: &ConflictQuery,
    ) -> Result<AcledPage, AcledError> {
        let params = QueryBuilder::new(&self.config).build(query);
        let limit = query
            .limit
            .map_or_else(|| "default".to_string(), |l| l.to_string());

        log::info!("Fetching ACLED {endpoint} (limit={limit})");
        let response = self
            .transport
            .get(&self.config.endpoint_url(endpoint), &params)
            .await?;
        let page = parse_response(&response)?;

        if page.is_truncated() {
            log::info!(
                "ACLED returned {} of {} matching {endpoint} (limit={limit})",
                page.records.len(),
                page.reported_count.unwrap_or_default()
            );
        } else {
            log::info!("ACLED returned {} {endpoint}", page.records.len());
        }

        Ok(page)
    }

    /// Downloads events matching `query` as raw text in `format`.
    ///
    /// A JSON download must still be a valid envelope; the other formats
    /// are returned as received once the status is successful.
    ///
    /// # Errors
    ///
    /// Returns [`AcledError`] if the request fails, the status is not
    /// successful, or a JSON body is not a valid envelope.
    pub async fn download(
        &self,
        query: &ConflictQuery,
        format: ExportFormat,
    ) -> Result<String, AcledError> {
        let params = QueryBuilder::new(&self.config).build_as(query, format);

        log::info!("Downloading ACLED events as {format}");
        let response = self
            .transport
            .get(&self.config.export_url(format), &params)
            .await?;

        if format == ExportFormat::Json {
            parse_response(&response)?;
        } else {
            check_status(&response)?;
        }

        log::info!("Downloaded {} bytes of {format}", response.body.len());
        Ok(response.body)
    }

    /// Events from the last `days` days (inclusive of today, UTC), capped
    /// at `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`AcledError`] if the request fails.
    pub async fn fetch_recent(&self, days: u32, limit: u32) -> Result<Vec<RawRecord>, AcledError> {
        self.fetch_recent_in(DateWindow::ending_today(days), limit)
            .await
    }

    /// Events inside `window`, capped at `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`AcledError`] if the request fails.
    pub async fn fetch_recent_in(
        &self,
        window: DateWindow,
        limit: u32,
    ) -> Result<Vec<RawRecord>, AcledError> {
        Ok(self.fetch(&query::recent(window, limit)).await?.records)
    }

    /// All events from the last `days` days, served from the cache when a
    /// fresh entry exists.
    ///
    /// # Errors
    ///
    /// Returns the error of the degraded retry if both attempts fail.
    pub async fn fetch_all(&self, days: u32) -> Result<Vec<RawRecord>, AcledError> {
        self.fetch_all_in(DateWindow::ending_today(days)).await
    }

    /// [`Self::fetch_all`] for an explicit window.
    ///
    /// On a cache miss, requests [`query::FETCH_ALL_LIMIT`] events. If that
    /// fails for any reason, retries exactly once with
    /// [`query::FETCH_ALL_FALLBACK_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns the error of the degraded retry if both attempts fail.
    pub async fn fetch_all_in(&self, window: DateWindow) -> Result<Vec<RawRecord>, AcledError> {
        let cache_key = fetch_all_cache_key(window);

        if let Some(cache) = &self.cache
            && let Some(records) = cache.get::<Vec<RawRecord>>(&cache_key)
        {
            log::info!(
                "Using {} cached ACLED events for {}",
                records.len(),
                window.to_param()
            );
            return Ok(records);
        }

        let records = match self.fetch_recent_in(window, query::FETCH_ALL_LIMIT).await {
            Ok(records) => records,
            Err(e) => {
                log::warn!(
                    "ACLED fetch with limit {} failed ({e}), retrying with limit {}",
                    query::FETCH_ALL_LIMIT,
                    query::FETCH_ALL_FALLBACK_LIMIT
                );
                self.fetch_recent_in(window, query::FETCH_ALL_FALLBACK_LIMIT)
                    .await?
            }
        };

        if let Some(cache) = &self.cache {
            cache.put(&cache_key, &records);
        }

        Ok(records)
    }

    /// Violent events for `country` during `year`. Not cached.
    ///
    /// # Errors
    ///
    /// Returns [`AcledError`] if the request fails.
    pub async fn fetch_by_country(
        &self,
        country: &str,
        year: i32,
    ) -> Result<Vec<RawRecord>, AcledError> {
        Ok(self.fetch(&query::country(country, year)).await?.records)
    }

    /// Events inside `bbox` from the last `days` days. Not cached.
    ///
    /// # Errors
    ///
    /// Returns [`AcledError`] if the request fails.
    pub async fn fetch_by_bounding_box(
        &self,
        bbox: BoundingBox,
        days: u32,
    ) -> Result<Vec<RawRecord>, AcledError> {
        let query = query::bounding_box(bbox, DateWindow::ending_today(days));
        Ok(self.fetch(&query).await?.records)
    }

    /// Fetches up to `max_pages` pages of `query` and concatenates them.
    ///
    /// Stops at the first empty or short page. A failure on the first
    /// page is returned; a failure on a later page ends pagination and
    /// keeps what was already fetched.
    ///
    /// # Errors
    ///
    /// Returns [`AcledError`] if the first page fails.
    pub async fn fetch_paginated(
        &self,
        query: &ConflictQuery,
        max_pages: u32,
    ) -> Result<Vec<RawRecord>, AcledError> {
        let page_size = query.limit.unwrap_or(query::PAGE_SIZE);
        let page_len = usize::try_from(page_size).unwrap_or(usize::MAX);
        let mut records = Vec::new();

        for page in 1..=max_pages {
            let page_query = query.clone().with_limit(page_size).with_page(page);
            match self.fetch(&page_query).await {
                Ok(result) => {
                    let count = result.records.len();
                    records.extend(result.records);
                    log::info!("Page {page}: {count} events (total: {})", records.len());
                    if count < page_len {
                        break;
                    }
                }
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    log::warn!("Stopping pagination at page {page}: {e}");
                    break;
                }
            }
        }

        Ok(records)
    }
}

/// Cache key for [`AcledClient::fetch_all_in`].
///
/// The limit is left out so that a degraded result is found again by the
/// next call for the same window.
#[must_use]
pub fn fetch_all_cache_key(window: DateWindow) -> String {
    ConflictQuery::new()
        .with_date_window(window)
        .with_fields(query::MAP_FIELDS)
        .cache_key()
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::transport::HttpResponse;

    #[derive(Debug, Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<HttpResponse, AcledError>>>,
        calls: Mutex<Vec<Vec<(String, String)>>>,
        urls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<HttpResponse, AcledError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::default(),
                urls: Mutex::default(),
            }
        }

        fn calls(&self) -> Vec<Vec<(String, String)>> {
            self.calls.lock().unwrap().clone()
        }

        fn urls(&self) -> Vec<String> {
            self.urls.lock().unwrap().clone()
        }

        fn param(&self, call: usize, name: &str) -> Option<String> {
            self.calls()[call]
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(
            &self,
            url: &str,
            params: &[(String, String)],
        ) -> Result<HttpResponse, AcledError> {
            self.urls.lock().unwrap().push(url.to_string());
            self.calls.lock().unwrap().push(params.to_vec());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(AcledError::Network {
                        message: "no scripted response".to_string(),
                    })
                })
        }
    }

    fn ok(body: &str) -> Result<HttpResponse, AcledError> {
        Ok(HttpResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    fn status(code: u16) -> Result<HttpResponse, AcledError> {
        Ok(HttpResponse {
            status: code,
            body: String::new(),
        })
    }

    fn network_down() -> Result<HttpResponse, AcledError> {
        Err(AcledError::Network {
            message: "connection refused".to_string(),
        })
    }

    const TWO_EVENTS: &str = r#"{"success":true,"count":2,"data":[
        {"event_id_cnty":"UKR1","event_type":"Battles","latitude":"50.45","longitude":"30.52"},
        {"event_id_cnty":"TUN1","event_type":"Protests","latitude":"33.88","longitude":"9.53"}
    ]}"#;

    fn client(responses: Vec<Result<HttpResponse, AcledError>>) -> AcledClient<ScriptedTransport> {
        AcledClient::with_transport(
            AcledConfig::new("analyst@example.org", "secret-key"),
            ScriptedTransport::new(responses),
        )
        .unwrap()
    }

    fn window() -> DateWindow {
        DateWindow::ending_on(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(), 30)
    }

    #[test]
    fn rejects_missing_credentials() {
        let err = AcledClient::with_transport(
            AcledConfig::new("", "key"),
            ScriptedTransport::default(),
        )
        .unwrap_err();
        assert_eq!(err, AcledError::MissingCredentials);
        assert!(AcledClient::new(AcledConfig::new("a@b.org", " ")).is_err());
    }

    #[tokio::test]
    async fn fetch_recent_sends_window_and_limit() {
        let client = client(vec![ok(TWO_EVENTS)]);
        let records = client.fetch_recent_in(window(), 250).await.unwrap();
        assert_eq!(records.len(), 2);
        let transport = client.transport();
        assert_eq!(transport.param(0, "limit").as_deref(), Some("250"));
        assert_eq!(
            transport.param(0, "event_date").as_deref(),
            Some("2024-01-01|2024-01-31")
        );
        assert_eq!(transport.param(0, "key").as_deref(), Some("secret-key"));
    }

    #[tokio::test]
    async fn status_errors_are_not_retried() {
        let client = client(vec![status(401), ok(TWO_EVENTS)]);
        let err = client.fetch_recent_in(window(), 10).await.unwrap_err();
        assert!(matches!(err, AcledError::Auth { .. }));
        assert_eq!(client.transport().calls().len(), 1);
    }

    #[tokio::test]
    async fn fetch_all_uses_upper_bound_first() {
        let client = client(vec![ok(TWO_EVENTS)]);
        let records = client.fetch_all_in(window()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(client.transport().calls().len(), 1);
        assert_eq!(client.transport().param(0, "limit").as_deref(), Some("5000"));
    }

    #[tokio::test]
    async fn fetch_all_degrades_once() {
        let client = client(vec![status(500), ok(TWO_EVENTS)]);
        let records = client.fetch_all_in(window()).await.unwrap();
        assert_eq!(records.len(), 2);
        let transport = client.transport();
        assert_eq!(transport.calls().len(), 2);
        assert_eq!(transport.param(0, "limit").as_deref(), Some("5000"));
        assert_eq!(transport.param(1, "limit").as_deref(), Some("1000"));
    }

    #[tokio::test]
    async fn fetch_all_surfaces_second_error() {
        let client = client(vec![status(429), network_down(), ok(TWO_EVENTS)]);
        let err = client.fetch_all_in(window()).await.unwrap_err();
        assert!(matches!(err, AcledError::Network { .. }));
        assert_eq!(client.transport().calls().len(), 2);
    }

    #[tokio::test]
    async fn fetch_all_serves_from_cache() {
        let client = client(vec![ok(TWO_EVENTS)]).with_cache(ResultCache::in_memory());
        let first = client.fetch_all_in(window()).await.unwrap();
        let second = client.fetch_all_in(window()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(client.transport().calls().len(), 1);
    }

    #[tokio::test]
    async fn fetch_all_caches_per_window() {
        let client = client(vec![ok(TWO_EVENTS), ok(r#"{"success":true,"data":[]}"#)])
            .with_cache(ResultCache::in_memory());
        let thirty = client.fetch_all_in(window()).await.unwrap();
        let seven = client
            .fetch_all_in(DateWindow::ending_on(window().end, 7))
            .await
            .unwrap();
        assert_eq!(thirty.len(), 2);
        assert!(seven.is_empty());
        assert_eq!(client.transport().calls().len(), 2);
    }

    #[tokio::test]
    async fn failed_fetch_all_is_not_cached() {
        let client = client(vec![status(500), status(500), ok(TWO_EVENTS)])
            .with_cache(ResultCache::in_memory());
        assert!(client.fetch_all_in(window()).await.is_err());
        let records = client.fetch_all_in(window()).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn clear_cache_forces_refetch() {
        let client = client(vec![ok(TWO_EVENTS), ok(TWO_EVENTS)])
            .with_cache(ResultCache::in_memory());
        client.fetch_all_in(window()).await.unwrap();
        client.clear_cache();
        client.fetch_all_in(window()).await.unwrap();
        assert_eq!(client.transport().calls().len(), 2);
    }

    #[tokio::test]
    async fn country_and_region_are_not_cached() {
        let client = client(vec![ok(TWO_EVENTS), ok(TWO_EVENTS)])
            .with_cache(ResultCache::in_memory());
        client.fetch_by_country("Ukraine", 2024).await.unwrap();
        client.fetch_by_country("Ukraine", 2024).await.unwrap();
        let transport = client.transport();
        assert_eq!(transport.calls().len(), 2);
        assert_eq!(transport.param(0, "country").as_deref(), Some("Ukraine"));
        assert_eq!(transport.param(0, "year").as_deref(), Some("2024"));
    }

    #[tokio::test]
    async fn bounding_box_sends_ranges() {
        let client = client(vec![ok(TWO_EVENTS)]);
        let bbox = BoundingBox {
            min_lat: 44.0,
            max_lat: 52.0,
            min_lng: 22.0,
            max_lng: 40.0,
        };
        client.fetch_by_bounding_box(bbox, 30).await.unwrap();
        let transport = client.transport();
        assert_eq!(transport.param(0, "latitude").as_deref(), Some("44|52"));
        assert_eq!(transport.param(0, "longitude").as_deref(), Some("22|40"));
        assert_eq!(transport.param(0, "limit").as_deref(), Some("2000"));
    }

    #[tokio::test]
    async fn pagination_stops_on_short_page() {
        let full = r#"{"success":true,"data":[{"a":1},{"a":2}]}"#;
        let short = r#"{"success":true,"data":[{"a":3}]}"#;
        let client = client(vec![ok(full), ok(short), ok(full)]);
        let query = ConflictQuery::new().with_country("Mali").with_limit(2);
        let records = client.fetch_paginated(&query, 10).await.unwrap();
        assert_eq!(records.len(), 3);
        let transport = client.transport();
        assert_eq!(transport.calls().len(), 2);
        assert_eq!(transport.param(1, "page").as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn pagination_respects_max_pages_and_keeps_partial_results() {
        let full = r#"{"success":true,"data":[{"a":1},{"a":2}]}"#;
        let client = client(vec![ok(full), status(500)]);
        let query = ConflictQuery::new().with_limit(2);
        let records = client.fetch_paginated(&query, 5).await.unwrap();
        assert_eq!(records.len(), 2);

        let client = self::client(vec![ok(full), ok(full), ok(full)]);
        let records = client.fetch_paginated(&query, 2).await.unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(client.transport().calls().len(), 2);
    }

    #[tokio::test]
    async fn pagination_propagates_first_page_error() {
        let client = client(vec![status(403)]);
        let err = client
            .fetch_paginated(&ConflictQuery::new(), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, AcledError::AccessDenied { .. }));
    }

    #[tokio::test]
    async fn reference_endpoints_share_envelope_handling() {
        let actors = r#"{"success":true,"count":1,"data":[{"actor_name":"Civilians (Mali)"}]}"#;
        let client = client(vec![ok(actors), ok(r#"{"success":false,"error":"Bad"}"#)]);

        let query = ConflictQuery::new().with_country("Mali").with_limit(50);
        let page = client.fetch_endpoint(Endpoint::Actors, &query).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0]["actor_name"], "Civilians (Mali)");

        let err = client
            .fetch_endpoint(Endpoint::Deleted, &ConflictQuery::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AcledError::MalformedResponse { .. }));

        let transport = client.transport();
        assert_eq!(
            transport.urls(),
            vec![
                "https://api.acleddata.com/actor/read".to_string(),
                "https://api.acleddata.com/deleted/read".to_string(),
            ]
        );
        assert_eq!(transport.param(0, "country").as_deref(), Some("Mali"));
        assert_eq!(transport.param(0, "key").as_deref(), Some("secret-key"));
    }

    #[tokio::test]
    async fn fetch_uses_event_endpoint() {
        let client = client(vec![ok(TWO_EVENTS)]);
        client.fetch(&ConflictQuery::new()).await.unwrap();
        assert_eq!(
            client.transport().urls(),
            vec!["https://api.acleddata.com/acled/read".to_string()]
        );
    }

    #[tokio::test]
    async fn csv_download_returns_body_text() {
        let csv = "event_id_cnty,event_date\nUKR1,2024-01-01\n";
        let client = client(vec![ok(csv), status(429)]);
        let query = query::recent(window(), 10);

        let body = client.download(&query, ExportFormat::Csv).await.unwrap();
        assert_eq!(body, csv);
        let transport = client.transport();
        assert_eq!(
            transport.urls()[0],
            "https://api.acleddata.com/acled/read.csv"
        );
        assert_eq!(transport.param(0, "format").as_deref(), Some("csv"));

        let err = client.download(&query, ExportFormat::Xml).await.unwrap_err();
        assert!(matches!(err, AcledError::RateLimit { .. }));
    }

    #[tokio::test]
    async fn json_download_validates_envelope() {
        let client = client(vec![ok("<html>maintenance</html>"), ok(TWO_EVENTS)]);
        let query = query::recent(window(), 10);
        assert!(client.download(&query, ExportFormat::Json).await.is_err());
        let body = client.download(&query, ExportFormat::Json).await.unwrap();
        assert_eq!(body, TWO_EVENTS);
        assert_eq!(client.transport().param(1, "format").as_deref(), Some("json"));
    }

    #[tokio::test]
    async fn unreachable_api_error_hides_credentials() {
        let mut config = AcledConfig::new("analyst@example.org", "TOPSECRETKEY");
        config.base_url = "http://127.0.0.1:9".to_string();
        config.timeout_secs = 5;
        let client = AcledClient::new(config).unwrap();

        let err = client.fetch_all_in(window()).await.unwrap_err();
        assert!(matches!(err, AcledError::Network { .. }));
        let shown = err.to_string();
        assert!(!shown.contains("TOPSECRETKEY"), "{shown}");
        assert!(!shown.contains("analyst%40example.org"), "{shown}");
    }
}
