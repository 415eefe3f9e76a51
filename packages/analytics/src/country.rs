//! Per-country aggregations that issue their own ACLED queries.

use chrono::{Datelike as _, Months, NaiveDate};
use peace_map_acled::{AcledClient, RawRecord, Transport, query};
use peace_map_acled_models::DateWindow;
use peace_map_conflict_models::{EventType, MonthlyTrendPoint, PeaceIndex};
use peace_map_transform::parsing::parse_fatalities;

use crate::AnalyticsError;
use crate::score::score_counts;

/// Event types counted as protests by the peace index.
const UNREST_TYPES: &[EventType] = &[EventType::Protests, EventType::Riots];

fn total_fatalities(records: &[RawRecord]) -> u64 {
    records
        .iter()
        .map(|r| u64::from(parse_fatalities(r.get("fatalities"))))
        .sum()
}

/// Yearly peace index for `country`.
///
/// Runs one query for the violent event types and one for protests and
/// riots. Fatalities are summed over the violent records only.
///
/// # Errors
///
/// Returns [`AnalyticsError::Acled`] if either query fails.
pub async fn peace_index<T: Transport>(
    client: &AcledClient<T>,
    country: &str,
    year: i32,
) -> Result<PeaceIndex, AnalyticsError> {
    let violent = client
        .fetch(&query::country_stats(country, year, EventType::violent()))
        .await?
        .records;
    let protests = client
        .fetch(&query::country_stats(country, year, UNREST_TYPES))
        .await?
        .records;

    let peace_score = score_counts(
        violent.len() as u64,
        protests.len() as u64,
        total_fatalities(&violent),
    );

    log::info!(
        "Peace index for {country} {year}: {} ({} violent, {} protest records)",
        peace_score.score,
        violent.len(),
        protests.len()
    );

    Ok(PeaceIndex {
        country: country.to_string(),
        year,
        violent_records: violent.len(),
        protest_records: protests.len(),
        peace_score,
    })
}

/// Event and fatality totals for each of the last `months` calendar months
/// up to and including the month of `today`, oldest first.
///
/// A month whose request fails is logged and left out of the result.
pub async fn monthly_trend<T: Transport>(
    client: &AcledClient<T>,
    country: &str,
    months: u32,
    today: NaiveDate,
) -> Vec<MonthlyTrendPoint> {
    let first_of_month = today.with_day(1).unwrap_or(today);
    let mut points = Vec::new();

    for back in (0..months).rev() {
        let Some(day) = first_of_month.checked_sub_months(Months::new(back)) else {
            continue;
        };
        let month = DateWindow::month_of(day).month_label();

        match client.fetch(&query::country_month(country, day)).await {
            Ok(page) => {
                let records = page.records.len() as u64;
                points.push(MonthlyTrendPoint {
                    month,
                    events: page.reported_count.unwrap_or(records),
                    fatalities: total_fatalities(&page.records),
                });
            }
            Err(e) => log::warn!("Skipping {month} for {country}: {e}"),
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use peace_map_acled::{AcledConfig, AcledError, HttpResponse};
    use peace_map_conflict_models::PeaceStatus;

    use super::*;

    /// Answers each request by looking at its parameters.
    struct RoutingTransport {
        route: fn(&[(String, String)]) -> HttpResponse,
        seen: Mutex<Vec<Vec<(String, String)>>>,
    }

    #[async_trait]
    impl Transport for RoutingTransport {
        async fn get(
            &self,
            _url: &str,
            params: &[(String, String)],
        ) -> Result<HttpResponse, AcledError> {
            self.seen.lock().unwrap().push(params.to_vec());
            Ok((self.route)(params))
        }
    }

    fn param<'a>(params: &'a [(String, String)], name: &str) -> &'a str {
        params
            .iter()
            .find(|(n, _)| n == name)
            .map_or("", |(_, v)| v.as_str())
    }

    fn ok(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    fn client(route: fn(&[(String, String)]) -> HttpResponse) -> AcledClient<RoutingTransport> {
        AcledClient::with_transport(
            AcledConfig::new("analyst@example.org", "secret-key"),
            RoutingTransport {
                route,
                seen: Mutex::default(),
            },
        )
        .unwrap()
    }

    fn country_year(params: &[(String, String)]) -> HttpResponse {
        if param(params, "event_type").starts_with("Protests") {
            ok(r#"{"success":true,"data":[
                {"event_type":"Protests","fatalities":"0"},
                {"event_type":"Riots","fatalities":"4"}
            ]}"#)
        } else {
            ok(r#"{"success":true,"data":[
                {"event_type":"Battles","fatalities":"15"},
                {"event_type":"Violence against civilians","fatalities":"5"},
                {"event_type":"Explosions/Remote violence","fatalities":"0"}
            ]}"#)
        }
    }

    #[tokio::test]
    async fn peace_index_scores_both_queries() {
        let client = client(country_year);
        let index = peace_index(&client, "Nigeria", 2024).await.unwrap();

        assert_eq!(index.violent_records, 3);
        assert_eq!(index.protest_records, 2);
        // riot fatalities are not counted
        assert_eq!(index.peace_score.fatalities, 20);
        // 10 - 0.3 - 0.1 - 0.2
        assert!((index.peace_score.score - 9.4).abs() < 1e-9);
        assert_eq!(index.peace_score.status, PeaceStatus::Peaceful);

        let seen = client.transport().seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(param(&seen[1], "event_type"), "Protests:OR:Riots");
        assert_eq!(param(&seen[0], "year"), "2024");
    }

    #[tokio::test]
    async fn peace_index_propagates_errors() {
        let client = client(|_| HttpResponse {
            status: 401,
            body: String::new(),
        });
        let err = peace_index(&client, "Nigeria", 2024).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::Acled(AcledError::Auth { .. })));
    }

    #[tokio::test]
    async fn monthly_trend_is_oldest_first() {
        let client = client(|params| {
            if param(params, "event_date").starts_with("2024-02") {
                ok(r#"{"success":true,"count":42,"data":[{"fatalities":"3"},{"fatalities":"x"}]}"#)
            } else {
                ok(r#"{"success":true,"data":[{"fatalities":"1"}]}"#)
            }
        });
        let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let points = monthly_trend(&client, "Mali", 3, today).await;

        let months: Vec<&str> = points.iter().map(|p| p.month.as_str()).collect();
        assert_eq!(months, vec!["2024-01", "2024-02", "2024-03"]);
        assert_eq!(points[1].events, 42);
        assert_eq!(points[1].fatalities, 3);
        assert_eq!(points[0].events, 1);

        let seen = client.transport().seen.lock().unwrap().clone();
        assert_eq!(param(&seen[0], "event_date"), "2024-01-01|2024-01-31");
        assert_eq!(param(&seen[1], "event_date"), "2024-02-01|2024-02-29");
    }

    #[tokio::test]
    async fn monthly_trend_skips_failed_months() {
        let client = client(|params| {
            if param(params, "event_date").starts_with("2023-12") {
                HttpResponse {
                    status: 500,
                    body: "boom".to_string(),
                }
            } else {
                ok(r#"{"success":true,"data":[]}"#)
            }
        });
        let today = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let points = monthly_trend(&client, "Mali", 3, today).await;

        let months: Vec<&str> = points.iter().map(|p| p.month.as_str()).collect();
        assert_eq!(months, vec!["2023-11", "2024-01"]);
    }

    #[tokio::test]
    async fn monthly_trend_with_zero_months_is_empty() {
        let client = client(|_| ok(r#"{"success":true,"data":[]}"#));
        let today = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert!(monthly_trend(&client, "Mali", 0, today).await.is_empty());
    }
}
