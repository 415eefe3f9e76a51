#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregations over conflict events.
//!
//! [`score`] turns a set of events into a 0-10 [`PeaceScore`]. [`country`]
//! runs the per-country aggregations that need their own ACLED queries:
//! the yearly peace index and the monthly trend.
//!
//! [`PeaceScore`]: peace_map_conflict_models::PeaceScore

pub mod country;
pub mod score;

pub use country::{monthly_trend, peace_index};
pub use score::{peace_score, score_counts};

use peace_map_acled::AcledError;
use thiserror::Error;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// An ACLED request failed.
    #[error(transparent)]
    Acled(#[from] AcledError),
}
