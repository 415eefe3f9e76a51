//! Response classification and envelope validation.
//!
//! Turns an [`HttpResponse`] into an [`AcledPage`] or a specific
//! [`AcledError`]. The provider wraps records in
//! `{ success, count, data, error?, messages? }`; an envelope that reports
//! `success: false` or carries no `data` array is malformed even when the
//! HTTP status is 200.

use peace_map_acled_models::{Envelope, RawRecord};

use crate::AcledError;
use crate::transport::HttpResponse;

/// Records from a single successful request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcledPage {
    /// The returned records.
    pub records: Vec<RawRecord>,
    /// Total matching records reported by the provider, which may exceed
    /// `records.len()` when the result was capped.
    pub reported_count: Option<u64>,
}

impl AcledPage {
    /// Whether the provider has more matching records than it returned.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.reported_count
            .is_some_and(|count| count > self.records.len() as u64)
    }
}

/// Classifies a response and unwraps its envelope.
///
/// # Errors
///
/// * [`AcledError::Auth`], [`AcledError::AccessDenied`],
///   [`AcledError::RateLimit`] for HTTP 401, 403 and 429.
/// * [`AcledError::Protocol`] for any other non-2xx status or a body that
///   is not a JSON object.
/// * [`AcledError::MalformedResponse`] when the envelope reports failure or
///   lacks a `data` array.
pub fn parse_response(response: &HttpResponse) -> Result<AcledPage, AcledError> {
    check_status(response)?;

    let value: serde_json::Value =
        serde_json::from_str(&response.body).map_err(|e| AcledError::Protocol {
            status: response.status,
            message: format!(
                "response body is not JSON ({e}): {}",
                response.body_preview()
            ),
        })?;

    if !value.is_object() {
        return Err(AcledError::Protocol {
            status: response.status,
            message: format!(
                "response body is not a JSON object: {}",
                response.body_preview()
            ),
        });
    }

    let envelope: Envelope =
        serde_json::from_value(value).map_err(|e| AcledError::Protocol {
            status: response.status,
            message: format!("unrecognized response envelope: {e}"),
        })?;

    unwrap_envelope(envelope)
}

/// Classifies the HTTP status of a response without looking at its body
/// shape.
///
/// # Errors
///
/// [`AcledError::Auth`], [`AcledError::AccessDenied`] and
/// [`AcledError::RateLimit`] for HTTP 401, 403 and 429;
/// [`AcledError::Protocol`] for any other non-2xx status.
pub fn check_status(response: &HttpResponse) -> Result<(), AcledError> {
    match response.status {
        200..=299 => Ok(()),
        401 => Err(AcledError::Auth {
            message: status_message(response),
        }),
        403 => Err(AcledError::AccessDenied {
            message: status_message(response),
        }),
        429 => Err(AcledError::RateLimit {
            message: status_message(response),
        }),
        status => Err(AcledError::Protocol {
            status,
            message: status_message(response),
        }),
    }
}

/// Validates an already-parsed envelope.
///
/// # Errors
///
/// Returns [`AcledError::MalformedResponse`] when `success` is `false` or
/// `data` is not an array.
pub fn unwrap_envelope(envelope: Envelope) -> Result<AcledPage, AcledError> {
    if envelope.success == Some(false) {
        return Err(AcledError::MalformedResponse {
            message: envelope.error_message(),
        });
    }

    let reported_count = envelope.reported_count();

    let Some(serde_json::Value::Array(data)) = envelope.data else {
        let detail = envelope.error_message();
        let message = if detail == "Unknown error" {
            "response envelope has no data array".to_string()
        } else {
            format!("response envelope has no data array: {detail}")
        };
        return Err(AcledError::MalformedResponse { message });
    };

    let total = data.len();
    let records: Vec<RawRecord> = data
        .into_iter()
        .filter_map(|value| match value {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        })
        .collect();

    if records.len() < total {
        log::warn!(
            "Skipped {} non-object entries in ACLED data array",
            total - records.len()
        );
    }

    Ok(AcledPage {
        records,
        reported_count,
    })
}

/// Best available message for an error status: the envelope's message
/// when the body is a JSON envelope, else a body preview.
fn status_message(response: &HttpResponse) -> String {
    serde_json::from_str::<Envelope>(&response.body)
        .ok()
        .map(|envelope| envelope.error_message())
        .filter(|message| message != "Unknown error")
        .unwrap_or_else(|| format!("HTTP {}: {}", response.status, response.body_preview()))
}
