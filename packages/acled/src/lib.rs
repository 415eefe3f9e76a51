#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! ACLED API client.
//!
//! [`AcledClient`] issues authenticated `GET {base}/acled/read` requests
//! (and the same for the reference endpoints in [`Endpoint`]), validates the
//! response envelope, and classifies failures into [`AcledError`]. Requests
//! go through the [`transport::Transport`] trait so the HTTP layer can be
//! swapped out.
//!
//! Only [`AcledClient::fetch_all`] consults the result cache, and it is
//! also the only operation that retries: once, with a smaller limit.

pub mod client;
pub mod envelope;
pub mod query;
pub mod transport;

pub use client::AcledClient;
pub use envelope::AcledPage;
pub use peace_map_acled_models::{
    AcledConfig, BoundingBox, ConflictQuery, DateWindow, Endpoint, ExportFormat, RawRecord,
};
pub use transport::{HttpResponse, ReqwestTransport, Transport};

/// Errors that can occur while talking to the ACLED API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcledError {
    /// HTTP 401: the email/key pair was rejected.
    #[error("ACLED authentication failed: {message}")]
    Auth {
        /// Provider message, if any.
        message: String,
    },

    /// HTTP 403: the account may not access this data.
    #[error("ACLED access denied: {message}")]
    AccessDenied {
        /// Provider message, if any.
        message: String,
    },

    /// HTTP 429: too many requests.
    #[error("ACLED rate limit exceeded: {message}")]
    RateLimit {
        /// Provider message, if any.
        message: String,
    },

    /// No response was received (connection, DNS, timeout).
    #[error("Network error: {message}")]
    Network {
        /// Transport error description.
        message: String,
    },

    /// The envelope reported failure or carried no `data` array.
    #[error("Malformed ACLED response: {message}")]
    MalformedResponse {
        /// Message extracted from the envelope.
        message: String,
    },

    /// Any other unexpected status or body shape.
    #[error("Unexpected ACLED response (status {status}): {message}")]
    Protocol {
        /// HTTP status code.
        status: u16,
        /// Description of what was wrong.
        message: String,
    },

    /// The client was configured without an email or access key.
    #[error("ACLED credentials are not configured (email and access key are required)")]
    MissingCredentials,
}

impl From<reqwest::Error> for AcledError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL carries the key and email as query parameters.
        let e = e.without_url();
        let mut message = e.to_string();
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = std::error::Error::source(cause);
        }
        Self::Network { message }
    }
}
