//! HTTP transport abstraction.
//!
//! [`ReqwestTransport`] is the production implementation. A transport only
//! reports whether a response arrived: status classification happens in
//! [`crate::envelope`].

use std::time::Duration;

use async_trait::async_trait;

use crate::AcledError;

/// Maximum length of a response body preview included in error messages.
pub const BODY_PREVIEW_LEN: usize = 500;

/// A received HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

impl HttpResponse {
    /// The body truncated to [`BODY_PREVIEW_LEN`] characters.
    #[must_use]
    pub fn body_preview(&self) -> String {
        if self.body.chars().count() > BODY_PREVIEW_LEN {
            let preview: String = self.body.chars().take(BODY_PREVIEW_LEN).collect();
            format!("{preview}...")
        } else {
            self.body.clone()
        }
    }
}

/// Issues GET requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `GET url?params` and returns whatever response arrives.
    ///
    /// # Errors
    ///
    /// Returns [`AcledError::Network`] when no response is received.
    async fn get(&self, url: &str, params: &[(String, String)]) -> Result<HttpResponse, AcledError>;
}

/// [`Transport`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a client with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`AcledError::Network`] if the TLS backend cannot be
    /// initialized.
    pub fn new(timeout: Duration) -> Result<Self, AcledError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    #[must_use]
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, params: &[(String, String)]) -> Result<HttpResponse, AcledError> {
        let response = self.client.get(url).query(params).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}
