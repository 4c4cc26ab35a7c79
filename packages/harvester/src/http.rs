//! HTTP transport for OAI-PMH requests.
//!
//! The harvest controller only sees the [`Transport`] trait, so the retry
//! policy and paging logic can be exercised without a network.

use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;

use crate::error::Result;

/// User agent string identifying this harvester.
const USER_AGENT: &str = concat!("heritage-harvester/", env!("CARGO_PKG_VERSION"));

/// A single failed request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("server responded with status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("invalid request URL '{0}'")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Other(String),
}

/// Fetches one page body.
pub trait Transport {
    /// GET `base_url` with the given query parameters and return the body.
    fn fetch(
        &self,
        base_url: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<Vec<u8>, TransportError>;
}

/// Blocking reqwest-based transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

/// Build a request URL from a base URL and query parameters.
///
/// # Examples
/// ```
/// use heritage_harvester::http::request_url;
///
/// let url = request_url("https://example.org/oai", &[("verb", "Identify".to_string())]).unwrap();
/// assert_eq!(url.as_str(), "https://example.org/oai?verb=Identify");
/// ```
pub fn request_url(
    base_url: &str,
    query: &[(&str, String)],
) -> std::result::Result<url::Url, TransportError> {
    let pairs = query.iter().map(|(k, v)| (*k, v.as_str()));
    url::Url::parse_with_params(base_url, pairs)
        .map_err(|_| TransportError::InvalidUrl(base_url.to_string()))
}

impl Transport for HttpTransport {
    fn fetch(
        &self,
        base_url: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<Vec<u8>, TransportError> {
        let url = request_url(base_url, query)?;
        tracing::debug!(url = %url, "sending request");

        let response = self.client.get(url.clone()).send().map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().map_err(classify)?;
        Ok(bytes.to_vec())
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}
