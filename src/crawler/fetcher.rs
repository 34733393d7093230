//! HTTP fetcher implementation
//!
//! The orchestrator talks to the network only through the [`Fetcher`] trait so
//! that tests and alternative transports can stand in for `reqwest`.
//!
//! A fetch either yields a response (status, headers, body and the URL it was
//! finally served from) or a transport failure. Judging the status and
//! content type is left to the caller.

use crate::config::UserAgentConfig;
use crate::CrawlerError;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Maximum redirect hops followed for a single fetch
pub const MAX_REDIRECTS: usize = 10;

/// Status codes at or above this value fail the job
pub const ERROR_STATUS_CUTOFF: u16 = 400;

/// A fetched HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code of the final response
    pub status: u16,

    /// Response headers, names lowercased
    pub headers: HashMap<String, String>,

    /// Decoded body text
    pub body: String,

    /// The URL the body was served from, after following redirects
    pub final_url: Url,
}

impl FetchResponse {
    /// The Content-Type header, if present
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    /// Whether the Content-Type header declares HTML
    pub fn is_html(&self) -> bool {
        self.content_type()
            .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
            .unwrap_or(false)
    }

    /// Whether the status is below the error cutoff
    pub fn is_success(&self) -> bool {
        self.status < ERROR_STATUS_CUTOFF
    }
}

/// Network fetch collaborator
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issues a GET for `url`
    ///
    /// Returns `Err(CrawlerError::FetchFailure)` on transport failure. HTTP
    /// error statuses are returned as responses.
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, CrawlerError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Total timeout for one request
///
/// # Example
///
/// ```no_run
/// use recrawler::config::UserAgentConfig;
/// use recrawler::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Fetcher`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Wraps an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the user agent configuration
    pub fn from_config(config: &UserAgentConfig, timeout: Duration) -> Result<Self, CrawlerError> {
        Ok(Self::new(build_http_client(config, timeout)?))
    }
}

/// Describes a transport failure the way operators want to read it
fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        format!("Connection failed: {}", error)
    } else if error.is_redirect() {
        format!("Redirect error: {}", error)
    } else {
        error.to_string()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, CrawlerError> {
        let failure = |error: reqwest::Error| CrawlerError::FetchFailure {
            url: url.to_string(),
            reason: describe_transport_error(&error),
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(failure)?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = response.text().await.map_err(failure)?;

        Ok(FetchResponse {
            status,
            headers,
            body,
            final_url,
        })
    }
}
