//! HTTP transport shared by the source adapters.
//!
//! Every adapter owns one [`HttpFetcher`], i.e. one `reqwest::Client` with
//! its own cookie jar and default headers. Sessions are never shared across
//! adapters. Requests are issued one at a time by the callers.
//!
//! The [`Fetch`] trait is the seam the adapters depend on, so tests can
//! substitute canned pages for the network.

use crate::config::HttpConfig;
use crate::error::ScrapeError;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// A fetched page. Non-2xx responses are returned as-is; callers decide
/// whether to stop, skip, or fall back.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    /// Final URL after redirects.
    pub url: String,
    /// Body decoded to text using the response charset.
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into [`ScrapeError::Status`].
    pub fn error_for_status(self) -> Result<Self, ScrapeError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ScrapeError::Status {
                url: self.url,
                status: self.status,
            })
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ScrapeError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Fetch a URL with query parameters.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<FetchResponse, ScrapeError>;
}

#[async_trait]
impl<T: Fetch + ?Sized> Fetch for Arc<T> {
    async fn fetch(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<FetchResponse, ScrapeError> {
        (**self).fetch(url, query).await
    }
}

const ACCEPT_TYPES: &str = "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8";

/// `reqwest`-backed session with browser-like default headers.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a session.
    ///
    /// `insecure_tls` disables certificate validation; it exists for
    /// government sites that serve broken certificate chains.
    pub fn new(config: &HttpConfig, insecure_tls: bool) -> Result<Self, ScrapeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| ScrapeError::Http(e.to_string()))?,
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)
                .map_err(|e| ScrapeError::Http(e.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_TYPES));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(insecure_tls)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip(self, query), fields(%url))]
    async fn fetch(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<FetchResponse, ScrapeError> {
        let t0 = Instant::now();
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await?;

        debug!(
            status,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched"
        );
        Ok(FetchResponse {
            status,
            url: final_url,
            body,
        })
    }
}
