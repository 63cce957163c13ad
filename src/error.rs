//! Error types for fetching and scraping tender sources.

use thiserror::Error;

/// Errors raised while fetching or parsing a tender source.
///
/// Adapters contain most of these internally (a failed page or listing is
/// logged and skipped); only adapter-wide failures escape `scrape`.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("http error: {0}")]
    Http(String),

    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        ScrapeError::Http(err.to_string())
    }
}
