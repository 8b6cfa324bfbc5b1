//! Error types for the crawler module

use crate::crawler::storage::StorageError;
use crate::error::Error as CrateError;
use thiserror::Error;

/// Failure of a single bounded-time fetch
///
/// Fetch failures are recovered by the caller: the crawler counts them and moves
/// on, the PDF pipeline reports the URL as failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request did not complete within the configured timeout
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success status
    #[error("HTTP status {0}")]
    Status(u16),

    /// Connection, TLS, redirect or body read failure
    #[error("network error: {0}")]
    Network(String),

    /// The URL could not be parsed or uses an unsupported scheme
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The fetch was abandoned because cancellation was requested
    #[error("fetch cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Fetch error
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Content store error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// HTML parsing error
    #[error("HTML parsing error: {0}")]
    HtmlParse(String),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Seed URL has no host to scope the crawl to
    #[error("Invalid seed URL: {0}")]
    InvalidSeed(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<CrawlError> for CrateError {
    fn from(err: CrawlError) -> Self {
        match err {
            CrawlError::UrlParse(e) => CrateError::Other(format!("URL parse error: {}", e)),
            _ => CrateError::Crawl(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawl_error_converts_to_crate_error() {
        let err: CrateError = CrawlError::Fetch(FetchError::Status(404)).into();
        assert!(matches!(err, CrateError::Crawl(_)));
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_url_parse_error_converts_to_other() {
        let parse_err = url::Url::parse("not a url").unwrap_err();
        let err: CrateError = CrawlError::UrlParse(parse_err).into();
        assert!(matches!(err, CrateError::Other(_)));
    }
}
