//! Error types for the campus-kb crate

use thiserror::Error;

/// Result type for campus-kb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for campus-kb operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Web crawling error
    #[error("Crawl error: {0}")]
    Crawl(String),

    /// PDF download or extraction error
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Content processing error
    #[error("Process error: {0}")]
    Process(String),

    /// Embedding model error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Index build was requested but the content area holds no documents
    #[error("No documents found in {0}; run the crawler or PDF processor first")]
    NoDocuments(String),

    /// Search or stats was requested before any index exists
    #[error("Index not found")]
    IndexNotFound,

    /// Index error
    #[error("Index error: {0}")]
    Index(String),

    /// Search error
    #[error("Search error: {0}")]
    Search(String),

    /// The run was interrupted before it finished
    #[error("Operation cancelled")]
    Cancelled,

    /// Other errors
    #[error("{0}")]
    Other(String),
}
