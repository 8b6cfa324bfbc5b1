//! Error types for the PDF pipeline

use crate::crawler::FetchError;
use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for PDF operations
///
/// Every variant is scoped to a single document; batch operations count it
/// and continue with the next one.
#[derive(Debug, Error)]
pub enum PdfError {
    /// The PDF could not be downloaded
    #[error("Download error: {0}")]
    Download(#[from] FetchError),

    /// The PDF could not be parsed or its text read
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// The PDF or its text artifact could not be written
    #[error("Write error: {0}")]
    Write(#[from] std::io::Error),

    /// The URL does not name a downloadable document
    #[error("Invalid PDF URL: {0}")]
    InvalidUrl(String),
}

impl From<tokio::task::JoinError> for PdfError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Extraction(format!("Extraction task failed: {}", err))
    }
}

impl From<PdfError> for CrateError {
    fn from(err: PdfError) -> Self {
        match err {
            PdfError::Write(e) => CrateError::Io(e),
            _ => CrateError::Pdf(err.to_string()),
        }
    }
}
