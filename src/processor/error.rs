//! Error types for the processor module

use crate::error::Error as CrateError;
use rig::embeddings::EmbeddingError;
use thiserror::Error;

/// Error type for processor operations
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Chunk size or overlap out of range
    #[error("Invalid chunk options: {0}")]
    InvalidOptions(String),

    /// Embedding model failure
    #[error("Embedding generation error: {0}")]
    EmbeddingGeneration(String),

    /// The model answered with the wrong number or shape of vectors
    #[error("Embedding processing error: {0}")]
    EmbeddingProcessing(String),

    /// Error during semaphore acquisition
    #[error("Semaphore acquisition error: {0}")]
    Semaphore(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<ProcessError> for CrateError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::EmbeddingGeneration(e) => CrateError::Embedding(e),
            _ => CrateError::Process(err.to_string()),
        }
    }
}

impl From<EmbeddingError> for ProcessError {
    fn from(err: EmbeddingError) -> Self {
        Self::EmbeddingGeneration(err.to_string())
    }
}

impl From<tokio::sync::AcquireError> for ProcessError {
    fn from(err: tokio::sync::AcquireError) -> Self {
        Self::Semaphore(format!("Failed to acquire semaphore: {}", err))
    }
}
