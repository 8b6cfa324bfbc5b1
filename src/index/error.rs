//! # Index Error Types Module
//!
//! This module defines error types specific to the persisted vector index.
//!
//! ## Key Components
//!
//! - `IndexError`: Enum representing the ways building, loading, extending or
//!   querying the index can fail
//!
//! `NoDocuments` and `NotFound` are the two failures callers are expected to
//! tell apart: the first means there is nothing to index yet, the second that
//! no index has been built yet. `Corrupt` is never surfaced by
//! `Indexer::build_or_load`; an index that fails its consistency checks is
//! treated as absent and rebuilt.

use crate::crawler::StorageError;
use crate::error::Error as CrateError;
use crate::processor::ProcessError;
use thiserror::Error;

/// Error type for index operations
#[derive(Debug, Error)]
pub enum IndexError {
    /// A build was required but the content area holds no text
    #[error("No documents to index in {0}")]
    NoDocuments(String),

    /// No persisted index exists yet
    #[error("Index not found")]
    NotFound,

    /// The persisted index failed its consistency checks
    #[error("Index is corrupt: {0}")]
    Corrupt(String),

    /// The index was built with a different embedding function
    #[error("Index was built with embedding model '{found}' but '{expected}' is configured; rebuild the index")]
    EmbeddingMismatch { expected: String, found: String },

    /// LibSQL error in the document store
    #[error("Database error: {0}")]
    Database(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Chunking or embedding failure
    #[error("Embedding error: {0}")]
    Embedding(#[from] ProcessError),
}

impl From<libsql::Error> for IndexError {
    fn from(err: libsql::Error) -> Self {
        IndexError::Database(err.to_string())
    }
}

impl From<StorageError> for IndexError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => IndexError::Io(e),
            other => IndexError::Io(std::io::Error::other(other.to_string())),
        }
    }
}

impl From<IndexError> for CrateError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::NoDocuments(dir) => CrateError::NoDocuments(dir),
            IndexError::NotFound => CrateError::IndexNotFound,
            IndexError::Io(e) => CrateError::Io(e),
            IndexError::Embedding(e) => e.into(),
            _ => CrateError::Index(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinguishable_crate_errors() {
        assert!(matches!(
            CrateError::from(IndexError::NotFound),
            CrateError::IndexNotFound
        ));
        assert!(matches!(
            CrateError::from(IndexError::NoDocuments("data".to_string())),
            CrateError::NoDocuments(_)
        ));
        assert!(matches!(
            CrateError::from(IndexError::Corrupt("bad checksum".to_string())),
            CrateError::Index(_)
        ));
    }
}
