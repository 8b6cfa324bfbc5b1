//! # Search Error Types Module
//!
//! This module defines error types specific to retrieval.
//!
//! ## Key Components
//!
//! - `SearchError`: Enum representing different types of search failures
//!
//! A query against a knowledge base that has not been built yet surfaces as
//! `SearchError::Index(IndexError::NotFound)`, which converts into the
//! crate-level `Error::IndexNotFound`.

use thiserror::Error;

use crate::error::Error as CrateError;
use crate::index::IndexError;

/// Errors that can occur during search operations
#[derive(Debug, Error)]
pub enum SearchError {
    /// Error occurred while loading or querying the index
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Invalid search parameters
    #[error("Invalid search parameters: {0}")]
    InvalidParameters(String),
}

impl From<SearchError> for CrateError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Index(e) => e.into(),
            SearchError::InvalidParameters(_) => CrateError::Search(err.to_string()),
        }
    }
}
