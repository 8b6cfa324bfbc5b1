//! # Retrieval Module
//!
//! This module is the retrieval interface handed to the conversational layer:
//! a query goes in, ranked passages with their source come out. It is the
//! only coupling between ingestion and whatever answers questions.
//!
//! ## Key Components
//!
//! - `SearchSystem`: Main interface for performing semantic searches
//! - `SearchOptions`: Limit and source filter for a query
//! - `SearchResult`: A retrieved passage with its metadata
//!
//! ## Search Process
//!
//! 1. Embed the query with the model the index was built with
//! 2. Rank every stored vector by cosine similarity
//! 3. Apply the source filter and keep the best `limit` passages

mod error;
mod search_impl;

pub use error::SearchError;
pub use search_impl::{SearchOptions, SearchResult, search_index};

use std::sync::Arc;

use rig::embeddings::EmbeddingModel;

use crate::index::Indexer;
use crate::model::EmbeddingIdentity;

/// Search system for the knowledge base
pub struct SearchSystem<E> {
    indexer: Arc<Indexer<E>>,
}

impl<E> Clone for SearchSystem<E> {
    fn clone(&self) -> Self {
        Self {
            indexer: self.indexer.clone(),
        }
    }
}

impl<E> SearchSystem<E>
where
    E: EmbeddingModel + EmbeddingIdentity,
{
    /// Create a new search system over `indexer`
    pub fn new(indexer: Arc<Indexer<E>>) -> Self {
        Self { indexer }
    }

    /// Search the index with the given query and options
    pub async fn search(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<SearchResult>, SearchError> {
        search_index(&self.indexer, query, &options).await
    }

    /// The `k` passages closest to `query`, as `(text, source)` pairs
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<(String, String)>, SearchError> {
        let results = self
            .search(
                query,
                SearchOptions {
                    limit: k,
                    source_filter: None,
                },
            )
            .await?;
        Ok(results
            .into_iter()
            .map(|result| (result.text, result.source))
            .collect())
    }

    /// Get the indexer reference
    pub fn indexer(&self) -> &Arc<Indexer<E>> {
        &self.indexer
    }
}
