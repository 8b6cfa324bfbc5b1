//! Search implementation

use rig::embeddings::EmbeddingModel;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::error::SearchError;
use crate::index::Indexer;
use crate::model::EmbeddingIdentity;

/// Options for search queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum number of results to return
    pub limit: usize,

    /// Only rank passages whose source contains this string
    pub source_filter: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            source_filter: None,
        }
    }
}

/// Search result with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Text content of the chunk
    pub text: String,

    /// Artifact the chunk was cut from
    pub source: String,

    /// Position of the chunk within its artifact
    pub position: usize,

    /// Cosine similarity to the query
    pub score: f32,
}

/// Search the index with the given query and options
#[instrument(skip(indexer, options), fields(limit = options.limit))]
pub async fn search_index<E>(
    indexer: &Indexer<E>,
    query: &str,
    options: &SearchOptions,
) -> Result<Vec<SearchResult>, SearchError>
where
    E: EmbeddingModel + EmbeddingIdentity,
{
    if options.limit == 0 {
        return Err(SearchError::InvalidParameters(
            "limit must be greater than zero".to_string(),
        ));
    }

    let hits = indexer
        .search_filtered(query, options.limit, options.source_filter.as_deref())
        .await?;

    Ok(hits
        .into_iter()
        .map(|hit| SearchResult {
            text: hit.text,
            source: hit.source,
            position: hit.position,
            score: hit.score,
        })
        .collect())
}
