//! Content processor module
//!
//! This module turns loaded text artifacts into embedded chunks: documents are
//! cut into overlapping windows, the windows are embedded in batches and every
//! vector is normalized to unit length.

mod chunking;
mod config;
mod error;

pub use chunking::{TextChunk, chunk_text};
pub use config::{ChunkOptions, ProcessorConfig, ProcessorConfigBuilder};
pub use error::ProcessError;

use crate::crawler::Document;
use crate::model::EmbeddingConversion;
use futures::future;
use rig::embeddings::EmbeddingModel;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, instrument};

/// Represents a processed chunk with its embedding
#[derive(Debug, Clone)]
pub struct ProcessedChunk {
    /// The text of the chunk
    pub text: String,

    /// Unit-length embedding of the text
    pub vector: Vec<f32>,

    /// Metadata for the chunk
    pub metadata: ChunkMetadata,
}

/// Metadata for a processed chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// The artifact the chunk was cut from
    pub source: String,

    /// The position of the chunk in the original document
    pub position: usize,
}

/// Chunk and embed documents
///
/// # Arguments
///
/// * `model` - The embedding model
/// * `documents` - Loaded text artifacts
/// * `config` - The processor configuration
/// * `progress` - Optional channel receiving the number of chunks embedded per batch
///
/// # Returns
///
/// The processed chunks, in document order and chunk order within each document
#[instrument(skip_all, fields(documents = documents.len()))]
pub async fn process_documents<M>(
    model: &M,
    documents: &[Document],
    config: &ProcessorConfig,
    progress: Option<mpsc::Sender<usize>>,
) -> Result<Vec<ProcessedChunk>, ProcessError>
where
    M: EmbeddingModel,
{
    config.chunk_options.validate()?;

    let mut pending = Vec::new();
    for document in documents {
        let chunks = chunk_text(&document.text, &config.chunk_options)?;
        debug!("{}: {} chunks", document.source, chunks.len());
        pending.extend(chunks.into_iter().map(|chunk| {
            let metadata = ChunkMetadata {
                source: document.source.clone(),
                position: chunk.position,
            };
            (metadata, chunk.text)
        }));
    }

    info!(
        "Created {} chunks from {} documents",
        pending.len(),
        documents.len()
    );

    let texts = pending.iter().map(|(_, text)| text.clone()).collect();
    let vectors = embed_texts(model, texts, config.concurrency, progress).await?;

    Ok(pending
        .into_iter()
        .zip(vectors)
        .map(|((metadata, text), vector)| ProcessedChunk {
            text,
            vector,
            metadata,
        })
        .collect())
}

/// Embed texts in batches of `M::MAX_DOCUMENTS` with bounded concurrency
///
/// The returned vectors are unit length and in input order. All vectors must
/// share one non-zero dimension.
pub async fn embed_texts<M>(
    model: &M,
    texts: Vec<String>,
    concurrency: usize,
    progress: Option<mpsc::Sender<usize>>,
) -> Result<Vec<Vec<f32>>, ProcessError>
where
    M: EmbeddingModel,
{
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let total = texts.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let tasks = texts
        .chunks(M::MAX_DOCUMENTS.max(1))
        .map(|batch| {
            let batch = batch.to_vec();
            let semaphore = semaphore.clone();
            let progress = progress.clone();
            async move {
                let _permit = semaphore.acquire_owned().await?;

                let expected = batch.len();
                let embeddings = model.embed_texts(batch).await?;
                if embeddings.len() != expected {
                    return Err(ProcessError::EmbeddingProcessing(format!(
                        "expected {} embeddings, got {}",
                        expected,
                        embeddings.len()
                    )));
                }

                if let Some(sender) = progress {
                    // Ignore errors from sending (e.g., if receiver is dropped)
                    let _ = sender.send(expected).await;
                }

                Ok::<_, ProcessError>(
                    embeddings
                        .iter()
                        .map(|embedding| embedding.to_normalized_vec())
                        .collect::<Vec<_>>(),
                )
            }
        })
        .collect::<Vec<_>>();

    let mut vectors = Vec::with_capacity(total);
    for result in future::join_all(tasks).await {
        vectors.extend(result?);
    }

    let ndims = vectors.first().map(Vec::len).unwrap_or_default();
    if ndims == 0 || vectors.iter().any(|vector| vector.len() != ndims) {
        return Err(ProcessError::EmbeddingProcessing(
            "embedding model returned vectors of inconsistent dimension".to_string(),
        ));
    }

    debug!("Embedded {} texts with {} dimensions", total, ndims);
    Ok(vectors)
}

/// Embed a single query text
pub async fn embed_query<M>(model: &M, query: &str) -> Result<Vec<f32>, ProcessError>
where
    M: EmbeddingModel,
{
    embed_texts(model, vec![query.to_string()], 1, None)
        .await?
        .pop()
        .ok_or_else(|| ProcessError::EmbeddingProcessing("failed to extract embedding".to_string()))
}
