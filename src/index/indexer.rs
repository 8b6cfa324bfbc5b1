//! Index manager
//!
//! The `Indexer` is the single owner of the active index generation. Writers
//! (`build_or_load`, `add`) are serialized by a write gate and publish a new
//! snapshot only after it has been persisted; readers clone the current
//! snapshot handle and rank outside any lock.

use std::sync::Arc;

use rig::embeddings::EmbeddingModel;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::{info, instrument, warn};

use crate::crawler::{ContentStore, Document};
use crate::index::config::IndexConfig;
use crate::index::error::IndexError;
use crate::index::snapshot::IndexSnapshot;
use crate::index::storage::{IndexStorage, new_stamp};
use crate::model::EmbeddingIdentity;
use crate::processor::{embed_query, process_documents};

/// A ranked retrieval result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub text: String,
    pub source: String,
    pub position: usize,
    pub score: f32,
}

/// Summary of a persisted index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub total_vectors: usize,
    pub index_name: String,
    pub storage_location: String,
    pub dimensions: usize,
    pub embedding_identity: String,
    pub stamp: String,
}

/// Result of [`Indexer::stats`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexStatus {
    Ready(IndexStats),
    NotFound,
}

/// Builds, loads, extends and queries the persisted index
pub struct Indexer<E> {
    model: E,
    config: IndexConfig,
    store: ContentStore,
    storage: IndexStorage,
    active: RwLock<Option<Arc<IndexSnapshot>>>,
    write_gate: Mutex<()>,
}

impl<E> Indexer<E>
where
    E: EmbeddingModel + EmbeddingIdentity,
{
    /// Create an indexer over the content area `store`
    ///
    /// Nothing is read from disk until the first operation.
    pub fn new(model: E, config: IndexConfig, store: ContentStore) -> Self {
        let storage = IndexStorage::new(config.index_dir.clone(), config.index_name.clone());
        Self {
            model,
            config,
            store,
            storage,
            active: RwLock::new(None),
            write_gate: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn storage(&self) -> &IndexStorage {
        &self.storage
    }

    pub fn model(&self) -> &E {
        &self.model
    }

    /// Load the persisted index, or build it from the content area
    ///
    /// A rebuild happens when `force_rebuild` is set, when no index exists,
    /// or when the persisted index fails its consistency checks.
    pub async fn build_or_load(&self, force_rebuild: bool) -> Result<Arc<IndexSnapshot>, IndexError> {
        self.build_or_load_with_progress(force_rebuild, None).await
    }

    /// Like [`Indexer::build_or_load`], reporting embedded chunk counts to `progress`
    #[instrument(skip(self, progress), fields(index = %self.config.index_name))]
    pub async fn build_or_load_with_progress(
        &self,
        force_rebuild: bool,
        progress: Option<mpsc::Sender<usize>>,
    ) -> Result<Arc<IndexSnapshot>, IndexError> {
        let _gate = self.write_gate.lock().await;

        if !force_rebuild {
            match self.storage.load().await {
                Ok(Some(snapshot)) => {
                    self.check_identity(&snapshot)?;
                    info!(
                        "Loaded existing index {} with {} vectors",
                        self.config.index_name,
                        snapshot.len()
                    );
                    return Ok(self.publish(snapshot).await);
                }
                Ok(None) => info!("No existing index, building a new one"),
                Err(IndexError::Corrupt(reason)) => {
                    warn!("Existing index is unusable ({}), rebuilding", reason)
                }
                Err(e) => return Err(e),
            }
        }

        let documents = self.store.load_documents().await?;
        if documents.is_empty() {
            return Err(IndexError::NoDocuments(
                self.store.root().display().to_string(),
            ));
        }

        let processed =
            process_documents(&self.model, &documents, &self.config.processor, progress).await?;
        if processed.is_empty() {
            return Err(IndexError::NoDocuments(
                self.store.root().display().to_string(),
            ));
        }

        let snapshot =
            IndexSnapshot::from_processed(new_stamp(), self.model.identity(), processed)?;
        self.storage.save(&snapshot).await?;
        info!(
            "Built index {} with {} vectors from {} documents",
            self.config.index_name,
            snapshot.len(),
            documents.len()
        );
        Ok(self.publish(snapshot).await)
    }

    /// Chunk, embed and append `documents` to the current index
    ///
    /// Content is not de-duplicated; adding the same document twice indexes
    /// it twice.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub async fn add(&self, documents: Vec<Document>) -> Result<Arc<IndexSnapshot>, IndexError> {
        let _gate = self.write_gate.lock().await;

        let active = self.active.read().await.clone();
        let current = match active {
            Some(snapshot) => snapshot,
            None => {
                let snapshot = self.storage.load().await?.ok_or(IndexError::NotFound)?;
                self.publish(snapshot).await
            }
        };
        self.check_identity(&current)?;

        let processed =
            process_documents(&self.model, &documents, &self.config.processor, None).await?;
        if processed.is_empty() {
            info!("Nothing to add");
            return Ok(current);
        }

        let added = processed.len();
        let snapshot = current.with_appended(new_stamp(), processed)?;
        self.storage.save(&snapshot).await?;
        info!(
            "Added {} chunks, index now holds {} vectors",
            added,
            snapshot.len()
        );
        Ok(self.publish(snapshot).await)
    }

    /// The `k` chunks closest to `query`, best first
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, IndexError> {
        self.search_filtered(query, k, None).await
    }

    /// Like [`Indexer::search`], restricted to sources containing `source_filter`
    #[instrument(skip(self))]
    pub async fn search_filtered(
        &self,
        query: &str,
        k: usize,
        source_filter: Option<&str>,
    ) -> Result<Vec<SearchHit>, IndexError> {
        let snapshot = self.current().await?;
        self.check_identity(&snapshot)?;
        if k == 0 || snapshot.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = embed_query(&self.model, query).await?;
        let hits = snapshot
            .search(&query_vector, k, source_filter)
            .into_iter()
            .map(|(row, score)| {
                let chunk = &snapshot.chunks()[row];
                SearchHit {
                    text: chunk.text.clone(),
                    source: chunk.source.clone(),
                    position: chunk.position,
                    score,
                }
            })
            .collect::<Vec<_>>();

        info!("Found {} results", hits.len());
        Ok(hits)
    }

    /// Describe the persisted index, or report that there is none
    pub async fn stats(&self) -> Result<IndexStatus, IndexError> {
        let snapshot = match self.current().await {
            Ok(snapshot) => snapshot,
            Err(IndexError::NotFound) => return Ok(IndexStatus::NotFound),
            Err(e) => return Err(e),
        };

        let header = snapshot.header();
        Ok(IndexStatus::Ready(IndexStats {
            total_vectors: header.count,
            index_name: self.config.index_name.clone(),
            storage_location: self.storage.dir().display().to_string(),
            dimensions: header.dimensions,
            embedding_identity: header.embedding_identity.clone(),
            stamp: header.stamp.clone(),
        }))
    }

    /// The active snapshot, loading it from disk on first use
    ///
    /// A missing or inconsistent index is reported as [`IndexError::NotFound`].
    async fn current(&self) -> Result<Arc<IndexSnapshot>, IndexError> {
        let active = self.active.read().await.clone();
        if let Some(snapshot) = active {
            return Ok(snapshot);
        }

        let _gate = self.write_gate.lock().await;
        let active = self.active.read().await.clone();
        if let Some(snapshot) = active {
            return Ok(snapshot);
        }

        match self.storage.load().await {
            Ok(Some(snapshot)) => Ok(self.publish(snapshot).await),
            Ok(None) => Err(IndexError::NotFound),
            Err(IndexError::Corrupt(reason)) => {
                warn!("Persisted index is unusable: {}", reason);
                Err(IndexError::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    async fn publish(&self, snapshot: IndexSnapshot) -> Arc<IndexSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.active.write().await = Some(snapshot.clone());
        snapshot
    }

    fn check_identity(&self, snapshot: &IndexSnapshot) -> Result<(), IndexError> {
        let expected = self.model.identity();
        let found = &snapshot.header().embedding_identity;
        if *found != expected {
            return Err(IndexError::EmbeddingMismatch {
                expected,
                found: found.clone(),
            });
        }
        Ok(())
    }
}
