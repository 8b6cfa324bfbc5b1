//! Persisted vector index
//!
//! This module owns the searchable index: an in-memory snapshot of unit
//! vectors plus their chunk text, persisted as a checksummed vector file and
//! a libsql document store, and the `Indexer` that builds, loads, extends and
//! queries it.

mod config;
mod database;
pub mod error;
mod flat;
mod indexer;
mod schema;
mod snapshot;
mod storage;

pub use config::{IndexConfig, IndexConfigBuilder};
pub use database::{DocumentStore, StoreMeta};
pub use error::IndexError;
pub use indexer::{IndexStats, IndexStatus, Indexer, SearchHit};
pub use snapshot::IndexSnapshot;
pub use storage::IndexStorage;

/// Describes one persisted index generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHeader {
    /// Unique generation stamp, also part of the document store file name
    pub stamp: String,

    /// Vector dimension
    pub dimensions: usize,

    /// Number of vectors
    pub count: usize,

    /// Identity of the embedding function the vectors came from
    pub embedding_identity: String,
}

/// A chunk as stored next to its vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredChunk {
    /// Artifact the chunk was cut from, relative to the content directory
    pub source: String,

    /// Ordinal of the chunk within its document
    pub position: usize,

    /// Chunk text
    pub text: String,
}
