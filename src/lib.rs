//! # campus-kb - Knowledge base ingestion for a university website
//!
//! This crate builds and maintains the searchable knowledge base behind a
//! campus question-answering assistant. It crawls a university website,
//! harvests linked PDFs, extracts clean text from both, and indexes the text
//! as overlapping passages for nearest-neighbor retrieval.
//!
//! ## Features
//!
//! - Breadth-first, domain and path scoped crawling with per-host politeness
//! - PDF download and local PDF extraction, idempotent across runs
//! - Character-window chunking with boundary-aware splits and exact overlap
//! - Pluggable embedding models through rig's `EmbeddingModel` trait
//! - A persisted vector index with crash-safe saves and a consistency guard
//! - A small retrieval interface for the conversational layer
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use campus_kb::crawler::ContentStore;
//! use campus_kb::index::{IndexConfig, Indexer};
//! use campus_kb::model::HashingEmbeddingModel;
//! use campus_kb::search::SearchSystem;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ContentStore::new("data/content");
//!     let indexer = Indexer::new(HashingEmbeddingModel::default(), IndexConfig::default(), store);
//!     indexer.build_or_load(false).await?;
//!
//!     let search = SearchSystem::new(Arc::new(indexer));
//!     for (text, source) in search.retrieve("When does registration open?", 5).await? {
//!         println!("{}: {}", source, text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
mod error;
pub mod model;

// Ingestion stages
pub mod crawler;
pub mod index;
pub mod pdf;
pub mod pipeline;
pub mod processor;
pub mod search;

pub use error::{Error, Result};

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::config::IngestConfig;
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::index::{IndexStatus, Indexer};
    pub use crate::model::{Embedder, EmbeddingIdentity};
    pub use crate::pipeline::{IngestOptions, IngestReport, run_ingestion};
    pub use crate::search::{SearchOptions, SearchResult, SearchSystem};
}
