//! Index configuration
//!
//! Where the index lives, what it is called, and how documents are chunked
//! and embedded before they enter it.

use std::path::PathBuf;

use crate::processor::ProcessorConfig;

/// Configuration for the indexer
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Directory holding the vector file and the document store
    pub index_dir: PathBuf,

    /// Identifier both persisted artifacts are named from
    pub index_name: String,

    /// Chunking and embedding settings
    pub processor: ProcessorConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("data/index"),
            index_name: "campus_index".to_string(),
            processor: ProcessorConfig::default(),
        }
    }
}

/// Builder for IndexConfig
#[derive(Debug, Default)]
pub struct IndexConfigBuilder {
    config: IndexConfig,
}

impl IndexConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: IndexConfig::default(),
        }
    }

    pub fn index_dir(mut self, index_dir: impl Into<PathBuf>) -> Self {
        self.config.index_dir = index_dir.into();
        self
    }

    pub fn index_name(mut self, index_name: impl Into<String>) -> Self {
        self.config.index_name = index_name.into();
        self
    }

    pub fn processor(mut self, processor: ProcessorConfig) -> Self {
        self.config.processor = processor;
        self
    }

    pub fn build(self) -> IndexConfig {
        self.config
    }
}

impl IndexConfig {
    /// Create a new builder
    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::new()
    }
}
