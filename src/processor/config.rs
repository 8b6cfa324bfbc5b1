//! # Processor Configuration Module
//!
//! This module provides configuration structures and builders for the content
//! processor: how documents are cut into chunks and how many embedding
//! requests may be in flight at once.
//!
//! ## Key Components
//!
//! - `ChunkOptions`: Controls the chunking behavior (size and overlap, in characters)
//! - `ProcessorConfig`: Complete configuration for the processor pipeline
//! - `ProcessorConfigBuilder`: Builder pattern implementation for easier configuration

use crate::processor::error::ProcessError;

/// Configuration for chunking text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOptions {
    /// Maximum length of a chunk in characters
    pub chunk_size: usize,

    /// Characters each chunk shares with the tail of its predecessor
    pub chunk_overlap: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 400,
        }
    }
}

impl ChunkOptions {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Check that the size is positive and the overlap is strictly smaller
    pub fn validate(&self) -> Result<(), ProcessError> {
        if self.chunk_size == 0 {
            return Err(ProcessError::InvalidOptions(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ProcessError::InvalidOptions(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Configuration for the processor
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Options for chunking
    pub chunk_options: ChunkOptions,

    /// Maximum number of embedding batches in flight
    pub concurrency: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            chunk_options: ChunkOptions::default(),
            concurrency: 4,
        }
    }
}

/// Builder for ProcessorConfig
#[derive(Debug, Default)]
pub struct ProcessorConfigBuilder {
    config: ProcessorConfig,
}

impl ProcessorConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ProcessorConfig::default(),
        }
    }

    /// Set the chunk options
    pub fn chunk_options(mut self, chunk_options: ChunkOptions) -> Self {
        self.config.chunk_options = chunk_options;
        self
    }

    /// Set the maximum chunk length
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_options.chunk_size = chunk_size;
        self
    }

    /// Set the overlap between consecutive chunks
    pub fn chunk_overlap(mut self, chunk_overlap: usize) -> Self {
        self.config.chunk_options.chunk_overlap = chunk_overlap;
        self
    }

    /// Set the number of concurrent embedding batches
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency.max(1);
        self
    }

    /// Build the configuration
    pub fn build(self) -> ProcessorConfig {
        self.config
    }
}

impl ProcessorConfig {
    /// Create a new builder
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::new()
    }
}
