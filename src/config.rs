//! # Ingestion Configuration Module
//!
//! File-based configuration for a whole ingestion deployment. Every field has
//! a default, so an empty or partial TOML file is valid; the CLI overrides
//! individual values on top of what the file says.
//!
//! ```toml
//! [crawl]
//! seeds = ["https://www.univ.example/dept"]
//! max_pages_per_seed = 600
//!
//! [chunking]
//! chunk_size = 2000
//! chunk_overlap = 400
//!
//! [embedding]
//! provider = "hashing"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crawler::{ContentStore, CrawlerConfig};
use crate::error::{Error, Result};
use crate::index::IndexConfig;
use crate::model::EmbeddingProvider;
use crate::pdf::PdfConfig;
use crate::processor::{ChunkOptions, ProcessorConfig};

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub crawl: CrawlSettings,
    pub pdf: PdfSettings,
    pub chunking: ChunkingSettings,
    pub index: IndexSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub paths: PathSettings,
}

/// `[crawl]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    pub seeds: Vec<String>,
    pub max_pages_per_seed: u32,
    pub politeness_delay_ms: u64,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    pub blocked_extensions: Vec<String>,
    pub min_text_length: usize,
    pub seed_concurrency: usize,
    pub content_selectors: Vec<String>,
    pub exclude_selectors: Vec<String>,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        let defaults = CrawlerConfig::default();
        Self {
            seeds: Vec::new(),
            max_pages_per_seed: defaults.max_pages,
            politeness_delay_ms: defaults.politeness_delay_ms,
            fetch_timeout_secs: defaults.fetch_timeout_secs,
            user_agent: defaults.user_agent,
            blocked_extensions: defaults.blocked_extensions,
            min_text_length: defaults.min_text_length,
            seed_concurrency: defaults.seed_concurrency,
            content_selectors: defaults.content_selectors,
            exclude_selectors: defaults.exclude_selectors,
        }
    }
}

/// `[pdf]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfSettings {
    /// PDF URLs downloaded in addition to the ones the crawler discovers
    pub urls: Vec<String>,
    pub download_timeout_secs: u64,
    pub politeness_delay_ms: u64,
}

impl Default for PdfSettings {
    fn default() -> Self {
        let defaults = PdfConfig::default();
        Self {
            urls: Vec::new(),
            download_timeout_secs: defaults.download_timeout_secs,
            politeness_delay_ms: defaults.politeness_delay_ms,
        }
    }
}

/// `[chunking]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Embedding batches in flight at once
    pub embedding_concurrency: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        let defaults = ProcessorConfig::default();
        Self {
            chunk_size: defaults.chunk_options.chunk_size,
            chunk_overlap: defaults.chunk_options.chunk_overlap,
            embedding_concurrency: defaults.concurrency,
        }
    }
}

/// `[index]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Identifier both persisted index artifacts are named from
    pub name: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            name: IndexConfig::default().index_name,
        }
    }
}

/// `[embedding]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    /// Remote model name, used by the Gemini provider
    pub model: String,
    /// Vector size of the hashing provider
    pub dimensions: usize,
    pub requests_per_minute: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model: "text-embedding-004".to_string(),
            dimensions: 384,
            requests_per_minute: 1000,
        }
    }
}

/// `[retrieval]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 10 }
    }
}

/// `[paths]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Content area holding every text artifact
    pub content_dir: PathBuf,
    /// Downloaded and local PDFs, usually inside the content area
    pub pdf_dir: PathBuf,
    pub index_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("data/content"),
            pdf_dir: PathBuf::from("data/content/pdfs"),
            index_dir: PathBuf::from("data/index"),
        }
    }
}

impl IngestConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants every stage relies on
    pub fn validate(&self) -> Result<()> {
        ChunkOptions::new(self.chunking.chunk_size, self.chunking.chunk_overlap)
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("top_k must be greater than zero".to_string()));
        }
        if self.embedding.dimensions == 0 {
            return Err(Error::Config(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }
        if self.index.name.is_empty() {
            return Err(Error::Config("index name must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn content_store(&self) -> ContentStore {
        ContentStore::new(self.paths.content_dir.clone())
    }

    pub fn crawler_config(&self) -> CrawlerConfig {
        let crawl = &self.crawl;
        CrawlerConfig::builder()
            .max_pages(crawl.max_pages_per_seed)
            .politeness_delay_ms(crawl.politeness_delay_ms)
            .fetch_timeout_secs(crawl.fetch_timeout_secs)
            .user_agent(crawl.user_agent.clone())
            .blocked_extensions(crawl.blocked_extensions.clone())
            .min_text_length(crawl.min_text_length)
            .seed_concurrency(crawl.seed_concurrency)
            .content_selectors(crawl.content_selectors.clone())
            .exclude_selectors(crawl.exclude_selectors.clone())
            .build()
    }

    pub fn pdf_config(&self) -> PdfConfig {
        PdfConfig::builder()
            .output_dir(self.paths.pdf_dir.clone())
            .download_timeout_secs(self.pdf.download_timeout_secs)
            .politeness_delay_ms(self.pdf.politeness_delay_ms)
            .user_agent(self.crawl.user_agent.clone())
            .build()
    }

    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig::builder()
            .chunk_size(self.chunking.chunk_size)
            .chunk_overlap(self.chunking.chunk_overlap)
            .concurrency(self.chunking.embedding_concurrency)
            .build()
    }

    pub fn index_config(&self) -> IndexConfig {
        IndexConfig::builder()
            .index_dir(self.paths.index_dir.clone())
            .index_name(self.index.name.clone())
            .processor(self.processor_config())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = IngestConfig::from_toml("").unwrap();
        assert_eq!(config, IngestConfig::default());
        assert_eq!(config.crawl.max_pages_per_seed, 600);
        assert_eq!(config.chunking.chunk_size, 2000);
        assert_eq!(config.chunking.chunk_overlap, 400);
        assert_eq!(config.retrieval.top_k, 10);
        assert_eq!(config.embedding.provider, EmbeddingProvider::Hashing);
        assert!(config.crawl.seeds.is_empty());
    }

    #[test]
    fn test_partial_file() {
        let config = IngestConfig::from_toml(
            r#"
            [crawl]
            seeds = ["https://www.univ.example/dept"]
            politeness_delay_ms = 250

            [paths]
            index_dir = "/tmp/kb-index"

            [embedding]
            provider = "gemini"
            "#,
        )
        .unwrap();

        assert_eq!(config.crawl.seeds, vec!["https://www.univ.example/dept"]);
        assert_eq!(config.crawl.fetch_timeout_secs, 10);
        assert_eq!(config.embedding.provider, EmbeddingProvider::Gemini);
        assert_eq!(config.embedding.model, "text-embedding-004");

        let crawler = config.crawler_config();
        assert_eq!(crawler.politeness_delay(), Duration::from_millis(250));
        assert_eq!(crawler.max_pages, 600);

        let index = config.index_config();
        assert_eq!(index.index_dir, PathBuf::from("/tmp/kb-index"));
        assert_eq!(index.index_name, "campus_index");
        assert_eq!(index.processor.chunk_options, ChunkOptions::new(2000, 400));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for content in [
            "[chunking]\nchunk_size = 100\nchunk_overlap = 100",
            "[chunking]\nchunk_size = 0",
            "[retrieval]\ntop_k = 0",
            "[crawl]\nmax_pages_per_seed = \"many\"",
        ] {
            assert!(
                matches!(IngestConfig::from_toml(content), Err(Error::Config(_))),
                "{} should be rejected",
                content
            );
        }
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("ingest.toml");
        std::fs::write(&path, "[index]\nname = \"kb\"\n").unwrap();

        let config = IngestConfig::load(&path).unwrap();
        assert_eq!(config.index.name, "kb");
        assert!(matches!(
            IngestConfig::load(&temp_dir.path().join("missing.toml")),
            Err(Error::Config(_))
        ));
    }
}
