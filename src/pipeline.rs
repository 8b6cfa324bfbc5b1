//! Ingestion orchestrator
//!
//! Runs the stages of a knowledge-base refresh in order: crawl the seeds,
//! download the discovered and configured PDFs, extract locally placed PDFs,
//! then load or rebuild the index over everything in the content area.
//! Per-page and per-document failures are counted by the stages themselves;
//! only a missing precondition (no seeds, no documents) or cancellation ends
//! the run early.

use rig::embeddings::EmbeddingModel;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use crate::config::IngestConfig;
use crate::crawler::{CancelSignal, CrawlEvent, CrawlReport, Crawler};
use crate::error::{Error, Result};
use crate::index::{IndexStats, IndexStatus, Indexer};
use crate::model::EmbeddingIdentity;
use crate::pdf::{LocalPdfStats, PdfBatchStats, PdfPipeline};

/// Page budget per seed in quick mode
pub const QUICK_MAX_PAGES: u32 = 5;

/// Per-run switches layered on top of the configuration file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOptions {
    /// Overrides the configured page budget per seed
    pub max_pages: Option<u32>,
    pub skip_crawl: bool,
    pub skip_pdfs: bool,
    pub force_rebuild: bool,
}

/// What one ingestion run did
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    /// Absent when crawling was skipped
    pub crawl: Option<CrawlReport>,

    /// Absent when PDF processing was skipped
    pub remote_pdfs: Option<PdfBatchStats>,
    pub local_pdfs: Option<LocalPdfStats>,

    /// The index after the run
    pub index: IndexStats,
}

/// One configured ingestion run
pub struct Ingestion<E> {
    config: IngestConfig,
    embedder: E,
    cancel: Option<CancelSignal>,
    crawl_progress: Option<mpsc::Sender<CrawlEvent>>,
    embedding_progress: Option<mpsc::Sender<usize>>,
}

impl<E> Ingestion<E>
where
    E: EmbeddingModel + EmbeddingIdentity,
{
    pub fn new(config: IngestConfig, embedder: E) -> Self {
        Self {
            config,
            embedder,
            cancel: None,
            crawl_progress: None,
            embedding_progress: None,
        }
    }

    /// Stop crawling and downloading once `cancel` fires
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Receive one event per page fetch attempt
    pub fn with_crawl_progress(mut self, sender: mpsc::Sender<CrawlEvent>) -> Self {
        self.crawl_progress = Some(sender);
        self
    }

    /// Receive the number of chunks embedded per batch during a rebuild
    pub fn with_embedding_progress(mut self, sender: mpsc::Sender<usize>) -> Self {
        self.embedding_progress = Some(sender);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Run every stage not switched off by `options`
    #[instrument(skip(self))]
    pub async fn run(self, options: IngestOptions) -> Result<IngestReport> {
        self.config.validate()?;
        let store = self.config.content_store();

        let crawl = if options.skip_crawl {
            info!("Skipping crawl");
            None
        } else {
            if self.config.crawl.seeds.is_empty() {
                return Err(Error::Config(
                    "no seed URLs configured; set [crawl] seeds or pass --seed".to_string(),
                ));
            }

            let mut crawler_config = self.config.crawler_config();
            if let Some(max_pages) = options.max_pages {
                crawler_config.max_pages = max_pages;
            }
            info!(
                "Crawling {} seeds, up to {} pages each",
                self.config.crawl.seeds.len(),
                crawler_config.max_pages
            );

            let mut crawler = Crawler::new(crawler_config, store.clone())?;
            if let Some(cancel) = &self.cancel {
                crawler = crawler.with_cancel(cancel.clone());
            }
            if let Some(sender) = &self.crawl_progress {
                crawler = crawler.with_progress(sender.clone());
            }
            Some(crawler.crawl(&self.config.crawl.seeds).await?)
        };
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let (remote_pdfs, local_pdfs) = if options.skip_pdfs {
            info!("Skipping PDF processing");
            (None, None)
        } else {
            let mut pipeline = PdfPipeline::new(self.config.pdf_config())?;
            if let Some(cancel) = &self.cancel {
                pipeline = pipeline.with_cancel(cancel.clone());
            }

            let mut urls = self.config.pdf.urls.clone();
            if let Some(report) = &crawl {
                urls.extend(report.pdf_links.iter().cloned());
            }
            let remote = pipeline.process_urls(&urls).await;
            if self.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let local = pipeline.process_local_dir().await?;
            (Some(remote), Some(local))
        };

        if !self
            .config
            .paths
            .pdf_dir
            .starts_with(&self.config.paths.content_dir)
        {
            warn!(
                "PDF directory {} is outside the content area {}; its text will not be indexed",
                self.config.paths.pdf_dir.display(),
                self.config.paths.content_dir.display()
            );
        }

        let indexer = Indexer::new(self.embedder, self.config.index_config(), store);
        indexer
            .build_or_load_with_progress(options.force_rebuild, self.embedding_progress)
            .await?;
        let index = match indexer.stats().await? {
            IndexStatus::Ready(stats) => stats,
            IndexStatus::NotFound => return Err(Error::IndexNotFound),
        };

        info!(
            "Ingestion finished: index {} holds {} vectors",
            index.index_name, index.total_vectors
        );
        Ok(IngestReport {
            crawl,
            remote_pdfs,
            local_pdfs,
            index,
        })
    }
}

/// Run a complete ingestion with `config` and `embedder`
pub async fn run_ingestion<E>(
    config: IngestConfig,
    embedder: E,
    options: IngestOptions,
    cancel: Option<CancelSignal>,
) -> Result<IngestReport>
where
    E: EmbeddingModel + EmbeddingIdentity,
{
    let mut ingestion = Ingestion::new(config, embedder);
    if let Some(cancel) = cancel {
        ingestion = ingestion.with_cancel(cancel);
    }
    ingestion.run(options).await
}
