//! Website crawler module
//!
//! This module provides a breadth-first, domain-scoped crawler that writes
//! readable page text into the content area and reports the PDF documents it
//! discovers along the way.

mod config;
mod content_extraction;
mod error;
mod fetcher;
mod politeness;
mod scope;
mod session;
pub mod storage;

use std::collections::HashSet;
use std::ops::{Add, AddAssign};
use std::path::PathBuf;

pub use config::{CrawlerConfig, CrawlerConfigBuilder, DEFAULT_USER_AGENT};
pub use content_extraction::{PageParser, ParsedPage};
pub use error::{CrawlError, FetchError};
pub use fetcher::{CancelSignal, Fetcher, cancel_channel};
pub use politeness::HostLimiter;
pub use scope::{Scope, is_pdf_url, normalize_url, resolve_href};
pub use session::{CrawlSession, Crawler};
pub use storage::{ContentStore, Document, StorageError};

/// Counters accumulated over a crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Pages whose text was persisted
    pub pages_saved: usize,

    /// Fetch attempts that failed (network, timeout, status)
    pub pages_failed: usize,

    /// Pages fetched but discarded for being near-empty
    pub pages_skipped: usize,

    /// Pages whose text could not be written
    pub write_failures: usize,

    /// Distinct PDF links discovered
    pub pdf_links_found: usize,
}

impl Add for CrawlStats {
    type Output = CrawlStats;

    fn add(self, other: CrawlStats) -> CrawlStats {
        CrawlStats {
            pages_saved: self.pages_saved + other.pages_saved,
            pages_failed: self.pages_failed + other.pages_failed,
            pages_skipped: self.pages_skipped + other.pages_skipped,
            write_failures: self.write_failures + other.write_failures,
            pdf_links_found: self.pdf_links_found + other.pdf_links_found,
        }
    }
}

impl AddAssign for CrawlStats {
    fn add_assign(&mut self, other: CrawlStats) {
        *self = *self + other;
    }
}

/// Result of a crawl: counters plus the PDF links discovered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub stats: CrawlStats,

    /// PDF URLs in first-seen order, without duplicates
    pub pdf_links: Vec<String>,
}

impl CrawlReport {
    /// Combine two reports
    ///
    /// PDF links are de-duplicated across both reports and `pdf_links_found`
    /// counts the merged, distinct set.
    pub fn merge(self, other: CrawlReport) -> CrawlReport {
        let mut seen = HashSet::new();
        let pdf_links: Vec<String> = self
            .pdf_links
            .into_iter()
            .chain(other.pdf_links)
            .filter(|link| seen.insert(link.clone()))
            .collect();

        let mut stats = self.stats + other.stats;
        stats.pdf_links_found = pdf_links.len();

        CrawlReport { stats, pdf_links }
    }
}

/// What happened to one fetched URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Text persisted at the given path
    Saved(PathBuf),

    /// Fetched, but the text was too short to keep
    TooShort,

    /// The fetch failed
    FetchFailed(String),

    /// The text could not be written
    WriteFailed(String),
}

/// Progress notification sent once per fetch attempt
#[derive(Debug, Clone)]
pub struct CrawlEvent {
    pub url: String,
    pub outcome: PageOutcome,
}

/// Crawl `seeds` with `config`, writing page text into `store`
pub async fn crawl(
    seeds: &[String],
    config: CrawlerConfig,
    store: ContentStore,
) -> Result<CrawlReport, CrawlError> {
    Crawler::new(config, store)?.crawl(seeds).await
}
