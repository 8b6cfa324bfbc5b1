//! Breadth-first crawl of a single seed and the multi-seed driver around it

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use futures::future;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::config::CrawlerConfig;
use super::content_extraction::PageParser;
use super::error::{CrawlError, FetchError};
use super::fetcher::{CancelSignal, Fetcher};
use super::politeness::HostLimiter;
use super::scope::{Scope, normalize_url};
use super::storage::ContentStore;
use super::{CrawlEvent, CrawlReport, CrawlStats, PageOutcome};

/// Frontier, visited set and statistics of one seed's crawl
///
/// A session is owned by exactly one crawl loop; nothing in it is shared with
/// other seeds.
#[derive(Debug)]
pub struct CrawlSession {
    scope: Scope,
    frontier: VecDeque<String>,
    queued: HashSet<String>,
    visited: HashSet<String>,
    stats: CrawlStats,
    pdf_links: Vec<String>,
    seen_pdfs: HashSet<String>,
}

impl CrawlSession {
    /// Start a session whose frontier holds only `seed`
    pub fn new(seed: &str, blocked_extensions: &[String]) -> Result<Self, CrawlError> {
        let mut seed_url = Url::parse(seed.trim())?;
        if !matches!(seed_url.scheme(), "http" | "https") {
            return Err(CrawlError::InvalidSeed(seed.to_string()));
        }
        seed_url.set_fragment(None);

        let mut session = Self {
            scope: Scope::from_seed(&seed_url, blocked_extensions)?,
            frontier: VecDeque::new(),
            queued: HashSet::new(),
            visited: HashSet::new(),
            stats: CrawlStats::default(),
            pdf_links: Vec::new(),
            seen_pdfs: HashSet::new(),
        };
        session.enqueue(&seed_url);
        Ok(session)
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Number of URLs fetched (or attempted) so far
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn has_visited(&self, url: &Url) -> bool {
        self.visited.contains(&normalize_url(url))
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Pop the earliest-enqueued URL that has not been visited and mark it visited
    pub fn next_url(&mut self) -> Option<String> {
        while let Some(url) = self.frontier.pop_front() {
            if self.visited.insert(url.clone()) {
                return Some(url);
            }
        }
        None
    }

    /// Append `url` to the frontier unless it was already visited or queued
    pub fn enqueue(&mut self, url: &Url) -> bool {
        let key = normalize_url(url);
        if self.visited.contains(&key) || !self.queued.insert(key.clone()) {
            return false;
        }
        self.frontier.push_back(key);
        true
    }

    /// Remember a discovered PDF link, once per session
    pub fn record_pdf(&mut self, url: &Url) {
        let key = normalize_url(url);
        if self.seen_pdfs.insert(key.clone()) {
            self.pdf_links.push(key);
            self.stats.pdf_links_found += 1;
        }
    }

    pub fn stats(&self) -> CrawlStats {
        self.stats
    }

    pub fn into_report(self) -> CrawlReport {
        CrawlReport {
            stats: self.stats,
            pdf_links: self.pdf_links,
        }
    }
}

/// Web crawler driving one [`CrawlSession`] per seed
#[derive(Debug)]
pub struct Crawler {
    config: CrawlerConfig,
    fetcher: Fetcher,
    parser: PageParser,
    store: ContentStore,
    limiter: HostLimiter,
    progress: Option<mpsc::Sender<CrawlEvent>>,
}

impl Crawler {
    /// Create a crawler writing page artifacts into `store`
    pub fn new(config: CrawlerConfig, store: ContentStore) -> Result<Self, CrawlError> {
        let fetcher = Fetcher::new(&config.user_agent, config.fetch_timeout())?;
        let parser = PageParser::new(&config.content_selectors, &config.exclude_selectors)?;
        let limiter = HostLimiter::new(config.politeness_delay());

        Ok(Self {
            config,
            fetcher,
            parser,
            store,
            limiter,
            progress: None,
        })
    }

    /// Stop popping the frontier and abort in-flight fetches once `cancel` fires
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.fetcher = self.fetcher.with_cancel(cancel);
        self
    }

    /// Receive one [`CrawlEvent`] per fetch attempt
    pub fn with_progress(mut self, sender: mpsc::Sender<CrawlEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Crawl every seed and merge the per-seed reports
    ///
    /// All seeds are validated before any request is sent. Up to
    /// `seed_concurrency` seeds are crawled at once; each seed's frontier is
    /// still processed strictly in order by a single loop.
    #[instrument(skip(self, seeds), fields(seeds = seeds.len()))]
    pub async fn crawl(&self, seeds: &[String]) -> Result<CrawlReport, CrawlError> {
        let sessions = seeds
            .iter()
            .map(|seed| CrawlSession::new(seed, &self.config.blocked_extensions))
            .collect::<Result<Vec<_>, _>>()?;

        let semaphore = Arc::new(Semaphore::new(self.config.seed_concurrency.max(1)));
        let runs = sessions.into_iter().map(|session| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| CrawlError::Other(format!("Failed to acquire semaphore: {}", e)))?;
                Ok::<_, CrawlError>(self.run_session(session).await)
            }
        });

        let mut report = CrawlReport::default();
        for result in future::join_all(runs).await {
            report = report.merge(result?);
        }

        info!(
            "Crawl finished: {} saved, {} failed, {} skipped, {} PDF links",
            report.stats.pages_saved,
            report.stats.pages_failed,
            report.stats.pages_skipped,
            report.pdf_links.len()
        );
        Ok(report)
    }

    /// Run one session until its frontier empties, its page budget is spent or
    /// cancellation is requested
    #[instrument(
        skip(self, session),
        fields(domain = %session.scope().domain(), prefix = %session.scope().path_prefix())
    )]
    pub async fn run_session(&self, mut session: CrawlSession) -> CrawlReport {
        let max_pages = self.config.max_pages as usize;
        let delay = self.config.politeness_delay();

        while session.visited_count() < max_pages {
            if self.fetcher.is_cancelled() {
                info!("Crawl cancelled");
                break;
            }
            let Some(url) = session.next_url() else {
                break;
            };

            let outcome = match Url::parse(&url) {
                Ok(page_url) => {
                    self.limiter.until_ready(&page_url).await;
                    match self.fetcher.fetch_text(&url).await {
                        Ok(html) => self.process_page(&mut session, &page_url, &html).await,
                        Err(FetchError::Cancelled) => {
                            info!("Crawl cancelled during fetch of {}", url);
                            break;
                        }
                        Err(e) => {
                            warn!("Failed to fetch {}: {}", url, e);
                            session.stats.pages_failed += 1;
                            PageOutcome::FetchFailed(e.to_string())
                        }
                    }
                }
                Err(e) => {
                    warn!("Skipping unparsable frontier entry {}: {}", url, e);
                    session.stats.pages_failed += 1;
                    PageOutcome::FetchFailed(e.to_string())
                }
            };

            if let Some(sender) = &self.progress {
                // Progress is best effort; a dropped receiver must not stop the crawl.
                let _ = sender
                    .send(CrawlEvent {
                        url: url.clone(),
                        outcome,
                    })
                    .await;
            }

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        debug!(
            "Session finished after {} fetches, {} URLs left in frontier",
            session.visited_count(),
            session.frontier_len()
        );
        session.into_report()
    }

    async fn process_page(
        &self,
        session: &mut CrawlSession,
        page_url: &Url,
        html: &str,
    ) -> PageOutcome {
        let parsed = self.parser.parse(page_url, html, session.scope());

        let discovered = parsed
            .links
            .iter()
            .filter(|link| session.enqueue(link))
            .count();
        for pdf in &parsed.pdf_links {
            session.record_pdf(pdf);
        }
        debug!(
            "{}: {} new links, {} PDF links, {} chars of text",
            page_url,
            discovered,
            parsed.pdf_links.len(),
            parsed.text.chars().count()
        );

        if parsed.text.chars().count() <= self.config.min_text_length {
            session.stats.pages_skipped += 1;
            return PageOutcome::TooShort;
        }

        match self.store.write_page(page_url, &parsed.text).await {
            Ok(path) => {
                session.stats.pages_saved += 1;
                PageOutcome::Saved(path)
            }
            Err(e) => {
                warn!("Failed to save {}: {}", page_url, e);
                session.stats.write_failures += 1;
                PageOutcome::WriteFailed(e.to_string())
            }
        }
    }
}
