//! PDF pipeline
//!
//! Downloads PDF documents (or picks up PDFs placed in the output directory by
//! hand), extracts their text page by page and writes a `.txt` artifact next
//! to each PDF so the indexer can pick it up.

mod config;
mod error;
mod extract;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use config::{PdfConfig, PdfConfigBuilder};
pub use error::PdfError;
pub use extract::{extract_pdf_text, normalize_text, pdf_file_name};

use crate::crawler::storage::write_atomic;
use crate::crawler::{CancelSignal, FetchError, Fetcher};

/// Counters for a batch of remote PDFs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PdfBatchStats {
    pub attempted: usize,
    pub downloaded: usize,
    pub extracted: usize,
    pub failed: usize,
}

/// Counters for a scan of locally placed PDFs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalPdfStats {
    pub total: usize,
    pub extracted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Files produced for one PDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfArtifact {
    pub pdf_path: PathBuf,

    /// Text artifact, absent when the PDF yielded no text
    pub text_path: Option<PathBuf>,
}

/// PDF download and extraction pipeline
#[derive(Debug, Clone)]
pub struct PdfPipeline {
    config: PdfConfig,
    fetcher: Fetcher,
}

impl PdfPipeline {
    pub fn new(config: PdfConfig) -> Result<Self, PdfError> {
        let fetcher = Fetcher::new(&config.user_agent, config.download_timeout())?;
        Ok(Self { config, fetcher })
    }

    /// Abort downloads once `cancel` fires
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.fetcher = self.fetcher.with_cancel(cancel);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Download one PDF, store it and write its text artifact
    ///
    /// A PDF that downloads but yields no text is kept on disk without a text
    /// artifact; that is not an error.
    #[instrument(skip(self))]
    pub async fn fetch_and_extract(&self, url: &str) -> Result<PdfArtifact, PdfError> {
        let parsed = Url::parse(url).map_err(|e| PdfError::InvalidUrl(format!("{}: {}", url, e)))?;
        let bytes = self.fetcher.fetch_bytes(url).await?;

        let pdf_path = self.config.output_dir.join(pdf_file_name(&parsed));
        write_atomic(&pdf_path, &bytes).await?;
        debug!("Saved {} ({} bytes)", pdf_path.display(), bytes.len());

        let text_path = self.extract_to_artifact(&pdf_path, bytes).await?;
        Ok(PdfArtifact {
            pdf_path,
            text_path,
        })
    }

    /// Download and extract every URL once, in order
    ///
    /// Failures are counted per document and never abort the batch.
    #[instrument(skip(self, urls), fields(urls = urls.len()))]
    pub async fn process_urls(&self, urls: &[String]) -> PdfBatchStats {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = urls.iter().filter(|url| seen.insert(url.as_str())).collect();

        let mut stats = PdfBatchStats::default();
        for (i, url) in unique.iter().enumerate() {
            if self.fetcher.is_cancelled() {
                info!("PDF downloads cancelled");
                break;
            }
            if i > 0 && !self.config.politeness_delay().is_zero() {
                tokio::time::sleep(self.config.politeness_delay()).await;
            }

            stats.attempted += 1;
            match self.fetch_and_extract(url).await {
                Ok(artifact) => {
                    stats.downloaded += 1;
                    if artifact.text_path.is_some() {
                        stats.extracted += 1;
                    }
                }
                Err(PdfError::Download(FetchError::Cancelled)) => {
                    stats.attempted -= 1;
                    info!("PDF downloads cancelled");
                    break;
                }
                Err(e) => {
                    warn!("Failed to process {}: {}", url, e);
                    stats.failed += 1;
                }
            }
        }

        info!(
            "PDF batch finished: {} attempted, {} downloaded, {} extracted, {} failed",
            stats.attempted, stats.downloaded, stats.extracted, stats.failed
        );
        stats
    }

    /// Extract every PDF in the output directory that has no text artifact yet
    ///
    /// Running the scan twice over an unchanged directory extracts nothing the
    /// second time. A missing directory yields empty stats.
    #[instrument(skip(self), fields(dir = %self.config.output_dir.display()))]
    pub async fn process_local_dir(&self) -> Result<LocalPdfStats, PdfError> {
        let mut stats = LocalPdfStats::default();

        let mut entries = match fs::read_dir(&self.config.output_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(stats),
            Err(e) => return Err(e.into()),
        };

        let mut pdfs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_pdf = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
            if is_pdf && entry.file_type().await?.is_file() {
                pdfs.push(path);
            }
        }
        pdfs.sort();

        for pdf_path in pdfs {
            stats.total += 1;
            if fs::try_exists(text_artifact_path(&pdf_path)).await? {
                debug!("Already extracted: {}", pdf_path.display());
                stats.skipped += 1;
                continue;
            }

            let result = match fs::read(&pdf_path).await {
                Ok(bytes) => self.extract_to_artifact(&pdf_path, bytes).await,
                Err(e) => Err(e.into()),
            };
            match result {
                Ok(Some(_)) => stats.extracted += 1,
                Ok(None) => {
                    warn!("No text extracted from {}", pdf_path.display());
                    stats.failed += 1;
                }
                Err(e) => {
                    warn!("Failed to process {}: {}", pdf_path.display(), e);
                    stats.failed += 1;
                }
            }
        }

        info!(
            "Local PDF scan finished: {} total, {} extracted, {} skipped, {} failed",
            stats.total, stats.extracted, stats.skipped, stats.failed
        );
        Ok(stats)
    }

    /// Extract `bytes` on a blocking thread and write the text beside `pdf_path`
    ///
    /// Unparsable documents are logged and treated as empty.
    async fn extract_to_artifact(
        &self,
        pdf_path: &Path,
        bytes: Vec<u8>,
    ) -> Result<Option<PathBuf>, PdfError> {
        let extracted = tokio::task::spawn_blocking(move || extract_pdf_text(&bytes)).await?;
        let text = match extracted {
            Ok(text) => text,
            Err(e) => {
                warn!("Could not extract {}: {}", pdf_path.display(), e);
                String::new()
            }
        };
        if text.is_empty() {
            return Ok(None);
        }

        let text_path = text_artifact_path(pdf_path);
        write_atomic(&text_path, text.as_bytes()).await?;
        info!(
            "Extracted {} ({} chars)",
            text_path.display(),
            text.chars().count()
        );
        Ok(Some(text_path))
    }
}

/// Path of the text artifact written beside a PDF
pub fn text_artifact_path(pdf_path: &Path) -> PathBuf {
    pdf_path.with_extension("txt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::extract::tests::sample_pdf;
    use tempfile::tempdir;

    fn pipeline(dir: &Path) -> PdfPipeline {
        PdfPipeline::new(
            PdfConfig::builder()
                .output_dir(dir)
                .politeness_delay_ms(0)
                .build(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_and_extract() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/files/guide%20book.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body(sample_pdf(&["Student guide"]))
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let artifact = pipeline(dir.path())
            .fetch_and_extract(&format!("{}/files/guide%20book.pdf", server.url()))
            .await
            .unwrap();

        assert_eq!(artifact.pdf_path, dir.path().join("guide_book.pdf"));
        let text_path = artifact.text_path.unwrap();
        assert_eq!(text_path, dir.path().join("guide_book.txt"));
        let text = std::fs::read_to_string(text_path).unwrap();
        assert!(text.starts_with("--- Page 1 ---"));
        assert!(text.contains("Student guide"));
    }

    #[tokio::test]
    async fn test_batch_isolates_failures_and_dedups() {
        let mut server = mockito::Server::new_async().await;
        let good = server
            .mock("GET", "/good.pdf")
            .with_status(200)
            .with_body(sample_pdf(&["Fees"]))
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/missing.pdf")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/broken.pdf")
            .with_status(200)
            .with_body("not really a pdf")
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let urls = vec![
            format!("{}/good.pdf", server.url()),
            format!("{}/missing.pdf", server.url()),
            format!("{}/good.pdf", server.url()),
            format!("{}/broken.pdf", server.url()),
        ];
        let stats = pipeline(dir.path()).process_urls(&urls).await;

        assert_eq!(
            stats,
            PdfBatchStats {
                attempted: 3,
                downloaded: 2,
                extracted: 1,
                failed: 1,
            }
        );
        good.assert_async().await;
        assert!(dir.path().join("broken.pdf").exists());
        assert!(!dir.path().join("broken.txt").exists());
    }

    #[tokio::test]
    async fn test_local_scan_is_idempotent() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), sample_pdf(&["Alpha"])).unwrap();
        std::fs::write(dir.path().join("b.PDF"), sample_pdf(&["Beta"])).unwrap();
        std::fs::write(dir.path().join("c.pdf"), b"garbage").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "unrelated").unwrap();

        let pipeline = pipeline(dir.path());
        let first = pipeline.process_local_dir().await.unwrap();
        assert_eq!(
            first,
            LocalPdfStats {
                total: 3,
                extracted: 2,
                skipped: 0,
                failed: 1,
            }
        );
        let after_first = std::fs::read_to_string(dir.path().join("a.txt")).unwrap();

        let second = pipeline.process_local_dir().await.unwrap();
        assert_eq!(second.extracted, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            after_first
        );
    }

    #[tokio::test]
    async fn test_local_scan_of_missing_dir() {
        let dir = tempdir().unwrap();
        let stats = pipeline(&dir.path().join("absent"))
            .process_local_dir()
            .await
            .unwrap();
        assert_eq!(stats, LocalPdfStats::default());
    }
}
