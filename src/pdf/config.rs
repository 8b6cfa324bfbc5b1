//! Configuration for the PDF pipeline

use std::path::PathBuf;
use std::time::Duration;

use crate::crawler::DEFAULT_USER_AGENT;

/// Configuration for downloading and extracting PDFs
#[derive(Debug, Clone)]
pub struct PdfConfig {
    /// Directory holding downloaded PDFs and their text artifacts
    pub output_dir: PathBuf,

    /// Timeout in seconds for a single download
    pub download_timeout_secs: u64,

    /// Pause in milliseconds between downloads
    pub politeness_delay_ms: u64,

    /// User agent to use for downloads
    pub user_agent: String,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data/content/pdfs"),
            download_timeout_secs: 30,
            politeness_delay_ms: 1000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl PdfConfig {
    /// Create a new builder
    pub fn builder() -> PdfConfigBuilder {
        PdfConfigBuilder::new()
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }
}

/// Builder for PdfConfig
#[derive(Debug, Default)]
pub struct PdfConfigBuilder {
    config: PdfConfig,
}

impl PdfConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PdfConfig::default(),
        }
    }

    pub fn output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = output_dir.into();
        self
    }

    pub fn download_timeout_secs(mut self, download_timeout_secs: u64) -> Self {
        self.config.download_timeout_secs = download_timeout_secs;
        self
    }

    pub fn politeness_delay_ms(mut self, politeness_delay_ms: u64) -> Self {
        self.config.politeness_delay_ms = politeness_delay_ms;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> PdfConfig {
        self.config
    }
}
