//! # Crawler Configuration Module
//!
//! This module provides configuration options for the web crawler, including
//! the page budget, politeness delay, scope filters and content selection.
//! It uses a builder pattern for flexible configuration.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: The main configuration struct with crawler parameters
//! - `CrawlerConfigBuilder`: Builder pattern implementation for easier configuration
//!
//! ## Features
//!
//! - Default configuration suitable for polite, single-request-at-a-time crawling
//! - Page budget per seed and bounded cross-seed concurrency
//! - Blocked file extensions for links that never hold page content
//! - Preferred content regions and boilerplate exclusion via CSS selectors
//! - Browser-like user agent

use std::time::Duration;

/// User agent sent with every crawler and PDF request by default
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Configuration for the crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Maximum number of fetch attempts per seed
    pub max_pages: u32,

    /// Pause in milliseconds after every fetch attempt
    pub politeness_delay_ms: u64,

    /// Timeout in seconds for a single page fetch
    pub fetch_timeout_secs: u64,

    /// User agent to use for requests
    pub user_agent: String,

    /// Path suffixes of links that are never crawled
    pub blocked_extensions: Vec<String>,

    /// Minimum extracted text length (in characters) for a page to be saved
    pub min_text_length: usize,

    /// Maximum number of seeds crawled at the same time
    pub seed_concurrency: usize,

    /// CSS selectors for the preferred content region, tried in order
    pub content_selectors: Vec<String>,

    /// CSS selectors for elements to exclude from extracted text
    pub exclude_selectors: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 600,
            politeness_delay_ms: 1000,
            fetch_timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            blocked_extensions: [".jpg", ".jpeg", ".png", ".gif", ".css", ".js", ".ico", ".svg"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            min_text_length: 100,
            seed_concurrency: 1,
            content_selectors: vec![
                "main".to_string(),
                "article".to_string(),
                "div.content".to_string(),
            ],
            exclude_selectors: vec![
                "script".to_string(),
                "style".to_string(),
                "noscript".to_string(),
                "nav".to_string(),
                "header".to_string(),
                "footer".to_string(),
            ],
        }
    }
}

/// Builder for CrawlerConfig
#[derive(Debug, Default)]
pub struct CrawlerConfigBuilder {
    config: CrawlerConfig,
}

impl CrawlerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig::default(),
        }
    }

    /// Set the maximum number of pages to fetch per seed
    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Set the pause in milliseconds between requests
    pub fn politeness_delay_ms(mut self, politeness_delay_ms: u64) -> Self {
        self.config.politeness_delay_ms = politeness_delay_ms;
        self
    }

    /// Set the per-request timeout in seconds
    pub fn fetch_timeout_secs(mut self, fetch_timeout_secs: u64) -> Self {
        self.config.fetch_timeout_secs = fetch_timeout_secs;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the blocked link extensions
    pub fn blocked_extensions(mut self, blocked_extensions: Vec<String>) -> Self {
        self.config.blocked_extensions = blocked_extensions;
        self
    }

    /// Set the minimum text length for a page to be saved
    pub fn min_text_length(mut self, min_text_length: usize) -> Self {
        self.config.min_text_length = min_text_length;
        self
    }

    /// Set how many seeds may be crawled concurrently
    pub fn seed_concurrency(mut self, seed_concurrency: usize) -> Self {
        self.config.seed_concurrency = seed_concurrency.max(1);
        self
    }

    /// Set the CSS selectors for the preferred content region
    pub fn content_selectors(mut self, content_selectors: Vec<String>) -> Self {
        self.config.content_selectors = content_selectors;
        self
    }

    /// Set the CSS selectors for elements to exclude
    pub fn exclude_selectors(mut self, exclude_selectors: Vec<String>) -> Self {
        self.config.exclude_selectors = exclude_selectors;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CrawlerConfig {
        self.config
    }
}

impl CrawlerConfig {
    /// Create a new builder
    pub fn builder() -> CrawlerConfigBuilder {
        CrawlerConfigBuilder::new()
    }

    /// Get the politeness delay as a Duration
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    /// Get the fetch timeout as a Duration
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CrawlerConfig::default();
        assert_eq!(config.max_pages, 600);
        assert_eq!(config.politeness_delay(), Duration::from_secs(1));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.min_text_length, 100);
        assert!(config.blocked_extensions.contains(&".svg".to_string()));
        assert_eq!(config.content_selectors[0], "main");
    }

    #[test]
    fn test_builder_overrides() {
        let config = CrawlerConfig::builder()
            .max_pages(5)
            .politeness_delay_ms(0)
            .seed_concurrency(0)
            .user_agent("test-agent")
            .build();

        assert_eq!(config.max_pages, 5);
        assert_eq!(config.politeness_delay(), Duration::ZERO);
        assert_eq!(config.seed_concurrency, 1);
        assert_eq!(config.user_agent, "test-agent");
    }
}
