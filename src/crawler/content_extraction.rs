//! Content extraction functionality for the crawler module

use std::collections::HashSet;

use scraper::{ElementRef, Html, Node, Selector};
use tracing::warn;
use url::Url;

use crate::crawler::error::CrawlError;
use crate::crawler::scope::{Scope, is_pdf_url, resolve_href};

/// Links and readable text extracted from one HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// In-scope page links, fragment-free, in document order
    pub links: Vec<Url>,

    /// Links to PDF documents, fragment-free, in document order
    pub pdf_links: Vec<Url>,

    /// Body text with boilerplate removed, one text run per line
    pub text: String,
}

/// HTML page parser with precompiled selectors
#[derive(Debug, Clone)]
pub struct PageParser {
    content_selectors: Vec<Selector>,
    exclude_selectors: Vec<Selector>,
    anchor: Selector,
    body: Selector,
}

impl PageParser {
    /// Create a parser
    ///
    /// # Arguments
    ///
    /// * `content_selectors` - CSS selectors for the preferred content region, tried in order
    /// * `exclude_selectors` - CSS selectors for elements whose text is dropped
    ///
    /// Selectors that fail to parse are logged and ignored.
    pub fn new(
        content_selectors: &[String],
        exclude_selectors: &[String],
    ) -> Result<Self, CrawlError> {
        let anchor = Selector::parse("a[href]")
            .map_err(|e| CrawlError::HtmlParse(format!("Failed to parse anchor selector: {}", e)))?;
        let body = Selector::parse("body")
            .map_err(|e| CrawlError::HtmlParse(format!("Failed to parse body selector: {}", e)))?;

        Ok(Self {
            content_selectors: compile_selectors(content_selectors),
            exclude_selectors: compile_selectors(exclude_selectors),
            anchor,
            body,
        })
    }

    /// Parse a fetched page
    ///
    /// Links are collected before any boilerplate is discarded, so navigation
    /// and footer links still reach the frontier even though their text is not
    /// part of the extracted content.
    pub fn parse(&self, page_url: &Url, html: &str, scope: &Scope) -> ParsedPage {
        let document = Html::parse_document(html);
        let (links, pdf_links) = self.extract_links(&document, page_url, scope);
        let text = self.extract_text(&document);

        ParsedPage {
            links,
            pdf_links,
            text,
        }
    }

    /// Extract in-scope page links and PDF links from the unmodified document
    fn extract_links(&self, document: &Html, page_url: &Url, scope: &Scope) -> (Vec<Url>, Vec<Url>) {
        let mut seen = HashSet::new();
        let mut links = Vec::new();
        let mut pdf_links = Vec::new();

        for anchor in document.select(&self.anchor) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Some(url) = resolve_href(page_url, href) else {
                continue;
            };
            if !seen.insert(url.to_string()) {
                continue;
            }

            if is_pdf_url(&url) {
                pdf_links.push(url);
            } else if scope.admits(&url) {
                links.push(url);
            }
        }

        (links, pdf_links)
    }

    /// Extract readable text, preferring the first non-excluded content region
    pub fn extract_text(&self, document: &Html) -> String {
        let root = self
            .content_selectors
            .iter()
            .flat_map(|selector| document.select(selector))
            .find(|element| !self.is_excluded(element))
            .or_else(|| document.select(&self.body).next())
            .unwrap_or_else(|| document.root_element());

        let mut lines = Vec::new();
        for node in root.descendants() {
            let Node::Text(text) = node.value() else {
                continue;
            };
            let excluded = node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|element| self.matches_exclusion(&element));
            if excluded {
                continue;
            }

            lines.extend(
                text.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(String::from),
            );
        }

        lines.join("\n")
    }

    fn is_excluded(&self, element: &ElementRef) -> bool {
        self.matches_exclusion(element)
            || element
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|ancestor| self.matches_exclusion(&ancestor))
    }

    fn matches_exclusion(&self, element: &ElementRef) -> bool {
        self.exclude_selectors
            .iter()
            .any(|selector| selector.matches(element))
    }
}

fn compile_selectors(selectors: &[String]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|selector_str| match Selector::parse(selector_str) {
            Ok(selector) => Some(selector),
            Err(e) => {
                warn!("Failed to parse selector '{}': {}", selector_str, e);
                None
            }
        })
        .collect()
}
