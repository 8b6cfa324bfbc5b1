//! Crawl scope: which discovered links are eligible for the frontier

use url::Url;

use crate::crawler::error::CrawlError;

/// Link prefixes that never point at a crawlable page
const IGNORED_HREF_PREFIXES: [&str; 4] = ["#", "mailto:", "tel:", "javascript:"];

/// Domain and path-prefix rule derived from a seed URL
#[derive(Debug, Clone)]
pub struct Scope {
    domain: String,
    path_prefix: String,
    blocked_extensions: Vec<String>,
}

impl Scope {
    /// Derive the scope of a crawl from its seed
    ///
    /// The domain is the seed's network location (host plus explicit port) and
    /// the path prefix is the seed's path without trailing slashes.
    pub fn from_seed(seed: &Url, blocked_extensions: &[String]) -> Result<Self, CrawlError> {
        let domain = netloc(seed).ok_or_else(|| CrawlError::InvalidSeed(seed.to_string()))?;

        Ok(Self {
            domain,
            path_prefix: seed.path().trim_end_matches('/').to_string(),
            blocked_extensions: blocked_extensions
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
        })
    }

    /// Network location the crawl is restricted to
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Path prefix discovered links must start with (empty for a site root)
    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    /// Whether `url` is on the seed's domain, uses HTTP(S) and is not a blocked asset
    pub fn is_in_scope(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        if !netloc(url).is_some_and(|location| location.contains(&self.domain)) {
            return false;
        }
        let path = url.path().to_lowercase();
        !self
            .blocked_extensions
            .iter()
            .any(|ext| path.ends_with(ext.as_str()))
    }

    /// Whether `url` stays under the seed's path prefix
    ///
    /// The match is textual, not per path segment: a `/dept` seed also admits
    /// `/department`.
    pub fn is_confined(&self, url: &Url) -> bool {
        self.path_prefix.is_empty() || url.path().starts_with(&self.path_prefix)
    }

    /// Whether a discovered page link may be enqueued
    pub fn admits(&self, url: &Url) -> bool {
        self.is_in_scope(url) && self.is_confined(url) && !is_pdf_url(url)
    }
}

/// Host plus explicit port, the unit the domain rule matches against
fn netloc(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Resolve an `href` against the page it appeared on
///
/// Fragment-only, `mailto:`, `tel:` and `javascript:` references are dropped,
/// and the fragment of the resolved URL is removed so that two links differing
/// only by fragment compare equal.
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let lowered = href.to_lowercase();
    if IGNORED_HREF_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
    {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Canonical frontier key for a URL (fragment removed)
pub fn normalize_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

/// Whether the URL path names a PDF document
pub fn is_pdf_url(url: &Url) -> bool {
    url.path().to_lowercase().ends_with(".pdf")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocked() -> Vec<String> {
        vec![".png".to_string(), ".css".to_string(), ".JS".to_string()]
    }

    fn dept_scope() -> Scope {
        let seed = Url::parse("https://univ.example/dept").unwrap();
        Scope::from_seed(&seed, &blocked()).unwrap()
    }

    #[test]
    fn test_scope_from_seed() {
        let scope = dept_scope();
        assert_eq!(scope.domain(), "univ.example");
        assert_eq!(scope.path_prefix(), "/dept");

        let root = Scope::from_seed(&Url::parse("https://univ.example/").unwrap(), &[]).unwrap();
        assert_eq!(root.path_prefix(), "");

        let with_port =
            Scope::from_seed(&Url::parse("http://127.0.0.1:8080/a/").unwrap(), &[]).unwrap();
        assert_eq!(with_port.domain(), "127.0.0.1:8080");
        assert_eq!(with_port.path_prefix(), "/a");
    }

    #[test]
    fn test_scope_rejects_hostless_seed() {
        let seed = Url::parse("mailto:someone@univ.example").unwrap();
        assert!(matches!(
            Scope::from_seed(&seed, &[]),
            Err(CrawlError::InvalidSeed(_))
        ));
    }

    #[test]
    fn test_scope_enforcement() {
        let scope = dept_scope();
        let admits = |s: &str| scope.admits(&Url::parse(s).unwrap());

        assert!(!admits("https://othersite.example/dept/page"));
        assert!(admits("https://univ.example/dept/sub"));
        assert!(!admits("https://univ.example/other"));
        // Subdomains contain the seed domain.
        assert!(admits("https://www.univ.example/dept/x"));
    }

    #[test]
    fn test_path_prefix_match_is_textual() {
        let scope = dept_scope();
        assert!(scope.is_confined(&Url::parse("https://univ.example/department").unwrap()));
        assert!(scope.is_confined(&Url::parse("https://univ.example/dept").unwrap()));
        assert!(!scope.is_confined(&Url::parse("https://univ.example/dep").unwrap()));
    }

    #[test]
    fn test_blocked_extensions_are_case_insensitive() {
        let scope = dept_scope();
        let admits = |s: &str| scope.admits(&Url::parse(s).unwrap());

        assert!(!admits("https://univ.example/dept/logo.PNG"));
        assert!(!admits("https://univ.example/dept/site.css"));
        assert!(!admits("https://univ.example/dept/app.js"));
        assert!(admits("https://univ.example/dept/page.html"));
    }

    #[test]
    fn test_pdf_links_are_not_pages() {
        let scope = dept_scope();
        let pdf = Url::parse("https://univ.example/dept/doc.PDF").unwrap();
        assert!(is_pdf_url(&pdf));
        assert!(scope.is_in_scope(&pdf));
        assert!(!scope.admits(&pdf));
    }

    #[test]
    fn test_resolve_href() {
        let base = Url::parse("https://univ.example/dept/index.html").unwrap();

        assert_eq!(
            resolve_href(&base, "page2#section").unwrap().as_str(),
            "https://univ.example/dept/page2"
        );
        assert_eq!(
            resolve_href(&base, "/other").unwrap().as_str(),
            "https://univ.example/other"
        );
        assert!(resolve_href(&base, "#top").is_none());
        assert!(resolve_href(&base, "mailto:info@univ.example").is_none());
        assert!(resolve_href(&base, "tel:+900000").is_none());
        assert!(resolve_href(&base, "javascript:void(0)").is_none());
        assert!(resolve_href(&base, "ftp://univ.example/file").is_none());
        assert!(resolve_href(&base, "   ").is_none());
    }

    #[test]
    fn test_fragments_normalize_to_same_key() {
        let a = Url::parse("https://univ.example/dept/page#one").unwrap();
        let b = Url::parse("https://univ.example/dept/page#two").unwrap();
        assert_eq!(normalize_url(&a), normalize_url(&b));
        assert_eq!(normalize_url(&a), "https://univ.example/dept/page");
    }
}
