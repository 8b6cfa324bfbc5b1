//! Flat content area holding one UTF-8 text artifact per page or document

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};
use url::Url;

/// Extension of every text artifact
pub const ARTIFACT_EXTENSION: &str = "txt";

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid URL for storage: {0}")]
    InvalidUrl(String),
}

type Result<T> = std::result::Result<T, StorageError>;

/// A persisted text artifact loaded back from the content area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Path of the artifact relative to the content area, `/`-separated
    pub source: String,

    /// Full artifact text
    pub text: String,
}

/// Writer and reader for the content area
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Create a store rooted at `root`; the directory is created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the artifacts
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist the extracted text of a crawled page
    pub async fn write_page(&self, url: &Url, text: &str) -> Result<PathBuf> {
        let name = artifact_name_for_url(url)?;
        self.write_artifact(&name, text).await
    }

    /// Persist a standalone text artifact under a sanitized `name`
    ///
    /// The `.txt` extension is appended when `name` does not already carry it.
    pub async fn write_text(&self, name: &str, text: &str) -> Result<PathBuf> {
        let mut name = sanitize_file_name(name);
        if !name.ends_with(".txt") {
            name.push_str(".txt");
        }
        self.write_artifact(&name, text).await
    }

    async fn write_artifact(&self, name: &str, text: &str) -> Result<PathBuf> {
        let path = self.root.join(name);
        write_atomic(&path, text.as_bytes()).await?;
        debug!("Wrote artifact {} ({} bytes)", path.display(), text.len());
        Ok(path)
    }

    /// Load every text artifact below the content area, sorted by path
    ///
    /// A missing content area is the same as an empty one.
    pub async fn load_documents(&self) -> Result<Vec<Document>> {
        let mut paths = Vec::new();
        collect_files(&self.root, &mut paths).await?;
        paths.retain(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(ARTIFACT_EXTENSION))
        });
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = fs::read(&path).await?;
            documents.push(Document {
                source: relative_source(&self.root, &path),
                text: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        info!(
            "Loaded {} documents from {}",
            documents.len(),
            self.root.display()
        );
        Ok(documents)
    }

    /// Delete files whose name contains any of `patterns`
    ///
    /// Empty patterns are ignored. Returns the number of deleted files.
    pub async fn prune(&self, patterns: &[String]) -> Result<usize> {
        let patterns: Vec<&str> = patterns
            .iter()
            .map(String::as_str)
            .filter(|pattern| !pattern.is_empty())
            .collect();
        if patterns.is_empty() {
            return Ok(0);
        }

        let mut paths = Vec::new();
        collect_files(&self.root, &mut paths).await?;
        paths.sort();

        let mut deleted = 0;
        for path in paths {
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if patterns.iter().any(|pattern| file_name.contains(pattern)) {
                info!("Deleting {}", path.display());
                fs::remove_file(&path).await?;
                deleted += 1;
            }
        }

        Ok(deleted)
    }
}

/// Artifact file name for a page URL: `{host}_{path}[_{query}].txt`
///
/// Slashes in the path become underscores and an empty path becomes `index`.
pub fn artifact_name_for_url(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| StorageError::InvalidUrl(url.to_string()))?;
    let netloc = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    let path = url.path().trim_matches('/').replace('/', "_");
    let path = if path.is_empty() { "index".to_string() } else { path };

    let name = match url.query().filter(|query| !query.is_empty()) {
        Some(query) => format!("{}_{}_{}.txt", netloc, path, query),
        None => format!("{}_{}.txt", netloc, path),
    };
    Ok(sanitize_file_name(&name))
}

/// Map every character outside `[A-Za-z0-9._-]` to `_`
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write `contents` to `path` through a sibling temporary file and a rename
///
/// Readers either see the previous file or the complete new one.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, contents).await?;
    if let Err(e) = fs::rename(&tmp_path, path).await {
        if let Err(cleanup) = fs::remove_file(&tmp_path).await {
            warn!("Failed to remove {}: {}", tmp_path.display(), cleanup);
        }
        return Err(e);
    }
    Ok(())
}

async fn collect_files(root: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };

        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                out.push(entry.path());
            }
        }
    }

    Ok(())
}

fn relative_source(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
