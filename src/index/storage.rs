//! On-disk layout of the index
//!
//! Two artifacts per generation live in the index directory:
//!
//! - `{name}.index` - the checksummed vector file, naming its generation stamp
//! - `{name}.{stamp}.db` - the document store for that generation
//!
//! Saving writes the new document store first and then atomically replaces
//! the vector file; the rename is the commit point. Superseded stores are
//! removed afterwards, so a crash at any step leaves either the previous or
//! the new generation fully readable.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::crawler::storage::write_atomic;
use crate::index::database::DocumentStore;
use crate::index::error::IndexError;
use crate::index::flat;
use crate::index::snapshot::IndexSnapshot;

static STAMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a generation stamp that is unique within the process and sorts
/// by creation time across processes
pub fn new_stamp() -> String {
    format!(
        "{}-{}",
        Utc::now().format("%Y%m%d%H%M%S%f"),
        STAMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

fn is_safe_stamp(stamp: &str) -> bool {
    !stamp.is_empty() && stamp.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Persisted index location
#[derive(Debug, Clone)]
pub struct IndexStorage {
    dir: PathBuf,
    name: String,
}

impl IndexStorage {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the vector file
    pub fn index_path(&self) -> PathBuf {
        self.dir.join(format!("{}.index", self.name))
    }

    /// Path of the document store belonging to `stamp`
    pub fn store_path(&self, stamp: &str) -> PathBuf {
        self.dir.join(format!("{}.{}.db", self.name, stamp))
    }

    /// Whether a vector file exists at all
    pub async fn exists(&self) -> bool {
        fs::try_exists(self.index_path()).await.unwrap_or(false)
    }

    /// Persist `snapshot` as the current generation
    #[instrument(skip_all, fields(name = %self.name, stamp = %snapshot.header().stamp))]
    pub async fn save(&self, snapshot: &IndexSnapshot) -> Result<(), IndexError> {
        let header = snapshot.header();
        if !is_safe_stamp(&header.stamp) {
            return Err(IndexError::Corrupt(format!(
                "invalid generation stamp: {}",
                header.stamp
            )));
        }
        fs::create_dir_all(&self.dir).await?;

        let store_path = self.store_path(&header.stamp);
        if fs::try_exists(&store_path).await? {
            fs::remove_file(&store_path).await?;
        }
        {
            let store = DocumentStore::open(&store_path).await?;
            store
                .write_generation(header, snapshot.chunks(), Utc::now())
                .await?;
        }

        let bytes = flat::encode(header, &snapshot.vectors)?;
        write_atomic(&self.index_path(), &bytes).await?;
        info!(
            "Saved index generation {} with {} vectors",
            header.stamp, header.count
        );

        let removed = self.remove_superseded(&header.stamp).await;
        if removed > 0 {
            debug!("Removed {} superseded index files", removed);
        }
        Ok(())
    }

    /// Load the current generation
    ///
    /// Returns `Ok(None)` when no vector file exists. A vector file that
    /// fails any consistency check yields [`IndexError::Corrupt`].
    #[instrument(skip_all, fields(name = %self.name))]
    pub async fn load(&self) -> Result<Option<IndexSnapshot>, IndexError> {
        let bytes = match fs::read(self.index_path()).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let (header, vectors) = flat::decode(&bytes)?;
        if !is_safe_stamp(&header.stamp) {
            return Err(IndexError::Corrupt(format!(
                "invalid generation stamp: {}",
                header.stamp
            )));
        }

        let store_path = self.store_path(&header.stamp);
        if !fs::try_exists(&store_path).await? {
            return Err(IndexError::Corrupt(format!(
                "document store {} is missing",
                store_path.display()
            )));
        }

        let store = DocumentStore::open(&store_path).await?;
        let meta = store.read_meta().await?.ok_or_else(|| {
            IndexError::Corrupt("document store has no generation metadata".to_string())
        })?;
        if meta.header != header {
            return Err(IndexError::Corrupt(format!(
                "document store describes generation {} ({} vectors), vector file {} ({} vectors)",
                meta.header.stamp, meta.header.count, header.stamp, header.count
            )));
        }

        let chunks = store.load_chunks().await?;
        let snapshot = IndexSnapshot::from_parts(header, vectors, chunks)?;
        debug!(
            "Loaded index generation {} built at {}",
            meta.header.stamp, meta.built_at
        );
        Ok(Some(snapshot))
    }

    /// Delete document stores (and their side files) of other generations
    async fn remove_superseded(&self, current_stamp: &str) -> usize {
        let prefix = format!("{}.", self.name);
        let current = format!("{}.db", current_stamp);

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to list {}: {}", self.dir.display(), e);
                return 0;
            }
        };

        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(rest) = file_name.strip_prefix(&prefix) else {
                continue;
            };
            let Some((stamp, suffix)) = rest.split_once('.') else {
                continue;
            };
            if !is_safe_stamp(stamp) || !suffix.starts_with("db") || rest.starts_with(&current) {
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove {}: {}", entry.path().display(), e),
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{ChunkMetadata, ProcessedChunk};
    use tempfile::tempdir;

    fn snapshot(stamp: &str, texts: &[&str]) -> IndexSnapshot {
        let processed = texts
            .iter()
            .enumerate()
            .map(|(i, text)| ProcessedChunk {
                text: text.to_string(),
                vector: vec![i as f32, 1.0],
                metadata: ChunkMetadata {
                    source: "a.txt".to_string(),
                    position: i,
                },
            })
            .collect();
        IndexSnapshot::from_processed(stamp.to_string(), "test/2".to_string(), processed).unwrap()
    }

    fn db_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.contains(".db"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_stamps_are_unique_and_safe() {
        let a = new_stamp();
        let b = new_stamp();
        assert_ne!(a, b);
        assert!(is_safe_stamp(&a));
        assert!(!is_safe_stamp("../x"));
        assert!(!is_safe_stamp(""));
    }

    #[tokio::test]
    async fn test_missing_index_loads_as_none() {
        let temp_dir = tempdir().unwrap();
        let storage = IndexStorage::new(temp_dir.path(), "kb");
        assert!(!storage.exists().await);
        assert!(storage.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = tempdir().unwrap();
        let storage = IndexStorage::new(temp_dir.path().join("index"), "kb");
        let saved = snapshot("100-0", &["one", "two"]);

        storage.save(&saved).await.unwrap();
        assert!(storage.exists().await);

        let loaded = storage.load().await.unwrap().unwrap();
        assert_eq!(loaded, saved);
    }

    #[tokio::test]
    async fn test_save_removes_superseded_stores() {
        let temp_dir = tempdir().unwrap();
        let storage = IndexStorage::new(temp_dir.path(), "kb");

        storage.save(&snapshot("100-0", &["one"])).await.unwrap();
        storage.save(&snapshot("200-1", &["one", "two"])).await.unwrap();

        assert!(db_files(temp_dir.path()).iter().all(|name| name.starts_with("kb.200-1.db")));
        assert_eq!(storage.load().await.unwrap().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_vector_file_is_detected() {
        let temp_dir = tempdir().unwrap();
        let storage = IndexStorage::new(temp_dir.path(), "kb");
        storage.save(&snapshot("100-0", &["one"])).await.unwrap();

        let mut bytes = std::fs::read(storage.index_path()).unwrap();
        bytes.truncate(bytes.len() - 5);
        std::fs::write(storage.index_path(), bytes).unwrap();

        assert!(matches!(storage.load().await, Err(IndexError::Corrupt(_))));
    }

    #[tokio::test]
    async fn test_missing_store_is_detected() {
        let temp_dir = tempdir().unwrap();
        let storage = IndexStorage::new(temp_dir.path(), "kb");
        storage.save(&snapshot("100-0", &["one"])).await.unwrap();
        std::fs::remove_file(storage.store_path("100-0")).unwrap();

        assert!(matches!(storage.load().await, Err(IndexError::Corrupt(_))));
    }

    #[tokio::test]
    async fn test_crash_before_commit_keeps_previous_generation() {
        let temp_dir = tempdir().unwrap();
        let storage = IndexStorage::new(temp_dir.path(), "kb");
        storage.save(&snapshot("100-0", &["one"])).await.unwrap();

        // A later save that died after writing its store and a partial tmp file
        let orphan = DocumentStore::open(&storage.store_path("200-1")).await.unwrap();
        drop(orphan);
        std::fs::write(temp_dir.path().join("kb.index.tmp"), b"partial").unwrap();

        let loaded = storage.load().await.unwrap().unwrap();
        assert_eq!(loaded.header().stamp, "100-0");
    }
}
