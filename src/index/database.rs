//! Metadata/document store for one index generation

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, params};
use tracing::{debug, instrument};

use crate::index::error::IndexError;
use crate::index::schema;
use crate::index::{IndexHeader, StoredChunk};

/// Row of the `index_meta` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreMeta {
    pub header: IndexHeader,
    pub built_at: DateTime<Utc>,
}

/// Document store backed by a local libsql database
pub struct DocumentStore {
    // Keeps the database handle alive for the connection's lifetime.
    _db: libsql::Database,
    conn: Connection,
}

impl DocumentStore {
    /// Open (or create) the store at `path` and make sure the schema exists
    #[instrument(skip(path), fields(path = %path.display()))]
    pub async fn open(path: &Path) -> Result<Self, IndexError> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| IndexError::Database(format!("Failed to open database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| IndexError::Database(format!("Failed to connect to database: {}", e)))?;

        schema::initialize_schema(&conn).await?;
        Ok(Self { _db: db, conn })
    }

    /// Write every chunk and the generation metadata in one transaction
    ///
    /// Chunk `i` is stored with id `i`, matching row `i` of the vector file.
    pub async fn write_generation(
        &self,
        header: &IndexHeader,
        chunks: &[StoredChunk],
        built_at: DateTime<Utc>,
    ) -> Result<(), IndexError> {
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| IndexError::Database(format!("Failed to begin transaction: {}", e)))?;

        tx.execute("DELETE FROM chunks", params![])
            .await
            .map_err(|e| IndexError::Database(format!("Failed to clear chunks: {}", e)))?;

        for (id, chunk) in chunks.iter().enumerate() {
            tx.execute(
                "INSERT INTO chunks (id, source, position, text) VALUES (?, ?, ?, ?)",
                params![
                    id as i64,
                    chunk.source.clone(),
                    chunk.position as i64,
                    chunk.text.clone()
                ],
            )
            .await
            .map_err(|e| IndexError::Database(format!("Failed to insert chunk {}: {}", id, e)))?;
        }

        tx.execute(
            "INSERT INTO index_meta (id, stamp, dimensions, vector_count, embedding_identity, built_at)
             VALUES (1, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
             stamp = excluded.stamp,
             dimensions = excluded.dimensions,
             vector_count = excluded.vector_count,
             embedding_identity = excluded.embedding_identity,
             built_at = excluded.built_at",
            params![
                header.stamp.clone(),
                header.dimensions as i64,
                header.count as i64,
                header.embedding_identity.clone(),
                built_at.to_rfc3339()
            ],
        )
        .await
        .map_err(|e| IndexError::Database(format!("Failed to write index metadata: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| IndexError::Database(format!("Failed to commit: {}", e)))?;

        debug!("Stored {} chunks for generation {}", chunks.len(), header.stamp);
        Ok(())
    }

    /// Read the generation metadata, if the store has any
    pub async fn read_meta(&self) -> Result<Option<StoreMeta>, IndexError> {
        let mut rows = self
            .conn
            .query(
                "SELECT stamp, dimensions, vector_count, embedding_identity, built_at
                 FROM index_meta WHERE id = 1",
                params![],
            )
            .await
            .map_err(|e| IndexError::Database(format!("Failed to query index metadata: {}", e)))?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let dimensions: i64 = row.get(1).map_err(|e| column_error("dimensions", e))?;
        let count: i64 = row.get(2).map_err(|e| column_error("vector_count", e))?;
        let built_at: String = row.get(4).map_err(|e| column_error("built_at", e))?;
        let built_at = DateTime::parse_from_rfc3339(&built_at)
            .map_err(|e| IndexError::Corrupt(format!("invalid build time {}: {}", built_at, e)))?
            .with_timezone(&Utc);

        Ok(Some(StoreMeta {
            header: IndexHeader {
                stamp: row.get(0).map_err(|e| column_error("stamp", e))?,
                dimensions: non_negative(dimensions, "dimensions")?,
                count: non_negative(count, "vector_count")?,
                embedding_identity: row.get(3).map_err(|e| column_error("embedding_identity", e))?,
            },
            built_at,
        }))
    }

    /// Load every chunk ordered by id
    pub async fn load_chunks(&self) -> Result<Vec<StoredChunk>, IndexError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, source, position, text FROM chunks ORDER BY id",
                params![],
            )
            .await
            .map_err(|e| IndexError::Database(format!("Failed to query chunks: {}", e)))?;

        let mut chunks = Vec::new();
        while let Some(row) = rows.next().await? {
            let id: i64 = row.get(0).map_err(|e| column_error("id", e))?;
            if id != chunks.len() as i64 {
                return Err(IndexError::Corrupt(format!(
                    "chunk ids are not contiguous at {}",
                    id
                )));
            }
            let position: i64 = row.get(2).map_err(|e| column_error("position", e))?;
            chunks.push(StoredChunk {
                source: row.get(1).map_err(|e| column_error("source", e))?,
                position: non_negative(position, "position")?,
                text: row.get(3).map_err(|e| column_error("text", e))?,
            });
        }

        Ok(chunks)
    }
}

fn column_error(name: &str, err: libsql::Error) -> IndexError {
    IndexError::Database(format!("Failed to get {}: {}", name, err))
}

fn non_negative(value: i64, name: &str) -> Result<usize, IndexError> {
    usize::try_from(value).map_err(|_| IndexError::Corrupt(format!("negative {}: {}", name, value)))
}
