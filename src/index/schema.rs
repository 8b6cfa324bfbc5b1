//! # Document Store Schema Module
//!
//! This module defines the schema of the metadata/document store that sits
//! next to every persisted vector file.
//!
//! ## Schema Design
//!
//! 1. `chunks` - one row per vector; `id` is the row of the vector in the
//!    vector file, so the two artifacts join by position
//! 2. `index_meta` - a single row describing the generation the store belongs
//!    to, checked against the vector file header on load

use crate::index::error::IndexError;
use libsql::{Connection, params};

/// Initialize the database schema
pub async fn initialize_schema(conn: &Connection) -> Result<(), IndexError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS chunks (
            id INTEGER PRIMARY KEY,
            source TEXT NOT NULL,
            position INTEGER NOT NULL,
            text TEXT NOT NULL
        )",
        params![],
    )
    .await
    .map_err(|e| IndexError::Database(format!("Failed to create chunks table: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source)",
        params![],
    )
    .await
    .map_err(|e| IndexError::Database(format!("Failed to create index on chunks: {}", e)))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS index_meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            stamp TEXT NOT NULL,
            dimensions INTEGER NOT NULL,
            vector_count INTEGER NOT NULL,
            embedding_identity TEXT NOT NULL,
            built_at TEXT NOT NULL
        )",
        params![],
    )
    .await
    .map_err(|e| IndexError::Database(format!("Failed to create index_meta table: {}", e)))?;

    Ok(())
}
