//! In-memory index generation

use std::cmp::Ordering;

use crate::index::error::IndexError;
use crate::index::{IndexHeader, StoredChunk};
use crate::model::embedding::dot;
use crate::processor::ProcessedChunk;

/// One immutable index generation: a row-major matrix of unit vectors and
/// the chunk each row belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSnapshot {
    pub(crate) header: IndexHeader,
    pub(crate) vectors: Vec<f32>,
    pub(crate) chunks: Vec<StoredChunk>,
}

impl IndexSnapshot {
    /// Assemble a snapshot from parts, checking that they agree
    pub(crate) fn from_parts(
        header: IndexHeader,
        vectors: Vec<f32>,
        chunks: Vec<StoredChunk>,
    ) -> Result<Self, IndexError> {
        if chunks.len() != header.count {
            return Err(IndexError::Corrupt(format!(
                "{} chunks for {} vectors",
                chunks.len(),
                header.count
            )));
        }
        if vectors.len() != header.count * header.dimensions {
            return Err(IndexError::Corrupt(format!(
                "matrix holds {} values, expected {}x{}",
                vectors.len(),
                header.count,
                header.dimensions
            )));
        }
        Ok(Self {
            header,
            vectors,
            chunks,
        })
    }

    /// Build a fresh generation from embedded chunks
    pub fn from_processed(
        stamp: String,
        embedding_identity: String,
        processed: Vec<ProcessedChunk>,
    ) -> Result<Self, IndexError> {
        let dimensions = processed.first().map(|c| c.vector.len()).unwrap_or_default();
        let mut snapshot = Self {
            header: IndexHeader {
                stamp,
                dimensions,
                count: 0,
                embedding_identity,
            },
            vectors: Vec::with_capacity(processed.len() * dimensions),
            chunks: Vec::with_capacity(processed.len()),
        };
        snapshot.push_all(processed)?;
        Ok(snapshot)
    }

    /// Copy this generation under a new stamp and append more chunks
    pub fn with_appended(
        &self,
        stamp: String,
        processed: Vec<ProcessedChunk>,
    ) -> Result<Self, IndexError> {
        let mut snapshot = self.clone();
        snapshot.header.stamp = stamp;
        if snapshot.header.count == 0 {
            snapshot.header.dimensions =
                processed.first().map(|c| c.vector.len()).unwrap_or_default();
        }
        snapshot.push_all(processed)?;
        Ok(snapshot)
    }

    fn push_all(&mut self, processed: Vec<ProcessedChunk>) -> Result<(), IndexError> {
        for chunk in processed {
            if chunk.vector.len() != self.header.dimensions {
                return Err(IndexError::EmbeddingMismatch {
                    expected: format!("{} dimensions", self.header.dimensions),
                    found: format!("{} dimensions", chunk.vector.len()),
                });
            }
            self.vectors.extend_from_slice(&chunk.vector);
            self.chunks.push(StoredChunk {
                source: chunk.metadata.source,
                position: chunk.metadata.position,
                text: chunk.text,
            });
        }
        self.header.count = self.chunks.len();
        Ok(())
    }

    pub fn header(&self) -> &IndexHeader {
        &self.header
    }

    pub fn chunks(&self) -> &[StoredChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.header.count
    }

    pub fn is_empty(&self) -> bool {
        self.header.count == 0
    }

    /// Exact top-`k` by inner product, best first
    ///
    /// Equal scores keep insertion order. With a `source_filter`, only chunks
    /// whose source contains it are ranked.
    pub fn search(&self, query: &[f32], k: usize, source_filter: Option<&str>) -> Vec<(usize, f32)> {
        if k == 0 || self.header.dimensions == 0 || query.len() != self.header.dimensions {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.header.dimensions)
            .enumerate()
            .filter(|(row, _)| {
                source_filter.is_none_or(|filter| self.chunks[*row].source.contains(filter))
            })
            .map(|(row, vector)| (row, dot(query, vector)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::ChunkMetadata;

    fn processed(source: &str, position: usize, vector: Vec<f32>) -> ProcessedChunk {
        ProcessedChunk {
            text: format!("{} #{}", source, position),
            vector,
            metadata: ChunkMetadata {
                source: source.to_string(),
                position,
            },
        }
    }

    fn snapshot() -> IndexSnapshot {
        IndexSnapshot::from_processed(
            "s1".to_string(),
            "test/2".to_string(),
            vec![
                processed("a.txt", 0, vec![1.0, 0.0]),
                processed("b.txt", 0, vec![0.0, 1.0]),
                processed("pdfs/c.txt", 0, vec![0.6, 0.8]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_search_orders_by_score() {
        let hits = snapshot().search(&[0.0, 1.0], 3, None);
        let rows: Vec<usize> = hits.iter().map(|(row, _)| *row).collect();
        assert_eq!(rows, vec![1, 2, 0]);
        assert!((hits[0].1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_search_limits_and_filters() {
        let snapshot = snapshot();
        assert_eq!(snapshot.search(&[1.0, 0.0], 1, None), vec![(0, 1.0)]);
        assert!(snapshot.search(&[1.0, 0.0], 0, None).is_empty());

        let hits = snapshot.search(&[1.0, 0.0], 5, Some("pdfs/"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 2);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let snapshot = IndexSnapshot::from_processed(
            "s1".to_string(),
            "test/2".to_string(),
            vec![
                processed("a.txt", 0, vec![1.0, 0.0]),
                processed("a.txt", 1, vec![1.0, 0.0]),
                processed("a.txt", 2, vec![1.0, 0.0]),
            ],
        )
        .unwrap();
        let rows: Vec<usize> = snapshot
            .search(&[1.0, 0.0], 3, None)
            .into_iter()
            .map(|(row, _)| row)
            .collect();
        assert_eq!(rows, vec![0, 1, 2]);
    }

    #[test]
    fn test_append_is_copy_on_write() {
        let original = snapshot();
        let extended = original
            .with_appended("s2".to_string(), vec![processed("d.txt", 0, vec![1.0, 0.0])])
            .unwrap();

        assert_eq!(original.len(), 3);
        assert_eq!(original.header().stamp, "s1");
        assert_eq!(extended.len(), 4);
        assert_eq!(extended.header().stamp, "s2");
        assert_eq!(extended.chunks()[3].source, "d.txt");
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let result = snapshot().with_appended(
            "s2".to_string(),
            vec![processed("d.txt", 0, vec![1.0, 0.0, 0.0])],
        );
        assert!(matches!(
            result,
            Err(IndexError::EmbeddingMismatch { .. })
        ));
    }

    #[test]
    fn test_from_parts_checks_counts() {
        let header = IndexHeader {
            stamp: "s".to_string(),
            dimensions: 2,
            count: 2,
            embedding_identity: "test/2".to_string(),
        };
        assert!(IndexSnapshot::from_parts(header, vec![0.0; 4], Vec::new()).is_err());
    }
}
