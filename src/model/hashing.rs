//! Offline embedding model based on feature hashing
//!
//! Every lowercase word token is hashed with FNV-1a into one of `ndims`
//! buckets and added with a sign taken from the hash, so texts sharing words
//! point in similar directions. The model needs no network access and is
//! fully deterministic.

use rig::embeddings::{Embedding, EmbeddingError, EmbeddingModel};

use super::EmbeddingIdentity;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[derive(Debug, Clone)]
pub struct HashingEmbeddingModel {
    ndims: usize,
}

impl Default for HashingEmbeddingModel {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSIONS)
    }
}

impl HashingEmbeddingModel {
    pub const DEFAULT_DIMENSIONS: usize = 384;

    pub fn new(ndims: usize) -> Self {
        Self {
            ndims: ndims.max(1),
        }
    }

    /// Raw (unnormalized) feature vector of `text`
    pub fn embed(&self, text: &str) -> Vec<f64> {
        let mut vec = vec![0.0; self.ndims];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let hash = fnv1a(token.to_lowercase().as_bytes());
            let bucket = (hash % self.ndims as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vec[bucket] += sign;
        }
        vec
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

impl EmbeddingModel for HashingEmbeddingModel {
    const MAX_DOCUMENTS: usize = 256;

    fn ndims(&self) -> usize {
        self.ndims
    }

    async fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> Result<Vec<Embedding>, EmbeddingError> {
        Ok(texts
            .into_iter()
            .map(|document| Embedding {
                vec: self.embed(&document),
                document,
            })
            .collect())
    }
}

impl EmbeddingIdentity for HashingEmbeddingModel {
    fn identity(&self) -> String {
        format!("hashing-fnv1a/{}", self.ndims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::embedding::{EmbeddingConversion, dot};

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(fnv1a(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a(b"a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_embedding_is_deterministic_and_case_insensitive() {
        let model = HashingEmbeddingModel::default();
        assert_eq!(model.embed("Course Registration"), model.embed("course registration"));
        assert_eq!(model.embed("x").len(), 384);
    }

    #[tokio::test]
    async fn test_shared_words_are_closer() {
        let model = HashingEmbeddingModel::new(256);
        let embeddings = model
            .embed_texts(vec![
                "tuition fee payment deadline".to_string(),
                "when is the tuition fee deadline".to_string(),
                "cafeteria opening hours".to_string(),
            ])
            .await
            .unwrap();

        let vectors: Vec<Vec<f32>> = embeddings.iter().map(|e| e.to_normalized_vec()).collect();
        assert!(dot(&vectors[0], &vectors[1]) > dot(&vectors[0], &vectors[2]));
        assert_eq!(embeddings[2].document, "cafeteria opening hours");
    }

    #[test]
    fn test_identity_includes_dimensions() {
        assert_eq!(
            HashingEmbeddingModel::new(64).identity(),
            "hashing-fnv1a/64"
        );
    }
}
