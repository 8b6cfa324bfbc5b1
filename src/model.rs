//! # Embedding Model Module
//!
//! This module provides the embedding functions the indexer can be built with,
//! all exposed through rig's `EmbeddingModel` trait.
//!
//! ## Key Components
//!
//! - `HashingEmbeddingModel`: Deterministic offline model based on feature hashing
//! - `RateLimitedEmbeddingModel`: A wrapper that adds rate limiting to any embedding model
//! - `Embedder`: The model selected from configuration
//! - `EmbeddingIdentity`: Stable name of a model, persisted with every index
//! - `EmbeddingConversion`: Utilities for converting embeddings into stored vectors

use std::num::NonZeroU32;

use rig::embeddings::{Embedding, EmbeddingError, EmbeddingModel};
use rig::providers::gemini;
use serde::{Deserialize, Serialize};

pub mod embedding;
pub mod hashing;
pub mod ratelimited_embedding;

pub use embedding::EmbeddingConversion;
pub use hashing::HashingEmbeddingModel;
pub use ratelimited_embedding::RateLimitedEmbeddingModel;

use crate::config::EmbeddingSettings;
use crate::error::{Error, Result};

/// Stable name of an embedding function
///
/// Vectors from models with different identities live in different spaces;
/// an index built with one identity must never be queried with another.
pub trait EmbeddingIdentity {
    fn identity(&self) -> String;
}

/// Embedding backends selectable from configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Offline feature hashing
    #[default]
    Hashing,

    /// Google Gemini embedding API
    Gemini,
}

/// Embedding model chosen at runtime
#[derive(Debug, Clone)]
pub enum Embedder {
    Hashing(HashingEmbeddingModel),
    Gemini(RateLimitedEmbeddingModel<gemini::embedding::EmbeddingModel>),
}

impl Embedder {
    /// Build the configured model
    ///
    /// The Gemini provider reads its key from `GEMINI_API_KEY`.
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        match settings.provider {
            EmbeddingProvider::Hashing => Ok(Self::Hashing(HashingEmbeddingModel::new(
                settings.dimensions,
            ))),
            EmbeddingProvider::Gemini => {
                let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
                    Error::Config("GEMINI_API_KEY environment variable must be set".to_string())
                })?;
                let requests_per_minute =
                    NonZeroU32::new(settings.requests_per_minute).ok_or_else(|| {
                        Error::Config("requests_per_minute must be greater than zero".to_string())
                    })?;

                let client = gemini::Client::new(&api_key);
                Ok(Self::Gemini(RateLimitedEmbeddingModel::per_minute(
                    client.embedding_model(&settings.model),
                    requests_per_minute,
                    format!("gemini/{}", settings.model),
                )))
            }
        }
    }
}

impl EmbeddingModel for Embedder {
    // Gemini accepts at most 100 texts per batch request.
    const MAX_DOCUMENTS: usize = 100;

    fn ndims(&self) -> usize {
        match self {
            Self::Hashing(model) => model.ndims(),
            Self::Gemini(model) => model.ndims(),
        }
    }

    async fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> std::result::Result<Vec<Embedding>, EmbeddingError> {
        match self {
            Self::Hashing(model) => model.embed_texts(texts).await,
            Self::Gemini(model) => model.embed_texts(texts).await,
        }
    }
}

impl EmbeddingIdentity for Embedder {
    fn identity(&self) -> String {
        match self {
            Self::Hashing(model) => model.identity(),
            Self::Gemini(model) => model.identity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashing_embedder_from_settings() {
        let settings = EmbeddingSettings {
            provider: EmbeddingProvider::Hashing,
            dimensions: 128,
            ..Default::default()
        };
        let embedder = Embedder::from_settings(&settings).unwrap();
        assert_eq!(embedder.ndims(), 128);
        assert_eq!(embedder.identity(), "hashing-fnv1a/128");
    }

    #[test]
    fn test_provider_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            provider: EmbeddingProvider,
        }

        let wrapper: Wrapper = toml::from_str("provider = \"gemini\"").unwrap();
        assert_eq!(wrapper.provider, EmbeddingProvider::Gemini);
        assert!(toml::from_str::<Wrapper>("provider = \"openai\"").is_err());
    }

    #[tokio::test]
    async fn test_embedder_delegates() {
        let embedder = Embedder::Hashing(HashingEmbeddingModel::new(16));
        let embeddings = embedder
            .embed_texts(vec!["a b".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].vec.len(), 16);
    }
}
