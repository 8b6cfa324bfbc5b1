use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use rig::embeddings::{Embedding, EmbeddingError, EmbeddingModel};
use tracing::{Instrument, debug_span, info_span};

use super::EmbeddingIdentity;

/// Embedding model whose batch requests share one request budget
///
/// Clones share the limiter, so concurrent embedding workers never exceed
/// the quota together.
#[derive(Clone)]
pub struct RateLimitedEmbeddingModel<M: EmbeddingModel> {
    model: M,
    limiter: Arc<DefaultDirectRateLimiter>,
    identity: String,
}

impl<M> RateLimitedEmbeddingModel<M>
where
    M: EmbeddingModel,
{
    /// Wrap `model`, naming it `identity` in persisted indexes
    pub fn new(model: M, limiter: DefaultDirectRateLimiter, identity: impl Into<String>) -> Self {
        Self {
            model,
            limiter: Arc::new(limiter),
            identity: identity.into(),
        }
    }

    /// Allow at most `requests` batch requests per minute
    pub fn per_minute(model: M, requests: NonZeroU32, identity: impl Into<String>) -> Self {
        Self::new(model, RateLimiter::direct(Quota::per_minute(requests)), identity)
    }
}

impl<M: EmbeddingModel> EmbeddingModel for RateLimitedEmbeddingModel<M> {
    const MAX_DOCUMENTS: usize = M::MAX_DOCUMENTS;

    fn ndims(&self) -> usize {
        self.model.ndims()
    }

    async fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> Result<Vec<Embedding>, EmbeddingError> {
        let texts: Vec<String> = texts.into_iter().collect();
        let batch_size = texts.len();
        self.limiter
            .until_ready()
            .instrument(debug_span!("embedding_quota"))
            .await;
        self.model
            .embed_texts(texts)
            .instrument(info_span!("embed_batch", model = %self.identity, batch_size))
            .await
    }
}

impl<M: EmbeddingModel> EmbeddingIdentity for RateLimitedEmbeddingModel<M> {
    fn identity(&self) -> String {
        self.identity.clone()
    }
}

impl<M: EmbeddingModel> std::fmt::Debug for RateLimitedEmbeddingModel<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedEmbeddingModel")
            .field("identity", &self.identity)
            .finish()
    }
}
