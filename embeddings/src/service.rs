//! The embedding service: a provider wrapped with caching, validation,
//! truncation and vector helpers.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::Embedding;
use crate::cache::{CacheKey, CacheStats, EmbeddingCache};
use crate::codec;
use crate::error::{EmbeddingError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingRequest};
use crate::similarity::cosine_similarities;

/// Output of [`EmbeddingService::embed_batch`].
#[derive(Debug, Clone)]
pub struct BatchEmbedding {
    /// One embedding per valid input text, in input order.
    pub embeddings: Vec<Embedding>,

    /// Inputs dropped because they were empty or whitespace-only.
    pub dropped: usize,

    /// Inputs cut down to the token budget.
    pub truncated: usize,
}

/// Embedding generation for queries and documents.
///
/// Built once per process around a shared provider. Single-text calls go
/// through a bounded LRU cache keyed by `(text, identifier)`; batch calls
/// bypass it.
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    cache: EmbeddingCache,
    cache_enabled: bool,
}

impl EmbeddingService {
    /// Create a service with a cache of `cache_capacity` entries.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, cache_capacity: usize) -> Self {
        Self {
            provider,
            cache: EmbeddingCache::new(cache_capacity),
            cache_enabled: true,
        }
    }

    /// Turn caching of single-text embeddings on or off.
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// The underlying provider.
    pub fn provider(&self) -> &dyn EmbeddingProvider {
        self.provider.as_ref()
    }

    /// Embed a single text, using the cache.
    pub async fn embed(&self, text: &str) -> Result<Embedding> {
        self.embed_cached(text, None).await
    }

    /// Embed a single text under an external identifier.
    ///
    /// The identifier is part of the cache key, so the same text evaluated
    /// as two logical queries is tracked as two entries.
    pub async fn embed_with_identifier(&self, text: &str, identifier: &str) -> Result<Embedding> {
        self.embed_cached(text, Some(identifier)).await
    }

    /// Embed a single text without consulting or filling the cache.
    pub async fn embed_uncached(&self, text: &str) -> Result<Embedding> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let response = self
            .provider
            .embed(EmbeddingRequest::new(text))
            .await
            .inspect_err(|e| error!("Failed to embed text: {e}"))?;

        Ok(response.embedding)
    }

    async fn embed_cached(&self, text: &str, identifier: Option<&str>) -> Result<Embedding> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        if !self.cache_enabled {
            return self.embed_uncached(text).await;
        }

        let key = CacheKey::new(text, identifier);
        if let Some(embedding) = self.cache.get(&key).await {
            return Ok(embedding);
        }

        // The cache lock is not held across the provider call
        let embedding = self.embed_uncached(text).await?;
        self.cache.put(key, embedding.clone()).await;
        Ok(embedding)
    }

    /// Embed many texts in one provider call, bypassing the cache.
    ///
    /// Empty and whitespace-only texts are dropped (and counted) rather than
    /// rejected; the rest are trimmed and cut to their first `max_tokens`
    /// tokens using the provider's tokenizer.
    pub async fn embed_batch<S: AsRef<str>>(
        &self,
        texts: &[S],
        max_tokens: usize,
    ) -> Result<BatchEmbedding> {
        let valid: Vec<&str> = texts
            .iter()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .collect();

        let dropped = texts.len() - valid.len();
        if valid.is_empty() {
            return Err(EmbeddingError::EmptyBatch {
                submitted: texts.len(),
            });
        }
        if dropped > 0 {
            warn!("Dropped {dropped} empty texts from batch of {}", texts.len());
        }

        let tokenizer =
            self.provider
                .tokenizer()
                .ok_or_else(|| EmbeddingError::MissingTokenizer {
                    provider: self.provider.name().to_string(),
                })?;

        let mut truncated = 0;
        let requests: Vec<EmbeddingRequest> = valid
            .iter()
            .map(|&text| match tokenizer.truncate(text, max_tokens) {
                Some(prefix) => {
                    truncated += 1;
                    EmbeddingRequest::new(prefix)
                }
                None => EmbeddingRequest::new(text),
            })
            .collect();

        if truncated > 0 {
            warn!("Truncated {truncated} texts exceeding {max_tokens} tokens");
        }

        let count = requests.len();
        let responses = self
            .provider
            .embed_batch(requests)
            .await
            .inspect_err(|e| error!("Failed to embed batch of {count} texts: {e}"))?;

        if responses.len() != count {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {count} embeddings, got {}",
                responses.len()
            )));
        }

        debug!("Embedded batch of {count} texts");

        Ok(BatchEmbedding {
            embeddings: responses.into_iter().map(|r| r.embedding).collect(),
            dropped,
            truncated,
        })
    }

    /// Cosine similarity of a query against every document, in input order.
    pub fn similarity(&self, query: &[f32], documents: &[Embedding]) -> Result<Vec<f32>> {
        cosine_similarities(query, documents)
    }

    /// Encode a vector for storage.
    pub fn serialize(embedding: &[f32]) -> Result<String> {
        codec::serialize(embedding)
    }

    /// Decode a stored vector.
    pub fn deserialize(blob: &str) -> Result<Embedding> {
        codec::deserialize(blob)
    }

    /// Cache statistics.
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Empty the cache and reset its counters.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}
