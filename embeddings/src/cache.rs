//! Bounded LRU cache for single-text embeddings.

use std::num::NonZeroUsize;

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::Embedding;

/// Cache key: the embedded text plus an optional external identifier.
///
/// The same text under two identifiers occupies two slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// The text that was embedded.
    pub text: String,

    /// External identifier, such as a query id.
    pub identifier: Option<String>,
}

impl CacheKey {
    /// Create a new cache key.
    pub fn new(text: impl Into<String>, identifier: Option<&str>) -> Self {
        Self {
            text: text.into(),
            identifier: identifier.map(str::to_string),
        }
    }
}

struct CacheState {
    entries: LruCache<CacheKey, Embedding>,
    hits: u64,
    misses: u64,
}

/// Cache for embeddings to avoid redundant provider calls.
///
/// Entries and counters share one lock, so concurrent lookups and inserts
/// always observe a consistent state.
pub struct EmbeddingCache {
    state: Mutex<CacheState>,
    capacity: NonZeroUsize,
}

impl EmbeddingCache {
    /// Create a new cache holding at most `max_entries` embeddings.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::MIN.saturating_add(max_entries.saturating_sub(1));
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
            }),
            capacity,
        }
    }

    /// Look up an embedding, counting a hit or a miss.
    ///
    /// A hit marks the entry as most recently used.
    pub async fn get(&self, key: &CacheKey) -> Option<Embedding> {
        let mut state = self.state.lock().await;
        let cached = state.entries.get(key).cloned();
        match cached {
            Some(embedding) => {
                state.hits += 1;
                debug!("Cache hit for embedding");
                Some(embedding)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    /// Put an embedding in the cache, evicting the least recently used entry
    /// when full.
    pub async fn put(&self, key: CacheKey, embedding: Embedding) {
        let mut state = self.state.lock().await;
        if let Some((evicted, _)) = state.entries.push(key, embedding) {
            // `push` also hands back the old value when the key was present
            if state.entries.peek(&evicted).is_none() {
                debug!("Evicted least recently used embedding");
            }
        }
    }

    /// Check if an embedding is cached without touching recency or counters.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.state.lock().await.entries.contains(key)
    }

    /// Clear the entire cache and reset the counters.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.entries.clear();
        state.hits = 0;
        state.misses = 0;
        info!("Embedding cache cleared");
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let state = self.state.lock().await;
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            size: state.entries.len(),
            capacity: self.capacity.get(),
        }
    }
}

/// Statistics about the embedding cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,

    /// Lookups that had to call the provider.
    pub misses: u64,

    /// Number of entries in cache.
    pub size: usize,

    /// Maximum cache size.
    pub capacity: usize,
}

impl CacheStats {
    /// Fraction of lookups that were hits; 0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }
        self.hits as f64 / lookups as f64
    }
}
