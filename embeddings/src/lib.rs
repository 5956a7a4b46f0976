//! # Embeddings
//!
//! This crate turns text into dense vectors and compares them for the
//! semsearch retrieval service.
//!
//! ## Features
//!
//! - **Embedding Generation**: Convert text to dense vectors through a pluggable provider
//! - **Caching**: Bounded LRU cache keyed by text and an optional query identifier
//! - **Truncation**: Token-level truncation of over-long inputs before batch embedding
//! - **Similarity**: Cosine similarity between a query and many documents
//! - **Storage Codec**: Exact textual encoding of vectors for persistence
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Embedding Service                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedding ──► codec (JSON text)          │
//! │       │                    │                                    │
//! │       ▼                    ▼                                    │
//! │  Tokenizer           EmbeddingCache (LRU)    similarity         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod codec;
pub mod error;
pub mod local;
pub mod provider;
pub mod service;
pub mod similarity;
pub mod tokenizer;

pub use cache::{CacheKey, CacheStats, EmbeddingCache};
pub use codec::{deserialize, serialize};
pub use error::{EmbeddingError, Result};
pub use local::FastEmbedProvider;
pub use provider::{
    EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, HashingProvider, OpenAIProvider,
};
pub use service::{BatchEmbedding, EmbeddingService};
pub use similarity::cosine_similarity;
pub use tokenizer::{BpeTokenizer, HubTokenizer, Tokenizer, WordTokenizer};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Default output dimension of the hashing provider.
pub const DEFAULT_DIMENSION: usize = 384; // all-MiniLM-L6-v2 sized

/// Default number of cached single-text embeddings.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Default token budget per text for batch embedding.
pub const DEFAULT_MAX_TOKENS: usize = 512;
