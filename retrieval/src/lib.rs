//! # Retrieval Engine
//!
//! Ranks the indexed corpus against free-text queries and scores rankings
//! against ground-truth relevance judgments.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Search Engine                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  query text ──► EmbeddingService (cache) ──► query vector       │
//! │                                                 │               │
//! │  CorpusStore ──► document vectors ──────────────┤               │
//! │                                                 ▼               │
//! │                                   cosine scores, stable sort    │
//! │                                                 │               │
//! │                                                 ▼               │
//! │  relevance judgments ──────────────────► Precision@5            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use semsearch_retrieval::{RetrievalConfig, SearchEngine};
//!
//! let config = RetrievalConfig::load("semsearch.toml").await?;
//! let engine = SearchEngine::open(&config).await?;
//!
//! let evaluation = engine
//!     .search_and_evaluate("heart disease", "PLAIN-1", config.query.top_k)
//!     .await?;
//! println!("P@5 = {}", evaluation.precision_at_5);
//! ```

pub mod config;
pub mod engine;
pub mod error;

pub use config::{
    EmbeddingConfig, EmbeddingProviderType, IngestConfig, QueryConfig, RetrievalConfig,
    ServerConfig,
};
pub use engine::{Evaluation, IndexStatus, PRECISION_CUTOFF, SearchEngine, SearchResults};
pub use error::{Result, RetrievalError};

// Re-export from dependencies for convenience
pub use semsearch_corpus::{CorpusStore, IngestOptions, IngestReport, Ingestor};
pub use semsearch_embeddings::{CacheStats, EmbeddingProvider, EmbeddingService};
