//! Error types for the retrieval engine.

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur in the retrieval engine.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(#[from] semsearch_embeddings::EmbeddingError),

    /// Corpus store or ingestion error.
    #[error("corpus error: {0}")]
    Corpus(#[from] semsearch_corpus::CorpusError),

    /// No documents have been indexed yet.
    #[error("no documents indexed")]
    EmptyCorpus,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RetrievalError {
    /// Whether the error was caused by the caller's input rather than by
    /// the service.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::Embedding(e) if e.is_invalid_input())
    }
}
