//! Error types for the embeddings system.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur in the embeddings system.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Text was empty or whitespace-only.
    #[error("text cannot be empty")]
    EmptyInput,

    /// Every text in a batch was empty or whitespace-only.
    #[error("all {submitted} texts in the batch are empty")]
    EmptyBatch { submitted: usize },

    /// Provider cannot tokenize, so inputs cannot be truncated.
    #[error("provider `{provider}` does not expose a tokenizer for token-level truncation")]
    MissingTokenizer { provider: String },

    /// A local model or tokenizer could not be loaded.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Provider not configured.
    #[error("embedding provider not configured")]
    ProviderNotConfigured,

    /// API request failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// Invalid response from provider.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A vector component cannot be written as JSON.
    #[error("vector component {index} is not finite")]
    NonFiniteComponent { index: usize },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl EmbeddingError {
    /// Whether the error is a client input problem rather than a provider
    /// or internal failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::EmptyInput | Self::EmptyBatch { .. })
    }
}
