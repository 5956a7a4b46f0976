//! Error types for the corpus crate.

use std::path::PathBuf;

use semsearch_embeddings::EmbeddingError;
use thiserror::Error;

/// Result type alias for corpus operations.
pub type Result<T> = std::result::Result<T, CorpusError>;

/// Errors that can occur while storing or ingesting the corpus.
#[derive(Error, Debug)]
pub enum CorpusError {
    /// A dataset directory or corpus file does not exist.
    #[error("file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Embedding generation failed.
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// A document batch failed; earlier batches stay committed.
    #[error("batch {batch}/{total} failed: {source}")]
    Batch {
        batch: usize,
        total: usize,
        #[source]
        source: Box<CorpusError>,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create storage directory.
    #[error("failed to create directory: {0}")]
    CreateDirectory(String),

    /// Failed to read a collection snapshot.
    #[error("failed to read file: {0}")]
    ReadFile(String),

    /// Failed to write a collection snapshot.
    #[error("failed to write file: {0}")]
    WriteFile(String),

    /// A snapshot could not be encoded or decoded.
    #[error("invalid snapshot {0}: {1}")]
    Snapshot(String, serde_json::Error),
}
