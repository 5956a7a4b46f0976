//! # Corpus
//!
//! Records, storage and ingestion for the searchable corpus.
//!
//! - **Records**: documents with their serialized embeddings, reference
//!   queries, and graded relevance judgments (qrels)
//! - **Store**: three keyed collections held in memory and persisted as
//!   JSON snapshots, with all-or-nothing upserts
//! - **Parsing**: tab-separated corpus files, skipping malformed lines
//! - **Ingestion**: parse, batch-embed and upsert a whole dataset
//!
//! ## Usage
//!
//! ```rust,ignore
//! use semsearch_corpus::{CorpusStore, IngestOptions, Ingestor};
//!
//! let store = Arc::new(RwLock::new(CorpusStore::open("data/store").await?));
//! let report = Ingestor::new(embeddings, store)
//!     .run(&IngestOptions::new("data"))
//!     .await?;
//! ```

pub mod error;
pub mod ingest;
pub mod parse;
pub mod records;
pub mod store;

pub use error::{CorpusError, Result, StorageError};
pub use ingest::{IngestOptions, IngestReport, Ingestor};
pub use parse::ParsedLines;
pub use records::{Document, NewDocument, Query, RelevanceJudgment};
pub use store::CorpusStore;
