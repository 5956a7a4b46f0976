//! Corpus ingestion: parse the dataset files, embed documents in batches and
//! upsert everything into the store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use semsearch_embeddings::{DEFAULT_MAX_TOKENS, EmbeddingError, EmbeddingService};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::error::{CorpusError, Result};
use crate::parse::{self, RawDocument};
use crate::records::NewDocument;
use crate::store::CorpusStore;

/// Default documents file name.
pub const DEFAULT_DOCUMENTS_FILE: &str = "train.docs";

/// Default queries file name.
pub const DEFAULT_QUERIES_FILE: &str = "train.titles.queries";

/// Default relevance judgments file name.
pub const DEFAULT_JUDGMENTS_FILE: &str = "train.3-2-1.qrel";

/// Default number of documents embedded per provider call.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Options for one ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOptions {
    /// Directory holding the three corpus files.
    pub dataset_dir: PathBuf,
    pub documents_file: String,
    pub queries_file: String,
    pub judgments_file: String,

    /// Documents per embedding call.
    pub batch_size: usize,

    /// Token limit applied to each document before embedding.
    pub max_tokens: usize,

    /// Empty all collections before loading.
    pub clear: bool,
}

impl IngestOptions {
    /// Options for `dataset_dir` with the default file names and limits.
    pub fn new(dataset_dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset_dir: dataset_dir.into(),
            ..Self::default()
        }
    }

    fn documents_path(&self) -> PathBuf {
        self.dataset_dir.join(&self.documents_file)
    }

    fn queries_path(&self) -> PathBuf {
        self.dataset_dir.join(&self.queries_file)
    }

    fn judgments_path(&self) -> PathBuf {
        self.dataset_dir.join(&self.judgments_file)
    }
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("./data"),
            documents_file: DEFAULT_DOCUMENTS_FILE.to_string(),
            queries_file: DEFAULT_QUERIES_FILE.to_string(),
            judgments_file: DEFAULT_JUDGMENTS_FILE.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_tokens: DEFAULT_MAX_TOKENS,
            clear: false,
        }
    }
}

/// Summary of a completed ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub documents_indexed: usize,
    pub queries_loaded: usize,
    pub judgments_loaded: usize,
    pub documents_skipped: usize,
    pub queries_skipped: usize,
    pub judgments_skipped: usize,
    pub batches: usize,
    pub truncated: usize,
}

/// Loads a dataset into a [`CorpusStore`].
pub struct Ingestor {
    embeddings: Arc<EmbeddingService>,
    store: Arc<RwLock<CorpusStore>>,
}

impl Ingestor {
    pub fn new(embeddings: Arc<EmbeddingService>, store: Arc<RwLock<CorpusStore>>) -> Self {
        Self { embeddings, store }
    }

    /// Run the full pipeline: documents, then queries, then judgments.
    ///
    /// A failed document batch aborts the run; batches committed before it
    /// stay in the store.
    pub async fn run(&self, options: &IngestOptions) -> Result<IngestReport> {
        let dataset_dir = options.dataset_dir.as_path();
        if !fs::try_exists(dataset_dir).await.unwrap_or(false) {
            return Err(CorpusError::MissingFile {
                path: dataset_dir.to_path_buf(),
            });
        }

        info!("Ingesting dataset from {}", dataset_dir.display());

        if options.clear {
            self.store.write().await.clear().await?;
            info!("Cleared existing corpus");
        }

        let mut report = IngestReport::default();
        self.ingest_documents(options, &mut report).await?;
        self.ingest_queries(options, &mut report).await?;
        self.ingest_judgments(options, &mut report).await?;

        let store = self.store.read().await;
        info!(
            "Ingestion complete: {} documents indexed, {} queries, {} judgments (store at {}: {} documents, {} queries, {} judgments)",
            report.documents_indexed,
            report.queries_loaded,
            report.judgments_loaded,
            store
                .root()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "memory".to_string()),
            store.document_count(),
            store.query_count(),
            store.judgment_count(),
        );

        Ok(report)
    }

    async fn ingest_documents(
        &self,
        options: &IngestOptions,
        report: &mut IngestReport,
    ) -> Result<()> {
        let path = options.documents_path();
        let content = parse::read_corpus_file(&path).await?;
        let parsed = parse::parse_documents(&content, &display_name(&path));
        report.documents_skipped = parsed.skipped;

        let batch_size = options.batch_size.max(1);
        let total = parsed.records.len().div_ceil(batch_size);
        info!(
            "Embedding {} documents in {total} batches of up to {batch_size}",
            parsed.records.len()
        );

        for (index, chunk) in parsed.records.chunks(batch_size).enumerate() {
            let batch = index + 1;
            let truncated = self
                .ingest_batch(chunk, options.max_tokens)
                .await
                .map_err(|e| {
                    let first = chunk.first().map(|d| d.doc_id.as_str()).unwrap_or("");
                    let last = chunk.last().map(|d| d.doc_id.as_str()).unwrap_or("");
                    error!("Batch {batch}/{total} ({first}..{last}) failed: {e}");
                    CorpusError::Batch {
                        batch,
                        total,
                        source: Box::new(e),
                    }
                })?;

            report.documents_indexed += chunk.len();
            report.truncated += truncated;
            report.batches += 1;
            info!(
                "Processed batch {batch}/{total} ({}%)",
                batch * 100 / total
            );
        }

        Ok(())
    }

    /// Embed and upsert one batch. Returns how many texts were truncated.
    async fn ingest_batch(&self, chunk: &[RawDocument], max_tokens: usize) -> Result<usize> {
        let texts: Vec<&str> = chunk.iter().map(|d| d.text.as_str()).collect();
        let embedded = self.embeddings.embed_batch(&texts, max_tokens).await?;

        if embedded.embeddings.len() != chunk.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                chunk.len(),
                embedded.embeddings.len()
            ))
            .into());
        }

        let documents = chunk
            .iter()
            .zip(&embedded.embeddings)
            .map(|(doc, embedding)| -> Result<NewDocument> {
                Ok(NewDocument {
                    doc_id: doc.doc_id.clone(),
                    text: doc.text.clone(),
                    embedding: EmbeddingService::serialize(embedding)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.store.write().await.upsert_documents(documents).await?;
        debug!("Upserted {} documents", chunk.len());

        Ok(embedded.truncated)
    }

    async fn ingest_queries(&self, options: &IngestOptions, report: &mut IngestReport) -> Result<()> {
        let path = options.queries_path();
        let content = parse::read_corpus_file(&path).await?;
        let parsed = parse::parse_queries(&content, &display_name(&path));

        report.queries_loaded = parsed.records.len();
        report.queries_skipped = parsed.skipped;

        self.store.write().await.upsert_queries(parsed.records).await?;
        info!("Loaded {} queries", report.queries_loaded);
        Ok(())
    }

    async fn ingest_judgments(
        &self,
        options: &IngestOptions,
        report: &mut IngestReport,
    ) -> Result<()> {
        let path = options.judgments_path();
        let content = parse::read_corpus_file(&path).await?;
        let parsed = parse::parse_judgments(&content, &display_name(&path));

        report.judgments_loaded = parsed.records.len();
        report.judgments_skipped = parsed.skipped;

        self.store
            .write()
            .await
            .upsert_judgments(parsed.records)
            .await?;
        info!("Loaded {} relevance judgments", report.judgments_loaded);
        Ok(())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
