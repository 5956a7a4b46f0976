//! Key-value record store for documents, queries and judgments.
//!
//! Each collection is an ordered map held in memory and, when the store has a
//! root directory, persisted as one JSON snapshot file. Documents iterate in
//! `doc_id` order; that order is the storage order used to break ranking ties.
//!
//! Every upsert is all-or-nothing: the records are applied in memory, the
//! snapshot is rewritten atomically (temp file + rename), and if the write
//! fails the in-memory changes are rolled back.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Result, StorageError};
use crate::records::{Document, NewDocument, Query, RelevanceJudgment};

const DOCUMENTS_FILE: &str = "documents.json";
const QUERIES_FILE: &str = "queries.json";
const JUDGMENTS_FILE: &str = "judgments.json";

/// Storage for the three corpus collections.
#[derive(Debug, Default)]
pub struct CorpusStore {
    /// Snapshot directory; `None` keeps everything in memory.
    root: Option<PathBuf>,

    documents: BTreeMap<String, Document>,
    queries: BTreeMap<String, Query>,
    judgments: BTreeMap<(String, String), RelevanceJudgment>,
}

impl CorpusStore {
    /// Open a store rooted at `root`, loading any existing snapshots.
    ///
    /// This will create the directory if it doesn't exist.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::CreateDirectory(format!("{}: {e}", root.display())))?;

        let documents: Vec<Document> = load_snapshot(&root.join(DOCUMENTS_FILE)).await?;
        let queries: Vec<Query> = load_snapshot(&root.join(QUERIES_FILE)).await?;
        let judgments: Vec<RelevanceJudgment> = load_snapshot(&root.join(JUDGMENTS_FILE)).await?;

        let store = Self {
            documents: documents
                .into_iter()
                .map(|d| (d.doc_id.clone(), d))
                .collect(),
            queries: queries
                .into_iter()
                .map(|q| (q.query_id.clone(), q))
                .collect(),
            judgments: judgments.into_iter().map(|j| (j.key(), j)).collect(),
            root: Some(root),
        };

        info!(
            "Opened corpus store: {} documents, {} queries, {} judgments",
            store.documents.len(),
            store.queries.len(),
            store.judgments.len()
        );
        Ok(store)
    }

    /// Create a store that never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Snapshot directory, if the store is persistent.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Insert or update a batch of documents as one unit.
    ///
    /// An existing document keeps its original `created_at`.
    pub async fn upsert_documents(&mut self, batch: Vec<NewDocument>) -> Result<()> {
        let now = Utc::now();
        let records: Vec<(String, Document)> = batch
            .into_iter()
            .map(|new| {
                let created_at = self
                    .documents
                    .get(&new.doc_id)
                    .map_or(now, |existing| existing.created_at);
                let document = Document {
                    doc_id: new.doc_id,
                    text: new.text,
                    embedding: new.embedding,
                    created_at,
                };
                (document.doc_id.clone(), document)
            })
            .collect();

        let count = records.len();
        let previous = apply(&mut self.documents, records);
        let persisted = self.persist(DOCUMENTS_FILE, self.documents.values()).await;
        if let Err(e) = persisted {
            revert(&mut self.documents, previous);
            return Err(e);
        }

        debug!("Upserted {count} documents");
        Ok(())
    }

    /// Insert or update queries as one unit.
    pub async fn upsert_queries(&mut self, queries: Vec<Query>) -> Result<()> {
        let records = queries
            .into_iter()
            .map(|q| (q.query_id.clone(), q))
            .collect();

        let previous = apply(&mut self.queries, records);
        let persisted = self.persist(QUERIES_FILE, self.queries.values()).await;
        if let Err(e) = persisted {
            revert(&mut self.queries, previous);
            return Err(e);
        }
        Ok(())
    }

    /// Insert or update judgments, keyed by `(query_id, doc_id)`, as one unit.
    pub async fn upsert_judgments(&mut self, judgments: Vec<RelevanceJudgment>) -> Result<()> {
        let records = judgments.into_iter().map(|j| (j.key(), j)).collect();

        let previous = apply(&mut self.judgments, records);
        let persisted = self.persist(JUDGMENTS_FILE, self.judgments.values()).await;
        if let Err(e) = persisted {
            revert(&mut self.judgments, previous);
            return Err(e);
        }
        Ok(())
    }

    /// Empty all three collections.
    pub async fn clear(&mut self) -> Result<()> {
        self.documents.clear();
        self.queries.clear();
        self.judgments.clear();

        self.persist(DOCUMENTS_FILE, self.documents.values()).await?;
        self.persist(QUERIES_FILE, self.queries.values()).await?;
        self.persist(JUDGMENTS_FILE, self.judgments.values()).await?;

        info!("Cleared corpus store");
        Ok(())
    }

    /// Get a document by id.
    pub fn document(&self, doc_id: &str) -> Option<&Document> {
        self.documents.get(doc_id)
    }

    /// All documents in lexicographic `doc_id` order, so `MED-10` comes
    /// before `MED-2`. Ranking sorts stably, which makes this the tie-break
    /// order for equal scores.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Get a query by id.
    pub fn query(&self, query_id: &str) -> Option<&Query> {
        self.queries.get(query_id)
    }

    /// Judgments recorded for one query.
    pub fn judgments_for(&self, query_id: &str) -> Vec<&RelevanceJudgment> {
        self.judgments
            .range((query_id.to_string(), String::new())..)
            .map(|(_, judgment)| judgment)
            .take_while(|judgment| judgment.query_id == query_id)
            .collect()
    }

    /// Ids of every document judged relevant to `query_id`, at any grade.
    pub fn relevant_doc_ids(&self, query_id: &str) -> Vec<&str> {
        self.judgments_for(query_id)
            .into_iter()
            .map(|j| j.doc_id.as_str())
            .collect()
    }

    /// Number of stored documents.
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Number of stored queries.
    pub fn query_count(&self) -> usize {
        self.queries.len()
    }

    /// Number of stored judgments.
    pub fn judgment_count(&self) -> usize {
        self.judgments.len()
    }

    /// Number of distinct queries with at least one judgment.
    pub fn judged_query_count(&self) -> usize {
        let mut count = 0;
        let mut last: Option<&str> = None;
        // Keys are ordered by query id first, so equal ids are adjacent
        for (query_id, _) in self.judgments.keys() {
            if last != Some(query_id.as_str()) {
                count += 1;
                last = Some(query_id.as_str());
            }
        }
        count
    }

    async fn persist<'a, T, I>(&self, file_name: &str, records: I) -> Result<()>
    where
        T: Serialize + 'a,
        I: Iterator<Item = &'a T>,
    {
        let Some(root) = &self.root else {
            return Ok(());
        };

        let path = root.join(file_name);
        let records: Vec<&T> = records.collect();
        let count = records.len();
        let content = serde_json::to_string(&records)
            .map_err(|e| StorageError::Snapshot(path.display().to_string(), e))?;

        // Write atomically using a temp file
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content)
            .await
            .map_err(|e| StorageError::WriteFile(format!("{}: {e}", temp_path.display())))?;

        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| StorageError::WriteFile(format!("{}: {e}", path.display())))?;

        debug!("Saved {count} records to {}", path.display());
        Ok(())
    }
}

/// Insert `records`, returning what each key held before.
fn apply<K: Ord + Clone, V>(map: &mut BTreeMap<K, V>, records: Vec<(K, V)>) -> Vec<(K, Option<V>)> {
    records
        .into_iter()
        .map(|(key, value)| {
            let old = map.insert(key.clone(), value);
            (key, old)
        })
        .collect()
}

/// Undo [`apply`]. Reverse order restores keys that appeared twice.
fn revert<K: Ord, V>(map: &mut BTreeMap<K, V>, previous: Vec<(K, Option<V>)>) {
    for (key, old) in previous.into_iter().rev() {
        match old {
            Some(value) => {
                map.insert(key, value);
            }
            None => {
                map.remove(&key);
            }
        }
    }
}

async fn load_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| StorageError::ReadFile(format!("{}: {e}", path.display())))?;

    let records = serde_json::from_str(&content)
        .map_err(|e| StorageError::Snapshot(path.display().to_string(), e))?;
    Ok(records)
}
