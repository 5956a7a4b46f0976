//! Records held by the corpus store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A document in the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier (e.g. `MED-1`).
    pub doc_id: String,

    /// Full text content.
    pub text: String,

    /// Embedding of `text`, in its serialized textual form.
    pub embedding: String,

    /// When the document was first indexed.
    pub created_at: DateTime<Utc>,
}

/// A document ready to be upserted: the store assigns `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub doc_id: String,
    pub text: String,
    pub embedding: String,
}

/// A reference query from the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Unique identifier (e.g. `PLAIN-831`).
    pub query_id: String,

    /// Text of the query.
    pub query_text: String,
}

/// A ground-truth judgment that a document is relevant to a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceJudgment {
    pub query_id: String,
    pub doc_id: String,

    /// Relevance grade (typically 1, 2 or 3).
    pub relevance_score: i32,
}

impl RelevanceJudgment {
    /// The `(query_id, doc_id)` pair the store keys judgments by.
    pub fn key(&self) -> (String, String) {
        (self.query_id.clone(), self.doc_id.clone())
    }
}
