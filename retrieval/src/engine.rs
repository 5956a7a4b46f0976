//! Ranking and evaluation over the indexed corpus.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use semsearch_corpus::CorpusStore;
use semsearch_embeddings::similarity::top_k_indices;
use semsearch_embeddings::{CacheStats, Embedding, EmbeddingService};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::RetrievalConfig;
use crate::error::{Result, RetrievalError};

/// Rank cutoff at which queries are evaluated.
pub const PRECISION_CUTOFF: usize = 5;

/// Ranked documents for one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    /// Document ids, best match first.
    pub ranked_ids: Vec<String>,

    /// Score of each returned document.
    pub scores: HashMap<String, f32>,

    /// Number of documents that were scored.
    pub total_documents: usize,
}

/// Ranked documents for a judged query, with their precision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub ranked_ids: Vec<String>,

    /// Precision at [`PRECISION_CUTOFF`], rounded to 3 decimals.
    pub precision_at_5: f64,

    pub scores: HashMap<String, f32>,
    pub total_documents: usize,
}

/// Collection counts reported by the status endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStatus {
    pub indexed_documents: usize,

    /// Distinct queries with at least one relevance judgment.
    pub judged_queries: usize,
}

/// Brute-force cosine search engine over a [`CorpusStore`].
///
/// Every query is scored against every stored document; the store is only
/// read here and is populated by the ingestion pipeline.
pub struct SearchEngine {
    embeddings: Arc<EmbeddingService>,
    store: Arc<RwLock<CorpusStore>>,
}

impl SearchEngine {
    pub fn new(embeddings: Arc<EmbeddingService>, store: Arc<RwLock<CorpusStore>>) -> Self {
        Self { embeddings, store }
    }

    /// Build the provider, service and store described by `config`.
    pub async fn open(config: &RetrievalConfig) -> Result<Self> {
        info!("Opening search engine at {}", config.data_dir.display());

        let embeddings = Arc::new(config.embedding.build_service().await?);
        let store = CorpusStore::open(&config.data_dir).await?;

        info!(
            "Search engine ready: {} documents, provider {} ({})",
            store.document_count(),
            embeddings.provider().name(),
            embeddings.provider().default_model(),
        );

        Ok(Self::new(embeddings, Arc::new(RwLock::new(store))))
    }

    /// The shared embedding service.
    pub fn embeddings(&self) -> &Arc<EmbeddingService> {
        &self.embeddings
    }

    /// The shared record store.
    pub fn store(&self) -> &Arc<RwLock<CorpusStore>> {
        &self.store
    }

    /// Rank all documents against `query_text` and keep the best `top_k`.
    ///
    /// With a query id the query embedding is cached under that id;
    /// without one it is computed fresh. Documents with equal scores keep
    /// their storage order.
    pub async fn search(
        &self,
        query_text: &str,
        query_id: Option<&str>,
        top_k: usize,
    ) -> Result<SearchResults> {
        let query_embedding = match query_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => self.embeddings.embed_with_identifier(query_text, id).await?,
            None => self.embeddings.embed_uncached(query_text).await?,
        };

        let (doc_ids, vectors) = self.load_vectors().await?;
        let total_documents = doc_ids.len();
        if total_documents == 0 {
            debug!("No documents indexed; returning empty results");
            return Ok(SearchResults::default());
        }

        let scores = self.embeddings.similarity(&query_embedding, &vectors)?;

        let mut results = SearchResults {
            total_documents,
            ..SearchResults::default()
        };
        for index in top_k_indices(&scores, top_k) {
            results.scores.insert(doc_ids[index].clone(), scores[index]);
            results.ranked_ids.push(doc_ids[index].clone());
        }

        debug!(
            "Ranked {total_documents} documents, returning {}",
            results.ranked_ids.len()
        );
        Ok(results)
    }

    /// Fraction of the first `k` ranked ids that are judged relevant to
    /// `query_id`.
    ///
    /// The denominator is always `k`, even when fewer ids were ranked.
    /// Returns 0.0 for a blank query id, an unjudged query, or `k == 0`.
    pub async fn precision_at_k(&self, query_id: &str, ranked_ids: &[String], k: usize) -> f64 {
        let query_id = query_id.trim();
        if k == 0 || query_id.is_empty() {
            return 0.0;
        }

        let store = self.store.read().await;
        let relevant: HashSet<&str> = store.relevant_doc_ids(query_id).into_iter().collect();
        if relevant.is_empty() {
            debug!("No relevance judgments for query {query_id}");
            return 0.0;
        }

        let hits = ranked_ids
            .iter()
            .take(k)
            .filter(|id| relevant.contains(id.as_str()))
            .count();

        hits as f64 / k as f64
    }

    /// Search for a judged query and score the ranking at
    /// [`PRECISION_CUTOFF`], whatever `top_k` is.
    pub async fn search_and_evaluate(
        &self,
        query_text: &str,
        query_id: &str,
        top_k: usize,
    ) -> Result<Evaluation> {
        let results = self.search(query_text, Some(query_id), top_k).await?;
        let precision = self
            .precision_at_k(query_id, &results.ranked_ids, PRECISION_CUTOFF)
            .await;

        info!(
            "Query {query_id}: {} results, P@{PRECISION_CUTOFF} = {precision:.3}",
            results.ranked_ids.len()
        );

        Ok(Evaluation {
            ranked_ids: results.ranked_ids,
            precision_at_5: round3(precision),
            scores: results.scores,
            total_documents: results.total_documents,
        })
    }

    /// Fail with [`RetrievalError::EmptyCorpus`] when nothing is indexed.
    pub async fn ensure_indexed(&self) -> Result<()> {
        if self.store.read().await.document_count() == 0 {
            return Err(RetrievalError::EmptyCorpus);
        }
        Ok(())
    }

    /// Ids of documents judged relevant to `query_id`.
    pub async fn relevant_doc_ids(&self, query_id: &str) -> Vec<String> {
        self.store
            .read()
            .await
            .relevant_doc_ids(query_id)
            .into_iter()
            .map(String::from)
            .collect()
    }

    pub async fn status(&self) -> IndexStatus {
        let store = self.store.read().await;
        IndexStatus {
            indexed_documents: store.document_count(),
            judged_queries: store.judged_query_count(),
        }
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.embeddings.cache_stats().await
    }

    pub async fn clear_cache(&self) {
        self.embeddings.clear_cache().await;
    }

    /// Every stored document id with its decoded embedding, in storage order.
    async fn load_vectors(&self) -> Result<(Vec<String>, Vec<Embedding>)> {
        let store = self.store.read().await;
        let mut doc_ids = Vec::with_capacity(store.document_count());
        let mut vectors = Vec::with_capacity(store.document_count());

        for document in store.documents() {
            doc_ids.push(document.doc_id.clone());
            vectors.push(EmbeddingService::deserialize(&document.embedding)?);
        }

        Ok((doc_ids, vectors))
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use semsearch_corpus::{NewDocument, RelevanceJudgment};
    use semsearch_embeddings::HashingProvider;

    async fn engine_with(docs: &[(&str, &str)], judgments: &[(&str, &str, i32)]) -> SearchEngine {
        let provider = Arc::new(HashingProvider::new(64));
        let embeddings = Arc::new(EmbeddingService::new(provider, 32));

        let mut store = CorpusStore::in_memory();
        let mut batch = Vec::new();
        for (doc_id, text) in docs {
            let embedding = embeddings.embed_uncached(text).await.unwrap();
            batch.push(NewDocument {
                doc_id: (*doc_id).to_string(),
                text: (*text).to_string(),
                embedding: EmbeddingService::serialize(&embedding).unwrap(),
            });
        }
        store.upsert_documents(batch).await.unwrap();
        store
            .upsert_judgments(
                judgments
                    .iter()
                    .map(|(query_id, doc_id, score)| RelevanceJudgment {
                        query_id: (*query_id).to_string(),
                        doc_id: (*doc_id).to_string(),
                        relevance_score: *score,
                    })
                    .collect(),
            )
            .await
            .unwrap();

        SearchEngine::new(embeddings, Arc::new(RwLock::new(store)))
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[tokio::test]
    async fn test_precision_at_5() {
        let engine = engine_with(&[], &[("PLAIN-1", "MED-1", 2), ("PLAIN-1", "MED-2", 1)]).await;
        let ranked = ids(&["MED-1", "MED-3", "MED-2", "MED-4", "MED-5"]);

        assert_eq!(engine.precision_at_k("PLAIN-1", &ranked, 5).await, 0.4);
    }

    #[tokio::test]
    async fn test_precision_denominator_is_k() {
        let engine = engine_with(&[], &[("PLAIN-1", "MED-1", 2)]).await;
        assert_eq!(
            engine.precision_at_k("PLAIN-1", &ids(&["MED-1"]), 5).await,
            0.2
        );
    }

    #[tokio::test]
    async fn test_precision_degenerate_inputs() {
        let engine = engine_with(&[], &[("PLAIN-1", "MED-1", 2)]).await;
        let ranked = ids(&["MED-1"]);

        assert_eq!(engine.precision_at_k("PLAIN-9", &ranked, 5).await, 0.0);
        assert_eq!(engine.precision_at_k("   ", &ranked, 5).await, 0.0);
        assert_eq!(engine.precision_at_k("PLAIN-1", &ranked, 0).await, 0.0);
    }

    #[tokio::test]
    async fn test_search_ranks_best_match_first() {
        let engine = engine_with(
            &[
                ("MED-1", "vitamin d and bone density"),
                ("MED-2", "heart disease and blood pressure"),
                ("MED-3", "cancer screening guidelines"),
            ],
            &[],
        )
        .await;

        let results = engine
            .search("heart disease and blood pressure", None, 10)
            .await
            .unwrap();

        assert_eq!(results.total_documents, 3);
        assert_eq!(results.ranked_ids.len(), 3);
        assert_eq!(results.ranked_ids[0], "MED-2");
        let best = results.scores["MED-2"];
        assert!((best - 1.0).abs() < 1e-5);
        assert!(results.scores.values().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[tokio::test]
    async fn test_search_truncates_to_top_k() {
        let engine = engine_with(
            &[("MED-1", "a b"), ("MED-2", "b c"), ("MED-3", "c d")],
            &[],
        )
        .await;

        let results = engine.search("b", None, 2).await.unwrap();
        assert_eq!(results.ranked_ids.len(), 2);
        assert_eq!(results.scores.len(), 2);
        assert_eq!(results.total_documents, 3);
    }

    #[tokio::test]
    async fn test_ties_keep_storage_order() {
        let engine = engine_with(
            &[
                ("MED-3", "same text"),
                ("MED-1", "same text"),
                ("MED-2", "same text"),
            ],
            &[],
        )
        .await;

        let results = engine.search("same text", None, 10).await.unwrap();
        assert_eq!(results.ranked_ids, ids(&["MED-1", "MED-2", "MED-3"]));
    }

    #[tokio::test]
    async fn test_empty_corpus() {
        let engine = engine_with(&[], &[]).await;

        let results = engine.search("anything", Some("PLAIN-1"), 10).await.unwrap();
        assert_eq!(results, SearchResults::default());
        assert!(matches!(
            engine.ensure_indexed().await,
            Err(RetrievalError::EmptyCorpus)
        ));
    }

    #[tokio::test]
    async fn test_blank_query_is_rejected() {
        let engine = engine_with(&[("MED-1", "text")], &[]).await;
        let err = engine.search("   ", None, 10).await.unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[tokio::test]
    async fn test_search_and_evaluate() {
        let engine = engine_with(
            &[
                ("MED-1", "heart disease risk"),
                ("MED-2", "diabetes and diet"),
                ("MED-3", "heart attack symptoms"),
            ],
            &[("PLAIN-1", "MED-1", 2), ("PLAIN-1", "MED-3", 1)],
        )
        .await;

        let evaluation = engine
            .search_and_evaluate("heart disease", "PLAIN-1", 10)
            .await
            .unwrap();

        assert_eq!(evaluation.ranked_ids.len(), 3);
        assert_eq!(evaluation.total_documents, 3);
        assert_eq!(evaluation.precision_at_5, 0.4);
    }

    #[tokio::test]
    async fn test_evaluate_ignores_relevant_docs_below_rank_5() {
        let docs: Vec<(String, &str)> = (1..=7)
            .map(|i| (format!("MED-{i}"), "same text"))
            .collect();
        let docs: Vec<(&str, &str)> = docs.iter().map(|(id, text)| (id.as_str(), *text)).collect();
        let engine = engine_with(
            &docs,
            &[
                ("PLAIN-1", "MED-1", 2),
                ("PLAIN-1", "MED-6", 1),
                ("PLAIN-1", "MED-7", 1),
            ],
        )
        .await;

        let evaluation = engine
            .search_and_evaluate("same text", "PLAIN-1", 10)
            .await
            .unwrap();

        assert_eq!(evaluation.ranked_ids.len(), 7);
        assert_eq!(evaluation.ranked_ids[5], "MED-6");
        assert_eq!(evaluation.ranked_ids[6], "MED-7");
        assert_eq!(evaluation.precision_at_5, 0.2);
    }

    #[tokio::test]
    async fn test_identified_queries_are_cached() {
        let engine = engine_with(&[("MED-1", "heart")], &[]).await;

        engine.search("heart", Some("PLAIN-1"), 10).await.unwrap();
        engine.search("heart", Some("PLAIN-1"), 10).await.unwrap();
        engine.search("heart", None, 10).await.unwrap();

        let stats = engine.cache_stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);

        engine.clear_cache().await;
        assert_eq!(engine.cache_stats().await.size, 0);
    }

    #[tokio::test]
    async fn test_status_and_relevant_ids() {
        let engine = engine_with(
            &[("MED-1", "a"), ("MED-2", "b")],
            &[
                ("PLAIN-1", "MED-2", 1),
                ("PLAIN-1", "MED-1", 3),
                ("PLAIN-2", "MED-1", 1),
            ],
        )
        .await;

        assert_eq!(
            engine.status().await,
            IndexStatus {
                indexed_documents: 2,
                judged_queries: 2,
            }
        );
        assert_eq!(
            engine.relevant_doc_ids("PLAIN-1").await,
            ids(&["MED-1", "MED-2"])
        );
    }
}
