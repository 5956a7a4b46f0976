//! Configuration for the search service.
//!
//! Every section has defaults, so an empty TOML file (or no file at all) is a
//! valid configuration:
//!
//! ```toml
//! data_dir = "./data/store"
//!
//! [embedding]
//! provider = "hashing"      # or "openai", "fastembed"
//! dimension = 384
//! cache_capacity = 1000
//!
//! [query]
//! top_k = 10
//!
//! [ingest]
//! dataset_dir = "./data"
//! batch_size = 100
//! max_tokens = 512
//!
//! [server]
//! bind = "127.0.0.1:8000"
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use semsearch_corpus::IngestOptions;
use semsearch_corpus::ingest::{
    DEFAULT_BATCH_SIZE, DEFAULT_DOCUMENTS_FILE, DEFAULT_JUDGMENTS_FILE, DEFAULT_QUERIES_FILE,
};
use semsearch_embeddings::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_DIMENSION, DEFAULT_MAX_TOKENS, EmbeddingProvider,
    EmbeddingService, FastEmbedProvider, HashingProvider, OpenAIProvider,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, RetrievalError};

/// Number of ranked documents returned per query.
pub const DEFAULT_TOP_K: usize = 10;

/// Configuration for the search service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Directory of the record store.
    pub data_dir: PathBuf,

    /// Embedding provider configuration.
    pub embedding: EmbeddingConfig,

    /// Query processing configuration.
    pub query: QueryConfig,

    /// Corpus ingestion configuration.
    pub ingest: IngestConfig,

    /// HTTP server configuration.
    pub server: ServerConfig,
}

impl RetrievalConfig {
    /// Create a new configuration with default values.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            embedding: EmbeddingConfig::default(),
            query: QueryConfig::default(),
            ingest: IngestConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// Load and validate a configuration from a TOML file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::from_toml(&content)
            .map_err(|e| RetrievalError::Config(format!("{}: {e}", path.display())))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| RetrievalError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        let zero = |name: &str| Err(RetrievalError::Config(format!("{name} must be greater than 0")));

        if self.embedding.dimension == 0 {
            return zero("embedding.dimension");
        }
        if self.embedding.cache_capacity == 0 {
            return zero("embedding.cache_capacity");
        }
        if self.query.top_k == 0 {
            return zero("query.top_k");
        }
        if self.ingest.batch_size == 0 {
            return zero("ingest.batch_size");
        }
        if self.ingest.max_tokens == 0 {
            return zero("ingest.max_tokens");
        }
        Ok(())
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self::new("./data/store")
    }
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which provider to use.
    pub provider: EmbeddingProviderType,

    /// Model to use for embeddings (OpenAI model name or fastembed model code).
    pub model: Option<String>,

    /// Output dimension of the hashing provider.
    pub dimension: usize,

    /// Base URL of an OpenAI-compatible API.
    pub base_url: Option<String>,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Whether to cache embeddings.
    pub cache_enabled: bool,

    /// Maximum cache size.
    pub cache_capacity: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::Hashing,
            model: None,
            dimension: DEFAULT_DIMENSION,
            base_url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            cache_enabled: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl EmbeddingConfig {
    /// Construct the configured provider.
    ///
    /// The fastembed provider loads its model here, downloading it on first use.
    pub async fn build_provider(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        let provider: Arc<dyn EmbeddingProvider> = match self.provider {
            EmbeddingProviderType::Hashing => Arc::new(HashingProvider::new(self.dimension)),
            EmbeddingProviderType::OpenAI => {
                let mut provider = OpenAIProvider::new().with_api_key_env(&self.api_key_env);
                if let Some(base_url) = &self.base_url {
                    provider = provider.with_base_url(base_url);
                }
                if let Some(model) = &self.model {
                    provider = provider.with_model(model);
                }
                if !provider.is_available() {
                    warn!("{} is not set; embedding requests will fail", self.api_key_env);
                }
                Arc::new(provider)
            }
            EmbeddingProviderType::FastEmbed => {
                Arc::new(FastEmbedProvider::load(self.model.as_deref()).await?)
            }
        };
        Ok(provider)
    }

    /// Construct the embedding service around the configured provider.
    pub async fn build_service(&self) -> Result<EmbeddingService> {
        Ok(
            EmbeddingService::new(self.build_provider().await?, self.cache_capacity)
                .with_cache_enabled(self.cache_enabled),
        )
    }
}

/// Type of embedding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    /// Local feature-hashing embedder.
    Hashing,
    /// OpenAI-compatible embeddings API.
    #[serde(rename = "openai")]
    OpenAI,
    /// Local ONNX model run with fastembed.
    #[serde(rename = "fastembed")]
    FastEmbed,
}

/// Configuration for query processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Maximum number of results to return.
    pub top_k: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Configuration for corpus ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub dataset_dir: PathBuf,
    pub documents_file: String,
    pub queries_file: String,
    pub judgments_file: String,
    pub batch_size: usize,
    pub max_tokens: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("./data"),
            documents_file: DEFAULT_DOCUMENTS_FILE.to_string(),
            queries_file: DEFAULT_QUERIES_FILE.to_string(),
            judgments_file: DEFAULT_JUDGMENTS_FILE.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl IngestConfig {
    /// Options for one ingestion run.
    pub fn options(&self, clear: bool) -> IngestOptions {
        IngestOptions {
            dataset_dir: self.dataset_dir.clone(),
            documents_file: self.documents_file.clone(),
            queries_file: self.queries_file.clone(),
            judgments_file: self.judgments_file.clone(),
            batch_size: self.batch_size,
            max_tokens: self.max_tokens,
            clear,
        }
    }
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 8000)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = RetrievalConfig::from_toml("").unwrap();
        assert_eq!(config, RetrievalConfig::default());
        assert_eq!(config.query.top_k, 10);
        assert_eq!(config.ingest.batch_size, 100);
        assert_eq!(config.ingest.max_tokens, 512);
        assert_eq!(config.embedding.cache_capacity, 1000);
        assert_eq!(config.server.bind.to_string(), "127.0.0.1:8000");
    }

    #[test]
    fn test_partial_sections() {
        let config = RetrievalConfig::from_toml(
            r#"
            data_dir = "/var/lib/semsearch"

            [embedding]
            provider = "openai"
            model = "text-embedding-3-small"
            cache_enabled = false

            [ingest]
            batch_size = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/semsearch"));
        assert_eq!(config.embedding.provider, EmbeddingProviderType::OpenAI);
        assert_eq!(
            config.embedding.model.as_deref(),
            Some("text-embedding-3-small")
        );
        assert!(!config.embedding.cache_enabled);
        assert_eq!(config.embedding.dimension, DEFAULT_DIMENSION);
        assert_eq!(config.ingest.batch_size, 25);
        assert_eq!(config.ingest.documents_file, "train.docs");
    }

    #[test]
    fn test_rejects_zero_values() {
        let err = RetrievalConfig::from_toml("[ingest]\nbatch_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("ingest.batch_size"));

        let err = RetrievalConfig::from_toml("[query]\ntop_k = 0\n").unwrap_err();
        assert!(err.to_string().contains("query.top_k"));
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let err = RetrievalConfig::from_toml("[embedding]\nprovider = \"word2vec\"\n").unwrap_err();
        assert!(matches!(err, RetrievalError::Config(_)));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("semsearch.toml");
        tokio::fs::write(&path, "[server]\nbind = \"0.0.0.0:9000\"\n")
            .await
            .unwrap();

        let config = RetrievalConfig::load(&path).await.unwrap();
        assert_eq!(config.server.bind.port(), 9000);
    }

    #[test]
    fn test_fastembed_provider_section() {
        let config = RetrievalConfig::from_toml(
            "[embedding]\nprovider = \"fastembed\"\nmodel = \"Qdrant/all-MiniLM-L6-v2-onnx\"\n",
        )
        .unwrap();
        assert_eq!(config.embedding.provider, EmbeddingProviderType::FastEmbed);
        assert_eq!(
            config.embedding.model.as_deref(),
            Some("Qdrant/all-MiniLM-L6-v2-onnx")
        );
    }

    #[tokio::test]
    async fn test_fastembed_unknown_model_fails_to_build() {
        let embedding = EmbeddingConfig {
            provider: EmbeddingProviderType::FastEmbed,
            model: Some("not-a-real/model".to_string()),
            ..EmbeddingConfig::default()
        };
        let err = embedding.build_provider().await.err().unwrap();
        assert!(matches!(err, RetrievalError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_build_hashing_provider() {
        let mut embedding = EmbeddingConfig::default();
        embedding.dimension = 64;
        let provider = embedding.build_provider().await.unwrap();
        assert_eq!(provider.name(), "hashing");
        assert_eq!(provider.default_dimension(), 64);
    }

    #[test]
    fn test_ingest_options() {
        let options = IngestConfig::default().options(true);
        assert!(options.clear);
        assert_eq!(options.queries_file, "train.titles.queries");
        assert_eq!(options.judgments_file, "train.3-2-1.qrel");
    }
}
