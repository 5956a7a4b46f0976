//! Local sentence-embedding model run through fastembed.
//!
//! The default model is `all-MiniLM-L6-v2` (384 dimensions). Model files are
//! fetched from the Hugging Face hub on first use and read from the local
//! cache afterwards. Inference is CPU-bound, so every call runs on the
//! blocking thread pool while holding the model lock.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, ModelTrait, TextEmbedding, TextInitOptions};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
use crate::tokenizer::{HubTokenizer, Tokenizer};

/// Model loaded when no model code is configured.
pub const DEFAULT_LOCAL_MODEL: EmbeddingModel = EmbeddingModel::AllMiniLML6V2;

/// Embedding provider backed by a local ONNX model.
pub struct FastEmbedProvider {
    model: Arc<Mutex<TextEmbedding>>,
    model_code: String,
    dimension: usize,
    tokenizer: HubTokenizer,
}

impl FastEmbedProvider {
    /// Load a model by its fastembed code, or [`DEFAULT_LOCAL_MODEL`].
    ///
    /// The tokenizer is read from the same hub repository as the model.
    pub async fn load(model_code: Option<&str>) -> Result<Self> {
        let choice = LocalModel::resolve(model_code)?;
        info!("Loading local embedding model {}", choice.model_code);

        let options = TextInitOptions::new(choice.model.clone()).with_show_download_progress(false);
        let repo = choice.model_code.clone();

        let (model, tokenizer) = tokio::task::spawn_blocking(move || -> Result<_> {
            let model = TextEmbedding::try_new(options)
                .map_err(|e| EmbeddingError::ModelLoad(format!("initialising {repo}: {e}")))?;
            let tokenizer = HubTokenizer::from_pretrained(&repo)?;
            Ok((model, tokenizer))
        })
        .await
        .map_err(|e| EmbeddingError::ModelLoad(format!("model initialisation task: {e}")))??;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            model_code: choice.model_code,
            dimension: choice.dimension,
            tokenizer,
        })
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Embedding>> {
        let mut model = Arc::clone(&self.model).lock_owned().await;
        tokio::task::spawn_blocking(move || model.embed(texts, None))
            .await
            .map_err(|e| EmbeddingError::ApiRequest(format!("embedding task: {e}")))?
            .map_err(|e| EmbeddingError::ApiRequest(e.to_string()))
    }

    fn response(&self, embedding: Embedding, text: &str) -> Result<EmbeddingResponse> {
        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        Ok(EmbeddingResponse {
            dimension: embedding.len(),
            embedding,
            model: self.model_code.clone(),
            tokens_used: Some(self.tokenizer.count_tokens(text) as u64),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    fn name(&self) -> &str {
        "fastembed"
    }

    fn default_model(&self) -> &str {
        &self.model_code
    }

    fn default_dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let embedding = self
            .run(vec![request.text.clone()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("model returned no embedding".to_string()))?;
        self.response(embedding, &request.text)
    }

    async fn embed_batch(&self, requests: Vec<EmbeddingRequest>) -> Result<Vec<EmbeddingResponse>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = requests.iter().map(|r| r.text.clone()).collect();
        debug!("Embedding {} texts locally with {}", texts.len(), self.model_code);
        let embeddings = self.run(texts).await?;

        if embeddings.len() != requests.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                requests.len(),
                embeddings.len()
            )));
        }

        embeddings
            .into_iter()
            .zip(&requests)
            .map(|(embedding, request)| self.response(embedding, &request.text))
            .collect()
    }

    fn tokenizer(&self) -> Option<&dyn Tokenizer> {
        Some(&self.tokenizer)
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Model choice resolved against fastembed's model table.
#[derive(Debug, Clone)]
struct LocalModel {
    model: EmbeddingModel,
    model_code: String,
    dimension: usize,
}

impl LocalModel {
    fn resolve(model_code: Option<&str>) -> Result<Self> {
        let model = match model_code {
            Some(code) => EmbeddingModel::from_str(code)
                .map_err(|e| EmbeddingError::ModelLoad(format!("unknown model {code}: {e}")))?,
            None => DEFAULT_LOCAL_MODEL,
        };
        let info = EmbeddingModel::get_model_info(&model)
            .ok_or_else(|| EmbeddingError::ModelLoad(format!("no metadata for {model}")))?;

        Ok(Self {
            model_code: info.model_code.clone(),
            dimension: info.dim,
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_model_is_minilm() {
        let choice = LocalModel::resolve(None).unwrap();
        assert_eq!(choice.dimension, crate::DEFAULT_DIMENSION);
        assert!(choice.model_code.contains("all-MiniLM-L6-v2"));
    }

    #[test]
    fn test_unknown_model_is_rejected() {
        let err = LocalModel::resolve(Some("not-a-real/model")).unwrap_err();
        assert!(matches!(err, EmbeddingError::ModelLoad(_)));
    }

    #[tokio::test]
    #[ignore = "downloads the model from the Hugging Face hub"]
    async fn test_load_and_embed() {
        let provider = FastEmbedProvider::load(None).await.unwrap();
        assert_eq!(provider.name(), "fastembed");
        assert!(provider.tokenizer().is_some());

        let responses = provider
            .embed_batch(vec![
                EmbeddingRequest::new("heart disease"),
                EmbeddingRequest::new("diabetes"),
            ])
            .await
            .unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].dimension, 384);
    }
}
