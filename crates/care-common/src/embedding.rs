/// Embedding wrapper around fastembed.
///
/// `TextEmbedding` from fastembed is synchronous and CPU-bound. All embed calls go through
/// `tokio::task::spawn_blocking`. The `Embedder` is `!Send` due to the inner ONNX runtime,
/// so it is wrapped in `Arc` and accessed only from blocking tasks.
///
/// The all-MiniLM-L6-v2 model takes raw sentences with no task prefixes and produces
/// 384-dimensional vectors. It is the same model the WHO iSupport corpus was originally
/// embedded with, so passage and query vectors stay comparable.
use std::sync::Arc;

use crate::error::CommonError;

/// Wraps fastembed's `TextEmbedding` model for generating vector embeddings.
///
/// The inner model is not `Send`, so all operations are dispatched to a blocking thread.
pub struct Embedder {
    model: Arc<fastembed::TextEmbedding>,
}

impl Embedder {
    /// Initialize the embedding model (all-MiniLM-L6-v2).
    ///
    /// This downloads the model on first run (~90MB). The download happens synchronously
    /// inside a blocking task.
    pub async fn new() -> Result<Self, CommonError> {
        let model = tokio::task::spawn_blocking(|| {
            let options = fastembed::InitOptions::new(fastembed::EmbeddingModel::AllMiniLML6V2)
                .with_show_download_progress(true);
            fastembed::TextEmbedding::try_new(options)
        })
        .await
        .map_err(|e| CommonError::Embedding(format!("spawn_blocking join error: {e}")))?
        .map_err(|e| CommonError::Embedding(format!("model initialization failed: {e}")))?;

        Ok(Self {
            model: Arc::new(model),
        })
    }

    /// Embed passages for indexing.
    ///
    /// Passages are processed in small batches to bound peak memory during ONNX inference.
    pub async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CommonError> {
        let texts = texts.to_vec();
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || model.embed(texts, Some(16)))
            .await
            .map_err(|e| CommonError::Embedding(format!("spawn_blocking join error: {e}")))?
            .map_err(|e| CommonError::Embedding(format!("document embedding failed: {e}")))
    }

    /// Embed a single query for similarity search.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>, CommonError> {
        let input = vec![query.to_string()];
        let model = Arc::clone(&self.model);
        let mut results = tokio::task::spawn_blocking(move || model.embed(input, None))
            .await
            .map_err(|e| CommonError::Embedding(format!("spawn_blocking join error: {e}")))?
            .map_err(|e| CommonError::Embedding(format!("query embedding failed: {e}")))?;
        results
            .pop()
            .ok_or_else(|| CommonError::Embedding("empty embedding result".to_string()))
    }

    /// Returns the dimensionality of the embedding vectors (384 for all-MiniLM-L6-v2).
    pub fn dimensions(&self) -> usize {
        384
    }
}
