/// Error types shared across CareAssist crates.
///
/// These errors represent failures in infrastructure components (vector DB, embeddings)
/// that are common to the indexer and the chat service. Application-specific errors are
/// defined in the service crate and wrap `CommonError` via `#[from]`.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("vector db error: {0}")]
    VectorDb(String),

    #[error("embedding error: {0}")]
    Embedding(String),
}
