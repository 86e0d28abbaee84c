use care_common::error::CommonError;
use care_common::ollama::OllamaClientError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("generation error: {0}")]
    Generation(#[from] OllamaClientError),

    #[error("config error: {0}")]
    Config(String),

    #[error("index error: {0}")]
    Index(String),
}
