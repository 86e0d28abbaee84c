use crate::error::AppError;

/// Application configuration loaded explicitly from environment variables.
///
/// The LanceDB path is required — no default is assumed for it. The corpus
/// path is only needed by the `index` subcommand.
#[derive(Debug, Clone)]
pub struct Config {
    /// Filesystem path to the LanceDB data directory.
    pub lancedb_path: String,
    /// Filesystem path to the directory holding the caregiver-support corpus
    /// (plain-text / markdown files). Only required for indexing.
    pub corpus_path: Option<String>,
    /// Address the HTTP server binds to.
    pub bind_addr: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `LANCEDB_PATH`: path to LanceDB data directory
    ///
    /// Optional:
    /// - `CORPUS_PATH`: path to the corpus directory (required by `care-chat index`)
    /// - `BIND_ADDR`: HTTP bind address (default "0.0.0.0:8000")
    pub fn from_env() -> Result<Self, AppError> {
        let lancedb_path = std::env::var("LANCEDB_PATH").map_err(|_| {
            AppError::Config("LANCEDB_PATH environment variable is required".to_string())
        })?;

        let corpus_path = std::env::var("CORPUS_PATH").ok();

        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());

        Ok(Self {
            lancedb_path,
            corpus_path,
            bind_addr,
        })
    }

    /// Returns the corpus directory, or a config error if it was not set.
    pub fn corpus_dir(&self) -> Result<&str, AppError> {
        self.corpus_path.as_deref().ok_or_else(|| {
            AppError::Config("CORPUS_PATH environment variable is required for indexing".to_string())
        })
    }
}
