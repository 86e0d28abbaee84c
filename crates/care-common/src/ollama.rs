/// HTTP client for a local Ollama server.
///
/// Uses the non-streaming `/api/generate` endpoint. Generation is latency-heavy
/// (seconds on CPU), so the timeout defaults to two minutes. No retries are
/// performed here — a failed generation degrades the single request it belongs
/// to and must not delay other in-flight requests.
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Clone, Debug)]
pub struct OllamaClientConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub max_error_body_bytes: usize,
}

impl OllamaClientConfig {
    pub fn from_env() -> Self {
        let base_url = std::env::var("OLLAMA_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:11434".to_string());

        let model = std::env::var("OLLAMA_MODEL")
            .unwrap_or_else(|_| "llama3:8b-instruct-q4_0".to_string());

        let timeout = std::env::var("OLLAMA_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(120));

        let max_error_body_bytes = std::env::var("OLLAMA_MAX_ERROR_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(8 * 1024);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout,
            max_error_body_bytes,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OllamaClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned error: status={status} body={body}")]
    Upstream { status: StatusCode, body: String },
}

#[derive(Clone)]
pub struct OllamaClient {
    config: OllamaClientConfig,
    http: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: OllamaClientConfig) -> Result<Self, OllamaClientError> {
        let http = reqwest::Client::builder()
            .user_agent("careassist/care-chat")
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &OllamaClientConfig {
        &self.config
    }

    /// Run a single completion with the given system instruction and prompt.
    ///
    /// Returns the full generated text.
    pub async fn generate(&self, system: &str, prompt: &str) -> Result<String, OllamaClientError> {
        let url = format!("{}/api/generate", self.config.base_url);
        let request = GenerateRequest {
            model: self.config.model.clone(),
            system: system.to_string(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let resp = self
            .http
            .post(&url)
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = read_limited_text(resp, self.config.max_error_body_bytes).await;
            return Err(OllamaClientError::Upstream { status, body });
        }

        let parsed = resp.json::<GenerateResponse>().await?;
        Ok(parsed.response)
    }
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > max_bytes {
                b.truncate(max_bytes);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read upstream error body");
            "<failed to read error body>".to_string()
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    system: String,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}
