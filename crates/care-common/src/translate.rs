/// Translation engine client.
///
/// `Translator` is the seam between the answer pipeline and whatever engine
/// performs the actual translation. The production implementation talks to a
/// LibreTranslate-compatible server. Failures are returned as `Result` errors;
/// the fail-open policy (returning the input text unchanged) belongs to the
/// gateway in the service crate, not here — keeping it there makes the policy
/// visible and testable instead of implicit.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned error: status={status} body={body}")]
    Upstream { status: StatusCode, body: String },

    #[error("no translation path from '{from}' to '{to}'")]
    MissingPair { from: String, to: String },
}

/// Bidirectional text translator between two language codes (e.g. "en", "hi").
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        from_lang: &str,
        to_lang: &str,
    ) -> Result<String, TranslationError>;
}

#[derive(Clone, Debug)]
pub struct LibreTranslateConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_error_body_bytes: usize,
}

impl LibreTranslateConfig {
    pub fn from_env() -> Self {
        let base_url = std::env::var("TRANSLATE_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:5000".to_string());

        let api_key = std::env::var("TRANSLATE_API_KEY").ok();

        let timeout = std::env::var("TRANSLATE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(30));

        let max_error_body_bytes = std::env::var("TRANSLATE_MAX_ERROR_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(8 * 1024);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
            max_error_body_bytes,
        }
    }
}

/// Client for a LibreTranslate-compatible `/translate` endpoint.
#[derive(Clone)]
pub struct LibreTranslateClient {
    config: LibreTranslateConfig,
    http: reqwest::Client,
}

impl LibreTranslateClient {
    pub fn new(config: LibreTranslateConfig) -> Result<Self, TranslationError> {
        let http = reqwest::Client::builder()
            .user_agent("careassist/care-chat")
            .build()?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl Translator for LibreTranslateClient {
    async fn translate(
        &self,
        text: &str,
        from_lang: &str,
        to_lang: &str,
    ) -> Result<String, TranslationError> {
        let url = format!("{}/translate", self.config.base_url);
        let request = TranslateRequest {
            q: text.to_string(),
            source: from_lang.to_string(),
            target: to_lang.to_string(),
            format: "text".to_string(),
            api_key: self.config.api_key.clone(),
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
            return Err(TranslationError::Upstream { status, body });
        }

        let parsed = resp.json::<TranslateResponse>().await?;
        Ok(parsed.translated_text)
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
struct TranslateRequest {
    q: String,
    source: String,
    target: String,
    format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}
