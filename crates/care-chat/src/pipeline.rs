/// The answer pipeline: (question, language) in, structured response out.
///
/// Deterministic, no retries. The only error this component ever surfaces is
/// resource-construction failure; a failed generation degrades to a plain
/// text response instead of an error, and translation failures are absorbed
/// by the gateway.
use tracing::{info, warn};

use crate::api::{StructuredResponse, VIDEO_SOURCE};
use crate::classify;
use crate::error::AppError;
use crate::gateway::TranslationGateway;
use crate::lang::LanguageCode;
use crate::resources::ResourceCache;
use crate::topics::TopicCatalog;

/// Summary length for topic-matched video cards, in characters.
const SUMMARY_MAX_CHARS: usize = 400;

/// Shown when the retrieval index has no supporting passage for a topic.
const SUMMARY_FALLBACK: &str = "This topic is addressed in our training video.";

/// Shown when generation fails. The caller still receives a well-formed
/// response, never an error.
const DEGRADED_MESSAGE: &str =
    "I'm sorry, I couldn't prepare an answer right now. Please try again in a moment.";

pub struct AnswerPipeline {
    gateway: TranslationGateway,
    topics: TopicCatalog,
    resources: ResourceCache,
}

impl AnswerPipeline {
    pub fn new(gateway: TranslationGateway, topics: TopicCatalog, resources: ResourceCache) -> Self {
        Self {
            gateway,
            topics,
            resources,
        }
    }

    /// Answer a caregiver question in the requested language.
    pub async fn answer(
        &self,
        question: &str,
        lang: LanguageCode,
    ) -> Result<StructuredResponse, AppError> {
        // 1. Normalize to English. The gateway is a no-op for English input.
        let question_en = self
            .gateway
            .translate(question, lang, LanguageCode::En)
            .await;

        // 2. Topic short-circuit: curated video instead of generation.
        if let Some(topic) = self.topics.match_question(&question_en) {
            info!(topic = topic.key, "topic matched, returning video card");
            return self.video_card(topic, lang).await;
        }

        // 3. Generate. Failure degrades this request only.
        let handles = self.resources.get().await?;
        let raw_text = match handles.chain.invoke(&question_en).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "generation failed, returning degraded text response");
                return Ok(StructuredResponse::text(DEGRADED_MESSAGE));
            }
        };

        // 4. Classify the raw English text, then 5. back-translate per field.
        let classified = classify::classify(&raw_text);
        Ok(self.localize(classified, lang).await)
    }

    /// Build a `Video` card for a matched topic. The summary comes from a
    /// top-1 similarity search keyed on the topic key (not the question) so
    /// it targets the video's supporting passage rather than the user's
    /// phrasing.
    async fn video_card(
        &self,
        topic: &crate::topics::Topic,
        lang: LanguageCode,
    ) -> Result<StructuredResponse, AppError> {
        let handles = self.resources.get().await?;
        let summary = match handles.index.similarity_search(topic.key, 1).await {
            Ok(passages) => passages
                .first()
                .map(|p| p.text.chars().take(SUMMARY_MAX_CHARS).collect::<String>())
                .unwrap_or_else(|| SUMMARY_FALLBACK.to_string()),
            Err(e) => {
                warn!(error = %e, topic = topic.key, "summary retrieval failed");
                SUMMARY_FALLBACK.to_string()
            }
        };

        let mut title = topic.title.to_string();
        let mut summary = summary;
        if lang != LanguageCode::En {
            title = self.gateway.translate(&title, LanguageCode::En, lang).await;
            summary = self
                .gateway
                .translate(&summary, LanguageCode::En, lang)
                .await;
        }

        Ok(StructuredResponse::Video {
            title,
            url: topic.url.to_string(),
            summary,
            source: VIDEO_SOURCE.to_string(),
        })
    }

    /// Back-translate the free-text fields of a classified response, one
    /// field at a time. `url` and `source` carry provenance and are never
    /// translated; whole-object translation would corrupt them.
    async fn localize(&self, resp: StructuredResponse, lang: LanguageCode) -> StructuredResponse {
        if lang == LanguageCode::En {
            return resp;
        }
        let en = LanguageCode::En;
        match resp {
            StructuredResponse::Checklist { title, items, source } => {
                let title = self.gateway.translate(&title, en, lang).await;
                let mut translated = Vec::with_capacity(items.len());
                for item in &items {
                    translated.push(self.gateway.translate(item, en, lang).await);
                }
                StructuredResponse::Checklist {
                    title,
                    items: translated,
                    source,
                }
            }
            StructuredResponse::Case { title, content, source } => StructuredResponse::Case {
                title,
                content: self.gateway.translate(&content, en, lang).await,
                source,
            },
            StructuredResponse::Tip { content, source } => StructuredResponse::Tip {
                content: self.gateway.translate(&content, en, lang).await,
                source,
            },
            StructuredResponse::Quiz { content, source } => StructuredResponse::Quiz {
                content: self.gateway.translate(&content, en, lang).await,
                source,
            },
            StructuredResponse::Text { content, source } => StructuredResponse::Text {
                content: self.gateway.translate(&content, en, lang).await,
                source,
            },
            StructuredResponse::Video {
                title,
                url,
                summary,
                source,
            } => StructuredResponse::Video {
                title: self.gateway.translate(&title, en, lang).await,
                url,
                summary: self.gateway.translate(&summary, en, lang).await,
                source,
            },
        }
    }
}
