/// HTTP surface: a single chat operation plus a health probe.
///
/// `POST /chat` always answers 200 with a well-formed structured response,
/// even when generation degrades internally. The only 500 is
/// resource-construction failure, which no per-request recovery can fix.
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::error;

use crate::api::ChatRequest;
use crate::pipeline::AnswerPipeline;

pub fn router(pipeline: Arc<AnswerPipeline>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .with_state(pipeline)
}

async fn chat(
    State(pipeline): State<Arc<AnswerPipeline>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    match pipeline.answer(&request.question, request.lang).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            error!(error = %e, "answer pipeline failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "internal error"})),
            )
                .into_response()
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use tower::ServiceExt;

    use care_common::translate::{TranslationError, Translator};

    use crate::error::AppError;
    use crate::gateway::TranslationGateway;
    use crate::rag::{GenerationChain, Passage, RetrievalIndex};
    use crate::resources::{ChainHandles, ResourceCache};
    use crate::topics::TopicCatalog;

    struct EchoTranslator;

    #[async_trait]
    impl Translator for EchoTranslator {
        async fn translate(
            &self,
            text: &str,
            _from_lang: &str,
            _to_lang: &str,
        ) -> Result<String, TranslationError> {
            Ok(text.to_string())
        }
    }

    struct FixedChain(&'static str);

    #[async_trait]
    impl GenerationChain for FixedChain {
        async fn invoke(&self, _query: &str) -> Result<String, AppError> {
            Ok(self.0.to_string())
        }
    }

    struct EmptyIndex;

    #[async_trait]
    impl RetrievalIndex for EmptyIndex {
        async fn similarity_search(
            &self,
            _query: &str,
            _k: usize,
        ) -> Result<Vec<Passage>, AppError> {
            Ok(Vec::new())
        }
    }

    fn test_router(reply: &'static str) -> Router {
        let gateway = TranslationGateway::new(Arc::new(EchoTranslator));
        let resources = ResourceCache::new(move || async move {
            Ok(ChainHandles {
                chain: Arc::new(FixedChain(reply)),
                index: Arc::new(EmptyIndex),
            })
        });
        let pipeline = Arc::new(AnswerPipeline::new(
            gateway,
            TopicCatalog::default(),
            resources,
        ));
        router(pipeline)
    }

    fn broken_router() -> Router {
        let gateway = TranslationGateway::new(Arc::new(EchoTranslator));
        let resources = ResourceCache::new(|| async {
            Err::<ChainHandles, _>(AppError::Index("passages table missing".to_string()))
        });
        let pipeline = Arc::new(AnswerPipeline::new(
            gateway,
            TopicCatalog::default(),
            resources,
        ));
        router(pipeline)
    }

    fn post_chat(body: serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let app = test_router("unused");
        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn chat_returns_typed_response() {
        let app = test_router("Keep in mind that patience helps.");
        let resp = app
            .oneshot(post_chat(json!({"question": "how do I stay calm"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["type"], "tip");
        assert_eq!(body["source"], "WHO iSupport");
    }

    #[tokio::test]
    async fn chat_topic_match_returns_video_card() {
        let app = test_router("unused");
        let resp = app
            .oneshot(post_chat(json!({"question": "help with wandering", "lang": "en"})))
            .await
            .unwrap();
        let body = json_body(resp).await;
        assert_eq!(body["type"], "video");
        assert_eq!(body["url"], "https://www.youtube.com/embed/Sw0yEB508mI");
        assert_eq!(body["summary"], "This topic is addressed in our training video.");
    }

    #[tokio::test]
    async fn resource_failure_maps_to_internal_error() {
        let app = broken_router();
        let resp = app
            .oneshot(post_chat(json!({"question": "what is dementia"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(resp).await;
        assert_eq!(body["error"], "internal error");
    }

    #[tokio::test]
    async fn unknown_language_is_rejected() {
        let app = test_router("unused");
        let resp = app
            .oneshot(post_chat(json!({"question": "hola", "lang": "es"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
