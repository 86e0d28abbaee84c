use serde::{Deserialize, Serialize};

use crate::lang::LanguageCode;

/// Provenance label for curated video cards.
pub const VIDEO_SOURCE: &str = "UCLA Health + WHO iSupport";
/// Provenance label for everything generated from the WHO iSupport corpus.
pub const CORPUS_SOURCE: &str = "WHO iSupport";

/// Body of `POST /chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default)]
    pub lang: LanguageCode,
}

/// The structured answer returned to the frontend.
///
/// Exactly one variant per request; the `type` discriminator tells the
/// frontend which widget to render. `source` is always present and never
/// translated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StructuredResponse {
    Video {
        title: String,
        url: String,
        summary: String,
        source: String,
    },
    Checklist {
        title: String,
        items: Vec<String>,
        source: String,
    },
    Case {
        title: String,
        content: String,
        source: String,
    },
    Tip {
        content: String,
        source: String,
    },
    Quiz {
        content: String,
        source: String,
    },
    Text {
        content: String,
        source: String,
    },
}

impl StructuredResponse {
    /// Plain text answer with corpus provenance.
    pub fn text(content: impl Into<String>) -> Self {
        StructuredResponse::Text {
            content: content.into(),
            source: CORPUS_SOURCE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_serializes_with_type_tag() {
        let resp = StructuredResponse::Video {
            title: "Preventing Wandering".to_string(),
            url: "https://www.youtube.com/embed/Sw0yEB508mI".to_string(),
            summary: "…".to_string(),
            source: VIDEO_SOURCE.to_string(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["type"], "video");
        assert_eq!(json["url"], "https://www.youtube.com/embed/Sw0yEB508mI");
        assert_eq!(json["source"], "UCLA Health + WHO iSupport");
    }

    #[test]
    fn checklist_round_trips() {
        let resp = StructuredResponse::Checklist {
            title: "Care Checklist".to_string(),
            items: vec!["Eat breakfast".to_string()],
            source: CORPUS_SOURCE.to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        let back: StructuredResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back, resp);
    }

    #[test]
    fn chat_request_lang_defaults_to_english() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"question": "what is dementia"}"#).unwrap();
        assert_eq!(req.lang, LanguageCode::En);
    }

    #[test]
    fn all_discriminators_are_lowercase() {
        for (resp, tag) in [
            (StructuredResponse::text("x"), "text"),
            (
                StructuredResponse::Tip {
                    content: "x".to_string(),
                    source: CORPUS_SOURCE.to_string(),
                },
                "tip",
            ),
            (
                StructuredResponse::Quiz {
                    content: "x".to_string(),
                    source: CORPUS_SOURCE.to_string(),
                },
                "quiz",
            ),
            (
                StructuredResponse::Case {
                    title: "t".to_string(),
                    content: "x".to_string(),
                    source: CORPUS_SOURCE.to_string(),
                },
                "case",
            ),
        ] {
            let json = serde_json::to_value(&resp).unwrap();
            assert_eq!(json["type"], tag);
        }
    }
}
