/// Translation gateway with an explicit fail-open policy.
///
/// A degraded (untranslated) answer is preferred over no answer: on any
/// engine failure the gateway logs the condition and hands back the original
/// text unchanged. Callers never receive an error from `translate`. The
/// same-language case returns the input without touching the engine at all.
use std::sync::Arc;

use tracing::warn;

use care_common::translate::Translator;

use crate::lang::LanguageCode;

#[derive(Clone)]
pub struct TranslationGateway {
    translator: Arc<dyn Translator>,
}

impl TranslationGateway {
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self { translator }
    }

    pub async fn translate(&self, text: &str, from: LanguageCode, to: LanguageCode) -> String {
        if from == to {
            return text.to_string();
        }
        match self
            .translator
            .translate(text, from.as_str(), to.as_str())
            .await
        {
            Ok(translated) => translated,
            Err(e) => {
                warn!(
                    error = %e,
                    from = %from,
                    to = %to,
                    "translation failed, returning original text"
                );
                text.to_string()
            }
        }
    }
}
