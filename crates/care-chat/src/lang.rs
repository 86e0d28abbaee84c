use serde::{Deserialize, Serialize};

/// Supported interface languages.
///
/// All question and answer text is tagged with exactly one code at any point
/// in the pipeline. Adding a deployment language means adding a variant here
/// and installing the matching pair in the translation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCode {
    #[default]
    En,
    Hi,
}

impl LanguageCode {
    /// The engine-level code, as sent to the translation service.
    pub fn as_str(self) -> &'static str {
        match self {
            LanguageCode::En => "en",
            LanguageCode::Hi => "hi",
        }
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
