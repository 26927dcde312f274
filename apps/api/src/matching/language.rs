//! Language filter applied to job descriptions before indexing.

use std::sync::Arc;

use whatlang::Lang;

/// Detects the language of a text.
pub trait LanguageDetector: Send + Sync {
    /// ISO 639-3 code of the detected language, or `None` when the text is
    /// too short or ambiguous to classify.
    fn detect(&self, text: &str) -> Option<&'static str>;
}

/// Trigram-based detection via `whatlang`.
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<&'static str> {
        whatlang::detect(text).map(|info| info.lang().code())
    }
}

/// Keeps texts whose detected language equals the target language.
#[derive(Clone)]
pub struct LanguageFilter {
    detector: Arc<dyn LanguageDetector>,
    target: String,
}

impl LanguageFilter {
    pub fn new(detector: Arc<dyn LanguageDetector>, target: impl Into<String>) -> Self {
        Self {
            detector,
            target: target.into(),
        }
    }

    /// Detection failure counts as a mismatch.
    pub fn matches(&self, text: &str) -> bool {
        self.detector
            .detect(text)
            .is_some_and(|code| code.eq_ignore_ascii_case(&self.target))
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

/// Checks that `code` is an ISO 639-3 code the detector can produce.
pub fn validate_language_code(code: &str) -> Result<(), String> {
    Lang::from_code(code.to_ascii_lowercase())
        .map(|_| ())
        .ok_or_else(|| format!("unsupported language code '{code}' (expected ISO 639-3, e.g. 'eng')"))
}
