//! Embedder — normalizes text and turns it into a vector through the embedding backend.

use std::sync::Arc;

use crate::llm_client::{EmbeddingBackend, ServiceError};

#[derive(Clone)]
pub struct Embedder {
    backend: Arc<dyn EmbeddingBackend>,
}

impl Embedder {
    pub fn new(backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self { backend }
    }

    /// Normalizes `text` and embeds it. Service failures propagate to the caller.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let normalized = normalize_text(text);
        self.backend.embed(&normalized).await
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }
}

/// Deletes every non-ASCII character (no transliteration), then collapses
/// whitespace runs to a single space and trims.
///
/// The ASCII separators `\x1c`..=`\x1f` count as whitespace too.
pub fn normalize_text(text: &str) -> String {
    let ascii: String = text.chars().filter(char::is_ascii).collect();
    ascii
        .split(is_separator)
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || ('\x1c'..='\x1f').contains(&c)
}
