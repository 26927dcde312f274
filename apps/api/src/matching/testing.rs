//! In-process fakes for the model-service and language-detection seams.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm_client::{EmbeddingBackend, ServiceError, TextGenerator};
use crate::matching::language::LanguageDetector;
use crate::models::JobRecord;

const DESCRIPTION_MARKER: &str = "The job description is: ";

pub fn job(id: &str, title: &str, description: &str, company: &str) -> JobRecord {
    JobRecord {
        id: id.to_string(),
        title: title.to_string(),
        url: format!("https://jobs.example/{id}"),
        description: description.to_string(),
        company: company.to_string(),
        ..Default::default()
    }
}

/// Embeds text as a 26-dimensional letter histogram and records every input.
#[derive(Default)]
pub struct RecordingEmbedder {
    seen: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

impl RecordingEmbedder {
    pub fn failing_on(needle: &str) -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            fail_on: Some(needle.to_string()),
        }
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingBackend for RecordingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        self.seen.lock().unwrap().push(text.to_string());
        if let Some(needle) = &self.fail_on {
            if text.contains(needle.as_str()) {
                return Err(ServiceError::Api {
                    status: 500,
                    message: "embedding backend down".to_string(),
                });
            }
        }
        let mut histogram = vec![0.0_f32; 26];
        for byte in text.bytes().filter(u8::is_ascii_alphabetic) {
            histogram[(byte.to_ascii_lowercase() - b'a') as usize] += 1.0;
        }
        Ok(histogram)
    }

    fn model(&self) -> &str {
        "letter-histogram"
    }
}

/// Answers prompts by looking for marker substrings in the job description part
/// of the prompt. Unmatched prompts get an unparseable reply.
#[derive(Default)]
pub struct ScriptedGenerator {
    responses: Vec<(String, String)>,
    failing: Vec<String>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, marker: &str, response: &str) -> Self {
        self.responses.push((marker.to_string(), response.to_string()));
        self
    }

    pub fn fail_on(mut self, marker: &str) -> Self {
        self.failing.push(marker.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn reply(&self, prompt: &str) -> Result<String, ServiceError> {
        let description = prompt
            .rsplit_once(DESCRIPTION_MARKER)
            .map(|(_, d)| d)
            .unwrap_or(prompt);
        if self.failing.iter().any(|m| description.contains(m.as_str())) {
            return Err(ServiceError::Api {
                status: 503,
                message: "model overloaded".to_string(),
            });
        }
        Ok(self
            .responses
            .iter()
            .find(|(marker, _)| description.contains(marker.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| "I am not sure.".to_string()))
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.reply(prompt)
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Reads the language from a leading `[xxx]` marker in the text.
pub struct MarkerLanguageDetector;

impl LanguageDetector for MarkerLanguageDetector {
    fn detect(&self, text: &str) -> Option<&'static str> {
        let text = text.trim_start();
        ["eng", "deu", "fra"]
            .into_iter()
            .find(|code| text.starts_with(&format!("[{code}]")))
    }
}
