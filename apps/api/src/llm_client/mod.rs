/// LLM Client — the single point of entry for all model-service calls.
///
/// ARCHITECTURAL RULE: No other module may call the Ollama HTTP API directly.
/// Embedding and generation requests go through `OllamaClient`, and the rest of
/// the crate only sees the `EmbeddingBackend` / `TextGenerator` traits.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const EMBEDDINGS_PATH: &str = "/api/embeddings";
const GENERATE_PATH: &str = "/api/generate";
const MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BASE: Duration = Duration::from_millis(1000);

/// Failure talking to the embedding or generation service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed service response: {0}")]
    Decode(String),

    #[error("Service returned an empty response")]
    EmptyResponse,

    #[error("Service call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Service unavailable after {retries} retries")]
    RetriesExhausted { retries: u32 },
}

/// Produces an embedding vector for already-normalized text.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// Non-streaming text generation. Returns the raw completion text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError>;

    fn model(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Option<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

/// HTTP client for an Ollama-compatible model server.
/// Holds both the embedding and the generation model so one instance serves the whole run.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    embedding_model: String,
    generation_model: String,
    timeout: Duration,
    retry_base: Duration,
}

impl OllamaClient {
    pub fn new(
        base_url: impl Into<String>,
        embedding_model: impl Into<String>,
        generation_model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            embedding_model: embedding_model.into(),
            generation_model: generation_model.into(),
            timeout,
            retry_base: DEFAULT_RETRY_BASE,
        })
    }

    /// Worst-case wall time of one call: every attempt hitting the per-request
    /// timeout plus the backoff sleeps between them.
    pub fn call_budget(&self) -> Duration {
        let backoff: Duration = (1..MAX_RETRIES)
            .map(|attempt| self.retry_base * (1 << (attempt - 1)))
            .sum();
        self.timeout * MAX_RETRIES + backoff
    }

    /// Overrides the first backoff delay (doubles on each further attempt).
    #[cfg(test)]
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    /// POSTs a JSON body and decodes the JSON reply.
    /// Retries on 429, 5xx and transport errors with exponential backoff.
    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ServiceError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error: Option<ServiceError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = self.retry_base * (1 << (attempt - 1));
                warn!(
                    "Model service call to {} attempt {} failed, retrying after {}ms...",
                    path,
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.post(&url).json(body).send().await {
                Ok(r) => r,
                Err(e) if e.is_timeout() => {
                    warn!("Model service call to {} timed out after {:?}", path, self.timeout);
                    last_error = Some(ServiceError::Timeout(self.timeout));
                    continue;
                }
                Err(e) => {
                    last_error = Some(ServiceError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Model service returned {}: {}", status, body);
                last_error = Some(ServiceError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<OllamaError>(&body)
                    .map(|e| e.error)
                    .unwrap_or(body);
                return Err(ServiceError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let bytes = response.bytes().await?;
            return serde_json::from_slice(&bytes).map_err(|e| ServiceError::Decode(e.to_string()));
        }

        Err(last_error.unwrap_or(ServiceError::RetriesExhausted {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl EmbeddingBackend for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            prompt: text,
        };
        let response: EmbeddingResponse = self.post_json(EMBEDDINGS_PATH, &request).await?;
        let embedding = response
            .embedding
            .ok_or_else(|| ServiceError::Decode("missing `embedding` field".to_string()))?;
        if embedding.is_empty() {
            return Err(ServiceError::EmptyResponse);
        }
        debug!("Embedded {} chars into {} dimensions", text.len(), embedding.len());
        Ok(embedding)
    }

    fn model(&self) -> &str {
        &self.embedding_model
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let request = GenerateRequest {
            model: &self.generation_model,
            prompt,
            stream: false,
        };
        let response: GenerateResponse = self.post_json(GENERATE_PATH, &request).await?;

        debug!(
            "Generation succeeded: prompt_tokens={:?}, output_tokens={:?}",
            response.prompt_eval_count, response.eval_count
        );

        match response.response {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(ServiceError::EmptyResponse),
        }
    }

    fn model(&self) -> &str {
        &self.generation_model
    }
}

/// Best-effort extraction of a JSON object from LLM output.
///
/// Drops everything before the first `{` and after the last `}`. Does not
/// validate the result; stray braces in surrounding prose defeat it.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
