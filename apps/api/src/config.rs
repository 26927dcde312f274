use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::matching::retriever::DEFAULT_TOP_N;

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub ollama_url: String,
    pub embedding_model: String,
    pub llm_model: String,
    pub n_results: usize,
    /// ISO 639-3 code, e.g. "eng".
    pub target_language: String,
    pub curation_concurrency: usize,
    pub llm_timeout: Duration,
    pub missing_suitability_default: u8,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let curation_concurrency: usize = parse_env("CURATION_CONCURRENCY", 1)?;
        anyhow::ensure!(
            curation_concurrency >= 1,
            "CURATION_CONCURRENCY must be at least 1"
        );

        let missing_suitability_default: u8 = parse_env("MISSING_SUITABILITY_DEFAULT", 2)?;
        anyhow::ensure!(
            missing_suitability_default <= 5,
            "MISSING_SUITABILITY_DEFAULT must be between 0 and 5"
        );

        Ok(Config {
            ollama_url: env_or("OLLAMA_URL", "http://localhost:11434"),
            embedding_model: env_or("EMBEDDING_MODEL", "nomic-embed-text"),
            llm_model: env_or("LLM_MODEL", "llama3.2"),
            n_results: parse_env("N_RESULTS", DEFAULT_TOP_N)?,
            target_language: env_or("TARGET_LANGUAGE", "eng"),
            curation_concurrency,
            llm_timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 120)?),
            missing_suitability_default,
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
