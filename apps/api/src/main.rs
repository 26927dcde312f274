mod config;
mod errors;
mod llm_client;
mod matching;
mod models;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::OllamaClient;
use crate::matching::curator::Curator;
use crate::matching::embedder::Embedder;
use crate::matching::language::{validate_language_code, LanguageFilter, WhatlangDetector};
use crate::matching::pipeline::MatchPipeline;
use crate::matching::ranker::RankingPolicy;
use crate::matching::retriever::Retriever;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobMatch API v{}", env!("CARGO_PKG_VERSION"));

    validate_language_code(&config.target_language).map_err(anyhow::Error::msg)?;

    // One model-service client, shared by the embedder and the curator
    let ollama = Arc::new(
        OllamaClient::new(
            config.ollama_url.clone(),
            config.embedding_model.clone(),
            config.llm_model.clone(),
            config.llm_timeout,
        )
        .context("Failed to build model service client")?,
    );
    info!(
        "Model service at {} (embedding: {}, llm: {})",
        config.ollama_url, config.embedding_model, config.llm_model
    );

    let retriever = Retriever::new(
        Embedder::new(ollama.clone()),
        LanguageFilter::new(Arc::new(WhatlangDetector), config.target_language.clone()),
        config.n_results,
    );
    // LLM_TIMEOUT_SECS bounds each HTTP attempt; the curation deadline spans all retries.
    let curation_deadline = ollama.call_budget();
    let curator = Curator::new(ollama, config.curation_concurrency, curation_deadline);
    let ranking = RankingPolicy {
        missing_suitability: config.missing_suitability_default,
    };
    info!(
        "Pipeline: top_n={}, language={}, curation_concurrency={}, curation_deadline={:?}",
        config.n_results, config.target_language, config.curation_concurrency, curation_deadline
    );

    let state = AppState {
        pipeline: Arc::new(MatchPipeline::new(retriever, curator, ranking)),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
