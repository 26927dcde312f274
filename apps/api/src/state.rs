use std::sync::Arc;

use crate::config::Config;
use crate::matching::pipeline::MatchPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Built once at startup with explicit model-service dependencies.
    pub pipeline: Arc<MatchPipeline>,
    pub config: Config,
}
