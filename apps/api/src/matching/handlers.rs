//! Axum route handlers for the Matching API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::matching::dedup::{remove_duplicates_by, remove_exact_duplicates};
use crate::matching::pipeline::MatchReport;
use crate::models::{JobField, JobRecord};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    #[serde(default)]
    pub profile: String,
    #[serde(default)]
    pub jobs: Vec<JobRecord>,
}

#[derive(Debug, Deserialize)]
pub struct DedupRequest {
    #[serde(default)]
    pub jobs: Vec<JobRecord>,
    /// Field name for key-based dedup; exact dedup when absent.
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DedupResponse {
    pub jobs: Vec<JobRecord>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/matches
///
/// Runs the full matching pipeline and returns the ranked, enriched jobs.
pub async fn handle_match(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchReport>, AppError> {
    if request.profile.trim().is_empty() {
        return Err(AppError::Validation("profile cannot be empty".to_string()));
    }

    let report = state.pipeline.run(request.jobs, &request.profile).await?;
    Ok(Json(report))
}

/// POST /api/v1/jobs/dedup
pub async fn handle_dedup(
    Json(request): Json<DedupRequest>,
) -> Result<Json<DedupResponse>, AppError> {
    let jobs = match request.key.as_deref() {
        None => remove_exact_duplicates(request.jobs),
        Some(key) => {
            let field: JobField = key.parse().map_err(AppError::Validation)?;
            remove_duplicates_by(request.jobs, field)
        }
    };
    Ok(Json(DedupResponse { jobs }))
}
