//! Curator — asks the LLM to score and summarize each retrieved job against the profile.
//!
//! Per job: `Candidate → Included | Excluded (score 0) | Failed`. Only included
//! jobs carry enrichment and move on to ranking. A failure never aborts the batch.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::llm_client::{extract_json_object, ServiceError, TextGenerator};
use crate::matching::prompts::build_curation_prompt;
use crate::models::{CurationResult, JobRecord};

const SUITABILITY_FIELD: &str = "Suitability";
const JOB_SUMMARY_FIELD: &str = "Job_summary";
const MATCH_SUMMARY_FIELD: &str = "Match_summary";
const MAX_SUITABILITY: i64 = 5;

#[derive(Debug, Error)]
pub enum CurationError {
    #[error("LLM call failed: {0}")]
    Service(#[from] ServiceError),

    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),

    #[error("no JSON object in LLM output")]
    NoJson,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("curation task aborted: {0}")]
    Aborted(String),
}

#[derive(Debug)]
pub enum CurationOutcome {
    Included(JobRecord),
    Excluded { id: String },
    Failed { id: String, error: CurationError },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurationFailure {
    pub id: String,
    pub reason: String,
}

/// Outcomes of a curation batch, each list in retrieval order.
#[derive(Debug, Default)]
pub struct CurationReport {
    pub included: Vec<JobRecord>,
    pub excluded: Vec<String>,
    pub failures: Vec<CurationFailure>,
}

impl CurationReport {
    fn push(&mut self, outcome: CurationOutcome) {
        match outcome {
            CurationOutcome::Included(job) => self.included.push(job),
            CurationOutcome::Excluded { id } => self.excluded.push(id),
            CurationOutcome::Failed { id, error } => self.failures.push(CurationFailure {
                id,
                reason: error.to_string(),
            }),
        }
    }
}

#[derive(Clone)]
pub struct Curator {
    llm: Arc<dyn TextGenerator>,
    concurrency: usize,
    call_timeout: Duration,
}

impl Curator {
    pub fn new(llm: Arc<dyn TextGenerator>, concurrency: usize, call_timeout: Duration) -> Self {
        Self {
            llm,
            concurrency: concurrency.max(1),
            call_timeout,
        }
    }

    /// Curates a single job.
    pub async fn curate(&self, profile: &str, mut job: JobRecord) -> CurationOutcome {
        let prompt = build_curation_prompt(profile, &job.description);
        debug!("Curating job {} with {}", job.id, self.llm.model());

        let result = match tokio::time::timeout(self.call_timeout, self.llm.generate(&prompt)).await
        {
            Ok(Ok(raw)) => parse_curation_response(&raw),
            Ok(Err(e)) => Err(CurationError::Service(e)),
            Err(_) => Err(CurationError::Timeout(self.call_timeout)),
        };

        match result {
            Ok(curation) if curation.suitability > 0 => {
                info!("Job {} ({}) scored {}", job.id, job.title, curation.suitability);
                job.apply_curation(curation);
                CurationOutcome::Included(job)
            }
            Ok(_) => {
                debug!("Job {} scored 0, excluded", job.id);
                CurationOutcome::Excluded { id: job.id }
            }
            Err(error) => {
                warn!("Job {} dropped: {error}", job.id);
                CurationOutcome::Failed { id: job.id, error }
            }
        }
    }

    /// Curates `jobs` in order. With `concurrency > 1` calls run on a bounded
    /// worker pool; outcomes are still reported in input order.
    pub async fn curate_all(&self, profile: &str, jobs: Vec<JobRecord>) -> CurationReport {
        let total = jobs.len();
        let mut report = CurationReport::default();

        if self.concurrency <= 1 || total <= 1 {
            for job in jobs {
                report.push(self.curate(profile, job).await);
            }
        } else {
            for outcome in self.curate_pooled(profile, jobs).await {
                report.push(outcome);
            }
        }

        info!(
            "Curation finished: {} included, {} excluded, {} failed (of {})",
            report.included.len(),
            report.excluded.len(),
            report.failures.len(),
            total
        );
        report
    }

    async fn curate_pooled(&self, profile: &str, jobs: Vec<JobRecord>) -> Vec<CurationOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let profile: Arc<str> = Arc::from(profile);
        let ids: Vec<String> = jobs.iter().map(|job| job.id.clone()).collect();
        let mut set = JoinSet::new();

        for (position, job) in jobs.into_iter().enumerate() {
            let curator = self.clone();
            let profile = Arc::clone(&profile);
            let semaphore = Arc::clone(&semaphore);
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (position, curator.curate(&profile, job).await)
            });
        }

        let mut slots: Vec<Option<CurationOutcome>> = ids.iter().map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((position, outcome)) => slots[position] = Some(outcome),
                Err(e) => error!("Curation task failed to complete: {e}"),
            }
        }

        slots
            .into_iter()
            .zip(ids)
            .map(|(slot, id)| {
                slot.unwrap_or_else(|| CurationOutcome::Failed {
                    id,
                    error: CurationError::Aborted("worker did not return".to_string()),
                })
            })
            .collect()
    }
}

/// Strictly parses an LLM reply into a `CurationResult`.
///
/// The object is located with `extract_json_object` first; everything after
/// that is strict: all three fields present, summaries as strings, and a
/// `Suitability` that coerces to an integer in 0–5 (booleans count as 0/1).
pub fn parse_curation_response(raw: &str) -> Result<CurationResult, CurationError> {
    let json = extract_json_object(raw).ok_or(CurationError::NoJson)?;
    let value: Value = serde_json::from_str(json)?;
    let object = value.as_object().ok_or(CurationError::NoJson)?;

    let suitability = coerce_suitability(
        object
            .get(SUITABILITY_FIELD)
            .ok_or(CurationError::MissingField(SUITABILITY_FIELD))?,
    )?;

    Ok(CurationResult {
        suitability,
        job_summary: string_field(object, JOB_SUMMARY_FIELD)?,
        match_summary: string_field(object, MATCH_SUMMARY_FIELD)?,
    })
}

fn coerce_suitability(value: &Value) -> Result<u8, CurationError> {
    let invalid = |reason: String| CurationError::InvalidField {
        field: SUITABILITY_FIELD,
        reason,
    };

    let score = match value {
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i,
            (None, Some(f)) if f.is_finite() => f.trunc() as i64,
            _ => return Err(invalid(format!("{n} is not an integer"))),
        },
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(format!("'{s}' is not an integer")))?,
        Value::Bool(b) => i64::from(*b),
        other => return Err(invalid(format!("expected a number, got {other}"))),
    };

    if !(0..=MAX_SUITABILITY).contains(&score) {
        return Err(invalid(format!("{score} is outside 0-{MAX_SUITABILITY}")));
    }
    // Range checked above.
    Ok(score as u8)
}

fn string_field(object: &Map<String, Value>, field: &'static str) -> Result<String, CurationError> {
    match object.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(CurationError::InvalidField {
            field,
            reason: format!("expected a string, got {other}"),
        }),
        None => Err(CurationError::MissingField(field)),
    }
}
