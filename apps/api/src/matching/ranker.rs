//! Ranker — final ordering of curated jobs.

use std::cmp::Reverse;

use crate::models::JobRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingPolicy {
    /// Score assumed for a record without `suitability`. Curation only emits
    /// scored records, so this matters for callers that rank foreign input.
    pub missing_suitability: u8,
}

impl Default for RankingPolicy {
    fn default() -> Self {
        Self {
            missing_suitability: 2,
        }
    }
}

impl RankingPolicy {
    fn effective_score(&self, job: &JobRecord) -> u8 {
        job.suitability.unwrap_or(self.missing_suitability)
    }
}

/// Drops jobs whose effective suitability is 0 and sorts the rest by descending
/// suitability. The sort is stable: equal scores keep their input order.
pub fn rank(jobs: Vec<JobRecord>, policy: &RankingPolicy) -> Vec<JobRecord> {
    let mut ranked: Vec<JobRecord> = jobs
        .into_iter()
        .filter(|job| policy.effective_score(job) > 0)
        .collect();
    ranked.sort_by_key(|job| Reverse(policy.effective_score(job)));
    ranked
}
