//! Matching pipeline — one run from raw job records to a ranked report.
//!
//! Flow: dedup → assign ids → retrieve (language filter, embed, index, query) →
//!       curate (LLM score + summaries) → rank.
//!
//! Stages run strictly one after another. Only profile-level and
//! index/corpus consistency failures abort a run.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::matching::curator::{CurationFailure, Curator};
use crate::matching::dedup::remove_exact_duplicates;
use crate::matching::error::PipelineError;
use crate::matching::ranker::{rank, RankingPolicy};
use crate::matching::retriever::Retriever;
use crate::models::JobRecord;

/// Counts of what happened to the jobs of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub received: usize,
    pub unique: usize,
    pub language_filtered: usize,
    pub embedding_failed: usize,
    pub store_failed: usize,
    pub indexed: usize,
    pub candidates: usize,
    pub included: usize,
    pub excluded: usize,
    pub failed: usize,
    pub failures: Vec<CurationFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub jobs: Vec<JobRecord>,
    pub stats: RunStats,
}

pub struct MatchPipeline {
    retriever: Retriever,
    curator: Curator,
    ranking: RankingPolicy,
}

impl MatchPipeline {
    pub fn new(retriever: Retriever, curator: Curator, ranking: RankingPolicy) -> Self {
        Self {
            retriever,
            curator,
            ranking,
        }
    }

    /// Runs the full pipeline for one profile against one job corpus.
    ///
    /// Steps:
    /// 1. remove_exact_duplicates() → unique jobs
    /// 2. assign_ids() → ids for records that arrived without one
    /// 3. retriever.retrieve() → top-N candidates
    /// 4. curator.curate_all() → included / excluded / failed
    /// 5. rank() → final order
    pub async fn run(&self, jobs: Vec<JobRecord>, profile: &str) -> Result<MatchReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let received = jobs.len();

        // Step 1-2: Dedup and identify
        let mut jobs = remove_exact_duplicates(jobs);
        assign_ids(&mut jobs)?;
        info!("Run {run_id}: {} unique jobs of {received} received", jobs.len());

        // Step 3: Retrieve
        let retrieval = self.retriever.retrieve(&jobs, profile).await?;
        let candidates = retrieval.candidates()?;
        let index_summary = retrieval.summary.clone();
        let candidate_count = candidates.len();

        // Step 4: Curate
        let curation = self.curator.curate_all(profile, candidates).await;
        let (included, excluded, failures) =
            (curation.included, curation.excluded, curation.failures);

        // Step 5: Rank
        debug_assert!(included.iter().all(JobRecord::is_curated));
        let included_count = included.len();
        let ranked = rank(included, &self.ranking);
        info!("Run {run_id}: {} jobs in final ranking", ranked.len());

        Ok(MatchReport {
            run_id,
            generated_at: Utc::now(),
            jobs: ranked,
            stats: RunStats {
                received,
                unique: jobs.len(),
                language_filtered: index_summary.language_filtered,
                embedding_failed: index_summary.embedding_failed,
                store_failed: index_summary.store_failed,
                indexed: index_summary.indexed,
                candidates: candidate_count,
                included: included_count,
                excluded: excluded.len(),
                failed: failures.len(),
                failures,
            },
        })
    }
}

/// Checks that supplied ids are unique, then numbers records without an id by
/// their 1-based position, moving past any number a supplied id already holds.
pub fn assign_ids(jobs: &mut [JobRecord]) -> Result<(), PipelineError> {
    let mut taken: HashSet<String> = HashSet::with_capacity(jobs.len());
    for job in jobs.iter().filter(|job| !job.id.trim().is_empty()) {
        if !taken.insert(job.id.clone()) {
            return Err(PipelineError::DuplicateJobId(job.id.clone()));
        }
    }

    let mut next = 1;
    for (position, job) in jobs.iter_mut().enumerate() {
        if !job.id.trim().is_empty() {
            continue;
        }
        next = next.max(position + 1);
        while taken.contains(&next.to_string()) {
            next += 1;
        }
        job.id = next.to_string();
        taken.insert(job.id.clone());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::matching::embedder::Embedder;
    use crate::matching::language::LanguageFilter;
    use crate::matching::testing::{job, MarkerLanguageDetector, RecordingEmbedder, ScriptedGenerator};

    fn pipeline(embedder: Arc<RecordingEmbedder>, llm: Arc<ScriptedGenerator>) -> MatchPipeline {
        MatchPipeline::new(
            Retriever::new(
                Embedder::new(embedder),
                LanguageFilter::new(Arc::new(MarkerLanguageDetector), "eng"),
                25,
            ),
            Curator::new(llm, 1, Duration::from_secs(5)),
            RankingPolicy::default(),
        )
    }

    #[test]
    fn test_assign_ids_numbers_missing_ids() {
        let mut jobs = vec![job("", "A", "", ""), job("", "B", "", ""), job("x", "C", "", "")];
        assign_ids(&mut jobs).unwrap();
        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "x"]);
    }

    #[test]
    fn test_assign_ids_rejects_duplicates() {
        let mut jobs = vec![job("7", "A", "", ""), job("7", "B", "", "")];
        assert!(matches!(
            assign_ids(&mut jobs),
            Err(PipelineError::DuplicateJobId(id)) if id == "7"
        ));
    }

    #[test]
    fn test_assign_ids_skips_numbers_held_by_supplied_ids() {
        let mut jobs = vec![
            job("", "A", "", ""),
            job("1", "B", "", ""),
            job("", "C", "", ""),
            job("4", "D", "", ""),
            job("", "E", "", ""),
        ];
        assign_ids(&mut jobs).unwrap();
        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "3", "4", "5"]);
    }

    #[tokio::test]
    async fn test_run_accepts_missing_id_next_to_supplied_one() {
        let embedder = Arc::new(RecordingEmbedder::default());
        let llm = Arc::new(ScriptedGenerator::new().respond(
            "rust",
            r#"{"Suitability":3,"Job_summary":"a","Match_summary":"b"}"#,
        ));
        let jobs = vec![
            job("", "A", "[eng] rust one", ""),
            job("1", "B", "[eng] rust two", ""),
        ];

        let report = pipeline(embedder, llm).run(jobs, "rust").await.unwrap();

        let mut ids: Vec<&str> = report.jobs.iter().map(|j| j.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_end_to_end_three_jobs() {
        let embedder = Arc::new(RecordingEmbedder::default());
        let llm = Arc::new(
            ScriptedGenerator::new()
                .respond(
                    "distributed systems",
                    r#"Here you go: {"Suitability": 4, "Job_summary": "Backend", "Match_summary": "Good"}"#,
                )
                .respond(
                    "pastry",
                    r#"{"Suitability": 0, "Job_summary": "Bakery", "Match_summary": "None"}"#,
                ),
        );
        let jobs = vec![
            job("", "Backend Engineer", "[eng] Rust distributed systems work", "Acme"),
            job("", "Pastry Chef", "[eng] Bake pastry every morning", "Cafe"),
            job("", "Ingénieur", "[fra] Systèmes distribués en Rust", "Société"),
        ];

        let report = pipeline(embedder, llm.clone())
            .run(jobs, "Rust engineer with distributed systems experience")
            .await
            .unwrap();

        assert_eq!(report.jobs.len(), 1);
        assert_eq!(report.jobs[0].title, "Backend Engineer");
        assert_eq!(report.jobs[0].suitability, Some(4));
        assert_eq!(report.jobs[0].summary.as_deref(), Some("Backend"));

        // The foreign job never reached the curator; the 0-scored one did.
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts.iter().all(|p| !p.contains("[fra]")));
        assert!(prompts.iter().any(|p| p.contains("pastry")));

        assert_eq!(report.stats.received, 3);
        assert_eq!(report.stats.language_filtered, 1);
        assert_eq!(report.stats.indexed, 2);
        assert_eq!(report.stats.candidates, 2);
        assert_eq!(report.stats.included, 1);
        assert_eq!(report.stats.excluded, 1);
        assert_eq!(report.stats.failed, 0);
    }

    #[tokio::test]
    async fn test_parse_failures_are_reported_not_fatal() {
        let embedder = Arc::new(RecordingEmbedder::default());
        let llm = Arc::new(
            ScriptedGenerator::new()
                .respond("alpha", r#"{"Suitability":3,"Job_summary":"a"}"#)
                .respond("beta", r#"{"Suitability":2,"Job_summary":"a","Match_summary":"b"}"#),
        );
        let jobs = vec![
            job("a", "A", "[eng] alpha", ""),
            job("b", "B", "[eng] beta", ""),
        ];

        let report = pipeline(embedder, llm).run(jobs, "profile").await.unwrap();

        assert_eq!(report.jobs.len(), 1);
        assert_eq!(report.jobs[0].id, "b");
        assert_eq!(report.stats.failed, 1);
        assert_eq!(report.stats.failures[0].id, "a");
    }

    #[tokio::test]
    async fn test_duplicates_are_curated_once() {
        let embedder = Arc::new(RecordingEmbedder::default());
        let llm = Arc::new(ScriptedGenerator::new().respond(
            "rust",
            r#"{"Suitability":5,"Job_summary":"a","Match_summary":"b"}"#,
        ));
        let posting = job("", "Rust Dev", "[eng] rust", "Acme");
        let jobs = vec![posting.clone(), posting.clone(), posting];

        let report = pipeline(embedder, llm.clone()).run(jobs, "rust").await.unwrap();

        assert_eq!(report.stats.unique, 1);
        assert_eq!(report.jobs.len(), 1);
        assert_eq!(report.jobs[0].id, "1");
        assert_eq!(llm.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_profile_embedding_failure_aborts_run() {
        let embedder = Arc::new(RecordingEmbedder::failing_on("PROFILE"));
        let llm = Arc::new(ScriptedGenerator::new());
        let jobs = vec![job("1", "A", "[eng] posting", "")];

        let result = pipeline(embedder, llm).run(jobs, "PROFILE").await;
        assert!(matches!(result, Err(PipelineError::ProfileEmbedding(_))));
    }

    #[tokio::test]
    async fn test_empty_corpus_yields_empty_report() {
        let embedder = Arc::new(RecordingEmbedder::default());
        let llm = Arc::new(ScriptedGenerator::new());

        let report = pipeline(embedder, llm).run(vec![], "profile").await.unwrap();
        assert!(report.jobs.is_empty());
        assert_eq!(report.stats.received, 0);
    }
}
