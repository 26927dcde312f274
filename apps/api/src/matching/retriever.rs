//! Retriever — indexes the job corpus and pulls the jobs closest to the profile.
//!
//! Flow: language filter → embed `title+description+company` → index by id,
//! then embed the profile once and query the top-N.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::matching::embedder::Embedder;
use crate::matching::error::PipelineError;
use crate::matching::language::LanguageFilter;
use crate::matching::vector_index::{QueryHit, VectorIndex};
use crate::models::JobRecord;

pub const DEFAULT_TOP_N: usize = 25;

/// Per-job outcomes of the indexing phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    /// Wrong language, undetectable language, or empty description.
    pub language_filtered: usize,
    pub embedding_failed: usize,
    pub store_failed: usize,
    pub indexed: usize,
}

/// Ranked hits plus the corpus they resolve against.
pub struct Retrieval<'a> {
    pub hits: Vec<QueryHit>,
    pub summary: IndexSummary,
    corpus: HashMap<&'a str, &'a JobRecord>,
}

impl<'a> Retrieval<'a> {
    /// Looks up a retrieved id in the source corpus. A miss means the index and
    /// corpus disagree, which is fatal.
    pub fn lookup(&self, id: &str) -> Result<&'a JobRecord, PipelineError> {
        self.corpus
            .get(id)
            .copied()
            .ok_or_else(|| PipelineError::InternalConsistency(id.to_string()))
    }

    /// Resolves every hit to its record, in rank order.
    pub fn candidates(&self) -> Result<Vec<JobRecord>, PipelineError> {
        self.hits
            .iter()
            .map(|hit| self.lookup(&hit.id).cloned())
            .collect()
    }
}

pub struct Retriever {
    embedder: Embedder,
    language: LanguageFilter,
    top_n: usize,
}

impl Retriever {
    pub fn new(embedder: Embedder, language: LanguageFilter, top_n: usize) -> Self {
        Self {
            embedder,
            language,
            top_n,
        }
    }

    /// Embeds and indexes every job that passes the language filter.
    /// Embedding or storage failures skip the job; they never abort indexing.
    pub async fn build_index(&self, jobs: &[JobRecord]) -> (VectorIndex, IndexSummary) {
        let mut index = VectorIndex::new();
        let mut summary = IndexSummary::default();

        for job in jobs {
            if job.description.trim().is_empty() || !self.language.matches(&job.description) {
                debug!(
                    "Job {} skipped: description is not '{}'",
                    job.id,
                    self.language.target()
                );
                summary.language_filtered += 1;
                continue;
            }

            let vector = match self.embedder.embed(&job.embedding_text()).await {
                Ok(v) => v,
                Err(e) => {
                    warn!("Job {} skipped: embedding failed: {e}", job.id);
                    summary.embedding_failed += 1;
                    continue;
                }
            };

            match index.add(
                vec![job.id.clone()],
                vec![vector],
                vec![job.description.clone()],
            ) {
                Ok(()) => {
                    debug!("Indexed job {} ({})", job.id, job.title);
                    summary.indexed += 1;
                }
                Err(e) => {
                    warn!("Job {} skipped: failed to store embedding: {e}", job.id);
                    summary.store_failed += 1;
                }
            }
        }

        info!(
            "Indexed {}/{} jobs with {} (dims={:?}, {} filtered by language, {} embedding failures)",
            index.len(),
            jobs.len(),
            self.embedder.model(),
            index.dimensions(),
            summary.language_filtered,
            summary.embedding_failed
        );

        (index, summary)
    }

    /// Builds the index, embeds the profile and returns the top-N most similar jobs.
    ///
    /// The profile is not embedded when nothing was indexed. A profile embedding
    /// failure is fatal.
    pub async fn retrieve<'a>(
        &self,
        jobs: &'a [JobRecord],
        profile: &str,
    ) -> Result<Retrieval<'a>, PipelineError> {
        let (index, summary) = self.build_index(jobs).await;
        let corpus: HashMap<&str, &JobRecord> =
            jobs.iter().map(|job| (job.id.as_str(), job)).collect();

        if index.is_empty() {
            info!("Index is empty, no candidates to retrieve");
            return Ok(Retrieval {
                hits: Vec::new(),
                summary,
                corpus,
            });
        }

        let profile_vector = self
            .embedder
            .embed(profile)
            .await
            .map_err(PipelineError::ProfileEmbedding)?;

        let hits = index.query(&profile_vector, self.top_n)?;
        info!(
            "Retrieved {} candidates (top_n={})",
            hits.len(),
            self.top_n
        );

        Ok(Retrieval {
            hits,
            summary,
            corpus,
        })
    }
}
