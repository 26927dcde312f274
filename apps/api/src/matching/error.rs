use thiserror::Error;

use crate::llm_client::ServiceError;
use crate::matching::vector_index::IndexError;

/// Failures that abort a whole matching run. Per-job failures never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("profile embedding failed: {0}")]
    ProfileEmbedding(#[source] ServiceError),

    #[error("similarity query failed: {0}")]
    Query(#[from] IndexError),

    #[error("retrieved id '{0}' is not part of the job corpus")]
    InternalConsistency(String),

    /// Input problem: two distinct records share an id after deduplication.
    #[error("job id '{0}' is used by more than one distinct record")]
    DuplicateJobId(String),
}
