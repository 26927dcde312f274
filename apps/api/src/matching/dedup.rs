//! Deduplicator — removes repeated job records, keeping the first occurrence.

use std::collections::HashSet;

use crate::models::{JobField, JobRecord};

/// Removes records whose fields are all equal to an earlier record.
///
/// Comparison goes through `JobRecord::fields`, which is ordered by field name,
/// so field order never hides a duplicate.
pub fn remove_exact_duplicates(jobs: Vec<JobRecord>) -> Vec<JobRecord> {
    let mut seen: HashSet<Vec<(&'static str, String)>> = HashSet::new();
    let mut unique = Vec::with_capacity(jobs.len());

    for job in jobs {
        let key: Vec<(&'static str, String)> = job
            .fields()
            .into_iter()
            .map(|(name, value)| (name, value.into_owned()))
            .collect();
        if seen.insert(key) {
            unique.push(job);
        }
    }

    unique
}

/// Removes records whose `key` field repeats an earlier record's value.
pub fn remove_duplicates_by(jobs: Vec<JobRecord>, key: JobField) -> Vec<JobRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique = Vec::with_capacity(jobs.len());

    for job in jobs {
        let value = key.value(&job).into_owned();
        if seen.insert(value) {
            unique.push(job);
        }
    }

    unique
}
