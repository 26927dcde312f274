//! In-memory similarity index scoped to one matching run.
//!
//! Entries are `(id, vector, document)` triples compared by cosine similarity.
//! Nothing is persisted.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IndexError {
    #[error("batch length mismatch: {ids} ids, {vectors} vectors, {documents} documents")]
    LengthMismatch {
        ids: usize,
        vectors: usize,
        documents: usize,
    },

    #[error("vector for '{id}' has {actual} dimensions, index expects {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate id '{0}'")]
    DuplicateId(String),

    #[error("empty vector for '{0}'")]
    EmptyVector(String),
}

#[derive(Debug, Clone)]
struct IndexEntry {
    id: String,
    vector: Vec<f32>,
    norm: f32,
    #[allow(dead_code)]
    document: String,
}

/// One query result. `rank` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryHit {
    pub id: String,
    pub similarity: f32,
    pub rank: usize,
}

#[derive(Debug, Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    ids: HashSet<String>,
    dimensions: Option<usize>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimension fixed by the first stored vector.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// Adds a batch of entries. The whole batch is validated before anything is
    /// stored, so a failed call leaves the index unchanged.
    pub fn add(
        &mut self,
        ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
        documents: Vec<String>,
    ) -> Result<(), IndexError> {
        if ids.len() != vectors.len() || ids.len() != documents.len() {
            return Err(IndexError::LengthMismatch {
                ids: ids.len(),
                vectors: vectors.len(),
                documents: documents.len(),
            });
        }

        let mut expected = self.dimensions;
        let mut batch_ids: HashSet<&str> = HashSet::with_capacity(ids.len());
        for (id, vector) in ids.iter().zip(&vectors) {
            if vector.is_empty() {
                return Err(IndexError::EmptyVector(id.clone()));
            }
            match expected {
                Some(dim) if dim != vector.len() => {
                    return Err(IndexError::DimensionMismatch {
                        id: id.clone(),
                        expected: dim,
                        actual: vector.len(),
                    });
                }
                Some(_) => {}
                None => expected = Some(vector.len()),
            }
            if self.ids.contains(id) || !batch_ids.insert(id.as_str()) {
                return Err(IndexError::DuplicateId(id.clone()));
            }
        }

        self.dimensions = expected;
        for ((id, vector), document) in ids.into_iter().zip(vectors).zip(documents) {
            let norm = compute_norm(&vector);
            self.ids.insert(id.clone());
            self.entries.push(IndexEntry {
                id,
                vector,
                norm,
                document,
            });
        }
        Ok(())
    }

    /// Returns up to `k` entries ordered by descending cosine similarity.
    /// Equal similarities keep insertion order. An empty index yields no hits.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryHit>, IndexError> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if let Some(dim) = self.dimensions {
            if dim != vector.len() {
                return Err(IndexError::DimensionMismatch {
                    id: "<query>".to_string(),
                    expected: dim,
                    actual: vector.len(),
                });
            }
        }

        let query_norm = compute_norm(vector);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                (
                    i,
                    cosine_similarity_with_norm(vector, query_norm, &entry.vector, entry.norm),
                )
            })
            .collect();

        // Stable sort: ties stay in insertion order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(position, (i, similarity))| QueryHit {
                id: self.entries[i].id.clone(),
                similarity,
                rank: position + 1,
            })
            .collect())
    }
}

fn compute_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine_similarity_with_norm(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let similarity = dot / (a_norm * b_norm);
    if similarity.is_nan() {
        0.0
    } else {
        similarity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_one(index: &mut VectorIndex, id: &str, vector: Vec<f32>) -> Result<(), IndexError> {
        index.add(vec![id.to_string()], vec![vector], vec![format!("doc {id}")])
    }

    #[test]
    fn test_empty_index_returns_no_hits() {
        let index = VectorIndex::new();
        assert!(index.query(&[1.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_single_entry_round_trip() {
        let mut index = VectorIndex::new();
        let vector = vec![0.3, -0.2, 0.9];
        add_one(&mut index, "42", vector.clone()).unwrap();

        let hits = index.query(&vector, 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "42");
        assert_eq!(hits[0].rank, 1);
        assert!((hits[0].similarity - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_results_ordered_by_similarity() {
        let mut index = VectorIndex::new();
        index
            .add(
                vec!["far".into(), "near".into(), "mid".into()],
                vec![vec![0.0, 1.0], vec![1.0, 0.05], vec![1.0, 1.0]],
                vec!["a".into(), "b".into(), "c".into()],
            )
            .unwrap();

        let hits = index.query(&[1.0, 0.0], 10).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);
        assert_eq!(hits.iter().map(|h| h.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_query_truncates_to_k() {
        let mut index = VectorIndex::new();
        for i in 0..10 {
            add_one(&mut index, &i.to_string(), vec![1.0, i as f32]).unwrap();
        }
        assert_eq!(index.query(&[1.0, 0.0], 3).unwrap().len(), 3);
        assert_eq!(index.query(&[1.0, 0.0], 0).unwrap().len(), 0);
        assert_eq!(index.query(&[1.0, 0.0], 50).unwrap().len(), 10);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut index = VectorIndex::new();
        add_one(&mut index, "first", vec![2.0, 0.0]).unwrap();
        add_one(&mut index, "second", vec![1.0, 0.0]).unwrap();
        add_one(&mut index, "third", vec![3.0, 0.0]).unwrap();

        let hits = index.query(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_dimension_mismatch_rejects_whole_batch() {
        let mut index = VectorIndex::new();
        add_one(&mut index, "a", vec![1.0, 0.0]).unwrap();

        let result = index.add(
            vec!["b".into(), "c".into()],
            vec![vec![0.0, 1.0], vec![0.0, 1.0, 0.0]],
            vec!["b".into(), "c".into()],
        );
        assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut index = VectorIndex::new();
        add_one(&mut index, "a", vec![1.0]).unwrap();
        assert_eq!(
            add_one(&mut index, "a", vec![2.0]),
            Err(IndexError::DuplicateId("a".to_string()))
        );

        let within_batch = index.add(
            vec!["b".into(), "b".into()],
            vec![vec![1.0], vec![1.0]],
            vec![String::new(), String::new()],
        );
        assert!(matches!(within_batch, Err(IndexError::DuplicateId(_))));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut index = VectorIndex::new();
        let result = index.add(vec!["a".into()], vec![], vec!["doc".into()]);
        assert!(matches!(result, Err(IndexError::LengthMismatch { .. })));
        assert!(index.is_empty());
        assert_eq!(index.dimensions(), None);
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let mut index = VectorIndex::new();
        add_one(&mut index, "a", vec![1.0, 0.0]).unwrap();
        assert!(index.query(&[1.0, 0.0, 0.0], 1).is_err());
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        let mut index = VectorIndex::new();
        add_one(&mut index, "zero", vec![0.0, 0.0]).unwrap();
        let hits = index.query(&[1.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].similarity, 0.0);
    }
}
