//! Storage layer for budgie-retriever
//!
//! Indexed documents live in an [`EmbeddingStore`]: an ordered list of
//! `(id, content, embedding)` records held in memory and persisted as a
//! single JSON array. Search is a linear cosine-similarity scan.
//!
//! ## Key Components
//!
//! - **[`VectorStore`]**: the operations the indexer and search rely on
//! - **[`EmbeddingStore`]**: the in-memory implementation with JSON persistence
//! - **[`cosine_similarity`]**: the scoring function
//!
//! ## On-disk format
//!
//! ```text
//! [
//!   { "id": "guide.md-chunk-1", "content": "TITLE: ...", "embedding": [0.1, ...] },
//!   ...
//! ]
//! ```
//!
//! Unknown extra fields are ignored when loading.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod embedding_store;

pub use embedding_store::EmbeddingStore;

/// One indexed chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Unique within a store, `<file basename>-chunk-<n>` when built by the indexer
    pub id: String,
    /// The rendered chunk text that was embedded
    pub content: String,
    pub embedding: Vec<f32>,
}

/// A record that matched a query, with its cosine similarity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityResult {
    pub id: String,
    pub content: String,
    pub score: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Duplicate record id: {0}")]
    DuplicateId(String),

    #[error("Index file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Malformed index file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode index: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Ordered vector storage with similarity search.
///
/// Records are kept in insertion order; that order breaks ties in
/// [`VectorStore::search`]. All vectors in one store are expected to share a
/// dimensionality. This is not checked on append; a query of a different
/// length simply scores 0.0 against every record.
pub trait VectorStore {
    /// Removes every record. Calling it on an empty store is a no-op.
    fn reset(&mut self);

    /// Adds a record at the end. Fails with [`StoreError::DuplicateId`] when
    /// `id` is already present.
    fn append(&mut self, id: String, content: String, embedding: Vec<f32>) -> Result<(), StoreError>;

    /// All records in insertion order
    fn records(&self) -> &[EmbeddingRecord];

    fn len(&self) -> usize {
        self.records().len()
    }

    fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Scores every record against `query` and returns those with a score of
    /// at least `threshold`, best first. Equal scores keep insertion order.
    fn search(&self, query: &[f32], threshold: f32) -> Vec<SimilarityResult> {
        let mut results: Vec<SimilarityResult> = self
            .records()
            .iter()
            .filter_map(|record| {
                let score = cosine_similarity(query, &record.embedding);
                (score >= threshold).then(|| SimilarityResult {
                    id: record.id.clone(),
                    content: record.content.clone(),
                    score,
                })
            })
            .collect();

        // sort_by is stable
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results
    }
}

/// Cosine similarity of two vectors, in `[-1, 1]`.
///
/// Returns 0.0 when the lengths differ or either vector has zero magnitude.
///
/// ```
/// use budgie_retriever::storage::cosine_similarity;
///
/// assert_eq!(cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]), 1.0);
/// assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
/// assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot_product = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot_product / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = [1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &a), 1.0);

        let b = [0.0, 1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);

        let c = [-1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &c), -1.0);

        let d = [1.0, 2.0, 3.0];
        let e = [2.0, 3.0, 4.0];
        assert!((cosine_similarity(&d, &e) - 0.9926).abs() < 1e-3);
    }

    #[test]
    fn test_cosine_similarity_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 1.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_cosine_similarity_is_scale_invariant() {
        let v = [0.3, -1.7, 2.2, 0.05];
        let scaled: Vec<f32> = v.iter().map(|x| x * 40.0).collect();
        assert!((cosine_similarity(&v, &scaled) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_self_similarity_is_one() {
        let vectors = [
            vec![0.1, 0.2, 0.3, 0.4],
            vec![-5.0, 3.25, 1e-3],
            vec![1e6, 2e6],
        ];
        for v in &vectors {
            assert!((cosine_similarity(v, v) - 1.0).abs() < 1e-6);
        }
    }
}
