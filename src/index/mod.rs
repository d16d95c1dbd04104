
use tracing::{debug, warn};

use crate::{AskdocError, Result};

/// Exact nearest-neighbor index over unit-normalized vectors.
///
/// Scores are inner products, which equal cosine similarity because every
/// stored vector and every query is normalized to unit length first. Callers
/// depend only on the ranked `(slot, score)` contract, so an approximate
/// backend can replace the linear scan without interface changes.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    vectors: Vec<Vec<f32>>,
    dimension: usize,
}

impl VectorIndex {
    /// Bulk-load an index from pre-normalized vectors.
    ///
    /// Fails on an empty input or on vectors of mixed dimension; slot `i`
    /// corresponds to `vectors[i]` for the lifetime of the index.
    #[inline]
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let Some(first) = vectors.first() else {
            return Err(AskdocError::Index(
                "cannot build an index from zero vectors".to_string(),
            ));
        };

        let dimension = first.len();
        if dimension == 0 {
            return Err(AskdocError::Index(
                "cannot build an index from zero-dimension vectors".to_string(),
            ));
        }

        if let Some(position) = vectors.iter().position(|v| v.len() != dimension) {
            return Err(AskdocError::Index(format!(
                "vector {} has dimension {}, expected {}",
                position,
                vectors[position].len(),
                dimension
            )));
        }

        debug!(
            "Built vector index: {} vectors, dimension {}",
            vectors.len(),
            dimension
        );

        Ok(Self { vectors, dimension })
    }

    /// Number of indexed vectors.
    #[inline]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Dimension every indexed vector (and query) must have.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Rank all slots by inner product against `query`, best first.
    ///
    /// Returns at most `top_k` `(slot, score)` pairs; every slot is in
    /// `[0, len)`. A query of the wrong dimension ranks against nothing.
    #[inline]
    pub fn search(&self, query: &[f32], top_k: usize) -> Vec<(usize, f32)> {
        if top_k == 0 {
            return Vec::new();
        }
        if query.len() != self.dimension {
            warn!(
                "Query dimension {} does not match index dimension {}",
                query.len(),
                self.dimension
            );
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(slot, vector)| (slot, dot(query, vector)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);
        scored
    }
}

/// Scale a vector to unit length in place, so that inner products against it
/// are cosine similarities. Zero vectors are left unchanged.
#[inline]
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector
        .iter()
        .fold(0.0f32, |acc, x| x.mul_add(*x, acc))
        .sqrt();
    if norm > f32::EPSILON {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).fold(0.0f32, |acc, (x, y)| x.mul_add(*y, acc))
}
