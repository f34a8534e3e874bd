//! Pairwise cosine similarity over TF-IDF rows (offline analysis only)
//!
//! The matrix is dense N×N f64: 60k movies already need ~29 GB, so this is
//! meant for moderate catalogs and never for the serving path.

use ndarray::{Array2, Axis};
use rayon::prelude::*;

use crate::services::vectorizer::FeatureVector;

/// Dense symmetric cosine-similarity matrix
#[derive(Debug, Clone)]
pub struct SimilarityMatrix(Array2<f64>);

impl SimilarityMatrix {
    pub fn len(&self) -> usize {
        self.0.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.0.nrows() == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.0[[i, j]]
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.0
    }

    /// The `k` rows most similar to `row`, excluding itself, highest first
    ///
    /// Ties keep row order.
    pub fn most_similar(&self, row: usize, k: usize) -> Vec<(usize, f64)> {
        if row >= self.len() {
            return Vec::new();
        }
        let mut scored: Vec<(usize, f64)> = self
            .0
            .row(row)
            .iter()
            .copied()
            .enumerate()
            .filter(|&(j, _)| j != row)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        scored
    }
}

/// Cosine similarity of every pair of vectors
///
/// Diagonal is 1.0, or 0.0 for a zero vector.
pub fn pairwise_cosine(vectors: &[FeatureVector]) -> SimilarityMatrix {
    let n = vectors.len();
    tracing::info!(rows = n, "Calculating cosine similarity");

    let norms: Vec<f64> = vectors.par_iter().map(FeatureVector::norm).collect();

    let mut matrix = Array2::<f64>::zeros((n, n));
    matrix
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, mut row)| {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = if i == j {
                    if norms[i] > 0.0 {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    let denom = norms[i] * norms[j];
                    if denom > 0.0 {
                        (vectors[i].dot(&vectors[j]) / denom).clamp(-1.0, 1.0)
                    } else {
                        0.0
                    }
                };
            }
        });

    tracing::info!(shape = ?matrix.dim(), "Cosine similarity matrix ready");
    SimilarityMatrix(matrix)
}
