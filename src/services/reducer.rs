//! Truncated SVD over sparse TF-IDF rows
//!
//! Randomized range finder with power iterations (Halko, Martinsson & Tropp),
//! followed by an exact SVD of the small projected matrix. The Gaussian test
//! matrix comes from a fixed seed, so identical input gives identical output.

use nalgebra::{DMatrix, SVD};
use ndarray::{Array1, Array2, Axis};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;

use crate::{
    error::{AppError, AppResult},
    services::vectorizer::FeatureVector,
};

const RANDOM_SEED: u64 = 42;
const OVERSAMPLES: usize = 10;
const POWER_ITERATIONS: usize = 5;
const SVD_MAX_ITERATIONS: usize = 10_000;
/// Rows per partial sum in Xᵀ·M; fixed so the summation order never depends on scheduling
const ROW_CHUNK: usize = 1024;
const EPS: f64 = 1e-12;

/// Dense reduced representation of one catalog row
pub type ReducedVector = Vec<f32>;

/// Fitted projection from TF-IDF space onto the leading right singular vectors
#[derive(Debug, Clone)]
pub struct SvdProjection {
    /// n_components × vocabulary
    components: Array2<f64>,
    singular_values: Vec<f64>,
}

impl SvdProjection {
    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    pub fn input_dim(&self) -> usize {
        self.components.ncols()
    }

    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }

    /// Singular values, largest first
    pub fn singular_values(&self) -> &[f64] {
        &self.singular_values
    }

    /// Projects feature vectors with the fitted components
    pub fn transform(&self, vectors: &[FeatureVector]) -> AppResult<Vec<ReducedVector>> {
        if let Some(bad) = vectors.iter().find(|v| v.dim() != self.input_dim()) {
            return Err(AppError::Config(format!(
                "Feature vector has dimension {}, projection expects {}",
                bad.dim(),
                self.input_dim()
            )));
        }

        let basis = self.components.t();
        Ok(vectors
            .par_iter()
            .map(|row| {
                let mut out = Array1::<f64>::zeros(self.n_components());
                for (j, value) in row.iter() {
                    out.scaled_add(value, &basis.row(j));
                }
                out.iter().map(|&x| x as f32).collect()
            })
            .collect())
    }
}

/// Result of fitting the reducer on a corpus
#[derive(Debug, Clone)]
pub struct Reduction {
    pub projection: SvdProjection,
    /// One row per input vector, in input order
    pub vectors: Vec<ReducedVector>,
}

/// Fits a rank-`n_components` truncated SVD and reduces every input row
pub fn fit_reduce(vectors: &[FeatureVector], n_components: usize) -> AppResult<Reduction> {
    let n_rows = vectors.len();
    let dim = vectors
        .first()
        .map(FeatureVector::dim)
        .ok_or_else(|| AppError::Data("Cannot reduce an empty set of vectors".to_string()))?;

    if vectors.iter().any(|v| v.dim() != dim) {
        return Err(AppError::Data(
            "Feature vectors have inconsistent dimensions".to_string(),
        ));
    }

    let max_components = n_rows.min(dim).saturating_sub(1);
    if n_components == 0 || n_components > max_components {
        return Err(AppError::Config(format!(
            "n_components must be between 1 and {} (min(rows={}, vocabulary={}) - 1), got {}",
            max_components, n_rows, dim, n_components
        )));
    }

    tracing::info!(
        rows = n_rows,
        from = dim,
        to = n_components,
        "Fitting truncated SVD"
    );

    let sketch = (n_components + OVERSAMPLES).min(n_rows.min(dim));
    let omega = gaussian_matrix(dim, sketch, RANDOM_SEED);

    let mut q = orthonormalize(&sparse_dot(vectors, &omega));
    for _ in 0..POWER_ITERATIONS {
        let z = orthonormalize(&sparse_t_dot(vectors, &q, dim));
        q = orthonormalize(&sparse_dot(vectors, &z));
    }

    // Bᵀ = Xᵀ Q is dim × sketch; its left singular vectors are the right singular vectors of X
    let bt = to_dmatrix(&sparse_t_dot(vectors, &q, dim));
    let svd = SVD::try_new(bt, true, false, f64::EPSILON, SVD_MAX_ITERATIONS)
        .ok_or_else(|| AppError::Internal("Truncated SVD did not converge".to_string()))?;
    let u = svd
        .u
        .ok_or_else(|| AppError::Internal("SVD did not return singular vectors".to_string()))?;
    let sigma = svd.singular_values;

    let mut order: Vec<usize> = (0..sigma.len()).collect();
    order.sort_by(|&a, &b| sigma[b].total_cmp(&sigma[a]));

    let mut components = Array2::<f64>::zeros((n_components, dim));
    let mut singular_values = Vec::with_capacity(n_components);
    for (row, &k) in order.iter().take(n_components).enumerate() {
        singular_values.push(sigma[k]);
        if sigma[k] < EPS {
            continue;
        }
        for (j, value) in u.column(k).iter().enumerate() {
            components[[row, j]] = *value;
        }
    }
    flip_signs(&mut components);

    let projection = SvdProjection {
        components,
        singular_values,
    };
    let reduced = projection.transform(vectors)?;

    tracing::info!(
        rows = reduced.len(),
        components = n_components,
        "Dimensionality reduction complete"
    );

    Ok(Reduction {
        projection,
        vectors: reduced,
    })
}

/// Standard normal entries via Box-Muller
fn gaussian_matrix(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_simple_fn((rows, cols), || {
        let u1: f64 = rng.random_range(f64::EPSILON..1.0);
        let u2: f64 = rng.random_range(0.0..1.0);
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    })
}

/// X · M for sparse X (n × d) and dense M (d × k)
fn sparse_dot(rows: &[FeatureVector], m: &Array2<f64>) -> Array2<f64> {
    let mut out = Array2::<f64>::zeros((rows.len(), m.ncols()));
    out.axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(rows.par_iter())
        .for_each(|(mut target, row)| {
            for (j, value) in row.iter() {
                target.scaled_add(value, &m.row(j));
            }
        });
    out
}

/// Xᵀ · M for sparse X (n × d) and dense M (n × k)
///
/// Partials of `ROW_CHUNK` rows are built one pool-sized group at a time and
/// added to the total in row order. At most one partial per worker is alive,
/// and the result does not depend on the pool size.
fn sparse_t_dot(rows: &[FeatureVector], m: &Array2<f64>, dim: usize) -> Array2<f64> {
    let k = m.ncols();
    let group = ROW_CHUNK * rayon::current_num_threads().max(1);
    let mut sum = Array2::<f64>::zeros((dim, k));

    for (g, group_rows) in rows.chunks(group).enumerate() {
        let base = g * group;
        let partials: Vec<Array2<f64>> = group_rows
            .par_chunks(ROW_CHUNK)
            .enumerate()
            .map(|(chunk, block)| {
                let start = base + chunk * ROW_CHUNK;
                let mut acc = Array2::<f64>::zeros((dim, k));
                for (offset, row) in block.iter().enumerate() {
                    let m_row = m.row(start + offset);
                    for (j, value) in row.iter() {
                        acc.row_mut(j).scaled_add(value, &m_row);
                    }
                }
                acc
            })
            .collect();

        for part in &partials {
            sum += part;
        }
    }
    sum
}

/// Orthonormal basis of the column space (thin Householder QR)
fn orthonormalize(a: &Array2<f64>) -> Array2<f64> {
    let q = to_dmatrix(a).qr().q();
    Array2::from_shape_fn((q.nrows(), q.ncols()), |(i, j)| q[(i, j)])
}

fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

/// Makes the largest-magnitude entry of every component positive
fn flip_signs(components: &mut Array2<f64>) {
    for mut row in components.axis_iter_mut(Axis(0)) {
        let pivot = row
            .iter()
            .copied()
            .max_by(|a, b| a.abs().total_cmp(&b.abs()))
            .unwrap_or(0.0);
        if pivot < 0.0 {
            row.mapv_inplace(|x| -x);
        }
    }
}
