//! Vector similarity helpers.

use ndarray::{Array1, Array2, ArrayView1};

/// Cosine similarity of two vectors. Zero-norm inputs score 0.
pub fn cosine_similarity(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();
    if norm_a < 1e-9 || norm_b < 1e-9 {
        return 0.0;
    }
    a.dot(&b) / (norm_a * norm_b)
}

/// Stack vectors into a matrix with L2-normalized rows.
pub(crate) fn normalized_matrix(vectors: &[Array1<f32>], dim: usize) -> Array2<f32> {
    let mut matrix = Array2::zeros((vectors.len(), dim));
    for (i, v) in vectors.iter().enumerate() {
        matrix.row_mut(i).assign(v);
    }
    for mut row in matrix.rows_mut() {
        let norm = row.dot(&row).sqrt();
        if norm > 1e-9 {
            row /= norm;
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_cosine_basics() {
        let a = array![1.0f32, 0.0, 0.0];
        let b = array![2.0f32, 0.0, 0.0];
        let c = array![0.0f32, 1.0, 0.0];
        assert!((cosine_similarity(a.view(), b.view()) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(a.view(), c.view()).abs() < 1e-6);
        assert!((cosine_similarity(a.view(), (-&a).view()) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        let a = array![0.0f32, 0.0];
        let b = array![1.0f32, 1.0];
        assert_eq!(cosine_similarity(a.view(), b.view()), 0.0);
    }

    #[test]
    fn test_normalized_rows() {
        let m = normalized_matrix(&[array![3.0f32, 4.0], array![0.0f32, 0.0]], 2);
        assert!((m[[0, 0]] - 0.6).abs() < 1e-6);
        assert!((m[[0, 1]] - 0.8).abs() < 1e-6);
        assert_eq!(m[[1, 0]], 0.0);
    }
}
