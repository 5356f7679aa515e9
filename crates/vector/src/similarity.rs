//! Bounded similarity scores between embeddings.

use gamelens_common::{GameLensError, Result};
use ndarray::aview1;

use crate::types::Embedding;

/// L2 norm of `v`
#[inline]
pub fn norm(v: &[f32]) -> f32 {
    let v = aview1(v);
    v.dot(&v).sqrt()
}

/// Cosine similarity in [-1, 1]
///
/// Zero-norm (or non-finite) operands fail with `ZeroVector` rather than
/// producing NaN.
pub fn cosine(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(GameLensError::dimension_mismatch(a.len(), b.len()));
    }

    let norm_a = norm(a);
    let norm_b = norm(b);
    if !is_usable_norm(norm_a) || !is_usable_norm(norm_b) {
        return Err(GameLensError::zero_vector(format!(
            "cosine over degenerate vector (norms {} and {})",
            norm_a, norm_b
        )));
    }

    let score = aview1(a).dot(&aview1(b)) / (norm_a * norm_b);
    Ok(score.clamp(-1.0, 1.0))
}

/// Best cosine between `query` and any vector of the set
pub fn max_over_set(vectors: &[Embedding], query: &[f32]) -> Result<f32> {
    if vectors.is_empty() {
        return Err(GameLensError::empty_input("max-over-set with zero vectors"));
    }

    let mut best = f32::NEG_INFINITY;
    for vector in vectors {
        best = best.max(cosine(vector, query)?);
    }
    Ok(best)
}

/// Convert a normalized index distance into a similarity score
#[inline]
pub fn distance_to_similarity(distance: f32) -> f32 {
    1.0 - distance
}

/// Reject query vectors that cannot produce a cosine
pub fn ensure_scorable(query: &[f32]) -> Result<()> {
    if is_usable_norm(norm(query)) {
        Ok(())
    } else {
        Err(GameLensError::zero_vector("query vector has zero norm"))
    }
}

fn is_usable_norm(n: f32) -> bool {
    n.is_finite() && n > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    #[test]
    fn test_cosine_self_is_one() {
        for v in [vec![1.0, 2.0, 3.0], vec![-0.4, 0.0, 9.5], vec![1e-3, 1e-3, 1e-3]] {
            assert!((cosine(&v, &v).unwrap() - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn test_cosine_negated_is_minus_one() {
        let v = vec![0.3, -1.2, 2.5];
        let neg: Vec<f32> = v.iter().map(|x| -x).collect();
        assert!((cosine(&v, &neg).unwrap() + 1.0).abs() < EPS);
    }

    #[test]
    fn test_cosine_orthogonal() {
        assert!(cosine(&[1.0, 0.0], &[0.0, 3.0]).unwrap().abs() < EPS);
    }

    #[test]
    fn test_cosine_zero_vector() {
        let err = cosine(&[0.0, 0.0], &[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, GameLensError::ZeroVector(_)));
    }

    #[test]
    fn test_cosine_dimension_mismatch() {
        let err = cosine(&[1.0, 0.0], &[1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, GameLensError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_max_over_set_takes_best_passage() {
        let x = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let y = vec![vec![0.5, 0.5]];
        let query = [1.0, 0.0];

        assert!((max_over_set(&x, &query).unwrap() - 1.0).abs() < EPS);
        assert!((max_over_set(&y, &query).unwrap() - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-4);
    }

    #[test]
    fn test_max_over_set_empty() {
        let err = max_over_set(&[], &[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, GameLensError::EmptyInput(_)));
    }

    #[test]
    fn test_distance_to_similarity() {
        assert_eq!(distance_to_similarity(0.0), 1.0);
        assert_eq!(distance_to_similarity(0.25), 0.75);
        assert_eq!(distance_to_similarity(1.0), 0.0);
    }

    #[test]
    fn test_ensure_scorable() {
        assert!(ensure_scorable(&[0.0, 1.0]).is_ok());
        assert!(ensure_scorable(&[0.0, 0.0]).is_err());
        assert!(ensure_scorable(&[f32::NAN, 1.0]).is_err());
    }
}
