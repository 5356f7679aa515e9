//! Collapsing an entity's embedding set into one representative vector.

use gamelens_common::{GameLensError, Result};
use ndarray::{Array2, Axis};

use crate::types::Embedding;

/// Elementwise arithmetic mean of `vectors`
///
/// Fails with `EmptyInput` on an empty set and `DimensionMismatch` when the
/// vectors disagree on length.
pub fn mean_pool(vectors: &[Embedding]) -> Result<Embedding> {
    let first = vectors
        .first()
        .ok_or_else(|| GameLensError::empty_input("mean pooling over zero vectors"))?;
    let dimension = first.len();

    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(GameLensError::dimension_mismatch(dimension, bad.len()));
    }

    let flat: Vec<f32> = vectors.iter().flat_map(|v| v.iter().copied()).collect();
    let matrix = Array2::from_shape_vec((vectors.len(), dimension), flat)
        .map_err(|e| GameLensError::internal(format!("Failed to shape embedding matrix: {}", e)))?;

    matrix
        .mean_axis(Axis(0))
        .map(|mean| mean.to_vec())
        .ok_or_else(|| GameLensError::empty_input("mean pooling over zero vectors"))
}
