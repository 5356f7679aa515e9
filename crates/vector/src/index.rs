//! Approximate nearest-neighbor index seam.
//!
//! Indexes are immutable snapshots shared across queries through `Arc`.
//! Similarity is derived as `1 - distance`, so only indexes whose distance
//! is `1 - cosine` are accepted.

use gamelens_common::{GameLensError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::hnsw::HnswIndex;
use crate::types::{EntityId, MatchType};

/// Native distance of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// `1 - cosine(a, b)`
    Cosine,
    /// `1 - dot(a, b)` on raw vectors
    InnerProduct,
    /// Squared euclidean distance, unbounded
    L2,
}

impl DistanceMetric {
    /// Whether `1 - distance` yields a cosine-comparable similarity
    pub fn converts_to_similarity(self) -> bool {
        matches!(self, DistanceMetric::Cosine)
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMetric::Cosine => write!(f, "cosine"),
            DistanceMetric::InnerProduct => write!(f, "inner_product"),
            DistanceMetric::L2 => write!(f, "l2"),
        }
    }
}

/// One kNN hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub appid: EntityId,
    pub distance: f32,
}

/// Read-only kNN oracle
pub trait NearestNeighborIndex: Send + Sync {
    /// Up to `k` neighbors of `query`, ascending distance
    fn knn_query(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;

    fn dimension(&self) -> usize;

    fn metric(&self) -> DistanceMetric;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The per-type indexes, validated once at startup
#[derive(Clone)]
pub struct IndexSet {
    description: Arc<dyn NearestNeighborIndex>,
    review: Arc<dyn NearestNeighborIndex>,
}

impl IndexSet {
    /// Pair two indexes after checking they can serve `dimension`-wide queries
    pub fn new(
        description: Arc<dyn NearestNeighborIndex>,
        review: Arc<dyn NearestNeighborIndex>,
        dimension: usize,
    ) -> Result<Self> {
        validate(MatchType::Description, description.as_ref(), dimension)?;
        validate(MatchType::Review, review.as_ref(), dimension)?;
        Ok(Self {
            description,
            review,
        })
    }

    /// Load both HNSW snapshots; a missing snapshot is `IndexUnavailable`
    pub fn load(description_path: &Path, review_path: &Path, dimension: usize) -> Result<Self> {
        let description = load_snapshot(MatchType::Description, description_path)?;
        let review = load_snapshot(MatchType::Review, review_path)?;
        Self::new(Arc::new(description), Arc::new(review), dimension)
    }

    /// Index serving one concrete match type
    pub fn for_type(&self, match_type: MatchType) -> Result<&Arc<dyn NearestNeighborIndex>> {
        match match_type {
            MatchType::Description => Ok(&self.description),
            MatchType::Review => Ok(&self.review),
            MatchType::All => Err(GameLensError::invalid_input(
                "indexes are queried per concrete match type",
            )),
        }
    }
}

fn load_snapshot(match_type: MatchType, path: &Path) -> Result<HnswIndex> {
    if !path.exists() {
        return Err(GameLensError::index_unavailable(format!(
            "no {} index snapshot at {}",
            match_type,
            path.display()
        )));
    }
    let index = HnswIndex::load(path).map_err(|e| match e {
        GameLensError::IndexConfig(_) => e,
        other => GameLensError::index_unavailable(format!(
            "{} index snapshot {} is unreadable: {}",
            match_type,
            path.display(),
            other
        )),
    })?;
    info!(
        "Loaded {} index - {} vectors, built {}",
        match_type,
        index.len(),
        index.built_at()
    );
    Ok(index)
}

fn validate(match_type: MatchType, index: &dyn NearestNeighborIndex, dimension: usize) -> Result<()> {
    if !index.metric().converts_to_similarity() {
        return Err(GameLensError::index_config(format!(
            "{} index uses {} distance; only cosine distance converts to similarity",
            match_type,
            index.metric()
        )));
    }
    if index.dimension() != dimension {
        return Err(GameLensError::index_config(format!(
            "{} index dimension {} does not match catalog dimension {}",
            match_type,
            index.dimension(),
            dimension
        )));
    }
    Ok(())
}
