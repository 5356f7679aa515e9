use async_trait::async_trait;
use gamelens_common::{GameLensError, Result};
use std::sync::Arc;
use tracing::debug;

use crate::index::{IndexSet, NearestNeighborIndex};
use crate::ranker::{RankRequest, Ranker};
use crate::similarity::distance_to_similarity;
use crate::types::{EntityId, MatchType, ScoredMatch};

/// Slack for rounding in the index's distance arithmetic
const SCORE_EPSILON: f32 = 1e-4;

/// Ranks through the per-type ANN indexes
pub struct IndexRanker {
    indexes: Arc<IndexSet>,
}

impl IndexRanker {
    pub fn new(indexes: Arc<IndexSet>) -> Self {
        Self { indexes }
    }

    /// kNN against one index, converted to scores, without `exclude`
    ///
    /// One extra neighbor is requested when excluding, since the source entity
    /// is usually its own nearest neighbor.
    pub fn rank_with(
        index: &dyn NearestNeighborIndex,
        match_type: MatchType,
        query: &[f32],
        k: usize,
        exclude: Option<EntityId>,
    ) -> Result<Vec<ScoredMatch>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let fetch = if exclude.is_some() { k.saturating_add(1) } else { k };
        let neighbors = index.knn_query(query, fetch)?;

        let mut matches = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            if exclude == Some(neighbor.appid) {
                continue;
            }
            let score = checked_similarity(neighbor.distance)?;
            matches.push(ScoredMatch::new(neighbor.appid, match_type, score));
        }
        matches.truncate(k);
        Ok(matches)
    }
}

fn checked_similarity(distance: f32) -> Result<f32> {
    let score = distance_to_similarity(distance);
    if !score.is_finite() || score.abs() > 1.0 + SCORE_EPSILON {
        return Err(GameLensError::internal(format!(
            "index distance {} maps outside the similarity range",
            distance
        )));
    }
    Ok(score.clamp(-1.0, 1.0))
}

#[async_trait]
impl Ranker for IndexRanker {
    fn name(&self) -> &'static str {
        "index"
    }

    async fn rank(&self, request: &RankRequest<'_>) -> Result<Vec<ScoredMatch>> {
        let index = self.indexes.for_type(request.match_type)?;
        let matches = Self::rank_with(
            index.as_ref(),
            request.match_type,
            request.query,
            request.max_results,
            request.exclude,
        )?;
        debug!(
            "Index {} query: {} matches from {} vectors",
            request.match_type,
            matches.len(),
            index.len()
        );
        Ok(matches)
    }
}
