use gamelens_common::{GameLensError, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::aggregate::mean_pool;
use crate::ranker::{RankRequest, Ranker};
use crate::store::MetadataStore;
use crate::types::{Embedding, EntityId, MatchType, ScoredMatch};

/// Default cap on results per query
pub const DEFAULT_RESULT_CAP: usize = 100;

/// Query orchestration over a catalog and one ranking strategy
///
/// Holds only shared immutable state; one engine serves concurrent queries.
pub struct RankingEngine {
    store: Arc<dyn MetadataStore>,
    ranker: Arc<dyn Ranker>,
    result_cap: usize,
}

impl RankingEngine {
    /// Create new ranking engine
    pub fn new(store: Arc<dyn MetadataStore>, ranker: Arc<dyn Ranker>) -> Self {
        Self {
            store,
            ranker,
            result_cap: DEFAULT_RESULT_CAP,
        }
    }

    /// Override the per-query result cap
    pub fn with_result_cap(mut self, result_cap: usize) -> Self {
        self.result_cap = result_cap;
        self
    }

    pub fn ranker_name(&self) -> &'static str {
        self.ranker.name()
    }

    /// Rank entities against a free-text query embedding
    pub async fn rank_by_text(
        &self,
        query: &[f32],
        match_type: MatchType,
        max_results: usize,
    ) -> Result<Vec<ScoredMatch>> {
        self.rank_by_text_with_cancel(query, match_type, max_results, &CancellationToken::new())
            .await
    }

    /// [`rank_by_text`](Self::rank_by_text) with cooperative cancellation
    pub async fn rank_by_text_with_cancel(
        &self,
        query: &[f32],
        match_type: MatchType,
        max_results: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<ScoredMatch>> {
        let started = Instant::now();
        let plans: Vec<(MatchType, &[f32])> = match_type
            .expand()
            .iter()
            .map(|&concrete| (concrete, query))
            .collect();

        let results = self.run(&plans, max_results, None, cancel).await?;
        info!(
            "Text search ({}, ranker={}) - {} results in {:?}",
            match_type,
            self.ranker.name(),
            results.len(),
            started.elapsed()
        );
        Ok(results)
    }

    /// Rank entities similar to `appid`, never returning `appid` itself
    pub async fn rank_by_entity(
        &self,
        appid: EntityId,
        match_type: MatchType,
        max_results: usize,
    ) -> Result<Vec<ScoredMatch>> {
        self.rank_by_entity_with_cancel(appid, match_type, max_results, &CancellationToken::new())
            .await
    }

    /// [`rank_by_entity`](Self::rank_by_entity) with cooperative cancellation
    pub async fn rank_by_entity_with_cancel(
        &self,
        appid: EntityId,
        match_type: MatchType,
        max_results: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<ScoredMatch>> {
        let started = Instant::now();
        if !self.store.contains(appid).await? {
            return Err(GameLensError::not_found(format!("appid {}", appid)));
        }
        debug!(
            "Searching for games similar to {} ({:?})",
            appid,
            self.store.name_for(appid).await?
        );

        let mut comparison: Vec<(MatchType, Embedding)> = Vec::new();
        for &concrete in match_type.expand() {
            let vectors = self.store.embeddings_for(appid, concrete).await?;
            if vectors.is_empty() {
                debug!("appid {} has no {} embeddings, skipping type", appid, concrete);
                continue;
            }
            if concrete == MatchType::Review {
                let reviews = self.store.review_count(appid).await?;
                info!(
                    "Basing review query on {} reviews ({} chunks)",
                    reviews,
                    vectors.len()
                );
            }
            comparison.push((concrete, mean_pool(&vectors)?));
        }

        let plans: Vec<(MatchType, &[f32])> = comparison
            .iter()
            .map(|(concrete, vector)| (*concrete, vector.as_slice()))
            .collect();
        let results = self.run(&plans, max_results, Some(appid), cancel).await?;

        info!(
            "Similar-games search for {} ({}, ranker={}) - {} results in {:?}",
            appid,
            match_type,
            self.ranker.name(),
            results.len(),
            started.elapsed()
        );
        Ok(results)
    }

    async fn run(
        &self,
        plans: &[(MatchType, &[f32])],
        max_results: usize,
        exclude: Option<EntityId>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ScoredMatch>> {
        let max_results = max_results.min(self.result_cap);
        if max_results == 0 || plans.is_empty() {
            return Ok(Vec::new());
        }

        let mut per_type = Vec::with_capacity(plans.len());
        for &(match_type, query) in plans {
            let request = RankRequest::new(match_type, query, max_results, cancel).excluding(exclude);
            per_type.push(self.ranker.rank(&request).await?);
        }

        let mut merged = merge_ranked(per_type, max_results);
        self.resolve_names(&mut merged).await?;
        Ok(merged)
    }

    async fn resolve_names(&self, matches: &mut [ScoredMatch]) -> Result<()> {
        for m in matches.iter_mut() {
            m.name = self.store.name_for(m.appid).await?;
        }
        Ok(())
    }
}

/// Concatenate per-type results, stable-sort by score descending, truncate
pub fn merge_ranked(per_type: Vec<Vec<ScoredMatch>>, max_results: usize) -> Vec<ScoredMatch> {
    let mut merged: Vec<ScoredMatch> = per_type.into_iter().flatten().collect();
    merged.sort_by(|a, b| b.score.total_cmp(&a.score));
    merged.truncate(max_results);
    merged
}
