//! Common interface of the two ranking strategies.

use async_trait::async_trait;
use gamelens_common::{RankingStrategy, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::exhaustive::ExhaustiveRanker;
use crate::index::IndexSet;
use crate::index_ranker::IndexRanker;
use crate::store::MetadataStore;
use crate::types::{EntityId, MatchType, ScoredMatch};

/// One per-type ranking call
#[derive(Debug, Clone)]
pub struct RankRequest<'a> {
    /// Concrete type to search
    pub match_type: MatchType,
    pub query: &'a [f32],
    pub max_results: usize,
    /// Entity never returned (the source of an entity-similarity query)
    pub exclude: Option<EntityId>,
    pub cancel: &'a CancellationToken,
}

impl<'a> RankRequest<'a> {
    pub fn new(
        match_type: MatchType,
        query: &'a [f32],
        max_results: usize,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            match_type,
            query,
            max_results,
            exclude: None,
            cancel,
        }
    }

    pub fn excluding(mut self, appid: Option<EntityId>) -> Self {
        self.exclude = appid;
        self
    }
}

/// Turns a comparison vector into matches of one concrete type, best first
#[async_trait]
pub trait Ranker: Send + Sync {
    /// Strategy name for logs
    fn name(&self) -> &'static str;

    async fn rank(&self, request: &RankRequest<'_>) -> Result<Vec<ScoredMatch>>;
}

/// Build the ranker selected by configuration
pub fn build_ranker(
    strategy: RankingStrategy,
    store: Arc<dyn MetadataStore>,
    indexes: Arc<IndexSet>,
    scan_page_size: usize,
) -> Arc<dyn Ranker> {
    match strategy {
        RankingStrategy::Index => Arc::new(IndexRanker::new(indexes)),
        RankingStrategy::Exhaustive => Arc::new(ExhaustiveRanker::new(store, scan_page_size)),
    }
}
