//! Exhaustive scan ranking: the reference answer the index path approximates.

use async_trait::async_trait;
use gamelens_common::{GameLensError, Result};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::aggregate::mean_pool;
use crate::ranker::{RankRequest, Ranker};
use crate::similarity::{cosine, ensure_scorable, max_over_set};
use crate::store::{MetadataStore, PageCursor};
use crate::topk::TopK;
use crate::types::{Embedding, MatchType, ScoredMatch};

/// How a candidate's vector set is compared with the query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateScoring {
    /// Best passage wins (descriptions)
    MaxOverSet,
    /// Cosine against the mean vector (reviews)
    MeanCosine,
}

impl CandidateScoring {
    pub fn for_match_type(match_type: MatchType) -> Result<Self> {
        match match_type {
            MatchType::Description => Ok(Self::MaxOverSet),
            MatchType::Review => Ok(Self::MeanCosine),
            MatchType::All => Err(GameLensError::invalid_input(
                "exhaustive scans run per concrete match type",
            )),
        }
    }

    pub fn score(self, vectors: &[Embedding], query: &[f32]) -> Result<f32> {
        match self {
            Self::MaxOverSet => max_over_set(vectors, query),
            Self::MeanCosine => cosine(&mean_pool(vectors)?, query),
        }
    }
}

/// Streams every entity of a type through a bounded top-K
pub struct ExhaustiveRanker {
    store: Arc<dyn MetadataStore>,
    page_size: usize,
}

impl ExhaustiveRanker {
    pub fn new(store: Arc<dyn MetadataStore>, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }
}

#[async_trait]
impl Ranker for ExhaustiveRanker {
    fn name(&self) -> &'static str {
        "exhaustive"
    }

    async fn rank(&self, request: &RankRequest<'_>) -> Result<Vec<ScoredMatch>> {
        let scoring = CandidateScoring::for_match_type(request.match_type)?;
        if request.max_results == 0 {
            return Ok(Vec::new());
        }
        ensure_scorable(request.query)?;

        let mut top = TopK::new(request.max_results);
        let mut cursor = Some(PageCursor::start());
        let mut scanned = 0usize;
        let mut skipped = 0usize;

        while let Some(current) = cursor {
            if request.cancel.is_cancelled() {
                debug!("{} scan cancelled after {} candidates", request.match_type, scanned);
                return Err(GameLensError::Cancelled);
            }

            let page = self
                .store
                .embedding_page(request.match_type, current, self.page_size)
                .await?;

            for (appid, vectors) in page.entries {
                if request.exclude == Some(appid) {
                    continue;
                }
                scanned += 1;

                match scoring.score(&vectors, request.query) {
                    Ok(score) => top.offer(score, ScoredMatch::new(appid, request.match_type, score)),
                    Err(e) if e.is_skippable_candidate() => {
                        warn!("Skipping appid {} ({}): {}", appid, request.match_type, e);
                        skipped += 1;
                    }
                    Err(e) => return Err(e),
                }
            }

            cursor = page.next;
        }

        debug!(
            "Exhaustive {} scan: {} candidates scored, {} skipped",
            request.match_type, scanned, skipped
        );
        Ok(top.drain())
    }
}
