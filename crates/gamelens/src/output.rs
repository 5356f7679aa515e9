use gamelens_vector::{MatchType, ScoredMatch};
use serde::Serialize;

/// How a query was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Text,
    Similar,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub mode: QueryMode,
    #[serde(rename = "type")]
    pub match_type: MatchType,
    pub ranker: &'static str,
    pub count: usize,
    pub results: Vec<ScoredMatch>,
}

impl SearchResponse {
    pub fn new(
        query: impl Into<String>,
        mode: QueryMode,
        match_type: MatchType,
        ranker: &'static str,
        results: Vec<ScoredMatch>,
    ) -> Self {
        Self {
            query: query.into(),
            mode,
            match_type,
            ranker,
            count: results.len(),
            results,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IndexStats {
    pub vectors: usize,
    pub dimension: usize,
    pub metric: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub games: usize,
    pub dimension: usize,
    pub description_index: IndexStats,
    pub review_index: IndexStats,
    pub ranking_strategy: String,
    pub embedding_model: String,
    pub embedding_backend_reachable: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}
