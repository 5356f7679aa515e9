use gamelens_common::{AppConfig, GameLensError, Result};
use gamelens_embed::{EmbeddingSource, OllamaEmbedder};
use gamelens_vector::{
    build_ranker, EntityId, HnswConfig, HnswIndex, IndexSet, JsonCatalog, MatchType,
    MetadataStore, NearestNeighborIndex, RankingEngine,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::output::{IndexStats, QueryMode, SearchResponse, StatusResponse};

/// What a `search` argument refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTarget {
    Entity(EntityId),
    Text(String),
}

impl SearchTarget {
    /// All-digit input is an appid, anything else free text
    pub fn parse(query: &str) -> Self {
        let trimmed = query.trim();
        if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(appid) = trimmed.parse() {
                return Self::Entity(appid);
            }
        }
        Self::Text(query.to_string())
    }
}

/// Loaded catalog, indexes, embedding source and engine
pub struct AppState {
    pub config: AppConfig,
    pub catalog: Arc<JsonCatalog>,
    pub indexes: Arc<IndexSet>,
    pub embedder: Arc<dyn EmbeddingSource>,
    pub engine: RankingEngine,
}

impl AppState {
    /// Load everything named by `config`, refusing to start without usable indexes
    pub fn new(config: AppConfig) -> Result<Self> {
        let catalog = JsonCatalog::load(&config.catalog_path)?;
        let indexes = IndexSet::load(
            &config.description_index_path,
            &config.review_index_path,
            catalog.dimension(),
        )?;
        let embedder = OllamaEmbedder::new(
            config.ollama_base_url.as_str(),
            config.embedding_model.as_str(),
            config.max_query_tokens,
        )?;

        Ok(Self::from_parts(
            config,
            Arc::new(catalog),
            Arc::new(indexes),
            Arc::new(embedder),
        ))
    }

    pub fn from_parts(
        config: AppConfig,
        catalog: Arc<JsonCatalog>,
        indexes: Arc<IndexSet>,
        embedder: Arc<dyn EmbeddingSource>,
    ) -> Self {
        let store: Arc<dyn MetadataStore> = catalog.clone();
        let ranker = build_ranker(
            config.ranking_strategy,
            store.clone(),
            indexes.clone(),
            config.scan_page_size,
        );
        let engine = RankingEngine::new(store, ranker).with_result_cap(config.max_num_results);
        info!(
            "GameLens ready - {} games, ranker={}, model={}",
            catalog.len(),
            engine.ranker_name(),
            config.embedding_model
        );

        Self {
            config,
            catalog,
            indexes,
            embedder,
            engine,
        }
    }

    /// Embed free text and rank the catalog against it
    pub async fn query_text(
        &self,
        text: &str,
        match_type: MatchType,
        num_results: Option<usize>,
        instruction: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<SearchResponse> {
        let instruction = instruction.unwrap_or(self.config.embedding_instruction.as_str());
        let num_results = self.config.clamp_num_results(num_results);

        let embedding = self.embedder.embed_query(text, instruction).await?;
        let results = self
            .engine
            .rank_by_text_with_cancel(&embedding, match_type, num_results, cancel)
            .await?;

        Ok(SearchResponse::new(
            text,
            QueryMode::Text,
            match_type,
            self.engine.ranker_name(),
            results,
        ))
    }

    /// Games similar to `appid`
    pub async fn similar(
        &self,
        appid: EntityId,
        match_type: MatchType,
        num_results: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<SearchResponse> {
        let num_results = self.config.clamp_num_results(num_results);
        let results = self
            .engine
            .rank_by_entity_with_cancel(appid, match_type, num_results, cancel)
            .await?;

        Ok(SearchResponse::new(
            appid.to_string(),
            QueryMode::Similar,
            match_type,
            self.engine.ranker_name(),
            results,
        ))
    }

    /// Route a bare query: appids go to [`similar`](Self::similar) over all types
    pub async fn search(
        &self,
        query: &str,
        num_results: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<SearchResponse> {
        match SearchTarget::parse(query) {
            SearchTarget::Entity(appid) => {
                self.similar(appid, MatchType::All, num_results, cancel).await
            }
            SearchTarget::Text(text) => {
                self.query_text(&text, MatchType::All, num_results, None, cancel)
                    .await
            }
        }
    }

    pub fn status(&self, embedding_backend_reachable: bool) -> Result<StatusResponse> {
        Ok(StatusResponse {
            games: self.catalog.len(),
            dimension: self.catalog.dimension(),
            description_index: index_stats(self.indexes.for_type(MatchType::Description)?.as_ref()),
            review_index: index_stats(self.indexes.for_type(MatchType::Review)?.as_ref()),
            ranking_strategy: self.config.ranking_strategy.to_string(),
            embedding_model: self.config.embedding_model.clone(),
            embedding_backend_reachable,
        })
    }
}

fn index_stats(index: &dyn NearestNeighborIndex) -> IndexStats {
    IndexStats {
        vectors: index.len(),
        dimension: index.dimension(),
        metric: index.metric().to_string(),
    }
}

/// Build both HNSW snapshots from the catalog and write them to the configured paths
pub fn build_indexes(config: &AppConfig, hnsw: HnswConfig) -> Result<(usize, usize)> {
    let catalog = JsonCatalog::load(&config.catalog_path)?;
    if catalog.is_empty() {
        return Err(GameLensError::invalid_input("catalog has no games to index"));
    }

    let mut sizes = [0usize; 2];
    let targets = [
        (MatchType::Description, &config.description_index_path),
        (MatchType::Review, &config.review_index_path),
    ];
    for (slot, (match_type, path)) in targets.into_iter().enumerate() {
        let index = HnswIndex::from_catalog(&catalog, match_type, hnsw.clone())?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        index.save(path)?;
        info!("Wrote {} index ({} vectors) to {}", match_type, index.len(), path.display());
        sizes[slot] = index.len();
    }

    Ok((sizes[0], sizes[1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gamelens_vector::CatalogEntry;

    /// Embeds every query as a fixed vector
    struct FixedSource {
        vector: Vec<f32>,
    }

    #[async_trait]
    impl EmbeddingSource for FixedSource {
        async fn embed(&self, _text: &str, _instruction: &str) -> Result<Vec<f32>> {
            Ok(self.vector.clone())
        }

        fn max_query_tokens(&self) -> usize {
            32
        }
    }

    fn catalog() -> JsonCatalog {
        let game = |appid: u64, name: &str, v: Vec<f32>| {
            CatalogEntry::new(appid, name)
                .with_description(vec![v.clone()])
                .with_review("r", vec![v])
        };
        JsonCatalog::from_entries(
            2,
            vec![
                game(1, "A", vec![1.0, 0.0]),
                game(2, "B", vec![0.0, 1.0]),
                game(3, "C", vec![0.9, 0.1]),
            ],
        )
        .unwrap()
    }

    fn state(config: AppConfig) -> AppState {
        let catalog = catalog();
        let description =
            HnswIndex::from_catalog(&catalog, MatchType::Description, HnswConfig::default()).unwrap();
        let review = HnswIndex::from_catalog(&catalog, MatchType::Review, HnswConfig::default()).unwrap();
        let indexes = IndexSet::new(Arc::new(description), Arc::new(review), 2).unwrap();
        AppState::from_parts(
            config,
            Arc::new(catalog),
            Arc::new(indexes),
            Arc::new(FixedSource { vector: vec![1.0, 0.0] }),
        )
    }

    #[test]
    fn test_search_target_parse() {
        assert_eq!(SearchTarget::parse("620"), SearchTarget::Entity(620));
        assert_eq!(SearchTarget::parse(" 42 "), SearchTarget::Entity(42));
        assert_eq!(
            SearchTarget::parse("portal 2"),
            SearchTarget::Text("portal 2".to_string())
        );
        assert_eq!(SearchTarget::parse("-5"), SearchTarget::Text("-5".to_string()));
        assert_eq!(SearchTarget::parse(""), SearchTarget::Text(String::new()));
    }

    #[tokio::test]
    async fn test_query_text_defaults() {
        let state = state(AppConfig::default());
        let cancel = CancellationToken::new();
        let response = state
            .query_text("space puzzles", MatchType::Description, Some(2), None, &cancel)
            .await
            .unwrap();

        assert_eq!(response.mode, QueryMode::Text);
        assert_eq!(response.count, 2);
        let ids: Vec<_> = response.results.iter().map(|m| m.appid).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_query_too_long_is_rejected() {
        let state = state(AppConfig::default());
        let cancel = CancellationToken::new();
        let long_query = "word ".repeat(64);
        let err = state
            .query_text(&long_query, MatchType::All, None, None, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, GameLensError::QueryTooLong { .. }));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_num_results_clamped_to_config() {
        let config = AppConfig {
            max_num_results: 1,
            default_num_results: 1,
            ..AppConfig::default()
        };
        let state = state(config);
        let cancel = CancellationToken::new();
        let response = state.search("anything", Some(50), &cancel).await.unwrap();
        assert_eq!(response.count, 1);
    }

    #[tokio::test]
    async fn test_search_routes_appid_to_similar() {
        let state = state(AppConfig::default());
        let cancel = CancellationToken::new();
        let response = state.search("1", None, &cancel).await.unwrap();

        assert_eq!(response.mode, QueryMode::Similar);
        assert_eq!(response.match_type, MatchType::All);
        assert!(response.results.iter().all(|m| m.appid != 1));
        assert_eq!(response.results[0].appid, 3);
        assert_eq!(response.results[0].name.as_deref(), Some("C"));
    }

    #[tokio::test]
    async fn test_similar_unknown_appid() {
        let state = state(AppConfig::default());
        let cancel = CancellationToken::new();
        let err = state.similar(999, MatchType::All, None, &cancel).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_status_reports_indexes() {
        let state = state(AppConfig::default());
        let status = state.status(false).unwrap();
        assert_eq!(status.games, 3);
        assert_eq!(status.description_index.vectors, 3);
        assert_eq!(status.review_index.metric, "cosine");
        assert_eq!(status.ranking_strategy, "index");
    }
}
