//! Metadata store: display names and stored embeddings per entity.

use async_trait::async_trait;
use gamelens_common::{GameLensError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::types::{Embedding, EntityId, MatchType};

/// Position in a paginated embedding scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageCursor(usize);

impl PageCursor {
    pub fn start() -> Self {
        Self(0)
    }

    pub fn offset(&self) -> usize {
        self.0
    }
}

/// One page of `(appid, vectors)` pairs
#[derive(Debug, Clone, Default)]
pub struct EmbeddingPage {
    pub entries: Vec<(EntityId, Vec<Embedding>)>,
    /// Cursor for the next page, `None` when the scan is complete
    pub next: Option<PageCursor>,
}

/// Read-only access to entity names and stored vectors
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Display name for `appid`
    async fn name_for(&self, appid: EntityId) -> Result<Option<String>>;

    /// Whether `appid` is part of the catalog
    async fn contains(&self, appid: EntityId) -> Result<bool>;

    /// Stored vectors of one concrete type, empty when the entity has none
    async fn embeddings_for(&self, appid: EntityId, match_type: MatchType) -> Result<Vec<Embedding>>;

    /// Number of reviews with at least one chunk
    async fn review_count(&self, appid: EntityId) -> Result<usize>;

    /// Next page of entities that own vectors of `match_type`
    async fn embedding_page(
        &self,
        match_type: MatchType,
        cursor: PageCursor,
        page_size: usize,
    ) -> Result<EmbeddingPage>;

    /// Embedding dimensionality shared by every stored vector
    fn dimension(&self) -> usize;
}

/// One game as written by the offline embedding pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub appid: EntityId,
    pub name: String,

    /// Description passage embeddings, in passage order
    #[serde(default)]
    pub description: Vec<Embedding>,

    /// Review id -> chunk embeddings
    #[serde(default)]
    pub reviews: BTreeMap<String, Vec<Embedding>>,
}

impl CatalogEntry {
    pub fn new(appid: EntityId, name: impl Into<String>) -> Self {
        Self {
            appid,
            name: name.into(),
            description: Vec::new(),
            reviews: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, passages: Vec<Embedding>) -> Self {
        self.description = passages;
        self
    }

    pub fn with_review(mut self, review_id: impl Into<String>, chunks: Vec<Embedding>) -> Self {
        self.reviews.insert(review_id.into(), chunks);
        self
    }

    /// Vectors of one concrete type; review chunks are flattened across reviews
    pub fn vectors(&self, match_type: MatchType) -> Result<Vec<Embedding>> {
        match match_type {
            MatchType::Description => Ok(self.description.clone()),
            MatchType::Review => Ok(self.reviews.values().flatten().cloned().collect()),
            MatchType::All => Err(GameLensError::invalid_input(
                "stored vectors are looked up per concrete match type",
            )),
        }
    }

    fn has_vectors(&self, match_type: MatchType) -> bool {
        match match_type {
            MatchType::Description => !self.description.is_empty(),
            MatchType::Review => self.reviews.values().any(|chunks| !chunks.is_empty()),
            MatchType::All => false,
        }
    }

    fn all_vectors(&self) -> impl Iterator<Item = &Embedding> {
        self.description.iter().chain(self.reviews.values().flatten())
    }
}

/// On-disk catalog snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub dimension: usize,
    pub entries: Vec<CatalogEntry>,
}

/// In-memory catalog loaded once from a JSON snapshot
#[derive(Debug, Clone)]
pub struct JsonCatalog {
    dimension: usize,
    entries: BTreeMap<EntityId, CatalogEntry>,
    description_ids: Vec<EntityId>,
    review_ids: Vec<EntityId>,
}

impl JsonCatalog {
    /// Build from entries, validating every vector against `dimension`
    pub fn from_entries(dimension: usize, entries: Vec<CatalogEntry>) -> Result<Self> {
        let mut by_id = BTreeMap::new();
        for entry in entries {
            if let Some(bad) = entry.all_vectors().find(|v| v.len() != dimension) {
                return Err(GameLensError::dimension_mismatch(dimension, bad.len()));
            }
            if by_id.insert(entry.appid, entry).is_some() {
                return Err(GameLensError::invalid_input("duplicate appid in catalog"));
            }
        }

        let ids_with = |match_type| {
            by_id
                .values()
                .filter(|e: &&CatalogEntry| e.has_vectors(match_type))
                .map(|e| e.appid)
                .collect::<Vec<_>>()
        };
        let description_ids = ids_with(MatchType::Description);
        let review_ids = ids_with(MatchType::Review);

        Ok(Self {
            dimension,
            entries: by_id,
            description_ids,
            review_ids,
        })
    }

    /// Load catalog snapshot from file
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            GameLensError::not_found(format!("catalog {}: {}", path.display(), e))
        })?;
        let snapshot: CatalogSnapshot = serde_json::from_str(&data)?;
        let catalog = Self::from_entries(snapshot.dimension, snapshot.entries)?;

        info!(
            "Catalog loaded - {} games ({} with descriptions, {} with reviews), dimension {}",
            catalog.len(),
            catalog.description_ids.len(),
            catalog.review_ids.len(),
            catalog.dimension
        );
        Ok(catalog)
    }

    /// Write catalog snapshot to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = CatalogSnapshot {
            dimension: self.dimension,
            entries: self.entries.values().cloned().collect(),
        };
        std::fs::write(path, serde_json::to_string(&snapshot)?)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entities owning vectors of one concrete type, ascending appid
    pub fn ids_with(&self, match_type: MatchType) -> &[EntityId] {
        match match_type {
            MatchType::Description => &self.description_ids,
            MatchType::Review => &self.review_ids,
            MatchType::All => &[],
        }
    }

    /// Iterate `(appid, vectors)` of one concrete type, for index building
    pub fn iter_vectors(
        &self,
        match_type: MatchType,
    ) -> impl Iterator<Item = (EntityId, Vec<Embedding>)> + '_ {
        self.ids_with(match_type).iter().filter_map(move |appid| {
            let entry = self.entries.get(appid)?;
            entry.vectors(match_type).ok().map(|v| (*appid, v))
        })
    }
}

#[async_trait]
impl MetadataStore for JsonCatalog {
    async fn name_for(&self, appid: EntityId) -> Result<Option<String>> {
        Ok(self.entries.get(&appid).map(|e| e.name.clone()))
    }

    async fn contains(&self, appid: EntityId) -> Result<bool> {
        Ok(self.entries.contains_key(&appid))
    }

    async fn embeddings_for(&self, appid: EntityId, match_type: MatchType) -> Result<Vec<Embedding>> {
        match self.entries.get(&appid) {
            Some(entry) => entry.vectors(match_type),
            None => Ok(Vec::new()),
        }
    }

    async fn review_count(&self, appid: EntityId) -> Result<usize> {
        Ok(self.entries.get(&appid).map_or(0, |entry| {
            entry.reviews.values().filter(|chunks| !chunks.is_empty()).count()
        }))
    }

    async fn embedding_page(
        &self,
        match_type: MatchType,
        cursor: PageCursor,
        page_size: usize,
    ) -> Result<EmbeddingPage> {
        if !match_type.is_concrete() {
            return Err(GameLensError::invalid_input(
                "embedding pages are scanned per concrete match type",
            ));
        }
        if page_size == 0 {
            return Err(GameLensError::invalid_input("page size cannot be 0"));
        }

        let ids = self.ids_with(match_type);
        let start = cursor.offset().min(ids.len());
        let end = (start + page_size).min(ids.len());

        let mut entries = Vec::with_capacity(end - start);
        for appid in &ids[start..end] {
            if let Some(entry) = self.entries.get(appid) {
                entries.push((*appid, entry.vectors(match_type)?));
            }
        }

        Ok(EmbeddingPage {
            entries,
            next: (end < ids.len()).then_some(PageCursor(end)),
        })
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> JsonCatalog {
        JsonCatalog::from_entries(
            2,
            vec![
                CatalogEntry::new(10, "Alpha")
                    .with_description(vec![vec![1.0, 0.0], vec![0.0, 1.0]])
                    .with_review("r1", vec![vec![1.0, 1.0]])
                    .with_review("r2", vec![vec![0.5, 0.0], vec![0.0, 0.5]]),
                CatalogEntry::new(20, "Beta").with_description(vec![vec![0.3, 0.7]]),
                CatalogEntry::new(30, "Gamma").with_review("r9", vec![vec![0.2, 0.2]]),
                CatalogEntry::new(40, "Delta"),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_names_and_membership() {
        let catalog = sample_catalog();
        assert_eq!(catalog.name_for(20).await.unwrap().as_deref(), Some("Beta"));
        assert_eq!(catalog.name_for(99).await.unwrap(), None);
        assert!(catalog.contains(40).await.unwrap());
        assert!(!catalog.contains(99).await.unwrap());
    }

    #[tokio::test]
    async fn test_review_chunks_are_flattened() {
        let catalog = sample_catalog();
        let reviews = catalog.embeddings_for(10, MatchType::Review).await.unwrap();
        assert_eq!(reviews.len(), 3);
        assert!(catalog.embeddings_for(40, MatchType::Review).await.unwrap().is_empty());
        assert!(catalog.embeddings_for(99, MatchType::Description).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_review_count_counts_reviews_not_chunks() {
        let catalog = sample_catalog();
        assert_eq!(catalog.review_count(10).await.unwrap(), 2);
        assert_eq!(catalog.review_count(30).await.unwrap(), 1);
        assert_eq!(catalog.review_count(40).await.unwrap(), 0);
        assert_eq!(catalog.review_count(99).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pagination_covers_only_owners() {
        let catalog = sample_catalog();

        let first = catalog
            .embedding_page(MatchType::Description, PageCursor::start(), 1)
            .await
            .unwrap();
        assert_eq!(first.entries.len(), 1);
        assert_eq!(first.entries[0].0, 10);

        let second = catalog
            .embedding_page(MatchType::Description, first.next.unwrap(), 1)
            .await
            .unwrap();
        assert_eq!(second.entries[0].0, 20);
        assert!(second.next.is_none());

        let reviews = catalog
            .embedding_page(MatchType::Review, PageCursor::start(), 100)
            .await
            .unwrap();
        let ids: Vec<_> = reviews.entries.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![10, 30]);
    }

    #[tokio::test]
    async fn test_page_rejects_all() {
        let catalog = sample_catalog();
        assert!(catalog
            .embedding_page(MatchType::All, PageCursor::start(), 10)
            .await
            .is_err());
    }

    #[test]
    fn test_dimension_is_validated() {
        let err = JsonCatalog::from_entries(
            3,
            vec![CatalogEntry::new(1, "Bad").with_description(vec![vec![1.0, 0.0]])],
        )
        .unwrap_err();
        assert!(matches!(err, GameLensError::DimensionMismatch { expected: 3, actual: 2 }));
    }

    #[test]
    fn test_duplicate_appid_rejected() {
        let err = JsonCatalog::from_entries(
            2,
            vec![CatalogEntry::new(1, "A"), CatalogEntry::new(1, "B")],
        )
        .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        sample_catalog().save(&path).unwrap();

        let loaded = JsonCatalog::load(&path).unwrap();
        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded.ids_with(MatchType::Review), &[10, 30]);
        assert_eq!(loaded.iter_vectors(MatchType::Description).count(), 2);
    }
}
