//! GameLens vector search
//!
//! Catalog storage, similarity scoring and the two ranking strategies
//! (HNSW index and exhaustive scan) behind one query engine.

pub mod aggregate;
pub mod engine;
pub mod exhaustive;
pub mod hnsw;
pub mod index;
pub mod index_ranker;
pub mod ranker;
pub mod similarity;
pub mod store;
pub mod topk;
pub mod types;

pub use aggregate::mean_pool;
pub use engine::{merge_ranked, RankingEngine, DEFAULT_RESULT_CAP};
pub use exhaustive::{CandidateScoring, ExhaustiveRanker};
pub use hnsw::{HnswConfig, HnswIndex};
pub use index::{DistanceMetric, IndexSet, NearestNeighborIndex, Neighbor};
pub use index_ranker::IndexRanker;
pub use ranker::{build_ranker, RankRequest, Ranker};
pub use similarity::{cosine, max_over_set};
pub use store::{CatalogEntry, CatalogSnapshot, JsonCatalog, MetadataStore, PageCursor};
pub use topk::TopK;
pub use types::{Embedding, EntityId, MatchType, ScoredMatch};
