use chrono::{DateTime, Utc};
use gamelens_common::{GameLensError, Result};
use ndarray::aview1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::index::{DistanceMetric, NearestNeighborIndex, Neighbor};
use crate::similarity::norm;
use crate::types::EntityId;

/// Tuning parameters for an HNSW index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Links per node above layer 0
    pub m: usize,
    /// Links per node at layer 0
    pub m_max0: usize,
    /// Candidate list size while building
    pub ef_construction: usize,
    /// Candidate list size while querying (raised to k when smaller)
    pub ef_search: usize,
    /// Layer cap
    pub max_layers: usize,
    pub metric: DistanceMetric,
    /// Seed for layer assignment, so rebuilds are reproducible
    pub seed: u64,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: 16,
            m_max0: 32,
            ef_construction: 200,
            ef_search: 64,
            max_layers: 16,
            metric: DistanceMetric::Cosine,
            seed: 0x5eed,
        }
    }
}

/// Immutable-after-build HNSW graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswIndex {
    pub(crate) config: HnswConfig,
    pub(crate) dimension: usize,
    /// internal id -> appid
    pub(crate) labels: Vec<EntityId>,
    /// Contiguous vector arena, `dimension` floats per node
    pub(crate) vectors: Vec<f32>,
    /// [node][layer][neighbor]
    pub(crate) neighbors: Vec<Vec<Vec<u32>>>,
    pub(crate) entry_point: Option<u32>,
    pub(crate) max_layer: usize,
    pub(crate) built_at: DateTime<Utc>,
}

impl HnswIndex {
    /// Empty index
    pub fn new(dimension: usize, config: HnswConfig) -> Self {
        Self {
            config,
            dimension,
            labels: Vec::new(),
            vectors: Vec::new(),
            neighbors: Vec::new(),
            entry_point: None,
            max_layer: 0,
            built_at: Utc::now(),
        }
    }

    /// Build an index from `(appid, vector)` pairs
    pub fn build<I>(dimension: usize, config: HnswConfig, items: I) -> Result<Self>
    where
        I: IntoIterator<Item = (EntityId, Vec<f32>)>,
    {
        let mut index = Self::new(dimension, config);
        for (appid, vector) in items {
            index.insert(appid, &vector)?;
        }
        index.built_at = Utc::now();
        Ok(index)
    }

    /// Load a snapshot written by [`HnswIndex::save`]
    ///
    /// The graph is checked before use, so a corrupt snapshot is refused
    /// here instead of failing inside a query.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let index: Self = serde_json::from_str(&data)?;

        index.check_structure().map_err(|reason| {
            GameLensError::index_config(format!("corrupt snapshot {}: {}", path.display(), reason))
        })?;
        Ok(index)
    }

    /// Arena sizes, neighbor ids and entry point agree with each other
    pub(crate) fn check_structure(&self) -> std::result::Result<(), String> {
        let nodes = self.labels.len();
        if self.vectors.len() != nodes * self.dimension || self.neighbors.len() != nodes {
            return Err(format!(
                "{} labels, {} floats, {} adjacency lists",
                nodes,
                self.vectors.len(),
                self.neighbors.len()
            ));
        }

        for (node, layers) in self.neighbors.iter().enumerate() {
            if layers.is_empty() || layers.len() > self.max_layer + 1 {
                return Err(format!(
                    "node {} has {} layers, max layer is {}",
                    node,
                    layers.len(),
                    self.max_layer
                ));
            }
            if let Some(&bad) = layers.iter().flatten().find(|&&n| n as usize >= nodes) {
                return Err(format!("node {} links to missing node {}", node, bad));
            }
        }

        match self.entry_point {
            None if nodes == 0 => Ok(()),
            None => Err(format!("{} nodes but no entry point", nodes)),
            Some(ep) if ep as usize >= nodes => Err(format!("entry point {} out of range", ep)),
            Some(ep) if self.neighbors[ep as usize].len() != self.max_layer + 1 => Err(format!(
                "entry point {} has {} layers, max layer is {}",
                ep,
                self.neighbors[ep as usize].len(),
                self.max_layer
            )),
            Some(_) => Ok(()),
        }
    }

    /// Write snapshot to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn config(&self) -> &HnswConfig {
        &self.config
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    #[inline]
    pub(crate) fn vector(&self, id: u32) -> &[f32] {
        let start = id as usize * self.dimension;
        &self.vectors[start..start + self.dimension]
    }

    #[inline]
    pub(crate) fn has_layer(&self, id: u32, layer: usize) -> bool {
        self.neighbors[id as usize].len() > layer
    }

    /// Bring a vector into the form stored in (and compared against) the graph
    pub(crate) fn prepare(&self, vector: &[f32]) -> Result<Vec<f32>> {
        if vector.len() != self.dimension {
            return Err(GameLensError::dimension_mismatch(self.dimension, vector.len()));
        }
        match self.config.metric {
            DistanceMetric::Cosine => {
                let n = norm(vector);
                if !n.is_finite() || n == 0.0 {
                    return Err(GameLensError::zero_vector("cannot normalize zero-norm vector"));
                }
                Ok(vector.iter().map(|x| x / n).collect())
            }
            DistanceMetric::InnerProduct | DistanceMetric::L2 => Ok(vector.to_vec()),
        }
    }

    /// Distance between a prepared query and node `id`
    #[inline]
    pub(crate) fn distance_to(&self, query: &[f32], id: u32) -> f32 {
        let stored = self.vector(id);
        match self.config.metric {
            DistanceMetric::Cosine | DistanceMetric::InnerProduct => {
                1.0 - aview1(query).dot(&aview1(stored))
            }
            DistanceMetric::L2 => query
                .iter()
                .zip(stored)
                .map(|(a, b)| (a - b) * (a - b))
                .sum(),
        }
    }

    /// Exponentially distributed layer for node `id`
    pub(crate) fn random_level(&self, id: u32) -> usize {
        let mut rng = StdRng::seed_from_u64(self.config.seed ^ u64::from(id).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        let ml = 1.0 / (self.config.m.max(2) as f64).ln();
        let r: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
        let level = (-r.ln() * ml).floor() as usize;
        level.min(self.config.max_layers.saturating_sub(1))
    }
}

impl NearestNeighborIndex for HnswIndex {
    fn knn_query(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let prepared = self.prepare(query)?;
        Ok(self
            .knn_search(&prepared, k)
            .into_iter()
            .map(|(distance, id)| Neighbor {
                appid: self.labels[id as usize],
                distance,
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> DistanceMetric {
        self.config.metric
    }

    fn len(&self) -> usize {
        self.labels.len()
    }
}
