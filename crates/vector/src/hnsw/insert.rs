use chrono::Utc;
use gamelens_common::Result;
use ordered_float::OrderedFloat;
use tracing::{info, warn};

use super::graph::{HnswConfig, HnswIndex};
use crate::aggregate::mean_pool;
use crate::store::{JsonCatalog, MetadataStore};
use crate::types::{EntityId, MatchType};

impl HnswIndex {
    /// Index one vector per entity: the mean of its vectors of `match_type`
    ///
    /// Entities whose mean cannot be scored (zero norm) are left out, the same
    /// candidates an exhaustive scan skips.
    pub fn from_catalog(catalog: &JsonCatalog, match_type: MatchType, config: HnswConfig) -> Result<Self> {
        let mut index = Self::new(catalog.dimension(), config);
        let mut skipped = 0usize;

        for (appid, vectors) in catalog.iter_vectors(match_type) {
            match mean_pool(&vectors).and_then(|mean| index.insert(appid, &mean)) {
                Ok(()) => {}
                Err(e) if e.is_skippable_candidate() => {
                    warn!("Leaving appid {} out of the {} index: {}", appid, match_type, e);
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        index.built_at = Utc::now();
        info!(
            "Built {} index - {} vectors, {} skipped",
            match_type,
            index.labels.len(),
            skipped
        );
        Ok(index)
    }

    /// Insert one vector. Layers above the node's level are descended
    /// greedily; at each level down to 0 the node links to its closest
    /// candidates and the back-links are pruned to capacity.
    pub fn insert(&mut self, appid: EntityId, vector: &[f32]) -> Result<()> {
        let prepared = self.prepare(vector)?;
        let id = self.labels.len() as u32;
        let level = self.random_level(id);

        self.labels.push(appid);
        self.vectors.extend_from_slice(&prepared);
        self.neighbors.push(vec![Vec::new(); level + 1]);

        let entry_point = match self.entry_point {
            Some(ep) => ep,
            None => {
                self.entry_point = Some(id);
                self.max_layer = level;
                return Ok(());
            }
        };

        let mut current = entry_point;
        for layer in (level + 1..=self.max_layer).rev() {
            if let Some(&(_, nearest)) = self
                .search_layer(&prepared, std::slice::from_ref(&current), 1, layer)
                .first()
            {
                current = nearest;
            }
        }

        let mut layer_eps = vec![current];
        for layer in (0..=level.min(self.max_layer)).rev() {
            let candidates: Vec<(f32, u32)> = self
                .search_layer(&prepared, &layer_eps, self.config.ef_construction, layer)
                .into_iter()
                .filter(|&(_, candidate)| candidate != id)
                .collect();

            let m_max = self.layer_capacity(layer);
            let selected: Vec<u32> = candidates.iter().take(m_max).map(|&(_, c)| c).collect();
            for &neighbor in &selected {
                self.link(neighbor, id, layer);
            }
            self.neighbors[id as usize][layer] = selected;

            if !candidates.is_empty() {
                layer_eps = candidates.iter().map(|&(_, c)| c).collect();
            }
        }

        if level > self.max_layer {
            self.max_layer = level;
            self.entry_point = Some(id);
        }
        Ok(())
    }

    fn layer_capacity(&self, layer: usize) -> usize {
        let capacity = if layer == 0 {
            self.config.m_max0
        } else {
            self.config.m
        };
        capacity.max(1)
    }

    /// Add `new` to `node`'s links at `layer`, keeping the closest when over capacity
    fn link(&mut self, node: u32, new: u32, layer: usize) {
        let m_max = self.layer_capacity(layer);
        let slot = node as usize;
        while self.neighbors[slot].len() <= layer {
            self.neighbors[slot].push(Vec::new());
        }
        self.neighbors[slot][layer].push(new);

        if self.neighbors[slot][layer].len() > m_max {
            let base = self.vector(node).to_vec();
            let mut ranked: Vec<(f32, u32)> = self.neighbors[slot][layer]
                .iter()
                .map(|&n| (self.distance_to(&base, n), n))
                .collect();
            ranked.sort_by_key(|&(distance, n)| (OrderedFloat(distance), n));
            ranked.truncate(m_max);
            self.neighbors[slot][layer] = ranked.into_iter().map(|(_, n)| n).collect();
        }
    }
}
