use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use super::graph::HnswIndex;

/// A visited node, ordered by distance then id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Hit {
    pub distance: OrderedFloat<f32>,
    pub id: u32,
}

impl Hit {
    fn new(distance: f32, id: u32) -> Self {
        Self {
            distance: OrderedFloat(distance),
            id,
        }
    }
}

impl HnswIndex {
    /// Greedy best-first search of one layer.
    /// Returns up to `ef` closest nodes as `(distance, id)`, ascending.
    pub(crate) fn search_layer(
        &self,
        query: &[f32],
        entry_points: &[u32],
        ef: usize,
        layer: usize,
    ) -> Vec<(f32, u32)> {
        // No layer holds more than every node
        let ef = ef.clamp(1, self.labels.len().max(1));
        let mut visited: HashSet<u32> = HashSet::with_capacity(ef * 4);
        // Closest candidate on top
        let mut candidates: BinaryHeap<Reverse<Hit>> = BinaryHeap::with_capacity(ef * 2);
        // Farthest result on top
        let mut results: BinaryHeap<Hit> = BinaryHeap::with_capacity(ef + 1);

        for &ep in entry_points {
            if visited.insert(ep) {
                let hit = Hit::new(self.distance_to(query, ep), ep);
                candidates.push(Reverse(hit));
                results.push(hit);
                if results.len() > ef {
                    results.pop();
                }
            }
        }

        while let Some(Reverse(candidate)) = candidates.pop() {
            let worst = results.peek().map_or(f32::MAX, |r| r.distance.into_inner());
            if results.len() >= ef && candidate.distance.into_inner() > worst {
                break;
            }
            if !self.has_layer(candidate.id, layer) {
                continue;
            }

            for &neighbor in &self.neighbors[candidate.id as usize][layer] {
                if !visited.insert(neighbor) {
                    continue;
                }
                let distance = self.distance_to(query, neighbor);
                let worst = results.peek().map_or(f32::MAX, |r| r.distance.into_inner());
                if results.len() < ef || distance < worst {
                    let hit = Hit::new(distance, neighbor);
                    candidates.push(Reverse(hit));
                    results.push(hit);
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        results
            .into_sorted_vec()
            .into_iter()
            .map(|hit| (hit.distance.into_inner(), hit.id))
            .collect()
    }

    /// Multi-layer kNN: descend with ef=1, then search layer 0 with `ef_search`
    pub(crate) fn knn_search(&self, query: &[f32], k: usize) -> Vec<(f32, u32)> {
        let entry_point = match self.entry_point {
            Some(ep) if k > 0 => ep,
            _ => return Vec::new(),
        };

        let mut current = entry_point;
        for layer in (1..=self.max_layer).rev() {
            if let Some(&(_, nearest)) = self
                .search_layer(query, std::slice::from_ref(&current), 1, layer)
                .first()
            {
                current = nearest;
            }
        }

        let ef = self.config.ef_search.max(k);
        let mut results = self.search_layer(query, std::slice::from_ref(&current), ef, 0);
        results.truncate(k);
        results
    }
}

#[cfg(test)]
mod tests {
    use crate::hnsw::{HnswConfig, HnswIndex};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn brute_force(index: &HnswIndex, query: &[f32], k: usize) -> Vec<u32> {
        let mut all: Vec<(f32, u32)> = (0..index.labels.len() as u32)
            .map(|id| (index.distance_to(query, id), id))
            .collect();
        all.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        all.into_iter().take(k).map(|(_, id)| id).collect()
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = HnswIndex::new(3, HnswConfig::default());
        assert!(index.knn_search(&[1.0, 0.0, 0.0], 5).is_empty());
    }

    #[test]
    fn test_results_ascend_by_distance() {
        let mut rng = StdRng::seed_from_u64(5);
        let items: Vec<(u64, Vec<f32>)> = (0..200)
            .map(|i| (i, (0..8).map(|_| rng.random_range(-1.0..1.0)).collect()))
            .collect();
        let index = HnswIndex::build(8, HnswConfig::default(), items).unwrap();

        let query = index.prepare(&[0.3, -0.1, 0.8, 0.0, 0.2, -0.5, 0.1, 0.4]).unwrap();
        let results = index.knn_search(&query, 10);
        assert_eq!(results.len(), 10);
        assert!(results.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn test_recall_against_brute_force() {
        let mut rng = StdRng::seed_from_u64(17);
        let items: Vec<(u64, Vec<f32>)> = (0..300)
            .map(|i| (i, (0..16).map(|_| rng.random_range(-1.0..1.0)).collect()))
            .collect();
        let index = HnswIndex::build(16, HnswConfig::default(), items).unwrap();

        let mut found = 0;
        let mut total = 0;
        for _ in 0..20 {
            let raw: Vec<f32> = (0..16).map(|_| rng.random_range(-1.0..1.0)).collect();
            let query = index.prepare(&raw).unwrap();
            let expected = brute_force(&index, &query, 10);
            let got: Vec<u32> = index.knn_search(&query, 10).into_iter().map(|(_, id)| id).collect();
            found += expected.iter().filter(|id| got.contains(id)).count();
            total += expected.len();
        }
        assert!(found as f32 / total as f32 >= 0.9, "recall {}/{}", found, total);
    }

    #[test]
    fn test_k_larger_than_index() {
        let items = vec![(1, vec![1.0, 0.0]), (2, vec![0.0, 1.0])];
        let index = HnswIndex::build(2, HnswConfig::default(), items).unwrap();
        let query = index.prepare(&[1.0, 0.0]).unwrap();
        assert_eq!(index.knn_search(&query, 10).len(), 2);
        assert!(index.knn_search(&query, 0).is_empty());
    }

    #[test]
    fn test_huge_k_is_bounded_by_index_size() {
        let items = (0..20u64).map(|i| {
            let angle = i as f32 * 0.3;
            (i, vec![angle.cos(), angle.sin()])
        });
        let index = HnswIndex::build(2, HnswConfig::default(), items).unwrap();
        let query = index.prepare(&[1.0, 0.0]).unwrap();
        assert_eq!(index.knn_search(&query, usize::MAX / 2).len(), 20);
        assert_eq!(index.knn_search(&query, usize::MAX).len(), 20);
    }
}
