//! Hierarchical Navigable Small World graph over entity vectors.
//!
//! Snapshots are built by the offline pipeline (or tests), serialized as JSON
//! and loaded read-only at startup. Cosine indexes store unit vectors so the
//! distance `1 - dot` equals `1 - cosine`.

/// Graph storage, configuration and snapshot I/O.
pub mod graph;
/// Insertion with bidirectional links and neighbor pruning.
pub mod insert;
/// Layer search and multi-layer kNN.
pub mod search;

pub use graph::{HnswConfig, HnswIndex};
