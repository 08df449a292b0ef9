//! restrack-algorithms: Hits-to-track clustering and track refinement.
//!
//! This crate provides:
//! - **Mesh** clustering - connected cells of a spatial mesh, O(n) average
//! - **Radius** clustering - exact connectivity under a cluster distance
//! - **Held-Karp** path minimization - optimal hit ordering of a track
//! - **Reduction** and **detachment** of track nodes
//!
#![warn(missing_docs)]

mod detach;
mod held_karp;
pub mod mesh;
mod mesh_clustering;
mod node_selection;
mod path_minimization;
mod processing;
mod radius_clustering;
mod reduction;

pub use detach::{DetachConfig, DetachIsolatedNodes};
pub use held_karp::{Cost, DistanceMatrix, HeldKarp, Tour, TourSolver};
pub use mesh::SpatialMesh;
pub use mesh_clustering::{MeshClustering, MeshClusteringConfig};
pub use node_selection::select_nodes;
pub use path_minimization::{
    MinimizedPath, PathMinimizationConfig, PathMinimizer, SegmentCost,
};
pub use processing::{
    hits_to_tracks, process_event, process_events, HitsToTrackAlgorithm, Pipeline, PipelineConfig,
};
pub use radius_clustering::{RadiusClustering, RadiusClusteringConfig};
pub use reduction::{ReductionConfig, TrackReduction};

// Re-export core clustering traits
pub use restrack_core::clustering::{ClusteringStatistics, HitsToTrack};
