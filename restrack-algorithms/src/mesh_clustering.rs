//! Mesh-based hits-to-track clustering.
//!
//! Hits are binned on a [`SpatialMesh`]; every connected group of
//! occupied cells becomes one track.

use crate::mesh::SpatialMesh;
use restrack_core::{emit_tracks, Error, Hits, HitsToTrack, Position, Result, TrackEvent};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Mesh clustering configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MeshClusteringConfig {
    /// Cell side (mm).
    pub cell_resolution: f64,
    /// Side of the cubic mesh (mm).
    pub net_size: f64,
    /// Lower corner of the mesh (mm).
    pub net_origin: Position,
}

impl Default for MeshClusteringConfig {
    fn default() -> Self {
        Self {
            cell_resolution: 10.0,
            net_size: 1000.0,
            net_origin: Position::new(-500.0, -500.0, -500.0),
        }
    }
}

impl MeshClusteringConfig {
    /// Sets the cell side.
    #[must_use]
    pub fn with_cell_resolution(mut self, cell_resolution: f64) -> Self {
        self.cell_resolution = cell_resolution;
        self
    }

    /// Sets the mesh side.
    #[must_use]
    pub fn with_net_size(mut self, net_size: f64) -> Self {
        self.net_size = net_size;
        self
    }

    /// Sets the mesh origin.
    #[must_use]
    pub fn with_net_origin(mut self, net_origin: Position) -> Self {
        self.net_origin = net_origin;
        self
    }

    /// Builds an empty mesh with this geometry.
    ///
    /// # Errors
    /// Returns a configuration error for an unusable geometry.
    pub fn build_mesh(&self) -> Result<SpatialMesh> {
        SpatialMesh::from_resolution(self.net_size, self.cell_resolution, self.net_origin)
    }
}

/// Groups hits by connectivity of occupied mesh cells.
#[derive(Clone, Debug)]
pub struct MeshClustering {
    config: MeshClusteringConfig,
}

impl MeshClustering {
    /// Creates the algorithm, validating the mesh geometry.
    ///
    /// # Errors
    /// Returns a configuration error for an unusable geometry.
    pub fn new(config: MeshClusteringConfig) -> Result<Self> {
        config.build_mesh()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &MeshClusteringConfig {
        &self.config
    }
}

impl HitsToTrack for MeshClustering {
    fn find_tracks(&self, hits: &Hits, event: &mut TrackEvent) -> Result<usize> {
        if hits.kind()?.is_none() {
            return Ok(0);
        }

        let mut mesh = self.config.build_mesh()?;
        let nodes = mesh.set_nodes_from_hits(hits);

        let mut clusters = vec![Hits::new(); mesh.number_of_groups()];
        for (index, (hit, node)) in hits.iter().zip(nodes).enumerate() {
            let group = mesh.node_group(node).ok_or_else(|| {
                Error::ClusteringError(format!("hit {index} has no mesh node"))
            })?;
            clusters[group].push(hit);
        }

        let stats = emit_tracks(clusters, event)?;
        log::debug!(
            "{}: {} hits in {} nodes gave {} tracks",
            self.name(),
            stats.hits_processed,
            mesh.number_of_nodes(),
            stats.tracks_found
        );
        Ok(stats.tracks_found)
    }

    fn name(&self) -> &'static str {
        "Mesh"
    }
}
