//! Radius-based hits-to-track clustering.
//!
//! Breadth-first growth: a cluster starts at the first unassigned hit and
//! repeatedly absorbs every unassigned hit closer than the cluster
//! distance to any member.

use restrack_core::{emit_tracks, Error, Hits, HitsToTrack, Result, TrackEvent};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Radius clustering configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RadiusClusteringConfig {
    /// Two hits closer than this (strictly) are connected (mm).
    pub cluster_distance: f64,
}

impl Default for RadiusClusteringConfig {
    fn default() -> Self {
        Self {
            cluster_distance: 2.5,
        }
    }
}

impl RadiusClusteringConfig {
    /// Sets the connection distance.
    #[must_use]
    pub fn with_cluster_distance(mut self, cluster_distance: f64) -> Self {
        self.cluster_distance = cluster_distance;
        self
    }

    /// Checks that the connection distance is usable.
    ///
    /// # Errors
    /// Returns a configuration error for a non-positive distance.
    pub fn validate(&self) -> Result<()> {
        if self.cluster_distance > 0.0 && self.cluster_distance.is_finite() {
            Ok(())
        } else {
            Err(Error::ConfigError(format!(
                "cluster distance must be positive, got {}",
                self.cluster_distance
            )))
        }
    }
}

/// Connected components of the "closer than d" relation.
#[derive(Clone, Debug)]
pub struct RadiusClustering {
    config: RadiusClusteringConfig,
}

impl RadiusClustering {
    /// Creates the algorithm.
    ///
    /// # Errors
    /// Returns a configuration error for a non-positive distance.
    pub fn new(config: RadiusClusteringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RadiusClusteringConfig {
        &self.config
    }

    /// Cluster members as hit indices, each cluster in descending order.
    ///
    /// Clusters are seeded from the lowest unassigned index, so tracks
    /// come out in order of their first hit.
    fn components(&self, hits: &Hits) -> Vec<Vec<usize>> {
        let d2 = self.config.cluster_distance * self.config.cluster_distance;
        let mut assigned = vec![false; hits.len()];
        let mut clusters = Vec::new();

        for seed in 0..hits.len() {
            if assigned[seed] {
                continue;
            }
            assigned[seed] = true;
            let mut queue = vec![seed];
            let mut head = 0;
            while head < queue.len() {
                let current = queue[head];
                head += 1;
                for other in 0..hits.len() {
                    if !assigned[other] && hits.distance_squared(current, other) < d2 {
                        assigned[other] = true;
                        queue.push(other);
                    }
                }
            }
            queue.sort_unstable_by(|a, b| b.cmp(a));
            clusters.push(queue);
        }
        clusters
    }
}

impl HitsToTrack for RadiusClustering {
    fn find_tracks(&self, hits: &Hits, event: &mut TrackEvent) -> Result<usize> {
        if hits.kind()?.is_none() {
            return Ok(0);
        }

        let clusters = self
            .components(hits)
            .into_iter()
            .map(|members| hits.reordered(&members));
        let stats = emit_tracks(clusters, event)?;
        log::debug!(
            "{}: {} hits gave {} tracks, largest has {} hits",
            self.name(),
            stats.hits_processed,
            stats.tracks_found,
            stats.largest_track
        );
        Ok(stats.tracks_found)
    }

    fn name(&self) -> &'static str {
        "Radius"
    }
}
