//! High-level processing helpers that chain clustering and refinement.

use rayon::prelude::*;

use crate::{
    DetachConfig, DetachIsolatedNodes, MeshClustering, MeshClusteringConfig,
    PathMinimizationConfig, PathMinimizer, RadiusClustering, RadiusClusteringConfig,
    ReductionConfig, TrackReduction,
};
use restrack_core::{Error, Hits, HitsToTrack, Result, TrackEvent};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Hits-to-track clustering strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum HitsToTrackAlgorithm {
    /// Connected cells of a spatial mesh.
    #[default]
    Mesh,
    /// Connected components of the cluster-distance graph.
    Radius,
}

impl std::str::FromStr for HitsToTrackAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mesh" => Ok(Self::Mesh),
            "radius" => Ok(Self::Radius),
            other => Err(Error::ConfigError(format!("unknown algorithm: {other}"))),
        }
    }
}

/// Configuration of the whole processing chain.
///
/// Refinement steps run in the order reduction, path minimization,
/// detachment; a `None` step is skipped.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// Clustering strategy.
    pub algorithm: HitsToTrackAlgorithm,
    /// Parameters of the mesh strategy.
    pub mesh: MeshClusteringConfig,
    /// Parameters of the radius strategy.
    pub radius: RadiusClusteringConfig,
    /// Node-count reduction, run first.
    pub reduction: Option<ReductionConfig>,
    /// Path minimization, run second.
    pub path: Option<PathMinimizationConfig>,
    /// Isolated node detachment, run last.
    pub detach: Option<DetachConfig>,
}

impl PipelineConfig {
    /// Sets the clustering strategy.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HitsToTrackAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Enables every refinement step with its default parameters.
    #[must_use]
    pub fn with_default_refinement(mut self) -> Self {
        self.reduction = Some(ReductionConfig::default());
        self.path = Some(PathMinimizationConfig::default());
        self.detach = Some(DetachConfig::default());
        self
    }

    /// Builds the clustering strategy selected by `algorithm`.
    ///
    /// # Errors
    /// Returns a configuration error for invalid parameters.
    pub fn clustering(&self) -> Result<Box<dyn HitsToTrack>> {
        let clustering: Box<dyn HitsToTrack> = match self.algorithm {
            HitsToTrackAlgorithm::Mesh => Box::new(MeshClustering::new(self.mesh.clone())?),
            HitsToTrackAlgorithm::Radius => Box::new(RadiusClustering::new(self.radius.clone())?),
        };
        Ok(clustering)
    }
}

/// Clusters an event of possibly mixed projections.
///
/// The hits are split by projection and clustered XZ first, then YZ,
/// then XYZ. The numbers of XZ and YZ tracks are recorded on the event.
///
/// # Errors
/// Returns an error for hits without a valid projection.
pub fn hits_to_tracks(hits: &Hits, clustering: &dyn HitsToTrack) -> Result<TrackEvent> {
    let split = hits.split_by_kind()?;
    let mut event = TrackEvent::new();

    let x_tracks = clustering.find_tracks(&split.xz, &mut event)?;
    let y_tracks = clustering.find_tracks(&split.yz, &mut event)?;
    clustering.find_tracks(&split.xyz, &mut event)?;

    event.set_number_of_x_tracks(x_tracks);
    event.set_number_of_y_tracks(y_tracks);
    Ok(event)
}

/// A validated processing chain.
pub struct Pipeline {
    clustering: Box<dyn HitsToTrack>,
    reduction: Option<TrackReduction>,
    path: Option<PathMinimizer>,
    detach: Option<DetachIsolatedNodes>,
}

impl Pipeline {
    /// Validates every step of `config`.
    ///
    /// # Errors
    /// Returns the first configuration error found.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            clustering: config.clustering()?,
            reduction: config.reduction.clone().map(TrackReduction::new).transpose()?,
            path: config.path.clone().map(PathMinimizer::new).transpose()?,
            detach: config.detach.clone().map(DetachIsolatedNodes::new).transpose()?,
        })
    }

    /// Name of the clustering strategy.
    #[must_use]
    pub fn clustering_name(&self) -> &'static str {
        self.clustering.name()
    }

    /// Runs the chain on the hits of one event.
    ///
    /// # Errors
    /// Returns an error for hits without a valid projection.
    pub fn process_event(&self, hits: &Hits) -> Result<TrackEvent> {
        let mut event = hits_to_tracks(hits, self.clustering.as_ref())?;
        if let Some(reduction) = &self.reduction {
            event = reduction.reduce_event(&event)?;
        }
        if let Some(path) = &self.path {
            event = path.minimize_event(&event)?;
        }
        if let Some(detach) = &self.detach {
            event = detach.detach_event(&event)?;
        }
        Ok(event)
    }

    /// Runs the chain on independent events in parallel.
    ///
    /// The output keeps the input order.
    ///
    /// # Errors
    /// Returns the first event error.
    pub fn process_events(&self, events: &[Hits]) -> Result<Vec<TrackEvent>> {
        events
            .par_iter()
            .map(|hits| self.process_event(hits))
            .collect()
    }
}

/// Builds a pipeline from `config` and runs it on one event.
///
/// # Errors
/// Returns configuration or event errors.
pub fn process_event(hits: &Hits, config: &PipelineConfig) -> Result<TrackEvent> {
    Pipeline::new(config)?.process_event(hits)
}

/// Builds a pipeline from `config` and runs it on many events in parallel.
///
/// # Errors
/// Returns configuration or event errors.
pub fn process_events(events: &[Hits], config: &PipelineConfig) -> Result<Vec<TrackEvent>> {
    Pipeline::new(config)?.process_events(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use restrack_core::{Hit, HitKind};

    fn mixed_event() -> Hits {
        let mut hits = Hits::new();
        for i in 0..4 {
            let s = f64::from(i);
            hits.push(Hit::xz(s, s, 1.0));
            hits.push(Hit::yz(s, s, 1.0));
            hits.push(Hit::xz(200.0 + s, 0.0, 1.0));
        }
        hits
    }

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!("mesh".parse::<HitsToTrackAlgorithm>().unwrap(), HitsToTrackAlgorithm::Mesh);
        assert_eq!("Radius".parse::<HitsToTrackAlgorithm>().unwrap(), HitsToTrackAlgorithm::Radius);
        assert!("dbscan".parse::<HitsToTrackAlgorithm>().is_err());
    }

    #[test]
    fn test_hits_to_tracks_counts_projections() {
        let config = PipelineConfig::default();
        let event = hits_to_tracks(&mixed_event(), config.clustering().unwrap().as_ref()).unwrap();

        assert_eq!(event.number_of_tracks(), 3);
        assert_eq!(event.number_of_x_tracks(), 2);
        assert_eq!(event.number_of_y_tracks(), 1);
        assert!(event.track(0).unwrap().is_xz());
        assert!(event.track(2).unwrap().is_yz());
        assert_eq!(event.total_hits(), 12);
    }

    #[test]
    fn test_pipeline_rejects_bad_config() {
        let mut config = PipelineConfig::default().with_algorithm(HitsToTrackAlgorithm::Radius);
        config.radius.cluster_distance = 0.0;
        assert!(Pipeline::new(&config).is_err());

        let mut config = PipelineConfig::default();
        config.reduction = Some(ReductionConfig::default().with_max_nodes(0));
        assert!(Pipeline::new(&config).is_err());
    }

    #[test]
    fn test_full_chain() {
        let config = PipelineConfig::default()
            .with_algorithm(HitsToTrackAlgorithm::Radius)
            .with_default_refinement();
        let event = process_event(&mixed_event(), &config).unwrap();

        // Clustering, reduction, minimization, detachment: four levels.
        assert_eq!(event.levels(), 4);
        assert_eq!(event.number_of_tracks_of(HitKind::Xz), 2);
        assert_eq!(event.number_of_tracks_of(HitKind::Yz), 1);
        assert!(event.is_ok());
    }

    #[test]
    fn test_process_events_keeps_order() {
        let events = vec![mixed_event(), Hits::new(), mixed_event()];
        let output = process_events(&events, &PipelineConfig::default()).unwrap();
        assert_eq!(output.len(), 3);
        assert_eq!(output[0].number_of_tracks(), 3);
        assert!(output[1].is_empty());
        assert_eq!(output[2].number_of_tracks(), 3);
    }
}
