//! Path minimization of track hits.
//!
//! Orders the hits of every top-level track along the shortest open path
//! through them and stores the result as a derived track.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::must_use_candidate
)]

use crate::held_karp::{Cost, DistanceMatrix, HeldKarp, TourSolver};
use crate::node_selection::select_nodes;
use restrack_core::{Error, Hits, MinimizationError, Result, Track, TrackEvent};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Weighted cost of a segment crossing no energy, in distance units.
const UNCONNECTED_COST: f64 = 100.0;
/// Weighted costs above [`UNCONNECTED_COST`] are clamped to this.
const CAPPED_COST: f64 = 100.01;

/// How segment lengths are fed to the solver.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SegmentCost {
    /// Lengths multiplied by `factor` and truncated to integers.
    ///
    /// Paths whose lengths differ by less than `1 / factor` per segment
    /// cannot be told apart.
    Scaled {
        /// Multiplier applied before truncation.
        factor: f64,
    },
    /// Plain floating point lengths.
    Exact,
}

impl Default for SegmentCost {
    fn default() -> Self {
        Self::Scaled { factor: 100.0 }
    }
}

/// Path minimization configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PathMinimizationConfig {
    /// Segment cost representation.
    pub cost: SegmentCost,
    /// Tracks with more hits than this are logged as slow.
    pub warning_nodes: usize,
    /// Divide segment lengths by the energy found along them.
    pub weight_hits: bool,
    /// Radius of the cylinder used to weight segments (mm).
    pub tube_radius: f64,
    /// Fraction of the segment cut at each end of the weighting cylinder.
    pub tube_length_reduction: f64,
    /// Keep only this energy fraction of hits when a track exceeds
    /// `warning_nodes`.
    pub energy_threshold: Option<f64>,
}

impl Default for PathMinimizationConfig {
    fn default() -> Self {
        Self {
            cost: SegmentCost::default(),
            warning_nodes: 30,
            weight_hits: false,
            tube_radius: 2.5,
            tube_length_reduction: 0.25,
            energy_threshold: None,
        }
    }
}

impl PathMinimizationConfig {
    /// Sets the segment cost representation.
    #[must_use]
    pub fn with_cost(mut self, cost: SegmentCost) -> Self {
        self.cost = cost;
        self
    }

    /// Sets the warning threshold.
    #[must_use]
    pub fn with_warning_nodes(mut self, warning_nodes: usize) -> Self {
        self.warning_nodes = warning_nodes;
        self
    }

    /// Enables energy-weighted segments.
    #[must_use]
    pub fn with_weight_hits(mut self, weight_hits: bool) -> Self {
        self.weight_hits = weight_hits;
        self
    }

    /// Sets the node selection energy fraction.
    #[must_use]
    pub fn with_energy_threshold(mut self, energy_threshold: Option<f64>) -> Self {
        self.energy_threshold = energy_threshold;
        self
    }

    /// Checks parameter ranges.
    ///
    /// # Errors
    /// Returns a configuration error for an unusable parameter.
    pub fn validate(&self) -> Result<()> {
        if let SegmentCost::Scaled { factor } = self.cost {
            if !(factor > 0.0 && factor.is_finite()) {
                return Err(Error::ConfigError(format!(
                    "cost scale factor must be positive, got {factor}"
                )));
            }
        }
        if self.weight_hits && !(self.tube_radius > 0.0 && self.tube_radius.is_finite()) {
            return Err(Error::ConfigError(format!(
                "tube radius must be positive, got {}",
                self.tube_radius
            )));
        }
        if !(0.0..0.5).contains(&self.tube_length_reduction) {
            return Err(Error::ConfigError(format!(
                "tube length reduction must be in [0, 0.5), got {}",
                self.tube_length_reduction
            )));
        }
        if let Some(fraction) = self.energy_threshold {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(Error::ConfigError(format!(
                    "energy threshold must be in (0, 1], got {fraction}"
                )));
            }
        }
        Ok(())
    }
}

/// Visiting order computed for one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinimizedPath {
    /// Hit indices in visiting order.
    pub order: Vec<usize>,
    /// False when the solver failed and `order` is the input order.
    pub ok: bool,
}

impl MinimizedPath {
    fn identity(n: usize, ok: bool) -> Self {
        Self {
            order: (0..n).collect(),
            ok,
        }
    }
}

/// Shortest-open-path ordering of track hits.
#[derive(Debug, Clone)]
pub struct PathMinimizer<S = HeldKarp> {
    config: PathMinimizationConfig,
    solver: S,
}

impl PathMinimizer<HeldKarp> {
    /// Creates a minimizer using the exact Held-Karp solver.
    ///
    /// # Errors
    /// Returns a configuration error for an invalid configuration.
    pub fn new(config: PathMinimizationConfig) -> Result<Self> {
        Self::with_solver(config, HeldKarp)
    }
}

impl<S: TourSolver> PathMinimizer<S> {
    /// Creates a minimizer with a custom tour solver.
    ///
    /// # Errors
    /// Returns a configuration error for an invalid configuration.
    pub fn with_solver(config: PathMinimizationConfig, solver: S) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, solver })
    }

    /// Active configuration.
    pub fn config(&self) -> &PathMinimizationConfig {
        &self.config
    }

    /// Orders `hits` along the shortest open path.
    ///
    /// `origin` holds the full-resolution hits used to weight segments
    /// when `weight_hits` is enabled; `hits` itself is used otherwise.
    /// Up to three hits keep their order. A solver failure is logged and
    /// yields the input order with `ok == false`.
    pub fn minimize(&self, hits: &Hits, origin: Option<&Hits>) -> MinimizedPath {
        let n = hits.len();
        if n <= 3 {
            return MinimizedPath::identity(n, true);
        }
        if n > self.config.warning_nodes {
            log::warn!(
                "minimizing a path through {n} hits (estimated cost {:.3e}), this may be slow",
                HeldKarp::estimated_cost(n)
            );
        }

        let origin = origin.unwrap_or(hits);
        let order = match self.config.cost {
            SegmentCost::Scaled { factor } => {
                let matrix = DistanceMatrix::from_fn(n, |i, j| {
                    (self.segment_cost(hits, origin, i, j) * factor) as u32
                });
                self.solve(&matrix)
            }
            SegmentCost::Exact => {
                let matrix =
                    DistanceMatrix::from_fn(n, |i, j| self.segment_cost(hits, origin, i, j));
                self.solve(&matrix)
            }
        };

        match order {
            Ok(order) => MinimizedPath { order, ok: true },
            Err(err) => {
                log::warn!("path minimization of {n} hits failed: {err}, keeping input order");
                MinimizedPath::identity(n, false)
            }
        }
    }

    fn solve<C: Cost>(
        &self,
        matrix: &DistanceMatrix<C>,
    ) -> std::result::Result<Vec<usize>, MinimizationError> {
        let tour = self.solver.solve(matrix)?;
        let n = matrix.len();
        if tour.order.len() != n {
            return Err(MinimizationError::NoTour);
        }
        // The order must visit every node exactly once.
        let mut seen = vec![false; n];
        for &node in &tour.order {
            match seen.get_mut(node) {
                Some(visited) if !*visited => *visited = true,
                _ => return Err(MinimizationError::NoTour),
            }
        }
        Ok(tour.order)
    }

    /// Segment length, divided by the energy along it when weighting.
    fn segment_cost(&self, hits: &Hits, origin: &Hits, i: usize, j: usize) -> f64 {
        let distance = hits.distance(i, j);
        if !self.config.weight_hits {
            return distance;
        }

        let reduction = self.config.tube_length_reduction;
        let (a, b) = (hits.position(i), hits.position(j));
        let energy = origin.energy_in_cylinder(
            a.lerp(&b, reduction),
            a.lerp(&b, 1.0 - reduction),
            self.config.tube_radius,
        );
        if energy <= 0.0 {
            return UNCONNECTED_COST;
        }
        let weighted = distance / energy;
        if weighted > UNCONNECTED_COST {
            CAPPED_COST
        } else {
            weighted
        }
    }

    /// Minimizes every top-level track of `input`.
    ///
    /// The result holds a copy of all input tracks plus, for each
    /// top-level track, a derived track with the reordered hits.
    ///
    /// # Errors
    /// Propagates track bookkeeping errors.
    pub fn minimize_event(&self, input: &TrackEvent) -> Result<TrackEvent> {
        let mut output = input.clone();
        for index in input.top_level_indices() {
            let Some(track) = input.track(index) else {
                continue;
            };
            let origin = input.origin_track(index).map(|t| &t.hits);

            let selected;
            let hits = match self.config.energy_threshold {
                Some(fraction) if track.number_of_hits() > self.config.warning_nodes => {
                    selected = select_nodes(&track.hits, fraction);
                    &selected
                }
                _ => &track.hits,
            };

            let path = self.minimize(hits, origin);
            let mut minimized = Track::new(
                output.next_track_id(),
                track.track_id,
                hits.reordered(&path.order),
            );
            minimized.ok = path.ok;
            log::debug!(
                "track {}: length {:.2} -> {:.2}",
                track.track_id,
                track.length(),
                minimized.length()
            );
            output.add_track(minimized)?;
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::held_karp::Tour;
    use approx::assert_relative_eq;
    use restrack_core::Hit;

    struct FailingSolver;

    impl TourSolver for FailingSolver {
        fn solve<C: Cost>(&self, _: &DistanceMatrix<C>) -> std::result::Result<Tour<C>, MinimizationError> {
            Err(MinimizationError::Allocation { entries: 0 })
        }
    }

    fn line(xs: &[f64]) -> Hits {
        xs.iter().map(|&x| Hit::new(x, 0.0, 0.0, 1.0)).collect()
    }

    #[test]
    fn test_config_validation() {
        assert!(PathMinimizationConfig::default().validate().is_ok());
        let bad = PathMinimizationConfig::default().with_cost(SegmentCost::Scaled { factor: 0.0 });
        assert!(PathMinimizer::new(bad).is_err());
        let bad = PathMinimizationConfig::default().with_energy_threshold(Some(1.5));
        assert!(PathMinimizer::new(bad).is_err());
    }

    #[test]
    fn test_small_tracks_keep_order() {
        let minimizer = PathMinimizer::new(PathMinimizationConfig::default()).unwrap();
        let path = minimizer.minimize(&line(&[5.0, 0.0, 9.0]), None);
        assert_eq!(path.order, vec![0, 1, 2]);
        assert!(path.ok);
    }

    #[test]
    fn test_colinear_sorted() {
        let minimizer = PathMinimizer::new(PathMinimizationConfig::default()).unwrap();
        let hits = line(&[2.0, 0.0, 4.0, 1.0, 3.0]);
        let path = minimizer.minimize(&hits, None);
        assert!(path.ok);
        assert_relative_eq!(hits.reordered(&path.order).total_length(), 4.0);
    }

    #[test]
    fn test_exact_costs() {
        let config = PathMinimizationConfig::default().with_cost(SegmentCost::Exact);
        let minimizer = PathMinimizer::new(config).unwrap();
        let hits = line(&[0.3, 0.1, 0.4, 0.2]);
        let path = minimizer.minimize(&hits, None);
        assert_relative_eq!(hits.reordered(&path.order).total_length(), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_solver_failure_falls_back() {
        let minimizer =
            PathMinimizer::with_solver(PathMinimizationConfig::default(), FailingSolver).unwrap();
        let path = minimizer.minimize(&line(&[2.0, 0.0, 4.0, 1.0, 3.0]), None);
        assert_eq!(path.order, vec![0, 1, 2, 3, 4]);
        assert!(!path.ok);
    }

    #[test]
    fn test_weighted_segments_prefer_energy() {
        // Square corners; the origin track only has energy along the
        // left and bottom edges plus the right edge.
        let hits: Hits = vec![
            Hit::xz(0.0, 0.0, 1.0),
            Hit::xz(10.0, 0.0, 1.0),
            Hit::xz(0.0, 10.0, 1.0),
            Hit::xz(10.0, 10.0, 1.0),
        ]
        .into_iter()
        .collect();
        let mut origin = hits.clone();
        for step in 1..10 {
            let s = f64::from(step);
            origin.push(Hit::xz(0.0, s, 1.0));
            origin.push(Hit::xz(s, 0.0, 1.0));
            origin.push(Hit::xz(10.0, s, 1.0));
        }

        let config = PathMinimizationConfig::default().with_weight_hits(true);
        let minimizer = PathMinimizer::new(config).unwrap();
        let path = minimizer.minimize(&hits, Some(&origin));
        assert!(path.ok);
        let ordered = hits.reordered(&path.order);
        // Walks 2 -> 0 -> 1 -> 3 (or reversed), never along the empty top edge.
        let ends = [ordered.position(0), ordered.position(3)];
        assert!(ends.iter().all(|p| p.z > 5.0));
    }

    #[test]
    fn test_minimize_event_appends_derived_tracks() {
        let mut event = TrackEvent::new();
        event.push_track(0, line(&[2.0, 0.0, 4.0, 1.0, 3.0])).unwrap();
        event.push_track(0, line(&[50.0, 52.0])).unwrap();

        let minimizer = PathMinimizer::new(PathMinimizationConfig::default()).unwrap();
        let output = minimizer.minimize_event(&event).unwrap();

        assert_eq!(output.number_of_tracks(), 4);
        let derived = output.track(2).unwrap();
        assert_eq!(derived.parent_id, 1);
        assert_eq!(derived.track_id, 3);
        assert_relative_eq!(derived.length(), 4.0);
        assert_eq!(output.track(3).unwrap().parent_id, 2);
        assert_eq!(output.levels(), 2);
        assert!(output.is_ok());
    }

    #[test]
    fn test_minimize_event_with_selection() {
        let mut event = TrackEvent::new();
        let mut hits = line(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        hits.energy = vec![5.0, 1.0, 5.0, 1.0, 5.0, 1.0];
        event.push_track(0, hits).unwrap();

        let config = PathMinimizationConfig::default()
            .with_warning_nodes(4)
            .with_energy_threshold(Some(0.5));
        let minimizer = PathMinimizer::new(config).unwrap();
        let output = minimizer.minimize_event(&event).unwrap();
        let derived = output.track(1).unwrap();
        // 5 + 5 = 10 > 9: two hits kept.
        assert_eq!(derived.number_of_hits(), 2);
    }
}
