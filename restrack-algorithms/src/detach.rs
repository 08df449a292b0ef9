//! Detachment of isolated nodes from ordered tracks.
//!
//! After path minimization every interior node is checked against both
//! neighbours along the path. A node far from them and not linked by any
//! energy of the origin track is split off as its own track.

use restrack_core::{Error, Hits, Result, Track, TrackEvent};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Detachment configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DetachConfig {
    /// Radius of the connecting cylinders (mm).
    pub tube_radius: f64,
    /// Fraction of each segment cut at both ends of its cylinder.
    pub tube_length_reduction: f64,
    /// Mean distance to the neighbours above which a node may detach (mm).
    pub threshold_distance: f64,
    /// Connecting energy at or below which a node may detach.
    pub connectivity_threshold: f64,
}

impl Default for DetachConfig {
    fn default() -> Self {
        Self {
            tube_radius: 0.2,
            tube_length_reduction: 0.2,
            threshold_distance: 8.0,
            connectivity_threshold: 0.0,
        }
    }
}

impl DetachConfig {
    /// Checks parameter ranges.
    ///
    /// # Errors
    /// Returns a configuration error for an unusable parameter.
    pub fn validate(&self) -> Result<()> {
        if !(self.tube_radius > 0.0 && self.tube_radius.is_finite()) {
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
        if self.threshold_distance.is_nan() || self.connectivity_threshold.is_nan() {
            return Err(Error::ConfigError("detach thresholds must not be NaN".into()));
        }
        Ok(())
    }
}

/// Splits isolated nodes off top-level tracks.
#[derive(Clone, Debug)]
pub struct DetachIsolatedNodes {
    config: DetachConfig,
}

impl DetachIsolatedNodes {
    /// Creates the detachment step.
    ///
    /// # Errors
    /// Returns a configuration error for an invalid configuration.
    pub fn new(config: DetachConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &DetachConfig {
        &self.config
    }

    /// Splits `hits` into the isolated nodes and the remaining connected
    /// nodes, both in path order. `origin` supplies the connecting energy.
    #[must_use]
    pub fn split(&self, hits: &Hits, origin: &Hits) -> (Vec<usize>, Vec<usize>) {
        let n = hits.len();
        let mut isolated = Vec::new();
        let mut connected = Vec::new();
        if n == 0 {
            return (isolated, connected);
        }

        connected.push(0);
        for node in 1..n.saturating_sub(1) {
            let (connectivity, distance) = [node - 1, node + 1].iter().fold(
                (0.0, 0.0),
                |(energy, length), &neighbour| {
                    let (a, b) = (hits.position(node), hits.position(neighbour));
                    let reduction = self.config.tube_length_reduction;
                    let tube = origin.energy_in_cylinder(
                        a.lerp(&b, reduction),
                        a.lerp(&b, 1.0 - reduction),
                        self.config.tube_radius,
                    );
                    (energy + tube, length + hits.distance(node, neighbour))
                },
            );

            if connectivity <= self.config.connectivity_threshold
                && distance / 2.0 > self.config.threshold_distance
            {
                isolated.push(node);
            } else {
                connected.push(node);
            }
        }
        if n > 1 {
            connected.push(n - 1);
        }
        (isolated, connected)
    }

    /// Appends, for every top-level track, one single-hit track per
    /// isolated node followed by the track of the remaining nodes.
    ///
    /// # Errors
    /// Propagates track bookkeeping errors.
    pub fn detach_event(&self, input: &TrackEvent) -> Result<TrackEvent> {
        let mut output = input.clone();
        for index in input.top_level_indices() {
            let Some(track) = input.track(index) else {
                continue;
            };
            if track.hits.is_empty() {
                continue;
            }
            let origin = input.origin_track(index).map_or(&track.hits, |t| &t.hits);
            let (isolated, connected) = self.split(&track.hits, origin);

            for &node in &isolated {
                let hits = track.hits.reordered(&[node]);
                output.add_track(Track::new(output.next_track_id(), track.track_id, hits))?;
            }
            let hits = track.hits.reordered(&connected);
            output.add_track(Track::new(output.next_track_id(), track.track_id, hits))?;

            if !isolated.is_empty() {
                log::debug!(
                    "track {}: detached {} isolated nodes",
                    track.track_id,
                    isolated.len()
                );
            }
        }
        Ok(output)
    }
}
