//! Track node-count reduction.
//!
//! Close hits are merged with a growing merge distance until the track
//! is both coarse enough and small enough for path minimization.

use restrack_core::{Error, Hits, Result, Track, TrackEvent};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Reduction configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReductionConfig {
    /// Merge distance of the first pass (mm).
    pub starting_distance: f64,
    /// Passes continue at least until the merge distance reaches this (mm).
    pub minimum_distance: f64,
    /// Growth of the merge distance between passes.
    pub distance_factor: f64,
    /// Passes continue while the track has more hits than this.
    pub max_nodes: usize,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            starting_distance: 0.5,
            minimum_distance: 3.0,
            distance_factor: 1.5,
            max_nodes: 30,
        }
    }
}

impl ReductionConfig {
    /// Sets the node limit.
    #[must_use]
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Checks parameter ranges.
    ///
    /// # Errors
    /// Returns a configuration error for an unusable parameter.
    pub fn validate(&self) -> Result<()> {
        if !(self.starting_distance > 0.0 && self.starting_distance.is_finite()) {
            return Err(Error::ConfigError(format!(
                "starting distance must be positive, got {}",
                self.starting_distance
            )));
        }
        if !self.minimum_distance.is_finite() {
            return Err(Error::ConfigError(format!(
                "minimum distance must be finite, got {}",
                self.minimum_distance
            )));
        }
        if !(self.distance_factor > 1.0 && self.distance_factor.is_finite()) {
            return Err(Error::ConfigError(format!(
                "distance factor must be greater than 1, got {}",
                self.distance_factor
            )));
        }
        if self.max_nodes == 0 {
            return Err(Error::ConfigError("max nodes must be at least 1".into()));
        }
        Ok(())
    }
}

/// Merges nearby hits of each top-level track.
#[derive(Clone, Debug)]
pub struct TrackReduction {
    config: ReductionConfig,
}

impl TrackReduction {
    /// Creates the reduction step.
    ///
    /// # Errors
    /// Returns a configuration error for an invalid configuration.
    pub fn new(config: ReductionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ReductionConfig {
        &self.config
    }

    /// Reduces `hits` in place.
    ///
    /// Stops early once the merge distance overflows, which only happens
    /// when hits cannot be brought under `max_nodes` at any finite
    /// distance.
    pub fn reduce_hits(&self, hits: &mut Hits) {
        let mut distance = self.config.starting_distance;
        while distance < self.config.minimum_distance || hits.len() > self.config.max_nodes {
            if !distance.is_finite() {
                log::warn!(
                    "merge distance overflowed with {} hits left, stopping reduction",
                    hits.len()
                );
                break;
            }
            let before = hits.len();
            merge_closer_than(hits, distance);
            log::trace!(
                "merge distance {distance:.3}: {before} -> {} hits",
                hits.len()
            );
            distance *= self.config.distance_factor;
        }
    }

    /// Appends a reduced copy of every top-level track of `input`.
    ///
    /// # Errors
    /// Propagates track bookkeeping errors.
    pub fn reduce_event(&self, input: &TrackEvent) -> Result<TrackEvent> {
        let mut output = input.clone();
        for index in input.top_level_indices() {
            let Some(track) = input.track(index) else {
                continue;
            };
            let mut hits = track.hits.clone();
            self.reduce_hits(&mut hits);
            log::debug!(
                "track {}: reduced {} -> {} hits",
                track.track_id,
                track.number_of_hits(),
                hits.len()
            );
            output.add_track(Track::new(output.next_track_id(), track.track_id, hits))?;
        }
        Ok(output)
    }
}

/// Merges every pair closer than `distance` until no pair is left.
fn merge_closer_than(hits: &mut Hits, distance: f64) {
    let d2 = distance * distance;
    loop {
        let mut merged = false;
        let mut i = 0;
        while i < hits.len() {
            let mut j = i + 1;
            while j < hits.len() {
                if hits.distance_squared(i, j) < d2 {
                    hits.merge_hits(i, j);
                    merged = true;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
        if !merged {
            break;
        }
    }
}
