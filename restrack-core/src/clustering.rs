//! Clustering traits and helpers.

use crate::error::Result;
use crate::event::TrackEvent;
use crate::hits::Hits;

/// Statistics of a single clustering call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusteringStatistics {
    /// Number of hits consumed.
    pub hits_processed: usize,
    /// Number of tracks emitted.
    pub tracks_found: usize,
    /// Size of the largest emitted track.
    pub largest_track: usize,
}

/// Trait for hits-to-track clustering algorithms.
///
/// Implementations group a homogeneous set of hits (all XZ, all YZ or
/// all XYZ) into connected clusters and append one original track
/// (`parent_id == 0`, fresh id) per cluster to the event. Every input
/// hit ends up in exactly one track.
pub trait HitsToTrack: Send + Sync {
    /// Clusters the hits into tracks, appending them to `event`.
    ///
    /// Returns the number of tracks found. Empty input yields zero
    /// tracks.
    ///
    /// # Errors
    /// Returns an error if the hits mix projection kinds.
    fn find_tracks(&self, hits: &Hits, event: &mut TrackEvent) -> Result<usize>;

    /// Returns the name of the algorithm.
    fn name(&self) -> &'static str;
}

/// Appends one original track per cluster, in cluster order.
///
/// # Errors
/// Propagates track insertion errors.
pub fn emit_tracks<I>(clusters: I, event: &mut TrackEvent) -> Result<ClusteringStatistics>
where
    I: IntoIterator<Item = Hits>,
{
    let mut stats = ClusteringStatistics::default();
    for hits in clusters {
        stats.hits_processed += hits.len();
        stats.largest_track = stats.largest_track.max(hits.len());
        stats.tracks_found += 1;
        event.push_track(0, hits)?;
    }
    Ok(stats)
}
