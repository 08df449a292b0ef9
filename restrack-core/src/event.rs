//! Track event: the forest of tracks built from one hits event.
//!
//! Tracks are stored in insertion order. Each track keeps the array
//! index of its parent, so ancestry walks are O(depth) index lookups
//! and never hold references into the growable track vector.
#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::hit::HitKind;
use crate::hits::Hits;
use crate::track::Track;

/// Forest of tracks with parent/child relations.
#[derive(Debug, Clone, Default)]
pub struct TrackEvent {
    tracks: Vec<Track>,
    parents: Vec<Option<usize>>,
    index_by_id: HashMap<u32, usize>,
    levels: usize,
    next_id: u32,
    x_tracks: usize,
    y_tracks: usize,
}

impl TrackEvent {
    /// Creates an empty event.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Id that the next created track should take.
    ///
    /// Ids are assigned monotonically and never reused, even after a
    /// track is removed.
    pub fn next_track_id(&self) -> u32 {
        self.next_id.max(1)
    }

    /// Adds a track and returns its index.
    ///
    /// A derived track must reference a parent already in the event.
    /// Id `u32::MAX` is rejected since ids are never reused.
    pub fn add_track(&mut self, track: Track) -> Result<usize> {
        if track.track_id == 0 || self.index_by_id.contains_key(&track.track_id) {
            return Err(Error::DuplicatedTrack(track.track_id));
        }
        let next_id = track
            .track_id
            .checked_add(1)
            .ok_or(Error::TrackIdOverflow(track.track_id))?;

        let parent = if track.parent_id == 0 {
            None
        } else {
            let index = self
                .index_by_id
                .get(&track.parent_id)
                .copied()
                .ok_or(Error::UnknownParent {
                    track: track.track_id,
                    parent: track.parent_id,
                })?;
            Some(index)
        };

        let index = self.tracks.len();
        self.next_id = self.next_track_id().max(next_id);
        self.index_by_id.insert(track.track_id, index);
        self.tracks.push(track);
        self.parents.push(parent);
        self.levels = self.levels.max(self.level(index));

        Ok(index)
    }

    /// Creates a track with the next free id and adds it.
    /// Returns the id of the new track.
    pub fn push_track(&mut self, parent_id: u32, hits: Hits) -> Result<u32> {
        let id = self.next_track_id();
        self.add_track(Track::new(id, parent_id, hits))?;
        Ok(id)
    }

    /// Removes the track at `index`.
    ///
    /// Tracks that other tracks were derived from cannot be removed.
    pub fn remove_track(&mut self, index: usize) -> Result<Track> {
        let len = self.tracks.len();
        if index >= len {
            return Err(Error::TrackIndexOutOfRange { index, len });
        }
        if self.parents.contains(&Some(index)) {
            return Err(Error::TrackHasChildren(self.tracks[index].track_id));
        }

        let track = self.tracks.remove(index);
        self.parents.remove(index);
        for parent in self.parents.iter_mut().flatten() {
            if *parent > index {
                *parent -= 1;
            }
        }
        self.index_by_id = self
            .tracks
            .iter()
            .enumerate()
            .map(|(n, t)| (t.track_id, n))
            .collect();
        self.update_levels();

        Ok(track)
    }

    /// Number of tracks in the event, at every level.
    pub fn number_of_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Returns true if the event has no tracks.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Number of top-level tracks of the given projection kind.
    pub fn number_of_tracks_of(&self, kind: HitKind) -> usize {
        self.top_level_indices()
            .filter(|&n| self.tracks[n].kind() == Some(kind))
            .count()
    }

    /// All tracks in insertion order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Track at `index`.
    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Mutable hits of the track at `index`. Ids and parents stay fixed.
    pub fn track_hits_mut(&mut self, index: usize) -> Option<&mut Hits> {
        self.tracks.get_mut(index).map(|t| &mut t.hits)
    }

    /// Index of the track with the given id.
    pub fn index_of(&self, id: u32) -> Option<usize> {
        self.index_by_id.get(&id).copied()
    }

    /// Track with the given id.
    pub fn track_by_id(&self, id: u32) -> Option<&Track> {
        self.index_of(id).map(|n| &self.tracks[n])
    }

    /// Index of the root of the ancestry chain of track `index`.
    pub fn origin_index(&self, index: usize) -> Option<usize> {
        let mut current = index;
        if current >= self.tracks.len() {
            return None;
        }
        while let Some(parent) = self.parents[current] {
            current = parent;
        }
        Some(current)
    }

    /// Root of the ancestry chain of track `index`.
    pub fn origin_track(&self, index: usize) -> Option<&Track> {
        self.origin_index(index).map(|n| &self.tracks[n])
    }

    /// Root of the ancestry chain of the track with the given id.
    ///
    /// This is the clustering output holding the full-energy hits that
    /// node reduction steps may have merged away.
    pub fn origin_track_by_id(&self, id: u32) -> Result<&Track> {
        let index = self.index_of(id).ok_or(Error::UnknownTrack(id))?;
        self.origin_track(index).ok_or(Error::UnknownTrack(id))
    }

    /// Depth of track `index` in its ancestry chain, 1 for original
    /// tracks. Returns 0 for an index outside the event.
    pub fn level(&self, index: usize) -> usize {
        if index >= self.tracks.len() {
            return 0;
        }
        let mut level = 1;
        let mut current = index;
        while let Some(parent) = self.parents[current] {
            level += 1;
            current = parent;
        }
        level
    }

    /// Maximum level across all tracks.
    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Returns true if track `index` sits at the deepest level of the
    /// event.
    ///
    /// Refinement steps append derived tracks one level below their
    /// input, so the deepest level holds the latest refinement. This is
    /// the set of tracks every further step operates on.
    pub fn is_top_level(&self, index: usize) -> bool {
        index < self.tracks.len() && self.level(index) == self.levels
    }

    /// Indices of the top-level tracks.
    pub fn top_level_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.tracks.len()).filter(move |&n| self.is_top_level(n))
    }

    /// Recomputes the maximum level.
    pub fn update_levels(&mut self) {
        self.levels = (0..self.tracks.len())
            .map(|n| self.level(n))
            .max()
            .unwrap_or(0);
    }

    /// Number of XZ tracks found by clustering.
    pub fn number_of_x_tracks(&self) -> usize {
        self.x_tracks
    }

    /// Number of YZ tracks found by clustering.
    pub fn number_of_y_tracks(&self) -> usize {
        self.y_tracks
    }

    /// Records how many XZ tracks clustering produced.
    pub fn set_number_of_x_tracks(&mut self, n: usize) {
        self.x_tracks = n;
    }

    /// Records how many YZ tracks clustering produced.
    pub fn set_number_of_y_tracks(&mut self, n: usize) {
        self.y_tracks = n;
    }

    /// Total energy of the top-level tracks, optionally restricted to a
    /// projection kind.
    pub fn energy(&self, kind: Option<HitKind>) -> f64 {
        self.top_level_indices()
            .map(|n| &self.tracks[n])
            .filter(|t| kind.is_none() || t.kind() == kind)
            .map(Track::energy)
            .sum()
    }

    /// Top-level track of the given kind with the highest energy.
    pub fn max_energy_track(&self, kind: HitKind) -> Option<&Track> {
        self.max_energy_track_excluding(kind, None)
    }

    /// Top-level track of the given kind with the second highest energy.
    pub fn second_max_energy_track(&self, kind: HitKind) -> Option<&Track> {
        let first = self.max_energy_track(kind)?.track_id;
        self.max_energy_track_excluding(kind, Some(first))
    }

    fn max_energy_track_excluding(&self, kind: HitKind, skip: Option<u32>) -> Option<&Track> {
        let mut best: Option<&Track> = None;
        for track in self.top_level_indices().map(|n| &self.tracks[n]) {
            if track.kind() != Some(kind) || Some(track.track_id) == skip {
                continue;
            }
            let energy = track.energy();
            if energy > 0.0 && best.is_none_or(|b| energy > b.energy()) {
                best = Some(track);
            }
        }
        best
    }

    /// Number of hits summed over all tracks.
    pub fn total_hits(&self) -> usize {
        self.tracks.iter().map(Track::number_of_hits).sum()
    }

    /// Returns true if every track is 3D.
    pub fn is_xyz(&self) -> bool {
        self.tracks.iter().all(Track::is_xyz)
    }

    /// Returns false if any refinement step had to fall back.
    pub fn is_ok(&self) -> bool {
        self.tracks.iter().all(|t| t.ok)
    }

    /// Flags the track at `index`.
    pub fn set_ok(&mut self, index: usize, ok: bool) {
        if let Some(track) = self.tracks.get_mut(index) {
            track.ok = ok;
        }
    }
}
