//! Track type.

use crate::hit::HitKind;
use crate::hits::Hits;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An ordered collection of hits believed to come from one trajectory.
///
/// `parent_id == 0` marks an original track produced by clustering;
/// derived tracks (reduced, minimized, detached) point to the track they
/// were computed from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Track {
    /// Unique id inside the event, starting at 1.
    pub track_id: u32,
    /// Id of the track this one was derived from, 0 for original tracks.
    pub parent_id: u32,
    /// Volume hits of the track.
    pub hits: Hits,
    /// False when a refinement step could not complete and fell back.
    pub ok: bool,
}

impl Track {
    /// Creates a track.
    pub fn new(track_id: u32, parent_id: u32, hits: Hits) -> Self {
        Self {
            track_id,
            parent_id,
            hits,
            ok: true,
        }
    }

    /// Returns the number of hits in the track.
    pub fn number_of_hits(&self) -> usize {
        self.hits.len()
    }

    /// Total energy of the track.
    pub fn energy(&self) -> f64 {
        self.hits.total_energy()
    }

    /// Length of the path through the hits in their current order.
    pub fn length(&self) -> f64 {
        self.hits.total_length()
    }

    /// Projection kind of the track, taken from its first hit.
    pub fn kind(&self) -> Option<HitKind> {
        self.hits.iter().next().and_then(|hit| hit.kind())
    }

    pub fn is_xz(&self) -> bool {
        self.kind() == Some(HitKind::Xz)
    }

    pub fn is_yz(&self) -> bool {
        self.kind() == Some(HitKind::Yz)
    }

    pub fn is_xyz(&self) -> bool {
        self.kind() == Some(HitKind::Xyz)
    }

    /// Returns true for tracks produced directly by clustering.
    pub fn is_origin(&self) -> bool {
        self.parent_id == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Hit;
    use approx::assert_relative_eq;

    #[test]
    fn test_track_properties() {
        let hits: Hits = vec![
            Hit::xz(0.0, 0.0, 10.0),
            Hit::xz(3.0, 4.0, 15.0),
            Hit::xz(3.0, 5.0, 5.0),
        ]
        .into_iter()
        .collect();

        let track = Track::new(1, 0, hits);
        assert_eq!(track.number_of_hits(), 3);
        assert_relative_eq!(track.energy(), 30.0);
        assert_relative_eq!(track.length(), 6.0);
        assert!(track.is_xz());
        assert!(!track.is_yz());
        assert!(track.is_origin());
        assert!(track.ok);
    }

    #[test]
    fn test_empty_track_has_no_kind() {
        let track = Track::new(2, 1, Hits::new());
        assert_eq!(track.kind(), None);
        assert!(!track.is_origin());
    }
}
