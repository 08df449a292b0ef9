//! Error types for restrack-core.

use thiserror::Error;

/// Result type alias for restrack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for restrack operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid configuration, detected before any event is processed.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Hits of different projection kinds were passed to a single call.
    #[error("mixed projections: expected {expected} hits, found {found} hit at index {index}")]
    MixedProjections {
        expected: crate::HitKind,
        found: crate::HitKind,
        index: usize,
    },

    /// A hit has NaN in more than one coordinate, or an infinite one.
    #[error("hit {0} has no valid projection")]
    InvalidHit(usize),

    /// No track with the given id exists in the event.
    #[error("no track with id {0}")]
    UnknownTrack(u32),

    /// A derived track references a parent that is not in the event.
    #[error("track {track} references unknown parent {parent}")]
    UnknownParent { track: u32, parent: u32 },

    /// A track id is already used in the event.
    #[error("duplicated track id {0}")]
    DuplicatedTrack(u32),

    /// The track id is the last representable one, so no later track
    /// could get a fresh id.
    #[error("track id {0} exhausts the id range")]
    TrackIdOverflow(u32),

    /// A track cannot be removed while derived tracks point to it.
    #[error("track {0} still has derived tracks")]
    TrackHasChildren(u32),

    /// Track index outside of the event.
    #[error("track index {index} out of range ({len} tracks)")]
    TrackIndexOutOfRange { index: usize, len: usize },

    /// Clustering error.
    #[error("clustering error: {0}")]
    ClusteringError(String),
}

/// Errors raised by the Held-Karp tour solver.
///
/// These never escape path minimization: the minimizer flags the track
/// as not OK and keeps the input order instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MinimizationError {
    /// The dynamic programming table cannot be indexed for this many nodes.
    #[error("too many nodes for held-karp: {0}")]
    TooManyNodes(usize),

    /// The dynamic programming table could not be allocated.
    #[error("cannot allocate held-karp table of {entries} entries")]
    Allocation { entries: usize },

    /// The distance matrix does not match the number of nodes.
    #[error("distance matrix has {found} entries, expected {expected}")]
    MatrixSize { expected: usize, found: usize },

    /// The solver finished without a complete tour.
    #[error("no consistent tour found")]
    NoTour,
}
