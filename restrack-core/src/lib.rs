//! restrack-core: Core types for TPC hit clustering and tracking.
//!
//! This crate provides hits, tracks, the track event forest and the
//! clustering trait shared by the algorithms crate.
//!

pub mod clustering;
pub mod error;
pub mod event;
pub mod hit;
pub mod hits;
pub mod track;

pub use clustering::{emit_tracks, ClusteringStatistics, HitsToTrack};
pub use error::{Error, MinimizationError, Result};
pub use event::TrackEvent;
pub use hit::{Hit, HitKind, Position};
pub use hits::{Hits, ProjectedHits};
pub use track::Track;
