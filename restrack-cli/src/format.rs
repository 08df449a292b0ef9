//! JSON exchange format of the command-line tool.
//!
//! Input is an array of events, each an array of hits. A projected hit
//! leaves out (or nulls) its missing coordinate:
//!
//! ```json
//! [[{"x": 1.0, "z": 3.0, "energy": 5.0}, {"y": 2.0, "z": 3.5, "energy": 1.0}]]
//! ```

use std::io::{Read, Write};

use restrack_core::{Hit, Hits, TrackEvent};
use serde::{Deserialize, Serialize};

/// One input hit.
#[derive(Debug, Clone, Deserialize)]
pub struct InputHit {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    pub z: f64,
    pub energy: f64,
    #[serde(default)]
    pub time: f64,
}

impl From<InputHit> for Hit {
    fn from(hit: InputHit) -> Self {
        Hit::new(
            hit.x.unwrap_or(f64::NAN),
            hit.y.unwrap_or(f64::NAN),
            hit.z,
            hit.energy,
        )
        .with_time(hit.time)
    }
}

/// One output hit; missing coordinates are written as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct OutputHit {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: f64,
    pub energy: f64,
    pub time: f64,
}

impl From<Hit> for OutputHit {
    fn from(hit: Hit) -> Self {
        let present = |v: f64| (!v.is_nan()).then_some(v);
        Self {
            x: present(hit.x()),
            y: present(hit.y()),
            z: hit.z(),
            energy: hit.energy,
            time: hit.time,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputTrack {
    pub track_id: u32,
    pub parent_id: u32,
    pub level: usize,
    pub top_level: bool,
    pub ok: bool,
    pub energy: f64,
    pub length: f64,
    pub hits: Vec<OutputHit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputEvent {
    pub event: usize,
    pub ok: bool,
    pub levels: usize,
    pub x_tracks: usize,
    pub y_tracks: usize,
    pub tracks: Vec<OutputTrack>,
}

impl OutputEvent {
    pub fn new(event: usize, tracks: &TrackEvent) -> Self {
        Self {
            event,
            ok: tracks.is_ok(),
            levels: tracks.levels(),
            x_tracks: tracks.number_of_x_tracks(),
            y_tracks: tracks.number_of_y_tracks(),
            tracks: tracks
                .tracks()
                .iter()
                .enumerate()
                .map(|(index, track)| OutputTrack {
                    track_id: track.track_id,
                    parent_id: track.parent_id,
                    level: tracks.level(index),
                    top_level: tracks.is_top_level(index),
                    ok: track.ok,
                    energy: track.energy(),
                    length: track.length(),
                    hits: track.hits.iter().map(OutputHit::from).collect(),
                })
                .collect(),
        }
    }
}

/// Reads all events from a JSON document.
pub fn read_events<R: Read>(reader: R) -> serde_json::Result<Vec<Hits>> {
    let events: Vec<Vec<InputHit>> = serde_json::from_reader(reader)?;
    Ok(events
        .into_iter()
        .map(|hits| hits.into_iter().map(Hit::from).collect())
        .collect())
}

/// Writes processed events as pretty JSON.
pub fn write_events<W: Write>(writer: W, events: &[TrackEvent]) -> serde_json::Result<()> {
    let output: Vec<OutputEvent> = events
        .iter()
        .enumerate()
        .map(|(index, event)| OutputEvent::new(index, event))
        .collect();
    serde_json::to_writer_pretty(writer, &output)
}
