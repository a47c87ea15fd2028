// Types shared by every layer: the sequencer core, the audio side and the TUI.
//
// Track ids follow the classic 12-lane drum machine chart, top to bottom:
//   AC  accent (modulation only, never sounds)
//   BD  bass drum     SD  snare        CH  closed hat   OH  open hat
//   CY  cymbal        HT  high tom     MT  mid tom      LT  low tom
//   RS  rimshot       CP  clap         CB  cowbell

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SeqError;

pub const STEPS_PER_PATTERN: usize = 16;
pub const NUM_TRACKS: usize = 12;
pub const ACCENT_MULTIPLIER: f32 = 1.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackId {
    Ac,
    Bd,
    Sd,
    Ch,
    Oh,
    Cy,
    Ht,
    Mt,
    Lt,
    Rs,
    Cp,
    Cb,
}

impl TrackId {
    pub const ACCENT: TrackId = TrackId::Ac;

    // canonical order, also the row order of the grid
    pub const ALL: [TrackId; NUM_TRACKS] = [
        TrackId::Ac,
        TrackId::Bd,
        TrackId::Sd,
        TrackId::Ch,
        TrackId::Oh,
        TrackId::Cy,
        TrackId::Ht,
        TrackId::Mt,
        TrackId::Lt,
        TrackId::Rs,
        TrackId::Cp,
        TrackId::Cb,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Result<Self, SeqError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or_else(|| SeqError::UnknownTrack(index.to_string()))
    }

    pub fn is_accent(self) -> bool {
        self == Self::ACCENT
    }

    pub fn short_name(self) -> &'static str {
        match self {
            TrackId::Ac => "ac",
            TrackId::Bd => "bd",
            TrackId::Sd => "sd",
            TrackId::Ch => "ch",
            TrackId::Oh => "oh",
            TrackId::Cy => "cy",
            TrackId::Ht => "ht",
            TrackId::Mt => "mt",
            TrackId::Lt => "lt",
            TrackId::Rs => "rs",
            TrackId::Cp => "cp",
            TrackId::Cb => "cb",
        }
    }

    /// File stem of the WAV a kit folder provides for this track.
    /// The accent lane has no sample.
    pub fn sample_stem(self) -> Option<&'static str> {
        match self {
            TrackId::Ac => None,
            TrackId::Bd => Some("kick"),
            TrackId::Sd => Some("snare"),
            TrackId::Ch => Some("closed_hat"),
            TrackId::Oh => Some("open_hat"),
            TrackId::Cy => Some("cymbal"),
            TrackId::Ht => Some("high_tom"),
            TrackId::Mt => Some("mid_tom"),
            TrackId::Lt => Some("low_tom"),
            TrackId::Rs => Some("rimshot"),
            TrackId::Cp => Some("clap"),
            TrackId::Cb => Some("cowbell"),
        }
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name().to_uppercase())
    }
}

impl FromStr for TrackId {
    type Err = SeqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower == "cps" { // printed charts label the clap row CPS
            return Ok(TrackId::Cp);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.short_name() == lower)
            .ok_or_else(|| SeqError::UnknownTrack(s.to_string()))
    }
}

/// A step boundary handed to `on_step` and to visual observers.
/// `time` is in seconds on the audio clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepEvent {
    pub step: usize,
    pub time: f64,
}

/// One track that should sound at a step, with the gain to play it at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trigger {
    pub track: TrackId,
    pub gain: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    MoveCursor { dx: i32, dy: i32 },
    ToggleStep,
    PlayPress,
    ToggleMute,
    ToggleSolo,
    AdjustGain(f32),
    AdjustBpm(f32),
    PrevPattern,
    NextPattern,
    NextKit,
    Quit,
}

/// One grid row as the TUI draws it.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackStrip {
    pub id: TrackId,
    pub steps: [bool; STEPS_PER_PATTERN],
    pub muted: bool,
    pub solo: bool,
    pub gain: f32,
}

// Everything the TUI draws in a frame. Built by the middle layer, the TUI
// never looks at the session directly.
#[derive(Clone, Debug)]
pub struct DisplayState {
    pub tracks: Vec<TrackStrip>, // TrackId::ALL order
    pub playing_step: Option<usize>,
    pub cursor_track: TrackId,
    pub cursor_step: usize,
    pub playing: bool,
    pub bpm: f64,
    pub pattern_name: String,
    pub pattern_pos: (usize, usize), // (selected, count), 1-based for display
    pub kit_name: Option<String>,
    pub display_text: String,
}
