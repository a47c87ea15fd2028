use serde::{Deserialize, Serialize};

use crate::shared::{NUM_TRACKS, TrackId};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackMixerState {
    pub id: TrackId,
    pub is_muted: bool,
    pub is_solo: bool,
    pub gain: f32, // nominally 0.0 to 1.0, passed through unclamped
}

impl TrackMixerState {
    pub fn new(id: TrackId) -> Self {
        Self {
            id,
            is_muted: false,
            is_solo: false,
            gain: 1.0,
        }
    }
}

/// Mixer state for every track, indexed by `TrackId`. Saved as a plain list
/// and put back in place by each entry's id, so a hand-edited file can list
/// tracks in any order. Tracks left out keep their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<TrackMixerState>", into = "Vec<TrackMixerState>")]
pub struct MixerStates {
    tracks: [TrackMixerState; NUM_TRACKS],
}

impl From<Vec<TrackMixerState>> for MixerStates {
    fn from(saved: Vec<TrackMixerState>) -> Self {
        let mut mixer = Self::default();
        for state in saved {
            *mixer.get_mut(state.id) = state;
        }
        mixer
    }
}

impl From<MixerStates> for Vec<TrackMixerState> {
    fn from(mixer: MixerStates) -> Self {
        mixer.tracks.to_vec()
    }
}

impl Default for MixerStates {
    fn default() -> Self {
        Self {
            tracks: TrackId::ALL.map(TrackMixerState::new),
        }
    }
}

impl MixerStates {
    pub fn get(&self, track: TrackId) -> &TrackMixerState {
        &self.tracks[track.index()]
    }

    pub fn get_mut(&mut self, track: TrackId) -> &mut TrackMixerState {
        &mut self.tracks[track.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackMixerState> {
        self.tracks.iter()
    }

    pub fn any_solo(&self) -> bool {
        self.tracks.iter().any(|t| t.is_solo)
    }

    pub fn toggle_mute(&mut self, track: TrackId) -> bool {
        let state = self.get_mut(track);
        state.is_muted = !state.is_muted;
        state.is_muted
    }

    pub fn toggle_solo(&mut self, track: TrackId) -> bool {
        let state = self.get_mut(track);
        state.is_solo = !state.is_solo;
        state.is_solo
    }

    pub fn set_gain(&mut self, track: TrackId, gain: f32) {
        self.get_mut(track).gain = gain;
    }
}
