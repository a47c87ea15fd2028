pub mod mixer;
pub mod pattern;
pub mod persistence;
pub mod project;
pub mod song_state;

pub use mixer::{MixerStates, TrackMixerState};
pub use pattern::Pattern;
pub use project::ProjectState;
pub use song_state::SongState;
