//! A 12-track, 16-step drum sequencer driven by a look-ahead scheduler.
//!
//! Layers, bottom up: `shared` types, the `pipeline` data (patterns, mixer,
//! project settings), the pure step decisions in `core`, the `scheduler`,
//! a `session` tying them to a `SoundDevice`, and the cpal-backed sampler in
//! `audio`. `middle` and `tui` make up the terminal front end.

pub mod audio;
pub mod audio_api;
pub mod core;
pub mod error;
pub mod loader;
pub mod middle;
pub mod pipeline;
pub mod scheduler;
pub mod session;
pub mod shared;
pub mod tui;

pub use audio_api::SoundDevice;
pub use crate::core::decide_triggers;
pub use error::{SeqError, SeqResult};
pub use pipeline::{MixerStates, Pattern, TrackMixerState};
pub use scheduler::{AudioClock, LookaheadScheduler, RepeatingTimer, SchedulerConfig};
pub use session::PlaybackSession;
pub use shared::{StepEvent, TrackId, Trigger};
