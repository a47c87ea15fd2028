// Everything about a session worth keeping between runs: tempo, kit and
// pattern selection, mixer settings and scheduler timing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::MixerStates;
use crate::scheduler::SchedulerConfig;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectState {
    pub bpm: f64,
    pub kit: Option<String>, // folder name under kits/
    pub selected_pattern: usize,
    pub mixer: MixerStates,

    // How often the scheduler wakes up, and how far ahead of the audio clock
    // it commits step times. The wake interval must stay well under the
    // look-ahead window.
    pub wake_interval_ms: u64,
    pub lookahead_ms: u64,
}

impl Default for ProjectState {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            kit: None,
            selected_pattern: 0,
            mixer: MixerStates::default(),
            wake_interval_ms: 25,
            lookahead_ms: 100,
        }
    }
}

impl ProjectState {
    pub fn scheduler_config(&self) -> SchedulerConfig {
        let defaults = SchedulerConfig::default();
        let wake_interval = match self.wake_interval_ms {
            0 => defaults.wake_interval,
            ms => Duration::from_millis(ms),
        };
        let mut lookahead = match self.lookahead_ms {
            0 => defaults.lookahead,
            ms => ms as f64 / 1000.0,
        };
        if lookahead <= wake_interval.as_secs_f64() {
            log::warn!(
                target: "session",
                "lookahead {lookahead}s is not longer than the wake interval, using {}s",
                wake_interval.as_secs_f64() * 4.0
            );
            lookahead = wake_interval.as_secs_f64() * 4.0;
        }
        SchedulerConfig { wake_interval, lookahead }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_scheduler_defaults() {
        assert_eq!(ProjectState::default().scheduler_config(), SchedulerConfig::default());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let state: ProjectState = serde_json::from_str(r#"{ "bpm": 98.5, "kit": "rock" }"#).unwrap();
        assert_eq!(state.bpm, 98.5);
        assert_eq!(state.kit.as_deref(), Some("rock"));
        assert_eq!(state.lookahead_ms, 100);
        assert_eq!(state.mixer, MixerStates::default());
    }

    #[test]
    fn lookahead_shorter_than_wake_is_widened() {
        let state = ProjectState {
            wake_interval_ms: 50,
            lookahead_ms: 20,
            ..ProjectState::default()
        };
        let config = state.scheduler_config();
        assert_eq!(config.wake_interval, Duration::from_millis(50));
        assert!((config.lookahead - 0.2).abs() < 1e-9);
    }
}
