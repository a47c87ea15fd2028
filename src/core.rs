// Step decisions: which tracks sound at a step, and how loud.
//
// Pure. Safe to call from inside the scheduler's wake-up.

use crate::error::SeqResult;
use crate::pipeline::{MixerStates, Pattern};
use crate::shared::{ACCENT_MULTIPLIER, TrackId, Trigger};

/// Solo beats mute: once any track is soloed, only soloed tracks are audible,
/// muted or not. Mute is only consulted when nothing is soloed.
pub fn is_audible(mixer: &MixerStates, track: TrackId, any_solo: bool) -> bool {
    let state = mixer.get(track);
    if any_solo { state.is_solo } else { !state.is_muted }
}

/// Triggers for `step`, in canonical track order. The accent lane never sounds
/// itself; when its flag is set every triggered track plays at 1.5x its gain.
pub fn decide_triggers(pattern: &Pattern, mixer: &MixerStates, step: usize) -> SeqResult<Vec<Trigger>> {
    let any_solo = mixer.any_solo();
    let accented = pattern.is_accented(step)?;

    let mut triggers = Vec::new();
    for track in TrackId::ALL.into_iter().filter(|t| !t.is_accent()) {
        if !is_audible(mixer, track, any_solo) || !pattern.get_step(track, step)? {
            continue;
        }
        let base = mixer.get(track).gain;
        let gain = if accented { base * ACCENT_MULTIPLIER } else { base };
        triggers.push(Trigger { track, gain });
    }
    Ok(triggers)
}
