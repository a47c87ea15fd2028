//! A playback session: one pattern, one mixer, one scheduler, one sound device.
//!
//! Sessions are plain values with an owner. Several can run side by side, and
//! dropping one stops its scheduler.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::audio_api::SoundDevice;
use crate::core::decide_triggers;
use crate::error::SeqResult;
use crate::pipeline::{MixerStates, Pattern, SongState};
use crate::scheduler::{AudioClock, LookaheadScheduler, RepeatingTimer, SchedulerConfig};
use crate::shared::{StepEvent, TrackId};

const OBSERVER_QUEUE: usize = 64;

type Observers = Arc<Mutex<Vec<Sender<StepEvent>>>>;

pub struct PlaybackSession {
    song: Arc<RwLock<SongState>>,
    scheduler: LookaheadScheduler,
    device: Arc<dyn SoundDevice>,
    observers: Observers,
}

impl PlaybackSession {
    pub fn new(
        device: Arc<dyn SoundDevice>,
        clock: Arc<dyn AudioClock>,
        timer: Box<dyn RepeatingTimer>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            song: SongState::new_shared(Pattern::default(), MixerStates::default()),
            scheduler: LookaheadScheduler::new(clock, timer, config),
            device,
            observers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SongState> {
        self.song.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SongState> {
        self.song.write().unwrap_or_else(PoisonError::into_inner)
    }

    // transport

    /// Start from step 0 at the current tempo. Restarts if already running.
    pub fn start(&mut self) -> SeqResult<()> {
        let song = Arc::clone(&self.song);
        let device = Arc::clone(&self.device);
        let observers = Arc::clone(&self.observers);

        self.scheduler.start(self.scheduler.bpm(), move |event| {
            // mixer and pattern as they are right now, not as they were when
            // the step first became due
            let decided = {
                let song = song.read().unwrap_or_else(PoisonError::into_inner);
                decide_triggers(&song.pattern, &song.mixer, event.step)
            };
            match decided {
                Ok(triggers) => {
                    for t in triggers {
                        device.play_sound(t.track, event.time, t.gain);
                    }
                }
                Err(e) => log::error!(target: "session", "step {}: {e}", event.step),
            }
            notify(&observers, event);
        })
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    pub fn toggle_play(&mut self) -> SeqResult<bool> {
        if self.is_running() {
            self.stop();
        } else {
            self.start()?;
        }
        Ok(self.is_running())
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn set_bpm(&self, bpm: f64) -> SeqResult<()> {
        self.scheduler.set_bpm(bpm)
    }

    pub fn bpm(&self) -> f64 {
        self.scheduler.bpm()
    }

    /// Step the scheduler will hand out next.
    pub fn next_step(&self) -> usize {
        self.scheduler.current_step()
    }

    /// Receive `(step, time)` for every step from now on. Slow receivers miss
    /// events rather than hold up the scheduler.
    pub fn subscribe(&self) -> Receiver<StepEvent> {
        let (tx, rx) = crossbeam_channel::bounded(OBSERVER_QUEUE);
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    // pattern

    pub fn pattern(&self) -> Pattern {
        self.read().pattern.clone()
    }

    pub fn set_pattern(&self, pattern: Pattern) {
        log::debug!(target: "session", "pattern {:?}", pattern.name);
        self.write().pattern = pattern;
    }

    /// Flip one step. Returns the new value of the flag.
    pub fn toggle_step(&self, track: TrackId, step: usize) -> SeqResult<bool> {
        let mut song = self.write();
        let edited = song.pattern.with_step_toggled(track, step)?;
        let value = edited.get_step(track, step)?;
        song.pattern = edited;
        Ok(value)
    }

    // mixer

    pub fn mixer(&self) -> MixerStates {
        self.read().mixer.clone()
    }

    pub fn set_mixer(&self, mixer: MixerStates) {
        self.write().mixer = mixer;
    }

    pub fn toggle_mute(&self, track: TrackId) -> bool {
        self.write().mixer.toggle_mute(track)
    }

    pub fn toggle_solo(&self, track: TrackId) -> bool {
        self.write().mixer.toggle_solo(track)
    }

    pub fn set_gain(&self, track: TrackId, gain: f32) {
        self.write().mixer.set_gain(track, gain);
    }

    /// Nudge a track's gain, keeping it within 0..=1. Returns the new gain.
    pub fn adjust_gain(&self, track: TrackId, delta: f32) -> f32 {
        let mut song = self.write();
        let state = song.mixer.get_mut(track);
        state.gain = (state.gain + delta).clamp(0.0, 1.0);
        state.gain
    }
}

fn notify(observers: &Observers, event: StepEvent) {
    let mut observers = observers.lock().unwrap_or_else(PoisonError::into_inner);
    observers.retain(|tx| !matches!(tx.try_send(event), Err(TrySendError::Disconnected(_))));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{ManualClock, ManualTimer};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingDevice {
        played: Mutex<Vec<(TrackId, f64, f32)>>,
    }

    impl RecordingDevice {
        fn played(&self) -> Vec<(TrackId, f64, f32)> {
            self.played.lock().unwrap().clone()
        }
    }

    impl SoundDevice for RecordingDevice {
        fn play_sound(&self, track: TrackId, time: f64, gain: f32) {
            self.played.lock().unwrap().push((track, time, gain));
        }
    }

    struct Rig {
        device: Arc<RecordingDevice>,
        clock: Arc<ManualClock>,
        timer: ManualTimer,
        session: PlaybackSession,
    }

    fn rig() -> Rig {
        let device = Arc::new(RecordingDevice::default());
        let clock = Arc::new(ManualClock::new(0.0));
        let timer = ManualTimer::new();
        let session = PlaybackSession::new(device.clone(), clock.clone(), Box::new(timer.clone()), SchedulerConfig::default());
        session.set_pattern(
            Pattern::from_step_strings(
                "t",
                "Test",
                [
                    (TrackId::Bd, "1000100010001000"),
                    (TrackId::Sd, "0000100000001000"),
                ],
            )
            .unwrap(),
        );
        Rig { device, clock, timer, session }
    }

    impl Rig {
        fn run_for(&self, seconds: f64) {
            let hop = Duration::from_millis(25).as_secs_f64();
            for _ in 0..(seconds / hop).round() as usize {
                self.clock.advance(hop);
                self.timer.fire();
            }
        }
    }

    #[test]
    fn plays_pattern_at_step_times() {
        let mut r = rig();
        r.session.start().unwrap();
        r.run_for(1.0); // steps 0..=8 due before 1.1s at 120 bpm

        let played = r.device.played();
        let kicks: Vec<f64> = played.iter().filter(|p| p.0 == TrackId::Bd).map(|p| p.1).collect();
        assert_eq!(kicks, vec![0.0, 0.5, 1.0]);
        let snares: Vec<f64> = played.iter().filter(|p| p.0 == TrackId::Sd).map(|p| p.1).collect();
        assert_eq!(snares, vec![0.5]);
        assert!(played.iter().all(|p| p.2 == 1.0));
    }

    #[test]
    fn downbeat_plays_at_start_time() {
        let mut r = rig();
        r.clock.set(3.0);
        r.session.start().unwrap();
        // no wake-up yet
        assert_eq!(r.device.played(), vec![(TrackId::Bd, 3.0, 1.0)]);
        assert_eq!(r.session.next_step(), 1);
    }

    #[test]
    fn mixer_changes_apply_to_later_steps() {
        let mut r = rig();
        r.session.start().unwrap(); // step 0 plays at start
        r.session.toggle_solo(TrackId::Sd);
        r.run_for(0.5); // step 4 at 0.5s
        let played = r.device.played();
        assert_eq!(played, vec![(TrackId::Bd, 0.0, 1.0), (TrackId::Sd, 0.5, 1.0)]);
    }

    #[test]
    fn accent_boosts_through_session() {
        let mut r = rig();
        r.session.toggle_step(TrackId::Ac, 0).unwrap();
        r.session.set_gain(TrackId::Bd, 0.5);
        r.session.start().unwrap();
        assert_eq!(r.device.played(), vec![(TrackId::Bd, 0.0, 0.75)]);
    }

    #[test]
    fn adjust_gain_clamps_to_unit_range() {
        let r = rig();
        assert_eq!(r.session.adjust_gain(TrackId::Sd, 0.5), 1.0);
        assert_eq!(r.session.adjust_gain(TrackId::Sd, -0.25), 0.75);
        assert_eq!(r.session.adjust_gain(TrackId::Sd, -2.0), 0.0);
        // set_gain passes anything through
        r.session.set_gain(TrackId::Sd, 1.2);
        assert_eq!(r.session.mixer().get(TrackId::Sd).gain, 1.2);
    }

    #[test]
    fn toggle_step_swaps_pattern() {
        let r = rig();
        let before = r.session.pattern();
        assert!(r.session.toggle_step(TrackId::Ch, 2).unwrap());
        assert!(!before.get_step(TrackId::Ch, 2).unwrap());
        assert!(r.session.pattern().get_step(TrackId::Ch, 2).unwrap());
        assert!(r.session.toggle_step(TrackId::Ch, 16).is_err());
    }

    #[test]
    fn subscribers_see_every_step() {
        let mut r = rig();
        let rx = r.session.subscribe();
        r.session.start().unwrap();
        r.run_for(0.25);
        let steps: Vec<StepEvent> = rx.try_iter().collect();
        assert_eq!(steps.iter().map(|e| e.step).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(steps[1].time, 0.125);
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let mut r = rig();
        drop(r.session.subscribe());
        r.session.start().unwrap();
        assert!(r.session.observers.lock().unwrap().is_empty());
        assert_eq!(r.device.played().len(), 1);
    }

    #[test]
    fn stop_and_toggle_play() {
        let mut r = rig();
        assert!(r.session.toggle_play().unwrap());
        r.run_for(0.2);
        assert!(!r.session.toggle_play().unwrap());
        let count = r.device.played().len();
        r.run_for(1.0);
        assert_eq!(r.device.played().len(), count);
        r.session.stop();
        assert!(!r.session.is_running());
    }

    #[test]
    fn rejects_bad_tempo_and_keeps_old() {
        let r = rig();
        assert!(r.session.set_bpm(-1.0).is_err());
        assert_eq!(r.session.bpm(), 120.0);
        r.session.set_bpm(90.0).unwrap();
        assert_eq!(r.session.bpm(), 90.0);
    }

    #[test]
    fn two_sessions_run_independently() {
        let mut a = rig();
        let mut b = rig();
        b.session.set_bpm(60.0).unwrap();
        a.session.start().unwrap();
        b.session.start().unwrap();
        a.run_for(1.0);
        b.run_for(1.0);
        a.session.stop();
        assert!(b.session.is_running());
        let a_kicks = a.device.played().iter().filter(|p| p.0 == TrackId::Bd).count();
        let b_kicks = b.device.played().iter().filter(|p| p.0 == TrackId::Bd).count();
        assert_eq!(a_kicks, 3);
        assert_eq!(b_kicks, 2); // 60 bpm: steps 0 and 4 at 0.0 and 1.0
    }
}
