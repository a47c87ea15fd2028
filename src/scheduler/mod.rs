//! Look-ahead step scheduler.
//!
//! A coarse periodic wake-up (default every 25 ms) drives a virtual step clock
//! measured on the audio clock. Each wake-up flushes every step whose due time
//! falls inside the look-ahead window (default 100 ms), handing `on_step` the
//! exact future instant of the step. Late wake-ups therefore delay the
//! callback, never the audible start time.

mod clock;
mod timer;

pub use clock::{AudioClock, ManualClock, SystemClock};
pub use timer::{ManualTimer, RepeatingTimer, ThreadTimer, TickFn};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{SeqResult, check_bpm};
use crate::shared::{STEPS_PER_PATTERN, StepEvent};

pub const DEFAULT_WAKE_INTERVAL: Duration = Duration::from_millis(25);
pub const DEFAULT_LOOKAHEAD_SECS: f64 = 0.1;

pub type StepCallback = Box<dyn FnMut(StepEvent) + Send + 'static>;

/// Length of one 16th note in seconds.
pub fn step_duration(bpm: f64) -> f64 {
    (60.0 / bpm) / 4.0
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchedulerConfig {
    pub wake_interval: Duration,
    pub lookahead: f64, // seconds
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            wake_interval: DEFAULT_WAKE_INTERVAL,
            lookahead: DEFAULT_LOOKAHEAD_SECS,
        }
    }
}

/// Lock-free bpm cell, read fresh at every step advance.
#[derive(Debug)]
struct Tempo(AtomicU64);

impl Tempo {
    fn new(bpm: f64) -> Self {
        Self(AtomicU64::new(bpm.to_bits()))
    }

    fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    fn set(&self, bpm: f64) {
        self.0.store(bpm.to_bits(), Ordering::Release);
    }
}

struct StepClock {
    current_step: usize,
    next_step_due: f64,
    running: bool,
    generation: u64, // bumped on every start so stale wake-ups can tell
    on_step: Option<StepCallback>,
}

impl StepClock {
    /// Flush every step due before `horizon`. Returns how many fired.
    fn catch_up(&mut self, horizon: f64, tempo: &Tempo) -> usize {
        let Some(on_step) = self.on_step.as_mut() else {
            return 0;
        };
        let mut fired = 0;
        while self.next_step_due < horizon {
            on_step(StepEvent {
                step: self.current_step,
                time: self.next_step_due,
            });
            self.next_step_due += step_duration(tempo.get());
            self.current_step = (self.current_step + 1) % STEPS_PER_PATTERN;
            fired += 1;
        }
        fired
    }
}

pub struct LookaheadScheduler {
    clock: Arc<dyn AudioClock>,
    timer: Box<dyn RepeatingTimer>,
    config: SchedulerConfig,
    tempo: Arc<Tempo>,
    state: Arc<Mutex<StepClock>>,
}

impl LookaheadScheduler {
    pub fn new(clock: Arc<dyn AudioClock>, timer: Box<dyn RepeatingTimer>, config: SchedulerConfig) -> Self {
        Self {
            clock,
            timer,
            config,
            tempo: Arc::new(Tempo::new(120.0)),
            state: Arc::new(Mutex::new(StepClock {
                current_step: 0,
                next_step_due: 0.0,
                running: false,
                generation: 0,
                on_step: None,
            })),
        }
    }

    /// Scheduler on a background `ThreadTimer`.
    pub fn with_thread_timer(clock: Arc<dyn AudioClock>, config: SchedulerConfig) -> Self {
        Self::new(clock, Box::new(ThreadTimer::new()), config)
    }

    fn lock(&self) -> MutexGuard<'_, StepClock> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start (or restart) from step 0 at the clock's current time. Steps
    /// already inside the look-ahead window, step 0 at least, are handed to
    /// `on_step` before this returns. The callback runs with the scheduler
    /// locked and must not call `start`/`stop` on this scheduler; `set_bpm`
    /// is fine.
    pub fn start<F>(&mut self, bpm: f64, on_step: F) -> SeqResult<()>
    where
        F: FnMut(StepEvent) + Send + 'static,
    {
        let bpm = check_bpm(bpm)?;
        self.tempo.set(bpm);

        let generation = {
            let mut state = self.lock();
            let now = self.clock.now();
            state.current_step = 0;
            state.next_step_due = now;
            state.running = true;
            state.generation += 1;
            state.on_step = Some(Box::new(on_step));
            state.catch_up(now + self.config.lookahead, &self.tempo);
            state.generation
        };

        let state = Arc::clone(&self.state);
        let clock = Arc::clone(&self.clock);
        let tempo = Arc::clone(&self.tempo);
        let lookahead = self.config.lookahead;
        self.timer.arm(self.config.wake_interval, Box::new(move || {
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            if !state.running || state.generation != generation {
                return;
            }
            let fired = state.catch_up(clock.now() + lookahead, &tempo);
            if fired > 2 {
                log::debug!(target: "scheduler", "wake-up ran late, flushed {fired} steps");
            }
        }));

        log::info!(target: "scheduler", "started at {bpm} bpm");
        Ok(())
    }

    /// Stop wake-ups. Step position and due time are kept until the next start.
    pub fn stop(&mut self) {
        let was_running = {
            let mut state = self.lock();
            std::mem::replace(&mut state.running, false)
        };
        self.timer.cancel();
        if was_running {
            log::info!(target: "scheduler", "stopped");
        }
    }

    /// Affects the next step interval computed, never steps already committed.
    pub fn set_bpm(&self, bpm: f64) -> SeqResult<()> {
        let bpm = check_bpm(bpm)?;
        self.tempo.set(bpm);
        log::debug!(target: "scheduler", "tempo set to {bpm} bpm");
        Ok(())
    }

    pub fn bpm(&self) -> f64 {
        self.tempo.get()
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub fn current_step(&self) -> usize {
        self.lock().current_step
    }

    pub fn next_step_due(&self) -> f64 {
        self.lock().next_step_due
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }
}

impl Drop for LookaheadScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MAX_BPM, SeqError};

    struct Rig {
        clock: Arc<ManualClock>,
        timer: ManualTimer,
        scheduler: LookaheadScheduler,
        events: Arc<Mutex<Vec<StepEvent>>>,
    }

    fn rig() -> Rig {
        let clock = Arc::new(ManualClock::new(10.0));
        let timer = ManualTimer::new();
        let scheduler = LookaheadScheduler::new(clock.clone(), Box::new(timer.clone()), SchedulerConfig::default());
        Rig {
            clock,
            timer,
            scheduler,
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    impl Rig {
        fn start(&mut self, bpm: f64) {
            let events = self.events.clone();
            self.scheduler
                .start(bpm, move |e| events.lock().unwrap().push(e))
                .unwrap();
        }

        fn events(&self) -> Vec<StepEvent> {
            self.events.lock().unwrap().clone()
        }

        // advance the clock in wake-interval hops, firing the timer each time
        fn run_for(&self, seconds: f64) {
            let hop = DEFAULT_WAKE_INTERVAL.as_secs_f64();
            let hops = (seconds / hop).round() as usize;
            for _ in 0..hops {
                self.clock.advance(hop);
                self.timer.fire();
            }
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn step_interval_is_a_sixteenth() {
        assert!(close(step_duration(120.0), 0.125));
        assert!(close(step_duration(60.0), 0.25));
    }

    #[test]
    fn start_arms_and_fires_the_downbeat() {
        let mut r = rig();
        r.start(120.0);
        assert!(r.scheduler.is_running());
        assert!(r.timer.is_armed());
        assert_eq!(r.timer.interval(), Some(DEFAULT_WAKE_INTERVAL));
        // step 0 is due right now and goes out before the first wake-up
        let ev = r.events();
        assert_eq!(ev.len(), 1);
        assert_eq!(ev[0].step, 0);
        assert!(close(ev[0].time, 10.0));
        assert_eq!(r.scheduler.current_step(), 1);
        assert!(close(r.scheduler.next_step_due(), 10.125));
    }

    #[test]
    fn downbeat_is_never_in_the_past() {
        let mut r = rig();
        let clock = r.clock.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        r.scheduler
            .start(120.0, move |e| s.lock().unwrap().push((e, clock.now())))
            .unwrap();
        r.run_for(0.5);
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0.step, 0);
        assert!(seen.iter().all(|(e, now)| e.time >= *now));
    }

    #[test]
    fn wake_inside_lookahead_adds_nothing_new() {
        let mut r = rig();
        r.start(120.0);
        r.timer.fire(); // clock still at 10.0, horizon 10.1
        assert_eq!(r.events().len(), 1);
    }

    #[test]
    fn steps_are_monotonic_and_wrap() {
        let mut r = rig();
        r.start(120.0);
        r.run_for(5.0);
        let ev = r.events();
        assert!(ev.len() > 32);
        for (i, pair) in ev.windows(2).enumerate() {
            assert!(pair[1].time > pair[0].time, "time must increase at {i}");
            assert_eq!(pair[1].step, (pair[0].step + 1) % STEPS_PER_PATTERN);
            assert!(close(pair[1].time - pair[0].time, 0.125));
        }
        assert_eq!(ev[0].step, 0);
        assert_eq!(ev[16].step, 0);
    }

    #[test]
    fn late_wake_keeps_original_times() {
        let mut r = rig();
        r.start(120.0);
        r.timer.fire();
        // host stalls for half a second
        r.clock.advance(0.5);
        r.timer.fire();
        let ev = r.events();
        // due times 10.0 .. 10.5 inclusive fit under the 10.6 horizon
        assert_eq!(ev.len(), 5);
        for (i, e) in ev.iter().enumerate() {
            assert_eq!(e.step, i);
            assert!(close(e.time, 10.0 + i as f64 * 0.125));
        }
    }

    #[test]
    fn never_schedules_past_the_horizon() {
        let mut r = rig();
        r.start(200.0);
        for _ in 0..100 {
            r.clock.advance(0.025);
            r.timer.fire();
            let horizon = r.clock.now() + DEFAULT_LOOKAHEAD_SECS;
            assert!(r.events().iter().all(|e| e.time < horizon));
            assert!(r.scheduler.next_step_due() >= horizon);
        }
    }

    #[test]
    fn tempo_change_applies_from_next_advance() {
        let mut r = rig();
        r.start(120.0);
        r.timer.fire(); // nothing new: step 0 went out at start, next due 10.125
        let committed = r.scheduler.next_step_due();
        r.scheduler.set_bpm(60.0).unwrap();
        assert!(close(r.scheduler.next_step_due(), committed));

        r.run_for(1.0);
        let ev = r.events();
        assert!(close(ev[1].time, 10.125));
        assert!(close(ev[2].time - ev[1].time, 0.25));
        assert!(close(ev[3].time - ev[2].time, 0.25));
    }

    #[test]
    fn tempo_change_inside_a_burst_applies_to_the_rest_of_it() {
        let mut r = rig();
        let tempo = Arc::clone(&r.scheduler.tempo);
        let events = r.events.clone();
        r.scheduler
            .start(120.0, move |e| {
                events.lock().unwrap().push(e);
                if e.step == 2 {
                    tempo.set(60.0);
                }
            })
            .unwrap();
        // wake-up half a second late: steps 1.. flush in one burst
        r.clock.advance(0.5);
        r.timer.fire();

        let times: Vec<f64> = r.events().iter().map(|e| e.time).collect();
        assert_eq!(times.len(), 4);
        assert!(close(times[0], 10.0));
        assert!(close(times[1], 10.125));
        assert!(close(times[2], 10.25));
        // the interval after step 2 already uses 60 bpm
        assert!(close(times[3], 10.5));
        assert!(close(r.scheduler.next_step_due(), 10.75));
    }

    #[test]
    fn stop_is_idempotent_and_silences() {
        let mut r = rig();
        r.start(120.0);
        r.run_for(0.5);
        let count = r.events().len();
        let step = r.scheduler.current_step();
        let due = r.scheduler.next_step_due();

        r.scheduler.stop();
        r.scheduler.stop();
        assert!(!r.scheduler.is_running());
        assert!(!r.timer.is_armed());
        r.run_for(0.5);
        assert_eq!(r.events().len(), count);
        // position survives stop
        assert_eq!(r.scheduler.current_step(), step);
        assert!(close(r.scheduler.next_step_due(), due));
    }

    #[test]
    fn stop_before_start_is_harmless() {
        let mut r = rig();
        r.scheduler.stop();
        assert!(!r.scheduler.is_running());
    }

    #[test]
    fn restart_reinitialises_without_double_arming() {
        let mut r = rig();
        r.start(120.0);
        r.run_for(0.3);
        let before = r.events().len();
        r.start(120.0);
        r.timer.fire();
        let ev = r.events();
        // the restart and a following wake-up only yield the new downbeat
        assert_eq!(ev.len(), before + 1);
        assert_eq!(ev[before].step, 0);
        assert!(close(ev[before].time, r.clock.now()));
        assert!(close(r.scheduler.next_step_due(), r.clock.now() + 0.125));
        assert_eq!(r.timer.arm_count(), 2);
    }

    #[test]
    fn restart_after_stop_resets_position() {
        let mut r = rig();
        r.start(120.0);
        r.run_for(0.4);
        r.scheduler.stop();
        r.clock.advance(3.0);
        r.start(90.0);
        let last = *r.events().last().unwrap();
        assert_eq!(last.step, 0);
        assert!(close(last.time, r.clock.now()));
        assert_eq!(r.scheduler.current_step(), 1);
        assert!(close(r.scheduler.next_step_due(), r.clock.now() + step_duration(90.0)));
        assert_eq!(r.scheduler.bpm(), 90.0);
    }

    #[test]
    fn rejects_non_positive_tempo() {
        let mut r = rig();
        assert!(r.scheduler.start(0.0, |_| {}).is_err());
        assert!(r.scheduler.start(-10.0, |_| {}).is_err());
        assert!(r.scheduler.start(f64::NAN, |_| {}).is_err());
        assert!(!r.scheduler.is_running());
        assert!(!r.timer.is_armed());
        assert!(r.scheduler.set_bpm(0.0).is_err());
        assert_eq!(r.scheduler.bpm(), 120.0);
    }

    #[test]
    fn rejects_tempo_too_fast_to_advance() {
        let mut r = rig();
        // at this tempo a step is shorter than the clock's resolution
        assert!(matches!(r.scheduler.start(1e17, |_| {}), Err(SeqError::InvalidTempo(_))));
        assert!(!r.scheduler.is_running());
        assert!(!r.timer.is_armed());
        assert!(r.scheduler.set_bpm(MAX_BPM + 1.0).is_err());

        r.start(MAX_BPM);
        r.run_for(0.1);
        assert!(r.events().len() > 1);
        r.scheduler.stop();
        assert!(!r.scheduler.is_running());
    }

    #[test]
    fn set_bpm_while_stopped_applies_on_start() {
        let mut r = rig();
        r.scheduler.set_bpm(150.0).unwrap();
        assert_eq!(r.scheduler.bpm(), 150.0);
        assert!(!r.scheduler.is_running());
    }

    #[test]
    fn runs_on_a_real_thread_timer() {
        let clock: Arc<dyn AudioClock> = Arc::new(SystemClock::new());
        let config = SchedulerConfig {
            wake_interval: Duration::from_millis(5),
            lookahead: 0.05,
        };
        let mut scheduler = LookaheadScheduler::with_thread_timer(clock, config);
        let (tx, rx) = crossbeam_channel::unbounded();
        scheduler
            .start(600.0, move |e| {
                let _ = tx.send(e);
            })
            .unwrap();
        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        scheduler.stop();
        assert_eq!(first.step, 0);
        assert_eq!(second.step, 1);
        assert!(second.time > first.time);

        while rx.try_recv().is_ok() {}
        std::thread::sleep(Duration::from_millis(30));
        assert!(rx.try_recv().is_err(), "no steps after stop returned");
    }
}
