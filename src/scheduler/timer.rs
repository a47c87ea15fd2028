// Periodic wake-ups for the scheduler. The scheduler only sees the trait, so
// the catch-up logic runs the same against a real thread or a test double.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender};

pub type TickFn = Box<dyn FnMut() + Send + 'static>;

pub trait RepeatingTimer: Send {
    /// Call `tick` every `interval` until cancelled. Arming an armed timer
    /// replaces the previous wake-up.
    fn arm(&mut self, interval: Duration, tick: TickFn);

    /// Stop future wake-ups. No-op when not armed.
    fn cancel(&mut self);
}

/// Background thread sleeping on a channel between wake-ups. Dropping the
/// stop sender wakes it immediately and ends the loop.
#[derive(Default)]
pub struct ThreadTimer {
    worker: Option<(Sender<()>, JoinHandle<()>)>,
}

impl ThreadTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.worker.is_some()
    }
}

impl RepeatingTimer for ThreadTimer {
    fn arm(&mut self, interval: Duration, mut tick: TickFn) {
        self.cancel();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let handle = thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => tick(), // re-armed by looping
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });
        self.worker = Some((stop_tx, handle));
    }

    fn cancel(&mut self) {
        let Some((stop_tx, handle)) = self.worker.take() else {
            return;
        };
        drop(stop_tx);
        // cancelling from inside a tick: the loop exits on its own after returning
        if handle.thread().id() != thread::current().id() {
            let _ = handle.join();
        }
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Default)]
struct ManualSlot {
    tick: Option<TickFn>,
    interval: Option<Duration>,
    generation: u64,
    arm_count: usize,
}

/// Timer that only fires when `fire()` is called. Clones share the same slot,
/// so a test can keep one handle while the scheduler owns another.
#[derive(Clone, Default)]
pub struct ManualTimer {
    slot: Arc<Mutex<ManualSlot>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one wake-up. Returns false when nothing is armed.
    pub fn fire(&self) -> bool {
        let (mut tick, generation) = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.tick.take() {
                Some(tick) => (tick, slot.generation),
                None => return false,
            }
        };
        tick();
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.generation == generation && slot.tick.is_none() {
            slot.tick = Some(tick);
        }
        true
    }

    pub fn is_armed(&self) -> bool {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).interval.is_some()
    }

    pub fn interval(&self) -> Option<Duration> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).interval
    }

    pub fn arm_count(&self) -> usize {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).arm_count
    }
}

impl RepeatingTimer for ManualTimer {
    fn arm(&mut self, interval: Duration, tick: TickFn) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.tick = Some(tick);
        slot.interval = Some(interval);
        slot.generation += 1;
        slot.arm_count += 1;
    }

    fn cancel(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.tick = None;
        slot.interval = None;
        slot.generation += 1;
    }
}
