use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A free-running clock in the audio domain, in seconds. Step times handed to
/// the sound device are instants on this clock.
pub trait AudioClock: Send + Sync {
    fn now(&self) -> f64;
}

/// Monotonic wall clock, for hosts without an audio device clock.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Clock that only moves when told to. Drives the scheduler in tests and
/// offline renders.
#[derive(Debug, Default)]
pub struct ManualClock {
    bits: AtomicU64, // f64 seconds
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self { bits: AtomicU64::new(start.to_bits()) }
    }

    pub fn set(&self, seconds: f64) {
        self.bits.store(seconds.to_bits(), Ordering::Release);
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.now() + seconds);
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}
