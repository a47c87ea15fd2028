use thiserror::Error;

use crate::shared::STEPS_PER_PATTERN;

/// Fastest tempo the scheduler accepts. A 16th note is still 15 ms here.
pub const MAX_BPM: f64 = 1000.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SeqError {
    #[error("step index {0} out of range (expected 0..{STEPS_PER_PATTERN})")]
    StepOutOfRange(usize),
    #[error("unknown track id {0:?}")]
    UnknownTrack(String),
    #[error("invalid tempo: {0} bpm (must be above 0 and at most {MAX_BPM})")]
    InvalidTempo(f64),
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
}

impl SeqError {
    /// Bad step index or unknown track; always a caller bug.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, SeqError::StepOutOfRange(_) | SeqError::UnknownTrack(_))
    }
}

pub type SeqResult<T> = Result<T, SeqError>;

pub(crate) fn check_step(step: usize) -> SeqResult<usize> {
    if step < STEPS_PER_PATTERN {
        Ok(step)
    } else {
        Err(SeqError::StepOutOfRange(step))
    }
}

pub(crate) fn check_bpm(bpm: f64) -> SeqResult<f64> {
    if bpm.is_finite() && bpm > 0.0 && bpm <= MAX_BPM {
        Ok(bpm)
    } else {
        Err(SeqError::InvalidTempo(bpm))
    }
}
