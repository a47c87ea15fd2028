// The pattern data: 12 tracks x 16 steps of on/off flags.
//
// Patterns are values. Editing returns a new pattern and the session swaps the
// whole thing in, so a step decision never sees a half-applied edit.

use crate::error::{SeqError, SeqResult, check_step};
use crate::shared::{NUM_TRACKS, STEPS_PER_PATTERN, TrackId};

pub type Steps = [bool; STEPS_PER_PATTERN];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    pub id: String,
    pub name: String,
    steps: [Steps; NUM_TRACKS], // indexed by TrackId::index()
}

impl Default for Pattern {
    fn default() -> Self {
        Self::empty("empty", "Empty")
    }
}

impl Pattern {
    pub fn empty(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            steps: [[false; STEPS_PER_PATTERN]; NUM_TRACKS],
        }
    }

    /// Build a pattern from `(track, "1000100010001000")` rows. Tracks that are
    /// not listed stay silent.
    pub fn from_step_strings<'a, I>(id: impl Into<String>, name: impl Into<String>, rows: I) -> SeqResult<Self>
    where
        I: IntoIterator<Item = (TrackId, &'a str)>,
    {
        let mut pattern = Self::empty(id, name);
        for (track, row) in rows {
            pattern.steps[track.index()] = parse_step_string(track, row)?;
        }
        Ok(pattern)
    }

    pub fn get_step(&self, track: TrackId, step: usize) -> SeqResult<bool> {
        let step = check_step(step)?;
        Ok(self.steps[track.index()][step])
    }

    /// Same as `get_step`, for callers holding a raw track name.
    pub fn get_step_by_name(&self, track: &str, step: usize) -> SeqResult<bool> {
        self.get_step(track.parse()?, step)
    }

    pub fn with_step_toggled(&self, track: TrackId, step: usize) -> SeqResult<Pattern> {
        let current = self.get_step(track, step)?;
        self.with_step(track, step, !current)
    }

    pub fn with_step(&self, track: TrackId, step: usize, value: bool) -> SeqResult<Pattern> {
        let step = check_step(step)?;
        let mut next = self.clone();
        next.steps[track.index()][step] = value;
        Ok(next)
    }

    pub fn is_accented(&self, step: usize) -> SeqResult<bool> {
        self.get_step(TrackId::ACCENT, step)
    }

    pub fn track_steps(&self, track: TrackId) -> &Steps {
        &self.steps[track.index()]
    }

    pub fn active_steps(&self, track: TrackId) -> Vec<usize> {
        self.track_steps(track)
            .iter()
            .enumerate()
            .filter_map(|(i, on)| on.then_some(i))
            .collect()
    }

    pub fn step_string(&self, track: TrackId) -> String {
        self.track_steps(track)
            .iter()
            .map(|on| if *on { '1' } else { '0' })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.iter().all(|row| row.iter().all(|on| !on))
    }
}

fn parse_step_string(track: TrackId, row: &str) -> SeqResult<Steps> {
    let row = row.trim();
    if row.chars().count() != STEPS_PER_PATTERN {
        return Err(SeqError::InvalidPattern(format!(
            "track {track} has {} steps, expected {STEPS_PER_PATTERN}",
            row.chars().count()
        )));
    }
    let mut steps = [false; STEPS_PER_PATTERN];
    for (i, c) in row.chars().enumerate() {
        steps[i] = match c {
            '1' => true,
            '0' => false,
            other => {
                return Err(SeqError::InvalidPattern(format!(
                    "track {track} step {i}: unexpected {other:?}"
                )));
            }
        };
    }
    Ok(steps)
}
