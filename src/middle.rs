// Sits between the TUI and the playback session. Owns everything that is UI
// state rather than sequencer state (cursor, pattern bank, kit list, playhead)
// and turns semantic InputEvents into session calls. The TUI only ever reads
// a DisplayState back.

use std::collections::VecDeque;
use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::pipeline::{Pattern, ProjectState};
use crate::scheduler::AudioClock;
use crate::session::PlaybackSession;
use crate::shared::{DisplayState, InputEvent, STEPS_PER_PATTERN, StepEvent, TrackId, TrackStrip};

pub const MIN_UI_BPM: f64 = 30.0;
pub const MAX_UI_BPM: f64 = 300.0;

/// Things the middle layer can't do itself because they touch disk or the
/// audio device.
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    LoadKit(String),
}

pub struct Middle {
    session: PlaybackSession,
    clock: Arc<dyn AudioClock>,
    steps: Receiver<StepEvent>,
    queued: VecDeque<StepEvent>, // scheduled but not yet audible
    playhead: Option<usize>,
    cursor_track: TrackId,
    cursor_step: usize,
    patterns: Vec<Pattern>,
    selected_pattern: usize,
    kits: Vec<String>,
    selected_kit: Option<usize>,
    display_text: String,
}

impl Middle {
    /// `patterns` must not be empty; an empty bank gets one blank pattern.
    pub fn new(
        session: PlaybackSession,
        clock: Arc<dyn AudioClock>,
        mut patterns: Vec<Pattern>,
        kits: Vec<String>,
        project: &ProjectState,
    ) -> Self {
        if patterns.is_empty() {
            patterns.push(Pattern::empty("blank", "Blank"));
        }
        let selected_pattern = project.selected_pattern.min(patterns.len() - 1);
        let selected_kit = match &project.kit {
            Some(name) => kits.iter().position(|k| k == name),
            None => None,
        }
        .or(if kits.is_empty() { None } else { Some(0) });

        if let Err(e) = session.set_bpm(project.bpm.clamp(MIN_UI_BPM, MAX_UI_BPM)) {
            log::warn!(target: "session", "saved tempo rejected: {e}");
        }
        session.set_mixer(project.mixer.clone());
        session.set_pattern(patterns[selected_pattern].clone());
        let steps = session.subscribe();

        Self {
            session,
            clock,
            steps,
            queued: VecDeque::new(),
            playhead: None,
            cursor_track: TrackId::Bd,
            cursor_step: 0,
            patterns,
            selected_pattern,
            kits,
            selected_kit,
            display_text: String::new(),
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn selected_kit(&self) -> Option<&str> {
        self.selected_kit.map(|i| self.kits[i].as_str())
    }

    pub fn set_display_text(&mut self, text: impl Into<String>) {
        self.display_text = text.into();
    }

    pub fn handle_input(&mut self, event: InputEvent) -> Vec<Request> {
        match event {
            InputEvent::MoveCursor { dx, dy } => {
                self.cursor_step = wrap(self.cursor_step, dx, STEPS_PER_PATTERN);
                let row = wrap(self.cursor_track.index(), dy, TrackId::ALL.len());
                self.cursor_track = TrackId::ALL[row];
            }
            InputEvent::ToggleStep => {
                match self.session.toggle_step(self.cursor_track, self.cursor_step) {
                    // keep the bank in sync so switching away keeps the edit
                    Ok(_) => self.patterns[self.selected_pattern] = self.session.pattern(),
                    Err(e) => log::error!(target: "session", "toggle step: {e}"),
                }
            }
            InputEvent::PlayPress => match self.session.toggle_play() {
                Ok(true) => self.display_text = "PLAY".into(),
                Ok(false) => {
                    self.display_text = "STOP".into();
                    self.queued.clear();
                    self.playhead = None;
                }
                Err(e) => self.display_text = e.to_string(),
            },
            InputEvent::ToggleMute => {
                let muted = self.session.toggle_mute(self.cursor_track);
                self.display_text = format!("{} {}", self.cursor_track, if muted { "MUTE" } else { "UNMUTE" });
            }
            InputEvent::ToggleSolo => {
                let solo = self.session.toggle_solo(self.cursor_track);
                self.display_text = format!("{} {}", self.cursor_track, if solo { "SOLO" } else { "UNSOLO" });
            }
            InputEvent::AdjustGain(delta) => {
                let track = self.cursor_track;
                let gain = self.session.adjust_gain(track, delta);
                self.display_text = format!("{track} GAIN {:.0}%", gain * 100.0);
            }
            InputEvent::AdjustBpm(delta) => {
                let bpm = (self.session.bpm() + f64::from(delta)).clamp(MIN_UI_BPM, MAX_UI_BPM);
                match self.session.set_bpm(bpm) {
                    Ok(()) => self.display_text = format!("{bpm:.0} BPM"),
                    Err(e) => self.display_text = e.to_string(),
                }
            }
            InputEvent::PrevPattern => self.select_pattern(-1),
            InputEvent::NextPattern => self.select_pattern(1),
            InputEvent::NextKit => {
                if self.kits.is_empty() {
                    self.display_text = "NO KITS".into();
                    return vec![];
                }
                let next = self.selected_kit.map_or(0, |i| (i + 1) % self.kits.len());
                self.selected_kit = Some(next);
                return vec![Request::LoadKit(self.kits[next].clone())];
            }
            InputEvent::Quit => {}
        }
        vec![]
    }

    fn select_pattern(&mut self, delta: i32) {
        self.selected_pattern = wrap(self.selected_pattern, delta, self.patterns.len());
        let pattern = self.patterns[self.selected_pattern].clone();
        self.display_text = pattern.name.clone();
        self.session.set_pattern(pattern);
    }

    /// Move the playhead to the latest step whose time has come. Steps are
    /// handed out ahead of time, so they wait in a queue until the clock
    /// catches up.
    pub fn tick(&mut self) {
        self.queued.extend(self.steps.try_iter());
        if !self.session.is_running() {
            self.queued.clear();
            self.playhead = None;
            return;
        }
        let now = self.clock.now();
        while let Some(event) = self.queued.front() {
            if event.time > now {
                break;
            }
            self.playhead = Some(event.step);
            self.queued.pop_front();
        }
    }

    pub fn display_state(&self) -> DisplayState {
        let pattern = self.session.pattern();
        let mixer = self.session.mixer();
        let tracks = TrackId::ALL
            .into_iter()
            .map(|id| {
                let m = mixer.get(id);
                TrackStrip {
                    id,
                    steps: *pattern.track_steps(id),
                    muted: m.is_muted,
                    solo: m.is_solo,
                    gain: m.gain,
                }
            })
            .collect();
        DisplayState {
            tracks,
            playing_step: self.playhead,
            cursor_track: self.cursor_track,
            cursor_step: self.cursor_step,
            playing: self.session.is_running(),
            bpm: self.session.bpm(),
            pattern_name: pattern.name.clone(),
            pattern_pos: (self.selected_pattern + 1, self.patterns.len()),
            kit_name: self.selected_kit().map(str::to_string),
            display_text: self.display_text.clone(),
        }
    }

    /// Settings to write back on quit, keeping the scheduler tuning from
    /// `base`.
    pub fn project_state(&self, base: &ProjectState) -> ProjectState {
        ProjectState {
            bpm: self.session.bpm(),
            kit: self.selected_kit().map(str::to_string),
            selected_pattern: self.selected_pattern,
            mixer: self.session.mixer(),
            ..base.clone()
        }
    }
}

fn wrap(value: usize, delta: i32, len: usize) -> usize {
    (value as i64 + delta as i64).rem_euclid(len as i64) as usize
}
