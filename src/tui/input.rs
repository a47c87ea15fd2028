use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use crate::shared::InputEvent;

const GAIN_STEP: f32 = 0.05;
const BPM_STEP: f32 = 1.0;
const BPM_COARSE_STEP: f32 = 10.0;

// Keys:
//   arrows        move cursor (step / track)
//   Enter         toggle step under cursor
//   Space         play / stop
//   m / s         mute / solo the cursor's track
//   - / =         gain down / up
//   [ / ]         bpm -1 / +1, { / } for -10 / +10
//   , / .         previous / next pattern
//   k             next kit
//   Esc / q       quit
pub fn poll_input(timeout: Duration) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }
    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code).into_iter().collect());
    }
    Ok(vec![])
}

fn handle_key(code: KeyCode) -> Option<InputEvent> {
    let event = match code {
        KeyCode::Esc | KeyCode::Char('q') => InputEvent::Quit,
        KeyCode::Char(' ') => InputEvent::PlayPress,
        KeyCode::Enter => InputEvent::ToggleStep,

        KeyCode::Left => InputEvent::MoveCursor { dx: -1, dy: 0 },
        KeyCode::Right => InputEvent::MoveCursor { dx: 1, dy: 0 },
        KeyCode::Up => InputEvent::MoveCursor { dx: 0, dy: -1 },
        KeyCode::Down => InputEvent::MoveCursor { dx: 0, dy: 1 },

        KeyCode::Char('m') => InputEvent::ToggleMute,
        KeyCode::Char('s') => InputEvent::ToggleSolo,
        KeyCode::Char('-') => InputEvent::AdjustGain(-GAIN_STEP),
        KeyCode::Char('=') => InputEvent::AdjustGain(GAIN_STEP),

        KeyCode::Char('[') => InputEvent::AdjustBpm(-BPM_STEP),
        KeyCode::Char(']') => InputEvent::AdjustBpm(BPM_STEP),
        KeyCode::Char('{') => InputEvent::AdjustBpm(-BPM_COARSE_STEP),
        KeyCode::Char('}') => InputEvent::AdjustBpm(BPM_COARSE_STEP),

        KeyCode::Char(',') => InputEvent::PrevPattern,
        KeyCode::Char('.') => InputEvent::NextPattern,
        KeyCode::Char('k') => InputEvent::NextKit,
        _ => return None,
    };
    Some(event)
}
