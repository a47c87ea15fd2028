use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::shared::{DisplayState, STEPS_PER_PATTERN, TrackStrip};

const LABEL_WIDTH: usize = 4;

// One line per track: label, 16 cells, then mute/solo flags and gain.
pub fn draw_step_grid(frame: &mut Frame, area: Rect, state: &DisplayState, blink_on: bool) {
    let mut lines = vec![header_line(state)];
    for strip in &state.tracks {
        lines.push(track_line(strip, state, blink_on));
    }
    let block = Block::default().borders(Borders::ALL).title(" pattern ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

// step numbers, with the playhead column highlighted
fn header_line(state: &DisplayState) -> Line<'static> {
    let mut spans = vec![Span::raw(" ".repeat(LABEL_WIDTH))];
    for step in 0..STEPS_PER_PATTERN {
        let style = if state.playing_step == Some(step) {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else if step % 4 == 0 {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!("{:>2} ", step + 1), style));
    }
    Line::from(spans)
}

fn track_line(strip: &TrackStrip, state: &DisplayState, blink_on: bool) -> Line<'static> {
    let on_cursor_row = strip.id == state.cursor_track;
    let label_style = if on_cursor_row {
        Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else if strip.muted {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };
    let mut spans = vec![Span::styled(format!("{:<w$}", strip.id.to_string(), w = LABEL_WIDTH), label_style)];

    for (step, &on) in strip.steps.iter().enumerate() {
        let is_cursor = on_cursor_row && step == state.cursor_step;
        let is_playhead = state.playing_step == Some(step);
        let glyph = if on { " ■ " } else { " · " };
        let mut style = match (on, is_playhead) {
            (true, true) => Style::default().fg(Color::Black).bg(Color::Yellow),
            (true, false) if strip.id.is_accent() => Style::default().fg(Color::LightRed),
            (true, false) => Style::default().fg(Color::LightMagenta),
            (false, true) => Style::default().bg(Color::DarkGray),
            (false, false) => Style::default().fg(Color::DarkGray),
        };
        if is_cursor && blink_on {
            style = style.add_modifier(Modifier::REVERSED);
        }
        spans.push(Span::styled(glyph, style));
    }

    if !strip.id.is_accent() {
        let flag = |set: bool, c: &'static str, color: Color| {
            if set { Span::styled(c, Style::default().fg(color)) } else { Span::raw(" ") }
        };
        spans.push(Span::raw(" "));
        spans.push(flag(strip.muted, "M", Color::Red));
        spans.push(flag(strip.solo, "S", Color::Green));
        spans.push(Span::raw(format!(" {:>3.0}%", strip.gain * 100.0)));
    }
    Line::from(spans)
}
