use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use super::grid::draw_step_grid;
use crate::shared::{DisplayState, NUM_TRACKS};

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, blink_on: bool) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                      // status screen
            Constraint::Length(NUM_TRACKS as u16 + 3), // header row + tracks + borders
            Constraint::Min(1),                         // key help
        ])
        .split(area);

    draw_screen(frame, sections[0], state);
    draw_step_grid(frame, sections[1], state, blink_on);
    draw_help(frame, sections[2]);
}

fn draw_screen(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let transport = if state.playing {
        Span::styled(" ▶ PLAY ", Style::default().fg(Color::Black).bg(Color::Green))
    } else {
        Span::styled(" ■ STOP ", Style::default().fg(Color::White).bg(Color::DarkGray))
    };
    let (pos, count) = state.pattern_pos;
    let line = Line::from(vec![
        transport,
        Span::styled(format!("  {:.0} BPM", state.bpm), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("  [{pos}/{count}] {}", state.pattern_name)),
        Span::raw(format!("  kit: {}", state.kit_name.as_deref().unwrap_or("none"))),
        Span::styled(format!("  {}", state.display_text), Style::default().fg(Color::Yellow)),
    ]);
    let block = Block::default().borders(Borders::ALL).title(" drumseq ");
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let help = "arrows move  enter toggle  space play  m mute  s solo  -/= gain  [/] bpm  ,/. pattern  k kit  esc quit";
    frame.render_widget(Paragraph::new(help).style(Style::default().fg(Color::DarkGray)), area);
}
