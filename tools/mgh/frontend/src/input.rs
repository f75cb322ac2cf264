//! Keyboard on the raw-mode terminal, standing in for the controller's
//! buttons.

use std::time::Duration;

use mgh_core::LANES;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Lane keys for `record`, left to right.
pub const LANE_KEYS: [char; LANES] = ['d', 'f', 'j', 'k'];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Song button.
    Next,
    /// On/off switch.
    PlayPause,
    /// Strum bar down (true) or up.
    Strum(bool),
    Quit,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecordKey {
    Lane(usize),
    Stop,
}

/// Everything the terminal has queued, without blocking.
pub fn poll_events() -> Vec<Event> {
    let mut events = vec![];
    while let Ok(true) = event::poll(Duration::from_millis(0)) {
        if let Ok(e) = event::read() {
            events.push(e)
        }
    }

    events
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
}

pub fn play_command(event: &Event) -> Option<Command> {
    let Event::Key(key) = event else { return None };
    if is_interrupt(key) {
        return Some(Command::Quit);
    }

    match (key.code, key.kind) {
        (KeyCode::Char(' '), KeyEventKind::Press | KeyEventKind::Repeat) => Some(Command::Strum(true)),
        (KeyCode::Char(' '), KeyEventKind::Release) => Some(Command::Strum(false)),
        (_, KeyEventKind::Release | KeyEventKind::Repeat) => None,
        (KeyCode::Char('n'), _) => Some(Command::Next),
        (KeyCode::Char('p'), _) => Some(Command::PlayPause),
        (KeyCode::Char('q') | KeyCode::Esc, _) => Some(Command::Quit),
        _ => None,
    }
}

/// Lane keys are timestamped; any other key ends the recording.
pub fn record_key(event: &Event) -> Option<RecordKey> {
    let Event::Key(key) = event else { return None };
    if key.kind != KeyEventKind::Press || matches!(key.code, KeyCode::Modifier(_)) {
        return None;
    }

    match key.code {
        KeyCode::Char(c) if !is_interrupt(key) => match LANE_KEYS.iter().position(|&k| k == c) {
            Some(lane) => Some(RecordKey::Lane(lane)),
            None => Some(RecordKey::Stop),
        },
        _ => Some(RecordKey::Stop),
    }
}
