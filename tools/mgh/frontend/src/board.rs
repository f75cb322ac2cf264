use std::sync::Arc;
use std::time::Instant;

use mgh_core::{AudioSink, Board, ControlEvent, PendingEvents, TimeDaemon};
use rtrb::Producer;

pub struct InstantClock {
    pub instant: Instant,
}

impl TimeDaemon for InstantClock {
    fn now_ms(&self) -> u64 {
        self.instant.elapsed().as_millis() as u64
    }
}

/// How long a key press holds the input line on terminals that never
/// report releases.
pub const PRESS_MS: u64 = 100;

/// The strum key. Follows real press/release events where the terminal
/// reports them; otherwise each press (or key repeat) holds for [`PRESS_MS`].
#[derive(Debug, Default)]
pub struct Button {
    reports_release: bool,
    down: bool,
    held_until_ms: u64,
}

impl Button {
    pub fn new(reports_release: bool) -> Self {
        Self { reports_release, ..Default::default() }
    }

    pub fn press(&mut self, now_ms: u64) {
        self.down = true;
        self.held_until_ms = now_ms + PRESS_MS;
    }

    pub fn release(&mut self) {
        self.down = false;
        self.held_until_ms = 0;
    }

    pub fn is_held(&self, now_ms: u64) -> bool {
        if self.reports_release {
            self.down
        } else {
            now_ms < self.held_until_ms
        }
    }
}

/// Presses exactly when the chart asks for it, optionally missing every
/// `miss_every`th note.
#[derive(Debug, Default)]
pub struct AutoPlayer {
    miss_every: Option<u32>,
    notes_seen: u32,
    due: bool,
    skipping: bool,
    pressed: bool,
}

impl AutoPlayer {
    pub fn new(miss_every: Option<u32>) -> Self {
        Self { miss_every: miss_every.filter(|&k| k > 0), ..Default::default() }
    }

    /// Reacts to a new reference level. Returns whether the press changed.
    pub fn on_reference(&mut self, level: u8) -> bool {
        let due = level > 0;
        if due && !self.due {
            self.notes_seen = self.notes_seen.wrapping_add(1);
            self.skipping = matches!(self.miss_every, Some(k) if self.notes_seen % k == 0);
        }
        self.due = due;

        let press = due && !self.skipping;
        let changed = press != self.pressed;
        self.pressed = press;
        changed
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }
}

pub enum Player {
    Auto(AutoPlayer),
    Keyboard(Button),
}

/// The desktop stand-in for the controller board.
pub struct HostBoard {
    clock: InstantClock,
    player: Player,
    audio: Producer<i16>,
    events: Arc<PendingEvents>,
    reference: u8,
    last_input: bool,
}

impl HostBoard {
    pub fn new(
        clock: InstantClock,
        player: Player,
        audio: Producer<i16>,
        events: Arc<PendingEvents>,
    ) -> Self {
        Self {
            clock,
            player,
            audio,
            events,
            reference: 0,
            last_input: false,
        }
    }

    /// Last level written to the reference output.
    pub fn reference(&self) -> u8 {
        self.reference
    }

    /// Strum key went down or up. Ignored under autoplay.
    pub fn strum(&mut self, down: bool) {
        let now = self.clock.now_ms();
        if let Player::Keyboard(button) = &mut self.player {
            if down {
                button.press(now);
            } else {
                button.release();
            }
        }
        self.poll_input_edge();
    }

    fn sample_input(&self) -> bool {
        match &self.player {
            Player::Auto(auto) => auto.is_pressed(),
            Player::Keyboard(button) => button.is_held(self.clock.now_ms()),
        }
    }

    /// Raises the note-check event on every input edge, like the pin-change
    /// interrupt on the board.
    pub fn poll_input_edge(&mut self) {
        let input = self.sample_input();
        if input != self.last_input {
            self.last_input = input;
            self.events.raise(ControlEvent::NoteCheck);
        }
    }
}

impl TimeDaemon for HostBoard {
    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

impl AudioSink for HostBoard {
    fn has_room(&self, samples: usize) -> bool {
        self.audio.has_room(samples)
    }

    fn write(&mut self, samples: &[i16]) {
        self.audio.write(samples)
    }
}

impl Board for HostBoard {
    fn input_active(&self) -> bool {
        self.sample_input()
    }

    fn write_reference(&mut self, level: u8) {
        self.reference = level;
        if let Player::Auto(auto) = &mut self.player {
            auto.on_reference(level);
        }
        self.poll_input_edge();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autoplayer_follows_the_reference() {
        let mut auto = AutoPlayer::new(None);
        assert!(auto.on_reference(144));
        assert!(auto.is_pressed());
        assert!(!auto.on_reference(97));
        assert!(auto.on_reference(0));
        assert!(!auto.is_pressed());
    }

    #[test]
    fn autoplayer_misses_every_kth_note() {
        let mut auto = AutoPlayer::new(Some(3));
        let mut pressed = Vec::new();
        for _ in 0..6 {
            // each note is due for two frames
            auto.on_reference(34);
            auto.on_reference(34);
            pressed.push(auto.is_pressed());
            auto.on_reference(0);
        }
        assert_eq!(pressed, [true, true, false, true, true, false]);
    }

    #[test]
    fn tap_expires_without_release_events() {
        let mut button = Button::new(false);
        assert!(!button.is_held(0));
        button.press(1000);
        assert!(button.is_held(1000));
        assert!(button.is_held(1000 + PRESS_MS - 1));
        assert!(!button.is_held(1000 + PRESS_MS));
    }

    #[test]
    fn held_key_stays_down_until_released() {
        let mut button = Button::new(true);
        button.press(1000);
        assert!(button.is_held(1000 + 10 * PRESS_MS));
        button.release();
        assert!(!button.is_held(1000 + 10 * PRESS_MS));
    }

    #[test]
    fn strum_edges_raise_note_check() {
        let events = Arc::new(PendingEvents::new());
        let (producer, _consumer) = rtrb::RingBuffer::new(16);
        let clock = InstantClock { instant: Instant::now() };
        let player = Player::Keyboard(Button::new(true));
        let mut board = HostBoard::new(clock, player, producer, events.clone());

        board.strum(true);
        assert!(board.input_active());
        assert!(events.is_pending(ControlEvent::NoteCheck));
        events.take();

        // key repeat while held is not a new edge
        board.strum(true);
        assert!(!events.is_pending(ControlEvent::NoteCheck));

        board.strum(false);
        assert!(!board.input_active());
        assert!(events.is_pending(ControlEvent::NoteCheck));
    }

    #[test]
    fn input_edges_raise_note_check() {
        let events = Arc::new(PendingEvents::new());
        let (producer, _consumer) = rtrb::RingBuffer::new(16);
        let clock = InstantClock { instant: Instant::now() };
        let mut board = HostBoard::new(clock, Player::Auto(AutoPlayer::new(None)), producer, events.clone());

        board.write_reference(144);
        assert!(board.input_active());
        assert!(events.is_pending(ControlEvent::NoteCheck));
        events.take();

        board.write_reference(144);
        assert!(!events.is_pending(ControlEvent::NoteCheck));

        board.write_reference(0);
        assert!(!board.input_active());
        assert!(events.is_pending(ControlEvent::NoteCheck));
        assert_eq!(board.reference(), 0);
    }
}
