//! Interrupt-side event flags.
//!
//! Handlers only ever call [`PendingEvents::raise`], a single atomic store.
//! The main loop collects everything raised since its last pass with
//! [`PendingEvents::take`] and acts on it there.

use core::sync::atomic::{AtomicBool, Ordering};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ControlEvent {
    /// Song button, falling edge.
    AdvanceSong,
    /// Either edge of the raw input line.
    NoteCheck,
    /// On/off switch, either edge.
    PlayPause,
}

bitflags::bitflags! {
    /// Events drained in one main-loop pass.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct PendingSet: u8 {
        const ADVANCE_SONG = 0b001;
        const NOTE_CHECK   = 0b010;
        const PLAY_PAUSE   = 0b100;
    }
}

impl From<ControlEvent> for PendingSet {
    fn from(event: ControlEvent) -> Self {
        match event {
            ControlEvent::AdvanceSong => PendingSet::ADVANCE_SONG,
            ControlEvent::NoteCheck => PendingSet::NOTE_CHECK,
            ControlEvent::PlayPause => PendingSet::PLAY_PAUSE,
        }
    }
}

#[derive(Debug, Default)]
pub struct PendingEvents {
    advance_song: AtomicBool,
    note_check: AtomicBool,
    play_pause: AtomicBool,
}

impl PendingEvents {
    pub const fn new() -> Self {
        Self {
            advance_song: AtomicBool::new(false),
            note_check: AtomicBool::new(false),
            play_pause: AtomicBool::new(false),
        }
    }

    fn flag(&self, event: ControlEvent) -> &AtomicBool {
        match event {
            ControlEvent::AdvanceSong => &self.advance_song,
            ControlEvent::NoteCheck => &self.note_check,
            ControlEvent::PlayPause => &self.play_pause,
        }
    }

    /// Safe to call from interrupt context. Raising an already pending event
    /// is a no-op.
    #[inline(always)]
    pub fn raise(&self, event: ControlEvent) {
        self.flag(event).store(true, Ordering::Release);
    }

    pub fn is_pending(&self, event: ControlEvent) -> bool {
        self.flag(event).load(Ordering::Acquire)
    }

    /// Clears and returns every pending event.
    pub fn take(&self) -> PendingSet {
        let mut set = PendingSet::empty();
        for event in [ControlEvent::AdvanceSong, ControlEvent::NoteCheck, ControlEvent::PlayPause] {
            if self.flag(event).swap(false, Ordering::Acquire) {
                set |= event.into();
            }
        }
        set
    }
}
