//! The one place the main loop does anything.
//!
//! Call [`GameLoop::step`] as often as possible. Each pass drains the
//! interrupt flags, runs whatever is due, and republishes the display
//! state for the mux timer.

use log::{error, warn};

use crate::audio::AudioSink;
use crate::bus::DisplayShadow;
use crate::config::{GameConfig, JudgePolicy};
use crate::irq::{PendingEvents, PendingSet};
use crate::judge::ScoreDelta;
use crate::session::{FrameOutcome, SessionController, SongIndex, SongLibrary};
use crate::timing::{FrameClock, TimeDaemon};
use crate::Result;

/// Hardware the loop runs against.
pub trait Board: TimeDaemon + AudioSink {
    /// Raw comparator output: some button matches the reference.
    fn input_active(&self) -> bool;

    fn write_reference(&mut self, level: u8);
}

/// What one [`GameLoop::step`] did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    pub events: PendingSet,
    pub frame: Option<FrameOutcome>,
    pub note_check: Option<ScoreDelta>,
    pub drained: usize,
}

pub struct GameLoop<'a, B: Board, L: SongLibrary> {
    session: SessionController<L>,
    board: B,
    frame_clock: FrameClock,
    events: &'a PendingEvents,
    shadow: &'a DisplayShadow,
}

impl<'a, B: Board, L: SongLibrary> GameLoop<'a, B, L> {
    pub fn new(
        config: GameConfig,
        library: L,
        board: B,
        events: &'a PendingEvents,
        shadow: &'a DisplayShadow,
    ) -> Self {
        let frame_clock = FrameClock::new(config.frame_ms, board.now_ms());
        Self {
            session: SessionController::new(config, library),
            board,
            frame_clock,
            events,
            shadow,
        }
    }

    /// Starts song 1.
    pub fn boot(&mut self) {
        if let Err(e) = self.session.advance_song() {
            error!("boot: {}", e);
        }
        self.frame_clock.restart(self.board.now_ms());
        self.session.publish(self.shadow);
    }

    /// Jumps straight to `song`, as if the song button had been pressed
    /// enough times.
    pub fn select_song(&mut self, song: SongIndex) -> Result<()> {
        self.session.start_song(song)?;
        self.frame_clock.restart(self.board.now_ms());
        self.session.publish(self.shadow);
        Ok(())
    }

    pub fn step(&mut self) -> StepReport {
        let started = self.board.now_ms();
        let events = self.events.take();
        let mut report = StepReport { events, ..Default::default() };

        if events.contains(PendingSet::ADVANCE_SONG) {
            match self.session.advance_song() {
                Ok(_) => self.frame_clock.restart(self.board.now_ms()),
                Err(e) => error!("advance song: {}", e),
            }
        }

        if events.contains(PendingSet::PLAY_PAUSE) {
            match self.session.toggle_playing() {
                Ok(_) if self.session.is_playing() => self.frame_clock.restart(self.board.now_ms()),
                Ok(_) => {}
                Err(e) => error!("play/pause: {}", e),
            }
        }

        if self.session.is_playing() && self.frame_clock.poll(self.board.now_ms()) {
            report.frame = Some(self.session.on_frame_tick(self.board.input_active()));
            self.board.write_reference(self.session.reference_level());
        }

        if events.contains(PendingSet::NOTE_CHECK)
            && self.session.config().judge == JudgePolicy::OnInputEdge
        {
            report.note_check = self.session.check_note(self.board.input_active());
        }

        if self.session.is_playing() && self.board.has_room(self.session.config().audio_block) {
            report.drained = self.session.on_audio_drain(&mut self.board);
        }

        self.session.publish(self.shadow);

        let elapsed = self.board.now_ms().saturating_sub(started);
        if elapsed > self.frame_clock.period_ms() {
            warn!("main loop pass took {}ms", elapsed);
        }

        report
    }

    pub fn session(&self) -> &SessionController<L> {
        &self.session
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }
}
