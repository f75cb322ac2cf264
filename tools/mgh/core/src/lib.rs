#![no_std]
extern crate alloc;

pub mod audio;
pub mod bus;
pub mod chart;
pub mod codec;
pub mod config;
pub mod game_loop;
pub mod irq;
pub mod judge;
pub mod reference;
pub mod session;
pub mod timing;

pub use audio::{AudioSink, AudioSource, PcmSource};
pub use bus::{DisplayShadow, LinePort, Lines, MuxBus, ShiftRegister, TickGate};
pub use chart::{Advance, Chart, ChartStream, NoteFrame};
pub use config::{GameConfig, JudgePolicy};
pub use game_loop::{Board, GameLoop, StepReport};
pub use irq::{ControlEvent, PendingEvents, PendingSet};
pub use judge::{JudgmentEngine, Score, ScoreDelta};
pub use session::{FrameOutcome, PlayState, SessionController, SessionState, SongIndex, SongLibrary};
pub use timing::{FrameClock, TimeDaemon};

pub const LANES: usize = 4;
pub const SUB_POSITIONS: usize = 8;
pub const DIGITS: usize = 3;

/// Width of one note frame, in milliseconds.
pub const FRAME_MS: u64 = 25;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("song {song} is outside 1..={num_songs}")]
    SongOutOfRange { song: u8, num_songs: u8 },

    #[error("chart has {frames} frames, at most {max} are supported")]
    ChartTooLong { frames: usize, max: usize },

    #[error("chart for song {0} is unavailable")]
    ChartUnavailable(u8),

    #[error("audio for song {0} is unavailable")]
    AudioUnavailable(u8),
}

pub type Result<T> = core::result::Result<T, Error>;
