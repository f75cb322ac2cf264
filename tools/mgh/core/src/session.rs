//! # Song session
//!
//! [`SessionController`] owns everything that changes while a song plays:
//! the chart cursor, the judgment frames, the score, and the open audio
//! source. Nothing outside the main loop touches it; interrupts reach it
//! only through [`crate::irq::PendingEvents`].
//!
//! ```text
//!              start_song / toggle (reload)
//!   Stopped ─────────────────────────────────▶ Playing ──┐
//!      ▲                                          │      │ advance_song
//!      └──────── audio exhausted / toggle ────────┘ ◀────┘
//! ```

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use log::{debug, error, info};

use crate::audio::{prepare, AudioSink, AudioSource};
use crate::bus::DisplayShadow;
use crate::chart::{Chart, ChartStream, NoteFrame};
use crate::config::{GameConfig, JudgePolicy};
use crate::judge::{JudgmentEngine, Score, ScoreDelta};
use crate::reference::reference_level;
use crate::{Error, Result};

/// 1-based song number. [`SongIndex::NONE`] until the first song starts.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SongIndex(u8);

impl SongIndex {
    pub const NONE: SongIndex = SongIndex(0);
    pub const FIRST: SongIndex = SongIndex(1);

    pub fn new(song: u8, num_songs: u8) -> Result<Self> {
        if song == 0 || song > num_songs {
            return Err(Error::SongOutOfRange { song, num_songs });
        }
        Ok(Self(song))
    }

    #[inline(always)]
    pub const fn get(self) -> u8 {
        self.0
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// The song after this one, wrapping from `num_songs` back to 1. With no
    /// songs at all there is no next song.
    pub const fn next(self, num_songs: u8) -> Self {
        match self.0.checked_rem(num_songs) {
            Some(rest) => Self(rest + 1),
            None => Self::NONE,
        }
    }
}

impl fmt::Display for SongIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
}

/// Snapshot of the session, for display and tests.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub song: SongIndex,
    pub play_state: PlayState,
    /// Chart frames consumed since the song started.
    pub frame_cursor: usize,
    pub score: Score,
}

/// Where charts and audio come from.
pub trait SongLibrary {
    type Audio: AudioSource;

    fn load_chart(&mut self, song: SongIndex) -> Result<Chart>;

    fn open_audio(&mut self, song: SongIndex) -> Result<Self::Audio>;
}

/// What one frame tick did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameOutcome {
    pub frame: NoteFrame,
    /// `None` when the tick wasn't judged: the chart had run out, or presses
    /// are judged on input edges instead.
    pub delta: Option<ScoreDelta>,
    pub end_of_chart: bool,
}

pub struct SessionController<L: SongLibrary> {
    config: GameConfig,
    library: L,
    stream: ChartStream,
    engine: JudgmentEngine,
    audio: Option<L::Audio>,
    block: Vec<i16>,
    state: SessionState,
}

impl<L: SongLibrary> SessionController<L> {
    pub fn new(config: GameConfig, library: L) -> Self {
        let block = vec![0; config.audio_block];
        Self {
            config,
            library,
            stream: ChartStream::default(),
            engine: JudgmentEngine::new(),
            audio: None,
            block,
            state: SessionState::default(),
        }
    }

    /// Drops the current song and starts `song` from the top with a zero
    /// score. Missing chart or audio doesn't stop the song from starting; it
    /// plays with no notes, or ends on the first audio drain.
    pub fn start_song(&mut self, song: SongIndex) -> Result<()> {
        let song = SongIndex::new(song.get(), self.config.num_songs)?;

        self.audio = None;

        let chart = self.library.load_chart(song).unwrap_or_else(|e| {
            error!("song {}: {}, playing without notes", song, e);
            Chart::empty()
        });
        let audio = self.library.open_audio(song).map_err(|e| {
            error!("song {}: {}, ending at the first drain", song, e);
        });

        info!("starting song {} ({} frames)", song, chart.len());

        self.stream.reset(chart);
        self.engine.clear();
        self.audio = audio.ok();
        self.state = SessionState {
            song,
            play_state: PlayState::Playing,
            frame_cursor: 0,
            score: Score::ZERO,
        };
        Ok(())
    }

    pub fn advance_song(&mut self) -> Result<SongIndex> {
        let next = self.state.song.next(self.config.num_songs);
        self.start_song(next)?;
        Ok(next)
    }

    /// Pausing zeroes the score and keeps the chart where it is. Resuming
    /// reloads the current song from the start.
    pub fn toggle_playing(&mut self) -> Result<PlayState> {
        match self.state.play_state {
            PlayState::Playing => {
                info!("song {} stopped", self.state.song);
                self.state.play_state = PlayState::Stopped;
                self.state.score.reset();
            }
            PlayState::Stopped if self.state.song.is_none() => {
                self.advance_song()?;
            }
            PlayState::Stopped => {
                self.start_song(self.state.song)?;
            }
        }
        Ok(self.state.play_state)
    }

    pub fn on_frame_tick(&mut self, input_active: bool) -> FrameOutcome {
        let step = self.stream.advance();
        self.engine.push(step.frame);
        self.state.frame_cursor = self.stream.position();

        let delta = match (step.end_of_song, self.config.judge) {
            (false, JudgePolicy::EveryFrame) => Some(self.judge(input_active)),
            _ => None,
        };

        FrameOutcome { frame: step.frame, delta, end_of_chart: step.end_of_song }
    }

    /// Judges against the frames already loaded, without advancing.
    pub fn check_note(&mut self, input_active: bool) -> Option<ScoreDelta> {
        if self.state.play_state != PlayState::Playing || self.stream.is_exhausted() {
            return None;
        }
        Some(self.judge(input_active))
    }

    fn judge(&mut self, input_active: bool) -> ScoreDelta {
        let delta = self.engine.judge_input(input_active);
        self.state.score.apply(delta);
        if delta != ScoreDelta::Neutral {
            debug!("{:?} at frame {}, score {}", delta, self.state.frame_cursor, self.state.score);
        }
        delta
    }

    /// Moves one audio block to `sink`. Returns the samples moved; 0 ends
    /// the song.
    pub fn on_audio_drain<S: AudioSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        if self.state.play_state != PlayState::Playing {
            return 0;
        }

        let read = match self.audio.as_mut() {
            Some(audio) => audio.read(&mut self.block),
            None => 0,
        };

        if read == 0 {
            info!("song {} finished, score {}", self.state.song, self.state.score);
            self.audio = None;
            self.state.play_state = PlayState::Stopped;
            return 0;
        }

        let samples = &mut self.block[..read];
        prepare(samples, self.config.volume);
        sink.write(samples);
        read
    }

    /// Comparator reference level for the current frame.
    pub fn reference_level(&self) -> u8 {
        reference_level(self.engine.current(), &self.config.references)
    }

    pub fn publish(&self, shadow: &DisplayShadow) {
        shadow.publish(self.engine.current(), self.state.score);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.play_state == PlayState::Playing
    }

    pub fn current_frame(&self) -> &NoteFrame {
        self.engine.current()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn library(&self) -> &L {
        &self.library
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::PcmSource;
    use crate::chart::DUE_NOW;

    #[derive(Default)]
    struct MemLibrary {
        charts: Vec<Chart>,
        audio_len: usize,
        chart_loads: usize,
        missing_audio: bool,
    }

    impl SongLibrary for MemLibrary {
        type Audio = PcmSource;

        fn load_chart(&mut self, song: SongIndex) -> Result<Chart> {
            self.chart_loads += 1;
            self.charts
                .get(song.get() as usize - 1)
                .cloned()
                .ok_or(Error::ChartUnavailable(song.get()))
        }

        fn open_audio(&mut self, song: SongIndex) -> Result<PcmSource> {
            if self.missing_audio {
                return Err(Error::AudioUnavailable(song.get()));
            }
            Ok(PcmSource::new(vec![100; self.audio_len]))
        }
    }

    struct VecSink(Vec<i16>);

    impl AudioSink for VecSink {
        fn has_room(&self, _samples: usize) -> bool {
            true
        }

        fn write(&mut self, samples: &[i16]) {
            self.0.extend_from_slice(samples);
        }
    }

    fn due(lane: usize) -> NoteFrame {
        let mut frame = NoteFrame::EMPTY;
        frame.set_note(lane, DUE_NOW, true);
        frame
    }

    fn session(charts: Vec<Chart>) -> SessionController<MemLibrary> {
        let library = MemLibrary { charts, audio_len: 2048, ..Default::default() };
        SessionController::new(GameConfig::default(), library)
    }

    #[test]
    fn song_index_wraps() {
        let mut song = SongIndex::FIRST;
        for expected in [2, 3, 4, 5, 6, 7, 1] {
            song = song.next(7);
            assert_eq!(song.get(), expected);
        }
        assert_eq!(SongIndex::NONE.next(7), SongIndex::FIRST);
        assert_eq!(SongIndex::FIRST.next(0), SongIndex::NONE);
        assert!(SongIndex::new(8, 7).is_err());
        assert!(SongIndex::new(0, 7).is_err());
    }

    #[test]
    fn hit_then_empty_frame() {
        let chart = Chart::from_frames(vec![due(0), NoteFrame::EMPTY]).unwrap();
        let mut session = session(vec![chart]);
        session.start_song(SongIndex::FIRST).unwrap();

        let deltas = [true, false].map(|input| session.on_frame_tick(input).delta);
        assert_eq!(deltas, [Some(ScoreDelta::Hit), Some(ScoreDelta::Neutral)]);
        assert_eq!(session.state().score, Score::new(1));
        assert_eq!(session.state().frame_cursor, 2);
    }

    #[test]
    fn frames_past_the_chart_are_not_judged() {
        let mut session = session(vec![Chart::from_frames(vec![due(1)]).unwrap()]);
        session.start_song(SongIndex::FIRST).unwrap();
        session.on_frame_tick(true);

        let outcome = session.on_frame_tick(false);
        assert!(outcome.end_of_chart);
        assert_eq!(outcome.delta, None);
        assert_eq!(session.state().score, Score::new(1));
        assert_eq!(session.check_note(false), None);
    }

    #[test]
    fn edge_policy_judges_only_on_check() {
        let chart = Chart::from_frames(vec![NoteFrame::EMPTY, NoteFrame::EMPTY]).unwrap();
        let library = MemLibrary { charts: vec![chart], audio_len: 16, ..Default::default() };
        let config = GameConfig { judge: JudgePolicy::OnInputEdge, ..Default::default() };
        let mut session = SessionController::new(config, library);
        session.start_song(SongIndex::FIRST).unwrap();

        assert_eq!(session.on_frame_tick(false).delta, None);
        assert_eq!(session.state().score, Score::ZERO);
        assert_eq!(session.check_note(false), Some(ScoreDelta::Penalty));
        assert_eq!(session.state().score, Score::new(-1));
    }

    #[test]
    fn pause_zeroes_score_without_reload() {
        let mut session = session(vec![Chart::from_frames(vec![due(0), due(0)]).unwrap()]);
        session.start_song(SongIndex::FIRST).unwrap();
        session.on_frame_tick(true);
        assert_eq!(session.state().score, Score::new(1));

        assert_eq!(session.toggle_playing(), Ok(PlayState::Stopped));
        assert_eq!(session.state().score, Score::ZERO);
        assert_eq!(session.state().frame_cursor, 1);
        assert_eq!(session.library().chart_loads, 1);

        assert_eq!(session.toggle_playing(), Ok(PlayState::Playing));
        assert_eq!(session.library().chart_loads, 2);
        assert_eq!(session.state().frame_cursor, 0);
        assert_eq!(session.state().song, SongIndex::FIRST);
    }

    #[test]
    fn toggle_before_any_song_starts_song_one() {
        let mut session = session(vec![Chart::empty()]);
        assert_eq!(session.toggle_playing(), Ok(PlayState::Playing));
        assert_eq!(session.state().song, SongIndex::FIRST);
    }

    #[test]
    fn audio_exhaustion_stops_the_song() {
        let mut session = session(vec![Chart::empty()]);
        session.start_song(SongIndex::FIRST).unwrap();
        let mut sink = VecSink(Vec::new());

        assert_eq!(session.on_audio_drain(&mut sink), 1024);
        assert_eq!(session.on_audio_drain(&mut sink), 1024);
        assert!(session.is_playing());
        assert_eq!(session.on_audio_drain(&mut sink), 0);
        assert_eq!(session.state().play_state, PlayState::Stopped);
        assert_eq!(sink.0.len(), 2048);

        assert_eq!(session.on_audio_drain(&mut sink), 0);
        assert_eq!(sink.0.len(), 2048);
    }

    #[test]
    fn missing_assets_degrade() {
        let library = MemLibrary { missing_audio: true, ..Default::default() };
        let mut session = SessionController::new(GameConfig::default(), library);
        session.start_song(SongIndex::new(3, 7).unwrap()).unwrap();
        assert!(session.is_playing());

        let outcome = session.on_frame_tick(true);
        assert!(outcome.end_of_chart);
        assert!(outcome.frame.is_empty());

        assert_eq!(session.on_audio_drain(&mut VecSink(Vec::new())), 0);
        assert!(!session.is_playing());
    }

    #[test]
    fn reference_follows_current_frame() {
        let mut session = session(vec![Chart::from_frames(vec![due(0), due(3)]).unwrap()]);
        session.start_song(SongIndex::FIRST).unwrap();
        assert_eq!(session.reference_level(), 0);
        session.on_frame_tick(false);
        assert_eq!(session.reference_level(), 144);
        session.on_frame_tick(false);
        assert_eq!(session.reference_level(), 34);
    }
}
