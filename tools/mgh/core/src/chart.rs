//! # Note charts
//!
//! A chart is the per-song sequence of [`NoteFrame`]s. On disk (and over
//! whatever else feeds the controller) it is a flat byte stream, 4 bytes per
//! 25 ms frame, one byte per lane:
//!
//! | bit | sub-position                 |
//! |-----|------------------------------|
//! | 7   | due now                      |
//! | 6   | one 0.15 s band ahead        |
//! | ... | ...                          |
//! | 0   | furthest upcoming            |
//!
//! [`ChartStream`] walks a loaded chart forward one frame per tick. Running
//! off the end is the normal way a chart finishes: the stream keeps yielding
//! the empty frame and flags end-of-song.

use alloc::vec::Vec;
use bit_field::BitField;
use log::debug;

use crate::{Error, Result, LANES, SUB_POSITIONS};

/// Sub-position that is "due now".
pub const DUE_NOW: usize = 7;
/// Sub-position one step ahead of due, the early half of the margin of error.
pub const DUE_NEXT: usize = 6;

/// One 25 ms slice of the chart: 4 lanes x 8 sub-positions.
///
/// Lane byte bit `i` is sub-position `i`, the same low-bit-first layout as
/// the chart byte stream.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct NoteFrame {
    lanes: [u8; LANES],
}

impl NoteFrame {
    pub const EMPTY: NoteFrame = NoteFrame { lanes: [0; LANES] };

    pub const fn from_lanes(lanes: [u8; LANES]) -> Self {
        Self { lanes }
    }

    #[inline(always)]
    pub const fn lanes(&self) -> [u8; LANES] {
        self.lanes
    }

    /// 8-bit mask for one lane.
    #[inline(always)]
    pub fn lane(&self, lane: usize) -> u8 {
        self.lanes[lane]
    }

    #[inline(always)]
    pub fn note(&self, lane: usize, position: usize) -> bool {
        self.lanes[lane].get_bit(position)
    }

    pub fn set_note(&mut self, lane: usize, position: usize, present: bool) {
        self.lanes[lane].set_bit(position, present);
    }

    /// True if any lane has a note at `position`.
    #[inline]
    pub fn any_at(&self, position: usize) -> bool {
        self.lanes.iter().any(|lane| lane.get_bit(position))
    }

    pub fn is_empty(&self) -> bool {
        self.lanes == [0; LANES]
    }

    /// Packs the four lane bytes into one word, lane 0 in the low byte.
    #[inline(always)]
    pub const fn pack(&self) -> u32 {
        u32::from_le_bytes(self.lanes)
    }

    #[inline(always)]
    pub const fn unpack(word: u32) -> Self {
        Self { lanes: word.to_le_bytes() }
    }
}

/// A loaded, immutable chart with an explicit frame count.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Chart {
    frames: Vec<NoteFrame>,
}

impl Chart {
    /// Upper bound on chart length: a little over 27 minutes of 25 ms frames.
    pub const MAX_FRAMES: usize = u16::MAX as usize;

    pub const fn empty() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn from_frames(frames: Vec<NoteFrame>) -> Result<Self> {
        if frames.len() > Self::MAX_FRAMES {
            return Err(Error::ChartTooLong { frames: frames.len(), max: Self::MAX_FRAMES });
        }
        Ok(Self { frames })
    }

    /// Parses the chart byte stream. A short trailing frame is kept; its
    /// missing lanes read as no notes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let count = bytes.len().div_ceil(LANES);
        if count > Self::MAX_FRAMES {
            return Err(Error::ChartTooLong { frames: count, max: Self::MAX_FRAMES });
        }

        let mut frames = Vec::with_capacity(count);
        for chunk in bytes.chunks(LANES) {
            let mut lanes = [0u8; LANES];
            lanes[..chunk.len()].copy_from_slice(chunk);
            frames.push(NoteFrame::from_lanes(lanes));
        }

        Ok(Self { frames })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.frames.iter().flat_map(|frame| frame.lanes()).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame(&self, index: usize) -> Option<NoteFrame> {
        self.frames.get(index).copied()
    }

    pub fn frames(&self) -> &[NoteFrame] {
        &self.frames
    }

    /// Number of frames that carry at least one note at the due position.
    pub fn due_notes(&self) -> usize {
        self.frames.iter().filter(|frame| frame.any_at(DUE_NOW)).count()
    }
}

/// Result of one [`ChartStream::advance`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Advance {
    pub frame: NoteFrame,
    pub end_of_song: bool,
}

/// Forward-only cursor over a loaded chart.
#[derive(Debug, Default)]
pub struct ChartStream {
    chart: Chart,
    cursor: usize,
    exhausted: bool,
}

impl ChartStream {
    pub fn new(chart: Chart) -> Self {
        Self { chart, cursor: 0, exhausted: false }
    }

    /// Rebinds the stream to `chart`, starting at frame 0. The previous chart
    /// is dropped.
    pub fn reset(&mut self, chart: Chart) {
        self.chart = chart;
        self.cursor = 0;
        self.exhausted = false;
    }

    pub fn advance(&mut self) -> Advance {
        match self.chart.frame(self.cursor) {
            Some(frame) => {
                self.cursor += 1;
                Advance { frame, end_of_song: false }
            }
            None => {
                if !self.exhausted {
                    debug!("chart exhausted after {} frames", self.cursor);
                    self.exhausted = true;
                }
                Advance { frame: NoteFrame::EMPTY, end_of_song: true }
            }
        }
    }

    /// Frames consumed so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

const _: () = assert!(SUB_POSITIONS == 8 && DUE_NOW == SUB_POSITIONS - 1);
