//! # Multiplexed display bus
//!
//! Two clock/data/latch triples, one for the LED matrix and one for the score
//! display. Every [`MuxBus::tick`] refreshes one LED column and, on three of
//! every four ticks, one score digit:
//!
//! | cursor | LED column | score digit     |
//! |--------|------------|-----------------|
//! | 0      | 0          | ones            |
//! | 1      | 1          | tens            |
//! | 2      | 2          | hundreds        |
//! | 3      | 3          | -               |
//!
//! Each bit is put on DATA and clocked with a CLK low→high pulse; once a
//! device has all of its bits, a LATCH low→high pulse makes them visible.

pub mod shift_register;

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use log::{trace, warn};

use crate::chart::NoteFrame;
use crate::codec::{encode_digit, encode_note_column};
use crate::judge::Score;
use crate::{DIGITS, LANES};

pub use shift_register::ShiftRegister;

bitflags::bitflags! {
    /// Output levels of one clock/data/latch triple.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct Lines: u8 {
        const CLK   = 0b0000_0001;
        const DATA  = 0b0000_0010;
        const LATCH = 0b0000_0100;
    }
}

/// A set of output lines the bus can drive. Implemented over GPIO on the
/// target, and by [`ShiftRegister`] on the host.
pub trait LinePort {
    fn write(&mut self, lines: Lines);
}

impl<P: LinePort + ?Sized> LinePort for &mut P {
    fn write(&mut self, lines: Lines) {
        (**self).write(lines)
    }
}

/// Drives one port, keeping a shadow of the last written levels since the
/// hardware lines can't be read back.
#[derive(Debug)]
struct PortDriver<P: LinePort> {
    port: P,
    shadow: Lines,
}

impl<P: LinePort> PortDriver<P> {
    fn new(mut port: P) -> Self {
        let shadow = Lines::empty();
        port.write(shadow);
        Self { port, shadow }
    }

    #[inline(always)]
    fn set(&mut self, line: Lines, high: bool) {
        self.shadow.set(line, high);
        self.port.write(self.shadow);
    }

    #[inline(always)]
    fn pulse(&mut self, line: Lines) {
        self.set(line, false);
        self.set(line, true);
    }

    fn send(&mut self, bits: &[bool]) {
        for &bit in bits {
            self.set(Lines::DATA, bit);
            self.pulse(Lines::CLK);
        }
        self.pulse(Lines::LATCH);
    }
}

pub struct MuxBus<N: LinePort, S: LinePort> {
    notes: PortDriver<N>,
    score: PortDriver<S>,
    cursor: usize,
}

impl<N: LinePort, S: LinePort> MuxBus<N, S> {
    pub fn new(notes: N, score: S) -> Self {
        Self {
            notes: PortDriver::new(notes),
            score: PortDriver::new(score),
            cursor: 0,
        }
    }

    pub fn tick(&mut self, frame: &NoteFrame, score: Score) {
        let column = self.cursor;
        trace!("mux tick column={}", column);

        self.notes.send(&encode_note_column(frame, column));

        if column < DIGITS {
            self.score.send(&encode_digit(score.digit(column), column));
        }

        self.cursor = (self.cursor + 1) % LANES;
    }

    /// Ticks from the published display state.
    pub fn tick_shadow(&mut self, shadow: &DisplayShadow) {
        let (frame, score) = shadow.snapshot();
        self.tick(&frame, score);
    }

    /// Column that the next tick refreshes.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn note_port(&self) -> &N {
        &self.notes.port
    }

    pub fn score_port(&self) -> &S {
        &self.score.port
    }

}

/// What the mux tick shows. The main loop publishes into it, the timer reads
/// it. Lanes and score share one word so a tick never pairs a new frame with
/// an old score.
#[derive(Debug, Default)]
pub struct DisplayShadow {
    word: AtomicU64,
}

impl DisplayShadow {
    pub const fn new() -> Self {
        Self { word: AtomicU64::new(0) }
    }

    pub fn publish(&self, frame: &NoteFrame, score: Score) {
        let word = (frame.pack() as u64) << 32 | score.value() as u32 as u64;
        self.word.store(word, Ordering::Release);
    }

    pub fn snapshot(&self) -> (NoteFrame, Score) {
        let word = self.word.load(Ordering::Acquire);
        (NoteFrame::unpack((word >> 32) as u32), Score::new(word as u32 as i32))
    }
}

/// Keeps mux ticks from nesting. A tick that arrives while another is still
/// running is dropped, never queued.
#[derive(Debug, Default)]
pub struct TickGate {
    busy: AtomicBool,
    missed: AtomicU32,
}

pub struct TickGuard<'a> {
    gate: &'a TickGate,
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}

impl TickGate {
    pub const fn new() -> Self {
        Self { busy: AtomicBool::new(false), missed: AtomicU32::new(0) }
    }

    pub fn enter(&self) -> Option<TickGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(TickGuard { gate: self })
        } else {
            self.record_missed(1);
            None
        }
    }

    /// Counts ticks that never ran, e.g. timer periods that elapsed while the
    /// previous tick was still going.
    pub fn record_missed(&self, ticks: u32) {
        let total = self.missed.fetch_add(ticks, Ordering::Relaxed).wrapping_add(ticks);
        warn!("mux tick overran, dropped {} tick(s) ({} total)", ticks, total);
    }

    pub fn missed(&self) -> u32 {
        self.missed.load(Ordering::Relaxed)
    }
}
