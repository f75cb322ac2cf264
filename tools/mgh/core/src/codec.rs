//! # Display wire encoding
//!
//! Both displays sit behind a pair of chained 8-bit shift registers. Nothing
//! on the wire frames or checks the data, so the bit counts below are the
//! protocol.
//!
//! ## LED note matrix (12 bits per column)
//!
//! ```text
//! r0 r1 r2 r3 | m7 m6 m5 m4 m3 m2 m1 m0
//! ```
//!
//! A one-hot row selector (`r == column` high), then the 8-bit mask of lane
//! `3 - column`, high bit first.
//!
//! ## 7-segment score (11 bits per digit)
//!
//! ```text
//! [2 - position lows] 1 [position lows] | dp g f e d c b a
//! ```
//!
//! Segments are active-low: 0 lights the segment, all ones is blank.

use heapless::Vec;

use crate::chart::NoteFrame;
use crate::{DIGITS, LANES};

pub const NOTE_COLUMN_BITS: usize = LANES + 8;
pub const DIGIT_BITS: usize = DIGITS + 8;

/// Bits in the order they are clocked out.
pub type Bits = Vec<bool, BITS_CAPACITY>;

const BITS_CAPACITY: usize = 16;
const _: () = assert!(NOTE_COLUMN_BITS <= BITS_CAPACITY && DIGIT_BITS <= BITS_CAPACITY);

/// Active-low segment patterns for 0-9, bit 0 = a through bit 7 = dp.
pub const SEGMENTS: [u8; 10] = [
    0b1100_0000, // 0
    0b1111_1001, // 1
    0b1010_0100, // 2
    0b1011_0000, // 3
    0b1001_1001, // 4
    0b1001_0010, // 5
    0b1000_0010, // 6
    0b1111_1000, // 7
    0b1000_0000, // 8
    0b1001_1000, // 9
];

pub const BLANK: u8 = 0xFF;

/// Segment byte for `value`, blank for anything outside 0..=9.
#[inline]
pub fn segment_byte(value: i32) -> u8 {
    match value {
        0..=9 => SEGMENTS[value as usize],
        _ => BLANK,
    }
}

/// Segments for `value` in a, b, c, d, e, f, g, dp order (true = high = off).
pub fn segments(value: i32) -> [bool; 8] {
    let byte = segment_byte(value);
    core::array::from_fn(|i| byte & (1 << i) != 0)
}

pub fn encode_note_column(frame: &NoteFrame, column: usize) -> Bits {
    debug_assert!(column < LANES, "column {column} out of range");
    let column = column % LANES;

    let mask = frame.lane(LANES - 1 - column);
    (0..LANES)
        .map(|row| row == column)
        .chain((0..8).rev().map(|bit| mask & (1 << bit) != 0))
        .collect()
}

pub fn encode_digit(value: i32, position: usize) -> Bits {
    debug_assert!(position < DIGITS, "digit position {position} out of range");
    let position = position % DIGITS;

    // one-hot selector, hundreds first
    let byte = segment_byte(value);
    (0..DIGITS)
        .map(|slot| slot == DIGITS - 1 - position)
        .chain((0..8).rev().map(|segment| byte & (1 << segment) != 0))
        .collect()
}

/// LED column as seen on the latched register outputs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DecodedColumn {
    pub column: usize,
    /// Mask of lane `3 - column`.
    pub mask: u8,
}

impl DecodedColumn {
    pub const fn lane(&self) -> usize {
        LANES - 1 - self.column
    }
}

/// Score digit as seen on the latched register outputs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DecodedDigit {
    pub position: usize,
    pub segments: u8,
}

impl DecodedDigit {
    /// The digit shown, `None` for blank or a pattern outside the table.
    pub fn value(&self) -> Option<u8> {
        SEGMENTS.iter().position(|&s| s == self.segments).map(|d| d as u8)
    }
}

/// Decodes 12 latched bits (first bit clocked in at bit 11). Returns `None`
/// unless exactly one row is selected.
pub fn decode_note_column(latched: u16) -> Option<DecodedColumn> {
    let selector = (latched >> 8) & 0xF;
    if selector.count_ones() != 1 {
        return None;
    }
    Some(DecodedColumn {
        column: LANES - 1 - selector.trailing_zeros() as usize,
        mask: latched as u8,
    })
}

/// Decodes 11 latched bits (first bit clocked in at bit 10). Returns `None`
/// unless exactly one digit is selected.
pub fn decode_digit(latched: u16) -> Option<DecodedDigit> {
    let selector = (latched >> 8) & 0b111;
    if selector.count_ones() != 1 {
        return None;
    }
    Some(DecodedDigit {
        position: selector.trailing_zeros() as usize,
        segments: latched as u8,
    })
}
