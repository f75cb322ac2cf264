//! Analog reference for the button comparator.
//!
//! Every lane has a fixed weight on the 0..=255 output scale. While a note
//! is due on a lane its weight is added to the output, so the comparator
//! sees which combination of buttons the chart expects.

use crate::chart::{NoteFrame, DUE_NOW};
use crate::LANES;

pub const REFERENCES: [u8; LANES] = [144, 97, 69, 34];

/// Sum of the weights of every lane with a note due now, saturating at 255.
pub fn reference_level(frame: &NoteFrame, weights: &[u8; LANES]) -> u8 {
    (0..LANES)
        .filter(|&lane| frame.note(lane, DUE_NOW))
        .fold(0u8, |level, lane| level.saturating_add(weights[lane]))
}
