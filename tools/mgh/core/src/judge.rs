//! # Hit judgment
//!
//! | input | note due now | note at 6 or 7, current or previous frame | delta |
//! |-------|--------------|-------------------------------------------|-------|
//! | on    | yes          | -                                         | +1    |
//! | on    | no           | -                                         | 0     |
//! | off   | -            | yes                                       | 0     |
//! | off   | -            | no                                        | -1    |
//!
//! A press only scores when a note is exactly due, and a stray press is never
//! penalized. Not pressing is only penalized when nothing was due within one
//! frame either side, which covers early and late releases.

use core::fmt;

use log::trace;

use crate::chart::{NoteFrame, DUE_NEXT, DUE_NOW};
use crate::DIGITS;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(i8)]
pub enum ScoreDelta {
    Penalty = -1,
    Neutral = 0,
    Hit = 1,
}

impl ScoreDelta {
    #[inline(always)]
    pub const fn value(self) -> i32 {
        self as i8 as i32
    }
}

/// Keeps the current and previous note frames and judges the raw input line
/// against them.
#[derive(Debug, Default, Clone)]
pub struct JudgmentEngine {
    current: NoteFrame,
    previous: NoteFrame,
}

impl JudgmentEngine {
    pub const fn new() -> Self {
        Self { current: NoteFrame::EMPTY, previous: NoteFrame::EMPTY }
    }

    pub fn judge(current: &NoteFrame, previous: &NoteFrame, input_active: bool) -> ScoreDelta {
        if input_active {
            if current.any_at(DUE_NOW) {
                ScoreDelta::Hit
            } else {
                ScoreDelta::Neutral
            }
        } else {
            let nearby = |frame: &NoteFrame| frame.any_at(DUE_NEXT) || frame.any_at(DUE_NOW);
            if nearby(current) || nearby(previous) {
                ScoreDelta::Neutral
            } else {
                ScoreDelta::Penalty
            }
        }
    }

    /// Makes `frame` current; the old current frame becomes previous.
    pub fn push(&mut self, frame: NoteFrame) {
        self.previous = self.current;
        self.current = frame;
    }

    pub fn judge_input(&self, input_active: bool) -> ScoreDelta {
        let delta = Self::judge(&self.current, &self.previous, input_active);
        trace!("judged input={} -> {:?}", input_active, delta);
        delta
    }

    pub fn current(&self) -> &NoteFrame {
        &self.current
    }

    pub fn previous(&self) -> &NoteFrame {
        &self.previous
    }

    pub fn clear(&mut self) {
        self.current = NoteFrame::EMPTY;
        self.previous = NoteFrame::EMPTY;
    }
}

/// Signed running score. Negative values are legal; the display shows them
/// digit-wise and blanks whatever falls outside 0..=9.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Score(i32);

impl Score {
    pub const ZERO: Score = Score(0);

    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    #[inline(always)]
    pub const fn value(self) -> i32 {
        self.0
    }

    pub fn apply(&mut self, delta: ScoreDelta) {
        self.0 = self.0.saturating_add(delta.value());
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }

    /// Digit shown at display `position` (0 = ones, 1 = tens, 2 = hundreds),
    /// using truncating division. Out-of-range results are passed through so
    /// the codec can blank them.
    pub const fn digit(self, position: usize) -> i32 {
        match position {
            0 => self.0 % 10,
            1 => (self.0 / 10) % 10,
            _ => self.0 / 100,
        }
    }

    pub fn digits(self) -> [i32; DIGITS] {
        [self.digit(0), self.digit(1), self.digit(2)]
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(position: Option<usize>) -> NoteFrame {
        let mut frame = NoteFrame::EMPTY;
        if let Some(position) = position {
            frame.set_note(2, position, true);
        }
        frame
    }

    #[test]
    fn decision_table_holds_for_all_combinations() {
        // (input, due now, nearby via current 6, nearby via previous) -> delta
        for input in [true, false] {
            for due_now in [true, false] {
                for nearby in [true, false] {
                    let current = if due_now {
                        frame_with(Some(DUE_NOW))
                    } else if nearby {
                        frame_with(Some(DUE_NEXT))
                    } else {
                        frame_with(Some(3))
                    };
                    let previous = NoteFrame::EMPTY;

                    let expected = match (input, due_now, due_now || nearby) {
                        (true, true, _) => ScoreDelta::Hit,
                        (true, false, _) => ScoreDelta::Neutral,
                        (false, _, true) => ScoreDelta::Neutral,
                        (false, _, false) => ScoreDelta::Penalty,
                    };
                    assert_eq!(
                        JudgmentEngine::judge(&current, &previous, input),
                        expected,
                        "input={input} due_now={due_now} nearby={nearby}"
                    );
                }
            }
        }
    }

    #[test]
    fn previous_frame_covers_late_release() {
        let previous = frame_with(Some(DUE_NOW));
        let current = NoteFrame::EMPTY;
        assert_eq!(JudgmentEngine::judge(&current, &previous, false), ScoreDelta::Neutral);

        let previous = frame_with(Some(DUE_NEXT));
        assert_eq!(JudgmentEngine::judge(&current, &previous, false), ScoreDelta::Neutral);
    }

    #[test]
    fn previous_frame_does_not_count_for_a_hit() {
        let previous = frame_with(Some(DUE_NOW));
        assert_eq!(JudgmentEngine::judge(&NoteFrame::EMPTY, &previous, true), ScoreDelta::Neutral);
    }

    #[test]
    fn nothing_nearby_is_penalized() {
        assert_eq!(
            JudgmentEngine::judge(&NoteFrame::EMPTY, &frame_with(Some(5)), false),
            ScoreDelta::Penalty
        );
    }

    #[test]
    fn push_shifts_current_into_previous() {
        let mut engine = JudgmentEngine::new();
        engine.push(frame_with(Some(DUE_NOW)));
        engine.push(NoteFrame::EMPTY);
        assert_eq!(*engine.previous(), frame_with(Some(DUE_NOW)));
        assert_eq!(engine.judge_input(false), ScoreDelta::Neutral);
        engine.push(NoteFrame::EMPTY);
        assert_eq!(engine.judge_input(false), ScoreDelta::Penalty);
    }

    #[test]
    fn score_digits_truncate() {
        assert_eq!(Score::new(472).digits(), [2, 7, 4]);
        assert_eq!(Score::new(5).digits(), [5, 0, 0]);
        assert_eq!(Score::new(1234).digits(), [4, 3, 12]);
        assert_eq!(Score::new(-7).digits(), [-7, 0, 0]);
    }

    #[test]
    fn score_applies_deltas() {
        let mut score = Score::ZERO;
        score.apply(ScoreDelta::Hit);
        score.apply(ScoreDelta::Hit);
        score.apply(ScoreDelta::Penalty);
        score.apply(ScoreDelta::Neutral);
        assert_eq!(score.value(), 1);
        score.reset();
        assert_eq!(score, Score::ZERO);
    }
}
