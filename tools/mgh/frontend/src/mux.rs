use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use mgh_core::codec::{decode_digit, decode_note_column, DecodedDigit, BLANK};
use mgh_core::{DisplayShadow, MuxBus, ShiftRegister, TickGate, DIGITS, LANES};
use tracing::debug;

/// Mux tick period, 1 kHz.
pub const TICK: Duration = Duration::from_millis(1);

/// What the emulated LED matrix and score display are showing, as read off
/// the shift register outputs.
#[derive(Debug)]
pub struct Panel {
    lanes: AtomicU32,
    segments: AtomicU32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PanelView {
    pub lanes: [u8; LANES],
    /// Ones, tens, hundreds. `None` is a blank or unreadable digit.
    pub digits: [Option<u8>; DIGITS],
}

impl Default for Panel {
    fn default() -> Self {
        Self {
            lanes: AtomicU32::new(0),
            segments: AtomicU32::new(u32::from_le_bytes([BLANK; 4])),
        }
    }
}

impl Panel {
    /// Reads whatever the last tick latched on both ports.
    pub fn capture(&self, bus: &MuxBus<ShiftRegister, ShiftRegister>) {
        if let Some(column) = decode_note_column(bus.note_port().latched()) {
            let mut lanes = self.lanes.load(Ordering::Relaxed).to_le_bytes();
            lanes[column.lane()] = column.mask;
            self.lanes.store(u32::from_le_bytes(lanes), Ordering::Relaxed);
        }
        if let Some(digit) = decode_digit(bus.score_port().latched()) {
            let mut segments = self.segments.load(Ordering::Relaxed).to_le_bytes();
            segments[digit.position] = digit.segments;
            self.segments.store(u32::from_le_bytes(segments), Ordering::Relaxed);
        }
    }

    pub fn view(&self) -> PanelView {
        let lanes = self.lanes.load(Ordering::Relaxed).to_le_bytes();
        let segments = self.segments.load(Ordering::Relaxed).to_le_bytes();
        PanelView {
            lanes,
            digits: std::array::from_fn(|position| {
                DecodedDigit { position, segments: segments[position] }.value()
            }),
        }
    }
}

/// Runs the mux tick at 1 kHz until `quit` is set.
pub fn spawn(
    shadow: Arc<DisplayShadow>,
    panel: Arc<Panel>,
    gate: Arc<TickGate>,
    quit: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        #[cfg(not(target_arch = "wasm32"))]
        {
            use thread_priority::*;
            // if it didn't work, oh well
            let _ = set_current_thread_priority(ThreadPriority::Max);
        }

        let mut bus = MuxBus::new(ShiftRegister::new(), ShiftRegister::new());
        let mut deadline = Instant::now();

        while !quit.load(Ordering::Relaxed) {
            deadline += TICK;
            let now = Instant::now();
            if now < deadline {
                thread::sleep(deadline - now);
            } else if now - deadline >= TICK {
                let missed = ((now - deadline).as_micros() / TICK.as_micros()) as u32;
                gate.record_missed(missed);
                deadline = now;
            }

            if let Some(_guard) = gate.enter() {
                bus.tick_shadow(&shadow);
                panel.capture(&bus);
            }
        }

        debug!("mux stopped, {} ticks missed", gate.missed());
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mgh_core::{NoteFrame, Score};

    #[test]
    fn four_ticks_fill_the_panel() {
        let shadow = DisplayShadow::new();
        let frame = NoteFrame::from_lanes([0x81, 0x42, 0x24, 0x18]);
        shadow.publish(&frame, Score::new(47));

        let panel = Panel::default();
        let mut bus = MuxBus::new(ShiftRegister::new(), ShiftRegister::new());
        for _ in 0..4 {
            bus.tick_shadow(&shadow);
            panel.capture(&bus);
        }

        let view = panel.view();
        assert_eq!(view.lanes, frame.lanes());
        assert_eq!(view.digits, [Some(7), Some(4), Some(0)]);
    }

    #[test]
    fn negative_score_leaves_digits_blank() {
        let shadow = DisplayShadow::new();
        shadow.publish(&NoteFrame::EMPTY, Score::new(-3));

        let panel = Panel::default();
        let mut bus = MuxBus::new(ShiftRegister::new(), ShiftRegister::new());
        for _ in 0..3 {
            bus.tick_shadow(&shadow);
            panel.capture(&bus);
        }
        assert_eq!(panel.view().digits, [None, Some(0), Some(0)]);
    }

    #[test]
    fn starts_blank() {
        assert_eq!(Panel::default().view(), PanelView { lanes: [0; 4], digits: [None; 3] });
    }
}
