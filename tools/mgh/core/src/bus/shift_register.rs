use super::{LinePort, Lines};

/// Edge seen between two consecutive writes to a port.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum PortEvent {
    ClockRisingEdge,
    LatchRisingEdge,
    None,
}

fn port_event(before: Lines, after: Lines) -> PortEvent {
    let changed = before ^ after;

    if after.contains(Lines::CLK) && changed.contains(Lines::CLK) {
        PortEvent::ClockRisingEdge
    } else if after.contains(Lines::LATCH) && changed.contains(Lines::LATCH) {
        PortEvent::LatchRisingEdge
    } else {
        PortEvent::None
    }
}

/// Receiving end of one bus port: a pair of chained 8-bit serial-in,
/// parallel-out registers with an output latch.
///
/// The first bit clocked in ends up in the highest position that was shifted
/// through, so a 12-bit column lands in bits 11..0 of [`Self::latched`].
#[derive(Debug, Default, Clone)]
pub struct ShiftRegister {
    lines: Lines,
    shifter: u16,
    latched: u16,
    latches: u32,
}

impl ShiftRegister {
    pub const fn new() -> Self {
        Self { lines: Lines::empty(), shifter: 0, latched: 0, latches: 0 }
    }

    /// Register contents not yet latched.
    pub fn shifter(&self) -> u16 {
        self.shifter
    }

    /// What the outputs currently show.
    pub fn latched(&self) -> u16 {
        self.latched
    }

    /// Number of latch pulses seen so far.
    pub fn latch_count(&self) -> u32 {
        self.latches
    }
}

impl LinePort for ShiftRegister {
    fn write(&mut self, lines: Lines) {
        match port_event(self.lines, lines) {
            PortEvent::ClockRisingEdge => {
                self.shifter = (self.shifter << 1) | lines.contains(Lines::DATA) as u16;
            }
            PortEvent::LatchRisingEdge => {
                self.latched = self.shifter;
                self.latches = self.latches.wrapping_add(1);
            }
            PortEvent::None => {}
        }
        self.lines = lines;
    }
}
