//! Chart authoring: note timings in, chart bytes out.
//!
//! Input is one file per lane, `<name>_0.txt` .. `<name>_3.txt`, each holding
//! note times in seconds, one per line. Every 25 ms frame gets one byte per
//! lane; bit 7 is set while a note is due (it was hit within the last
//! 0.15 s), bits 6..0 preview the next seven 0.15 s bands.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use mgh_core::chart::DUE_NOW;
use mgh_core::{Chart, Error, NoteFrame, LANES, SUB_POSITIONS};
use tracing::info;

/// Width of one sub-position band, in seconds.
pub const NOTE_SEP_S: f64 = 0.15;
pub const FRAME_S: f64 = 0.025;
/// Frames keep coming this long after the last note.
pub const TAIL_S: f64 = 2.0;
/// Stand-in for a lane without notes, far enough back to never show.
const EMPTY_LANE: f64 = -100.0;

/// Lane byte for notes at `notes` seen from time `t`.
pub fn lane_byte(notes: &[f64], t: f64) -> u8 {
    let mut byte = 0u8;
    for &note in notes {
        if t - NOTE_SEP_S < note && note <= t {
            byte |= 1 << DUE_NOW;
        }
        for band in 1..SUB_POSITIONS {
            let lo = t + (band - 1) as f64 * NOTE_SEP_S;
            let hi = t + band as f64 * NOTE_SEP_S;
            if lo < note && note <= hi {
                byte |= 1 << (DUE_NOW - band);
            }
        }
    }
    byte
}

pub fn chart_from_times(lanes: &[Vec<f64>; LANES]) -> Result<Chart> {
    ensure!(lanes.iter().flatten().all(|t| t.is_finite()), "note times must be finite");

    let last = |notes: &Vec<f64>| notes.last().copied().unwrap_or(EMPTY_LANE);
    let end = lanes.iter().map(last).fold(EMPTY_LANE, f64::max) + TAIL_S;

    // `as` saturates, so a huge end still lands above the limit
    let count = (end / FRAME_S).ceil().max(0.0) as usize;
    if count > Chart::MAX_FRAMES {
        return Err(Error::ChartTooLong { frames: count, max: Chart::MAX_FRAMES }.into());
    }

    let mut frames = Vec::with_capacity(count);
    let mut t = 0.0;
    while t < end {
        frames.push(NoteFrame::from_lanes(std::array::from_fn(|lane| lane_byte(&lanes[lane], t))));
        t += FRAME_S;
    }

    Ok(Chart::from_frames(frames)?)
}

pub fn read_lane_times(path: &Path) -> Result<Vec<f64>> {
    let text = fs::read_to_string(path).with_context(|| format!("can't read {}", path.display()))?;
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let time = line
                .trim()
                .parse::<f64>()
                .with_context(|| format!("{}:{}: not a time: {:?}", path.display(), i + 1, line))?;
            ensure!(time.is_finite(), "{}:{}: time must be finite: {:?}", path.display(), i + 1, line);
            Ok(time)
        })
        .collect()
}

/// Converts `<name>_0.txt`..`<name>_3.txt` into `<name>_led.txt`.
pub fn convert(name: &str) -> Result<PathBuf> {
    let mut lanes: [Vec<f64>; LANES] = Default::default();
    for (lane, times) in lanes.iter_mut().enumerate() {
        *times = read_lane_times(Path::new(&format!("{name}_{lane}.txt")))?;
    }

    let chart = chart_from_times(&lanes)?;
    let out = PathBuf::from(format!("{name}_led.txt"));
    fs::write(&out, chart.to_bytes()).with_context(|| format!("can't write {}", out.display()))?;

    info!("{}: {} frames, {} due", out.display(), chart.len(), chart.due_notes());
    Ok(out)
}

/// Frame count and a per-frame dump, lane bytes high bit first.
pub fn inspect(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("can't read {}", path.display()))?;
    let chart = Chart::from_bytes(&bytes)?;

    let mut out = String::new();
    writeln!(
        out,
        "{}: {} frames ({:.2}s), {} with a note due",
        path.display(),
        chart.len(),
        chart.len() as f64 * FRAME_S,
        chart.due_notes()
    )?;
    for (i, frame) in chart.frames().iter().enumerate() {
        let [a, b, c, d] = frame.lanes();
        writeln!(out, "{i:05} {a:08b} {b:08b} {c:08b} {d:08b}")?;
    }
    Ok(out)
}
