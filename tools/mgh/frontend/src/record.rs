//! Note capture: plays a song and timestamps lane keys, writing the
//! `<name>_0.txt` .. `<name>_3.txt` files that `convert` reads.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use mgh_core::audio::BLOCK_SAMPLES;
use mgh_core::{AudioSink, AudioSource, PcmSource, LANES};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::{Block, Paragraph, Widget};
use rtrb::RingBuffer;
use tracing::info;

use crate::input::{self, RecordKey, LANE_KEYS};
use crate::library::read_wav;
use crate::terminal::Term;
use crate::dac;

const REDRAW: Duration = Duration::from_millis(40);

/// Note times per lane, in seconds from the start of playback.
#[derive(Debug, Default)]
pub struct Recording {
    lanes: [Vec<f64>; LANES],
}

impl Recording {
    pub fn hit(&mut self, lane: usize, at_s: f64) {
        if let Some(times) = self.lanes.get_mut(lane) {
            times.push(at_s);
        }
    }

    pub fn counts(&self) -> [usize; LANES] {
        std::array::from_fn(|lane| self.lanes[lane].len())
    }

    /// One time per line, millisecond precision.
    pub fn lane_text(&self, lane: usize) -> String {
        let mut out = String::new();
        for t in &self.lanes[lane] {
            let _ = writeln!(out, "{t:.3}");
        }
        out
    }

    /// Writes `<stem>_<lane>.txt` for every lane, empty lanes included.
    pub fn write(&self, stem: &str) -> anyhow::Result<Vec<PathBuf>> {
        (0..LANES)
            .map(|lane| {
                let path = PathBuf::from(format!("{stem}_{lane}.txt"));
                fs::write(&path, self.lane_text(lane))
                    .with_context(|| format!("can't write {}", path.display()))?;
                Ok(path)
            })
            .collect()
    }
}

/// `song.wav` records into `song_0.txt` .. `song_3.txt`.
pub fn stem_for(wav: &Path) -> anyhow::Result<String> {
    let stem = wav.with_extension("");
    stem.to_str()
        .map(str::to_owned)
        .with_context(|| format!("{} is not valid UTF-8", wav.display()))
}

struct RecordWidget<'a> {
    recording: &'a Recording,
    elapsed_s: f64,
    song_done: bool,
}

impl Widget for RecordWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let counts = self.recording.counts();
        let mut lines = vec![Line::from(format!("{:8.3}s", self.elapsed_s))];
        for (key, count) in LANE_KEYS.iter().zip(counts) {
            lines.push(Line::from(format!("{key}: {count} notes")));
        }
        lines.push(Line::from(if self.song_done {
            "song finished, any other key saves"
        } else {
            "d f j k record notes, any other key saves"
        }));
        Paragraph::new(lines)
            .block(Block::bordered().title(" mgh record "))
            .render(area, buf);
    }
}

pub fn record(wav: &Path, mute: bool) -> anyhow::Result<Vec<PathBuf>> {
    let stem = stem_for(wav)?;
    let (samples, rate) = read_wav(wav)?;
    info!("{}: {} samples at {}Hz", wav.display(), samples.len(), rate);

    let quit = Arc::new(AtomicBool::new(false));
    let (mut producer, consumer) = RingBuffer::<i16>::new(BLOCK_SAMPLES * 4);
    let dac = dac::spawn(consumer, Arc::new(AtomicU32::new(rate)), mute, quit.clone());

    let mut source = PcmSource::new(samples);
    let mut block = vec![0i16; BLOCK_SAMPLES];
    let mut recording = Recording::default();
    let mut song_done = false;
    let mut last_draw: Option<Instant> = None;

    let result = (|| -> anyhow::Result<()> {
        let mut term = Term::init()?;
        let started = Instant::now();
        loop {
            for event in input::poll_events() {
                match input::record_key(&event) {
                    Some(RecordKey::Lane(lane)) => recording.hit(lane, started.elapsed().as_secs_f64()),
                    Some(RecordKey::Stop) => return Ok(()),
                    None => {}
                }
            }

            while !song_done && producer.has_room(BLOCK_SAMPLES) {
                match source.read(&mut block) {
                    0 => song_done = true,
                    n => producer.write(&block[..n]),
                }
            }

            if last_draw.map_or(true, |at| at.elapsed() >= REDRAW) {
                last_draw = Some(Instant::now());
                let widget = RecordWidget {
                    recording: &recording,
                    elapsed_s: started.elapsed().as_secs_f64(),
                    song_done,
                };
                term.draw(|f| f.render_widget(widget, f.area()))?;
            }

            thread::sleep(Duration::from_millis(2));
        }
    })();

    quit.store(true, Ordering::Relaxed);
    let _ = dac.join();
    result?;

    let paths = recording.write(&stem)?;
    info!("recorded {:?} notes", recording.counts());
    Ok(paths)
}
