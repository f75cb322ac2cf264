use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use dasp_graph::{Buffer, Input};
use klingt::{AudioNode, CpalDevice, Klingt, ProcessContext};
use rtrb::Consumer;
use tracing::{info, warn};

/// Samples per graph block.
const BLOCK: usize = 64;

/// Pulls song samples off the ring at the song's rate and hands them out at
/// the device's rate, holding the last sample on underrun.
pub struct RingResampler {
    ring: Consumer<i16>,
    source_rate: Arc<AtomicU32>,
    device_rate: u32,
    phase: f64,
    current: f32,
    underruns: u64,
}

impl RingResampler {
    pub fn new(ring: Consumer<i16>, source_rate: Arc<AtomicU32>, device_rate: u32) -> Self {
        Self { ring, source_rate, device_rate, phase: 0.0, current: 0.0, underruns: 0 }
    }

    pub fn next_sample(&mut self) -> f32 {
        let step = self.source_rate.load(Ordering::Relaxed) as f64 / self.device_rate as f64;
        self.phase += step;
        while self.phase >= 1.0 {
            self.phase -= 1.0;
            match self.ring.pop() {
                Ok(sample) => self.current = sample as f32 / 32768.0,
                Err(_) => self.underruns += 1,
            }
        }
        self.current
    }

    pub fn underruns(&self) -> u64 {
        self.underruns
    }
}

#[derive(Clone, Copy, Debug)]
pub enum RingSourceMessage {}

struct RingSource {
    resampler: RingResampler,
}

impl AudioNode for RingSource {
    type Message = RingSourceMessage;

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        _messages: impl Iterator<Item = RingSourceMessage>,
        _inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        if let Some(output) = outputs.first_mut() {
            for sample in output.iter_mut() {
                *sample = self.resampler.next_sample();
            }
        }
    }

    fn num_outputs(&self) -> usize {
        1
    }
}

/// Plays the ring on the default output device, or just paces through it
/// in real time when `mute` is set or there is no device.
pub fn spawn(
    ring: Consumer<i16>,
    source_rate: Arc<AtomicU32>,
    mute: bool,
    quit: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let device = if mute { None } else { CpalDevice::default_output().into_iter().next() };
        match device {
            Some(device) => play(device, ring, source_rate, &quit),
            None => {
                if !mute {
                    warn!("no audio output device, playing silently");
                }
                pace(ring, source_rate, &quit)
            }
        }
    })
}

fn play(device: CpalDevice, ring: Consumer<i16>, source_rate: Arc<AtomicU32>, quit: &AtomicBool) {
    let device_rate = device.sample_rate();
    info!("audio out at {}Hz", device_rate);

    let mut klingt = Klingt::new(device_rate).with_output(device.create_sink());
    let source = klingt.add(RingSource {
        resampler: RingResampler::new(ring, source_rate, device_rate),
    });
    klingt.output(&source);

    let start = Instant::now();
    let mut blocks_processed = 0u64;
    while !quit.load(Ordering::Relaxed) {
        // stay a few blocks ahead of the device
        let elapsed = start.elapsed().as_secs_f64();
        let target_blocks = (elapsed * device_rate as f64 / BLOCK as f64) as u64 + 4;
        while blocks_processed < target_blocks {
            klingt.process();
            blocks_processed += 1;
        }
        thread::sleep(Duration::from_millis(2));
    }
}

fn pace(mut ring: Consumer<i16>, source_rate: Arc<AtomicU32>, quit: &AtomicBool) {
    let start = Instant::now();
    let mut consumed = 0f64;
    while !quit.load(Ordering::Relaxed) {
        let rate = source_rate.load(Ordering::Relaxed) as f64;
        let target = start.elapsed().as_secs_f64() * rate;
        let due = (target - consumed).max(0.0) as usize;
        let n = due.min(ring.slots());
        if n > 0 {
            if let Ok(chunk) = ring.read_chunk(n) {
                chunk.commit_all();
            }
        }
        // samples that weren't there yet are skipped, not owed
        consumed += due as f64;
        thread::sleep(Duration::from_millis(5));
    }
}
