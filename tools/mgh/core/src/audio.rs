//! Song audio plumbing.
//!
//! The controller only moves fixed-size blocks from an [`AudioSource`] to an
//! [`AudioSink`]; decoding and the DAC itself live elsewhere. A source that
//! reads 0 samples has ended, which is the one natural end of a song.

use alloc::vec::Vec;
use log::warn;
use rtrb::Producer;

/// Samples per drain.
pub const BLOCK_SAMPLES: usize = 1024;

/// Unity gain for [`prepare`].
pub const UNITY_VOLUME: u16 = 1024;

pub trait AudioSource {
    /// Fills `buf` from the front and returns how many samples were written.
    /// 0 means the source is exhausted.
    fn read(&mut self, buf: &mut [i16]) -> usize;
}

pub trait AudioSink {
    /// Whether `samples` more samples can be written without blocking.
    fn has_room(&self, samples: usize) -> bool;

    fn write(&mut self, samples: &[i16]);
}

impl<S: AudioSource + ?Sized> AudioSource for &mut S {
    fn read(&mut self, buf: &mut [i16]) -> usize {
        (**self).read(buf)
    }
}

impl AudioSink for Producer<i16> {
    fn has_room(&self, samples: usize) -> bool {
        self.slots() >= samples
    }

    fn write(&mut self, samples: &[i16]) {
        let mut dropped = 0usize;
        for &sample in samples {
            if self.push(sample).is_err() {
                dropped += 1;
            }
        }
        if dropped > 0 {
            warn!("audio ring full; dropped {} samples", dropped);
        }
    }
}

/// Scales `samples` in place by `volume / 1024`, saturating.
pub fn prepare(samples: &mut [i16], volume: u16) {
    if volume == UNITY_VOLUME {
        return;
    }
    for sample in samples.iter_mut() {
        let scaled = (*sample as i32 * volume as i32) >> 10;
        *sample = scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
    }
}

/// In-memory PCM, e.g. a decoded song file.
#[derive(Debug, Default, Clone)]
pub struct PcmSource {
    samples: Vec<i16>,
    cursor: usize,
}

impl PcmSource {
    pub fn new(samples: Vec<i16>) -> Self {
        Self { samples, cursor: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.samples.len() - self.cursor
    }
}

impl AudioSource for PcmSource {
    fn read(&mut self, buf: &mut [i16]) -> usize {
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.samples[self.cursor..self.cursor + n]);
        self.cursor += n;
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn pcm_source_reads_in_blocks_then_ends() {
        let mut source = PcmSource::new(vec![1, 2, 3, 4, 5]);
        let mut buf = [0i16; 2];
        assert_eq!(source.read(&mut buf), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(source.read(&mut buf), 2);
        assert_eq!(source.read(&mut buf), 1);
        assert_eq!(buf[0], 5);
        assert_eq!(source.read(&mut buf), 0);
    }

    #[test]
    fn prepare_scales_and_saturates() {
        let mut samples = [1000i16, -1000, i16::MAX, i16::MIN];
        prepare(&mut samples, 512);
        assert_eq!(samples, [500, -500, i16::MAX / 2, i16::MIN / 2]);

        let mut loud = [i16::MAX, i16::MIN];
        prepare(&mut loud, 4096);
        assert_eq!(loud, [i16::MAX, i16::MIN]);
    }

    #[test]
    fn unity_volume_is_untouched() {
        let mut samples = [7i16, -7];
        prepare(&mut samples, UNITY_VOLUME);
        assert_eq!(samples, [7, -7]);
    }

    #[test]
    fn ring_producer_reports_room() {
        let (mut producer, mut consumer) = rtrb::RingBuffer::<i16>::new(4);
        assert!(producer.has_room(4));
        producer.write(&[1, 2, 3]);
        assert!(!producer.has_room(2));
        producer.write(&[4, 5]);
        assert_eq!(consumer.slots(), 4);
        assert_eq!(consumer.pop(), Ok(1));
    }
}
