use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context};
use hound::{SampleFormat, WavReader};
use mgh_core::{Chart, Error, PcmSource, SongIndex, SongLibrary};
use tracing::{debug, warn};

/// Songs in one directory: `<n>.txt` chart bytes next to `<n>.wav` audio.
pub struct DirLibrary {
    dir: PathBuf,
    /// Rate of the most recently opened song, for the DAC thread.
    sample_rate: Arc<AtomicU32>,
}

impl DirLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), sample_rate: Arc::new(AtomicU32::new(44_100)) }
    }

    pub fn sample_rate(&self) -> Arc<AtomicU32> {
        self.sample_rate.clone()
    }

    pub fn chart_path(&self, song: SongIndex) -> PathBuf {
        self.dir.join(format!("{song}.txt"))
    }

    pub fn audio_path(&self, song: SongIndex) -> PathBuf {
        self.dir.join(format!("{song}.wav"))
    }
}

impl SongLibrary for DirLibrary {
    type Audio = PcmSource;

    fn load_chart(&mut self, song: SongIndex) -> mgh_core::Result<Chart> {
        let path = self.chart_path(song);
        let bytes = fs::read(&path).map_err(|e| {
            warn!("can't read {}: {}", path.display(), e);
            Error::ChartUnavailable(song.get())
        })?;
        Chart::from_bytes(&bytes)
    }

    fn open_audio(&mut self, song: SongIndex) -> mgh_core::Result<PcmSource> {
        let path = self.audio_path(song);
        let (samples, rate) = read_wav(&path).map_err(|e| {
            warn!("{:#}", e);
            Error::AudioUnavailable(song.get())
        })?;
        debug!("{}: {} samples at {}Hz", path.display(), samples.len(), rate);
        self.sample_rate.store(rate, Ordering::Relaxed);
        Ok(PcmSource::new(samples))
    }
}

/// Reads a 16-bit PCM WAV file, mixed down to mono.
pub fn read_wav(path: &Path) -> anyhow::Result<(Vec<i16>, u32)> {
    let mut reader =
        WavReader::open(path).with_context(|| format!("can't open {}", path.display()))?;
    let spec = reader.spec();

    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        bail!(
            "{}: expected 16-bit integer PCM, found {}-bit {:?}",
            path.display(),
            spec.bits_per_sample,
            spec.sample_format
        );
    }

    let interleaved = reader
        .samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("{}: truncated sample data", path.display()))?;

    let channels = spec.channels.max(1) as usize;
    let mono = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| (frame.iter().map(|&s| s as i32).sum::<i32>() / frame.len() as i32) as i16)
            .collect()
    };

    Ok((mono, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};
    use mgh_core::AudioSource;

    fn write_wav(path: &Path, channels: u16, samples: &[i16]) {
        let spec = WavSpec {
            channels,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn loads_chart_and_audio_by_number() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2.txt"), [0x80, 0, 0, 0, 0, 0x40]).unwrap();
        write_wav(&dir.path().join("2.wav"), 1, &[1, 2, 3]);

        let mut library = DirLibrary::new(dir.path());
        let song = SongIndex::new(2, 7).unwrap();

        let chart = library.load_chart(song).unwrap();
        assert_eq!(chart.len(), 2);

        let mut audio = library.open_audio(song).unwrap();
        let mut buf = [0i16; 8];
        assert_eq!(audio.read(&mut buf), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert_eq!(library.sample_rate().load(Ordering::Relaxed), 8000);
    }

    #[test]
    fn stereo_is_mixed_down() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.wav");
        write_wav(&path, 2, &[100, 300, -50, -150]);
        let (samples, rate) = read_wav(&path).unwrap();
        assert_eq!(samples, [200, -100]);
        assert_eq!(rate, 8000);
    }

    #[test]
    fn missing_files_map_to_core_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = DirLibrary::new(dir.path());
        let song = SongIndex::new(5, 7).unwrap();
        assert_eq!(library.load_chart(song), Err(Error::ChartUnavailable(5)));
        assert!(matches!(library.open_audio(song), Err(Error::AudioUnavailable(5))));
    }
}
