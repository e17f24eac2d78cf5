//! WAV replay into the capture ring.
//!
//! Stands in for the microphone when running against recordings. Samples go
//! into the ring at the file's native rate and channel count, so the replay
//! path exercises the same mixdown and resampling as live capture.

use std::path::Path;
use std::time::Duration;

use hound::WavReader;
use tracing::info;

use super::capture::DeviceConfig;
use super::ring_buffer::SampleProducer;
use tempovox_foundation::AudioError;

/// Per-channel batch size, sized to mimic a typical device callback.
const BATCH_SAMPLES_PER_CHANNEL: usize = 512;

/// How much silence to append after the file, in milliseconds. Enough for
/// the segmenter to close out an utterance that runs to the end of the file.
const TRAILER_MS: usize = 600;

#[derive(Debug, Clone, Copy)]
pub enum PlaybackMode {
    /// Sleep between batches to match the file's real duration.
    Realtime,
    /// Realtime pacing divided by the given factor.
    Accelerated(f32),
    /// No pacing at all. Backpressure comes from the ring alone.
    Unpaced,
}

pub struct WavReplay {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
    batch_size: usize,
    mode: PlaybackMode,
}

impl WavReplay {
    pub fn open<P: AsRef<Path>>(path: P, mode: PlaybackMode) -> Result<Self, AudioError> {
        let mut reader =
            WavReader::open(&path).map_err(|e| AudioError::WavFile(e.to_string()))?;
        let spec = reader.spec();

        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(AudioError::WavFile(format!(
                "only 16-bit PCM is supported, got {:?} {} bit",
                spec.sample_format, spec.bits_per_sample
            )));
        }

        let samples: Vec<i16> = reader
            .samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AudioError::WavFile(e.to_string()))?;

        info!(
            "loaded WAV: {} samples at {} Hz, {} channels",
            samples.len(),
            spec.sample_rate,
            spec.channels
        );

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            batch_size: BATCH_SAMPLES_PER_CHANNEL * spec.channels as usize,
            mode,
        })
    }

    /// Rate and channels the chunker should treat this source as.
    pub fn device_config(&self) -> DeviceConfig {
        DeviceConfig {
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    /// File duration in wall-clock terms for the chosen playback mode.
    pub fn duration_ms(&self) -> u64 {
        let base =
            self.samples.len() as u64 * 1000 / (self.sample_rate as u64 * self.channels as u64);
        match self.mode {
            PlaybackMode::Realtime => base,
            PlaybackMode::Accelerated(speed) => (base as f32 / speed) as u64,
            PlaybackMode::Unpaced => 0,
        }
    }

    /// Feeds the whole file into the ring batch by batch, then a silence
    /// trailer so downstream stages see the utterance end.
    pub async fn stream_to_ring(&self, producer: &mut SampleProducer) {
        let nanos_per_sample =
            1_000_000_000u64 / (self.sample_rate as u64 * self.channels as u64);

        for chunk in self.samples.chunks(self.batch_size) {
            Self::write_all(producer, chunk).await;

            let batch_nanos = chunk.len() as u64 * nanos_per_sample;
            match self.mode {
                PlaybackMode::Realtime => {
                    tokio::time::sleep(Duration::from_nanos(batch_nanos)).await;
                }
                PlaybackMode::Accelerated(speed) => {
                    // 50us floor keeps the task yielding to the chunker.
                    let nanos = ((batch_nanos as f32 / speed) as u64).max(50_000);
                    tokio::time::sleep(Duration::from_nanos(nanos)).await;
                }
                PlaybackMode::Unpaced => {}
            }
        }

        info!(
            "WAV replay finished ({} samples), appending silence trailer",
            self.samples.len()
        );

        let trailer_samples =
            self.sample_rate as usize * self.channels as usize * TRAILER_MS / 1000;
        let silence = vec![0i16; self.batch_size];
        let mut remaining = trailer_samples;
        while remaining > 0 {
            let take = remaining.min(silence.len());
            Self::write_all(producer, &silence[..take]).await;
            remaining -= take;
            if let PlaybackMode::Realtime = self.mode {
                tokio::time::sleep(Duration::from_nanos(take as u64 * nanos_per_sample)).await;
            }
        }
    }

    async fn write_all(producer: &mut SampleProducer, chunk: &[i16]) {
        let mut written = 0;
        while written < chunk.len() {
            let count = producer.write(&chunk[written..]);
            written += count;
            if count == 0 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring_buffer::SampleRing;

    fn write_test_wav(path: &Path, rate: u32, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn rejects_float_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0.5f32).unwrap();
        writer.finalize().unwrap();

        assert!(WavReplay::open(&path, PlaybackMode::Unpaced).is_err());
    }

    #[test]
    fn reports_duration_and_device_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_test_wav(&path, 16_000, &vec![100i16; 32_000]);

        let replay = WavReplay::open(&path, PlaybackMode::Realtime).unwrap();
        assert_eq!(replay.duration_ms(), 2000);
        assert_eq!(replay.device_config().sample_rate, 16_000);
        assert_eq!(replay.device_config().channels, 1);

        let fast = WavReplay::open(&path, PlaybackMode::Accelerated(4.0)).unwrap();
        assert_eq!(fast.duration_ms(), 500);
    }

    #[tokio::test]
    async fn streams_samples_then_silence_trailer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.wav");
        let payload: Vec<i16> = (0..100).map(|i| i as i16 + 1).collect();
        write_test_wav(&path, 1000, &payload);

        let replay = WavReplay::open(&path, PlaybackMode::Unpaced).unwrap();
        let (mut producer, mut consumer) = SampleRing::new(2048).split();
        replay.stream_to_ring(&mut producer).await;

        // 100 payload samples plus 600ms of silence at 1 kHz.
        let mut out = vec![0i16; 2048];
        let read = consumer.read(&mut out);
        assert_eq!(read, 700);
        assert_eq!(&out[..100], &payload[..]);
        assert!(out[100..700].iter().all(|&s| s == 0));
    }
}
