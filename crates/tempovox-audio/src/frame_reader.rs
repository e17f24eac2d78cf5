//! Pulls raw samples off the ring and stamps them with the audio clock.

use super::ring_buffer::SampleConsumer;

/// A batch of interleaved device samples with its position on the audio
/// clock. `timestamp_ms` is derived from the running sample count, never the
/// wall clock, so replayed captures produce identical timestamps.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub samples: Vec<i16>,
    pub timestamp_ms: u64,
    pub sample_rate: u32,
    pub channels: u16,
}

pub struct FrameReader {
    consumer: SampleConsumer,
    sample_rate: u32,
    channels: u16,
    samples_read: u64,
}

impl FrameReader {
    pub fn new(consumer: SampleConsumer, sample_rate: u32, channels: u16) -> Self {
        Self {
            consumer,
            sample_rate,
            channels,
            samples_read: 0,
        }
    }

    /// Follows a device reconfiguration. The audio clock keeps counting;
    /// a rate change mid-stream shifts pacing, not ordering.
    pub fn update_device_config(&mut self, sample_rate: u32, channels: u16) {
        self.sample_rate = sample_rate;
        self.channels = channels;
    }

    /// Reads whatever is available, up to `max_samples`.
    pub fn read_frame(&mut self, max_samples: usize) -> Option<CapturedFrame> {
        let mut buffer = vec![0i16; max_samples];
        let count = self.consumer.read(&mut buffer);
        if count == 0 {
            return None;
        }
        buffer.truncate(count);

        // Position of the first sample in this batch, in per-channel time.
        let per_channel = self.samples_read / self.channels.max(1) as u64;
        let timestamp_ms = per_channel * 1000 / self.sample_rate as u64;
        self.samples_read += count as u64;

        Some(CapturedFrame {
            samples: buffer,
            timestamp_ms,
            sample_rate: self.sample_rate,
            channels: self.channels,
        })
    }

    pub fn available_samples(&self) -> usize {
        self.consumer.slots()
    }
}
