//! Audio capture and conditioning for the TempoVox pipeline.
//!
//! Live microphone input and WAV replay both land in a lock-free ring, get
//! re-framed into 10 ms hops at 16 kHz, and fan out over a broadcast
//! channel. Everything downstream of this crate sees one format.

pub mod capture;
pub mod chunker;
pub mod dc_blocker;
pub mod device;
pub mod frame_reader;
pub mod lookback;
pub mod resampler;
pub mod ring_buffer;
pub mod wav;

// Public API
pub use capture::{CaptureStats, CaptureThread, DeviceConfig};
pub use chunker::{ChunkerConfig, HopChunker, HopFrame, ResamplerQuality};
pub use dc_blocker::DcBlocker;
pub use device::{DeviceInfo, DeviceManager};
pub use frame_reader::{CapturedFrame, FrameReader};
pub use lookback::{LookbackRing, DEFAULT_LOOKBACK_SAMPLES};
pub use resampler::StreamResampler;
pub use ring_buffer::{SampleConsumer, SampleProducer, SampleRing};
pub use wav::{PlaybackMode, WavReplay};
