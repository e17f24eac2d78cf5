//! Audio timing constants for the detection pipeline

/// Standard sample rate for all detection processing (Hz)
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// Analysis window length in samples
/// At 16kHz, 400 samples = 25ms windows
pub const FRAME_SIZE_SAMPLES: usize = 400;

/// Hop between consecutive analysis windows in samples
/// At 16kHz, 160 samples = 10ms hops
pub const HOP_SIZE_SAMPLES: usize = 160;

/// Standard number of channels for mono audio processing
pub const CHANNELS_MONO: u16 = 1;

/// Analysis window duration in milliseconds (derived constant)
pub const FRAME_DURATION_MS: f32 = (FRAME_SIZE_SAMPLES as f32 * 1000.0) / SAMPLE_RATE_HZ as f32;

/// Hop duration in milliseconds (derived constant)
pub const HOP_DURATION_MS: f32 = (HOP_SIZE_SAMPLES as f32 * 1000.0) / SAMPLE_RATE_HZ as f32;
