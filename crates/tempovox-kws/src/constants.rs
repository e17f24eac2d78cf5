//! Feature extraction constants.
//!
//! The frame grid is duplicated from `tempovox-vad` on purpose: the two
//! crates stay decoupled, but templates enrolled on one grid only ever match
//! utterances framed on the same grid, so these values must agree with the
//! segmenter's.

/// Audio sample rate the analyzer expects.
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// Analysis window length in samples (25 ms).
pub const FRAME_SIZE_SAMPLES: usize = 400;

/// Analysis hop in samples (10 ms).
pub const HOP_SIZE_SAMPLES: usize = 160;

/// Number of log-spaced Goertzel bands per frame.
pub const NUM_BINS: usize = 24;

/// Lowest band center in Hz.
pub const FMIN_HZ: f32 = 300.0;

/// Highest band center in Hz.
pub const FMAX_HZ: f32 = 4000.0;

/// Longest feature sequence kept per utterance or template (1.2 s of hops).
pub const MAX_TEMPLATE_FRAMES: usize = 120;

/// Floor inside the log so silent bands stay finite.
pub const LOG_FLOOR: f32 = 1e-3;

/// Default Sakoe-Chiba band half-width for DTW, in frames.
pub const DEFAULT_DTW_BAND: usize = 10;

/// Template slots kept per vocabulary word.
pub const MAX_TEMPLATES_PER_TOKEN: usize = 3;
