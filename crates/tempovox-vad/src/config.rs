use serde::{Deserialize, Serialize};

use super::constants::{FRAME_SIZE_SAMPLES, HOP_SIZE_SAMPLES, SAMPLE_RATE_HZ};

/// Tuning for the dual-gate (RMS + zero-crossing) detector.
///
/// RMS quantities are on the raw i16 amplitude scale (0..32768), matching the
/// thresholds the appliance firmware was tuned with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    pub frame_size_samples: usize,
    pub hop_size_samples: usize,
    pub sample_rate_hz: u32,

    /// Noise floor estimate at startup, raw RMS units.
    pub initial_floor_rms: f32,
    /// Lower clamp for the adapted floor.
    pub min_floor_rms: f32,
    /// A frame is energetic when `rms > floor * multiplier`.
    pub floor_multiplier: f32,
    /// EMA weight applied to the floor while no speech is active (fast).
    pub idle_alpha: f32,
    /// EMA weight applied while speech is active (slow).
    pub active_alpha: f32,

    /// Minimum zero-crossing rate (crossings per sample) for a speech frame.
    /// Guards against low-frequency rumble passing the energy gate alone.
    pub min_zcr: f32,

    /// Consecutive energetic frames required before onset fires.
    pub onset_frames: u32,
    /// Consecutive quiet frames that terminate a segment.
    pub hangover_frames: u32,
    /// Voiced spans shorter than this are discarded.
    pub min_utterance_frames: u32,
    /// Frames of margin prepended before the detected onset.
    pub preroll_frames: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            frame_size_samples: FRAME_SIZE_SAMPLES,
            hop_size_samples: HOP_SIZE_SAMPLES,
            sample_rate_hz: SAMPLE_RATE_HZ,
            // 500 * 1.8 puts the initial activation threshold at 900 raw RMS,
            // the level the firmware shipped with.
            initial_floor_rms: 500.0,
            min_floor_rms: 120.0,
            floor_multiplier: 1.8,
            idle_alpha: 0.05,
            active_alpha: 0.005,
            min_zcr: 0.02,
            onset_frames: 2,
            hangover_frames: 8,
            min_utterance_frames: 15,
            preroll_frames: 5,
        }
    }
}

impl VadConfig {
    pub fn hop_duration_ms(&self) -> f32 {
        (self.hop_size_samples as f32 * 1000.0) / self.sample_rate_hz as f32
    }

    pub fn frame_duration_ms(&self) -> f32 {
        (self.frame_size_samples as f32 * 1000.0) / self.sample_rate_hz as f32
    }
}
