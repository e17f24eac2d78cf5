//! Goertzel filterbank features.
//!
//! Each 25 ms frame is DC-removed, Hann-windowed, and measured by 24
//! Goertzel filters whose centers are log-spaced from 300 Hz to 4 kHz. The
//! log band energies are then mean/variance normalized across the utterance.

use std::f32::consts::PI;

use crate::constants::{
    FMAX_HZ, FMIN_HZ, FRAME_SIZE_SAMPLES, HOP_SIZE_SAMPLES, LOG_FLOOR, MAX_TEMPLATE_FRAMES,
    NUM_BINS, SAMPLE_RATE_HZ,
};

/// One frame of log band energies.
pub type FeatureFrame = [f32; NUM_BINS];

/// Precomputed Goertzel coefficients and analysis window.
pub struct GoertzelBank {
    coefficients: [f32; NUM_BINS],
    centers_hz: [f32; NUM_BINS],
    window: Vec<f32>,
    scratch: Vec<f32>,
    frame_size: usize,
}

impl GoertzelBank {
    pub fn new(frame_size: usize, sample_rate: u32) -> Self {
        let mut coefficients = [0.0f32; NUM_BINS];
        let mut centers_hz = [0.0f32; NUM_BINS];
        let ratio = FMAX_HZ / FMIN_HZ;
        for band in 0..NUM_BINS {
            let t = band as f32 / (NUM_BINS - 1) as f32;
            let freq = FMIN_HZ * ratio.powf(t);
            let k = frame_size as f32 * freq / sample_rate as f32;
            centers_hz[band] = freq;
            coefficients[band] = 2.0 * (2.0 * PI * k / frame_size as f32).cos();
        }

        let window = (0..frame_size)
            .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f32 / (frame_size - 1) as f32).cos())
            .collect();

        Self {
            coefficients,
            centers_hz,
            window,
            scratch: vec![0.0; frame_size],
            frame_size,
        }
    }

    /// Center frequency of a band in Hz.
    pub fn center_frequency_hz(&self, band: usize) -> f32 {
        self.centers_hz[band]
    }

    /// Log band energies for one analysis frame.
    ///
    /// `frame` must be exactly the configured frame size.
    pub fn analyze(&mut self, frame: &[i16]) -> FeatureFrame {
        debug_assert_eq!(frame.len(), self.frame_size);

        // Exact integer sum keeps the DC estimate stable.
        let sum: i64 = frame.iter().map(|&s| s as i64).sum();
        let mean = sum as f64 / frame.len() as f64;
        for (dst, (&sample, &win)) in self
            .scratch
            .iter_mut()
            .zip(frame.iter().zip(self.window.iter()))
        {
            *dst = (sample as f64 - mean) as f32 * win;
        }

        let mut out = [0.0f32; NUM_BINS];
        for (band, value) in out.iter_mut().enumerate() {
            let coeff = self.coefficients[band];
            let mut s_prev = 0.0f32;
            let mut s_prev2 = 0.0f32;
            for &x in &self.scratch {
                let s = x + coeff * s_prev - s_prev2;
                s_prev2 = s_prev;
                s_prev = s;
            }
            let power = s_prev2 * s_prev2 + s_prev * s_prev - coeff * s_prev * s_prev2;
            *value = (LOG_FLOOR + power.max(0.0)).ln();
        }
        out
    }
}

/// Turns raw utterance audio into a normalized feature sequence.
pub struct FeatureExtractor {
    bank: GoertzelBank,
    frame_size: usize,
    hop_size: usize,
    max_frames: usize,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self {
            bank: GoertzelBank::new(FRAME_SIZE_SAMPLES, SAMPLE_RATE_HZ),
            frame_size: FRAME_SIZE_SAMPLES,
            hop_size: HOP_SIZE_SAMPLES,
            max_frames: MAX_TEMPLATE_FRAMES,
        }
    }

    /// Frames the utterance at the hop, truncates to the template length
    /// cap, and applies CMVN across the whole sequence.
    pub fn extract(&mut self, samples: &[i16]) -> Vec<FeatureFrame> {
        let mut frames = Vec::new();
        let mut start = 0;
        while start + self.frame_size <= samples.len() && frames.len() < self.max_frames {
            frames.push(self.bank.analyze(&samples[start..start + self.frame_size]));
            start += self.hop_size;
        }
        cmvn(&mut frames);
        frames
    }

    pub fn bank(&self) -> &GoertzelBank {
        &self.bank
    }
}

/// Per-band mean and variance normalization across a sequence.
///
/// Uses the sample standard deviation; bands with no spread are only
/// centered. Normalizing an already normalized sequence leaves it unchanged
/// up to float rounding.
pub fn cmvn(frames: &mut [FeatureFrame]) {
    let t = frames.len();
    if t == 0 {
        return;
    }
    for band in 0..NUM_BINS {
        let mean = frames.iter().map(|f| f[band]).sum::<f32>() / t as f32;
        let var = if t > 1 {
            frames
                .iter()
                .map(|f| {
                    let d = f[band] - mean;
                    d * d
                })
                .sum::<f32>()
                / (t - 1) as f32
        } else {
            0.0
        };
        let mut std = var.sqrt();
        if std < 1e-6 {
            std = 1.0;
        }
        for frame in frames.iter_mut() {
            frame[band] = (frame[band] - mean) / std;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq_hz: f32, amplitude: f32, samples: usize) -> Vec<i16> {
        (0..samples)
            .map(|n| {
                let phase = 2.0 * PI * freq_hz * n as f32 / SAMPLE_RATE_HZ as f32;
                (phase.sin() * amplitude) as i16
            })
            .collect()
    }

    fn argmax(frame: &FeatureFrame) -> usize {
        frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap()
    }

    #[test]
    fn tone_at_a_band_center_peaks_there() {
        let mut bank = GoertzelBank::new(FRAME_SIZE_SAMPLES, SAMPLE_RATE_HZ);
        let center = bank.center_frequency_hz(12);
        let frame = tone(center, 8000.0, FRAME_SIZE_SAMPLES);
        let features = bank.analyze(&frame);
        assert_eq!(argmax(&features), 12, "center {center} Hz");
    }

    #[test]
    fn low_and_high_tones_land_at_opposite_ends() {
        let mut bank = GoertzelBank::new(FRAME_SIZE_SAMPLES, SAMPLE_RATE_HZ);
        let low = bank.analyze(&tone(350.0, 8000.0, FRAME_SIZE_SAMPLES));
        let high = bank.analyze(&tone(3500.0, 8000.0, FRAME_SIZE_SAMPLES));
        assert!(argmax(&low) <= 3, "got band {}", argmax(&low));
        assert!(argmax(&high) >= 20, "got band {}", argmax(&high));
    }

    #[test]
    fn constant_frame_reduces_to_the_log_floor() {
        let mut bank = GoertzelBank::new(FRAME_SIZE_SAMPLES, SAMPLE_RATE_HZ);
        let frame = vec![5000i16; FRAME_SIZE_SAMPLES];
        let features = bank.analyze(&frame);
        let floor = LOG_FLOOR.ln();
        for (band, &value) in features.iter().enumerate() {
            assert!(
                (value - floor).abs() < 1e-3,
                "band {band} saw energy in DC: {value}"
            );
        }
    }

    #[test]
    fn band_centers_are_log_spaced() {
        let bank = GoertzelBank::new(FRAME_SIZE_SAMPLES, SAMPLE_RATE_HZ);
        assert!((bank.center_frequency_hz(0) - FMIN_HZ).abs() < 0.5);
        assert!((bank.center_frequency_hz(NUM_BINS - 1) - FMAX_HZ).abs() < 0.5);
        let r1 = bank.center_frequency_hz(1) / bank.center_frequency_hz(0);
        let r2 = bank.center_frequency_hz(13) / bank.center_frequency_hz(12);
        assert!((r1 - r2).abs() < 1e-3, "ratios {r1} vs {r2}");
    }

    #[test]
    fn extract_frames_at_the_hop() {
        let mut extractor = FeatureExtractor::new();
        assert_eq!(extractor.extract(&vec![0; 399]).len(), 0);
        assert_eq!(extractor.extract(&vec![0; 400]).len(), 1);
        assert_eq!(extractor.extract(&vec![0; 400 + 160]).len(), 2);
        assert_eq!(extractor.extract(&vec![0; 400 + 159]).len(), 1);
    }

    #[test]
    fn extract_truncates_to_the_cap() {
        let mut extractor = FeatureExtractor::new();
        // Enough audio for 125 hops; only the first 120 survive.
        let samples = tone(700.0, 4000.0, 124 * HOP_SIZE_SAMPLES + FRAME_SIZE_SAMPLES);
        assert_eq!(extractor.extract(&samples).len(), MAX_TEMPLATE_FRAMES);
    }

    #[test]
    fn cmvn_centers_and_scales_each_band() {
        let mut frames: Vec<FeatureFrame> = (0..10)
            .map(|i| {
                let mut f = [0.0f32; NUM_BINS];
                for (b, v) in f.iter_mut().enumerate() {
                    *v = (i * (b + 1)) as f32;
                }
                f
            })
            .collect();
        cmvn(&mut frames);

        for band in 0..NUM_BINS {
            let mean = frames.iter().map(|f| f[band]).sum::<f32>() / frames.len() as f32;
            let var = frames
                .iter()
                .map(|f| (f[band] - mean).powi(2))
                .sum::<f32>()
                / (frames.len() - 1) as f32;
            assert!(mean.abs() < 1e-4, "band {band} mean {mean}");
            assert!((var - 1.0).abs() < 1e-3, "band {band} var {var}");
        }
    }

    #[test]
    fn cmvn_is_idempotent() {
        let mut frames: Vec<FeatureFrame> = (0..20)
            .map(|i| {
                let mut f = [0.0f32; NUM_BINS];
                for (b, v) in f.iter_mut().enumerate() {
                    *v = ((i as f32) * 0.37 + b as f32).sin() * 3.0 + b as f32;
                }
                f
            })
            .collect();
        cmvn(&mut frames);
        let once = frames.clone();
        cmvn(&mut frames);
        for (a, b) in once.iter().zip(frames.iter()) {
            for (x, y) in a.iter().zip(b.iter()) {
                assert!((x - y).abs() < 1e-4, "{x} vs {y}");
            }
        }
    }

    #[test]
    fn cmvn_flat_band_centers_without_scaling() {
        let mut frames: Vec<FeatureFrame> = vec![[7.5; NUM_BINS]; 6];
        cmvn(&mut frames);
        for frame in &frames {
            for &v in frame.iter() {
                assert_eq!(v, 0.0);
            }
        }
    }

    #[test]
    fn single_frame_normalizes_to_zero() {
        let mut frames = vec![[3.25f32; NUM_BINS]];
        cmvn(&mut frames);
        for &v in frames[0].iter() {
            assert_eq!(v, 0.0);
        }
    }
}
