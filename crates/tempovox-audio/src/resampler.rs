//! Streaming sinc resampler for mono i16 audio.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::warn;

use super::chunker::ResamplerQuality;

/// Wraps rubato's `SincFixedIn` with the buffering needed to accept
/// arbitrary-sized input chunks from the capture side.
pub struct StreamResampler {
    in_rate: u32,
    out_rate: u32,
    resampler: SincFixedIn<f32>,
    input_buffer: Vec<f32>,
    output_buffer: Vec<f32>,
    chunk_size: usize,
}

impl StreamResampler {
    pub fn new(in_rate: u32, out_rate: u32) -> Self {
        Self::new_with_quality(in_rate, out_rate, ResamplerQuality::Balanced)
    }

    pub fn new_with_quality(in_rate: u32, out_rate: u32, quality: ResamplerQuality) -> Self {
        // 512 input samples keeps conversion latency near one hop period at
        // common device rates.
        let chunk_size = 512;

        let sinc_params = match quality {
            ResamplerQuality::Fast => SincInterpolationParameters {
                sinc_len: 32,
                f_cutoff: 0.92,
                interpolation: SincInterpolationType::Linear,
                oversampling_factor: 64,
                window: WindowFunction::Blackman,
            },
            ResamplerQuality::Balanced => SincInterpolationParameters {
                sinc_len: 64,
                f_cutoff: 0.95,
                interpolation: SincInterpolationType::Cubic,
                oversampling_factor: 128,
                window: WindowFunction::Blackman2,
            },
            ResamplerQuality::Quality => SincInterpolationParameters {
                sinc_len: 128,
                f_cutoff: 0.97,
                interpolation: SincInterpolationType::Cubic,
                oversampling_factor: 256,
                window: WindowFunction::BlackmanHarris2,
            },
        };

        let resampler = SincFixedIn::<f32>::new(
            out_rate as f64 / in_rate as f64,
            2.0,
            sinc_params,
            chunk_size,
            1,
        )
        .expect("valid resampler parameters");

        Self {
            in_rate,
            out_rate,
            resampler,
            input_buffer: Vec::with_capacity(chunk_size * 2),
            output_buffer: Vec::new(),
            chunk_size,
        }
    }

    /// Feeds mono i16 samples in and returns whatever full output is ready.
    pub fn process(&mut self, input: &[i16]) -> Vec<i16> {
        if self.in_rate == self.out_rate {
            return input.to_vec();
        }

        self.input_buffer
            .extend(input.iter().map(|&s| s as f32 / 32768.0));

        while self.input_buffer.len() >= self.chunk_size {
            let chunk: Vec<f32> = self.input_buffer.drain(..self.chunk_size).collect();
            match self.resampler.process(&[chunk], None) {
                Ok(output) => {
                    if let Some(channel) = output.first() {
                        self.output_buffer.extend_from_slice(channel);
                    }
                }
                Err(e) => {
                    warn!("resampler error, dropping chunk: {e}");
                }
            }
        }

        let result = self
            .output_buffer
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16)
            .collect();
        self.output_buffer.clear();
        result
    }

    pub fn reset(&mut self) {
        self.input_buffer.clear();
        self.output_buffer.clear();
        self.resampler.reset();
    }

    pub fn input_rate(&self) -> u32 {
        self.in_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.out_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_at_equal_rates() {
        let mut rs = StreamResampler::new(16_000, 16_000);
        let input = vec![100i16, 200, 300, 400, 500];
        assert_eq!(rs.process(&input), input);
    }

    #[test]
    fn downsample_ratio_is_roughly_three_to_one() {
        let mut rs = StreamResampler::new(48_000, 16_000);
        let input: Vec<i16> = (0..4_800).map(|i| ((i % 200) as i16 - 100) * 50).collect();

        let mut output = Vec::new();
        for chunk in input.chunks(1_000) {
            output.extend(rs.process(chunk));
        }
        assert!(
            (1_400..=1_700).contains(&output.len()),
            "expected about 1600 samples, got {}",
            output.len()
        );
    }

    #[test]
    fn upsample_preserves_a_constant_level() {
        let mut rs = StreamResampler::new(16_000, 48_000);
        let input = vec![1000i16; 1_600];
        let output = rs.process(&input);

        assert!(
            (4_400..=5_000).contains(&output.len()),
            "expected about 4800 samples, got {}",
            output.len()
        );
        for &s in &output[50..output.len() - 50] {
            assert!((900..=1100).contains(&s), "sample {s} drifted");
        }
    }

    #[test]
    fn all_quality_presets_produce_output() {
        let input: Vec<i16> = (0..4_096).map(|i| ((i % 100) as i16) - 50).collect();
        for quality in [
            ResamplerQuality::Fast,
            ResamplerQuality::Balanced,
            ResamplerQuality::Quality,
        ] {
            let mut rs = StreamResampler::new_with_quality(44_100, 16_000, quality);
            let mut out = rs.process(&input);
            out.extend(rs.process(&input));
            assert!(!out.is_empty());
        }
    }
}
