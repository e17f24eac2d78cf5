//! First-order DC removal filter.
//!
//! `y[n] = x[n] - x[n-1] + alpha * y[n-1]`. Cheap electret capsules ride on
//! a bias offset that would otherwise leak into the energy gate and the
//! spectral features. State is kept in f32 so the pole stays accurate over
//! long runs.

const DEFAULT_ALPHA: f32 = 0.995;

#[derive(Debug, Clone)]
pub struct DcBlocker {
    alpha: f32,
    prev_input: f32,
    prev_output: f32,
}

impl Default for DcBlocker {
    fn default() -> Self {
        Self::with_alpha(DEFAULT_ALPHA)
    }
}

impl DcBlocker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alpha(alpha: f32) -> Self {
        Self {
            alpha,
            prev_input: 0.0,
            prev_output: 0.0,
        }
    }

    /// Filters the block in place.
    pub fn process(&mut self, samples: &mut [i16]) {
        for sample in samples {
            let x = *sample as f32;
            let y = x - self.prev_input + self.alpha * self.prev_output;
            self.prev_input = x;
            self.prev_output = y;
            *sample = y.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        }
    }

    pub fn reset(&mut self) {
        self.prev_input = 0.0;
        self.prev_output = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_offset_decays_to_zero() {
        let mut filter = DcBlocker::new();
        let mut samples = vec![1000i16; 3000];
        filter.process(&mut samples);

        // The offset passes through at first, then the pole bleeds it off.
        assert_eq!(samples[0], 1000);
        assert!(samples[2999].abs() <= 1, "got {}", samples[2999]);
        assert!(samples[2900..].iter().all(|s| s.abs() <= 1));
    }

    #[test]
    fn ac_content_survives_with_offset_removed() {
        let mut filter = DcBlocker::new();
        // 500 DC plus a full-rate alternation of +-1000.
        let mut samples: Vec<i16> = (0..4000)
            .map(|i| if i % 2 == 0 { 1500 } else { -500 })
            .collect();
        filter.process(&mut samples);

        let tail = &samples[3800..];
        let mean: f64 = tail.iter().map(|&s| s as f64).sum::<f64>() / tail.len() as f64;
        assert!(mean.abs() < 5.0, "residual offset {}", mean);

        let peak = tail.iter().map(|&s| s.abs()).max().unwrap();
        assert!(peak >= 950, "alternation attenuated to {}", peak);
    }

    #[test]
    fn reset_clears_filter_state() {
        let mut filter = DcBlocker::new();
        let mut warmup = vec![5000i16; 100];
        filter.process(&mut warmup);
        filter.reset();

        let mut samples = vec![1000i16; 1];
        filter.process(&mut samples);
        assert_eq!(samples[0], 1000);
    }
}
