pub struct EnergyCalculator;

impl EnergyCalculator {
    pub fn new() -> Self {
        Self
    }

    /// RMS on the raw i16 amplitude scale (0..32768). The detector thresholds
    /// are raw amplitudes, so no full-scale normalization is applied.
    pub fn calculate_rms(&self, frame: &[i16]) -> f32 {
        if frame.is_empty() {
            return 0.0;
        }

        let sum_squares: i64 = frame
            .iter()
            .map(|&sample| {
                let s = sample as i64;
                s * s
            })
            .sum();

        let mean_square = sum_squares as f64 / frame.len() as f64;
        mean_square.sqrt() as f32
    }

    /// Number of sign changes between consecutive samples.
    pub fn zero_crossings(&self, frame: &[i16]) -> usize {
        frame
            .windows(2)
            .filter(|pair| (pair[0] >= 0) != (pair[1] >= 0))
            .count()
    }

    /// Zero crossings per sample, in 0..1.
    pub fn zero_crossing_rate(&self, frame: &[i16]) -> f32 {
        if frame.len() < 2 {
            return 0.0;
        }
        self.zero_crossings(frame) as f32 / frame.len() as f32
    }
}

impl Default for EnergyCalculator {
    fn default() -> Self {
        Self::new()
    }
}
