use crate::config::VadConfig;

/// Adaptive noise floor on the raw RMS scale.
///
/// Two smoothing rates: fast tracking while the signal is below threshold,
/// slow while speech is active so a sustained utterance cannot drag the
/// floor up and clip its own tail.
pub struct AdaptiveThreshold {
    floor: f32,
    min_floor: f32,
    multiplier: f32,
    idle_alpha: f32,
    active_alpha: f32,
}

impl AdaptiveThreshold {
    pub fn new(config: &VadConfig) -> Self {
        Self {
            floor: config.initial_floor_rms.max(config.min_floor_rms),
            min_floor: config.min_floor_rms,
            multiplier: config.floor_multiplier,
            idle_alpha: config.idle_alpha,
            active_alpha: config.active_alpha,
        }
    }

    pub fn current_floor(&self) -> f32 {
        self.floor
    }

    pub fn activation_threshold(&self) -> f32 {
        self.floor * self.multiplier
    }

    pub fn is_energetic(&self, rms: f32) -> bool {
        rms > self.activation_threshold()
    }

    pub fn update(&mut self, rms: f32, speech_active: bool) {
        let alpha = if speech_active {
            self.active_alpha
        } else {
            self.idle_alpha
        };
        self.floor = ((1.0 - alpha) * self.floor + alpha * rms).max(self.min_floor);
    }

    pub fn reset(&mut self, floor: f32) {
        self.floor = floor.max(self.min_floor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> VadConfig {
        VadConfig {
            initial_floor_rms: 500.0,
            min_floor_rms: 120.0,
            floor_multiplier: 1.8,
            idle_alpha: 0.05,
            active_alpha: 0.005,
            ..Default::default()
        }
    }

    #[test]
    fn test_initial_threshold_from_config() {
        let t = AdaptiveThreshold::new(&config());
        assert_eq!(t.current_floor(), 500.0);
        assert!((t.activation_threshold() - 900.0).abs() < 1e-3);
    }

    #[test]
    fn test_idle_adaptation_is_fast() {
        let mut t = AdaptiveThreshold::new(&config());
        t.update(700.0, false);
        // (1 - 0.05) * 500 + 0.05 * 700 = 510
        assert!((t.current_floor() - 510.0).abs() < 1e-3);
    }

    #[test]
    fn test_active_adaptation_is_slow() {
        let mut t = AdaptiveThreshold::new(&config());
        t.update(5000.0, true);
        // (1 - 0.005) * 500 + 0.005 * 5000 = 522.5
        assert!((t.current_floor() - 522.5).abs() < 1e-3);
    }

    #[test]
    fn test_floor_never_drops_below_minimum() {
        let mut t = AdaptiveThreshold::new(&config());
        for _ in 0..500 {
            t.update(0.0, false);
        }
        assert_eq!(t.current_floor(), 120.0);
    }

    #[test]
    fn test_energetic_gate() {
        let t = AdaptiveThreshold::new(&config());
        assert!(t.is_energetic(901.0));
        assert!(!t.is_energetic(899.0));
    }

    #[test]
    fn test_reset_respects_minimum() {
        let mut t = AdaptiveThreshold::new(&config());
        t.reset(10.0);
        assert_eq!(t.current_floor(), 120.0);
        t.reset(800.0);
        assert_eq!(t.current_floor(), 800.0);
    }
}
