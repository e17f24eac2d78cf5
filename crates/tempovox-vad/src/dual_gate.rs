use crate::{
    config::VadConfig,
    energy::EnergyCalculator,
    engine::VadEngine,
    state::VadStateMachine,
    threshold::AdaptiveThreshold,
    types::{VadEvent, VadMetrics, VadState},
};

/// Energy plus zero-crossing detector with an adaptive noise floor.
///
/// A frame is voiced only when RMS clears `floor * multiplier` AND the
/// zero-crossing rate clears `min_zcr`. The second gate keeps compressor hum
/// and door thumps from opening segments in a kitchen.
pub struct DualGateVad {
    config: VadConfig,
    energy_calc: EnergyCalculator,
    threshold: AdaptiveThreshold,
    state_machine: VadStateMachine,
    metrics: VadMetrics,
}

impl DualGateVad {
    pub fn new(config: VadConfig) -> Self {
        Self {
            threshold: AdaptiveThreshold::new(&config),
            state_machine: VadStateMachine::new(&config),
            energy_calc: EnergyCalculator::new(),
            metrics: VadMetrics::default(),
            config,
        }
    }

    pub fn builder() -> DualGateVadBuilder {
        DualGateVadBuilder::new()
    }

    pub fn metrics(&self) -> &VadMetrics {
        &self.metrics
    }

    pub fn noise_floor(&self) -> f32 {
        self.threshold.current_floor()
    }

    /// Flushes an in-progress utterance at end of input.
    pub fn finish(&mut self) -> Option<VadEvent> {
        let event = self.state_machine.force_end(self.metrics.last_rms);
        if let Some(ref e) = event {
            self.count_segment(e);
        }
        event
    }

    fn count_segment(&mut self, event: &VadEvent) {
        match event {
            VadEvent::SpeechEnd { .. } => self.metrics.speech_segments += 1,
            VadEvent::SpeechDiscarded { .. } => self.metrics.segments_too_short += 1,
            VadEvent::SpeechStart { .. } => {}
        }
    }

    fn update_metrics(&mut self, rms: f32, zcr: f32) {
        self.metrics.frames_processed += 1;
        self.metrics.last_rms = rms;
        self.metrics.last_zcr = zcr;
        self.metrics.current_noise_floor = self.threshold.current_floor();

        let hop_ms = self.config.hop_duration_ms() as u64;
        match self.state_machine.current_state() {
            VadState::Speech => self.metrics.total_speech_ms += hop_ms,
            VadState::Silence => self.metrics.total_silence_ms += hop_ms,
        }
    }
}

impl VadEngine for DualGateVad {
    fn process(&mut self, frame: &[i16]) -> Result<Option<VadEvent>, String> {
        if frame.len() != self.config.frame_size_samples {
            return Err(format!(
                "Expected {} samples, got {}",
                self.config.frame_size_samples,
                frame.len()
            ));
        }

        let rms = self.energy_calc.calculate_rms(frame);
        let zcr = self.energy_calc.zero_crossing_rate(frame);

        let energetic = self.threshold.is_energetic(rms);
        let is_voiced = energetic && zcr > self.config.min_zcr;

        // Slow adaptation whenever the signal is over threshold, so a ringing
        // alarm or sustained speech cannot drag the floor up under itself.
        self.threshold.update(rms, energetic);

        let event = self.state_machine.process(is_voiced, rms);
        if let Some(ref e) = event {
            self.count_segment(e);
        }

        self.update_metrics(rms, zcr);

        Ok(event)
    }

    fn reset(&mut self) {
        self.state_machine.reset();
        self.threshold.reset(self.config.initial_floor_rms);
        self.metrics = VadMetrics::default();
    }

    fn current_state(&self) -> VadState {
        self.state_machine.current_state()
    }

    fn required_sample_rate(&self) -> u32 {
        self.config.sample_rate_hz
    }

    fn required_frame_size_samples(&self) -> usize {
        self.config.frame_size_samples
    }
}

pub struct DualGateVadBuilder {
    config: VadConfig,
}

impl DualGateVadBuilder {
    pub fn new() -> Self {
        Self {
            config: VadConfig::default(),
        }
    }

    pub fn initial_floor_rms(mut self, rms: f32) -> Self {
        self.config.initial_floor_rms = rms;
        self
    }

    pub fn floor_multiplier(mut self, multiplier: f32) -> Self {
        self.config.floor_multiplier = multiplier;
        self
    }

    pub fn min_zcr(mut self, zcr: f32) -> Self {
        self.config.min_zcr = zcr;
        self
    }

    pub fn onset_frames(mut self, frames: u32) -> Self {
        self.config.onset_frames = frames;
        self
    }

    pub fn hangover_frames(mut self, frames: u32) -> Self {
        self.config.hangover_frames = frames;
        self
    }

    pub fn min_utterance_frames(mut self, frames: u32) -> Self {
        self.config.min_utterance_frames = frames;
        self
    }

    pub fn preroll_frames(mut self, frames: u32) -> Self {
        self.config.preroll_frames = frames;
        self
    }

    pub fn build(self) -> DualGateVad {
        DualGateVad::new(self.config)
    }
}

impl Default for DualGateVadBuilder {
    fn default() -> Self {
        Self::new()
    }
}
