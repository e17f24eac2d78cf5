use crate::config::VadConfig;
use crate::types::{VadEvent, VadState};

pub struct VadStateMachine {
    state: VadState,

    energetic_frames: u32,

    quiet_frames: u32,

    onset_frames: u32,

    hangover_frames: u32,

    min_utterance_frames: u32,

    preroll_frames: u32,

    /// First frame of the current energetic run (candidate onset).
    run_start_frame: u64,

    /// First frame that passed the gate in the current utterance.
    first_voiced_frame: u64,

    /// Most recent frame that passed the gate.
    last_voiced_frame: u64,

    frames_since_start: u64,

    hop_duration_ms: f32,
}

impl VadStateMachine {
    pub fn new(config: &VadConfig) -> Self {
        Self {
            state: VadState::Silence,
            energetic_frames: 0,
            quiet_frames: 0,
            onset_frames: config.onset_frames.max(1),
            hangover_frames: config.hangover_frames.max(1),
            min_utterance_frames: config.min_utterance_frames,
            preroll_frames: config.preroll_frames,
            run_start_frame: 0,
            first_voiced_frame: 0,
            last_voiced_frame: 0,
            frames_since_start: 0,
            hop_duration_ms: config.hop_duration_ms(),
        }
    }

    /// Advances the machine by one analysis frame. `is_voiced` is the
    /// combined energy + zero-crossing gate decision for that frame.
    pub fn process(&mut self, is_voiced: bool, rms: f32) -> Option<VadEvent> {
        let frame = self.frames_since_start;
        self.frames_since_start += 1;

        match self.state {
            VadState::Silence => {
                if is_voiced {
                    if self.energetic_frames == 0 {
                        self.run_start_frame = frame;
                    }
                    self.energetic_frames += 1;
                    self.quiet_frames = 0;

                    if self.energetic_frames >= self.onset_frames {
                        self.state = VadState::Speech;
                        self.first_voiced_frame = self.run_start_frame;
                        self.last_voiced_frame = frame;
                        self.energetic_frames = 0;

                        return Some(VadEvent::SpeechStart {
                            timestamp_ms: self.frame_timestamp_ms(self.run_start_frame),
                            rms,
                        });
                    }
                } else {
                    self.energetic_frames = 0;
                }
            }

            VadState::Speech => {
                if is_voiced {
                    self.last_voiced_frame = frame;
                    self.quiet_frames = 0;
                } else {
                    self.quiet_frames += 1;

                    if self.quiet_frames >= self.hangover_frames {
                        self.state = VadState::Silence;
                        self.quiet_frames = 0;
                        return Some(self.finish_segment(frame, rms));
                    }
                }
            }
        }

        None
    }

    fn finish_segment(&mut self, end_frame: u64, rms: f32) -> VadEvent {
        let voiced_frames = (self.last_voiced_frame - self.first_voiced_frame + 1) as u32;
        let timestamp_ms = self.frame_timestamp_ms(end_frame);

        if voiced_frames < self.min_utterance_frames {
            return VadEvent::SpeechDiscarded {
                timestamp_ms,
                voiced_frames,
            };
        }

        let start_frame = self
            .first_voiced_frame
            .saturating_sub(self.preroll_frames as u64);

        VadEvent::SpeechEnd {
            timestamp_ms,
            start_frame,
            end_frame,
            voiced_frames,
            rms,
        }
    }

    /// Flushes an in-progress utterance, e.g. at end of input.
    pub fn force_end(&mut self, rms: f32) -> Option<VadEvent> {
        if self.state == VadState::Speech {
            self.state = VadState::Silence;
            self.quiet_frames = 0;
            self.energetic_frames = 0;
            let end = self.frames_since_start.saturating_sub(1);
            return Some(self.finish_segment(end, rms));
        }
        None
    }

    pub fn current_state(&self) -> VadState {
        self.state
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_since_start
    }

    pub fn reset(&mut self) {
        self.state = VadState::Silence;
        self.energetic_frames = 0;
        self.quiet_frames = 0;
        self.run_start_frame = 0;
        self.first_voiced_frame = 0;
        self.last_voiced_frame = 0;
        self.frames_since_start = 0;
    }

    fn frame_timestamp_ms(&self, frame: u64) -> u64 {
        (frame as f32 * self.hop_duration_ms) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> VadConfig {
        VadConfig {
            onset_frames: 2,
            hangover_frames: 8,
            min_utterance_frames: 15,
            preroll_frames: 5,
            ..Default::default()
        }
    }

    fn drive(machine: &mut VadStateMachine, voiced: &[bool]) -> Vec<VadEvent> {
        voiced
            .iter()
            .filter_map(|&v| machine.process(v, if v { 3000.0 } else { 50.0 }))
            .collect()
    }

    #[test]
    fn test_initial_state_is_silence() {
        let machine = VadStateMachine::new(&config());
        assert_eq!(machine.current_state(), VadState::Silence);
    }

    #[test]
    fn test_single_voiced_frame_does_not_trigger() {
        let mut machine = VadStateMachine::new(&config());
        let events = drive(&mut machine, &[false, true, false, false]);
        assert!(events.is_empty());
        assert_eq!(machine.current_state(), VadState::Silence);
    }

    #[test]
    fn test_onset_fires_on_second_consecutive_frame() {
        let mut machine = VadStateMachine::new(&config());
        assert!(machine.process(true, 3000.0).is_none());
        let event = machine.process(true, 3000.0).expect("onset event");
        match event {
            VadEvent::SpeechStart { timestamp_ms, .. } => {
                // Onset is reported at the first frame of the run (frame 0)
                assert_eq!(timestamp_ms, 0);
            }
            other => panic!("expected SpeechStart, got {:?}", other),
        }
        assert_eq!(machine.current_state(), VadState::Speech);
    }

    #[test]
    fn test_segment_bounds_include_margins() {
        let mut machine = VadStateMachine::new(&config());

        // 10 quiet frames, 20 voiced frames, then quiet until hangover expires
        let mut pattern = vec![false; 10];
        pattern.extend(vec![true; 20]);
        pattern.extend(vec![false; 10]);

        let events = drive(&mut machine, &pattern);
        assert_eq!(events.len(), 2);

        match &events[1] {
            VadEvent::SpeechEnd {
                start_frame,
                end_frame,
                voiced_frames,
                ..
            } => {
                // Voiced run spans frames 10..=29; preroll 5 pulls start to 5
                assert_eq!(*start_frame, 5);
                // Hangover of 8 quiet frames ends the segment at frame 37
                assert_eq!(*end_frame, 37);
                assert_eq!(*voiced_frames, 20);
            }
            other => panic!("expected SpeechEnd, got {:?}", other),
        }
        assert_eq!(machine.current_state(), VadState::Silence);
    }

    #[test]
    fn test_preroll_clamps_at_stream_start() {
        let mut machine = VadStateMachine::new(&config());

        let mut pattern = vec![true; 20];
        pattern.extend(vec![false; 10]);

        let events = drive(&mut machine, &pattern);
        match &events[1] {
            VadEvent::SpeechEnd { start_frame, .. } => assert_eq!(*start_frame, 0),
            other => panic!("expected SpeechEnd, got {:?}", other),
        }
    }

    #[test]
    fn test_short_burst_is_discarded() {
        let mut machine = VadStateMachine::new(&config());

        let mut pattern = vec![true; 5];
        pattern.extend(vec![false; 10]);

        let events = drive(&mut machine, &pattern);
        assert_eq!(events.len(), 2);
        match &events[1] {
            VadEvent::SpeechDiscarded { voiced_frames, .. } => assert_eq!(*voiced_frames, 5),
            other => panic!("expected SpeechDiscarded, got {:?}", other),
        }
    }

    #[test]
    fn test_brief_dropout_does_not_split_segment() {
        let mut machine = VadStateMachine::new(&config());

        let mut pattern = vec![true; 10];
        pattern.extend(vec![false; 4]); // shorter than hangover
        pattern.extend(vec![true; 10]);
        pattern.extend(vec![false; 10]);

        let events = drive(&mut machine, &pattern);
        assert_eq!(events.len(), 2);
        match &events[1] {
            VadEvent::SpeechEnd { voiced_frames, .. } => {
                // Span counts from first to last voiced frame, dropout included
                assert_eq!(*voiced_frames, 24);
            }
            other => panic!("expected SpeechEnd, got {:?}", other),
        }
    }

    #[test]
    fn test_force_end_flushes_active_speech() {
        let mut machine = VadStateMachine::new(&config());
        for _ in 0..20 {
            machine.process(true, 3000.0);
        }
        assert_eq!(machine.current_state(), VadState::Speech);

        let event = machine.force_end(50.0).expect("flush event");
        assert!(matches!(event, VadEvent::SpeechEnd { .. }));
        assert_eq!(machine.current_state(), VadState::Silence);
        assert!(machine.force_end(50.0).is_none());
    }

    #[test]
    fn test_reset_clears_counters() {
        let mut machine = VadStateMachine::new(&config());
        for _ in 0..20 {
            machine.process(true, 3000.0);
        }
        machine.reset();
        assert_eq!(machine.current_state(), VadState::Silence);
        assert_eq!(machine.frames_processed(), 0);
    }
}
