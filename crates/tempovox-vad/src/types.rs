#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadState {
    Silence,
    Speech,
}

/// Events produced by the frame-level detector.
///
/// Frame indices are analysis-window positions on the hop grid: window `i`
/// covers samples `[i * hop, i * hop + frame_size)`. Timestamps derive from
/// the frame index, not the wall clock, so replayed audio is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub enum VadEvent {
    SpeechStart {
        timestamp_ms: u64,
        rms: f32,
    },
    SpeechEnd {
        timestamp_ms: u64,
        /// First frame of the segment, pre-roll margin included.
        start_frame: u64,
        /// Last frame of the segment (inclusive), hangover tail included.
        end_frame: u64,
        /// Span of frames that passed the gate, without the padding margins.
        voiced_frames: u32,
        rms: f32,
    },
    /// Speech ended but the voiced span was below the minimum frame count.
    SpeechDiscarded {
        timestamp_ms: u64,
        voiced_frames: u32,
    },
}

#[derive(Debug, Clone, Default)]
pub struct VadMetrics {
    pub frames_processed: u64,
    pub speech_segments: u64,
    pub segments_too_short: u64,
    pub total_speech_ms: u64,
    pub total_silence_ms: u64,
    pub last_rms: f32,
    pub last_zcr: f32,
    pub current_noise_floor: f32,
}
