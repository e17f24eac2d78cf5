use crate::types::{VadEvent, VadState};

/// A trait for voice activity detection engines.
///
/// Callers feed full analysis windows at hop cadence; the engine owns all
/// segmentation state and reports boundary events.
pub trait VadEngine: Send {
    fn process(&mut self, frame: &[i16]) -> Result<Option<VadEvent>, String>;
    fn reset(&mut self);
    fn current_state(&self) -> VadState;
    fn required_sample_rate(&self) -> u32;
    fn required_frame_size_samples(&self) -> usize;
}
