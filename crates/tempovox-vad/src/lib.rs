pub mod config;
pub mod constants;
pub mod dual_gate;
pub mod energy;
pub mod engine;
pub mod state;
pub mod threshold;
pub mod types;

// Core exports - grouped and sorted alphabetically
pub use config::VadConfig;
pub use constants::{
    FRAME_DURATION_MS, FRAME_SIZE_SAMPLES, HOP_DURATION_MS, HOP_SIZE_SAMPLES, SAMPLE_RATE_HZ,
};
pub use dual_gate::DualGateVad;
pub use engine::VadEngine;
pub use types::{VadEvent, VadMetrics, VadState};
