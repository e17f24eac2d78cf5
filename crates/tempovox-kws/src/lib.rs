//! Keyword spotting for the TempoVox voice timer.
//!
//! Utterances come in as 16 kHz mono samples; what comes out is either a
//! recognized vocabulary word or a rejection. Recognition is template based:
//! Goertzel band energies with CMVN, compared against enrolled exemplars by
//! banded DTW, gated by a distance threshold and a best-to-runner-up margin.

pub mod constants;
pub mod dtw;
pub mod engine;
pub mod error;
pub mod features;
pub mod matcher;
pub mod template;

// Core exports - grouped and sorted alphabetically
pub use constants::{
    DEFAULT_DTW_BAND, FMAX_HZ, FMIN_HZ, FRAME_SIZE_SAMPLES, HOP_SIZE_SAMPLES,
    MAX_TEMPLATES_PER_TOKEN, MAX_TEMPLATE_FRAMES, NUM_BINS, SAMPLE_RATE_HZ,
};
pub use dtw::Dtw;
pub use engine::{KwsConfig, KwsEngine, KwsEvent, Recognition};
pub use error::KwsError;
pub use features::{cmvn, FeatureExtractor, FeatureFrame, GoertzelBank};
pub use matcher::{evaluate, MatchConfig, MatchOutcome, TemplateMatcher};
pub use template::{Template, TemplateBank};
