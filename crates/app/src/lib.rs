//! TempoVox voice timer application.
//!
//! Wires the capture, segmentation, recognition, and grammar crates into a
//! running pipeline, and carries the console-facing pieces: stdin control,
//! the timer actuator, and the offline bank builder.

pub mod config;
pub mod control;
pub mod make_bank;
pub mod pipeline;
pub mod runtime;
pub mod timers;

pub use config::AppConfig;
pub use runtime::{start, AppHandle, AppRuntimeOptions, AudioSourceConfig};
