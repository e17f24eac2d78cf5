//! Tokio tasks that form the recognition pipeline.
//!
//! Hops flow segmenter -> recognizer -> parser -> emitter. The segmenter
//! and recognizer sit on lossy broadcast channels sized for real-time
//! audio; the low-rate stages behind them use bounded mpsc channels.

pub mod emitter;
pub mod kws_stage;
pub mod parser_stage;
pub mod segmenter;

pub use emitter::CommandEmitter;
pub use kws_stage::KwsStage;
pub use parser_stage::ParserStage;
pub use segmenter::{SpeechSegmenter, UtteranceAudio};
