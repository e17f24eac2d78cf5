//! Token grammar for the TempoVox voice timer.
//!
//! The matcher reports one vocabulary word per utterance; this crate holds
//! the vocabulary itself, the short-term token history, the phrase grammar
//! that turns token runs into timer commands, and the serial line protocol
//! those commands travel over.

pub mod history;
pub mod intent;
pub mod parser;
pub mod tokens;
pub mod wire;

// Core exports - grouped and sorted alphabetically
pub use history::{HeardToken, TokenHistory, DEFAULT_HISTORY_CAPACITY};
pub use intent::{Intent, TimerTarget};
pub use parser::{GrammarParser, ParserConfig};
pub use tokens::{Token, VOCABULARY_SIZE};
pub use wire::{format_command, parse_command, WireError, MAX_NAME_LEN};
