//! Recognizer error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KwsError {
    #[error("template bank io: {0}")]
    BankIo(#[from] std::io::Error),

    #[error("template bank json: {0}")]
    BankJson(#[from] serde_json::Error),

    #[error("unsupported template bank version {0}")]
    UnsupportedVersion(u32),

    #[error("unknown vocabulary word '{0}' in template bank")]
    UnknownWord(String),

    #[error("template bank has {found} bands per frame, this build uses {expected}")]
    BinMismatch { found: usize, expected: usize },

    #[error("template bank was recorded at {found} Hz, this build uses {expected} Hz")]
    SampleRateMismatch { found: u32, expected: u32 },

    #[error("empty template for '{0}' in template bank")]
    EmptyTemplate(String),

    #[error("could not allocate template storage for {frames} frames")]
    TemplateAlloc { frames: usize },
}
