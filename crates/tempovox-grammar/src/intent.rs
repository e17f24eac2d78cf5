//! Resolved timer commands.

use std::fmt;

/// Which timer a command applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerTarget {
    /// Positional slot, spoken as "timer two".
    Index(u8),
    /// Named timer in display form, e.g. "Baking".
    Name(String),
}

impl fmt::Display for TimerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerTarget::Index(i) => write!(f, "{i}"),
            TimerTarget::Name(name) => f.write_str(name),
        }
    }
}

/// A fully resolved command, ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Silence all ringing alarms.
    Stop,
    /// Remove a timer. Without a target every timer is cancelled.
    Cancel { target: Option<TimerTarget> },
    /// Create a timer. `seconds` is always positive.
    Set { name: Option<String>, seconds: u32 },
    /// Add to or subtract from a running timer. Negative `seconds`
    /// shortens it.
    Adjust { target: TimerTarget, seconds: i64 },
}

impl Intent {
    /// Protocol keyword for this command kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::Stop => "STOP",
            Intent::Cancel { .. } => "CANCEL",
            Intent::Set { .. } => "SET",
            Intent::Adjust { seconds, .. } => {
                if *seconds >= 0 {
                    "ADD"
                } else {
                    "MINUS"
                }
            }
        }
    }
}
