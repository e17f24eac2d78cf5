//! Fixed-capacity ring of recently heard tokens.

use crate::tokens::Token;

/// Default number of history slots, enough for several overlapping phrases.
pub const DEFAULT_HISTORY_CAPACITY: usize = 16;

/// A token together with the utterance timestamp it was recognized at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeardToken {
    pub token: Token,
    pub timestamp_ms: u64,
}

/// Ring buffer of the most recent recognitions.
///
/// Old entries are overwritten once capacity is reached; entries are never
/// removed individually, they simply age out of the parser's time window.
#[derive(Debug, Clone)]
pub struct TokenHistory {
    slots: Vec<HeardToken>,
    capacity: usize,
    write: usize,
    len: usize,
}

impl TokenHistory {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be non-zero");
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            write: 0,
            len: 0,
        }
    }

    /// Appends a recognition, overwriting the oldest entry when full.
    pub fn push(&mut self, token: Token, timestamp_ms: u64) {
        let entry = HeardToken {
            token,
            timestamp_ms,
        };
        if self.slots.len() < self.capacity {
            self.slots.push(entry);
        } else {
            self.slots[self.write] = entry;
        }
        self.write = (self.write + 1) % self.capacity;
        self.len = (self.len + 1).min(self.capacity);
    }

    /// Entries no older than `max_age_ms` relative to `now_ms`, oldest first.
    pub fn recent_window(&self, now_ms: u64, max_age_ms: u64) -> Vec<HeardToken> {
        let cutoff = now_ms.saturating_sub(max_age_ms);
        self.iter_chronological()
            .filter(|entry| entry.timestamp_ms >= cutoff)
            .collect()
    }

    /// All live entries in arrival order, oldest first.
    fn iter_chronological(&self) -> impl Iterator<Item = HeardToken> + '_ {
        let start = if self.len < self.capacity {
            0
        } else {
            self.write
        };
        (0..self.len).map(move |i| self.slots[(start + i) % self.capacity])
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.write = 0;
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
