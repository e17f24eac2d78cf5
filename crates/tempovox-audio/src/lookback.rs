//! Absolute-indexed sample history.
//!
//! The segmenter decides an utterance started several hops in the past, so
//! it needs to reach back for audio that already went by. The ring keeps the
//! last `capacity` samples addressable by their absolute position since
//! pipeline start.

/// Two seconds at 16 kHz.
pub const DEFAULT_LOOKBACK_SAMPLES: usize = 32_000;

pub struct LookbackRing {
    buf: Vec<i16>,
    capacity: usize,
    /// Absolute index of the next sample to be written.
    next_index: u64,
}

impl LookbackRing {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);
        Self {
            buf: vec![0; capacity],
            capacity,
            next_index: 0,
        }
    }

    pub fn push(&mut self, samples: &[i16]) {
        for &sample in samples {
            let slot = (self.next_index % self.capacity as u64) as usize;
            self.buf[slot] = sample;
            self.next_index += 1;
        }
    }

    /// Absolute index one past the newest stored sample.
    pub fn end_index(&self) -> u64 {
        self.next_index
    }

    /// Absolute index of the oldest sample still held.
    pub fn oldest_available(&self) -> u64 {
        self.next_index.saturating_sub(self.capacity as u64)
    }

    /// Copies `len` samples starting at absolute index `start`. Returns
    /// `None` when any part of the range has been overwritten or has not
    /// been written yet.
    pub fn read_range(&self, start: u64, len: usize) -> Option<Vec<i16>> {
        let end = start.checked_add(len as u64)?;
        if end > self.next_index || start < self.oldest_available() {
            return None;
        }

        let mut out = Vec::with_capacity(len);
        for index in start..end {
            let slot = (index % self.capacity as u64) as usize;
            out.push(self.buf[slot]);
        }
        Some(out)
    }
}
