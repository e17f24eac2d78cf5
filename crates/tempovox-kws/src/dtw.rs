//! Banded dynamic time warping between feature sequences.

use crate::features::FeatureFrame;

/// DTW with a Sakoe-Chiba band and a reusable cost matrix.
///
/// The matrix is a flat `(n+1) x (m+1)` grid; row and column 0 form the
/// virtual origin so the recurrence needs no edge cases. The buffer is kept
/// between calls, so a long-lived matcher stops allocating once it has seen
/// its largest pair.
pub struct Dtw {
    band: usize,
    cost: Vec<f32>,
}

impl Dtw {
    pub fn new(band: usize) -> Self {
        Self {
            band,
            cost: Vec::new(),
        }
    }

    /// Path-length normalized alignment cost between `a` and `b`.
    ///
    /// Returns infinity when either sequence is empty or the lengths differ
    /// by more than the band, which makes grossly mismatched durations
    /// unmatchable regardless of content.
    pub fn distance(&mut self, a: &[FeatureFrame], b: &[FeatureFrame]) -> f32 {
        let n = a.len();
        let m = b.len();
        if n == 0 || m == 0 {
            return f32::INFINITY;
        }
        if n.abs_diff(m) > self.band {
            return f32::INFINITY;
        }

        let cols = m + 1;
        self.cost.clear();
        self.cost.resize((n + 1) * cols, f32::INFINITY);
        self.cost[0] = 0.0;

        for i in 1..=n {
            let lo = i.saturating_sub(self.band).max(1);
            let hi = (i + self.band).min(m);
            for j in lo..=hi {
                let step = self.cost[(i - 1) * cols + (j - 1)]
                    .min(self.cost[(i - 1) * cols + j])
                    .min(self.cost[i * cols + (j - 1)]);
                self.cost[i * cols + j] = frame_distance(&a[i - 1], &b[j - 1]) + step;
            }
        }

        let corner = self.cost[n * cols + m];
        if corner.is_finite() {
            corner / (n + m) as f32
        } else {
            f32::INFINITY
        }
    }

    pub fn band(&self) -> usize {
        self.band
    }
}

/// Squared Euclidean distance between two frames.
fn frame_distance(a: &FeatureFrame, b: &FeatureFrame) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
