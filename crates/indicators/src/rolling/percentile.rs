//! Rolling percentile rank over a sorted multiset.

use std::collections::VecDeque;

use mm_types::Point;
use serde::{Deserialize, Serialize};

/// Percentile rank of each new value within the last `window` values.
///
/// Rank is `(count of window values <= x) - 1` divided by `window - 1`, so the
/// window minimum maps to 0 and the maximum to 1. Non-finite inputs are
/// ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingPercentile {
    window: usize,
    buf: VecDeque<f64>,
    sorted: Vec<f64>,
}

impl RollingPercentile {
    /// Creates an empty ranker; `window` is clamped to at least 2.
    #[must_use]
    pub fn new(window: usize) -> Self {
        let window = window.max(2);
        Self {
            window,
            buf: VecDeque::with_capacity(window),
            sorted: Vec::with_capacity(window),
        }
    }

    /// Window length.
    #[must_use]
    pub fn window(&self) -> usize {
        self.window
    }

    /// Feeds a value; returns its rank in `[0, 1]` once the window is full.
    #[allow(clippy::cast_precision_loss)]
    pub fn push(&mut self, x: f64) -> Option<f64> {
        if !x.is_finite() {
            return None;
        }
        if self.buf.len() == self.window {
            if let Some(old) = self.buf.pop_front() {
                let idx = self.sorted.partition_point(|v| v.total_cmp(&old).is_lt());
                self.sorted.remove(idx);
            }
        }
        self.buf.push_back(x);
        let at = self.sorted.partition_point(|v| v.total_cmp(&x).is_le());
        self.sorted.insert(at, x);

        if self.buf.len() < self.window {
            return None;
        }
        let rank = self.sorted.partition_point(|v| v.total_cmp(&x).is_le()) - 1;
        Some((rank as f64 / (self.window - 1) as f64).clamp(0.0, 1.0))
    }
}

/// Rolling percentile rank of a value series.
#[must_use]
pub fn rolling_percentile(values: &[Point], window: usize) -> Vec<Point> {
    let mut ranker = RollingPercentile::new(window);
    values
        .iter()
        .filter_map(|&(ts, x)| ranker.push(x).map(|p| (ts, p)))
        .collect()
}
