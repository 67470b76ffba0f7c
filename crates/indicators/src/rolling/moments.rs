//! Rolling raw-moment statistics.
//!
//! Sums of powers 1..4 are maintained over a sliding window with an O(1)
//! update (add incoming, subtract outgoing). Central moments are derived
//! from the raw moments when requested.

use std::collections::VecDeque;

use mm_types::Point;
use serde::{Deserialize, Serialize};

/// Second central moments at or below this are treated as zero.
pub const MOMENT_EPSILON: f64 = 1e-18;

/// Sliding window of raw power sums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingMoments {
    window: usize,
    buf: VecDeque<f64>,
    s1: f64,
    s2: f64,
    s3: f64,
    s4: f64,
}

impl RollingMoments {
    /// Creates an empty window of `window` values (at least 1).
    #[must_use]
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            buf: VecDeque::with_capacity(window),
            s1: 0.0,
            s2: 0.0,
            s3: 0.0,
            s4: 0.0,
        }
    }

    /// Adds a value, evicting the oldest one once the window is full.
    pub fn push(&mut self, x: f64) {
        if self.buf.len() == self.window {
            if let Some(old) = self.buf.pop_front() {
                let old2 = old * old;
                self.s1 -= old;
                self.s2 -= old2;
                self.s3 -= old2 * old;
                self.s4 -= old2 * old2;
            }
        }
        let x2 = x * x;
        self.buf.push_back(x);
        self.s1 += x;
        self.s2 += x2;
        self.s3 += x2 * x;
        self.s4 += x2 * x2;
    }

    /// Window length.
    #[must_use]
    pub fn window(&self) -> usize {
        self.window
    }

    /// Number of values currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True before the first push.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// True once `window` values have been seen.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.buf.len() == self.window
    }

    #[allow(clippy::cast_precision_loss)]
    fn raw(&self) -> Option<(f64, f64, f64, f64)> {
        if self.buf.is_empty() {
            return None;
        }
        let n = self.buf.len() as f64;
        Some((self.s1 / n, self.s2 / n, self.s3 / n, self.s4 / n))
    }

    /// Window mean.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        self.raw().map(|(mean, ..)| mean)
    }

    /// Population variance, clamped at zero.
    #[must_use]
    pub fn variance(&self) -> Option<f64> {
        self.raw().map(|(mean, ex2, ..)| (ex2 - mean * mean).max(0.0))
    }

    /// Population standard deviation.
    #[must_use]
    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    /// Skewness `m3 / m2^1.5`; `0.0` for a numerically flat window.
    #[must_use]
    pub fn skewness(&self) -> Option<f64> {
        let (mean, ex2, ex3, _) = self.raw()?;
        let m2 = ex2 - mean * mean;
        if m2 <= MOMENT_EPSILON {
            return Some(0.0);
        }
        let m3 = ex3 - 3.0 * mean * ex2 + 2.0 * mean.powi(3);
        Some(m3 / m2.powf(1.5))
    }

    /// Kurtosis `m4 / m2^2`, minus 3 when `excess`; `0.0` for a flat window.
    #[must_use]
    pub fn kurtosis(&self, excess: bool) -> Option<f64> {
        let (mean, ex2, ex3, ex4) = self.raw()?;
        let m2 = ex2 - mean * mean;
        if m2 <= MOMENT_EPSILON {
            return Some(0.0);
        }
        let mean2 = mean * mean;
        let m4 = ex4 - 4.0 * mean * ex3 + 6.0 * mean2 * ex2 - 3.0 * mean2 * mean2;
        let kurt = m4 / (m2 * m2);
        Some(if excess { kurt - 3.0 } else { kurt })
    }
}

/// Sliding window of sum and sum of squares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingStd {
    window: usize,
    buf: VecDeque<f64>,
    sum: f64,
    sumsq: f64,
}

impl RollingStd {
    /// Creates an empty window of `window` values (at least 1).
    #[must_use]
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            buf: VecDeque::with_capacity(window),
            sum: 0.0,
            sumsq: 0.0,
        }
    }

    /// Adds a value; returns the population standard deviation once the
    /// window is full.
    #[allow(clippy::cast_precision_loss)]
    pub fn update(&mut self, x: f64) -> Option<f64> {
        if self.buf.len() == self.window {
            if let Some(old) = self.buf.pop_front() {
                self.sum -= old;
                self.sumsq -= old * old;
            }
        }
        self.buf.push_back(x);
        self.sum += x;
        self.sumsq += x * x;
        if self.buf.len() < self.window {
            return None;
        }
        let n = self.window as f64;
        let mean = self.sum / n;
        let var = (self.sumsq / n - mean * mean).max(0.0);
        Some(var.sqrt())
    }
}

/// Rolling (excess) kurtosis of a value series.
#[must_use]
pub fn rolling_kurtosis(values: &[Point], window: usize, excess: bool) -> Vec<Point> {
    let mut moments = RollingMoments::new(window);
    values
        .iter()
        .filter_map(|&(ts, x)| {
            moments.push(x);
            if moments.is_full() {
                moments.kurtosis(excess).map(|k| (ts, k))
            } else {
                None
            }
        })
        .collect()
}

/// Rolling population standard deviation of a value series.
#[must_use]
pub fn rolling_std(values: &[Point], window: usize) -> Vec<Point> {
    let mut std = RollingStd::new(window);
    values
        .iter()
        .filter_map(|&(ts, x)| std.update(x).map(|s| (ts, s)))
        .collect()
}
