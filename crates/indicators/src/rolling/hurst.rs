//! Rescaled-range (R/S) Hurst exponent.

use std::collections::VecDeque;

use mm_types::Point;
use serde::{Deserialize, Serialize};

/// Smallest window for which an R/S estimate is produced.
pub const MIN_HURST_WINDOW: usize = 20;

/// Hurst exponent `ln(R/S) / ln(n)` of one window of returns.
///
/// R is the range of the cumulative deviation from the window mean and S the
/// sample standard deviation. `None` for a degenerate window (S or R not
/// positive, or fewer than two points).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rs_hurst(returns: &[f64]) -> Option<f64> {
    let n = returns.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mean = returns.iter().sum::<f64>() / nf;

    let mut cum = 0.0;
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    let mut ss = 0.0;
    for &r in returns {
        let d = r - mean;
        cum += d;
        lo = lo.min(cum);
        hi = hi.max(cum);
        ss += d * d;
    }
    let range = hi - lo;
    let s = (ss / (nf - 1.0)).sqrt();
    if s.is_nan() || s <= 0.0 || range.is_nan() || range <= 0.0 {
        return None;
    }
    let h = (range / s).ln() / nf.ln();
    h.is_finite().then_some(h)
}

/// Streaming R/S Hurst over the last `window` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingHurst {
    window: usize,
    buf: VecDeque<f64>,
}

impl RollingHurst {
    /// Creates an estimator; `window` is clamped to at least 20.
    #[must_use]
    pub fn new(window: usize) -> Self {
        let window = window.max(MIN_HURST_WINDOW);
        Self {
            window,
            buf: VecDeque::with_capacity(window),
        }
    }

    /// Feeds a return; returns the estimate for the current full window.
    pub fn push(&mut self, r: f64) -> Option<f64> {
        if self.buf.len() == self.window {
            self.buf.pop_front();
        }
        self.buf.push_back(r);
        if self.buf.len() < self.window {
            return None;
        }
        let (a, b) = self.buf.as_slices();
        if b.is_empty() {
            rs_hurst(a)
        } else {
            let joined: Vec<f64> = a.iter().chain(b).copied().collect();
            rs_hurst(&joined)
        }
    }
}

/// Rolling Hurst exponent of a return series.
#[must_use]
pub fn rolling_hurst(returns: &[Point], window: usize) -> Vec<Point> {
    let mut hurst = RollingHurst::new(window);
    returns
        .iter()
        .filter_map(|&(ts, r)| hurst.push(r).map(|h| (ts, h)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_returns_are_degenerate() {
        assert_eq!(rs_hurst(&[0.01; 50]), None);
        assert_eq!(rs_hurst(&[0.5]), None);
    }

    #[test]
    fn test_linear_trend_in_returns_is_persistent() {
        let returns: Vec<f64> = (0..300).map(|i| f64::from(i) * 1e-5).collect();
        let h = rs_hurst(&returns).unwrap();
        assert!(h > 0.8, "h = {h}");
    }

    #[test]
    fn test_window_clamped_to_minimum() {
        let mut hurst = RollingHurst::new(5);
        let mut emitted = 0;
        for i in 0..25 {
            if hurst.push(if i % 3 == 0 { 0.01 } else { -0.004 }).is_some() {
                emitted += 1;
            }
        }
        assert_eq!(emitted, 6);
    }
}
