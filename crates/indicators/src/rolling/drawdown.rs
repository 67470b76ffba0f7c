//! Rolling max-drawdown and Ulcer index.

use std::collections::VecDeque;

use mm_types::Point;
use serde::{Deserialize, Serialize};

/// Drawdown statistics of one full window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawdownSnapshot {
    /// Most negative `price / running_peak - 1` in the window (<= 0).
    pub max_drawdown: f64,
    /// Root-mean-square of the drawdown in percent.
    pub ulcer_index: f64,
}

/// Window of recent prices. The running peak restarts at the first price of
/// each window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingDrawdown {
    window: usize,
    buf: VecDeque<f64>,
}

impl RollingDrawdown {
    /// Creates an empty window of `window` prices (at least 2).
    #[must_use]
    pub fn new(window: usize) -> Self {
        let window = window.max(2);
        Self {
            window,
            buf: VecDeque::with_capacity(window),
        }
    }

    /// Feeds a price; returns the window statistics once full. `None` when
    /// a non-positive peak makes the ratio meaningless.
    #[allow(clippy::cast_precision_loss)]
    pub fn push(&mut self, price: f64) -> Option<DrawdownSnapshot> {
        if self.buf.len() == self.window {
            self.buf.pop_front();
        }
        self.buf.push_back(price);
        if self.buf.len() < self.window {
            return None;
        }

        let mut peak = *self.buf.front()?;
        let mut worst = 0.0f64;
        let mut sq = 0.0;
        for &p in &self.buf {
            peak = peak.max(p);
            if peak <= 0.0 {
                return None;
            }
            let dd = p / peak - 1.0;
            worst = worst.min(dd);
            let pct = 100.0 * dd;
            sq += pct * pct;
        }
        Some(DrawdownSnapshot {
            max_drawdown: worst,
            ulcer_index: (sq / self.window as f64).sqrt(),
        })
    }
}

/// Rolling max-drawdown of a price series.
#[must_use]
pub fn rolling_max_drawdown(prices: &[Point], window: usize) -> Vec<Point> {
    let mut dd = RollingDrawdown::new(window);
    prices
        .iter()
        .filter_map(|&(ts, p)| dd.push(p).map(|s| (ts, s.max_drawdown)))
        .collect()
}

/// Rolling Ulcer index of a price series.
#[must_use]
pub fn rolling_ulcer_index(prices: &[Point], window: usize) -> Vec<Point> {
    let mut dd = RollingDrawdown::new(window);
    prices
        .iter()
        .filter_map(|&(ts, p)| dd.push(p).map(|s| (ts, s.ulcer_index)))
        .collect()
}
