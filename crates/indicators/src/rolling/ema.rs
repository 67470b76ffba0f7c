//! Exponential moving average.

use mm_types::Point;
use serde::{Deserialize, Serialize};

/// EMA with `alpha = 2 / (period + 1)`, seeded with the first value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ema {
    alpha: f64,
    value: Option<f64>,
}

impl Ema {
    /// Creates an EMA over `period` (at least 1).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(period: usize) -> Self {
        Self {
            alpha: 2.0 / (period.max(1) as f64 + 1.0),
            value: None,
        }
    }

    /// Feeds a value and returns the updated average.
    pub fn update(&mut self, x: f64) -> f64 {
        let next = match self.value {
            Some(prev) => self.alpha * x + (1.0 - self.alpha) * prev,
            None => x,
        };
        self.value = Some(next);
        next
    }
}

/// EMA of a value series, one output per input.
#[must_use]
pub fn ema_series(values: &[Point], period: usize) -> Vec<Point> {
    let mut ema = Ema::new(period);
    values.iter().map(|&(ts, x)| (ts, ema.update(x))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ema_seeded_with_first_value() {
        let out = ema_series(&[(0, 10.0), (1, 20.0), (2, 20.0)], 3);
        assert_relative_eq!(out[0].1, 10.0);
        assert_relative_eq!(out[1].1, 15.0);
        assert_relative_eq!(out[2].1, 17.5);
    }

    #[test]
    fn test_period_one_tracks_input() {
        let mut ema = Ema::new(1);
        ema.update(3.0);
        assert_relative_eq!(ema.update(7.0), 7.0);
    }
}
