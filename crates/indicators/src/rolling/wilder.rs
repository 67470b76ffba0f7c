//! True range and Wilder smoothing.

use serde::{Deserialize, Serialize};

/// True Range given the previous close.
///
/// TR = max(High - Low, |High - Prev_Close|, |Low - Prev_Close|)
#[inline]
#[must_use]
pub fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    let hl = high - low;
    let hc = (high - prev_close).abs();
    let lc = (low - prev_close).abs();
    hl.max(hc).max(lc)
}

/// Average True Range with Wilder smoothing.
///
/// Seeded with the simple mean of the first `period` true ranges, then
/// `atr = (atr * (period - 1) + tr) / period`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WilderAtr {
    period: usize,
    seed_sum: f64,
    seed_count: usize,
    atr: Option<f64>,
}

impl WilderAtr {
    /// Creates an unseeded average over `period` values (at least 1).
    #[must_use]
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            seed_sum: 0.0,
            seed_count: 0,
            atr: None,
        }
    }

    /// Feeds one true range; returns the average once seeded.
    #[allow(clippy::cast_precision_loss)]
    pub fn update(&mut self, tr: f64) -> Option<f64> {
        let p = self.period as f64;
        if let Some(prev) = self.atr {
            let next = (prev * (p - 1.0) + tr) / p;
            self.atr = Some(next);
            return self.atr;
        }
        self.seed_sum += tr;
        self.seed_count += 1;
        if self.seed_count == self.period {
            self.atr = Some(self.seed_sum / p);
        }
        self.atr
    }

    /// Current average, if seeded.
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        self.atr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_true_range() {
        assert_relative_eq!(true_range(105.0, 95.0, 100.0), 10.0);
        // gap up
        assert_relative_eq!(true_range(115.0, 108.0, 100.0), 15.0);
        // gap down
        assert_relative_eq!(true_range(92.0, 85.0, 100.0), 15.0);
    }

    #[test]
    fn test_wilder_seed_then_smooth() {
        let mut atr = WilderAtr::new(3);
        assert_eq!(atr.update(4.0), None);
        assert_eq!(atr.update(5.0), None);
        assert_relative_eq!(atr.update(5.0).unwrap(), 14.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(
            atr.update(5.0).unwrap(),
            (14.0 / 3.0 * 2.0 + 5.0) / 3.0,
            epsilon = 1e-12
        );
    }
}
