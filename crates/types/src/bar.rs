//! Raw market inputs: OHLCV bars and per-minute liquidation aggregates.

use crate::timeframe::Timeframe;

/// Anything carrying an open-time in epoch milliseconds.
pub trait Timestamped {
    /// Open time in epoch milliseconds.
    fn open_time(&self) -> i64;
}

/// One OHLCV candle for a symbol/timeframe.
/// `open_time` is the **open** time of the bar (epoch ms, UTC).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    /// Open time, epoch milliseconds UTC
    pub open_time: i64,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Volume
    pub volume: f64,
}

impl Bar {
    /// Creates a bar from its OHLCV fields.
    #[must_use]
    pub fn new(open_time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Flat bar with every price equal to `price`.
    #[must_use]
    pub fn flat(open_time: i64, price: f64, volume: f64) -> Self {
        Self::new(open_time, price, price, price, price, volume)
    }
}

impl Timestamped for Bar {
    fn open_time(&self) -> i64 {
        self.open_time
    }
}

/// Liquidations aggregated into one 1-minute bucket.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LiquidationBucket {
    /// Bucket open time, epoch milliseconds, minute aligned
    pub open_time: i64,
    /// Notional of long positions liquidated
    pub long_notional: f64,
    /// Notional of short positions liquidated
    pub short_notional: f64,
    /// `long_notional + short_notional`
    pub total_notional: f64,
    /// `(long - short) / total`, 0 for an empty bucket
    pub imbalance: f64,
}

impl LiquidationBucket {
    /// Builds a bucket, deriving total and imbalance.
    #[must_use]
    pub fn new(open_time: i64, long_notional: f64, short_notional: f64) -> Self {
        let total_notional = long_notional + short_notional;
        let imbalance = if total_notional > 0.0 {
            (long_notional - short_notional) / total_notional
        } else {
            0.0
        };
        Self {
            open_time,
            long_notional,
            short_notional,
            total_notional,
            imbalance,
        }
    }
}

impl Timestamped for LiquidationBucket {
    fn open_time(&self) -> i64 {
        self.open_time
    }
}

/// Aggregates ordered 1-minute bars into `target` bars aligned to the
/// target interval: first open, max high, min low, last close, summed volume.
#[must_use]
pub fn resample_bars(bars: &[Bar], target: Timeframe) -> Vec<Bar> {
    let mut out: Vec<Bar> = Vec::new();
    for bar in bars {
        let bucket = target.align(bar.open_time);
        match out.last_mut() {
            Some(acc) if acc.open_time == bucket => {
                acc.high = acc.high.max(bar.high);
                acc.low = acc.low.min(bar.low);
                acc.close = bar.close;
                acc.volume += bar.volume;
            }
            _ => out.push(Bar {
                open_time: bucket,
                ..*bar
            }),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_liquidation_bucket_imbalance() {
        let b = LiquidationBucket::new(0, 300.0, 100.0);
        assert!((b.total_notional - 400.0).abs() < 1e-12);
        assert!((b.imbalance - 0.5).abs() < 1e-12);

        let empty = LiquidationBucket::new(60_000, 0.0, 0.0);
        assert_eq!(empty.imbalance, 0.0);
    }

    #[test]
    fn test_resample_bars_to_five_minutes() {
        let bars: Vec<Bar> = (0..7)
            .map(|i| {
                let p = 100.0 + f64::from(i);
                Bar::new(i64::from(i) * 60_000, p, p + 1.0, p - 1.0, p + 0.5, 2.0)
            })
            .collect();

        let out = resample_bars(&bars, Timeframe::M5);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].open_time, 0);
        assert_eq!(out[0].open, 100.0);
        assert_eq!(out[0].high, 105.0);
        assert_eq!(out[0].low, 99.0);
        assert_eq!(out[0].close, 104.5);
        assert_eq!(out[0].volume, 10.0);
        assert_eq!(out[1].open_time, 300_000);
        assert_eq!(out[1].volume, 4.0);
    }

    #[test]
    fn test_bar_serde_roundtrip() {
        let bar = Bar::new(1_700_000_000_000, 1.0, 2.0, 0.5, 1.5, 10.0);
        let json = serde_json::to_string(&bar).unwrap();
        let back: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, back);
    }
}
