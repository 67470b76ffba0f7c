//! Market data access consumed by the engine.

use std::collections::HashMap;

use mm_types::{resample_bars, Bar, CoreError, LiquidationBucket, Timeframe, Timestamped};

/// Read access to stored bars and liquidation buckets.
///
/// Ranges are inclusive on both ends and results are ordered by open time.
pub trait MarketStore {
    /// Bars of `symbol` at `timeframe` with `start_ms <= open_time <= end_ms`.
    ///
    /// # Errors
    ///
    /// Returns a [`CoreError`] when the backing store cannot be read.
    fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Bar>, CoreError>;

    /// Liquidation buckets of `symbol` with `start_ms <= open_time <= end_ms`.
    ///
    /// # Errors
    ///
    /// Returns a [`CoreError`] when the backing store cannot be read.
    fn get_liquidations(
        &self,
        symbol: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<LiquidationBucket>, CoreError>;
}

/// In-memory store.
///
/// Higher timeframes without stored bars are answered by resampling the
/// symbol's 1-minute bars.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    bars: HashMap<(String, Timeframe), Vec<Bar>>,
    liquidations: HashMap<String, Vec<LiquidationBucket>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts bars, replacing any stored bar with the same open time.
    pub fn upsert_bars(&mut self, symbol: &str, timeframe: Timeframe, bars: &[Bar]) {
        let stored = self
            .bars
            .entry((symbol.to_string(), timeframe))
            .or_default();
        upsert(stored, bars);
    }

    /// Inserts liquidation buckets, replacing same-minute buckets.
    pub fn upsert_liquidations(&mut self, symbol: &str, buckets: &[LiquidationBucket]) {
        let stored = self.liquidations.entry(symbol.to_string()).or_default();
        upsert(stored, buckets);
    }

    /// Number of stored bars for a symbol and timeframe.
    #[must_use]
    pub fn bar_count(&self, symbol: &str, timeframe: Timeframe) -> usize {
        self.bars
            .get(&(symbol.to_string(), timeframe))
            .map_or(0, Vec::len)
    }
}

fn upsert<T: Timestamped + Copy>(stored: &mut Vec<T>, items: &[T]) {
    for item in items {
        let ts = item.open_time();
        match stored.binary_search_by_key(&ts, |x| x.open_time()) {
            Ok(i) => stored[i] = *item,
            Err(i) => stored.insert(i, *item),
        }
    }
}

fn in_range<T: Timestamped + Copy>(items: &[T], start_ms: i64, end_ms: i64) -> Vec<T> {
    let lo = items.partition_point(|x| x.open_time() < start_ms);
    let hi = items.partition_point(|x| x.open_time() <= end_ms);
    if lo >= hi {
        Vec::new()
    } else {
        items[lo..hi].to_vec()
    }
}

impl MarketStore for MemoryStore {
    fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Bar>, CoreError> {
        if let Some(stored) = self.bars.get(&(symbol.to_string(), timeframe)) {
            return Ok(in_range(stored, start_ms, end_ms));
        }
        if timeframe == Timeframe::M1 {
            return Ok(Vec::new());
        }
        let Some(minutes) = self.bars.get(&(symbol.to_string(), Timeframe::M1)) else {
            return Ok(Vec::new());
        };
        let source = in_range(minutes, timeframe.align(start_ms), end_ms);
        let resampled = resample_bars(&source, timeframe);
        Ok(in_range(&resampled, start_ms, end_ms))
    }

    fn get_liquidations(
        &self,
        symbol: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<LiquidationBucket>, CoreError> {
        Ok(self
            .liquidations
            .get(symbol)
            .map(|stored| in_range(stored, start_ms, end_ms))
            .unwrap_or_default())
    }
}
