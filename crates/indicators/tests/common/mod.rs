#![allow(dead_code)]

pub mod generators;

use mm_indicators::{
    AmihudIlliquidity, AsymmetryMode, DownUpVolAsymmetry, EfficiencyRatio, Indicator,
    PermEntropy, RealizedKurtosis, RollingHurstIndicator, RollingMaxDrawdown, UlcerIndex,
    VolOfVol,
};
use mm_types::{Bar, LiquidationBucket};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const MINUTE_MS: i64 = 60_000;
pub const START_MS: i64 = 1_704_067_200_000; // 2024-01-01 00:00:00 UTC

/// Seeded random-walk bars at one-minute spacing.
pub fn random_walk_bars(len: usize, seed: u64) -> Vec<Bar> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut price = 100.0_f64;
    let mut ts = START_MS;
    let mut bars = Vec::with_capacity(len);
    for _ in 0..len {
        let open = price;
        price *= 1.0 + rng.gen_range(-0.01..0.01);
        let high = open.max(price) * (1.0 + rng.gen_range(0.0..0.002));
        let low = open.min(price) * (1.0 - rng.gen_range(0.0..0.002));
        let volume = rng.gen_range(1.0..50.0);
        bars.push(Bar::new(ts, open, high, low, price, volume));
        ts += MINUTE_MS;
    }
    bars
}

/// Seeded liquidation buckets at one-minute spacing.
pub fn random_liquidations(len: usize, seed: u64) -> Vec<LiquidationBucket> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len)
        .map(|i| {
            let ts = START_MS + i64::try_from(i).unwrap() * MINUTE_MS;
            LiquidationBucket::new(ts, rng.gen_range(0.0..1e5), rng.gen_range(0.0..1e5))
        })
        .collect()
}

/// Every bar-driven streaming indicator with small windows.
pub fn streaming_indicators() -> Vec<Box<dyn Indicator>> {
    vec![
        Box::new(VolOfVol::new(5, 8)),
        Box::new(PermEntropy::new(3, 1, 12, true)),
        Box::new(RealizedKurtosis::new(20)),
        Box::new(RollingHurstIndicator::new(24)),
        Box::new(UlcerIndex::new(12)),
        Box::new(RollingMaxDrawdown::new(12)),
        Box::new(AmihudIlliquidity::new(6)),
        Box::new(DownUpVolAsymmetry::new(20, AsymmetryMode::Ratio)),
        Box::new(DownUpVolAsymmetry::new(20, AsymmetryMode::Diff)),
        Box::new(EfficiencyRatio::new(10)),
    ]
}
