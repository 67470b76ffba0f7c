use mm_types::Bar;
use proptest::prelude::*;

use super::{MINUTE_MS, START_MS};

/// Bar sequences with positive prices at one-minute spacing.
pub fn valid_bar_sequence(len: std::ops::RangeInclusive<usize>) -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec(valid_bar(), len).prop_map(|mut bars| {
        let mut ts = START_MS;
        for bar in &mut bars {
            bar.open_time = ts;
            ts += MINUTE_MS;
        }
        bars
    })
}

fn valid_bar() -> impl Strategy<Value = Bar> {
    (
        50.0f64..150.0, // base price
        0.0f64..2.0,    // half range
        -1.0f64..1.0,   // close position within range
        0.0f64..100.0,  // volume
    )
        .prop_map(|(base, spread, pos, volume)| {
            Bar::new(0, base, base + spread, base - spread, base + pos * spread, volume)
        })
}
