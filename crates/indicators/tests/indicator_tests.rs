use approx::assert_relative_eq;
use mm_indicators::rolling::{log_return, rolling_percentile, rs_hurst};
use mm_indicators::{
    ComputeOutput, ComputeRequest, IncrementalState, Indicator, IndicatorError,
    LiquidationPressure, PermEntropy, RollingHurstIndicator, VolOfVol,
};
use mm_types::{Bar, LiquidationBucket, OutputSeries, Point, Timeframe};
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

mod common;
use common::{
    generators, random_liquidations, random_walk_bars, streaming_indicators, MINUTE_MS, START_MS,
};

fn compute_full(indicator: &dyn Indicator, bars: &[Bar]) -> ComputeOutput {
    indicator
        .compute(&ComputeRequest::full(bars, Timeframe::M1))
        .unwrap()
}

fn compute_after(
    indicator: &dyn Indicator,
    bars: &[Bar],
    state: Option<&IncrementalState>,
) -> ComputeOutput {
    indicator
        .compute(&ComputeRequest::full(bars, Timeframe::M1).continuing(state))
        .unwrap()
}

fn truncate(series: &OutputSeries, cutoff: i64) -> OutputSeries {
    let mut out = OutputSeries::new();
    for (key, points) in series.iter() {
        let kept: Vec<Point> = points.iter().copied().filter(|p| p.0 <= cutoff).collect();
        out.insert(key, kept);
    }
    out.prune_empty()
}

/// Full(k) followed by an incremental call equals Full(n), both when the
/// caller re-sends the whole history and when it sends only the new bars.
fn assert_split_equivalent(indicator: &dyn Indicator, bars: &[Bar], k: usize) {
    assert!(k >= 1 && k <= bars.len());
    let full = compute_full(indicator, bars);
    let head = compute_full(indicator, &bars[..k]);

    for tail_input in [bars, &bars[k..]] {
        let tail = compute_after(indicator, tail_input, head.state.as_ref());
        let mut joined = head.series.clone();
        joined.extend(tail.series);
        assert_eq!(joined, full.series, "{} split at {k}", indicator.id());
        assert_eq!(tail.state, full.state, "{} state at {k}", indicator.id());
    }
}

#[test]
fn test_incremental_matches_full_recompute() {
    let bars = random_walk_bars(160, 7);
    for indicator in streaming_indicators() {
        for k in [1, 5, 23, 24, 25, 80, 159] {
            assert_split_equivalent(indicator.as_ref(), &bars, k);
        }
    }
}

#[test]
fn test_incremental_bar_by_bar() {
    let bars = random_walk_bars(90, 11);
    for indicator in streaming_indicators() {
        let full = compute_full(indicator.as_ref(), &bars);
        let mut state: Option<IncrementalState> = None;
        let mut joined = OutputSeries::new();
        for i in 0..bars.len() {
            let out = compute_after(indicator.as_ref(), &bars[i..=i], state.as_ref());
            joined.extend(out.series);
            state = out.state;
        }
        assert_eq!(joined, full.series, "{}", indicator.id());
        assert_eq!(state, full.state);
    }
}

#[test]
fn test_json_state_roundtrip_continuation() {
    let bars = random_walk_bars(120, 3);
    for indicator in streaming_indicators() {
        let full = compute_full(indicator.as_ref(), &bars);
        let head = compute_full(indicator.as_ref(), &bars[..70]);
        let text = head.state.as_ref().unwrap().to_json_string().unwrap();
        let restored = IncrementalState::from_json_str(&text).unwrap();
        assert_eq!(Some(&restored), head.state.as_ref());

        let tail = compute_after(indicator.as_ref(), &bars[70..], Some(&restored));
        let mut joined = head.series;
        joined.extend(tail.series);
        assert_eq!(joined, full.series, "{}", indicator.id());
    }
}

#[test]
fn test_no_new_bars_returns_state_unchanged() {
    let bars = random_walk_bars(60, 5);
    let vov = VolOfVol::new(5, 5);
    let first = compute_full(&vov, &bars);
    let again = compute_after(&vov, &bars[..40], first.state.as_ref());
    assert!(again.series.is_empty());
    assert_eq!(again.state, first.state);
}

#[test]
fn test_gap_falls_back_to_full_recompute() {
    let bars = random_walk_bars(80, 9);
    let vov = VolOfVol::new(5, 5);
    let head = compute_full(&vov, &bars[..40]);
    // bar 40 missing: neither anchored nor contiguous
    let tail = compute_after(&vov, &bars[41..], head.state.as_ref());
    let fresh = compute_full(&vov, &bars[41..]);
    assert_eq!(tail, fresh);
}

#[test]
fn test_foreign_state_is_ignored() {
    let bars = random_walk_bars(80, 13);
    let vov = VolOfVol::new(5, 5);
    let other = VolOfVol::new(6, 5);
    let foreign = compute_full(&other, &bars[..40]).state;
    let out = compute_after(&vov, &bars, foreign.as_ref());
    assert_eq!(out, compute_full(&vov, &bars));

    let hurst = RollingHurstIndicator::new(20);
    let hurst_state = compute_full(&hurst, &bars[..40]).state;
    let out = compute_after(&vov, &bars, hurst_state.as_ref());
    assert_eq!(out, compute_full(&vov, &bars));
}

#[test]
fn test_timeframe_mismatch_is_ignored() {
    let bars = random_walk_bars(60, 17);
    let vov = VolOfVol::new(5, 5);
    let head = compute_full(&vov, &bars[..30]);
    let out = vov
        .compute(&ComputeRequest::full(&bars, Timeframe::M5).continuing(head.state.as_ref()))
        .unwrap();
    let fresh = vov
        .compute(&ComputeRequest::full(&bars, Timeframe::M5))
        .unwrap();
    assert_eq!(out, fresh);
}

#[test]
fn test_cold_start_is_empty() {
    let bars = random_walk_bars(4, 1);
    for indicator in streaming_indicators() {
        let out = compute_full(indicator.as_ref(), &bars);
        assert!(out.series.is_empty(), "{}", indicator.id());
        assert!(out.state.is_some());

        let out = compute_full(indicator.as_ref(), &[]);
        assert!(out.series.is_empty());
        assert!(out.state.is_none());
    }
}

#[test]
fn test_unordered_input_is_rejected() {
    let mut bars = random_walk_bars(30, 2);
    bars.swap(10, 11);
    for indicator in streaming_indicators() {
        let err = indicator
            .compute(&ComputeRequest::full(&bars, Timeframe::M1))
            .unwrap_err();
        assert!(matches!(err, IndicatorError::ComputationError(_)));
    }
}

#[test]
fn test_liquidation_incremental_matches_full() {
    let buckets = random_liquidations(150, 21);
    let pressure = LiquidationPressure::new(30);
    let run = |b: &[LiquidationBucket], state: Option<&IncrementalState>| {
        let request = ComputeRequest::full(&[], Timeframe::M1).with_liquidations(b);
        let request = match state {
            Some(_) => request.continuing(state),
            None => request,
        };
        pressure.compute(&request).unwrap()
    };

    let full = run(&buckets, None);
    assert_eq!(full.series.get("z_score").unwrap().len(), 150 - 30 + 1);
    for k in [1, 29, 30, 31, 100] {
        let head = run(&buckets[..k], None);
        let tail = run(&buckets[k..], head.state.as_ref());
        let mut joined = head.series;
        joined.extend(tail.series);
        assert_eq!(joined, full.series, "split at {k}");
    }
}

#[test]
fn test_sparse_liquidations_continue_across_gaps() {
    fn request(b: &[LiquidationBucket]) -> ComputeRequest<'_> {
        ComputeRequest::full(&[], Timeframe::M1).with_liquidations(b)
    }

    // two-minute spacing: consecutive buckets are never one interval apart
    let buckets: Vec<LiquidationBucket> = random_liquidations(40, 8)
        .into_iter()
        .enumerate()
        .map(|(i, b)| {
            let ts = START_MS + 2 * MINUTE_MS * i64::try_from(i).unwrap();
            LiquidationBucket::new(ts, b.long_notional, b.short_notional)
        })
        .collect();
    let pressure = LiquidationPressure::new(5);

    let full = pressure.compute(&request(&buckets)).unwrap();
    assert_eq!(full.series.get("z_score").unwrap().len(), 36);

    let head = pressure.compute(&request(&buckets[..20])).unwrap();
    let tail = pressure
        .compute(&request(&buckets[20..]).continuing(head.state.as_ref()))
        .unwrap();
    let mut joined = head.series;
    joined.extend(tail.series);
    assert_eq!(joined, full.series);
    assert_eq!(
        tail.state.unwrap().last_open_time,
        buckets.last().unwrap().open_time
    );
}

#[test]
fn test_constant_bars_have_zero_vol_of_vol() {
    let bars: Vec<Bar> = (0..500)
        .map(|i| Bar::flat(START_MS + i * MINUTE_MS, 100.0, 10.0))
        .collect();
    let vov = VolOfVol::new(20, 30);
    let out = compute_full(&vov, &bars);
    let values = out.series.get("vov").unwrap();
    assert_eq!(values.len(), 500 - vov.warmup() + 1);
    for &(_, v) in values {
        assert_relative_eq!(v, 0.0, epsilon = 1e-12);
    }
}

#[test]
fn test_percentile_of_increasing_series_is_one() {
    let values: Vec<Point> = (1..=100).map(|i| (i64::from(i), f64::from(i))).collect();
    let ranks = rolling_percentile(&values, 50);
    assert_eq!(ranks.len(), 51);
    assert!(ranks.iter().all(|&(_, p)| (p - 1.0).abs() < 1e-12));
}

#[test]
fn test_perm_entropy_bounds_and_affine_invariance() {
    let bars = random_walk_bars(400, 42);
    let pe = PermEntropy::new(4, 2, 60, true);
    let base = compute_full(&pe, &bars);
    let values = base.series.get("pe").unwrap();
    assert!(!values.is_empty());
    assert!(values.iter().all(|&(_, v)| (0.0..=1.0).contains(&v)));

    let scaled: Vec<Bar> = bars
        .iter()
        .map(|b| {
            let f = |x: f64| 2.5 * x + 10.0;
            Bar::new(b.open_time, f(b.open), f(b.high), f(b.low), f(b.close), b.volume)
        })
        .collect();
    let transformed = compute_full(&pe, &scaled);
    assert_eq!(transformed.series, base.series);
}

#[test]
fn test_perm_entropy_invalid_params_emit_nothing() {
    let bars = random_walk_bars(200, 4);
    for pe in [
        PermEntropy::new(2, 1, 50, true),
        PermEntropy::new(8, 1, 50, true),
        PermEntropy::new(3, 0, 50, true),
        PermEntropy::new(3, 1, 9, true),
    ] {
        assert!(!pe.is_valid());
        assert!(compute_full(&pe, &bars).series.is_empty());
    }
}

fn bars_from_log_returns(returns: &[f64]) -> Vec<Bar> {
    let mut price = 100.0_f64;
    let mut bars = vec![Bar::flat(START_MS, price, 1.0)];
    for (i, r) in returns.iter().enumerate() {
        price *= r.exp();
        let ts = START_MS + (i64::try_from(i).unwrap() + 1) * MINUTE_MS;
        bars.push(Bar::flat(ts, price, 1.0));
    }
    bars
}

#[test]
fn test_hurst_random_walk_near_half() {
    let mut rng = ChaCha8Rng::seed_from_u64(1234);
    let returns: Vec<f64> = (0..3000).map(|_| rng.gen_range(-0.01..0.01)).collect();
    let bars = bars_from_log_returns(&returns);

    let hurst = RollingHurstIndicator::new(300);
    let out = compute_full(&hurst, &bars);
    let values = out.series.get("hurst").unwrap();
    assert!(values.len() > 2000);
    #[allow(clippy::cast_precision_loss)]
    let mean = values.iter().map(|p| p.1).sum::<f64>() / values.len() as f64;
    assert!((0.4..=0.6).contains(&mean), "mean hurst {mean}");
}

#[test]
fn test_hurst_trending_above_half() {
    let returns: Vec<f64> = (0..600).map(|t| 1e-5 * f64::from(t)).collect();
    let bars = bars_from_log_returns(&returns);
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let window: Vec<f64> = closes[closes.len() - 301..]
        .windows(2)
        .map(|w| log_return(w[0], w[1]))
        .collect();
    assert!(rs_hurst(&window).unwrap() > 0.5);

    let out = compute_full(&RollingHurstIndicator::new(300), &bars);
    assert!(out.series.get("hurst").unwrap().iter().all(|&(_, h)| h > 0.5));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_split_point_equivalence(
        bars in generators::valid_bar_sequence(30..=120),
        frac in 0.0f64..1.0,
    ) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let k = ((frac * bars.len() as f64) as usize).clamp(1, bars.len());
        for indicator in streaming_indicators() {
            assert_split_equivalent(indicator.as_ref(), &bars, k);
        }
    }

    #[test]
    fn prop_no_look_ahead(
        bars in generators::valid_bar_sequence(30..=120),
        frac in 0.0f64..1.0,
    ) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let k = ((frac * bars.len() as f64) as usize).clamp(1, bars.len());
        let cutoff = bars[k - 1].open_time;
        for indicator in streaming_indicators() {
            let prefix = compute_full(indicator.as_ref(), &bars[..k]);
            let full = compute_full(indicator.as_ref(), &bars);
            prop_assert_eq!(prefix.series, truncate(&full.series, cutoff));
        }
    }
}
