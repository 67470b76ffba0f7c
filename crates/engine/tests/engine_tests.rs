use std::sync::Arc;

use mm_engine::{ComputeQuery, Engine, MemoryStore, Namespace, PluginRegistry};
use mm_indicators::traits::params_from;
use mm_indicators::{
    ComputeOutput, ComputeRequest, Indicator, IndicatorDescriptor, IndicatorError,
    InputRequirement, OutputDef, Params, VolOfVol,
};
use mm_types::{EngineConfig, LiquidationBucket, OutputSeries, Timeframe};
use serde_json::json;
use tempfile::{tempdir, TempDir};

mod common;
use common::{
    end_of, isolated_config, random_walk_bars, shipped_plugins, write_manifest, MINUTE_MS,
    START_MS,
};

const SYMBOL: &str = "BTCUSDT";

fn store_with_bars(len: usize, seed: u64) -> MemoryStore {
    let mut store = MemoryStore::new();
    store.upsert_bars(SYMBOL, Timeframe::M1, &random_walk_bars(len, seed));
    store
}

fn minute_query(id: &str, end_ms: i64) -> ComputeQuery {
    ComputeQuery::new(id, SYMBOL, Timeframe::M1, START_MS, end_ms)
}

fn shipped_config(storage: &TempDir) -> EngineConfig {
    EngineConfig {
        project_dir: Some(shipped_plugins("project")),
        composite_dir: Some(shipped_plugins("composite")),
        ..isolated_config(storage.path())
    }
}

/// Emits its declared `value` series plus an undeclared `debug` series, or
/// panics when configured to.
struct Scripted {
    descriptor: IndicatorDescriptor,
    params: Params,
    panic: bool,
}

impl Indicator for Scripted {
    fn descriptor(&self) -> &IndicatorDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> &Params {
        &self.params
    }

    fn compute(&self, request: &ComputeRequest<'_>) -> Result<ComputeOutput, IndicatorError> {
        assert!(!self.panic, "scripted failure");
        let mut series = OutputSeries::new();
        for bar in request.bars {
            series.push("value", bar.open_time, bar.close);
            series.push("debug", bar.open_time, 0.0);
        }
        Ok(ComputeOutput { series, state: None })
    }
}

fn register_scripted(registry: &mut PluginRegistry, id: &str, panic: bool) {
    let descriptor = IndicatorDescriptor {
        id: id.to_string(),
        display_name: id.to_string(),
        description: String::new(),
        kernel: "scripted".to_string(),
        required_inputs: vec![InputRequirement::Candles { timeframe: None }],
        required_indicator_ids: Vec::new(),
        parameters: Params::new(),
        output_series_defs: vec![OutputDef::new("value", "Value")],
        supports_incremental: false,
    };
    registry.register_builtin(
        descriptor,
        Arc::new(move |descriptor: &IndicatorDescriptor, params: &Params| {
            Ok(Box::new(Scripted {
                descriptor: descriptor.clone(),
                params: params.clone(),
                panic,
            }) as Box<dyn Indicator>)
        }),
    );
}

#[test]
fn test_engine_lists_shipped_indicators() {
    let storage = tempdir().unwrap();
    let engine = Engine::new(MemoryStore::new(), shipped_config(&storage));
    assert!(engine.discovery_errors().is_empty());
    let ids: Vec<String> = engine.list_indicators().into_iter().map(|d| d.id).collect();
    assert_eq!(ids.len(), 11);
    assert_eq!(&ids[..2], ["vol_of_vol", "perm_entropy"]);
    assert!(ids.iter().any(|id| id == "regime_index"));
}

#[test]
fn test_custom_dir_under_storage_is_scanned() {
    let storage = tempdir().unwrap();
    let custom = storage.path().join("custom_indicators");
    std::fs::create_dir_all(&custom).unwrap();
    write_manifest(
        &custom,
        "fast_er.json",
        &json!({"id": "fast_er", "display_name": "Fast ER", "kernel": "efficiency_ratio",
                "parameters": {"window": 5}}),
    );
    let mut engine = Engine::new(store_with_bars(50, 1), isolated_config(storage.path()));
    assert!(engine.plugins().contains("fast_er"));
    assert_eq!(
        engine.plugins().get("fast_er").unwrap().namespace,
        Namespace::Custom
    );

    std::fs::remove_file(custom.join("fast_er.json")).unwrap();
    let (descriptors, errors) = engine.reload_plugins();
    assert!(errors.is_empty());
    assert_eq!(descriptors.len(), 2);
}

#[test]
fn test_matches_direct_compute() {
    let bars = random_walk_bars(400, 7);
    let mut store = MemoryStore::new();
    store.upsert_bars(SYMBOL, Timeframe::M1, &bars);
    let storage = tempdir().unwrap();
    let engine = Engine::new(store, isolated_config(storage.path()));

    let query = minute_query("vol_of_vol", end_of(&bars));
    let out = engine.compute(&query);
    assert!(out.failure.is_none());
    assert!(out.warnings.is_empty());

    let direct = VolOfVol::new(20, 30)
        .compute(&ComputeRequest::full(&bars, Timeframe::M1))
        .unwrap();
    assert_eq!(out.series.get("vov"), direct.series.get("vov"));
    let expected = 400 - VolOfVol::new(20, 30).warmup() + 1;
    assert_eq!(out.series.get("vov").unwrap().len(), expected);
}

#[test]
fn test_incremental_calls_join_to_full_run() {
    let bars = random_walk_bars(500, 11);
    let mut store = MemoryStore::new();
    store.upsert_bars(SYMBOL, Timeframe::M1, &bars);
    let storage = tempdir().unwrap();
    let engine = Engine::new(store, isolated_config(storage.path()));
    let end = end_of(&bars);

    let full = engine.compute(&minute_query("perm_entropy", end));

    let split = bars[349].open_time;
    let first = engine.compute(&minute_query("perm_entropy", split));
    let second = engine.compute(
        &ComputeQuery::new("perm_entropy", SYMBOL, Timeframe::M1, split + MINUTE_MS, end)
            .incremental(first.state.clone()),
    );
    assert!(second.failure.is_none());

    let mut joined = first.series.get("pe").unwrap().to_vec();
    joined.extend_from_slice(second.series.get("pe").unwrap());
    assert_eq!(joined.as_slice(), full.series.get("pe").unwrap());
    assert_eq!(second.state.unwrap().last_open_time, end);
}

#[test]
fn test_parameter_overrides() {
    let bars = random_walk_bars(120, 3);
    let mut store = MemoryStore::new();
    store.upsert_bars(SYMBOL, Timeframe::M1, &bars);
    let storage = tempdir().unwrap();
    let engine = Engine::new(store, isolated_config(storage.path()));

    let query = minute_query("vol_of_vol", end_of(&bars))
        .with_parameters(params_from([("vol_window", json!(5)), ("vov_window", json!(8))]));
    let out = engine.compute(&query);
    let expected = 120 - VolOfVol::new(5, 8).warmup() + 1;
    assert_eq!(out.series.get("vov").unwrap().len(), expected);
}

#[test]
fn test_composite_with_missing_dependency() {
    let storage = tempdir().unwrap();
    let composites = tempdir().unwrap();
    write_manifest(
        composites.path(),
        "mix.json",
        &json!({
            "id": "mix",
            "display_name": "Mix",
            "kernel": "percentile_blend",
            "required_indicator_ids": ["vol_of_vol", "perm_entropy", "ghost"],
            "parameters": {
                "norm_window": 50,
                "components": [
                    {"id": "vol_of_vol", "series": "vov"},
                    {"id": "perm_entropy", "series": "pe", "invert": true},
                    {"id": "ghost", "series": "x"}
                ]
            }
        }),
    );
    let config = EngineConfig {
        composite_dir: Some(composites.path().to_path_buf()),
        ..isolated_config(storage.path())
    };
    let bars = random_walk_bars(600, 5);
    let mut store = MemoryStore::new();
    store.upsert_bars(SYMBOL, Timeframe::M1, &bars);
    let engine = Engine::new(store, config);
    assert_eq!(
        engine.plugins().warnings(),
        ["Composite mix: missing dependency ghost".to_string()]
    );

    let out = engine.compute(&minute_query("mix", end_of(&bars)));
    assert!(out.failure.is_none(), "{:?}", out.failure);
    assert!(out.state.is_none());
    assert_eq!(
        out.warnings,
        vec![
            "Composite mix: missing dependency ghost".to_string(),
            "Composite mix: only 2/3 dependencies available".to_string(),
        ]
    );
    let blend = out.series.get("blend").unwrap();
    assert!(!blend.is_empty());
    assert!(blend.iter().all(|(_, v)| (0.0..=1.0).contains(v)));
}

#[test]
fn test_shipped_regime_index() {
    let storage = tempdir().unwrap();
    let bars = random_walk_bars(700, 21);
    let mut store = MemoryStore::new();
    store.upsert_bars(SYMBOL, Timeframe::M1, &bars);
    let engine = Engine::new(store, shipped_config(&storage));

    let out = engine.compute(
        &minute_query("regime_index", end_of(&bars))
            // composites always recompute
            .incremental(None),
    );
    assert!(out.failure.is_none(), "{:?}", out.failure);
    assert!(out.warnings.is_empty(), "{:?}", out.warnings);
    for key in ["regime", "regime_fast", "regime_slow"] {
        let points = out.series.get(key).unwrap();
        assert!(!points.is_empty());
        assert!(points.iter().all(|(_, v)| (0.0..=1.0).contains(v)), "{key}");
    }
    assert!(out.state.is_none());
}

#[test]
fn test_panicking_indicator_is_isolated() {
    let storage = tempdir().unwrap();
    let composites = tempdir().unwrap();
    write_manifest(
        composites.path(),
        "guarded.json",
        &json!({
            "id": "guarded",
            "display_name": "Guarded",
            "kernel": "percentile_blend",
            "required_indicator_ids": ["vol_of_vol", "boom"],
            "parameters": {
                "norm_window": 20,
                "components": [
                    {"id": "vol_of_vol", "series": "vov"},
                    {"id": "boom", "series": "value"}
                ]
            }
        }),
    );
    let config = EngineConfig {
        composite_dir: Some(composites.path().to_path_buf()),
        ..isolated_config(storage.path())
    };
    let bars = random_walk_bars(200, 9);
    let mut engine = Engine::new(store_with_bars(200, 9), config);
    register_scripted(engine.plugins_mut(), "boom", true);
    engine.plugins_mut().discover(false);
    assert!(engine.plugins().warnings().is_empty());

    let out = engine.compute(&minute_query("boom", end_of(&bars)));
    assert!(out.series.is_empty());
    let failure = out.failure.unwrap();
    assert!(failure.contains("indicator 'boom' panicked: scripted failure"), "{failure}");

    // the engine keeps serving
    let out = engine.compute(&minute_query("guarded", end_of(&bars)));
    assert!(out.failure.is_none(), "{:?}", out.failure);
    assert!(out.warnings[0].starts_with("Composite guarded: dependency boom failed: "));
    assert!(out.warnings[0].contains("panicked"));
    assert_eq!(out.warnings[1], "Composite guarded: only 1/2 dependencies available");
    assert!(!out.series.get("blend").unwrap().is_empty());
}

#[test]
fn test_unknown_indicator_fails_softly() {
    let storage = tempdir().unwrap();
    let engine = Engine::new(MemoryStore::new(), isolated_config(storage.path()));
    let out = engine.compute(&ComputeQuery::new("nope", SYMBOL, Timeframe::M1, 0, 1));
    assert_eq!(out.failure.as_deref(), Some("unknown indicator: nope"));
    assert!(out.series.is_empty());
    assert!(out.state.is_none());
}

#[test]
fn test_undeclared_series_dropped() {
    let storage = tempdir().unwrap();
    let mut engine = Engine::new(store_with_bars(10, 2), isolated_config(storage.path()));
    register_scripted(engine.plugins_mut(), "leaky", false);
    engine.plugins_mut().discover(false);

    let out = engine.compute(&minute_query("leaky", i64::MAX));
    assert_eq!(out.series.keys().collect::<Vec<_>>(), vec!["value"]);
    assert_eq!(out.series.get("value").unwrap().len(), 10);
    assert_eq!(out.warnings, vec!["leaky: dropped undeclared series 'debug'".to_string()]);
}

#[test]
fn test_bar_cap_keeps_most_recent() {
    let storage = tempdir().unwrap();
    let config = EngineConfig {
        max_bars_per_call: Some(100),
        ..isolated_config(storage.path())
    };
    let bars = random_walk_bars(500, 4);
    let mut store = MemoryStore::new();
    store.upsert_bars(SYMBOL, Timeframe::M1, &bars);
    let engine = Engine::new(store, config);

    let out = engine.compute(&minute_query("vol_of_vol", end_of(&bars)));
    let vov = out.series.get("vov").unwrap();
    assert_eq!(vov.len(), 100 - VolOfVol::new(20, 30).warmup() + 1);
    assert_eq!(vov.last().unwrap().0, end_of(&bars));
}

#[test]
fn test_liquidation_pressure_needs_no_bars() {
    let storage = tempdir().unwrap();
    let mut store = MemoryStore::new();
    let buckets: Vec<LiquidationBucket> = (0..90_i32)
        .map(|i| {
            LiquidationBucket::new(
                START_MS + i64::from(i) * MINUTE_MS,
                f64::from(i % 7) * 1_000.0,
                f64::from(i % 5) * 800.0,
            )
        })
        .collect();
    store.upsert_liquidations(SYMBOL, &buckets);
    let engine = Engine::new(store, shipped_config(&storage));

    let end = buckets.last().unwrap().open_time;
    let out = engine.compute(&ComputeQuery::new(
        "liquidation_pressure",
        SYMBOL,
        Timeframe::H1,
        START_MS,
        end,
    ));
    assert!(out.failure.is_none(), "{:?}", out.failure);
    assert_eq!(out.series.get("total_notional").unwrap().len(), 90);
    assert_eq!(out.series.get("z_score").unwrap().len(), 90 - 60 + 1);
    assert!(out.state.unwrap().timeframe.is_none());
}

#[test]
fn test_higher_timeframe_from_minutes() {
    let storage = tempdir().unwrap();
    let bars = random_walk_bars(1_000, 8);
    let mut store = MemoryStore::new();
    store.upsert_bars(SYMBOL, Timeframe::M1, &bars);
    let engine = Engine::new(store, isolated_config(storage.path()));

    let query = ComputeQuery::new("vol_of_vol", SYMBOL, Timeframe::M5, START_MS, end_of(&bars));
    let out = engine.compute(&query);
    let vov = out.series.get("vov").unwrap();
    assert_eq!(vov.len(), 200 - VolOfVol::new(20, 30).warmup() + 1);
    assert!(vov.iter().all(|(ts, _)| (ts - START_MS) % (5 * MINUTE_MS) == 0));
    assert_eq!(out.state.unwrap().timeframe, Some(Timeframe::M5));
}
