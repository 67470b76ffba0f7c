//! Indicator contract.
//!
//! Every indicator exposes a static [`IndicatorDescriptor`] and a single
//! `compute` operation that serves both full recomputation and incremental
//! continuation through [`ComputeRequest`].

use std::collections::BTreeMap;

use mm_types::{Bar, LiquidationBucket, OutputSeries, Timeframe};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::IndicatorError;
use crate::state::IncrementalState;

/// Parameter mapping, name to JSON value.
pub type Params = serde_json::Map<String, Value>;

/// Outputs of a composite's dependencies, keyed by dependency id.
pub type DependencyBundle = BTreeMap<String, OutputSeries>;

/// One raw input an indicator needs from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum InputRequirement {
    /// OHLCV bars; `None` accepts whatever timeframe the caller charts.
    Candles {
        /// Pinned timeframe, if any
        #[serde(default)]
        timeframe: Option<Timeframe>,
    },
    /// Per-minute liquidation buckets.
    Liquidations,
}

/// One series an indicator may emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDef {
    /// Series key
    pub id: String,
    /// Human readable label
    pub label: String,
}

impl OutputDef {
    /// Creates an output definition.
    #[must_use]
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
        }
    }
}

/// Static metadata of an indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorDescriptor {
    /// Globally unique id, stable across reloads
    pub id: String,
    /// Display name
    pub display_name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Name of the compiled kernel implementing it
    pub kernel: String,
    /// Raw inputs; empty for composites
    #[serde(default)]
    pub required_inputs: Vec<InputRequirement>,
    /// Dependency ids; non-empty only for composites
    #[serde(default)]
    pub required_indicator_ids: Vec<String>,
    /// Parameter defaults
    #[serde(default)]
    pub parameters: Params,
    /// Every key `compute` may emit
    #[serde(default)]
    pub output_series_defs: Vec<OutputDef>,
    /// Whether `compute` honours `incremental`
    #[serde(default)]
    pub supports_incremental: bool,
}

impl IndicatorDescriptor {
    /// True when the indicator consumes other indicators' outputs.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        !self.required_indicator_ids.is_empty()
    }

    /// True when bars are a declared input.
    #[must_use]
    pub fn requires_candles(&self) -> bool {
        self.required_inputs
            .iter()
            .any(|r| matches!(r, InputRequirement::Candles { .. }))
    }

    /// True when liquidation buckets are a declared input.
    #[must_use]
    pub fn requires_liquidations(&self) -> bool {
        self.required_inputs
            .iter()
            .any(|r| matches!(r, InputRequirement::Liquidations))
    }

    /// Pinned candle timeframe, if declared.
    #[must_use]
    pub fn candle_timeframe(&self) -> Option<Timeframe> {
        self.required_inputs.iter().find_map(|r| match r {
            InputRequirement::Candles { timeframe } => *timeframe,
            InputRequirement::Liquidations => None,
        })
    }

    /// True when `key` is a declared output.
    #[must_use]
    pub fn declares_output(&self, key: &str) -> bool {
        self.output_series_defs.iter().any(|d| d.id == key)
    }
}

/// Inputs of one `compute` call.
#[derive(Debug, Clone, Copy)]
pub struct ComputeRequest<'a> {
    /// Ordered bars; empty for pure composites
    pub bars: &'a [Bar],
    /// Timeframe of `bars`
    pub timeframe: Timeframe,
    /// Ordered liquidation buckets, when requested
    pub liquidations: Option<&'a [LiquidationBucket]>,
    /// Continue from `last_state` instead of recomputing
    pub incremental: bool,
    /// State returned by the previous call
    pub last_state: Option<&'a IncrementalState>,
    /// Dependency outputs, composites only
    pub indicator_series: Option<&'a DependencyBundle>,
}

impl<'a> ComputeRequest<'a> {
    /// Full recompute over `bars`.
    #[must_use]
    pub fn full(bars: &'a [Bar], timeframe: Timeframe) -> Self {
        Self {
            bars,
            timeframe,
            liquidations: None,
            incremental: false,
            last_state: None,
            indicator_series: None,
        }
    }

    /// Attaches liquidation buckets.
    #[must_use]
    pub fn with_liquidations(mut self, liquidations: &'a [LiquidationBucket]) -> Self {
        self.liquidations = Some(liquidations);
        self
    }

    /// Switches to incremental continuation from `state`.
    #[must_use]
    pub fn continuing(mut self, state: Option<&'a IncrementalState>) -> Self {
        self.incremental = true;
        self.last_state = state;
        self
    }

    /// Attaches a dependency bundle.
    #[must_use]
    pub fn with_bundle(mut self, bundle: &'a DependencyBundle) -> Self {
        self.indicator_series = Some(bundle);
        self
    }
}

/// Result of one `compute` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputeOutput {
    /// Emitted series
    pub series: OutputSeries,
    /// State for the next incremental call
    pub state: Option<IncrementalState>,
}

impl ComputeOutput {
    /// No points and no state.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Capability every indicator implements.
///
/// Instances are cheap and created per call, so `compute` takes `&self` and
/// must not keep state between calls except through the returned
/// [`IncrementalState`].
pub trait Indicator: Send {
    /// Static metadata.
    fn descriptor(&self) -> &IndicatorDescriptor;

    /// Effective parameters (defaults merged with overrides).
    fn parameters(&self) -> &Params;

    /// Computes the indicator.
    ///
    /// # Errors
    ///
    /// Returns an [`IndicatorError`] when a required input is missing or the
    /// inputs are inconsistent. Insufficient history is not an error; it
    /// yields an empty output.
    fn compute(&self, request: &ComputeRequest<'_>) -> Result<ComputeOutput, IndicatorError>;

    /// Indicator id.
    fn id(&self) -> &str {
        &self.descriptor().id
    }
}

/// Overlays `overrides` onto `defaults`.
#[must_use]
pub fn merge_params(defaults: &Params, overrides: &Params) -> Params {
    let mut merged = defaults.clone();
    for (k, v) in overrides {
        merged.insert(k.clone(), v.clone());
    }
    merged
}

/// Integer parameter, clamped to `min`. Accepts integral floats; falls back
/// to `default` when absent or not numeric.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn param_window(params: &Params, key: &str, default: usize, min: usize) -> usize {
    let raw = match params.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        _ => None,
    };
    match raw {
        Some(v) if v <= 0 => min,
        Some(v) => (v as usize).max(min),
        None => default.max(min),
    }
}

/// Unclamped unsigned parameter with a default.
#[must_use]
pub fn param_usize(params: &Params, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default)
}

/// Float parameter with a default.
#[must_use]
pub fn param_f64(params: &Params, key: &str, default: f64) -> f64 {
    params
        .get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// Boolean parameter with a default.
#[must_use]
pub fn param_bool(params: &Params, key: &str, default: bool) -> bool {
    params.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// String parameter with a default, lower-cased.
#[must_use]
pub fn param_str(params: &Params, key: &str, default: &str) -> String {
    params
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_lowercase()
}

/// Builds a [`Params`] map from `(name, value)` pairs.
#[must_use]
pub fn params_from<I, K>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_window_clamps_and_defaults() {
        let params = params_from([
            ("small", json!(3)),
            ("float", json!(40.0)),
            ("neg", json!(-5)),
            ("text", json!("x")),
        ]);
        assert_eq!(param_window(&params, "small", 300, 20), 20);
        assert_eq!(param_window(&params, "float", 300, 20), 40);
        assert_eq!(param_window(&params, "neg", 300, 20), 20);
        assert_eq!(param_window(&params, "text", 300, 20), 300);
        assert_eq!(param_window(&params, "absent", 300, 20), 300);
    }

    #[test]
    fn test_merge_params_overrides() {
        let defaults = params_from([("window", json!(300)), ("normalize", json!(true))]);
        let overrides = params_from([("window", json!(50))]);
        let merged = merge_params(&defaults, &overrides);
        assert_eq!(merged["window"], json!(50));
        assert_eq!(merged["normalize"], json!(true));
    }

    #[test]
    fn test_input_requirement_serde_shape() {
        let req = InputRequirement::Candles {
            timeframe: Some(Timeframe::M1),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, json!({"name": "candles", "timeframe": "1m"}));
        let liq: InputRequirement = serde_json::from_value(json!({"name": "liquidations"})).unwrap();
        assert_eq!(liq, InputRequirement::Liquidations);
    }

    #[test]
    fn test_param_str_lowercases() {
        let params = params_from([("mode", json!("DIFF"))]);
        assert_eq!(param_str(&params, "mode", "ratio"), "diff");
        assert_eq!(param_str(&params, "other", "ratio"), "ratio");
    }
}
