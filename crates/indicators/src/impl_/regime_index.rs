//! Market regime index: a weighted blend of percentile-normalised risk
//! components.
//!
//! Components and grouping:
//!
//! | group     | dependency             | series   | transform |
//! |-----------|------------------------|----------|-----------|
//! | stress    | `vol_of_vol`           | `vov`    |           |
//! | stress    | `realized_kurtosis`    | `kurt`   |           |
//! | stress    | `amihud_illiquidity`   | `amihud` |           |
//! | stress    | `ulcer_index`          | `ui`     |           |
//! | structure | `perm_entropy`         | `pe`     | `1 - x`   |
//! | structure | `rolling_hurst`        | `hurst`  |           |
//! | downside  | `down_up_vol_asym`     | `asym`   |           |
//! | downside  | `rolling_max_drawdown` | `mdd`    | `abs`     |
//!
//! Every component is mapped to `[0, 1]` by a rolling percentile rank, the
//! components are aligned on the union of their timestamps with forward
//! fill, and a missing component contributes [`NEUTRAL`].
//!
//! `regime = w_stress * stress + w_downside * downside
//!         + w_anti_structure * (1 - structure)`, clamped to `[0, 1]`, plus a
//! fast and a slow EMA of it.

use mm_types::{OutputSeries, Point};
use serde_json::json;

use super::object;
use crate::composite::{dependency_series, forward_fill, mean, NEUTRAL};
use crate::error::IndicatorError;
use crate::rolling::{rolling_percentile, Ema};
use crate::traits::{
    param_f64, param_usize, param_window, ComputeOutput, ComputeRequest, Indicator,
    IndicatorDescriptor, OutputDef, Params,
};

/// Kernel name and default id.
pub const KERNEL: &str = "regime_index";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Stress,
    Structure,
    Downside,
}

#[derive(Debug, Clone, Copy)]
enum Transform {
    Identity,
    OneMinus,
    Abs,
}

struct Component {
    dependency: &'static str,
    series: &'static str,
    transform: Transform,
    group: Group,
}

const fn component(
    dependency: &'static str,
    series: &'static str,
    transform: Transform,
    group: Group,
) -> Component {
    Component {
        dependency,
        series,
        transform,
        group,
    }
}

const COMPONENTS: [Component; 8] = [
    component("vol_of_vol", "vov", Transform::Identity, Group::Stress),
    component("perm_entropy", "pe", Transform::OneMinus, Group::Structure),
    component("realized_kurtosis", "kurt", Transform::Identity, Group::Stress),
    component("amihud_illiquidity", "amihud", Transform::Identity, Group::Stress),
    component("down_up_vol_asym", "asym", Transform::Identity, Group::Downside),
    component("rolling_hurst", "hurst", Transform::Identity, Group::Structure),
    component("ulcer_index", "ui", Transform::Identity, Group::Stress),
    component("rolling_max_drawdown", "mdd", Transform::Abs, Group::Downside),
];

const WINDOW_EXEMPT: &str = "rolling_max_drawdown";

/// Composite regime score in `[0, 1]`; higher is riskier.
#[derive(Debug, Clone)]
pub struct RegimeIndex {
    descriptor: IndicatorDescriptor,
    params: Params,
    norm_window: usize,
    min_components: usize,
    fast_period: usize,
    slow_period: usize,
    w_stress: f64,
    w_downside: f64,
    w_anti_structure: f64,
}

impl RegimeIndex {
    /// Default descriptor.
    #[must_use]
    pub fn template() -> IndicatorDescriptor {
        IndicatorDescriptor {
            id: KERNEL.to_string(),
            display_name: "Regime Index".to_string(),
            description: "Weighted blend of stress, downside and anti-structure percentiles"
                .to_string(),
            kernel: KERNEL.to_string(),
            required_inputs: Vec::new(),
            required_indicator_ids: COMPONENTS
                .iter()
                .map(|c| c.dependency.to_string())
                .collect(),
            parameters: object(json!({
                "norm_window": 100_000,
                "min_components": 1,
                "fast_ema_period": 20,
                "slow_ema_period": 200,
                "w_stress": 0.6,
                "w_downside": 0.3,
                "w_anti_structure": 0.1,
            })),
            output_series_defs: vec![
                OutputDef::new("regime", "Regime Index"),
                OutputDef::new("regime_fast", "Regime (fast EMA)"),
                OutputDef::new("regime_slow", "Regime (slow EMA)"),
            ],
            supports_incremental: false,
        }
    }

    /// Instance with default parameters.
    #[must_use]
    pub fn with_defaults() -> Self {
        let template = Self::template();
        let params = template.parameters.clone();
        Self::from_params(&template, &params)
    }

    /// Builds from effective parameters, clamping every knob to its range.
    #[must_use]
    pub fn from_params(descriptor: &IndicatorDescriptor, params: &Params) -> Self {
        Self {
            descriptor: descriptor.clone(),
            params: params.clone(),
            norm_window: param_window(params, "norm_window", 100_000, 2),
            min_components: param_usize(params, "min_components", 1).clamp(1, COMPONENTS.len()),
            fast_period: param_usize(params, "fast_ema_period", 20).clamp(1, 30),
            slow_period: param_usize(params, "slow_ema_period", 200).clamp(1, 300),
            w_stress: param_f64(params, "w_stress", 0.6),
            w_downside: param_f64(params, "w_downside", 0.3),
            w_anti_structure: param_f64(params, "w_anti_structure", 0.1),
        }
    }

    fn transformed(points: &[Point], transform: Transform) -> Vec<Point> {
        points
            .iter()
            .map(|&(ts, v)| {
                let v = match transform {
                    Transform::Identity => v,
                    Transform::OneMinus => 1.0 - v,
                    Transform::Abs => v.abs(),
                };
                (ts, v)
            })
            .filter(|(_, v)| v.is_finite())
            .collect()
    }
}

impl Indicator for RegimeIndex {
    fn descriptor(&self) -> &IndicatorDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> &Params {
        &self.params
    }

    fn compute(&self, request: &ComputeRequest<'_>) -> Result<ComputeOutput, IndicatorError> {
        let Some(bundle) = request.indicator_series else {
            return Ok(ComputeOutput::empty());
        };

        let raw: Vec<Vec<Point>> = COMPONENTS
            .iter()
            .map(|c| {
                dependency_series(bundle, c.dependency, c.series)
                    .map(|points| Self::transformed(points, c.transform))
                    .unwrap_or_default()
            })
            .collect();
        if raw.iter().all(Vec::is_empty) {
            return Ok(ComputeOutput::empty());
        }

        // Short histories shrink the normalisation window so something is
        // still emitted. Drawdown does not take part in the sizing.
        let shortest = COMPONENTS
            .iter()
            .zip(&raw)
            .filter(|(c, points)| c.dependency != WINDOW_EXEMPT && !points.is_empty())
            .map(|(_, points)| points.len())
            .min();
        let norm = shortest.map_or(self.norm_window, |n| self.norm_window.min((n / 2).max(10)));
        let columns: Vec<Vec<Point>> = raw
            .iter()
            .map(|points| rolling_percentile(points, norm))
            .collect();

        let mut fast = Ema::new(self.fast_period);
        let mut slow = Ema::new(self.slow_period);
        let mut series = OutputSeries::new();
        for (ts, row) in forward_fill(&columns) {
            if row.iter().flatten().count() < self.min_components {
                continue;
            }
            let group_mean = |group: Group| {
                let values: Vec<f64> = COMPONENTS
                    .iter()
                    .zip(&row)
                    .filter(|(c, _)| c.group == group)
                    .map(|(_, v)| v.unwrap_or(NEUTRAL))
                    .collect();
                mean(&values).unwrap_or(NEUTRAL)
            };
            let stress = group_mean(Group::Stress);
            let structure = group_mean(Group::Structure);
            let downside = group_mean(Group::Downside);

            let regime = (self.w_stress * stress
                + self.w_downside * downside
                + self.w_anti_structure * (1.0 - structure))
                .clamp(0.0, 1.0);
            series.push("regime", ts, regime);
            series.push("regime_fast", ts, fast.update(regime));
            series.push("regime_slow", ts, slow.update(regime));
        }

        Ok(ComputeOutput {
            series: series.prune_empty(),
            state: None,
        })
    }
}
