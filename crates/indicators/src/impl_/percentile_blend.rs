//! Generic weighted blend of percentile-ranked dependency series.

use mm_types::{OutputSeries, Point};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::object;
use crate::composite::{dependency_series, forward_fill, NEUTRAL};
use crate::error::IndicatorError;
use crate::rolling::{rolling_percentile, Ema};
use crate::traits::{
    param_usize, param_window, ComputeOutput, ComputeRequest, Indicator, IndicatorDescriptor,
    OutputDef, Params,
};

/// Kernel name.
pub const KERNEL: &str = "percentile_blend";

fn default_weight() -> f64 {
    1.0
}

/// One blended input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendComponent {
    /// Dependency id
    pub id: String,
    /// Series key within that dependency's output
    pub series: String,
    /// Relative weight
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Use `1 - percentile`
    #[serde(default)]
    pub invert: bool,
}

/// Weighted mean of rolling percentile ranks, with neutral fill for
/// components that have not produced a value yet.
#[derive(Debug, Clone)]
pub struct PercentileBlend {
    descriptor: IndicatorDescriptor,
    params: Params,
    components: Vec<BlendComponent>,
    norm_window: usize,
    ema_period: usize,
    min_components: usize,
}

impl PercentileBlend {
    /// Default descriptor. Manifests must supply `components` and the
    /// matching `required_indicator_ids`.
    #[must_use]
    pub fn template() -> IndicatorDescriptor {
        IndicatorDescriptor {
            id: KERNEL.to_string(),
            display_name: "Percentile Blend".to_string(),
            description: "Weighted mean of percentile-ranked dependency series".to_string(),
            kernel: KERNEL.to_string(),
            required_inputs: Vec::new(),
            required_indicator_ids: Vec::new(),
            parameters: object(json!({
                "components": [],
                "norm_window": 500,
                "ema_period": 20,
                "min_components": 1,
            })),
            output_series_defs: vec![
                OutputDef::new("blend", "Blend"),
                OutputDef::new("blend_ema", "Blend (EMA)"),
            ],
            supports_incremental: false,
        }
    }

    /// Builds from effective parameters.
    ///
    /// # Errors
    ///
    /// Returns [`IndicatorError::InvalidParams`] when `components` is empty
    /// or malformed, a weight is negative, or a component names an id the
    /// descriptor does not declare as a dependency.
    pub fn try_from_params(
        descriptor: &IndicatorDescriptor,
        params: &Params,
    ) -> Result<Self, IndicatorError> {
        let raw = params.get("components").cloned().unwrap_or_else(|| json!([]));
        let components: Vec<BlendComponent> = serde_json::from_value(raw).map_err(|e| {
            IndicatorError::invalid_params(format!("{KERNEL}: components: {e}"))
        })?;
        if components.is_empty() {
            return Err(IndicatorError::invalid_params(format!(
                "{KERNEL}: at least one component is required"
            )));
        }
        for c in &components {
            if !c.weight.is_finite() || c.weight < 0.0 {
                return Err(IndicatorError::invalid_params(format!(
                    "{KERNEL}: weight of '{}' must be a non-negative number",
                    c.id
                )));
            }
            if !descriptor.required_indicator_ids.contains(&c.id) {
                return Err(IndicatorError::invalid_params(format!(
                    "{KERNEL}: component '{}' is not a declared dependency",
                    c.id
                )));
            }
        }
        Ok(Self {
            descriptor: descriptor.clone(),
            params: params.clone(),
            norm_window: param_window(params, "norm_window", 500, 2),
            ema_period: param_usize(params, "ema_period", 20).max(1),
            min_components: param_usize(params, "min_components", 1).clamp(1, components.len()),
            components,
        })
    }
}

impl Indicator for PercentileBlend {
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
        let columns: Vec<Vec<Point>> = self
            .components
            .iter()
            .map(|c| {
                let finite: Vec<Point> = dependency_series(bundle, &c.id, &c.series)
                    .unwrap_or_default()
                    .iter()
                    .copied()
                    .filter(|(_, v)| v.is_finite())
                    .collect();
                let ranked = rolling_percentile(&finite, self.norm_window);
                if c.invert {
                    ranked.into_iter().map(|(ts, p)| (ts, 1.0 - p)).collect()
                } else {
                    ranked
                }
            })
            .collect();

        let total_weight: f64 = self.components.iter().map(|c| c.weight).sum();
        let mut ema = Ema::new(self.ema_period);
        let mut series = OutputSeries::new();
        for (ts, row) in forward_fill(&columns) {
            if row.iter().flatten().count() < self.min_components {
                continue;
            }
            let blend = if total_weight > 0.0 {
                self.components
                    .iter()
                    .zip(&row)
                    .map(|(c, v)| c.weight * v.unwrap_or(NEUTRAL))
                    .sum::<f64>()
                    / total_weight
            } else {
                NEUTRAL
            };
            series.push("blend", ts, blend);
            series.push("blend_ema", ts, ema.update(blend));
        }
        Ok(ComputeOutput {
            series: series.prune_empty(),
            state: None,
        })
    }
}
