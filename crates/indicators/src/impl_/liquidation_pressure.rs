//! Liquidation pressure from per-minute liquidation buckets.

use std::collections::VecDeque;

use mm_types::{LiquidationBucket, OutputSeries, Timeframe};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::object;
use crate::error::IndicatorError;
use crate::state::KernelState;
use crate::stream::{run_stream, StreamContext, StreamKernel};
use crate::traits::{
    param_window, ComputeOutput, ComputeRequest, Indicator, IndicatorDescriptor,
    InputRequirement, OutputDef, Params,
};

/// Kernel name and default id.
pub const KERNEL: &str = "liquidation_pressure";

/// Window of recent bucket totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationKernel {
    z_window: usize,
    totals: VecDeque<f64>,
}

impl LiquidationKernel {
    #[allow(clippy::cast_precision_loss)]
    fn z_score(&self, x: f64) -> f64 {
        let n = self.totals.len() as f64;
        let mean = self.totals.iter().sum::<f64>() / n;
        let var = self.totals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = if var > 0.0 { var.sqrt() } else { 1.0 };
        (x - mean) / std
    }
}

impl StreamKernel for LiquidationKernel {
    type Item = LiquidationBucket;

    fn push(&mut self, bucket: &LiquidationBucket, out: &mut OutputSeries) {
        let ts = bucket.open_time;
        out.push("total_notional", ts, bucket.total_notional);
        out.push("imbalance", ts, bucket.imbalance);

        if self.totals.len() == self.z_window {
            self.totals.pop_front();
        }
        self.totals.push_back(bucket.total_notional);
        if self.totals.len() == self.z_window {
            out.push("z_score", ts, self.z_score(bucket.total_notional));
        }
    }

    fn into_state(self) -> KernelState {
        KernelState::LiquidationPressure(self)
    }

    fn from_state(state: &KernelState) -> Option<Self> {
        match state {
            KernelState::LiquidationPressure(k) => Some(k.clone()),
            _ => None,
        }
    }

    // buckets exist only for minutes with liquidations
    fn needs_anchor() -> bool {
        false
    }
}

/// Total notional, long/short imbalance and a rolling z-score of the total.
#[derive(Debug, Clone)]
pub struct LiquidationPressure {
    descriptor: IndicatorDescriptor,
    params: Params,
    z_window: usize,
}

impl LiquidationPressure {
    /// Default descriptor.
    #[must_use]
    pub fn template() -> IndicatorDescriptor {
        IndicatorDescriptor {
            id: KERNEL.to_string(),
            display_name: "Liquidation Pressure".to_string(),
            description: "Total notional, imbalance and z-score from the liquidation feed"
                .to_string(),
            kernel: KERNEL.to_string(),
            required_inputs: vec![InputRequirement::Liquidations],
            required_indicator_ids: Vec::new(),
            parameters: object(json!({"z_window": 60})),
            output_series_defs: vec![
                OutputDef::new("total_notional", "Total Notional"),
                OutputDef::new("imbalance", "Imbalance"),
                OutputDef::new("z_score", "Total Z-Score"),
            ],
            supports_incremental: true,
        }
    }

    /// Instance with an explicit z-score window.
    #[must_use]
    pub fn new(z_window: usize) -> Self {
        Self::from_params(&Self::template(), &object(json!({"z_window": z_window})))
    }

    /// Builds from effective parameters; `z_window` is clamped to 2.
    #[must_use]
    pub fn from_params(descriptor: &IndicatorDescriptor, params: &Params) -> Self {
        Self {
            descriptor: descriptor.clone(),
            params: params.clone(),
            z_window: param_window(params, "z_window", 60, 2),
        }
    }
}

impl Indicator for LiquidationPressure {
    fn descriptor(&self) -> &IndicatorDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> &Params {
        &self.params
    }

    fn compute(&self, request: &ComputeRequest<'_>) -> Result<ComputeOutput, IndicatorError> {
        let ctx = StreamContext {
            indicator_id: &self.descriptor.id,
            params: &self.params,
            timeframe: None,
            interval_ms: Timeframe::M1.to_millis(),
        };
        let buckets = request.liquidations.unwrap_or(&[]);
        run_stream(&ctx, buckets, request.incremental, request.last_state, || {
            LiquidationKernel {
                z_window: self.z_window,
                totals: VecDeque::with_capacity(self.z_window),
            }
        })
    }
}
