//! Kaufman efficiency ratio.

use std::collections::VecDeque;

use mm_types::{Bar, OutputSeries};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{any_candles, candle_context, object};
use crate::error::IndicatorError;
use crate::state::KernelState;
use crate::stream::{run_stream, StreamKernel};
use crate::traits::{
    param_window, ComputeOutput, ComputeRequest, Indicator, IndicatorDescriptor, OutputDef,
    Params,
};

/// Kernel name and default id.
pub const KERNEL: &str = "efficiency_ratio";

/// Last `window` closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyKernel {
    window: usize,
    closes: VecDeque<f64>,
}

impl StreamKernel for EfficiencyKernel {
    type Item = Bar;

    fn push(&mut self, bar: &Bar, out: &mut OutputSeries) {
        if self.closes.len() == self.window {
            self.closes.pop_front();
        }
        self.closes.push_back(bar.close);
        if self.closes.len() < self.window {
            return;
        }
        let (Some(first), Some(last)) = (self.closes.front(), self.closes.back()) else {
            return;
        };
        let net = last - first;
        let path: f64 = self
            .closes
            .iter()
            .zip(self.closes.iter().skip(1))
            .map(|(a, b)| (b - a).abs())
            .sum();
        let er = if path > 0.0 { net / path } else { 0.0 };
        out.push("er", bar.open_time, er);
    }

    fn into_state(self) -> KernelState {
        KernelState::EfficiencyRatio(self)
    }

    fn from_state(state: &KernelState) -> Option<Self> {
        match state {
            KernelState::EfficiencyRatio(k) => Some(k.clone()),
            _ => None,
        }
    }
}

/// Net change over the window divided by the sum of absolute bar-to-bar
/// changes. Signed, in `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct EfficiencyRatio {
    descriptor: IndicatorDescriptor,
    params: Params,
    window: usize,
}

impl EfficiencyRatio {
    /// Default descriptor.
    #[must_use]
    pub fn template() -> IndicatorDescriptor {
        IndicatorDescriptor {
            id: KERNEL.to_string(),
            display_name: "Efficiency Ratio".to_string(),
            description: "Net change / sum of absolute changes (Kaufman-style)".to_string(),
            kernel: KERNEL.to_string(),
            required_inputs: any_candles(),
            required_indicator_ids: Vec::new(),
            parameters: object(json!({"window": 20})),
            output_series_defs: vec![OutputDef::new("er", "Efficiency Ratio")],
            supports_incremental: true,
        }
    }

    /// Instance with an explicit window.
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self::from_params(&Self::template(), &object(json!({"window": window})))
    }

    /// Builds from effective parameters; `window` is clamped to 2.
    #[must_use]
    pub fn from_params(descriptor: &IndicatorDescriptor, params: &Params) -> Self {
        Self {
            descriptor: descriptor.clone(),
            params: params.clone(),
            window: param_window(params, "window", 20, 2),
        }
    }
}

impl Indicator for EfficiencyRatio {
    fn descriptor(&self) -> &IndicatorDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> &Params {
        &self.params
    }

    fn compute(&self, request: &ComputeRequest<'_>) -> Result<ComputeOutput, IndicatorError> {
        let ctx = candle_context(&self.descriptor, &self.params, request.timeframe);
        run_stream(&ctx, request.bars, request.incremental, request.last_state, || {
            EfficiencyKernel {
                window: self.window,
                closes: VecDeque::with_capacity(self.window),
            }
        })
    }
}
