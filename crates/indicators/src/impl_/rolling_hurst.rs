//! Rolling Hurst exponent of log returns.

use mm_types::{Bar, OutputSeries};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{any_candles, candle_context, object};
use crate::error::IndicatorError;
use crate::rolling::hurst::MIN_HURST_WINDOW;
use crate::rolling::{log_return, RollingHurst};
use crate::state::KernelState;
use crate::stream::{run_stream, StreamKernel};
use crate::traits::{
    param_window, ComputeOutput, ComputeRequest, Indicator, IndicatorDescriptor, OutputDef,
    Params,
};

/// Kernel name and default id.
pub const KERNEL: &str = "rolling_hurst";

/// Last close plus the R/S return window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HurstKernel {
    prev_close: Option<f64>,
    hurst: RollingHurst,
}

impl StreamKernel for HurstKernel {
    type Item = Bar;

    fn push(&mut self, bar: &Bar, out: &mut OutputSeries) {
        let Some(prev) = self.prev_close.replace(bar.close) else {
            return;
        };
        if let Some(h) = self.hurst.push(log_return(prev, bar.close)) {
            out.push("hurst", bar.open_time, h);
        }
    }

    fn into_state(self) -> KernelState {
        KernelState::Hurst(self)
    }

    fn from_state(state: &KernelState) -> Option<Self> {
        match state {
            KernelState::Hurst(k) => Some(k.clone()),
            _ => None,
        }
    }
}

/// R/S Hurst exponent over a rolling window of log returns.
///
/// ~0.5 for a random walk, above for persistent (trending) and below for
/// mean-reverting price action. Degenerate windows are skipped.
#[derive(Debug, Clone)]
pub struct RollingHurstIndicator {
    descriptor: IndicatorDescriptor,
    params: Params,
    window: usize,
}

impl RollingHurstIndicator {
    /// Default descriptor.
    #[must_use]
    pub fn template() -> IndicatorDescriptor {
        IndicatorDescriptor {
            id: KERNEL.to_string(),
            display_name: "Rolling Hurst (R/S)".to_string(),
            description: "Rescaled-range Hurst exponent of log returns".to_string(),
            kernel: KERNEL.to_string(),
            required_inputs: any_candles(),
            required_indicator_ids: Vec::new(),
            parameters: object(json!({"window": 300})),
            output_series_defs: vec![OutputDef::new("hurst", "Hurst")],
            supports_incremental: true,
        }
    }

    /// Instance with an explicit window.
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self::from_params(&Self::template(), &object(json!({"window": window})))
    }

    /// Builds from effective parameters; `window` is clamped to 20.
    #[must_use]
    pub fn from_params(descriptor: &IndicatorDescriptor, params: &Params) -> Self {
        Self {
            descriptor: descriptor.clone(),
            params: params.clone(),
            window: param_window(params, "window", 300, MIN_HURST_WINDOW),
        }
    }
}

impl Indicator for RollingHurstIndicator {
    fn descriptor(&self) -> &IndicatorDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> &Params {
        &self.params
    }

    fn compute(&self, request: &ComputeRequest<'_>) -> Result<ComputeOutput, IndicatorError> {
        let ctx = candle_context(&self.descriptor, &self.params, request.timeframe);
        run_stream(&ctx, request.bars, request.incremental, request.last_state, || {
            HurstKernel {
                prev_close: None,
                hurst: RollingHurst::new(self.window),
            }
        })
    }
}
