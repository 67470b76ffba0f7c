//! Volatility of volatility: rolling deviation of a Wilder ATR.

use mm_types::{Bar, OutputSeries};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{any_candles, candle_context, object};
use crate::error::IndicatorError;
use crate::rolling::{true_range, RollingStd, WilderAtr};
use crate::state::KernelState;
use crate::stream::{run_stream, StreamKernel};
use crate::traits::{
    param_window, ComputeOutput, ComputeRequest, Indicator, IndicatorDescriptor, OutputDef,
    Params,
};

/// Kernel name and default id.
pub const KERNEL: &str = "vol_of_vol";

/// True range of the first bar uses its own open as the previous close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolOfVolKernel {
    prev_close: Option<f64>,
    atr: WilderAtr,
    atr_std: RollingStd,
}

impl VolOfVolKernel {
    /// Creates a cold kernel.
    #[must_use]
    pub fn new(vol_window: usize, vov_window: usize) -> Self {
        Self {
            prev_close: None,
            atr: WilderAtr::new(vol_window),
            atr_std: RollingStd::new(vov_window),
        }
    }
}

impl StreamKernel for VolOfVolKernel {
    type Item = Bar;

    fn push(&mut self, bar: &Bar, out: &mut OutputSeries) {
        let prev_close = self.prev_close.unwrap_or(bar.open);
        self.prev_close = Some(bar.close);
        let tr = true_range(bar.high, bar.low, prev_close);
        if let Some(atr) = self.atr.update(tr) {
            if let Some(vov) = self.atr_std.update(atr) {
                out.push("vov", bar.open_time, vov);
            }
        }
    }

    fn into_state(self) -> KernelState {
        KernelState::VolOfVol(self)
    }

    fn from_state(state: &KernelState) -> Option<Self> {
        match state {
            KernelState::VolOfVol(k) => Some(k.clone()),
            _ => None,
        }
    }
}

/// Rolling standard deviation of a Wilder-smoothed ATR.
#[derive(Debug, Clone)]
pub struct VolOfVol {
    descriptor: IndicatorDescriptor,
    params: Params,
    vol_window: usize,
    vov_window: usize,
}

impl VolOfVol {
    /// Default descriptor.
    #[must_use]
    pub fn template() -> IndicatorDescriptor {
        IndicatorDescriptor {
            id: KERNEL.to_string(),
            display_name: "Vol of Vol".to_string(),
            description: "Rolling standard deviation of ATR (Wilder)".to_string(),
            kernel: KERNEL.to_string(),
            required_inputs: any_candles(),
            required_indicator_ids: Vec::new(),
            parameters: object(json!({"vol_window": 20, "vov_window": 30})),
            output_series_defs: vec![OutputDef::new("vov", "Vol of Vol")],
            supports_incremental: true,
        }
    }

    /// Instance with explicit windows and the default descriptor.
    #[must_use]
    pub fn new(vol_window: usize, vov_window: usize) -> Self {
        let params = object(json!({"vol_window": vol_window, "vov_window": vov_window}));
        Self::from_params(&Self::template(), &params)
    }

    /// Builds from effective parameters; windows below 2 are clamped.
    #[must_use]
    pub fn from_params(descriptor: &IndicatorDescriptor, params: &Params) -> Self {
        Self {
            descriptor: descriptor.clone(),
            params: params.clone(),
            vol_window: param_window(params, "vol_window", 20, 2),
            vov_window: param_window(params, "vov_window", 30, 2),
        }
    }

    /// Bars needed before the first value.
    #[must_use]
    pub fn warmup(&self) -> usize {
        self.vol_window + self.vov_window - 1
    }
}

impl Indicator for VolOfVol {
    fn descriptor(&self) -> &IndicatorDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> &Params {
        &self.params
    }

    fn compute(&self, request: &ComputeRequest<'_>) -> Result<ComputeOutput, IndicatorError> {
        let ctx = candle_context(&self.descriptor, &self.params, request.timeframe);
        run_stream(&ctx, request.bars, request.incremental, request.last_state, || {
            VolOfVolKernel::new(self.vol_window, self.vov_window)
        })
    }
}
