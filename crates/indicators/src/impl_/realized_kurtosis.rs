//! Realized kurtosis (and skewness) of bar returns.

use mm_types::{Bar, OutputSeries};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{any_candles, candle_context, object};
use crate::error::IndicatorError;
use crate::rolling::{period_return, RollingMoments};
use crate::state::KernelState;
use crate::stream::{run_stream, StreamKernel};
use crate::traits::{
    param_bool, param_window, ComputeOutput, ComputeRequest, Indicator, IndicatorDescriptor,
    OutputDef, Params,
};

/// Kernel name and default id.
pub const KERNEL: &str = "realized_kurtosis";

const MIN_WINDOW: usize = 20;

/// Moments of the last `window` returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KurtosisKernel {
    use_log_returns: bool,
    use_excess: bool,
    prev_close: Option<f64>,
    moments: RollingMoments,
}

impl StreamKernel for KurtosisKernel {
    type Item = Bar;

    fn push(&mut self, bar: &Bar, out: &mut OutputSeries) {
        let Some(prev) = self.prev_close.replace(bar.close) else {
            return;
        };
        self.moments
            .push(period_return(prev, bar.close, self.use_log_returns));
        if !self.moments.is_full() {
            return;
        }
        if let Some(k) = self.moments.kurtosis(self.use_excess) {
            out.push("kurt", bar.open_time, k);
        }
        if let Some(s) = self.moments.skewness() {
            out.push("skew", bar.open_time, s);
        }
    }

    fn into_state(self) -> KernelState {
        KernelState::Kurtosis(self)
    }

    fn from_state(state: &KernelState) -> Option<Self> {
        match state {
            KernelState::Kurtosis(k) => Some(k.clone()),
            _ => None,
        }
    }
}

/// Rolling kurtosis of log (or simple) returns.
#[derive(Debug, Clone)]
pub struct RealizedKurtosis {
    descriptor: IndicatorDescriptor,
    params: Params,
    window: usize,
    use_excess: bool,
    use_log_returns: bool,
}

impl RealizedKurtosis {
    /// Default descriptor.
    #[must_use]
    pub fn template() -> IndicatorDescriptor {
        IndicatorDescriptor {
            id: KERNEL.to_string(),
            display_name: "Realized Kurtosis".to_string(),
            description: "Rolling kurtosis of returns (tail-risk detector)".to_string(),
            kernel: KERNEL.to_string(),
            required_inputs: any_candles(),
            required_indicator_ids: Vec::new(),
            parameters: object(json!({
                "window": 300,
                "use_excess": true,
                "use_log_returns": true,
            })),
            output_series_defs: vec![
                OutputDef::new("kurt", "Kurtosis"),
                OutputDef::new("skew", "Skewness"),
            ],
            supports_incremental: true,
        }
    }

    /// Instance with an explicit window and default flags.
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
            window: param_window(params, "window", 300, MIN_WINDOW),
            use_excess: param_bool(params, "use_excess", true),
            use_log_returns: param_bool(params, "use_log_returns", true),
        }
    }
}

impl Indicator for RealizedKurtosis {
    fn descriptor(&self) -> &IndicatorDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> &Params {
        &self.params
    }

    fn compute(&self, request: &ComputeRequest<'_>) -> Result<ComputeOutput, IndicatorError> {
        let ctx = candle_context(&self.descriptor, &self.params, request.timeframe);
        run_stream(&ctx, request.bars, request.incremental, request.last_state, || {
            KurtosisKernel {
                use_log_returns: self.use_log_returns,
                use_excess: self.use_excess,
                prev_close: None,
                moments: RollingMoments::new(self.window),
            }
        })
    }
}
