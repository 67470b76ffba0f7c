//! Ulcer index and rolling max-drawdown of closes.

use mm_types::{Bar, OutputSeries};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{any_candles, candle_context, object};
use crate::error::IndicatorError;
use crate::rolling::RollingDrawdown;
use crate::state::KernelState;
use crate::stream::{run_stream, StreamKernel};
use crate::traits::{
    param_window, ComputeOutput, ComputeRequest, Indicator, IndicatorDescriptor, OutputDef,
    Params,
};

/// Kernel name of [`UlcerIndex`].
pub const ULCER_KERNEL: &str = "ulcer_index";
/// Kernel name of [`RollingMaxDrawdown`].
pub const MAX_DRAWDOWN_KERNEL: &str = "rolling_max_drawdown";

const MIN_WINDOW: usize = 10;

/// Which drawdown statistic a kernel reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawdownStat {
    /// RMS of percentage drawdown, key `ui`
    Ulcer,
    /// Most negative drawdown, key `mdd`
    MaxDrawdown,
}

impl DrawdownStat {
    fn key(self) -> &'static str {
        match self {
            DrawdownStat::Ulcer => "ui",
            DrawdownStat::MaxDrawdown => "mdd",
        }
    }
}

/// Close window plus the statistic to report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownKernel {
    stat: DrawdownStat,
    prices: RollingDrawdown,
}

impl StreamKernel for DrawdownKernel {
    type Item = Bar;

    fn push(&mut self, bar: &Bar, out: &mut OutputSeries) {
        if let Some(snap) = self.prices.push(bar.close) {
            let value = match self.stat {
                DrawdownStat::Ulcer => snap.ulcer_index,
                DrawdownStat::MaxDrawdown => snap.max_drawdown,
            };
            out.push(self.stat.key(), bar.open_time, value);
        }
    }

    fn into_state(self) -> KernelState {
        KernelState::Drawdown(self)
    }

    fn from_state(state: &KernelState) -> Option<Self> {
        match state {
            KernelState::Drawdown(k) => Some(k.clone()),
            _ => None,
        }
    }
}

fn drawdown_compute(
    descriptor: &IndicatorDescriptor,
    params: &Params,
    stat: DrawdownStat,
    window: usize,
    request: &ComputeRequest<'_>,
) -> Result<ComputeOutput, IndicatorError> {
    let ctx = candle_context(descriptor, params, request.timeframe);
    run_stream(&ctx, request.bars, request.incremental, request.last_state, || {
        DrawdownKernel {
            stat,
            prices: RollingDrawdown::new(window),
        }
    })
}

/// Ulcer index: root-mean-square percentage drawdown over a window.
#[derive(Debug, Clone)]
pub struct UlcerIndex {
    descriptor: IndicatorDescriptor,
    params: Params,
    window: usize,
}

impl UlcerIndex {
    /// Default descriptor.
    #[must_use]
    pub fn template() -> IndicatorDescriptor {
        IndicatorDescriptor {
            id: ULCER_KERNEL.to_string(),
            display_name: "Ulcer Index".to_string(),
            description: "RMS of percentage drawdown from the rolling peak".to_string(),
            kernel: ULCER_KERNEL.to_string(),
            required_inputs: any_candles(),
            required_indicator_ids: Vec::new(),
            parameters: object(json!({"window": 300})),
            output_series_defs: vec![OutputDef::new("ui", "Ulcer Index")],
            supports_incremental: true,
        }
    }

    /// Instance with an explicit window.
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self::from_params(&Self::template(), &object(json!({"window": window})))
    }

    /// Builds from effective parameters; `window` is clamped to 10.
    #[must_use]
    pub fn from_params(descriptor: &IndicatorDescriptor, params: &Params) -> Self {
        Self {
            descriptor: descriptor.clone(),
            params: params.clone(),
            window: param_window(params, "window", 300, MIN_WINDOW),
        }
    }
}

impl Indicator for UlcerIndex {
    fn descriptor(&self) -> &IndicatorDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> &Params {
        &self.params
    }

    fn compute(&self, request: &ComputeRequest<'_>) -> Result<ComputeOutput, IndicatorError> {
        drawdown_compute(
            &self.descriptor,
            &self.params,
            DrawdownStat::Ulcer,
            self.window,
            request,
        )
    }
}

/// Most negative `close / peak - 1` over a rolling window.
#[derive(Debug, Clone)]
pub struct RollingMaxDrawdown {
    descriptor: IndicatorDescriptor,
    params: Params,
    window: usize,
}

impl RollingMaxDrawdown {
    /// Default descriptor.
    #[must_use]
    pub fn template() -> IndicatorDescriptor {
        IndicatorDescriptor {
            id: MAX_DRAWDOWN_KERNEL.to_string(),
            display_name: "Rolling Max Drawdown".to_string(),
            description: "Worst peak-to-trough decline within the window".to_string(),
            kernel: MAX_DRAWDOWN_KERNEL.to_string(),
            required_inputs: any_candles(),
            required_indicator_ids: Vec::new(),
            parameters: object(json!({"window": 300})),
            output_series_defs: vec![OutputDef::new("mdd", "Max Drawdown")],
            supports_incremental: true,
        }
    }

    /// Instance with an explicit window.
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self::from_params(&Self::template(), &object(json!({"window": window})))
    }

    /// Builds from effective parameters; `window` is clamped to 10.
    #[must_use]
    pub fn from_params(descriptor: &IndicatorDescriptor, params: &Params) -> Self {
        Self {
            descriptor: descriptor.clone(),
            params: params.clone(),
            window: param_window(params, "window", 300, MIN_WINDOW),
        }
    }
}

impl Indicator for RollingMaxDrawdown {
    fn descriptor(&self) -> &IndicatorDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> &Params {
        &self.params
    }

    fn compute(&self, request: &ComputeRequest<'_>) -> Result<ComputeOutput, IndicatorError> {
        drawdown_compute(
            &self.descriptor,
            &self.params,
            DrawdownStat::MaxDrawdown,
            self.window,
            request,
        )
    }
}
