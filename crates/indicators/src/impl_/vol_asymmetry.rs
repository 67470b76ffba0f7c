//! Downside vs upside volatility asymmetry.

use std::collections::VecDeque;

use mm_types::{Bar, OutputSeries};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{any_candles, candle_context, object};
use crate::error::IndicatorError;
use crate::rolling::period_return;
use crate::state::KernelState;
use crate::stream::{run_stream, StreamKernel};
use crate::traits::{
    param_bool, param_f64, param_str, param_window, ComputeOutput, ComputeRequest, Indicator,
    IndicatorDescriptor, OutputDef, Params,
};

/// Kernel name and default id.
pub const KERNEL: &str = "down_up_vol_asym";

const MIN_WINDOW: usize = 20;

/// How the two volatilities are combined into `asym`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AsymmetryMode {
    /// `down / (up + eps)`
    Ratio,
    /// `down - up`
    Diff,
}

/// Count, sum and sum of squares of one side of the return distribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
struct SideStats {
    n: u32,
    sum: f64,
    sumsq: f64,
}

impl SideStats {
    fn add(&mut self, x: f64) {
        self.n += 1;
        self.sum += x;
        self.sumsq += x * x;
    }

    fn remove(&mut self, x: f64) {
        self.n = self.n.saturating_sub(1);
        self.sum -= x;
        self.sumsq -= x * x;
    }

    fn vol(&self) -> f64 {
        if self.n <= 1 {
            return 0.0;
        }
        let n = f64::from(self.n);
        let mean = self.sum / n;
        let var = self.sumsq / n - mean * mean;
        if var > 0.0 {
            var.sqrt()
        } else {
            0.0
        }
    }
}

/// Return window split into negative and positive sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolAsymmetryKernel {
    window: usize,
    use_log_returns: bool,
    mode: AsymmetryMode,
    eps: f64,
    prev_close: Option<f64>,
    returns: VecDeque<f64>,
    down: SideStats,
    up: SideStats,
}

impl VolAsymmetryKernel {
    fn side(&mut self, x: f64) -> Option<&mut SideStats> {
        if x < 0.0 {
            Some(&mut self.down)
        } else if x > 0.0 {
            Some(&mut self.up)
        } else {
            None
        }
    }
}

impl StreamKernel for VolAsymmetryKernel {
    type Item = Bar;

    fn push(&mut self, bar: &Bar, out: &mut OutputSeries) {
        let Some(prev) = self.prev_close.replace(bar.close) else {
            return;
        };
        if self.returns.len() == self.window {
            if let Some(old) = self.returns.pop_front() {
                if let Some(side) = self.side(old) {
                    side.remove(old);
                }
            }
        }
        let r = period_return(prev, bar.close, self.use_log_returns);
        self.returns.push_back(r);
        if let Some(side) = self.side(r) {
            side.add(r);
        }
        if self.returns.len() < self.window {
            return;
        }

        let down_vol = self.down.vol();
        let up_vol = self.up.vol();
        let asym = match self.mode {
            AsymmetryMode::Ratio => down_vol / (up_vol + self.eps),
            AsymmetryMode::Diff => down_vol - up_vol,
        };
        out.push("asym", bar.open_time, asym);
        out.push("down_vol", bar.open_time, down_vol);
        out.push("up_vol", bar.open_time, up_vol);
    }

    fn into_state(self) -> KernelState {
        KernelState::VolAsymmetry(self)
    }

    fn from_state(state: &KernelState) -> Option<Self> {
        match state {
            KernelState::VolAsymmetry(k) => Some(k.clone()),
            _ => None,
        }
    }
}

/// Rolling downside volatility against upside volatility.
///
/// High values mean down moves dominate the window (risk-off), values near
/// one a balanced tape.
#[derive(Debug, Clone)]
pub struct DownUpVolAsymmetry {
    descriptor: IndicatorDescriptor,
    params: Params,
    window: usize,
    use_log_returns: bool,
    mode: AsymmetryMode,
    eps: f64,
}

impl DownUpVolAsymmetry {
    /// Default descriptor.
    #[must_use]
    pub fn template() -> IndicatorDescriptor {
        IndicatorDescriptor {
            id: KERNEL.to_string(),
            display_name: "Down/Up Vol Asymmetry".to_string(),
            description: "Rolling downside vs upside volatility".to_string(),
            kernel: KERNEL.to_string(),
            required_inputs: any_candles(),
            required_indicator_ids: Vec::new(),
            parameters: object(json!({
                "window": 300,
                "use_log_returns": true,
                "mode": "ratio",
                "eps": 1e-12,
            })),
            output_series_defs: vec![
                OutputDef::new("asym", "Asymmetry"),
                OutputDef::new("down_vol", "Down Vol"),
                OutputDef::new("up_vol", "Up Vol"),
            ],
            supports_incremental: true,
        }
    }

    /// Instance with an explicit window and mode.
    #[must_use]
    pub fn new(window: usize, mode: AsymmetryMode) -> Self {
        let label = match mode {
            AsymmetryMode::Ratio => "ratio",
            AsymmetryMode::Diff => "diff",
        };
        let params = object(json!({"window": window, "mode": label}));
        Self::build(&Self::template(), &params, mode)
    }

    /// Builds from effective parameters.
    ///
    /// # Errors
    ///
    /// Returns [`IndicatorError::InvalidParams`] for an unknown `mode`.
    pub fn try_from_params(
        descriptor: &IndicatorDescriptor,
        params: &Params,
    ) -> Result<Self, IndicatorError> {
        let mode = match param_str(params, "mode", "ratio").as_str() {
            "ratio" => AsymmetryMode::Ratio,
            "diff" => AsymmetryMode::Diff,
            other => {
                return Err(IndicatorError::invalid_params(format!(
                    "{KERNEL}: mode must be 'ratio' or 'diff', got '{other}'"
                )))
            }
        };
        Ok(Self::build(descriptor, params, mode))
    }

    fn build(descriptor: &IndicatorDescriptor, params: &Params, mode: AsymmetryMode) -> Self {
        Self {
            descriptor: descriptor.clone(),
            params: params.clone(),
            window: param_window(params, "window", 300, MIN_WINDOW),
            use_log_returns: param_bool(params, "use_log_returns", true),
            mode,
            eps: param_f64(params, "eps", 1e-12).abs(),
        }
    }
}

impl Indicator for DownUpVolAsymmetry {
    fn descriptor(&self) -> &IndicatorDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> &Params {
        &self.params
    }

    fn compute(&self, request: &ComputeRequest<'_>) -> Result<ComputeOutput, IndicatorError> {
        let ctx = candle_context(&self.descriptor, &self.params, request.timeframe);
        run_stream(&ctx, request.bars, request.incremental, request.last_state, || {
            VolAsymmetryKernel {
                window: self.window,
                use_log_returns: self.use_log_returns,
                mode: self.mode,
                eps: self.eps,
                prev_close: None,
                returns: VecDeque::with_capacity(self.window),
                down: SideStats::default(),
                up: SideStats::default(),
            }
        })
    }
}
