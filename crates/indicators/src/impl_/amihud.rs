//! Amihud illiquidity proxy.

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
pub const KERNEL: &str = "amihud_illiquidity";

const MIN_WINDOW: usize = 5;

/// `|ln(c / c_prev)| / (c * volume)`, or `None` when any input is unusable.
fn illiquidity(prev_close: f64, close: f64, volume: f64) -> Option<f64> {
    if prev_close <= 0.0 || close <= 0.0 || volume <= 0.0 {
        return None;
    }
    let value = (close / prev_close).ln().abs() / (close * volume);
    value.is_finite().then_some(value)
}

/// Last close plus the window of valid illiquidity points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmihudKernel {
    window: usize,
    prev_close: Option<f64>,
    ratios: VecDeque<f64>,
    sum: f64,
}

impl StreamKernel for AmihudKernel {
    type Item = Bar;

    #[allow(clippy::cast_precision_loss)]
    fn push(&mut self, bar: &Bar, out: &mut OutputSeries) {
        let Some(prev) = self.prev_close.replace(bar.close) else {
            return;
        };
        let Some(value) = illiquidity(prev, bar.close, bar.volume) else {
            return;
        };
        if self.ratios.len() == self.window {
            if let Some(old) = self.ratios.pop_front() {
                self.sum -= old;
            }
        }
        self.ratios.push_back(value);
        self.sum += value;
        if self.ratios.len() == self.window {
            let mean = self.sum / self.window as f64;
            if mean.is_finite() {
                out.push("amihud", bar.open_time, mean.max(0.0));
            }
        }
    }

    fn into_state(self) -> KernelState {
        KernelState::Amihud(self)
    }

    fn from_state(state: &KernelState) -> Option<Self> {
        match state {
            KernelState::Amihud(k) => Some(k.clone()),
            _ => None,
        }
    }
}

/// Rolling mean of absolute log return per unit of traded value.
///
/// Bars with non-positive close or volume are skipped, so the window covers
/// the last `window` valid points rather than the last `window` bars.
#[derive(Debug, Clone)]
pub struct AmihudIlliquidity {
    descriptor: IndicatorDescriptor,
    params: Params,
    window: usize,
}

impl AmihudIlliquidity {
    /// Default descriptor.
    #[must_use]
    pub fn template() -> IndicatorDescriptor {
        IndicatorDescriptor {
            id: KERNEL.to_string(),
            display_name: "Amihud Illiquidity".to_string(),
            description: "Rolling mean of |log return| / (close * volume)".to_string(),
            kernel: KERNEL.to_string(),
            required_inputs: any_candles(),
            required_indicator_ids: Vec::new(),
            parameters: object(json!({"window": 300})),
            output_series_defs: vec![OutputDef::new("amihud", "Amihud")],
            supports_incremental: true,
        }
    }

    /// Instance with an explicit window.
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self::from_params(&Self::template(), &object(json!({"window": window})))
    }

    /// Builds from effective parameters; `window` is clamped to 5.
    #[must_use]
    pub fn from_params(descriptor: &IndicatorDescriptor, params: &Params) -> Self {
        Self {
            descriptor: descriptor.clone(),
            params: params.clone(),
            window: param_window(params, "window", 300, MIN_WINDOW),
        }
    }
}

impl Indicator for AmihudIlliquidity {
    fn descriptor(&self) -> &IndicatorDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> &Params {
        &self.params
    }

    fn compute(&self, request: &ComputeRequest<'_>) -> Result<ComputeOutput, IndicatorError> {
        let ctx = candle_context(&self.descriptor, &self.params, request.timeframe);
        run_stream(&ctx, request.bars, request.incremental, request.last_state, || {
            AmihudKernel {
                window: self.window,
                prev_close: None,
                ratios: VecDeque::with_capacity(self.window),
                sum: 0.0,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mm_types::Timeframe;

    #[test]
    fn test_illiquidity_point() {
        let v = illiquidity(100.0, 110.0, 2.0).unwrap();
        assert_relative_eq!(v, (1.1f64).ln() / 220.0, epsilon = 1e-15);
        assert!(illiquidity(100.0, 110.0, 0.0).is_none());
        assert!(illiquidity(0.0, 110.0, 1.0).is_none());
    }

    #[test]
    fn test_zero_volume_bars_skipped() {
        let bars: Vec<Bar> = (0..12)
            .map(|i| {
                let volume = if i % 2 == 0 { 0.0 } else { 10.0 };
                Bar::flat(i * 60_000, 100.0 + i as f64, volume)
            })
            .collect();
        let out = AmihudIlliquidity::new(5)
            .compute(&ComputeRequest::full(&bars, Timeframe::M1))
            .unwrap();
        // valid points at odd bars 1,3,5,7,9,11 -> full window from bar 9
        let series = out.series.get("amihud").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].0, 9 * 60_000);
    }
}
