//! Permutation entropy of closes.

use mm_types::{Bar, OutputSeries};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{any_candles, candle_context, object};
use crate::error::IndicatorError;
use crate::rolling::PermutationEntropy;
use crate::state::KernelState;
use crate::stream::{run_stream, StreamKernel};
use crate::traits::{
    param_bool, param_usize, ComputeOutput, ComputeRequest, Indicator, IndicatorDescriptor,
    OutputDef, Params,
};

/// Kernel name and default id.
pub const KERNEL: &str = "perm_entropy";

/// Close-driven wrapper around [`PermutationEntropy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermEntropyKernel {
    pe: PermutationEntropy,
}

impl StreamKernel for PermEntropyKernel {
    type Item = Bar;

    fn push(&mut self, bar: &Bar, out: &mut OutputSeries) {
        if !bar.close.is_finite() {
            return;
        }
        if let Some(h) = self.pe.push(bar.close) {
            out.push("pe", bar.open_time, h);
        }
    }

    fn into_state(self) -> KernelState {
        KernelState::PermEntropy(self)
    }

    fn from_state(state: &KernelState) -> Option<Self> {
        match state {
            KernelState::PermEntropy(k) => Some(k.clone()),
            _ => None,
        }
    }
}

/// Rolling ordinal-pattern entropy, normalised to `[0, 1]` by default.
///
/// Valid for `3 <= embed_dim <= 7`, `delay >= 1`, `window >= 10`; any
/// other combination emits nothing.
#[derive(Debug, Clone)]
pub struct PermEntropy {
    descriptor: IndicatorDescriptor,
    params: Params,
    prototype: Option<PermutationEntropy>,
}

impl PermEntropy {
    /// Default descriptor.
    #[must_use]
    pub fn template() -> IndicatorDescriptor {
        IndicatorDescriptor {
            id: KERNEL.to_string(),
            display_name: "Permutation Entropy".to_string(),
            description: "Ordinal-pattern entropy of closes, normalised by ln(m!)".to_string(),
            kernel: KERNEL.to_string(),
            required_inputs: any_candles(),
            required_indicator_ids: Vec::new(),
            parameters: object(json!({
                "embed_dim": 5,
                "delay": 1,
                "window": 300,
                "normalize": true,
            })),
            output_series_defs: vec![OutputDef::new("pe", "Permutation Entropy")],
            supports_incremental: true,
        }
    }

    /// Instance with explicit parameters and the default descriptor.
    #[must_use]
    pub fn new(embed_dim: usize, delay: usize, window: usize, normalize: bool) -> Self {
        let params = object(json!({
            "embed_dim": embed_dim,
            "delay": delay,
            "window": window,
            "normalize": normalize,
        }));
        Self::from_params(&Self::template(), &params)
    }

    /// Builds from effective parameters.
    #[must_use]
    pub fn from_params(descriptor: &IndicatorDescriptor, params: &Params) -> Self {
        let prototype = PermutationEntropy::new(
            param_usize(params, "embed_dim", 5),
            param_usize(params, "delay", 1),
            param_usize(params, "window", 300),
            param_bool(params, "normalize", true),
        );
        Self {
            descriptor: descriptor.clone(),
            params: params.clone(),
            prototype,
        }
    }

    /// False when the parameters fall outside the supported ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.prototype.is_some()
    }
}

impl Indicator for PermEntropy {
    fn descriptor(&self) -> &IndicatorDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> &Params {
        &self.params
    }

    fn compute(&self, request: &ComputeRequest<'_>) -> Result<ComputeOutput, IndicatorError> {
        let Some(prototype) = &self.prototype else {
            return Ok(ComputeOutput::empty());
        };
        let ctx = candle_context(&self.descriptor, &self.params, request.timeframe);
        run_stream(&ctx, request.bars, request.incremental, request.last_state, || {
            PermEntropyKernel {
                pe: prototype.clone(),
            }
        })
    }
}
