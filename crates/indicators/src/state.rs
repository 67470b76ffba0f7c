//! Typed incremental state.
//!
//! [`IncrementalState`] is the envelope a streaming indicator hands back to
//! its caller. The kernel buffers live in [`KernelState`], one variant per
//! indicator family, so a state produced by one family can never be
//! mistaken for another. JSON helpers are provided for hosts that persist
//! state between process runs.

use mm_types::Timeframe;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::IndicatorError;
use crate::impl_::{
    amihud::AmihudKernel, drawdown::DrawdownKernel, efficiency_ratio::EfficiencyKernel,
    liquidation_pressure::LiquidationKernel, perm_entropy::PermEntropyKernel,
    realized_kurtosis::KurtosisKernel, rolling_hurst::HurstKernel,
    vol_asymmetry::VolAsymmetryKernel, vol_of_vol::VolOfVolKernel,
};
use crate::traits::Params;

/// Carry-over between two calls of the same indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncrementalState {
    /// Indicator that produced the state
    pub indicator_id: String,
    /// Timeframe of the bars consumed, `None` for liquidation streams
    #[serde(default)]
    pub timeframe: Option<Timeframe>,
    /// Effective parameters at the time
    #[serde(default)]
    pub params: Params,
    /// Open time of the last item consumed
    pub last_open_time: i64,
    /// Kernel buffers
    pub kernel: KernelState,
}

/// Kernel buffers per indicator family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", content = "data", rename_all = "snake_case")]
pub enum KernelState {
    /// ATR and its rolling deviation
    VolOfVol(VolOfVolKernel),
    /// Ordinal pattern histogram
    PermEntropy(PermEntropyKernel),
    /// Return moments
    Kurtosis(KurtosisKernel),
    /// Return window for R/S
    Hurst(HurstKernel),
    /// Price window for drawdown statistics
    Drawdown(DrawdownKernel),
    /// Split return statistics
    VolAsymmetry(VolAsymmetryKernel),
    /// Illiquidity ratios
    Amihud(AmihudKernel),
    /// Close window for the efficiency ratio
    EfficiencyRatio(EfficiencyKernel),
    /// Liquidation totals window
    LiquidationPressure(LiquidationKernel),
}

impl KernelState {
    /// Family tag as it appears in JSON.
    #[must_use]
    pub fn family(&self) -> &'static str {
        match self {
            KernelState::VolOfVol(_) => "vol_of_vol",
            KernelState::PermEntropy(_) => "perm_entropy",
            KernelState::Kurtosis(_) => "kurtosis",
            KernelState::Hurst(_) => "hurst",
            KernelState::Drawdown(_) => "drawdown",
            KernelState::VolAsymmetry(_) => "vol_asymmetry",
            KernelState::Amihud(_) => "amihud",
            KernelState::EfficiencyRatio(_) => "efficiency_ratio",
            KernelState::LiquidationPressure(_) => "liquidation_pressure",
        }
    }
}

impl IncrementalState {
    /// Encodes the state as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`IndicatorError::StateEncoding`] if a buffer holds a value
    /// JSON cannot represent.
    pub fn to_json(&self) -> Result<Value, IndicatorError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decodes a state previously produced by [`IncrementalState::to_json`].
    ///
    /// # Errors
    ///
    /// Returns [`IndicatorError::StateEncoding`] on a shape mismatch.
    pub fn from_json(value: Value) -> Result<Self, IndicatorError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Encodes the state as a JSON string.
    ///
    /// # Errors
    ///
    /// See [`IncrementalState::to_json`].
    pub fn to_json_string(&self) -> Result<String, IndicatorError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a state from a JSON string.
    ///
    /// # Errors
    ///
    /// See [`IncrementalState::from_json`].
    pub fn from_json_str(json: &str) -> Result<Self, IndicatorError> {
        Ok(serde_json::from_str(json)?)
    }
}
