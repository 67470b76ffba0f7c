//! Indicator implementations.
//!
//! Each module pairs a serialisable kernel (the per-item state machine) with
//! the [`Indicator`](crate::traits::Indicator) that drives it.

pub mod amihud;
pub mod drawdown;
pub mod efficiency_ratio;
pub mod liquidation_pressure;
pub mod percentile_blend;
pub mod perm_entropy;
pub mod realized_kurtosis;
pub mod regime_index;
pub mod rolling_hurst;
pub mod vol_asymmetry;
pub mod vol_of_vol;

use mm_types::Timeframe;

use crate::stream::StreamContext;
use crate::traits::{IndicatorDescriptor, InputRequirement, Params};

/// Bars at whatever timeframe the caller supplies.
pub(crate) fn any_candles() -> Vec<InputRequirement> {
    vec![InputRequirement::Candles { timeframe: None }]
}

/// Stream identity for a bar-driven indicator.
pub(crate) fn candle_context<'a>(
    descriptor: &'a IndicatorDescriptor,
    params: &'a Params,
    timeframe: Timeframe,
) -> StreamContext<'a> {
    StreamContext {
        indicator_id: &descriptor.id,
        params,
        timeframe: Some(timeframe),
        interval_ms: timeframe.to_millis(),
    }
}

/// Builds a parameter map from a `json!` object literal.
pub(crate) fn object(value: serde_json::Value) -> Params {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Params::new(),
    }
}
