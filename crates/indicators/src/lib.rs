//! MarketMetrics Indicators
//!
//! Streaming analytics over OHLCV bars and liquidation buckets.
//!
//! # Features
//! - Rolling algorithm library (moments, Wilder smoothing, permutation
//!   entropy, rescaled-range Hurst, percentile rank, drawdown)
//! - Indicator contract with full and incremental computation
//! - Typed, JSON-serialisable incremental state
//! - Kernel registry used by plugin manifests
//!
//! # Available Kernels
//! - `vol_of_vol`: rolling deviation of Wilder ATR
//! - `perm_entropy`: ordinal-pattern entropy of closes
//! - `realized_kurtosis`: rolling excess kurtosis and skew of returns
//! - `rolling_hurst`: rescaled-range Hurst exponent
//! - `ulcer_index` / `rolling_max_drawdown`: windowed drawdown statistics
//! - `amihud_illiquidity`: mean |return| per unit of dollar volume
//! - `down_up_vol_asym`: downside versus upside volatility
//! - `efficiency_ratio`: signed Kaufman efficiency
//! - `liquidation_pressure`: liquidation notional, imbalance and z-score
//! - `regime_index` / `percentile_blend`: composites over other indicators

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(missing_docs)]

pub mod composite;
pub mod error;
pub mod impl_;
pub mod registry;
pub mod rolling;
pub mod state;
pub mod stream;
pub mod traits;

// Re-export main types
pub use error::IndicatorError;
pub use registry::{IndicatorFactory, IndicatorRegistry, KernelEntry, BUILTIN_KERNELS, KERNELS};
pub use state::{IncrementalState, KernelState};
pub use stream::{run_stream, StreamContext, StreamKernel};
pub use traits::{
    merge_params, ComputeOutput, ComputeRequest, DependencyBundle, Indicator,
    IndicatorDescriptor, InputRequirement, OutputDef, Params,
};

// Re-export indicator implementations
pub use impl_::{
    amihud::AmihudIlliquidity,
    drawdown::{RollingMaxDrawdown, UlcerIndex},
    efficiency_ratio::EfficiencyRatio,
    liquidation_pressure::LiquidationPressure,
    percentile_blend::{BlendComponent, PercentileBlend},
    perm_entropy::PermEntropy,
    realized_kurtosis::RealizedKurtosis,
    regime_index::RegimeIndex,
    rolling_hurst::RollingHurstIndicator,
    vol_asymmetry::{AsymmetryMode, DownUpVolAsymmetry},
    vol_of_vol::VolOfVol,
};
