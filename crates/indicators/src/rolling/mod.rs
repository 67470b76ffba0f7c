//! Rolling-window numeric primitives.
//!
//! Every structure here is a streaming state machine: it consumes one value
//! per step, keeps a bounded buffer of recent inputs and reports a value only
//! once its window is full (cold start), then one value per step (warm).
//! All of them derive serde so they can travel inside an
//! [`IncrementalState`](crate::state::IncrementalState).
//!
//! The free functions (`rolling_*`) are batch conveniences over
//! `(timestamp, value)` slices. Their output is aligned to the last element
//! of each window and never reads past it.

pub mod drawdown;
pub mod ema;
pub mod entropy;
pub mod hurst;
pub mod moments;
pub mod percentile;
pub mod returns;
pub mod wilder;

pub use drawdown::{
    rolling_max_drawdown, rolling_ulcer_index, DrawdownSnapshot, RollingDrawdown,
};
pub use ema::{ema_series, Ema};
pub use entropy::{factorial, ordinal_pattern, permutation_entropy, PermutationEntropy};
pub use hurst::{rolling_hurst, rs_hurst, RollingHurst};
pub use moments::{
    rolling_kurtosis, rolling_std, RollingMoments, RollingStd, MOMENT_EPSILON,
};
pub use percentile::{rolling_percentile, RollingPercentile};
pub use returns::{log_return, period_return, simple_return};
pub use wilder::{true_range, WilderAtr};
