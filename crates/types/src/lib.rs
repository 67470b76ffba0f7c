//! MarketMetrics Types
//!
//! Core data structures shared by the indicator library and the engine:
//! bars, liquidation buckets, timeframes, output series and configuration.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(missing_docs)]

pub mod bar;
pub mod config;
pub mod error;
pub mod series;
pub mod timeframe;

pub use bar::{resample_bars, Bar, LiquidationBucket, Timestamped};
pub use config::{EngineConfig, LoggingConfig};
pub use error::CoreError;
pub use series::{OutputSeries, Point};
pub use timeframe::{ParseTimeframeError, Timeframe};
