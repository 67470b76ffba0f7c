//! MarketMetrics Engine
//!
//! Serves indicator computations to a host application.
//!
//! # Features
//! - Plugin registry: built-in indicators plus JSON manifests discovered in
//!   project, composite and custom directories, with in-place hot reload
//! - Dependency resolver computing a composite's dependencies fresh per call
//! - Engine façade with panic isolation and incremental state threading
//! - In-memory market store with higher-timeframe resampling

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(missing_docs)]

pub mod engine;
pub mod error;
pub mod logging;
pub mod plugins;
pub mod resolver;
pub mod store;

// Re-export main types
pub use engine::{ComputeQuery, Engine, EngineOutput};
pub use error::{DiscoveryError, EngineError};
pub use logging::init_logging;
pub use plugins::{Namespace, PluginEntry, PluginRegistry};
pub use resolver::{DependencyResolver, RawInputs, Resolution};
pub use store::{MarketStore, MemoryStore};
