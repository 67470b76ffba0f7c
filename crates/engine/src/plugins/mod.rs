//! Plugin manifests, directory discovery and hot reload.
//!
//! Every indicator the engine serves is a compiled kernel bound to an id.
//! Built-ins are bound at startup; the rest are bound by JSON manifests
//! found in the project, composite and custom directories. Reloading
//! re-reads cached manifests in place and swaps the factory entry of a
//! changed unit, leaving unchanged units untouched.

pub mod manifest;
pub mod registry;

pub use manifest::{parse_unit, IndicatorDefinition, PluginManifest};
pub use registry::{Namespace, PluginEntry, PluginRegistry};
