//! Dependency resolution for composite indicators.
//!
//! Every dependency is computed fresh (full recompute, default parameters)
//! from the same raw inputs the composite was called with. Missing or
//! failing dependencies become warnings and the composite runs on a partial
//! bundle.

use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use mm_indicators::{ComputeOutput, ComputeRequest, DependencyBundle, IndicatorDescriptor, Params};
use mm_types::{Bar, LiquidationBucket, Timeframe};
use tracing::{debug, warn};

use crate::error::{panic_message, EngineError};
use crate::plugins::{PluginEntry, PluginRegistry};

/// Raw inputs shared by a composite and its dependencies.
#[derive(Debug, Clone, Copy)]
pub struct RawInputs<'a> {
    /// Ordered bars
    pub bars: &'a [Bar],
    /// Timeframe of `bars`
    pub timeframe: Timeframe,
    /// Ordered liquidation buckets, when fetched
    pub liquidations: Option<&'a [LiquidationBucket]>,
}

/// Outcome of resolving a composite's dependencies.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Non-empty dependency outputs keyed by id
    pub bundle: DependencyBundle,
    /// Missing, failed or partial dependency messages
    pub warnings: Vec<String>,
}

/// Computes composite dependencies against a plugin registry.
#[derive(Debug, Clone, Copy)]
pub struct DependencyResolver<'r> {
    registry: &'r PluginRegistry,
}

impl<'r> DependencyResolver<'r> {
    /// Creates a resolver over `registry`.
    #[must_use]
    pub fn new(registry: &'r PluginRegistry) -> Self {
        Self { registry }
    }

    /// Builds the dependency bundle for `composite`.
    #[must_use]
    pub fn resolve(&self, composite: &IndicatorDescriptor, inputs: &RawInputs<'_>) -> Resolution {
        let mut stack = vec![composite.id.clone()];
        let resolution = self.resolve_inner(composite, inputs, &mut stack);
        for message in &resolution.warnings {
            warn!("{message}");
        }
        resolution
    }

    fn resolve_inner(
        &self,
        composite: &IndicatorDescriptor,
        inputs: &RawInputs<'_>,
        stack: &mut Vec<String>,
    ) -> Resolution {
        let mut resolution = Resolution::default();
        let declared = &composite.required_indicator_ids;

        for dep_id in declared {
            let Some(entry) = self.registry.get(dep_id) else {
                resolution.warnings.push(format!(
                    "Composite {}: missing dependency {dep_id}",
                    composite.id
                ));
                continue;
            };
            if stack.iter().any(|id| id == dep_id) {
                resolution.warnings.push(format!(
                    "Composite {}: dependency {dep_id} skipped: dependency cycle",
                    composite.id
                ));
                continue;
            }

            stack.push(dep_id.clone());
            let outcome = self.compute_dependency(&entry, inputs, stack);
            stack.pop();

            match outcome {
                Ok((output, nested)) => {
                    resolution.warnings.extend(nested);
                    if output.series.is_empty() {
                        debug!(
                            composite = %composite.id,
                            dependency = %dep_id,
                            "dependency produced no output"
                        );
                    } else {
                        resolution.bundle.insert(dep_id.clone(), output.series);
                    }
                }
                Err(e) => resolution.warnings.push(format!(
                    "Composite {}: dependency {dep_id} failed: {e}",
                    composite.id
                )),
            }
        }

        if resolution.bundle.len() < declared.len() {
            resolution.warnings.push(format!(
                "Composite {}: only {}/{} dependencies available",
                composite.id,
                resolution.bundle.len(),
                declared.len()
            ));
        }
        resolution
    }

    fn compute_dependency(
        &self,
        entry: &PluginEntry,
        inputs: &RawInputs<'_>,
        stack: &mut Vec<String>,
    ) -> Result<(ComputeOutput, Vec<String>), EngineError> {
        let descriptor = &entry.descriptor;
        let nested = descriptor
            .is_composite()
            .then(|| self.resolve_inner(descriptor, inputs, stack));

        let bars: &[Bar] = if descriptor.requires_candles() {
            inputs.bars
        } else {
            &[]
        };
        let mut request = ComputeRequest::full(bars, inputs.timeframe);
        if descriptor.requires_liquidations() {
            request = request.with_liquidations(inputs.liquidations.unwrap_or(&[]));
        }
        if let Some(nested) = &nested {
            request = request.with_bundle(&nested.bundle);
        }

        let result = catch_unwind(AssertUnwindSafe(|| {
            let indicator = entry.instantiate(&Params::new())?;
            indicator.compute(&request)
        }));
        let output = match result {
            Ok(output) => output?,
            Err(payload) => {
                return Err(EngineError::Panicked {
                    id: descriptor.id.clone(),
                    message: panic_message(payload.as_ref()),
                })
            }
        };
        Ok((output, nested.map(|n| n.warnings).unwrap_or_default()))
    }

    /// `entry` followed by every transitive dependency that is registered,
    /// each listed once.
    #[must_use]
    pub fn closure(&self, entry: &Arc<PluginEntry>) -> Vec<Arc<PluginEntry>> {
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut out = Vec::new();
        let mut pending = vec![Arc::clone(entry)];
        while let Some(next) = pending.pop() {
            if !seen.insert(next.id().to_string()) {
                continue;
            }
            for dep in &next.descriptor.required_indicator_ids {
                if let Some(dep_entry) = self.registry.get(dep) {
                    pending.push(dep_entry);
                }
            }
            out.push(next);
        }
        out
    }
}
