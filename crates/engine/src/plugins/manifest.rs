//! Plugin manifests: one JSON file binding an indicator id to a compiled
//! kernel.
//!
//! ```json
//! {"indicators": [{
//!     "id": "rolling_hurst",
//!     "display_name": "Rolling Hurst",
//!     "kernel": "rolling_hurst",
//!     "parameters": {"window": 300}
//! }]}
//! ```

use mm_indicators::{
    merge_params, IndicatorDescriptor, IndicatorFactory, IndicatorRegistry, InputRequirement,
    Params,
};
use mm_types::Timeframe;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// File-level manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Indicator definitions; a loadable unit holds exactly one
    #[serde(default)]
    pub indicators: Vec<IndicatorDefinition>,
}

/// One indicator bound to a kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorDefinition {
    /// Indicator id
    #[serde(default)]
    pub id: String,
    /// Display name
    #[serde(default)]
    pub display_name: String,
    /// Description; the kernel's when absent
    #[serde(default)]
    pub description: Option<String>,
    /// Kernel name
    pub kernel: String,
    /// Overrides of the kernel's parameter defaults
    #[serde(default)]
    pub parameters: Option<Value>,
    /// Pins the candle timeframe
    #[serde(default)]
    pub timeframe: Option<Timeframe>,
    /// Dependency ids, composite kernels only
    #[serde(default)]
    pub required_indicator_ids: Option<Vec<String>>,
}

/// Parses a manifest and extracts its single definition.
///
/// # Errors
///
/// Returns the parser message for malformed JSON, and a description when
/// the manifest holds zero or several definitions.
pub fn parse_unit(text: &str) -> Result<IndicatorDefinition, String> {
    let manifest: PluginManifest = serde_json::from_str(text).map_err(|e| e.to_string())?;
    let count = manifest.indicators.len();
    let mut definitions = manifest.indicators.into_iter();
    match (definitions.next(), count) {
        (Some(definition), 1) => Ok(definition),
        (None, _) => Err("no indicator definition found".to_string()),
        (Some(_), n) => Err(format!("ambiguous: {n} indicator definitions")),
    }
}

impl IndicatorDefinition {
    /// Validates the definition against `kernels` and builds its
    /// descriptor and factory. The factory is instantiated once with the
    /// effective defaults so parameter errors surface at load time.
    ///
    /// # Errors
    ///
    /// Returns an `invalid contract: ...` message describing the first
    /// violation.
    pub fn build(
        &self,
        kernels: &IndicatorRegistry,
    ) -> Result<(IndicatorDescriptor, IndicatorFactory), String> {
        let invalid = |what: String| format!("invalid contract: {what}");

        if self.id.trim().is_empty() {
            return Err(invalid("missing id".to_string()));
        }
        if self.display_name.trim().is_empty() {
            return Err(invalid(format!("'{}' has no display_name", self.id)));
        }
        let (Some(template), Some(factory)) =
            (kernels.template(&self.kernel), kernels.factory(&self.kernel))
        else {
            return Err(invalid(format!("unknown kernel '{}'", self.kernel)));
        };

        let overrides: Params = match &self.parameters {
            None => Params::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(invalid("parameters must be an object".to_string())),
        };

        let composite_kernel = template.required_inputs.is_empty();
        let dependencies = self.required_indicator_ids.clone().unwrap_or_default();
        if !composite_kernel && !dependencies.is_empty() {
            return Err(invalid(format!(
                "kernel '{}' does not accept dependency ids",
                self.kernel
            )));
        }
        let dependencies = if composite_kernel && dependencies.is_empty() {
            template.required_indicator_ids.clone()
        } else {
            dependencies
        };
        if composite_kernel && dependencies.is_empty() {
            return Err(invalid(format!(
                "composite kernel '{}' needs required_indicator_ids",
                self.kernel
            )));
        }

        let mut required_inputs = template.required_inputs.clone();
        if let Some(tf) = self.timeframe {
            let mut pinned = false;
            for input in &mut required_inputs {
                if let InputRequirement::Candles { timeframe } = input {
                    *timeframe = Some(tf);
                    pinned = true;
                }
            }
            if !pinned {
                return Err(invalid(format!(
                    "kernel '{}' takes no candles to pin to {tf}",
                    self.kernel
                )));
            }
        }

        let descriptor = IndicatorDescriptor {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| template.description.clone()),
            kernel: self.kernel.clone(),
            required_inputs,
            required_indicator_ids: dependencies,
            parameters: merge_params(&template.parameters, &overrides),
            output_series_defs: template.output_series_defs.clone(),
            supports_incremental: template.supports_incremental,
        };

        factory(&descriptor, &descriptor.parameters).map_err(|e| invalid(e.to_string()))?;
        Ok((descriptor, factory))
    }
}
