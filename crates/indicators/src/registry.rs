//! Kernel registry: compiled indicator implementations keyed by kernel name.
//!
//! A plugin manifest names a kernel and supplies its own descriptor; the
//! registry turns that pair into a live [`Indicator`].

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::IndicatorError;
use crate::impl_::{
    amihud::{self, AmihudIlliquidity},
    drawdown::{self, RollingMaxDrawdown, UlcerIndex},
    efficiency_ratio::{self, EfficiencyRatio},
    liquidation_pressure::{self, LiquidationPressure},
    percentile_blend::{self, PercentileBlend},
    perm_entropy::{self, PermEntropy},
    realized_kurtosis::{self, RealizedKurtosis},
    regime_index::{self, RegimeIndex},
    rolling_hurst::{self, RollingHurstIndicator},
    vol_asymmetry::{self, DownUpVolAsymmetry},
    vol_of_vol::{self, VolOfVol},
};
use crate::traits::{merge_params, Indicator, IndicatorDescriptor, Params};

/// Factory building an indicator from a descriptor and effective parameters.
pub type IndicatorFactory = Arc<
    dyn Fn(&IndicatorDescriptor, &Params) -> Result<Box<dyn Indicator>, IndicatorError>
        + Send
        + Sync,
>;

/// Kernels that are always present and never reloaded.
pub const BUILTIN_KERNELS: [&str; 2] = [vol_of_vol::KERNEL, perm_entropy::KERNEL];

/// Process-wide registry of every compiled kernel.
pub static KERNELS: Lazy<IndicatorRegistry> = Lazy::new(IndicatorRegistry::with_defaults);

/// A registered kernel.
#[derive(Clone)]
pub struct KernelEntry {
    /// Default descriptor (id equals the kernel name)
    pub template: IndicatorDescriptor,
    /// Constructor
    pub factory: IndicatorFactory,
}

impl std::fmt::Debug for KernelEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelEntry")
            .field("template", &self.template.id)
            .finish_non_exhaustive()
    }
}

/// Registry for indicator kernels.
#[derive(Debug, Clone)]
pub struct IndicatorRegistry {
    kernels: BTreeMap<String, KernelEntry>,
}

impl IndicatorRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            kernels: BTreeMap::new(),
        }
    }

    /// Registers (or replaces) a kernel.
    pub fn register<F>(&mut self, name: &str, template: IndicatorDescriptor, factory: F)
    where
        F: Fn(&IndicatorDescriptor, &Params) -> Result<Box<dyn Indicator>, IndicatorError>
            + Send
            + Sync
            + 'static,
    {
        self.kernels.insert(
            name.to_string(),
            KernelEntry {
                template,
                factory: Arc::new(factory),
            },
        );
    }

    /// Instantiates `descriptor`'s kernel with its defaults overlaid by
    /// `overrides`.
    ///
    /// # Errors
    ///
    /// Returns [`IndicatorError::UnknownIndicator`] if the kernel is not
    /// registered, or whatever the factory rejects.
    pub fn create(
        &self,
        descriptor: &IndicatorDescriptor,
        overrides: &Params,
    ) -> Result<Box<dyn Indicator>, IndicatorError> {
        let factory = self
            .factory(&descriptor.kernel)
            .ok_or_else(|| IndicatorError::UnknownIndicator(descriptor.kernel.clone()))?;
        factory(descriptor, &merge_params(&descriptor.parameters, overrides))
    }

    /// Checks if a kernel is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.kernels.contains_key(name)
    }

    /// Registered kernel names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.kernels.keys().map(String::as_str).collect()
    }

    /// Default descriptor of a kernel.
    #[must_use]
    pub fn template(&self, name: &str) -> Option<&IndicatorDescriptor> {
        self.kernels.get(name).map(|e| &e.template)
    }

    /// Shared factory of a kernel.
    #[must_use]
    pub fn factory(&self, name: &str) -> Option<IndicatorFactory> {
        self.kernels.get(name).map(|e| Arc::clone(&e.factory))
    }

    /// Creates a registry with every compiled kernel pre-registered.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(vol_of_vol::KERNEL, VolOfVol::template(), |d, p| {
            Ok(Box::new(VolOfVol::from_params(d, p)))
        });
        registry.register(perm_entropy::KERNEL, PermEntropy::template(), |d, p| {
            Ok(Box::new(PermEntropy::from_params(d, p)))
        });
        registry.register(
            realized_kurtosis::KERNEL,
            RealizedKurtosis::template(),
            |d, p| Ok(Box::new(RealizedKurtosis::from_params(d, p))),
        );
        registry.register(
            rolling_hurst::KERNEL,
            RollingHurstIndicator::template(),
            |d, p| Ok(Box::new(RollingHurstIndicator::from_params(d, p))),
        );
        registry.register(drawdown::ULCER_KERNEL, UlcerIndex::template(), |d, p| {
            Ok(Box::new(UlcerIndex::from_params(d, p)))
        });
        registry.register(
            drawdown::MAX_DRAWDOWN_KERNEL,
            RollingMaxDrawdown::template(),
            |d, p| Ok(Box::new(RollingMaxDrawdown::from_params(d, p))),
        );
        registry.register(amihud::KERNEL, AmihudIlliquidity::template(), |d, p| {
            Ok(Box::new(AmihudIlliquidity::from_params(d, p)))
        });
        registry.register(
            vol_asymmetry::KERNEL,
            DownUpVolAsymmetry::template(),
            |d, p| Ok(Box::new(DownUpVolAsymmetry::try_from_params(d, p)?)),
        );
        registry.register(
            efficiency_ratio::KERNEL,
            EfficiencyRatio::template(),
            |d, p| Ok(Box::new(EfficiencyRatio::from_params(d, p))),
        );
        registry.register(
            liquidation_pressure::KERNEL,
            LiquidationPressure::template(),
            |d, p| Ok(Box::new(LiquidationPressure::from_params(d, p))),
        );

        // Composites
        registry.register(regime_index::KERNEL, RegimeIndex::template(), |d, p| {
            Ok(Box::new(RegimeIndex::from_params(d, p)))
        });
        registry.register(
            percentile_blend::KERNEL,
            PercentileBlend::template(),
            |d, p| Ok(Box::new(PercentileBlend::try_from_params(d, p)?)),
        );

        registry
    }
}

impl Default for IndicatorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
