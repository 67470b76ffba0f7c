//! Engine façade: the single entry point a host talks to.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use mm_indicators::{ComputeRequest, IncrementalState, IndicatorDescriptor, Params};
use mm_types::{EngineConfig, OutputSeries, Timeframe};
use tracing::{debug, error, warn};

use crate::error::{panic_message, EngineError};
use crate::plugins::PluginRegistry;
use crate::resolver::{DependencyResolver, RawInputs};
use crate::store::MarketStore;

/// One compute call.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeQuery {
    /// Indicator id
    pub indicator_id: String,
    /// Market symbol
    pub symbol: String,
    /// Chart timeframe
    pub timeframe: Timeframe,
    /// Range start, epoch ms inclusive
    pub start_ms: i64,
    /// Range end, epoch ms inclusive
    pub end_ms: i64,
    /// Continue from `last_state`
    pub incremental: bool,
    /// State returned by the previous call for the same stream
    pub last_state: Option<IncrementalState>,
    /// Parameter overrides
    pub parameters: Params,
}

impl ComputeQuery {
    /// Full-recompute query with default parameters.
    #[must_use]
    pub fn new(
        indicator_id: &str,
        symbol: &str,
        timeframe: Timeframe,
        start_ms: i64,
        end_ms: i64,
    ) -> Self {
        Self {
            indicator_id: indicator_id.to_string(),
            symbol: symbol.to_string(),
            timeframe,
            start_ms,
            end_ms,
            incremental: false,
            last_state: None,
            parameters: Params::new(),
        }
    }

    /// Continues from `state`.
    #[must_use]
    pub fn incremental(mut self, state: Option<IncrementalState>) -> Self {
        self.incremental = true;
        self.last_state = state;
        self
    }

    /// Overrides parameter defaults.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Params) -> Self {
        self.parameters = parameters;
        self
    }
}

/// What a host receives from one compute call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineOutput {
    /// Emitted series, declared keys only
    pub series: OutputSeries,
    /// State for the next incremental call
    pub state: Option<IncrementalState>,
    /// Dependency and contract warnings
    pub warnings: Vec<String>,
    /// Set when the call failed; `series` is then empty
    pub failure: Option<String>,
}

impl EngineOutput {
    fn failed(message: String) -> Self {
        Self {
            failure: Some(message),
            ..Self::default()
        }
    }
}

/// Engine over a market store and a plugin registry.
#[derive(Debug)]
pub struct Engine<S: MarketStore> {
    store: S,
    config: EngineConfig,
    plugins: PluginRegistry,
}

impl<S: MarketStore> Engine<S> {
    /// Creates an engine and discovers the plugins named by `config`.
    pub fn new(store: S, config: EngineConfig) -> Self {
        let mut plugins = PluginRegistry::from_config(&config);
        plugins.discover(false);
        Self {
            store,
            config,
            plugins,
        }
    }

    /// Creates an engine over an already discovered registry.
    pub fn with_registry(store: S, config: EngineConfig, plugins: PluginRegistry) -> Self {
        Self {
            store,
            config,
            plugins,
        }
    }

    /// Descriptors of every available indicator.
    #[must_use]
    pub fn list_indicators(&self) -> Vec<IndicatorDescriptor> {
        self.plugins.descriptors()
    }

    /// Re-reads plugin manifests in place.
    pub fn reload_plugins(&mut self) -> (Vec<IndicatorDescriptor>, Vec<String>) {
        self.plugins.discover(true)
    }

    /// Errors of the last discovery.
    #[must_use]
    pub fn discovery_errors(&self) -> &[String] {
        self.plugins.errors()
    }

    /// Plugin registry.
    #[must_use]
    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Mutable plugin registry, for registering built-ins.
    pub fn plugins_mut(&mut self) -> &mut PluginRegistry {
        &mut self.plugins
    }

    /// Market store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Computes an indicator.
    ///
    /// Never fails: errors and panics raised while computing are logged and
    /// returned as [`EngineOutput::failure`] with no series.
    pub fn compute(&self, query: &ComputeQuery) -> EngineOutput {
        let started = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(|| self.try_compute(query)));
        let result = match result {
            Ok(result) => result,
            Err(payload) => Err(EngineError::Panicked {
                id: query.indicator_id.clone(),
                message: panic_message(payload.as_ref()),
            }),
        };
        match result {
            Ok(output) => {
                debug!(
                    indicator = %query.indicator_id,
                    symbol = %query.symbol,
                    points = output.series.point_count(),
                    elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
                    "compute finished"
                );
                output
            }
            Err(e) => {
                error!(indicator = %query.indicator_id, error = %e, "compute failed");
                EngineOutput::failed(e.to_string())
            }
        }
    }

    /// Computes an indicator, propagating failures.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownIndicator`] for an unregistered id,
    /// [`EngineError::Core`] when the store fails and
    /// [`EngineError::Indicator`] when construction or computation fails.
    pub fn try_compute(&self, query: &ComputeQuery) -> Result<EngineOutput, EngineError> {
        let entry = self
            .plugins
            .get(&query.indicator_id)
            .ok_or_else(|| EngineError::UnknownIndicator(query.indicator_id.clone()))?;
        let descriptor = &entry.descriptor;
        let resolver = DependencyResolver::new(&self.plugins);

        let members = resolver.closure(&entry);
        let needs_liquidations = members.iter().any(|m| m.descriptor.requires_liquidations());
        let needs_candles = members.iter().any(|m| m.descriptor.requires_candles());
        let timeframe = descriptor.candle_timeframe().unwrap_or(query.timeframe);

        let mut bars = if needs_candles {
            self.store
                .get_bars(&query.symbol, timeframe, query.start_ms, query.end_ms)?
        } else {
            Vec::new()
        };
        let mut liquidations = if needs_liquidations {
            Some(
                self.store
                    .get_liquidations(&query.symbol, query.start_ms, query.end_ms)?,
            )
        } else {
            None
        };
        if let Some(cap) = self.config.max_bars_per_call {
            keep_last(&mut bars, cap);
            if let Some(buckets) = liquidations.as_mut() {
                keep_last(buckets, cap);
            }
        }

        let indicator = entry.instantiate(&query.parameters)?;
        let mut warnings = Vec::new();
        let output = if descriptor.is_composite() {
            let inputs = RawInputs {
                bars: &bars,
                timeframe,
                liquidations: liquidations.as_deref(),
            };
            let resolution = resolver.resolve(descriptor, &inputs);
            warnings.extend(resolution.warnings);
            let request = ComputeRequest::full(&[], timeframe).with_bundle(&resolution.bundle);
            indicator.compute(&request)?
        } else {
            let mut request = ComputeRequest::full(&bars, timeframe);
            if let Some(buckets) = liquidations.as_deref() {
                request = request.with_liquidations(buckets);
            }
            if query.incremental {
                request = request.continuing(query.last_state.as_ref());
            }
            indicator.compute(&request)?
        };

        let mut series = OutputSeries::new();
        for (key, points) in output.series.iter() {
            if descriptor.declares_output(key) {
                series.insert(key, points.to_vec());
            } else {
                let message = format!("{}: dropped undeclared series '{key}'", descriptor.id);
                warn!("{message}");
                warnings.push(message);
            }
        }

        Ok(EngineOutput {
            series,
            state: output.state,
            warnings,
            failure: None,
        })
    }
}

fn keep_last<T>(items: &mut Vec<T>, cap: usize) {
    if items.len() > cap {
        items.drain(..items.len() - cap);
    }
}
