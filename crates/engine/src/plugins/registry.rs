//! Plugin registry: built-in indicators plus manifests discovered in scan
//! directories, with an in-place reload cache.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mm_indicators::{
    merge_params, Indicator, IndicatorDescriptor, IndicatorError, IndicatorFactory,
    IndicatorRegistry, Params, BUILTIN_KERNELS, KERNELS,
};
use mm_types::EngineConfig;
use tracing::{debug, info, warn};

use super::manifest::{parse_unit, IndicatorDefinition};
use crate::error::DiscoveryError;

/// Origin of a plugin. Units from different namespaces never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// Compiled in, never reloaded
    Builtin,
    /// Shipped with the project
    Project,
    /// Shipped composites
    Composite,
    /// Authored by the user
    Custom,
}

impl Namespace {
    /// Prefix used in unit keys.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Builtin => "builtin",
            Namespace::Project => "project",
            Namespace::Composite => "composite",
            Namespace::Custom => "custom",
        }
    }
}

/// A loaded indicator: descriptor plus the factory creating instances.
pub struct PluginEntry {
    /// Effective descriptor
    pub descriptor: IndicatorDescriptor,
    /// Constructor
    pub factory: IndicatorFactory,
    /// Where it came from
    pub namespace: Namespace,
    /// Manifest path, `None` for built-ins
    pub source: Option<PathBuf>,
}

impl std::fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginEntry")
            .field("id", &self.descriptor.id)
            .field("kernel", &self.descriptor.kernel)
            .field("namespace", &self.namespace)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl PluginEntry {
    /// Indicator id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    /// Creates a fresh instance with `overrides` on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns whatever the factory rejects.
    pub fn instantiate(&self, overrides: &Params) -> Result<Box<dyn Indicator>, IndicatorError> {
        (self.factory)(
            &self.descriptor,
            &merge_params(&self.descriptor.parameters, overrides),
        )
    }

    fn location(&self) -> String {
        self.source.as_ref().map_or_else(
            || format!("<{}>", self.namespace.as_str()),
            |p| p.display().to_string(),
        )
    }
}

struct LoadedUnit {
    definition: IndicatorDefinition,
    entry: Arc<PluginEntry>,
    loads: usize,
}

/// Registry of every indicator available to the engine.
///
/// `discover` mutates the reload cache and must be called from one control
/// thread.
pub struct PluginRegistry {
    kernels: IndicatorRegistry,
    builtins: Vec<Arc<PluginEntry>>,
    directories: Vec<(Namespace, PathBuf)>,
    units: BTreeMap<String, LoadedUnit>,
    active: Vec<Arc<PluginEntry>>,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("directories", &self.directories)
            .field("units", &self.units.keys().collect::<Vec<_>>())
            .field("active", &self.active.iter().map(|e| e.id()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl PluginRegistry {
    /// Registry over the compiled kernels with the built-in indicators and
    /// no scan directories.
    #[must_use]
    pub fn new() -> Self {
        Self::with_kernels(KERNELS.clone())
    }

    /// Registry over a custom kernel set.
    #[must_use]
    pub fn with_kernels(kernels: IndicatorRegistry) -> Self {
        let builtins = BUILTIN_KERNELS
            .iter()
            .filter_map(|name| {
                let template = kernels.template(name)?.clone();
                let factory = kernels.factory(name)?;
                Some(Arc::new(PluginEntry {
                    descriptor: template,
                    factory,
                    namespace: Namespace::Builtin,
                    source: None,
                }))
            })
            .collect();
        Self {
            kernels,
            builtins,
            directories: Vec::new(),
            units: BTreeMap::new(),
            active: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Registry scanning the directories named by `config`.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut registry = Self::new();
        if let Some(dir) = &config.project_dir {
            registry.add_directory(Namespace::Project, dir);
        }
        if let Some(dir) = &config.composite_dir {
            registry.add_directory(Namespace::Composite, dir);
        }
        registry.add_directory(Namespace::Custom, &config.custom_dir());
        registry
    }

    /// Adds a scan directory. Directories are scanned in namespace order
    /// (project, composite, custom), then in insertion order.
    pub fn add_directory(&mut self, namespace: Namespace, dir: &Path) {
        self.directories.push((namespace, dir.to_path_buf()));
        self.directories.sort_by_key(|(ns, _)| *ns);
    }

    /// Adds a compiled indicator that is always present and never reloaded.
    /// Takes effect at the next discovery.
    pub fn register_builtin(&mut self, descriptor: IndicatorDescriptor, factory: IndicatorFactory) {
        self.builtins.retain(|e| e.id() != descriptor.id);
        self.builtins.push(Arc::new(PluginEntry {
            descriptor,
            factory,
            namespace: Namespace::Builtin,
            source: None,
        }));
    }

    /// Kernels manifests may bind to.
    #[must_use]
    pub fn kernels(&self) -> &IndicatorRegistry {
        &self.kernels
    }

    /// Scans every directory and rebuilds the active set.
    ///
    /// With `reload`, cached units are re-read from disk; otherwise cached
    /// units are reused as they are. Returns the active descriptors and the
    /// errors of this pass. Errors never abort the scan.
    pub fn discover(&mut self, reload: bool) -> (Vec<IndicatorDescriptor>, Vec<String>) {
        let mut errors: Vec<DiscoveryError> = Vec::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut candidates: Vec<Arc<PluginEntry>> = self.builtins.clone();

        for (namespace, dir) in self.directories.clone() {
            let paths = match scan_directory(&dir) {
                Ok(paths) => paths,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };
            for path in paths {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let key = format!("{}:{stem}", namespace.as_str());
                seen.insert(key.clone());
                match self.load_unit(&key, namespace, &path, reload) {
                    Ok(entry) => candidates.push(entry),
                    Err(reason) => errors.push(DiscoveryError::new(&path, reason)),
                }
            }
        }

        // units whose files disappeared
        self.units.retain(|key, _| seen.contains(key));

        let mut ids: BTreeSet<String> = BTreeSet::new();
        let mut unique: Vec<Arc<PluginEntry>> = Vec::with_capacity(candidates.len());
        for entry in candidates {
            if ids.insert(entry.id().to_string()) {
                unique.push(entry);
            } else {
                errors.push(DiscoveryError {
                    path: entry.source.clone().unwrap_or_default(),
                    reason: format!("duplicate indicator id '{}'", entry.id()),
                });
            }
        }

        let (active, cycle_errors) = remove_cycles(unique);
        errors.extend(cycle_errors);

        let known: BTreeSet<&str> = active.iter().map(|e| e.id()).collect();
        let mut warnings = Vec::new();
        for entry in &active {
            for dep in &entry.descriptor.required_indicator_ids {
                if !known.contains(dep.as_str()) {
                    let message = format!("Composite {}: missing dependency {dep}", entry.id());
                    warn!("{message}");
                    warnings.push(message);
                }
            }
        }

        for e in &errors {
            warn!(path = %e.path.display(), reason = %e.reason, "plugin discovery error");
        }
        info!(
            indicators = active.len(),
            errors = errors.len(),
            reload,
            "plugin discovery complete"
        );

        self.active = active;
        self.errors = errors.iter().map(ToString::to_string).collect();
        self.warnings = warnings;
        (self.descriptors(), self.errors.clone())
    }

    fn load_unit(
        &mut self,
        key: &str,
        namespace: Namespace,
        path: &Path,
        reload: bool,
    ) -> Result<Arc<PluginEntry>, String> {
        if !reload {
            if let Some(unit) = self.units.get(key) {
                return Ok(Arc::clone(&unit.entry));
            }
        }

        let definition = match read_definition(path) {
            Ok(definition) => definition,
            Err(reason) => {
                if self.units.remove(key).is_some() {
                    debug!(unit = key, "reload failed, evicted from cache");
                }
                return Err(reason);
            }
        };

        if let Some(unit) = self.units.get_mut(key) {
            unit.loads += 1;
            if unit.definition == definition {
                return Ok(Arc::clone(&unit.entry));
            }
        }

        let (descriptor, factory) = match definition.build(&self.kernels) {
            Ok(built) => built,
            Err(reason) => {
                if self.units.remove(key).is_some() {
                    debug!(unit = key, "reload failed, evicted from cache");
                }
                return Err(reason);
            }
        };
        let entry = Arc::new(PluginEntry {
            descriptor,
            factory,
            namespace,
            source: Some(path.to_path_buf()),
        });
        let loads = self.units.get(key).map_or(1, |u| u.loads);
        self.units.insert(
            key.to_string(),
            LoadedUnit {
                definition,
                entry: Arc::clone(&entry),
                loads,
            },
        );
        debug!(unit = key, id = entry.id(), "plugin unit loaded");
        Ok(entry)
    }

    /// Active descriptors in discovery order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<IndicatorDescriptor> {
        self.active.iter().map(|e| e.descriptor.clone()).collect()
    }

    /// Active entry by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<PluginEntry>> {
        self.active.iter().find(|e| e.id() == id).map(Arc::clone)
    }

    /// True when `id` is active.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.active.iter().any(|e| e.id() == id)
    }

    /// Errors of the last discovery.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Missing-dependency warnings of the last discovery.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// True when the unit `<namespace>:<stem>` is in the reload cache.
    #[must_use]
    pub fn is_cached(&self, key: &str) -> bool {
        self.units.contains_key(key)
    }

    /// How many times the unit was read from disk.
    #[must_use]
    pub fn load_count(&self, key: &str) -> Option<usize> {
        self.units.get(key).map(|u| u.loads)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn read_definition(path: &Path) -> Result<IndicatorDefinition, String> {
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    parse_unit(&text)
}

/// Plain `.json` files not starting with `_`, sorted by name. A missing
/// directory is empty.
fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    if !dir.exists() {
        debug!(dir = %dir.display(), "plugin directory absent");
        return Ok(Vec::new());
    }
    let read = fs::read_dir(dir).map_err(|e| DiscoveryError::new(dir, e.to_string()))?;
    let mut paths: Vec<PathBuf> = read
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .map(|entry| entry.path())
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("_");
            !name.starts_with('_')
                && path.extension().and_then(|e| e.to_str()) == Some("json")
        })
        .collect();
    paths.sort();
    Ok(paths)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

fn visit<'a>(
    node: &'a str,
    graph: &BTreeMap<&'a str, Vec<&'a str>>,
    marks: &mut HashMap<&'a str, Mark>,
    stack: &mut Vec<&'a str>,
    cycles: &mut Vec<Vec<&'a str>>,
) {
    marks.insert(node, Mark::Active);
    stack.push(node);
    for &dep in graph.get(node).into_iter().flatten() {
        match marks.get(dep) {
            None => visit(dep, graph, marks, stack, cycles),
            Some(Mark::Active) => {
                if let Some(pos) = stack.iter().position(|n| *n == dep) {
                    let mut cycle = stack[pos..].to_vec();
                    cycle.push(dep);
                    cycles.push(cycle);
                }
            }
            Some(Mark::Done) => {}
        }
    }
    stack.pop();
    marks.insert(node, Mark::Done);
}

/// Drops every indicator on a dependency cycle, one error per cycle.
fn remove_cycles(entries: Vec<Arc<PluginEntry>>) -> (Vec<Arc<PluginEntry>>, Vec<DiscoveryError>) {
    let cycles: Vec<Vec<String>> = {
        let graph: BTreeMap<&str, Vec<&str>> = entries
            .iter()
            .map(|e| {
                (
                    e.id(),
                    e.descriptor
                        .required_indicator_ids
                        .iter()
                        .map(String::as_str)
                        .collect(),
                )
            })
            .collect();
        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut stack = Vec::new();
        let mut found: Vec<Vec<&str>> = Vec::new();
        for e in &entries {
            if !marks.contains_key(e.id()) {
                visit(e.id(), &graph, &mut marks, &mut stack, &mut found);
            }
        }
        found
            .into_iter()
            .map(|c| c.into_iter().map(str::to_string).collect())
            .collect()
    };
    if cycles.is_empty() {
        return (entries, Vec::new());
    }

    let doomed: BTreeSet<String> = cycles
        .iter()
        .flatten()
        .cloned()
        .collect();
    let errors = cycles
        .iter()
        .map(|cycle| {
            let first = entries.iter().find(|e| e.id() == cycle[0]);
            let path = first.map(|e| e.location()).unwrap_or_default();
            DiscoveryError {
                path: PathBuf::from(path),
                reason: format!("dependency cycle detected: {}", cycle.join(" -> ")),
            }
        })
        .collect();
    let kept = entries
        .into_iter()
        .filter(|e| !doomed.contains(e.id()))
        .collect();
    (kept, errors)
}
