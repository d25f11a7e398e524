//! # Plugin lifecycle controller
//!
//! [`PluginLoader`] ties the manifest store, the code loader, the instantiator
//! and the registry together and drives each plugin through
//! discovered → loaded → (enabled/disabled) → unloaded.
//!
//! Loading is dependency ordered: before a plugin is loaded, each declared
//! dependency that is not loaded yet is loaded first, recursively, in
//! declaration order. Afterwards the dependency list is checked again, so a
//! dependency whose own load failed is caught here rather than trusted.
//!
//! Everything that can go wrong inside one plugin's load path is contained at
//! that plugin: it is logged, written to `error.log` in the plugin directory
//! and returned as [`LoadOutcome::Failed`]. Lifecycle calls against plugins
//! that are not loaded return [`PluginSystemError::NotLoaded`].
use std::fmt::{self, Write as _};
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use log::Level;

use crate::plugin_system::config::LoaderConfig;
use crate::plugin_system::error::{PluginSystemError, Result};
use crate::plugin_system::instantiate::{instantiate, panic_message};
use crate::plugin_system::loader::{CodeLoader, DynamicCodeLoader, LoadedUnit};
use crate::plugin_system::manifest::Manifest;
use crate::plugin_system::registry::PluginRegistry;
use crate::plugin_system::store::ManifestStore;
use crate::plugin_system::traits::{HostArgs, Hook, Plugin};

/// Maximum number of error-chain entries written to `error.log`
const MAX_TRACE_DEPTH: usize = 5;

/// Result of a single [`PluginLoader::load`] call
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded,
    AlreadyLoaded,
    Failed(PluginSystemError),
}

impl LoadOutcome {
    /// Whether the plugin is loaded after the call
    pub fn is_loaded(&self) -> bool {
        !matches!(self, LoadOutcome::Failed(_))
    }

    pub fn error(&self) -> Option<&PluginSystemError> {
        match self {
            LoadOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Per-plugin results of [`PluginLoader::load_all`]
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub already_loaded: Vec<String>,
    pub failed: Vec<(String, PluginSystemError)>,
}

impl LoadReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failure(&self, id: &str) -> Option<&PluginSystemError> {
        self.failed.iter().find(|(failed_id, _)| failed_id == id).map(|(_, e)| e)
    }
}

/// One known plugin; `instance` and `unit` are `None` unless it is loaded
pub struct PluginView<'a> {
    pub manifest: &'a Manifest,
    pub instance: Option<&'a dyn Plugin>,
    pub unit: Option<&'a dyn LoadedUnit>,
}

impl PluginView<'_> {
    pub fn is_loaded(&self) -> bool {
        self.instance.is_some()
    }
}

/// Discovers, loads and manages plugins
pub struct PluginLoader {
    config: LoaderConfig,
    manifests: ManifestStore,
    registry: PluginRegistry,
    code_loader: Box<dyn CodeLoader>,
}

impl PluginLoader {
    /// Create a loader that opens plugin entry files as shared libraries
    pub fn new(config: LoaderConfig) -> Self {
        Self::with_code_loader(config, DynamicCodeLoader::new())
    }

    /// Create a loader backed by a custom code loader
    pub fn with_code_loader<L: CodeLoader + 'static>(config: LoaderConfig, code_loader: L) -> Self {
        let manifests = ManifestStore::new(config.plugin_paths.clone(), config.log_level);
        plugin_log!(
            config.log_level,
            Level::Debug,
            "Using plugin paths: {}.",
            config.plugin_paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
        );
        Self {
            config,
            manifests,
            registry: PluginRegistry::new(),
            code_loader: Box::new(code_loader),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn manifest_store(&self) -> &ManifestStore {
        &self.manifests
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    // --- Manifests ---

    /// Scan the configured plugin paths. Returns how many manifests were added.
    pub fn discover(&mut self) -> usize {
        self.manifests.discover_all()
    }

    /// Scan additional roots
    pub fn discover_in<P: AsRef<Path>>(&mut self, roots: &[P]) -> usize {
        self.manifests.discover(roots)
    }

    /// Load the manifest of a single plugin directory
    pub fn load_manifest<P: AsRef<Path>>(&mut self, dir: P) -> bool {
        self.manifests.load_one(dir.as_ref())
    }

    pub fn get_manifest(&self, id: &str) -> Option<&Manifest> {
        self.manifests.get(id)
    }

    pub fn manifests(&self) -> impl Iterator<Item = &Manifest> {
        self.manifests.iter()
    }

    /// Re-read one manifest from its source directory
    pub fn reload_manifest(&mut self, manifest: &Manifest) -> bool {
        self.manifests.reload_one(manifest)
    }

    /// Forget all manifests and rescan. Loaded plugins are not unloaded.
    pub fn reload_all_manifests(&mut self) -> usize {
        self.manifests.reload_all()
    }

    // --- Loading ---

    /// Load a plugin and, first, its dependencies.
    ///
    /// Never panics or returns early on a plugin failure: the failure is
    /// logged, written to the plugin's `error.log` and returned.
    pub fn load(&mut self, manifest: &Manifest, args: &HostArgs) -> LoadOutcome {
        let mut resolving = Vec::new();
        self.load_resolving(manifest, args, &mut resolving)
    }

    /// Load every known manifest in discovery order
    pub fn load_all(&mut self, args: &HostArgs) -> LoadReport {
        let mut report = LoadReport::default();
        let manifests: Vec<Manifest> = self.manifests.iter().cloned().collect();
        for manifest in manifests {
            match self.load(&manifest, args) {
                LoadOutcome::Loaded => report.loaded.push(manifest.id),
                LoadOutcome::AlreadyLoaded => report.already_loaded.push(manifest.id),
                LoadOutcome::Failed(e) => report.failed.push((manifest.id, e)),
            }
        }
        report
    }

    /// Discover, load everything, then enable everything
    pub fn quickload(&mut self, args: &HostArgs) -> Result<LoadReport> {
        self.discover();
        let report = self.load_all(args);
        self.enable_all()?;
        Ok(report)
    }

    fn load_resolving(&mut self, manifest: &Manifest, args: &HostArgs, resolving: &mut Vec<String>) -> LoadOutcome {
        let level = self.config.log_level;
        if self.registry.contains(&manifest.id) {
            plugin_log!(level, Level::Debug, "Plugin {} is already loaded.", manifest.id);
            return LoadOutcome::AlreadyLoaded;
        }

        plugin_log!(level, Level::Debug, "Attempting to load plugin {}.", manifest.id);
        resolving.push(manifest.id.clone());
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.try_load(manifest, args, resolving)));
        resolving.pop();

        let error = match result {
            Ok(Ok(())) => {
                plugin_log!(level, Level::Debug, "Plugin {} loaded.", manifest.id);
                return LoadOutcome::Loaded;
            }
            Ok(Err(e)) => e,
            Err(panic_obj) => PluginSystemError::CodeLoad {
                plugin_id: manifest.id.clone(),
                path: manifest.entry_path(),
                message: format!("panic: {}", panic_message(panic_obj.as_ref())),
                source: None,
            },
        };
        self.record_failure(manifest, &error);
        LoadOutcome::Failed(error)
    }

    fn try_load(&mut self, manifest: &Manifest, args: &HostArgs, resolving: &mut Vec<String>) -> Result<()> {
        let level = self.config.log_level;

        for dependency in &manifest.dependencies {
            if self.registry.contains(dependency) {
                continue;
            }
            if let Some(start) = resolving.iter().position(|id| id == dependency) {
                let mut cycle = resolving[start..].to_vec();
                cycle.push(dependency.clone());
                return Err(PluginSystemError::DependencyCycle { cycle });
            }

            plugin_log!(level, Level::Debug, "Must load dependency {} first.", dependency);
            let Some(dep_manifest) = self.manifests.get(dependency).cloned() else {
                plugin_log!(level, Level::Error, "Dependency {} could not be found.", dependency);
                continue;
            };
            if let LoadOutcome::Failed(PluginSystemError::DependencyCycle { cycle }) =
                self.load_resolving(&dep_manifest, args, resolving)
            {
                if cycle.contains(&manifest.id) {
                    return Err(PluginSystemError::DependencyCycle { cycle });
                }
            }
        }

        let missing: Vec<String> = manifest
            .dependencies
            .iter()
            .filter(|dependency| !self.registry.contains(dependency))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(PluginSystemError::MissingDependency {
                plugin_id: manifest.id.clone(),
                missing,
            });
        }

        let unit = self.code_loader.load(manifest)?;
        let instance = instantiate(unit.as_ref(), manifest, &self.config.base_contract, args)?;
        if let Err(entry) = self.registry.insert(manifest.clone(), unit, instance) {
            plugin_log!(level, Level::Warn, "Plugin {} was registered while loading; keeping the first instance.", entry.id());
        }
        Ok(())
    }

    fn record_failure(&self, manifest: &Manifest, error: &PluginSystemError) {
        let level = self.config.log_level;
        if manifest.source_path.as_os_str().is_empty() {
            plugin_log!(level, Level::Error, "Failed to load plugin {}: {}", manifest.id, error);
            return;
        }

        let log_path = manifest.error_log_path();
        match write_error_log(&log_path, manifest, error) {
            Ok(()) => plugin_log!(
                level,
                Level::Error,
                "Failed to load plugin {}: {}. Error log written to {}.",
                manifest.id,
                error,
                log_path.display()
            ),
            Err(e) => plugin_log!(
                level,
                Level::Error,
                "Failed to load plugin {}: {}. Could not write error log to {}: {}",
                manifest.id,
                error,
                log_path.display(),
                e
            ),
        }
    }

    // --- Queries ---

    pub fn is_loaded(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    /// The live instance of a loaded plugin
    pub fn get(&self, id: &str) -> Option<&dyn Plugin> {
        self.registry.get(id).map(|entry| entry.instance())
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut dyn Plugin> {
        self.registry.get_mut(id).map(|entry| entry.instance_mut())
    }

    /// The code unit a loaded plugin came from
    pub fn get_unit(&self, id: &str) -> Option<&dyn LoadedUnit> {
        self.registry.get(id).map(|entry| entry.unit())
    }

    /// Ids of loaded plugins in load order
    pub fn loaded_ids(&self) -> Vec<String> {
        self.registry.ids()
    }

    /// Every known manifest with its instance and unit when loaded
    pub fn plugins(&self) -> Vec<PluginView<'_>> {
        self.manifests
            .iter()
            .map(|manifest| {
                let entry = self.registry.get(&manifest.id);
                PluginView {
                    manifest,
                    instance: entry.map(|e| e.instance()),
                    unit: entry.map(|e| e.unit()),
                }
            })
            .collect()
    }

    // --- Lifecycle ---

    /// Drop a loaded plugin together with its manifest. `disable` is not called.
    pub fn unload(&mut self, id: &str) -> Result<()> {
        let level = self.config.log_level;
        plugin_log!(level, Level::Debug, "Unloading {}.", id);
        let entry = self
            .registry
            .remove(id)
            .ok_or_else(|| PluginSystemError::NotLoaded(id.to_string()))?;
        drop(entry);
        self.manifests.remove_by_id(id);
        plugin_log!(level, Level::Debug, "{} unloaded.", id);
        Ok(())
    }

    pub fn enable(&mut self, id: &str) -> Result<()> {
        self.run_hook(id, Hook::Enable)
    }

    pub fn disable(&mut self, id: &str) -> Result<()> {
        self.run_hook(id, Hook::Disable)
    }

    /// Enable every loaded plugin in load order, stopping at the first failure
    pub fn enable_all(&mut self) -> Result<()> {
        for id in self.registry.ids() {
            self.run_hook(&id, Hook::Enable)?;
        }
        Ok(())
    }

    /// Disable every loaded plugin in load order, stopping at the first failure
    pub fn disable_all(&mut self) -> Result<()> {
        for id in self.registry.ids() {
            self.run_hook(&id, Hook::Disable)?;
        }
        Ok(())
    }

    fn run_hook(&mut self, id: &str, operation: Hook) -> Result<()> {
        plugin_log!(self.config.log_level, Level::Debug, "Running {} on {}.", operation, id);
        let entry = self
            .registry
            .get_mut(id)
            .ok_or_else(|| PluginSystemError::NotLoaded(id.to_string()))?;
        operation.run(entry.instance_mut()).map_err(|source| PluginSystemError::Lifecycle {
            plugin_id: id.to_string(),
            operation,
            source,
        })
    }

    /// Disable, drop, re-read the manifest, load again and enable.
    ///
    /// Fails if the plugin is not loaded or any step fails; plugins depending
    /// on this one are not reloaded.
    pub fn reload(&mut self, id: &str, args: &HostArgs) -> Result<()> {
        let level = self.config.log_level;
        plugin_log!(level, Level::Debug, "Reloading {}.", id);

        self.disable(id)?;

        plugin_log!(level, Level::Debug, "Removing plugin instance and unloading code for {}.", id);
        let entry = self
            .registry
            .remove(id)
            .ok_or_else(|| PluginSystemError::NotLoaded(id.to_string()))?;
        let old_manifest = entry.manifest().clone();
        drop(entry);

        plugin_log!(level, Level::Debug, "Reloading manifest for {}.", id);
        self.manifests.reload_one(&old_manifest);
        let manifest = self
            .manifests
            .get(id)
            .cloned()
            .ok_or_else(|| PluginSystemError::ManifestNotFound {
                plugin_id: id.to_string(),
                path: old_manifest.source_path.clone(),
            })?;

        if let LoadOutcome::Failed(e) = self.load(&manifest, args) {
            return Err(e);
        }

        self.enable(id)?;
        plugin_log!(level, Level::Debug, "Plugin {} reloaded.", id);
        Ok(())
    }

    /// Reload every plugin loaded at the time of the call
    pub fn reload_all(&mut self, args: &HostArgs) -> Result<()> {
        for id in self.registry.ids() {
            self.reload(&id, args)?;
        }
        Ok(())
    }
}

impl Default for PluginLoader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginLoader")
            .field("config", &self.config)
            .field("manifests", &self.manifests.ids())
            .field("loaded", &self.registry.ids())
            .finish_non_exhaustive()
    }
}

/// Write a plain-text diagnostic for a failed load
fn write_error_log(path: &Path, manifest: &Manifest, error: &PluginSystemError) -> std::io::Result<()> {
    let mut text = String::new();
    let _ = writeln!(text, "Failed to load plugin '{}' ({})", manifest.id, manifest.source_path.display());
    let _ = writeln!(text, "error [{}]: {}", error.kind(), error);

    let mut source = std::error::Error::source(error);
    let mut depth = 1;
    while let Some(cause) = source {
        if depth >= MAX_TRACE_DEPTH {
            let _ = writeln!(text, "  ... further causes omitted");
            break;
        }
        let _ = writeln!(text, "  caused by: {}", cause);
        source = cause.source();
        depth += 1;
    }

    fs::write(path, text)
}
