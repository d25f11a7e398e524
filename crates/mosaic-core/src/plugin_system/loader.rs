//! Code loader adapters: turn a manifest's entry file into a [`LoadedUnit`]
//! whose exported symbols can be looked up by name.
//!
//! - [`DynamicCodeLoader`] opens shared libraries with `libloading`.
//! - [`StaticCodeLoader`] serves units linked into the host at build time,
//!   keyed by the manifest's module name.
//!
//! Neither adapter caches: every call produces a fresh unit, so a reload
//! observes whatever is on disk (or registered) at that moment.
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use libloading::Library;

use crate::plugin_system::error::{PluginSystemError, Result};
use crate::plugin_system::manifest::{DEFAULT_ENTRY_SYMBOL, Manifest};
use crate::plugin_system::traits::{Plugin, PluginDeclaration};

/// The executable result of loading a plugin's code
pub trait LoadedUnit: Send {
    /// Where the unit was loaded from
    fn origin(&self) -> &Path;

    /// Look up an exported plugin declaration by symbol name
    fn symbol(&self, name: &str) -> Option<&PluginDeclaration>;
}

/// Capability that loads a plugin's entry file.
/// Fails with [`PluginSystemError::CodeLoad`].
pub trait CodeLoader: Send {
    /// Load `manifest.entry_file` from `manifest.source_path`, identified by `manifest.module_name`
    fn load(&self, manifest: &Manifest) -> Result<Box<dyn LoadedUnit>>;
}

fn code_load_error(manifest: &Manifest, message: impl Into<String>) -> PluginSystemError {
    PluginSystemError::CodeLoad {
        plugin_id: manifest.id.clone(),
        path: manifest.entry_path(),
        message: message.into(),
        source: None,
    }
}

// --- Dynamic libraries ---

/// Loads plugin entry files as shared libraries
#[derive(Debug, Default, Clone, Copy)]
pub struct DynamicCodeLoader;

impl DynamicCodeLoader {
    pub fn new() -> Self {
        Self
    }
}

impl CodeLoader for DynamicCodeLoader {
    fn load(&self, manifest: &Manifest) -> Result<Box<dyn LoadedUnit>> {
        if !manifest.entry_file_is_contained() {
            return Err(code_load_error(
                manifest,
                format!(
                    "Invalid entry_file '{}': must be relative and not traverse upwards.",
                    manifest.entry_file
                ),
            ));
        }

        let path = manifest.entry_path();
        if !path.is_file() {
            return Err(code_load_error(manifest, "entry file does not exist"));
        }

        // SAFETY: running a library's initialisers is inherent to loading a plugin;
        // plugins execute with full host privileges.
        let library = unsafe { Library::new(&path) }.map_err(|e| PluginSystemError::CodeLoad {
            plugin_id: manifest.id.clone(),
            path: path.clone(),
            message: format!("libloading error: {}", e),
            source: Some(Box::new(e)),
        })?;

        Ok(Box::new(DynamicUnit { library, path }))
    }
}

/// A shared library opened by [`DynamicCodeLoader`]
pub struct DynamicUnit {
    library: Library,
    path: PathBuf,
}

impl LoadedUnit for DynamicUnit {
    fn origin(&self) -> &Path {
        &self.path
    }

    fn symbol(&self, name: &str) -> Option<&PluginDeclaration> {
        let mut symbol_name = Vec::with_capacity(name.len() + 1);
        symbol_name.extend_from_slice(name.as_bytes());
        symbol_name.push(0);

        // SAFETY: for a `static` export the symbol address is the address of the
        // static itself. The declaration is only trusted after the instantiator
        // has checked its magic and ABI version.
        let symbol = unsafe { self.library.get::<*const PluginDeclaration>(&symbol_name) }.ok()?;
        let declaration: *const PluginDeclaration = *symbol;
        if declaration.is_null() {
            return None;
        }
        // SAFETY: non-null and borrowed for no longer than `self`, which keeps the library mapped.
        Some(unsafe { &*declaration })
    }
}

impl fmt::Debug for DynamicUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicUnit").field("path", &self.path).finish()
    }
}

// --- Statically linked units ---

/// Set of declarations a statically linked module exports
#[derive(Debug, Clone, Default)]
pub struct StaticUnit {
    origin: PathBuf,
    symbols: HashMap<String, PluginDeclaration>,
}

impl StaticUnit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Export `declaration` under `name`
    pub fn with_symbol(mut self, name: &str, declaration: PluginDeclaration) -> Self {
        self.symbols.insert(name.to_string(), declaration);
        self
    }

    /// Export `T` under the default entry symbol
    pub fn with_plugin<T: Plugin + 'static>(self) -> Self {
        self.with_symbol(DEFAULT_ENTRY_SYMBOL, PluginDeclaration::of::<T>())
    }
}

impl LoadedUnit for StaticUnit {
    fn origin(&self) -> &Path {
        &self.origin
    }

    fn symbol(&self, name: &str) -> Option<&PluginDeclaration> {
        self.symbols.get(name)
    }
}

type UnitFactory = Box<dyn Fn(&Manifest) -> std::result::Result<StaticUnit, String> + Send + Sync>;

/// Build-time plugin registry keyed by module name.
///
/// Hosts using this loader give up runtime-discovered code: the manifest
/// still has to be discovered on disk, but only modules registered here can
/// be loaded.
#[derive(Default)]
pub struct StaticCodeLoader {
    modules: HashMap<String, UnitFactory>,
}

impl StaticCodeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module; each load hands out a fresh copy of `unit`
    pub fn register(&mut self, module_name: &str, unit: StaticUnit) -> &mut Self {
        self.register_fn(module_name, move |_| Ok(unit.clone()))
    }

    /// Register a module whose unit is produced on every load by `factory`.
    /// An `Err` from the factory is reported as a code-load failure.
    pub fn register_fn<F>(&mut self, module_name: &str, factory: F) -> &mut Self
    where
        F: Fn(&Manifest) -> std::result::Result<StaticUnit, String> + Send + Sync + 'static,
    {
        self.modules.insert(module_name.to_string(), Box::new(factory));
        self
    }

    pub fn unregister(&mut self, module_name: &str) -> bool {
        self.modules.remove(module_name).is_some()
    }

    pub fn contains(&self, module_name: &str) -> bool {
        self.modules.contains_key(module_name)
    }
}

impl CodeLoader for StaticCodeLoader {
    fn load(&self, manifest: &Manifest) -> Result<Box<dyn LoadedUnit>> {
        let factory = self.modules.get(&manifest.module_name).ok_or_else(|| {
            code_load_error(
                manifest,
                format!("no statically linked module named '{}'", manifest.module_name),
            )
        })?;
        let mut unit = factory(manifest).map_err(|message| code_load_error(manifest, message))?;
        unit.origin = manifest.entry_path();
        Ok(Box::new(unit))
    }
}

impl fmt::Debug for StaticCodeLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut modules: Vec<&String> = self.modules.keys().collect();
        modules.sort();
        f.debug_struct("StaticCodeLoader").field("modules", &modules).finish()
    }
}
