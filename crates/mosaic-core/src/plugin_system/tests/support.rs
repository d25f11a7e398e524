#![cfg(test)]

//! Shared fixtures: plugins that record what happens to them, and helpers for
//! laying out plugin directories on disk.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::LevelFilter;

use crate::plugin_system::config::LoaderConfig;
use crate::plugin_system::lifecycle::PluginLoader;
use crate::plugin_system::loader::{StaticCodeLoader, StaticUnit};
use crate::plugin_system::manifest::Manifest;
use crate::plugin_system::traits::{HostArgs, Plugin, PluginError};

/// Ordered record of plugin callbacks, shared through [`HostArgs`]
#[derive(Clone, Default)]
pub struct Events(Arc<Mutex<Vec<String>>>);

impl Events {
    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == event).count()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|e| e == event)
    }

    pub fn args(&self) -> HostArgs {
        HostArgs::new().with(self.clone())
    }
}

/// Records construction, enable, disable and drop
pub struct RecordingPlugin {
    pub id: String,
    pub description: Option<String>,
    events: Option<Events>,
}

impl RecordingPlugin {
    fn record(&self, what: &str) {
        if let Some(events) = &self.events {
            events.push(format!("{}:{}", what, self.id));
        }
    }
}

impl Plugin for RecordingPlugin {
    fn new(manifest: &Manifest, args: &HostArgs) -> Result<Self, PluginError> {
        let plugin = Self {
            id: manifest.id.clone(),
            description: manifest.description.clone(),
            events: args.find::<Events>().cloned(),
        };
        plugin.record("new");
        Ok(plugin)
    }

    fn enable(&mut self) -> Result<(), PluginError> {
        self.record("enable");
        Ok(())
    }

    fn disable(&mut self) -> Result<(), PluginError> {
        self.record("disable");
        Ok(())
    }
}

impl Drop for RecordingPlugin {
    fn drop(&mut self) {
        self.record("drop");
    }
}

/// Constructor always fails
pub struct FailingInitPlugin;

impl Plugin for FailingInitPlugin {
    fn new(manifest: &Manifest, _args: &HostArgs) -> Result<Self, PluginError> {
        Err(PluginError::InitError(format!("{} refuses to start", manifest.id)))
    }
}

/// Constructor panics
pub struct PanickingPlugin;

impl Plugin for PanickingPlugin {
    fn new(_manifest: &Manifest, _args: &HostArgs) -> Result<Self, PluginError> {
        panic!("constructor exploded");
    }
}

/// Loads fine, refuses to be enabled or disabled
pub struct StubbornPlugin;

impl Plugin for StubbornPlugin {
    fn new(_manifest: &Manifest, _args: &HostArgs) -> Result<Self, PluginError> {
        Ok(Self)
    }

    fn enable(&mut self) -> Result<(), PluginError> {
        Err(PluginError::EnableError("not today".to_string()))
    }

    fn disable(&mut self) -> Result<(), PluginError> {
        Err(PluginError::DisableError("not leaving".to_string()))
    }
}

/// Manifest text for a plugin with the given dependencies
pub fn manifest_toml(id: &str, dependencies: &[&str]) -> String {
    let deps: Vec<String> = dependencies.iter().map(|d| format!("\"{}\"", d)).collect();
    format!("id = \"{}\"\ndependencies = [{}]\n", id, deps.join(", "))
}

/// Create `root/dir_name/plugin.toml` with `content`
pub fn write_plugin(root: &Path, dir_name: &str, content: &str) -> PathBuf {
    let dir = root.join(dir_name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("plugin.toml"), content).unwrap();
    dir
}

/// Static loader serving [`RecordingPlugin`] under each module name
pub fn recording_modules(modules: &[&str]) -> StaticCodeLoader {
    let mut loader = StaticCodeLoader::new();
    for module in modules {
        loader.register(module, StaticUnit::new().with_plugin::<RecordingPlugin>());
    }
    loader
}

pub fn test_config(root: &Path) -> LoaderConfig {
    LoaderConfig::new([root]).with_log_level(LevelFilter::Debug)
}

pub fn loader_for(root: &Path, code_loader: StaticCodeLoader) -> PluginLoader {
    PluginLoader::with_code_loader(test_config(root), code_loader)
}
