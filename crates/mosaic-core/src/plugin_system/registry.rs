use std::fmt;

use crate::plugin_system::loader::LoadedUnit;
use crate::plugin_system::manifest::Manifest;
use crate::plugin_system::traits::Plugin;

/// A loaded plugin: its manifest, code unit and live instance
pub struct RegistryEntry {
    // Fields drop in declaration order. The instance's code lives in the unit,
    // so the instance must go first.
    instance: Box<dyn Plugin>,
    unit: Box<dyn LoadedUnit>,
    manifest: Manifest,
}

impl RegistryEntry {
    pub fn id(&self) -> &str {
        &self.manifest.id
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn unit(&self) -> &dyn LoadedUnit {
        self.unit.as_ref()
    }

    pub fn instance(&self) -> &dyn Plugin {
        self.instance.as_ref()
    }

    pub fn instance_mut(&mut self) -> &mut dyn Plugin {
        self.instance.as_mut()
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("id", &self.manifest.id)
            .field("origin", &self.unit.origin())
            .finish_non_exhaustive()
    }
}

/// Registry of loaded plugins, in load order.
///
/// An id is either absent or present with its full
/// (manifest, unit, instance) triple; entries are only ever inserted and
/// removed whole.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    entries: Vec<RegistryEntry>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loaded plugin. Hands the parts back if the id is already taken.
    pub fn insert(
        &mut self,
        manifest: Manifest,
        unit: Box<dyn LoadedUnit>,
        instance: Box<dyn Plugin>,
    ) -> Result<(), RegistryEntry> {
        let entry = RegistryEntry { instance, unit, manifest };
        if self.contains(entry.id()) {
            return Err(entry);
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Unregister a plugin, returning its entry
    pub fn remove(&mut self, id: &str) -> Option<RegistryEntry> {
        let index = self.position(id)?;
        Some(self.entries.remove(index))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut RegistryEntry> {
        self.entries.iter_mut().find(|e| e.id() == id)
    }

    /// Loaded plugin ids in load order
    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.id().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RegistryEntry> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }
}
