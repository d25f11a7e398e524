//! Discovery and in-memory storage of plugin manifests.
//!
//! [`ManifestStore`] keeps manifests in discovery order. Roots are scanned one
//! level deep: every immediate subdirectory is a candidate plugin directory.
//! Entries inside a root are visited in file-name order so repeated scans of
//! the same tree produce the same order.
use std::fs;
use std::path::{Path, PathBuf};

use log::{Level, LevelFilter};

use crate::plugin_system::error::Result;
use crate::plugin_system::manifest::Manifest;

/// Ordered collection of discovered manifests, keyed by plugin id
#[derive(Debug, Clone)]
pub struct ManifestStore {
    roots: Vec<PathBuf>,
    manifests: Vec<Manifest>,
    log_level: LevelFilter,
}

impl ManifestStore {
    pub fn new(roots: Vec<PathBuf>, log_level: LevelFilter) -> Self {
        Self {
            roots,
            manifests: Vec::new(),
            log_level,
        }
    }

    /// Configured plugin roots
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Scan the configured roots
    pub fn discover_all(&mut self) -> usize {
        let roots = self.roots.clone();
        self.discover(&roots)
    }

    /// Scan each root's immediate subdirectories for manifests.
    /// Returns how many manifests were added. Bad entries are logged and skipped.
    pub fn discover<P: AsRef<Path>>(&mut self, roots: &[P]) -> usize {
        let mut added = 0;
        for root in roots {
            let root = root.as_ref();
            let entries = match fs::read_dir(root) {
                Ok(entries) => entries,
                Err(e) => {
                    plugin_log!(self.log_level, Level::Error, "Failed to read plugin directory {}: {}", root.display(), e);
                    continue;
                }
            };

            let mut dirs: Vec<PathBuf> = entries
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry.path()),
                    Err(e) => {
                        plugin_log!(self.log_level, Level::Warn, "Skipping unreadable entry in {}: {}", root.display(), e);
                        None
                    }
                })
                .filter(|path| path.is_dir())
                .collect();
            dirs.sort();

            for dir in dirs {
                if self.load_one(&dir) {
                    added += 1;
                }
            }
        }
        added
    }

    /// Load the manifest of one plugin directory. Returns whether it was added.
    pub fn load_one(&mut self, dir: &Path) -> bool {
        plugin_log!(self.log_level, Level::Debug, "Attempting to load plugin manifest from {}.", dir.display());
        match self.try_load_one(dir) {
            Ok(Some(id)) => {
                plugin_log!(self.log_level, Level::Debug, "Loaded manifest for '{}' from {}.", id, dir.display());
                true
            }
            Ok(None) => false,
            Err(e) => {
                plugin_log!(self.log_level, Level::Error, "Failed to load plugin manifest from {}: {}", dir.display(), e);
                false
            }
        }
    }

    fn try_load_one(&mut self, dir: &Path) -> Result<Option<String>> {
        let manifest = Manifest::load_from_dir(dir)?;
        if let Some(existing) = self.get(&manifest.id) {
            if existing.source_path == dir {
                plugin_log!(self.log_level, Level::Debug, "Manifest for '{}' in {} is already known.", manifest.id, dir.display());
                return Ok(None);
            }
            plugin_log!(
                self.log_level,
                Level::Warn,
                "Ignoring manifest in {}: plugin id '{}' is already provided by {}.",
                dir.display(),
                manifest.id,
                existing.source_path.display()
            );
            return Ok(None);
        }
        let id = manifest.id.clone();
        self.manifests.push(manifest);
        Ok(Some(id))
    }

    /// Insert an already parsed manifest. Returns false if the id is taken.
    pub fn insert(&mut self, manifest: Manifest) -> bool {
        if self.contains(&manifest.id) {
            return false;
        }
        self.manifests.push(manifest);
        true
    }

    pub fn get(&self, id: &str) -> Option<&Manifest> {
        self.manifests.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn remove_by_id(&mut self, id: &str) -> Option<Manifest> {
        let index = self.manifests.iter().position(|m| m.id == id)?;
        Some(self.manifests.remove(index))
    }

    pub fn remove(&mut self, manifest: &Manifest) -> Option<Manifest> {
        self.remove_by_id(&manifest.id)
    }

    /// Drop the stored manifest and re-read it from its source directory.
    /// Returns whether a manifest was found again.
    pub fn reload_one(&mut self, manifest: &Manifest) -> bool {
        plugin_log!(self.log_level, Level::Debug, "Reloading manifest for {}.", manifest.id);
        self.remove_by_id(&manifest.id);
        self.load_one(&manifest.source_path)
    }

    /// Forget every manifest and rescan the configured roots.
    /// Running plugins whose manifests disappeared are left untouched.
    pub fn reload_all(&mut self) -> usize {
        plugin_log!(self.log_level, Level::Debug, "Reloading all manifests.");
        self.manifests.clear();
        self.discover_all()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Manifest> {
        self.manifests.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.manifests.iter().map(|m| m.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }
}
