use std::fs;
use std::path::PathBuf;

use mosaic_core::{HostArgs, Manifest, Plugin, PluginError};

/// Writes a marker distinguishable from the sample plugin's
pub struct AlternatePlugin {
    marker: PathBuf,
}

impl Plugin for AlternatePlugin {
    fn new(manifest: &Manifest, _args: &HostArgs) -> Result<Self, PluginError> {
        Ok(Self {
            marker: manifest.source_path.join("enabled"),
        })
    }

    fn enable(&mut self) -> Result<(), PluginError> {
        fs::write(&self.marker, "alternate").map_err(|e| PluginError::EnableError(e.to_string()))
    }
}

mosaic_core::export_plugin!(AlternatePlugin);
