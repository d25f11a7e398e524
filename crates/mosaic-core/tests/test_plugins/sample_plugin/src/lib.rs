use std::fs;
use std::path::PathBuf;

use mosaic_core::{HostArgs, Manifest, Plugin, PluginError};

/// Leaves an `enabled` marker file in its plugin directory while enabled
pub struct SamplePlugin {
    marker: PathBuf,
    host_args: usize,
}

impl Plugin for SamplePlugin {
    fn new(manifest: &Manifest, args: &HostArgs) -> Result<Self, PluginError> {
        if manifest.description.as_deref() == Some("fail") {
            return Err(PluginError::InitError("asked to fail".to_string()));
        }
        Ok(Self {
            marker: manifest.source_path.join("enabled"),
            host_args: args.len(),
        })
    }

    fn enable(&mut self) -> Result<(), PluginError> {
        fs::write(&self.marker, format!("args={}", self.host_args))
            .map_err(|e| PluginError::EnableError(e.to_string()))
    }

    fn disable(&mut self) -> Result<(), PluginError> {
        if self.marker.exists() {
            fs::remove_file(&self.marker).map_err(|e| PluginError::DisableError(e.to_string()))?;
        }
        Ok(())
    }
}

mosaic_core::export_plugin!(SamplePlugin);
mosaic_core::export_plugin!(SamplePlugin, symbol = Impostor, contracts = ["other::Contract"]);
