//! Loader configuration.
//!
//! A [`LoaderConfig`] is built in code or read from a JSON, TOML or YAML file
//! (the latter two behind the `toml-manifest` / `yaml-manifest` features):
//!
//! ```toml
//! plugin_paths = ["plugins", "/opt/host/plugins"]
//! log_level = "debug"
//! base_contract = "mosaic::Plugin"
//! ```
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::LevelFilter;
use serde::Deserialize;

use crate::plugin_system::error::{PluginSystemError, Result};
use crate::plugin_system::manifest::ManifestFormat;
use crate::plugin_system::traits::BASE_CONTRACT;

/// Directory scanned when no plugin path is configured, relative to the working directory
pub const DEFAULT_PLUGIN_DIR: &str = "plugins";

#[derive(Deserialize, Debug, Default)]
struct RawLoaderConfig {
    #[serde(default)]
    plugin_paths: Vec<PathBuf>,
    log_level: Option<String>,
    base_contract: Option<String>,
}

/// Construction-time settings of a [`PluginLoader`](crate::plugin_system::PluginLoader)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Roots whose immediate subdirectories are plugin directories
    pub plugin_paths: Vec<PathBuf>,
    /// Most verbose level the loader emits
    pub log_level: LevelFilter,
    /// Contract every entry symbol must declare
    pub base_contract: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            plugin_paths: vec![default_plugin_dir()],
            log_level: LevelFilter::Info,
            base_contract: BASE_CONTRACT.to_string(),
        }
    }
}

impl LoaderConfig {
    /// Configuration scanning exactly `paths`; an empty list falls back to the default directory
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::default().with_plugin_paths(paths)
    }

    pub fn with_plugin_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        self.plugin_paths = if paths.is_empty() { vec![default_plugin_dir()] } else { paths };
        self
    }

    pub fn with_log_level(mut self, log_level: LevelFilter) -> Self {
        self.log_level = log_level;
        self
    }

    pub fn with_base_contract(mut self, contract: &str) -> Self {
        self.base_contract = contract.to_string();
        self
    }

    /// Read a configuration file. Relative plugin paths resolve against the file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_error = |message: String| PluginSystemError::Config {
            path: path.to_path_buf(),
            message,
        };

        let format = ManifestFormat::from_path(path)
            .ok_or_else(|| config_error("unsupported configuration format".to_string()))?;
        let content = fs::read_to_string(path).map_err(|e| PluginSystemError::io(e, "read_config", path))?;
        let raw: RawLoaderConfig = format
            .parse(&content)
            .map_err(|e| config_error(format!("failed to parse {}: {}", format.name(), e)))?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let mut config = Self::default().with_plugin_paths(
            raw.plugin_paths
                .into_iter()
                .map(|p| if p.is_absolute() { p } else { base_dir.join(p) }),
        );
        if let Some(level) = raw.log_level {
            config.log_level = LevelFilter::from_str(&level)
                .map_err(|_| config_error(format!("invalid log level '{}'", level)))?;
        }
        if let Some(contract) = raw.base_contract {
            config.base_contract = contract;
        }
        Ok(config)
    }
}

fn default_plugin_dir() -> PathBuf {
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(DEFAULT_PLUGIN_DIR),
        Err(_) => PathBuf::from(DEFAULT_PLUGIN_DIR),
    }
}
