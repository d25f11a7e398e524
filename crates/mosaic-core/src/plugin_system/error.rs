//! # Mosaic Plugin System Errors
//!
//! Defines error types specific to the Mosaic plugin system.
//!
//! [`PluginSystemError`] covers everything that can go wrong between reading a
//! manifest and driving a plugin's lifecycle hooks. Failures raised inside a
//! single plugin's load path are captured by the loader and reported per
//! plugin; the remaining variants ([`PluginSystemError::NotLoaded`],
//! [`PluginSystemError::Lifecycle`], ...) are returned to the caller.
use std::path::PathBuf;

use crate::plugin_system::traits::{Hook, PluginError};

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("Plugin manifest error for '{path}': {message}")]
    ManifestParse {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Plugin '{plugin_id}' has unresolved dependencies: {}", .missing.join(", "))]
    MissingDependency {
        plugin_id: String,
        missing: Vec<String>,
    },

    #[error("Circular dependency detected: {}", .cycle.join(" -> "))]
    DependencyCycle {
        cycle: Vec<String>,
    },

    #[error("Code loading failed for '{plugin_id}' from '{}': {message}", .path.display())]
    CodeLoad {
        plugin_id: String,
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Entry symbol '{symbol}' not found in plugin '{plugin_id}'")]
    SymbolNotFound {
        plugin_id: String,
        symbol: String,
    },

    #[error("Entry symbol '{symbol}' of plugin '{plugin_id}' does not satisfy the base contract: {message}")]
    InvalidBaseclass {
        plugin_id: String,
        symbol: String,
        message: String,
    },

    #[error("Construction of plugin '{plugin_id}' failed: {message}")]
    Construction {
        plugin_id: String,
        message: String,
        #[source]
        source: Option<PluginError>,
    },

    #[error("Plugin '{0}' is not loaded")]
    NotLoaded(String),

    #[error("No manifest for plugin '{plugin_id}' could be found in '{}'", .path.display())]
    ManifestNotFound {
        plugin_id: String,
        path: PathBuf,
    },

    #[error("Plugin '{plugin_id}' failed during {operation}: {source}")]
    Lifecycle {
        plugin_id: String,
        operation: Hook,
        #[source]
        source: PluginError,
    },

    #[error("Loader configuration error for '{}': {message}", .path.display())]
    Config {
        path: PathBuf,
        message: String,
    },

    #[error("I/O error during '{operation}' on '{}': {source}", .path.display())]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PluginSystemError {
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        PluginSystemError::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Short, stable name of the failure class, used in log lines and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            PluginSystemError::ManifestParse { .. } => "manifest-parse",
            PluginSystemError::MissingDependency { .. } => "missing-dependency",
            PluginSystemError::DependencyCycle { .. } => "dependency-cycle",
            PluginSystemError::CodeLoad { .. } => "code-load",
            PluginSystemError::SymbolNotFound { .. } => "symbol-not-found",
            PluginSystemError::InvalidBaseclass { .. } => "invalid-baseclass",
            PluginSystemError::Construction { .. } => "construction",
            PluginSystemError::NotLoaded(_) => "not-loaded",
            PluginSystemError::ManifestNotFound { .. } => "manifest-not-found",
            PluginSystemError::Lifecycle { .. } => "lifecycle",
            PluginSystemError::Config { .. } => "config",
            PluginSystemError::Io { .. } => "io",
        }
    }
}

/// Shorthand for Result with the plugin system error type
pub type Result<T> = std::result::Result<T, PluginSystemError>;
