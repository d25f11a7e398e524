//! # Mosaic Plugin System
//!
//! Discovers plugin directories, reads their manifests, resolves declared
//! dependencies and loads each plugin's code unit, constructing one instance
//! per plugin and driving it through enable/disable/reload/unload.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`manifest`]**: The [`Manifest`] record and the `plugin.toml` /
//!   `plugin.json` / `plugin.yaml` formats it is read from.
//! - **[`store`]**: [`ManifestStore`], the ordered, id-unique set of known
//!   manifests and the directory scan that fills it.
//! - **[`loader`]**: The [`CodeLoader`] seam. [`DynamicCodeLoader`] opens shared
//!   libraries; [`StaticCodeLoader`] serves units registered at build time.
//! - **[`instantiate`]**: Entry symbol lookup, base contract check and
//!   construction with panic containment.
//! - **[`registry`]**: [`PluginRegistry`] of loaded (manifest, unit, instance)
//!   entries.
//! - **[`lifecycle`]**: [`PluginLoader`], the controller tying the above together.
//! - **[`config`]**: [`LoaderConfig`], plugin paths, log level and host contract.
//! - **[`traits`]**: The [`Plugin`] trait, [`HostArgs`] and the exported
//!   [`PluginDeclaration`].
//! - **[`error`]**: [`PluginSystemError`].

/// Log target used by every record the plugin system emits
pub const LOG_TARGET: &str = "mosaic::plugin_system";

/// Log through the `log` facade, but only if `$lvl` passes the loader's own filter.
macro_rules! plugin_log {
    ($filter:expr, $lvl:expr, $($arg:tt)+) => {{
        let lvl: ::log::Level = $lvl;
        if lvl <= $filter {
            ::log::log!(target: $crate::plugin_system::LOG_TARGET, lvl, $($arg)+);
        }
    }};
}

pub mod error;
pub mod traits;
pub mod manifest;
pub mod store;
pub mod loader;
pub mod instantiate;
pub mod registry;
pub mod config;
pub mod lifecycle;

pub use config::LoaderConfig;
pub use error::PluginSystemError;
pub use lifecycle::{LoadOutcome, LoadReport, PluginLoader, PluginView};
pub use loader::{CodeLoader, DynamicCodeLoader, LoadedUnit, StaticCodeLoader, StaticUnit};
pub use manifest::{Manifest, ManifestBuilder};
pub use registry::PluginRegistry;
pub use store::ManifestStore;
pub use traits::{BASE_CONTRACT, HostArgs, Hook, Plugin, PluginDeclaration, PluginError};

#[cfg(test)]
mod tests;
