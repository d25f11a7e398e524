//! # mosaic-core
//!
//! A directory-based plugin loader. Each plugin lives in its own directory with
//! a manifest and a compiled entry file; the loader discovers, orders, loads
//! and manages them. See [`plugin_system`] for the details and
//! [`export_plugin!`] for the plugin side.
pub mod plugin_system;

pub use plugin_system::{
    BASE_CONTRACT, CodeLoader, DynamicCodeLoader, Hook, HostArgs, LoadOutcome, LoadReport,
    LoaderConfig, Manifest, ManifestBuilder, Plugin, PluginDeclaration, PluginError, PluginLoader,
    PluginSystemError, StaticCodeLoader, StaticUnit,
};
