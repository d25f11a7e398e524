#![cfg(test)]

use std::fs;
use std::path::PathBuf;

use log::LevelFilter;
use tempfile::tempdir;

use crate::plugin_system::config::{DEFAULT_PLUGIN_DIR, LoaderConfig};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::traits::BASE_CONTRACT;

#[test]
fn test_default_config() {
    let config = LoaderConfig::default();
    assert_eq!(config.plugin_paths.len(), 1);
    assert!(config.plugin_paths[0].ends_with(DEFAULT_PLUGIN_DIR));
    assert_eq!(config.log_level, LevelFilter::Info);
    assert_eq!(config.base_contract, BASE_CONTRACT);
}

#[test]
fn test_empty_path_list_falls_back_to_default() {
    let config = LoaderConfig::new(Vec::<PathBuf>::new());
    assert_eq!(config.plugin_paths, LoaderConfig::default().plugin_paths);

    let config = LoaderConfig::new(["/a", "/b"]);
    assert_eq!(config.plugin_paths, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
}

#[test]
fn test_builder_methods() {
    let config = LoaderConfig::new(["/plugins"])
        .with_log_level(LevelFilter::Warn)
        .with_base_contract("host::Extension");
    assert_eq!(config.log_level, LevelFilter::Warn);
    assert_eq!(config.base_contract, "host::Extension");
}

#[test]
fn test_from_toml_file_resolves_relative_paths() {
    let tmp = tempdir().unwrap();
    let file = tmp.path().join("mosaic.toml");
    fs::write(
        &file,
        "plugin_paths = [\"plugins\", \"/opt/extra\"]\nlog_level = \"debug\"\nbase_contract = \"host::Ext\"\n",
    )
    .unwrap();

    let config = LoaderConfig::from_file(&file).unwrap();
    assert_eq!(
        config.plugin_paths,
        vec![tmp.path().join("plugins"), PathBuf::from("/opt/extra")]
    );
    assert_eq!(config.log_level, LevelFilter::Debug);
    assert_eq!(config.base_contract, "host::Ext");
}

#[test]
fn test_from_json_file_with_defaults() {
    let tmp = tempdir().unwrap();
    let file = tmp.path().join("mosaic.json");
    fs::write(&file, "{}").unwrap();

    let config = LoaderConfig::from_file(&file).unwrap();
    assert_eq!(config, LoaderConfig::default());
}

#[test]
fn test_invalid_log_level() {
    let tmp = tempdir().unwrap();
    let file = tmp.path().join("mosaic.toml");
    fs::write(&file, "log_level = \"chatty\"").unwrap();

    match LoaderConfig::from_file(&file) {
        Err(PluginSystemError::Config { message, .. }) => assert!(message.contains("chatty")),
        other => panic!("Expected Config error, got {:?}", other),
    }
}

#[test]
fn test_unsupported_extension_and_missing_file() {
    let tmp = tempdir().unwrap();
    let ini = tmp.path().join("mosaic.ini");
    fs::write(&ini, "plugin_paths=x").unwrap();
    assert!(matches!(LoaderConfig::from_file(&ini), Err(PluginSystemError::Config { .. })));

    let missing = tmp.path().join("missing.toml");
    assert!(matches!(LoaderConfig::from_file(&missing), Err(PluginSystemError::Io { .. })));
}
