mod cli;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{LevelFilter, debug};
use mosaic_core::{LoaderConfig, PluginLoader};

/// Mosaic: a directory-based plugin host
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Plugin root to scan; may be given more than once
    #[arg(long = "plugin-dir", value_name = "DIR")]
    plugin_dirs: Vec<PathBuf>,

    /// Loader configuration file (JSON, TOML or YAML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the log level (off, error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", value_parser = parse_level)]
    log_level: Option<LevelFilter>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List discovered plugin manifests
    List,
    /// Load every plugin and report which ones fail
    Check,
    /// Load and enable every plugin, then disable them again
    Run,
}

fn parse_level(value: &str) -> Result<LevelFilter, String> {
    value.parse().map_err(|_| format!("unknown log level '{}'", value))
}

fn build_config(args: &CliArgs) -> Result<LoaderConfig, mosaic_core::PluginSystemError> {
    let mut config = match &args.config {
        Some(path) => LoaderConfig::from_file(path)?,
        None => LoaderConfig::default(),
    };
    if !args.plugin_dirs.is_empty() {
        config = config.with_plugin_paths(args.plugin_dirs.iter().cloned());
    }
    if let Some(level) = args.log_level {
        config = config.with_log_level(level);
    }
    Ok(config)
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to read configuration: {}", e);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = env_logger::Builder::new()
        .filter_level(config.log_level)
        .parse_default_env()
        .try_init()
    {
        eprintln!("Failed to initialize env_logger: {}", e);
    }
    debug!("Loader configuration: {:?}", config);

    let mut loader = PluginLoader::new(config);
    match args.command {
        Commands::List => cli::list(&mut loader),
        Commands::Check => cli::check(&mut loader),
        Commands::Run => cli::run(&mut loader),
    }
}
